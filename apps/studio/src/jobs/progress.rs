//! Advisory progress copy shown while a video job is active.
//!
//! Purely cosmetic: rotated on its own timer, never tied to the poll cadence.

pub const PROGRESS_MESSAGES: [&str; 7] = [
    "Initializing generation process...",
    "Warming up the creative engines...",
    "Storyboarding your vision...",
    "Rendering high-resolution frames (this may take a moment)...",
    "Assembling video sequence...",
    "Adding final touches and effects...",
    "Almost there, preparing your video for viewing...",
];

/// Round-robin cursor over [`PROGRESS_MESSAGES`], starting at the first one.
#[derive(Debug, Default)]
pub struct ProgressRotation {
    index: usize,
}

impl ProgressRotation {
    pub fn current(&self) -> &'static str {
        PROGRESS_MESSAGES[self.index]
    }

    /// Moves to the next message, wrapping around after the last.
    pub fn advance(&mut self) -> &'static str {
        self.index = (self.index + 1) % PROGRESS_MESSAGES.len();
        self.current()
    }
}
