//! Catalog of the creative tools the front end can switch between.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolKind {
    Image,
    Video,
    Resume,
    Csv,
    Code,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: &'static str,
    /// Endpoint the tool's form posts to.
    pub endpoint: &'static str,
}

/// Tool selected when the front end first loads.
pub const DEFAULT_TOOL: ToolKind = ToolKind::Image;

/// All tools, in sidebar order.
pub static TOOLS: [ToolInfo; 5] = [
    ToolInfo {
        kind: ToolKind::Image,
        name: "Image Generator",
        description: "Create stunning visuals from text descriptions.",
        endpoint: "/api/v1/images",
    },
    ToolInfo {
        kind: ToolKind::Video,
        name: "Video Creator",
        description: "Bring your ideas to life with text-to-video and image-to-video generation.",
        endpoint: "/api/v1/video/jobs",
    },
    ToolInfo {
        kind: ToolKind::Resume,
        name: "Resume Builder",
        description: "Craft a professional resume and export it as a document.",
        endpoint: "/api/v1/resumes",
    },
    ToolInfo {
        kind: ToolKind::Csv,
        name: "CSV Data Generator",
        description: "Generate structured CSV data for any purpose.",
        endpoint: "/api/v1/csv",
    },
    ToolInfo {
        kind: ToolKind::Code,
        name: "Code Assistant",
        description: "Generate code snippets in various programming languages.",
        endpoint: "/api/v1/code",
    },
];

pub fn tool_info(kind: ToolKind) -> &'static ToolInfo {
    // TOOLS has exactly one entry per kind.
    TOOLS
        .iter()
        .find(|t| t.kind == kind)
        .unwrap_or(&TOOLS[0])
}
