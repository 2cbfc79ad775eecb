// One-shot generation tools: image, CSV, code, resume.
// Each is a single request/response call through gemini_client; only video
// needs the long-running job tracker in `jobs`.

pub mod code;
pub mod csv;
pub mod handlers;
pub mod resume;
pub mod tools;
