// Prompt templates for the text tools.
// Placeholders in `{braces}` are filled with `str::replace` before sending.

/// Shared instruction appended to every prompt whose output is saved verbatim.
pub const RAW_OUTPUT_INSTRUCTION: &str = "Do not include any explanation, titles, \
    or markdown formatting such as code fences.";

/// CSV generation. Replace `{instruction}` and `{prompt}`.
pub const CSV_PROMPT_TEMPLATE: &str = "Generate only CSV data based on the following prompt. \
    {instruction} Just the raw CSV data, starting with a header row. Prompt: {prompt}";

/// Code snippet generation. Replace `{language}`, `{instruction}` and `{prompt}`.
pub const CODE_PROMPT_TEMPLATE: &str = "Generate a code snippet for the following prompt in \
    {language}. Only output the code. {instruction} Prompt: {prompt}";

/// Resume drafting. Replace `{resume_json}`.
pub const RESUME_PROMPT_TEMPLATE: &str = r#"Generate a professional resume in Markdown format based on the following JSON data.
Make it well-structured and use professional language.
Use a level-one heading for the candidate's name, then sections for Summary,
Experience, Education and Skills. Only use facts present in the data.

Data:
{resume_json}
"#;
