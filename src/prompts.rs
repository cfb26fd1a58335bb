//! The generation instruction sent to the model.
//!
//! The whole request is one user message. The schema and the document text
//! are fenced and separated by `---` rules with fixed headings, so the model
//! (and anyone reading a logged prompt) can tell where each payload starts and
//! ends even when the document itself contains JSON.

use serde_json::Value;

/// Heading that precedes the serialised schema.
pub const SCHEMA_MARKER: &str = "JSON SCHEMA:";

/// Heading that precedes the extracted document text.
pub const DOCUMENT_MARKER: &str = "DOCUMENT TEXT:";

/// Fixed directive placed before both payloads.
pub const GENERATION_DIRECTIVE: &str = "Your task is to act as a JSON generator. Based on the document text provided, extract the relevant information and format it into a JSON object that strictly follows the given schema.

IMPORTANT: Only output the raw JSON object. Do not include any explanatory text, markdown formatting, or anything else before or after the JSON data.";

/// Closing line after the payloads.
pub const GENERATION_CLOSING: &str = "Now, generate the JSON object based on the schema and text.";

/// Build the single prompt for the given schema and document text.
///
/// The schema is rendered as indented JSON; the text is inserted verbatim.
pub fn build_generation_prompt(schema: &Value, document_text: &str) -> String {
    let schema_json =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());

    format!(
        "{GENERATION_DIRECTIVE}\n\n\
---\n\
{SCHEMA_MARKER}\n\
```json\n\
{schema_json}\n\
```\n\
---\n\
{DOCUMENT_MARKER}\n\
```text\n\
{document_text}\n\
```\n\
---\n\n\
{GENERATION_CLOSING}\n"
    )
}
