//! Prompts for chunk extraction.

use crate::types::schema::FieldSpec;

/// System instruction sent alongside every free-text extraction call.
pub const SYSTEM_MESSAGE: &str = "You are an intelligent text extraction and conversion assistant. \
Your task is to extract structured information from the given text and convert it into a pure JSON format. \
The JSON should contain only the structured data extracted from the text, \
with no additional commentary, explanations, or extraneous information.";

/// Lead-in of every per-chunk user prompt.
pub const USER_MESSAGE: &str =
    "Extract the following information from the provided text:\nPage content:\n\n";

/// Build the user prompt for one chunk.
///
/// The field list is rendered as a bracketed, quoted list in field order.
pub fn format_extract_prompt(fields: &FieldSpec, chunk: &str) -> String {
    format!(
        "{}{} from the following text:\n\n{}",
        USER_MESSAGE,
        render_field_list(fields),
        chunk
    )
}

fn render_field_list(fields: &FieldSpec) -> String {
    let quoted: Vec<String> = fields
        .iter()
        .map(|name| serde_json::Value::from(name).to_string())
        .collect();
    format!("[{}]", quoted.join(", "))
}
