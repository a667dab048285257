use serde_json::{json, Value};

use super::{ContentBinding, ContentSlot};
use crate::models::content::STATIC_CONTENT_TABLE;
use crate::models::StaticContentEntry;

/// Free-text block keyed by string (`static_content`)
pub struct StaticText;

pub type TextBinding = ContentBinding<StaticText>;

impl ContentSlot for StaticText {
    type Value = String;

    const TABLE: &'static str = STATIC_CONTENT_TABLE;
    const KEY_COLUMN: &'static str = "key";

    fn from_row(row: &Value) -> Option<String> {
        serde_json::from_value::<StaticContentEntry>(row.clone())
            .ok()
            .map(|entry| entry.content)
    }

    fn to_row(key: &str, value: &String) -> Value {
        json!({ "key": key, "content": value })
    }

    /// An empty stored body counts as no override
    fn display(persisted: Option<&String>, default: &String) -> String {
        match persisted {
            Some(text) if !text.is_empty() => text.clone(),
            _ => default.clone(),
        }
    }
}

/// Splits display text into lines. Both real newlines and the literal
/// two-character `\n` marker used in default strings break the line.
pub fn render_lines(text: &str) -> Vec<String> {
    text.replace("\\n", "\n")
        .split('\n')
        .map(str::to_string)
        .collect()
}
