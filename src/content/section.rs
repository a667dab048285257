use serde_json::{json, Value};

use super::{ContentBinding, ContentSlot};
use crate::models::content::SECTION_CONTENT_TABLE;
use crate::models::{SectionContentEntry, SectionCopy, ValidationError, Validator};

/// Section heading override keyed by section (`section_content`)
pub struct SectionSlot;

pub type SectionBinding = ContentBinding<SectionSlot>;

impl ContentSlot for SectionSlot {
    type Value = SectionCopy;

    const TABLE: &'static str = SECTION_CONTENT_TABLE;
    const KEY_COLUMN: &'static str = "section_key";

    fn from_row(row: &Value) -> Option<SectionCopy> {
        serde_json::from_value::<SectionContentEntry>(row.clone())
            .ok()
            .map(|entry| SectionCopy::new(entry.title, entry.description))
    }

    fn to_row(key: &str, value: &SectionCopy) -> Value {
        json!({
            "section_key": key,
            "title": value.title,
            "description": value.description,
        })
    }

    /// Each field falls back to its default independently
    fn display(persisted: Option<&SectionCopy>, default: &SectionCopy) -> SectionCopy {
        let pick = |stored: Option<&String>, fallback: &String| match stored {
            Some(s) if !s.is_empty() => s.clone(),
            _ => fallback.clone(),
        };
        SectionCopy {
            title: pick(persisted.map(|p| &p.title), &default.title),
            description: pick(persisted.map(|p| &p.description), &default.description),
        }
    }

    fn prepare(value: SectionCopy) -> Result<SectionCopy, ValidationError> {
        let copy = SectionCopy::new(value.title.trim(), value.description.trim());
        Validator::new()
            .require_text("title", &copy.title)
            .require_text("description", &copy.description)
            .finish()
            .map_err(|mut e| {
                e.message = "Title and description cannot be empty".to_string();
                e
            })?;
        Ok(copy)
    }
}
