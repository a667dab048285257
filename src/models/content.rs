use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATIC_CONTENT_TABLE: &str = "static_content";
pub const SECTION_CONTENT_TABLE: &str = "section_content";

/// Row in `static_content`: one free-text value per key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticContentEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row in `section_content`: heading override for a page section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionContentEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub section_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Title/description pair edited by a section header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCopy {
    pub title: String,
    pub description: String,
}

impl SectionCopy {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}
