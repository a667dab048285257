//! View models handed to renderers (JSON API, CLI text). Edit and delete
//! affordances appear only when the capability passed in allows them.

pub mod home;

use std::fmt;

use serde::Serialize;

use crate::auth::Capability;
use crate::content::render_lines;
use crate::models::SectionCopy;

pub use home::{build_home, CategorySectionView, HomePage};

/// Category-specific card content, built by each record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardBody {
    pub title: String,
    pub description: String,
    pub badge: Option<String>,
    pub badge_color: String,
    pub details: Vec<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardActions {
    pub edit: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: String,
    #[serde(flatten)]
    pub body: CardBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<CardActions>,
}

impl CardView {
    pub fn new(id: impl Into<String>, body: CardBody, capability: Capability) -> Self {
        Self {
            id: id.into(),
            body,
            actions: capability.can_edit().then_some(CardActions {
                edit: true,
                delete: true,
            }),
        }
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body.title)?;
        if let Some(badge) = &self.body.badge {
            write!(f, " [{}]", badge)?;
        }
        if !self.body.details.is_empty() {
            write!(f, " ({})", self.body.details.join(", "))?;
        }
        if !self.body.description.is_empty() {
            write!(f, "\n    {}", self.body.description)?;
        }
        if let Some(url) = &self.body.url {
            write!(f, "\n    {}", url)?;
        }
        write!(f, "\n    id: {}", self.id)
    }
}

/// A free-text block, split into display lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlockView {
    pub key: String,
    pub text: String,
    pub lines: Vec<String>,
    pub editable: bool,
}

impl TextBlockView {
    pub fn new(key: impl Into<String>, text: String, capability: Capability) -> Self {
        Self {
            key: key.into(),
            lines: render_lines(&text),
            text,
            editable: capability.can_edit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionHeaderView {
    pub key: String,
    pub title: String,
    pub description: String,
    pub editable: bool,
}

impl SectionHeaderView {
    pub fn new(key: impl Into<String>, copy: SectionCopy, capability: Capability) -> Self {
        Self {
            key: key.into(),
            title: copy.title,
            description: copy.description,
            editable: capability.can_edit(),
        }
    }
}
