use std::collections::BTreeMap;

use thiserror::Error;

/// Client-side validation failure, caught before any gateway call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field_errors: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn field(field: impl Into<String>, problem: impl Into<String>) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.into(), problem.into());
        Self {
            message: "Invalid field values".to_string(),
            field_errors,
        }
    }
}

/// Collects per-field problems for a form submission
#[derive(Debug, Default)]
pub struct Validator {
    field_errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_text(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "This field is required");
        }
        self
    }

    pub fn require<T>(&mut self, field: &str, value: Option<&T>) -> &mut Self {
        if value.is_none() {
            self.fail(field, "This field is required");
        }
        self
    }

    /// Required integer with a lower bound
    pub fn at_least(&mut self, field: &str, value: Option<i64>, min: i64) -> &mut Self {
        match value {
            None => self.fail(field, "This field is required"),
            Some(v) if v < min => self.fail(field, &format!("Must be at least {}", min)),
            Some(_) => {}
        }
        self
    }

    /// Required absolute http(s) URL
    pub fn url(&mut self, field: &str, value: &str) -> &mut Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.fail(field, "This field is required");
            return self;
        }
        match url::Url::parse(trimmed) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(_) => self.fail(field, "URL must use http or https"),
            Err(_) => self.fail(field, &format!("Invalid URL: {}", trimmed)),
        }
        self
    }

    fn fail(&mut self, field: &str, problem: &str) {
        self.field_errors
            .entry(field.to_string())
            .or_insert_with(|| problem.to_string());
    }

    pub fn finish(&mut self) -> Result<(), ValidationError> {
        if self.field_errors.is_empty() {
            return Ok(());
        }
        Err(ValidationError {
            message: "Missing or invalid fields".to_string(),
            field_errors: std::mem::take(&mut self.field_errors),
        })
    }
}
