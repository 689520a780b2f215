use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{Category, Metric};

pub const TITLE_MIN_CHARS: usize = 5;
pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const METRIC_MIN: i64 = 0;
pub const METRIC_MAX: i64 = 10;

/// Raw submission form. Every field defaults to empty so missing input is
/// reported field by field instead of as a malformed payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaSubmission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Submission that passed local validation; safe to send to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub title: String,
    pub category: Category,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Field-level messages for input rejected before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input")?;
        for (index, error) in self.errors.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{} ({})", error.message, error.field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IdeaSubmission {
    pub fn validate(&self) -> Result<ValidatedSubmission, ValidationErrors> {
        let mut errors = Vec::new();

        let title = self.title.trim();
        if title.chars().count() < TITLE_MIN_CHARS {
            errors.push(FieldError::new(
                "title",
                "Title must be at least 5 characters.",
            ));
        }

        let category = if self.category.trim().is_empty() {
            errors.push(FieldError::new("category", "Please select a category."));
            None
        } else {
            let category = Category::from_label(&self.category);
            if category.is_none() {
                errors.push(FieldError::new(
                    "category",
                    "Please select a valid category.",
                ));
            }
            category
        };

        let description = self.description.trim();
        let description_chars = description.chars().count();
        if description_chars < DESCRIPTION_MIN_CHARS {
            errors.push(FieldError::new(
                "description",
                "Description must be at least 10 characters.",
            ));
        } else if description_chars > DESCRIPTION_MAX_CHARS {
            errors.push(FieldError::new(
                "description",
                "Description cannot exceed 500 characters.",
            ));
        }

        match category {
            Some(category) if errors.is_empty() => Ok(ValidatedSubmission {
                title: title.to_string(),
                category,
                description: description.to_string(),
            }),
            _ => Err(ValidationErrors { errors }),
        }
    }
}

/// A validated dashboard metric edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricEdit {
    pub metric: Metric,
    pub value: u8,
}

impl MetricEdit {
    /// Accepts integers and integer strings in `[0, 10]`.
    pub fn parse(field: &str, value: &Value) -> Result<Self, ValidationErrors> {
        let metric = match Metric::parse(field) {
            Some(metric) => metric,
            None if field.trim().eq_ignore_ascii_case("alignment") => {
                return Err(ValidationErrors::single(
                    "field",
                    "Alignment is assigned externally and cannot be edited.",
                ))
            }
            None => {
                return Err(ValidationErrors::single(
                    "field",
                    "Field must be one of roi, effort, risk.",
                ))
            }
        };

        let raw = match value {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };

        match raw {
            Some(raw) if (METRIC_MIN..=METRIC_MAX).contains(&raw) => Ok(Self {
                metric,
                value: raw as u8,
            }),
            _ => Err(ValidationErrors::single(
                "value",
                "Value must be a number between 0 and 10.",
            )),
        }
    }

    pub fn new(metric: Metric, value: u8) -> Result<Self, ValidationErrors> {
        Self::parse(metric.field_name(), &Value::from(value))
    }
}
