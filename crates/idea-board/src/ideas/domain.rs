use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use super::store::StoredDocument;

/// Field map of a stored idea document.
pub type Document = Map<String, Value>;

/// Field names used by the idea documents in both collections.
pub mod fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORY: &str = "category";
    pub const VOTES: &str = "votes";
    pub const ROI: &str = "roi";
    pub const EFFORT: &str = "effort";
    pub const RISK: &str = "risk";
    pub const ALIGNMENT: &str = "alignment";
    pub const DEPT_BOOST: &str = "deptBoost";
    pub const DEPT_EFFORT_MOD: &str = "deptEffortMod";
    pub const COMPOSITE_SCORE: &str = "composite_score";
    pub const PRIORITY: &str = "priority";
    pub const REASONING: &str = "reasoning";
    pub const EXPLANATION: &str = "explanation";
    pub const CREATED_AT: &str = "createdAt";
}

/// Identifier assigned by the document store when an idea is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdeaId(pub String);

impl IdeaId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdeaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdeaId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Idea categories offered on submission. Stored records may carry other labels
/// (department names from enrichment), which are kept as `Unlisted`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    UiUx,
    Security,
    Ai,
    OtherFeature,
    Mobile,
    Unlisted(String),
}

impl Category {
    pub fn submittable() -> [Self; 5] {
        [
            Self::UiUx,
            Self::Security,
            Self::Ai,
            Self::OtherFeature,
            Self::Mobile,
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            Self::UiUx => "UI/UX",
            Self::Security => "Security",
            Self::Ai => "AI",
            Self::OtherFeature => "Other Feature",
            Self::Mobile => "Mobile",
            Self::Unlisted(name) => name,
        }
    }

    /// Match one of the submittable labels exactly.
    pub fn from_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::submittable()
            .into_iter()
            .find(|category| category.label() == raw)
    }

    pub fn from_stored(raw: &str) -> Self {
        Self::from_label(raw).unwrap_or_else(|| Self::Unlisted(raw.trim().to_string()))
    }

    pub fn is_submittable(&self) -> bool {
        !matches!(self, Self::Unlisted(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_stored(&raw))
    }
}

/// Externally assigned priority label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Metrics a user may edit from the dashboard. Alignment is assigned externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Roi,
    Effort,
    Risk,
}

impl Metric {
    pub const fn ordered() -> [Self; 3] {
        [Self::Roi, Self::Effort, Self::Risk]
    }

    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Roi => fields::ROI,
            Self::Effort => fields::EFFORT,
            Self::Risk => fields::RISK,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Roi => "ROI",
            Self::Effort => "Effort",
            Self::Risk => "Risk",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|metric| metric.field_name().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub const fn delta(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Free-text justification attached to each metric by enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reasoning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

/// An idea as read from either collection, with every optional field explicit.
///
/// Defaults for scoring (absent effort counts as 1, absent roi as 0, ...) are
/// applied by the score engine, not here, so a record that never carried a
/// metric stays distinguishable from one that carries a zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<f64>,
    #[serde(
        rename = "deptBoost",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dept_boost: Option<f64>,
    #[serde(
        rename = "deptEffortMod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dept_effort_mod: Option<f64>,
    #[serde(default)]
    pub composite_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Idea {
    pub fn new(id: IdeaId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            category: None,
            votes: None,
            roi: None,
            effort: None,
            risk: None,
            alignment: None,
            dept_boost: None,
            dept_effort_mod: None,
            composite_score: None,
            priority: None,
            reasoning: None,
            explanation: None,
            created_at: None,
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Roi => self.roi,
            Metric::Effort => self.effort,
            Metric::Risk => self.risk,
        }
    }

    pub fn set_metric(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Roi => self.roi = Some(value),
            Metric::Effort => self.effort = Some(value),
            Metric::Risk => self.risk = Some(value),
        }
    }

    /// Parse a stored document, validating the type of every field that is present.
    pub fn from_document(id: IdeaId, document: &Document) -> Result<Self, RecordError> {
        let title = match document.get(fields::TITLE) {
            Some(Value::String(title)) if !title.trim().is_empty() => title.clone(),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                return Err(RecordError::MissingField {
                    id,
                    field: fields::TITLE,
                })
            }
            Some(_) => {
                return Err(RecordError::InvalidField {
                    id,
                    field: fields::TITLE,
                })
            }
        };

        let description = optional_string(&id, document, fields::DESCRIPTION)?.unwrap_or_default();
        let category = optional_string(&id, document, fields::CATEGORY)?
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| Category::from_stored(&raw));
        let priority = optional_string(&id, document, fields::PRIORITY)?
            .and_then(|raw| Priority::parse(&raw));
        let explanation = optional_string(&id, document, fields::EXPLANATION)?;

        let reasoning = match document.get(fields::REASONING) {
            None | Some(Value::Null) => None,
            Some(value @ Value::Object(_)) => Some(
                serde_json::from_value::<Reasoning>(value.clone()).map_err(|_| {
                    RecordError::InvalidField {
                        id: id.clone(),
                        field: fields::REASONING,
                    }
                })?,
            ),
            Some(_) => {
                return Err(RecordError::InvalidField {
                    id,
                    field: fields::REASONING,
                })
            }
        };

        let created_at = optional_string(&id, document, fields::CREATED_AT)?
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
            .map(|timestamp| timestamp.with_timezone(&Utc));

        Ok(Self {
            votes: optional_integer(&id, document, fields::VOTES)?,
            roi: optional_number(&id, document, fields::ROI)?,
            effort: optional_number(&id, document, fields::EFFORT)?,
            risk: optional_number(&id, document, fields::RISK)?,
            alignment: optional_number(&id, document, fields::ALIGNMENT)?,
            dept_boost: optional_number(&id, document, fields::DEPT_BOOST)?,
            dept_effort_mod: optional_number(&id, document, fields::DEPT_EFFORT_MOD)?,
            composite_score: optional_number(&id, document, fields::COMPOSITE_SCORE)?,
            id,
            title,
            description,
            category,
            priority,
            reasoning,
            explanation,
            created_at,
        })
    }

    /// Document form written to the store. `composite_score` is always present,
    /// as `null` when undefined.
    pub fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Document::new(),
        }
    }
}

/// Convert a store snapshot into ideas, skipping records that fail validation.
pub fn ideas_from_documents(documents: &[StoredDocument]) -> Vec<Idea> {
    documents
        .iter()
        .filter_map(
            |document| match Idea::from_document(document.id.clone(), &document.fields) {
                Ok(idea) => Some(idea),
                Err(err) => {
                    warn!(error = %err, "skipping malformed idea record");
                    None
                }
            },
        )
        .collect()
}

/// Validation failure at the store-read boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("idea record {id} is missing required field `{field}`")]
    MissingField { id: IdeaId, field: &'static str },
    #[error("idea record {id} has an invalid `{field}` value")]
    InvalidField { id: IdeaId, field: &'static str },
}

fn optional_string(
    id: &IdeaId,
    document: &Document,
    field: &'static str,
) -> Result<Option<String>, RecordError> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(RecordError::InvalidField {
            id: id.clone(),
            field,
        }),
    }
}

fn optional_number(
    id: &IdeaId,
    document: &Document,
    field: &'static str,
) -> Result<Option<f64>, RecordError> {
    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_f64()
            .filter(|value| value.is_finite())
            .map(Some)
            .ok_or_else(|| RecordError::InvalidField {
                id: id.clone(),
                field,
            }),
        Some(_) => Err(RecordError::InvalidField {
            id: id.clone(),
            field,
        }),
    }
}

fn optional_integer(
    id: &IdeaId,
    document: &Document,
    field: &'static str,
) -> Result<Option<i64>, RecordError> {
    let invalid = || RecordError::InvalidField {
        id: id.clone(),
        field,
    };

    match document.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            if let Some(value) = number.as_i64() {
                return Ok(Some(value));
            }
            // Some clients write counters as whole floats.
            match number.as_f64() {
                Some(value)
                    if value.fract() == 0.0
                        && value >= i64::MIN as f64
                        && value <= i64::MAX as f64 =>
                {
                    Ok(Some(value as i64))
                }
                _ => Err(invalid()),
            }
        }
        Some(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn from_document_applies_optional_schema() {
        let idea = Idea::from_document(
            IdeaId::from("idea-1"),
            &document(json!({
                "title": "Dark mode",
                "category": "UI/UX",
                "votes": 12,
                "roi": 7,
                "effort": 3.0,
                "priority": "high",
                "composite_score": null,
                "reasoning": { "roi": "popular request" },
                "createdAt": "2025-04-02T10:00:00Z"
            })),
        )
        .expect("record parses");

        assert_eq!(idea.category, Some(Category::UiUx));
        assert_eq!(idea.votes, Some(12));
        assert_eq!(idea.roi, Some(7.0));
        assert_eq!(idea.effort, Some(3.0));
        assert_eq!(idea.risk, None);
        assert_eq!(idea.priority, Some(Priority::High));
        assert_eq!(idea.composite_score, None);
        assert_eq!(
            idea.reasoning.and_then(|reasoning| reasoning.roi).as_deref(),
            Some("popular request")
        );
        assert!(idea.created_at.is_some());
        assert_eq!(idea.description, "");
    }

    #[test]
    fn from_document_rejects_wrong_types() {
        let err = Idea::from_document(
            IdeaId::from("idea-2"),
            &document(json!({ "title": "Export", "votes": "many" })),
        )
        .expect_err("votes must be numeric");
        assert_eq!(
            err,
            RecordError::InvalidField {
                id: IdeaId::from("idea-2"),
                field: fields::VOTES
            }
        );

        let err = Idea::from_document(IdeaId::from("idea-3"), &document(json!({ "votes": 1 })))
            .expect_err("title is required");
        assert!(matches!(err, RecordError::MissingField { field: "title", .. }));

        let err = Idea::from_document(
            IdeaId::from("idea-4"),
            &document(json!({ "title": "Half vote", "votes": 1.5 })),
        )
        .expect_err("votes must be whole");
        assert!(matches!(err, RecordError::InvalidField { field: "votes", .. }));
    }

    #[test]
    fn unknown_categories_are_preserved_as_unlisted() {
        let idea = Idea::from_document(
            IdeaId::from("idea-5"),
            &document(json!({ "title": "Payroll sync", "category": "HR" })),
        )
        .expect("record parses");
        assert_eq!(idea.category, Some(Category::Unlisted("HR".to_string())));
        assert!(!Category::from_stored("HR").is_submittable());
        assert!(Category::from_stored("Other Feature").is_submittable());
    }

    #[test]
    fn to_document_keeps_explicit_null_score() {
        let mut idea = Idea::new(IdeaId::from("idea-6"), "Offline mode");
        idea.dept_boost = Some(1.5);
        let document = idea.to_document();

        assert_eq!(document.get(fields::COMPOSITE_SCORE), Some(&Value::Null));
        assert_eq!(document.get(fields::DEPT_BOOST), Some(&json!(1.5)));
        assert!(!document.contains_key(fields::ROI));

        let round_trip =
            Idea::from_document(idea.id.clone(), &document).expect("document parses back");
        assert_eq!(round_trip, idea);
    }

    #[test]
    fn metric_parse_is_case_insensitive() {
        assert_eq!(Metric::parse("ROI"), Some(Metric::Roi));
        assert_eq!(Metric::parse(" effort "), Some(Metric::Effort));
        assert_eq!(Metric::parse("alignment"), None);
    }
}
