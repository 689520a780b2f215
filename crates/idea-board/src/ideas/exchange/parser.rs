use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use super::super::domain::Reasoning;
use super::EnrichedIdea;

/// Wire form of one enriched record. Numbers may arrive as numeric strings.
#[derive(Debug, Deserialize)]
pub(crate) struct EnrichedRow {
    #[serde(alias = "docId", default, deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    votes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    roi: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    effort: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    risk: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    alignment: Option<f64>,
    #[serde(
        rename = "deptBoost",
        alias = "dept_boost",
        default,
        deserialize_with = "lenient_number"
    )]
    dept_boost: Option<f64>,
    #[serde(
        rename = "deptEffortMod",
        alias = "dept_effort_mod",
        default,
        deserialize_with = "lenient_number"
    )]
    dept_effort_mod: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_reasoning")]
    reasoning: Option<Reasoning>,
    #[serde(default, deserialize_with = "lenient_text")]
    explanation: Option<String>,
}

impl EnrichedRow {
    fn into_enriched(self, index: usize) -> Option<EnrichedIdea> {
        let (Some(id), Some(title)) = (self.id, self.title) else {
            warn!(index, "skipping enriched record without id or title");
            return None;
        };

        Some(EnrichedIdea {
            id,
            title,
            description: self.description,
            category: self.category,
            votes: self.votes.filter(|votes| votes.fract() == 0.0).map(|votes| votes as i64),
            roi: self.roi,
            effort: self.effort,
            risk: self.risk,
            alignment: self.alignment,
            dept_boost: self.dept_boost,
            dept_effort_mod: self.dept_effort_mod,
            priority: self.priority,
            reasoning: self.reasoning,
            explanation: self.explanation,
        })
    }
}

/// Parse the enricher's reply. The whole payload is tried first; failing that,
/// the outermost `[...]` span is extracted and parsed.
pub(crate) fn parse_enriched(raw: &str) -> Result<Vec<EnrichedIdea>, serde_json::Error> {
    let rows = match serde_json::from_str::<Vec<EnrichedRow>>(raw.trim()) {
        Ok(rows) => rows,
        Err(err) => match outer_array(raw) {
            Some(span) => {
                debug!(error = %err, "retrying enriched payload on bracketed span");
                serde_json::from_str::<Vec<EnrichedRow>>(span)?
            }
            None => return Err(err),
        },
    };

    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| row.into_enriched(index))
        .collect())
}

pub(crate) fn outer_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite()))
}

fn lenient_reasoning<'de, D>(deserializer: D) -> Result<Option<Reasoning>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
        _ => None,
    })
}
