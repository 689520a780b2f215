mod export;
mod parser;

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use super::domain::{Category, Idea, IdeaId, Priority, Reasoning};

pub use export::write_csv;

#[derive(Debug)]
pub enum ExchangeError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeError::Io(err) => write!(f, "failed to read enriched ideas: {}", err),
            ExchangeError::Json(err) => write!(f, "invalid enriched idea payload: {}", err),
            ExchangeError::Csv(err) => write!(f, "failed to write idea table: {}", err),
        }
    }
}

impl std::error::Error for ExchangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExchangeError::Io(err) => Some(err),
            ExchangeError::Json(err) => Some(err),
            ExchangeError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExchangeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<csv::Error> for ExchangeError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// One idea as produced by the enrichment step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedIdea {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub votes: Option<i64>,
    pub roi: Option<f64>,
    pub effort: Option<f64>,
    pub risk: Option<f64>,
    pub alignment: Option<f64>,
    pub dept_boost: Option<f64>,
    pub dept_effort_mod: Option<f64>,
    pub priority: Option<String>,
    pub reasoning: Option<Reasoning>,
    pub explanation: Option<String>,
}

impl EnrichedIdea {
    /// The idea carries no composite score yet; callers rescore it.
    pub fn into_idea(self) -> Idea {
        let mut idea = Idea::new(IdeaId(self.id), self.title);
        idea.description = self.description.unwrap_or_default();
        idea.category = self.category.as_deref().map(Category::from_stored);
        idea.votes = self.votes;
        idea.roi = self.roi;
        idea.effort = self.effort;
        idea.risk = self.risk;
        idea.alignment = self.alignment;
        idea.dept_boost = self.dept_boost;
        idea.dept_effort_mod = self.dept_effort_mod;
        idea.priority = self.priority.as_deref().and_then(Priority::parse);
        idea.reasoning = self.reasoning;
        idea.explanation = self.explanation;
        idea
    }
}

pub struct EnrichedImporter;

impl EnrichedImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<EnrichedIdea>, ExchangeError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let ideas = Self::from_reader(file)?;
        info!(path = %path.display(), count = ideas.len(), "enriched ideas loaded");
        Ok(ideas)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Vec<EnrichedIdea>, ExchangeError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Self::from_text(&raw)
    }

    pub fn from_text(raw: &str) -> Result<Vec<EnrichedIdea>, ExchangeError> {
        Ok(parser::parse_enriched(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn import_recovers_array_wrapped_in_prose() {
        let reply = "Here are the scored ideas:\n```json\n[\
            {\"id\": \"a1\", \"title\": \"Dark mode\", \"roi\": \"7\", \"effort\": 3, \
             \"category\": \"UI/UX\", \"priority\": \"high\", \"composite_score\": 99}\
            ]\n```\nLet me know if you need more.";

        let ideas = EnrichedImporter::from_text(reply).expect("bracketed span parses");
        assert_eq!(ideas.len(), 1);
        let idea = ideas.into_iter().next().expect("one idea").into_idea();
        assert_eq!(idea.roi, Some(7.0));
        assert_eq!(idea.effort, Some(3.0));
        assert_eq!(idea.category, Some(Category::UiUx));
        assert_eq!(idea.priority, Some(Priority::High));
        assert_eq!(idea.composite_score, None);
    }

    #[test]
    fn import_accepts_doc_id_alias_and_skips_incomplete_records() {
        let payload = r#"[
            {"docId": "b2", "title": "Audit log", "deptBoost": 1.5, "reasoning": {"risk": "low"}},
            {"title": "No identifier"},
            {"id": "c3", "title": "   "}
        ]"#;

        let ideas = EnrichedImporter::from_reader(Cursor::new(payload)).expect("parses");
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].id, "b2");
        assert_eq!(ideas[0].dept_boost, Some(1.5));
        assert_eq!(
            ideas[0].reasoning.as_ref().and_then(|r| r.risk.as_deref()),
            Some("low")
        );
    }

    #[test]
    fn import_without_any_array_fails() {
        let error = EnrichedImporter::from_text("The model returned nothing useful.")
            .expect_err("no array present");
        assert!(matches!(error, ExchangeError::Json(_)));
        assert_eq!(parser::outer_array("] backwards ["), None);
    }

    #[test]
    fn import_from_missing_path_is_io_error() {
        match EnrichedImporter::from_path("./does-not-exist.json") {
            Err(ExchangeError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn csv_export_renders_missing_values_as_dash() {
        let mut scored = Idea::new(IdeaId::from("1"), "Dark mode");
        scored.category = Some(Category::UiUx);
        scored.votes = Some(12);
        scored.roi = Some(7.0);
        scored.effort = Some(2.5);
        scored.risk = Some(1.0);
        scored.composite_score = Some(5.6789);
        scored.priority = Some(Priority::High);
        let bare = Idea::new(IdeaId::from("2"), "Offline, drafts");

        let mut buffer = Vec::new();
        write_csv(&mut buffer, &[scored, bare]).expect("csv writes");
        let output = String::from_utf8(buffer).expect("utf8");

        assert_eq!(
            output,
            "Title,Category,Votes,ROI,Effort,Risk,Score,Priority\n\
             Dark mode,UI/UX,12,7,2.5,1,5.68,High\n\
             \"Offline, drafts\",-,-,-,-,-,-,-\n"
        );
    }
}
