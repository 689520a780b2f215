//! Composite score engine.
//!
//! `score = (roi * 2 + alignment * dept_boost + votes / 100) / (effort * risk * dept_effort_mod)`

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::domain::Idea;

/// Inputs of the composite score with the per-field defaults already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    pub roi: f64,
    pub alignment: f64,
    pub votes: f64,
    pub effort: f64,
    pub risk: f64,
    pub dept_boost: f64,
    pub dept_effort_mod: f64,
}

impl Default for ScoreInputs {
    fn default() -> Self {
        Self {
            roi: 0.0,
            alignment: 0.0,
            votes: 0.0,
            effort: 1.0,
            risk: 1.0,
            dept_boost: 1.0,
            dept_effort_mod: 1.0,
        }
    }
}

impl ScoreInputs {
    /// Absent fields take their defaults. A present zero is kept, so an explicit
    /// zero effort or risk leaves the score undefined.
    pub fn from_idea(idea: &Idea) -> Self {
        let defaults = Self::default();
        Self {
            roi: idea.roi.unwrap_or(defaults.roi),
            alignment: idea.alignment.unwrap_or(defaults.alignment),
            votes: idea.votes.map(|votes| votes as f64).unwrap_or(defaults.votes),
            effort: idea.effort.unwrap_or(defaults.effort),
            risk: idea.risk.unwrap_or(defaults.risk),
            dept_boost: idea.dept_boost.unwrap_or(defaults.dept_boost),
            dept_effort_mod: idea.dept_effort_mod.unwrap_or(defaults.dept_effort_mod),
        }
    }
}

/// The denominator of the composite score is zero (or the inputs are not finite).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("composite score is undefined: effort, risk and department effort modifier must be non-zero")]
pub struct ScoreUndefined;

pub fn composite_score(inputs: &ScoreInputs) -> Result<f64, ScoreUndefined> {
    let denominator = inputs.effort * inputs.risk * inputs.dept_effort_mod;
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(ScoreUndefined);
    }

    let numerator = inputs.roi * 2.0 + inputs.alignment * inputs.dept_boost + inputs.votes / 100.0;
    let score = numerator / denominator;
    if score.is_finite() {
        Ok(score)
    } else {
        Err(ScoreUndefined)
    }
}

/// Stored form of a score: a number, or the explicit `null` marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompositeScore {
    Defined(f64),
    Undefined,
}

impl CompositeScore {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Defined(score) => Some(score),
            Self::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Self::Defined(_))
    }

    pub fn to_json(self) -> Value {
        match self {
            Self::Defined(score) => Value::from(score),
            Self::Undefined => Value::Null,
        }
    }
}

impl From<Result<f64, ScoreUndefined>> for CompositeScore {
    fn from(result: Result<f64, ScoreUndefined>) -> Self {
        match result {
            Ok(score) => Self::Defined(score),
            Err(ScoreUndefined) => Self::Undefined,
        }
    }
}

impl Serialize for CompositeScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

pub fn score_idea(idea: &Idea) -> CompositeScore {
    composite_score(&ScoreInputs::from_idea(idea)).into()
}

/// Recompute and store the score on the idea itself.
pub fn rescore(idea: &mut Idea) -> CompositeScore {
    let score = score_idea(idea);
    idea.composite_score = score.value();
    score
}

/// Colour band used by the feature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::Strong
        } else if score > 0.5 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
        }
    }
}

/// Priority tier implied by a score, used by the analysis narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

impl PriorityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 1.0 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}
