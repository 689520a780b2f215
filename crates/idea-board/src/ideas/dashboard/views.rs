use serde::Serialize;

use super::super::domain::{IdeaId, Priority};
use super::super::ranking::SortKey;
use super::super::scoring::{PriorityTier, ScoreBand};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAverage {
    pub name: &'static str,
    /// Rounded to one decimal place.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub name: String,
    pub count: usize,
    /// Mean over the ideas carrying a score, two decimals; zero when none do.
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFeature {
    pub id: IdeaId,
    pub name: String,
    pub title: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<ScoreBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub id: IdeaId,
    pub title: String,
    /// Effort.
    pub x: f64,
    /// ROI.
    pub y: f64,
    /// Votes.
    pub z: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub sort: SortKey,
    pub sort_label: &'static str,
    pub matching: usize,
    pub total: usize,
    pub categories: Vec<String>,
    pub priorities: Vec<String>,
    pub metric_averages: Vec<MetricAverage>,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub top_features: Vec<TopFeature>,
    pub scatter: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStep {
    pub thought: &'static str,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeaAnalysis {
    pub idea_id: IdeaId,
    pub title: String,
    pub tier: PriorityTier,
    pub tier_label: &'static str,
    pub steps: Vec<AnalysisStep>,
}
