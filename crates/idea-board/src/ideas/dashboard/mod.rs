//! Analytics over the ranked idea list: metric averages, per-category
//! breakdown, the top features chart, the effort/ROI scatter and the
//! per-idea analysis narrative.

mod insights;
pub mod views;

use std::collections::HashMap;

use super::domain::Idea;
use super::ranking::{category_options, priority_options, SortKey};
use super::scoring::ScoreBand;
use views::{CategoryBreakdown, DashboardSummary, MetricAverage, ScatterPoint, TopFeature};

pub use insights::analyze;
pub use views::{AnalysisStep, IdeaAnalysis};

pub const DEFAULT_TOP_FEATURES: usize = 8;
const TOP_FEATURE_NAME_CHARS: usize = 15;
const UNCATEGORIZED: &str = "Uncategorized";

/// Summarize `ranked` (already filtered and sorted). Filter options are drawn
/// from `all` so every choice stays reachable.
pub fn summarize(ranked: &[Idea], all: &[Idea], sort: SortKey, top_limit: usize) -> DashboardSummary {
    DashboardSummary {
        sort,
        sort_label: sort.label(),
        matching: ranked.len(),
        total: all.len(),
        categories: category_options(all),
        priorities: priority_options(all),
        metric_averages: metric_averages(ranked),
        category_breakdown: category_breakdown(ranked),
        top_features: top_features(ranked, sort, top_limit),
        scatter: scatter_points(ranked),
    }
}

fn metric_averages(ideas: &[Idea]) -> Vec<MetricAverage> {
    if ideas.is_empty() {
        return Vec::new();
    }

    let count = ideas.len() as f64;
    let average = |value: fn(&Idea) -> Option<f64>| {
        let total: f64 = ideas.iter().map(|idea| value(idea).unwrap_or(0.0)).sum();
        round_to(total / count, 1)
    };

    vec![
        MetricAverage {
            name: "Avg ROI",
            value: average(|idea| idea.roi),
        },
        MetricAverage {
            name: "Avg Effort",
            value: average(|idea| idea.effort),
        },
        MetricAverage {
            name: "Avg Alignment",
            value: average(|idea| idea.alignment),
        },
        MetricAverage {
            name: "Avg Risk",
            value: average(|idea| idea.risk),
        },
    ]
}

fn category_breakdown(ideas: &[Idea]) -> Vec<CategoryBreakdown> {
    struct Tally {
        count: usize,
        total_score: f64,
        scored: usize,
    }

    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, Tally> = HashMap::new();
    for idea in ideas {
        let name = idea
            .category
            .as_ref()
            .map(|category| category.label())
            .filter(|label| !label.is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        let tally = tallies.entry(name.clone()).or_insert_with(|| {
            order.push(name);
            Tally {
                count: 0,
                total_score: 0.0,
                scored: 0,
            }
        });
        tally.count += 1;
        if let Some(score) = idea.composite_score {
            tally.total_score += score;
            tally.scored += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|name| {
            let tally = tallies.remove(&name)?;
            let avg_score = if tally.scored > 0 {
                round_to(tally.total_score / tally.scored as f64, 2)
            } else {
                0.0
            };
            Some(CategoryBreakdown {
                name,
                count: tally.count,
                avg_score,
            })
        })
        .collect()
}

fn top_features(ideas: &[Idea], sort: SortKey, limit: usize) -> Vec<TopFeature> {
    ideas
        .iter()
        .take(limit)
        .map(|idea| TopFeature {
            id: idea.id.clone(),
            name: short_name(&idea.title),
            title: idea.title.clone(),
            value: sort.value(idea).unwrap_or(0.0),
            priority: idea.priority,
            band: idea.composite_score.map(ScoreBand::from_score),
        })
        .collect()
}

fn scatter_points(ideas: &[Idea]) -> Vec<ScatterPoint> {
    ideas
        .iter()
        .filter_map(|idea| {
            Some(ScatterPoint {
                id: idea.id.clone(),
                title: idea.title.clone(),
                x: idea.effort?,
                y: idea.roi?,
                z: idea.votes.unwrap_or(0),
                priority: idea.priority,
                composite_score: idea.composite_score,
            })
        })
        .collect()
}

fn short_name(title: &str) -> String {
    if title.chars().count() > TOP_FEATURE_NAME_CHARS {
        let head: String = title.chars().take(TOP_FEATURE_NAME_CHARS).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
