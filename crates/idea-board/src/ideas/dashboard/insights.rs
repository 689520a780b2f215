use super::super::domain::Idea;
use super::super::scoring::PriorityTier;
use super::views::{AnalysisStep, IdeaAnalysis};

/// Step-by-step narrative for one enriched idea. Missing metrics read as zero.
pub fn analyze(idea: &Idea) -> IdeaAnalysis {
    let votes = idea.votes.unwrap_or(0);
    let roi = idea.roi.unwrap_or(0.0);
    let effort = idea.effort.unwrap_or(0.0);
    let risk = idea.risk.unwrap_or(0.0);
    let alignment = idea.alignment.unwrap_or(0.0);
    let score = idea.composite_score.unwrap_or(0.0);
    let tier = PriorityTier::from_score(score);
    let reasoning = idea.reasoning.clone().unwrap_or_default();

    let interest = if votes > 80 {
        "very strong"
    } else if votes > 60 {
        "strong"
    } else {
        "moderate"
    };
    let value = if roi >= 8.0 {
        "exceptional"
    } else if roi >= 6.0 {
        "good"
    } else {
        "moderate"
    };
    let complexity = if effort >= 7.0 {
        "high"
    } else if effort >= 4.0 {
        "moderate"
    } else {
        "low"
    };
    let exposure = if risk >= 4.0 {
        "significant"
    } else if risk >= 2.0 {
        "moderate"
    } else {
        "low"
    };

    let subject = idea
        .category
        .as_ref()
        .map_or("feature", |category| category.label());

    let steps = vec![
        AnalysisStep {
            thought: "Analyzing feature metrics...",
            analysis: format!(
                "This {subject} has received {votes} votes, indicating {interest} user interest. \
                 The ROI score of {roi}/10 suggests {value} potential value."
            ),
        },
        AnalysisStep {
            thought: "Evaluating implementation complexity...",
            analysis: format!(
                "Implementation effort is rated {effort}/10 ({complexity}) with risk level \
                 {risk}/5 ({exposure}). {}",
                reasoning
                    .effort
                    .as_deref()
                    .unwrap_or("Consider the implementation complexity carefully.")
            ),
        },
        AnalysisStep {
            thought: "Assessing strategic alignment...",
            analysis: format!(
                "Strategic alignment score: {alignment}/5. {}",
                reasoning
                    .alignment
                    .as_deref()
                    .unwrap_or("Evaluate how this aligns with organizational goals.")
            ),
        },
        AnalysisStep {
            thought: "Calculating value metrics...",
            analysis: format!(
                "Composite score: {score:.2}. This places the feature in {} priority category. {}",
                tier.label(),
                idea.explanation.as_deref().unwrap_or_default()
            )
            .trim_end()
            .to_string(),
        },
    ];

    IdeaAnalysis {
        idea_id: idea.id.clone(),
        title: idea.title.clone(),
        tier,
        tier_label: tier.label(),
        steps,
    }
}
