use crate::infra::InMemoryIdeaStore;
use clap::Args;
use idea_board::error::AppError;
use idea_board::ideas::dashboard::{summarize, DEFAULT_TOP_FEATURES};
use idea_board::ideas::{
    analyze, composite_score, rank_and_filter, write_csv, BoardError, Collection,
    EnrichedImporter, ExchangeError, Filters, Idea, IdeaBoardService, IdeaStore, IdeaSubmission,
    Metric, MetricEdit, ScoreBand, ScoreInputs, SortKey, VoteDirection,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_ENRICHED: &str = r#"[
  {"id": "idea-seed-1", "title": "Semantic search for the help center", "category": "AI",
   "description": "Rank help articles by meaning rather than keywords.",
   "roi": 8, "effort": 2, "risk": 1, "alignment": 3, "priority": "High",
   "reasoning": {"roi": "Deflects a large share of support tickets."}},
  {"id": "idea-seed-2", "title": "Dark mode", "category": "UI/UX",
   "description": "Offer a darker theme for night shifts.",
   "roi": 4, "effort": 3, "risk": 1, "alignment": 2, "priority": "Medium"},
  {"id": "idea-seed-3", "title": "Kiosk mode for shared tablets", "category": "Mobile",
   "description": "Lock shared devices to the capture screen.",
   "roi": 3, "effort": 6, "risk": 2, "alignment": 1, "priority": "Low"}
]"#;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Enriched export to seed the board with instead of the built-in sample.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Number of ideas in the top features list.
    #[arg(long, default_value_t = DEFAULT_TOP_FEATURES)]
    pub(crate) top: usize,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Enriched export (JSON array, optionally wrapped in prose)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Only keep ideas in this category
    #[arg(long)]
    pub(crate) category: Option<String>,
    /// Only keep ideas with this priority (High, Medium, Low)
    #[arg(long)]
    pub(crate) priority: Option<String>,
    /// Sort key: composite_score, roi, votes, effort_asc or risk_asc
    #[arg(long, default_value = "composite_score")]
    pub(crate) sort: String,
    /// Case-insensitive search over title and description
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Emit the ranked table as CSV on stdout
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    #[arg(long)]
    pub(crate) roi: f64,
    #[arg(long)]
    pub(crate) effort: f64,
    #[arg(long)]
    pub(crate) risk: f64,
    #[arg(long, default_value_t = 0.0)]
    pub(crate) alignment: f64,
    #[arg(long, default_value_t = 0)]
    pub(crate) votes: i64,
    #[arg(long, default_value_t = 1.0)]
    pub(crate) dept_boost: f64,
    #[arg(long, default_value_t = 1.0)]
    pub(crate) dept_effort_mod: f64,
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        input,
        category,
        priority,
        sort,
        search,
        csv,
    } = args;

    let filters = Filters::parse(category.as_deref(), priority.as_deref())
        .map_err(|err| invalid_argument(err.to_string()))?
        .with_search(search);
    let sort = SortKey::parse(&sort).map_err(|err| invalid_argument(err.to_string()))?;

    let ideas: Vec<Idea> = EnrichedImporter::from_path(&input)?
        .into_iter()
        .map(|enriched| enriched.into_idea())
        .collect();
    let ranked = rank_and_filter(&ideas, &filters, sort);

    if csv {
        write_csv(io::stdout().lock(), &ranked).map_err(ExchangeError::from)?;
        return Ok(());
    }

    println!(
        "{} of {} ideas, sorted by {}",
        ranked.len(),
        ideas.len(),
        sort.label()
    );
    render_table(&ranked);
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let inputs = ScoreInputs {
        roi: args.roi,
        alignment: args.alignment,
        votes: args.votes as f64,
        effort: args.effort,
        risk: args.risk,
        dept_boost: args.dept_boost,
        dept_effort_mod: args.dept_effort_mod,
    };

    match composite_score(&inputs) {
        Ok(score) => println!(
            "Composite score: {score:.2} ({})",
            ScoreBand::from_score(score).label()
        ),
        Err(undefined) => println!("Composite score: undefined ({undefined})"),
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(InMemoryIdeaStore::default());
    let service = IdeaBoardService::new(Arc::clone(&store));

    println!("Idea board demo");
    let enriched = match &args.seed {
        Some(path) => EnrichedImporter::from_path(path)?,
        None => EnrichedImporter::from_text(SAMPLE_ENRICHED)?,
    };
    let summary = service.publish_enriched(enriched)?;
    println!("- Published {} enriched ideas", summary.published);

    let submitted = service.submit(IdeaSubmission {
        title: "Offline idea capture".to_string(),
        category: "Mobile".to_string(),
        description: "Let field staff capture ideas without a connection.".to_string(),
    })?;
    println!("- Submitted \"{}\" as {}", submitted.title, submitted.id);

    let leader = service.enriched()?;
    if let Some(first) = leader.first() {
        let receipt = service.vote(&first.id, VoteDirection::Up)?;
        println!(
            "- Upvoted \"{}\" (mirrored: {}, score: {})",
            first.title,
            receipt.mirrored,
            receipt
                .composite_score
                .and_then(|score| score.value())
                .map_or_else(|| "-".to_string(), |score| format!("{score:.2}"))
        );

        let edit = MetricEdit::new(Metric::Effort, 4).map_err(BoardError::from)?;
        let outcome = service.edit_metric(&first.id, edit)?;
        println!(
            "- Set {} of \"{}\" to {} (score: {})",
            outcome.metric.label(),
            first.title,
            outcome.value,
            outcome
                .composite_score
                .value()
                .map_or_else(|| "undefined".to_string(), |score| format!("{score:.2}"))
        );
    }

    let ideas = service.enriched()?;
    let sort = SortKey::default();
    let ranked = rank_and_filter(&ideas, &Filters::default(), sort);
    let dashboard = summarize(&ranked, &ideas, sort, args.top);

    println!("\nRanked ideas ({})", dashboard.sort_label);
    render_table(&ranked);

    println!("\nMetric averages");
    for average in &dashboard.metric_averages {
        println!("- {}: {:.1}", average.name, average.value);
    }

    println!("\nCategories");
    for category in &dashboard.category_breakdown {
        println!(
            "- {}: {} idea(s), avg score {:.2}",
            category.name, category.count, category.avg_score
        );
    }

    if let Some(top) = ranked.first() {
        let analysis = analyze(top);
        println!("\nAnalysis of \"{}\" ({})", analysis.title, analysis.tier_label);
        for step in &analysis.steps {
            println!("- {}: {}", step.thought, step.analysis);
        }
    }

    let submissions = store
        .list(Collection::Input)
        .map_err(BoardError::from)?
        .len();
    println!("\nSubmissions awaiting enrichment: {submissions}");
    Ok(())
}

fn render_table(ideas: &[Idea]) {
    println!(
        "{:<36} {:<14} {:>6} {:>5} {:>6} {:>5} {:>7}  {}",
        "Title", "Category", "Votes", "ROI", "Effort", "Risk", "Score", "Priority"
    );
    for idea in ideas {
        println!(
            "{:<36} {:<14} {:>6} {:>5} {:>6} {:>5} {:>7}  {}",
            truncate(&idea.title, 36),
            idea.category
                .as_ref()
                .map_or("-", |category| category.label()),
            idea.votes.map_or_else(|| "-".to_string(), |votes| votes.to_string()),
            cell(idea.roi),
            cell(idea.effort),
            cell(idea.risk),
            idea.composite_score
                .map_or_else(|| "-".to_string(), |score| format!("{score:.2}")),
            idea.priority.map_or("-", |priority| priority.label()),
        );
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

fn invalid_argument(message: String) -> AppError {
    AppError::Io(io::Error::new(io::ErrorKind::InvalidInput, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_payload_parses() {
        let ideas = EnrichedImporter::from_text(SAMPLE_ENRICHED).expect("sample parses");
        assert_eq!(ideas.len(), 3);
    }

    #[test]
    fn demo_runs_against_the_built_in_sample() {
        run_demo(DemoArgs {
            seed: None,
            top: 3,
        })
        .expect("demo completes");
    }

    #[test]
    fn rank_rejects_unknown_sort_before_reading_input() {
        let result = run_rank(RankArgs {
            input: PathBuf::from("does-not-exist.json"),
            category: None,
            priority: None,
            sort: "title".to_string(),
            search: None,
            csv: false,
        });
        assert!(matches!(result, Err(AppError::Io(err)) if err.kind() == io::ErrorKind::InvalidInput));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Überraschung", 20), "Überraschung");
        assert_eq!(truncate("Überraschungsei", 8), "Überr...");
    }
}
