use std::io::Write;

use super::super::domain::Idea;

const HEADER: [&str; 8] = [
    "Title", "Category", "Votes", "ROI", "Effort", "Risk", "Score", "Priority",
];
const MISSING: &str = "-";

/// Write the ranked table as CSV in the given order.
pub fn write_csv<W: Write>(writer: W, ideas: &[Idea]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;

    for idea in ideas {
        csv_writer.write_record([
            idea.title.clone(),
            idea.category
                .as_ref()
                .map_or_else(|| MISSING.to_string(), |category| category.label().to_string()),
            idea.votes
                .map_or_else(|| MISSING.to_string(), |votes| votes.to_string()),
            metric_cell(idea.roi),
            metric_cell(idea.effort),
            metric_cell(idea.risk),
            idea.composite_score
                .map_or_else(|| MISSING.to_string(), |score| format!("{score:.2}")),
            idea.priority
                .map_or_else(|| MISSING.to_string(), |priority| priority.label().to_string()),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn metric_cell(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |value| value.to_string())
}
