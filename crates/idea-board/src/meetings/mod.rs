//! Structured meeting summaries: TL;DR, minutes and action items recovered from
//! the sectioned text a summarizer returns for a transcript.

mod router;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use router::meeting_router;

const TASK_LABEL: &str = "Task Name";
const OWNER_LABEL: &str = "Assigned Owner";
const DEADLINE_LABEL: &str = "Deadline";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub tl_dr: String,
    pub meeting_minutes: Vec<String>,
    pub action_items: Vec<ActionItem>,
}

impl MeetingSummary {
    pub fn is_empty(&self) -> bool {
        self.tl_dr.is_empty() && self.meeting_minutes.is_empty() && self.action_items.is_empty()
    }
}

/// Empty owner or deadline means the summary named none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub task: String,
    pub owner: String,
    pub deadline: String,
}

struct Sections {
    tl_dr: Regex,
    minutes: Regex,
    actions: Regex,
}

fn sections() -> &'static Sections {
    static SECTIONS: OnceLock<Sections> = OnceLock::new();
    SECTIONS.get_or_init(|| Sections {
        tl_dr: Regex::new(r"(?s)=== TL;DR ===\s*(.+?)\s*=== Meeting Minutes ===")
            .expect("tl;dr pattern compiles"),
        minutes: Regex::new(r"(?s)=== Meeting Minutes ===\s*(.+?)\s*=== Action Items ===")
            .expect("minutes pattern compiles"),
        actions: Regex::new(r"(?s)=== Action Items ===\s*(.+)").expect("actions pattern compiles"),
    })
}

/// Split summarizer output into its three sections. Missing sections stay
/// empty; text outside the markers is ignored.
pub fn parse_summary(raw: &str) -> MeetingSummary {
    let sections = sections();
    let capture = |pattern: &Regex| {
        pattern
            .captures(raw)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str().trim())
    };

    let summary = MeetingSummary {
        tl_dr: capture(&sections.tl_dr).unwrap_or_default().to_string(),
        meeting_minutes: capture(&sections.minutes)
            .map(parse_minutes)
            .unwrap_or_default(),
        action_items: capture(&sections.actions)
            .map(parse_action_items)
            .unwrap_or_default(),
    };
    debug!(
        minutes = summary.meeting_minutes.len(),
        action_items = summary.action_items.len(),
        "meeting summary parsed"
    );
    summary
}

fn parse_minutes(block: &str) -> Vec<String> {
    block
        .lines()
        .map(|line| line.trim_matches(|c: char| c == '•' || c == '*' || c == '-' || c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Each `Task Name` line opens an item; owner and deadline lines fill the open
/// item. Lines before the first task are dropped.
fn parse_action_items(block: &str) -> Vec<ActionItem> {
    let mut items: Vec<ActionItem> = Vec::new();
    for line in block.lines() {
        if let Some(task) = labelled_value(line, TASK_LABEL) {
            items.push(ActionItem {
                task,
                ..ActionItem::default()
            });
        } else if let Some(owner) = labelled_value(line, OWNER_LABEL) {
            if let Some(item) = items.last_mut() {
                item.owner = owner;
            }
        } else if let Some(deadline) = labelled_value(line, DEADLINE_LABEL) {
            if let Some(item) = items.last_mut() {
                item.deadline = deadline;
            }
        }
    }
    items
}

fn labelled_value(line: &str, label: &str) -> Option<String> {
    let (_, rest) = line.split_once(label)?;
    Some(
        rest.trim_matches(|c: char| c == '*' || c == ':' || c == '-' || c.is_whitespace())
            .to_string(),
    )
}
