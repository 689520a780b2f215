use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{Category, Idea, Priority};

/// Filter value that places no constraint.
pub const ALL: &str = "All";

/// Exact-match filter on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue<T> {
    All,
    Only(T),
}

impl<T> Default for FilterValue<T> {
    fn default() -> Self {
        Self::All
    }
}

impl<T: PartialEq> FilterValue<T> {
    fn admits(&self, value: Option<&T>) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => value == Some(expected),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub category: FilterValue<Category>,
    pub priority: FilterValue<Priority>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
}

impl Filters {
    pub fn all() -> Self {
        Self::default()
    }

    /// Build filters from the raw values of the dashboard controls. Missing
    /// values and `"All"` place no constraint. Both labels match ignoring
    /// ASCII case.
    pub fn parse(category: Option<&str>, priority: Option<&str>) -> Result<Self, FilterError> {
        let category = match category.map(str::trim) {
            None | Some("") => FilterValue::All,
            Some(raw) if raw.eq_ignore_ascii_case(ALL) => FilterValue::All,
            Some(raw) => FilterValue::Only(
                Category::submittable()
                    .into_iter()
                    .find(|known| known.label().eq_ignore_ascii_case(raw))
                    .unwrap_or_else(|| Category::Unlisted(raw.to_string())),
            ),
        };
        let priority = match priority.map(str::trim) {
            None | Some("") => FilterValue::All,
            Some(raw) if raw.eq_ignore_ascii_case(ALL) => FilterValue::All,
            Some(raw) => FilterValue::Only(
                Priority::parse(raw).ok_or_else(|| FilterError::UnknownPriority(raw.to_string()))?,
            ),
        };

        Ok(Self {
            category,
            priority,
            search: None,
        })
    }

    pub fn with_search(mut self, term: Option<String>) -> Self {
        self.search = term.filter(|term| !term.trim().is_empty());
        self
    }

    pub fn matches(&self, idea: &Idea) -> bool {
        self.admits_category(idea.category.as_ref())
            && self.priority.admits(idea.priority.as_ref())
            && self
                .search
                .as_deref()
                .map_or(true, |term| matches_search(idea, term))
    }

    fn admits_category(&self, category: Option<&Category>) -> bool {
        match &self.category {
            FilterValue::All => true,
            FilterValue::Only(expected) => category
                .is_some_and(|category| category.label().eq_ignore_ascii_case(expected.label())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unknown priority filter '{0}' (expected All, High, Medium or Low)")]
    UnknownPriority(String),
    #[error("unknown sort key '{0}' (expected composite_score, roi, votes, effort_asc or risk_asc)")]
    UnknownSortKey(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CompositeScore,
    Roi,
    Votes,
    EffortAsc,
    RiskAsc,
}

impl SortKey {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::CompositeScore,
            Self::Roi,
            Self::Votes,
            Self::EffortAsc,
            Self::RiskAsc,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::CompositeScore => "composite_score",
            Self::Roi => "roi",
            Self::Votes => "votes",
            Self::EffortAsc => "effort_asc",
            Self::RiskAsc => "risk_asc",
        }
    }

    /// Name of the idea field the key sorts on.
    pub const fn field(self) -> &'static str {
        match self {
            Self::CompositeScore => "composite_score",
            Self::Roi => "roi",
            Self::Votes => "votes",
            Self::EffortAsc => "effort",
            Self::RiskAsc => "risk",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CompositeScore => "Score (Highest First)",
            Self::Roi => "ROI (Highest First)",
            Self::Votes => "Votes (Highest First)",
            Self::EffortAsc => "Effort (Lowest First)",
            Self::RiskAsc => "Risk (Lowest First)",
        }
    }

    pub const fn is_ascending(self) -> bool {
        matches!(self, Self::EffortAsc | Self::RiskAsc)
    }

    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let raw = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|key| key.key() == raw)
            .ok_or_else(|| FilterError::UnknownSortKey(raw.to_string()))
    }

    /// The field value, if the idea carries one.
    pub fn value(self, idea: &Idea) -> Option<f64> {
        match self {
            Self::CompositeScore => idea.composite_score,
            Self::Roi => idea.roi,
            Self::Votes => idea.votes.map(|votes| votes as f64),
            Self::EffortAsc => idea.effort,
            Self::RiskAsc => idea.risk,
        }
    }

    /// Missing values rank as negative infinity in both directions.
    fn sort_value(self, idea: &Idea) -> f64 {
        self.value(idea).unwrap_or(f64::NEG_INFINITY)
    }

    fn compare(self, a: &Idea, b: &Idea) -> Ordering {
        let (a, b) = (self.sort_value(a), self.sort_value(b));
        let ordering = if self.is_ascending() {
            a.partial_cmp(&b)
        } else {
            b.partial_cmp(&a)
        };
        ordering.unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Filter then stable-sort a copy of `ideas`. The input is left untouched.
pub fn rank_and_filter(ideas: &[Idea], filters: &Filters, sort: SortKey) -> Vec<Idea> {
    let mut ranked: Vec<Idea> = ideas
        .iter()
        .filter(|idea| filters.matches(idea))
        .cloned()
        .collect();
    ranked.sort_by(|a, b| sort.compare(a, b));
    ranked
}

pub fn matches_search(idea: &Idea, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || idea.title.to_lowercase().contains(&term)
        || idea.description.to_lowercase().contains(&term)
}

/// `"All"` followed by the distinct categories present, in first-seen order.
pub fn category_options(ideas: &[Idea]) -> Vec<String> {
    distinct_with_all(
        ideas
            .iter()
            .filter_map(|idea| idea.category.as_ref().map(|category| category.label())),
    )
}

pub fn priority_options(ideas: &[Idea]) -> Vec<String> {
    distinct_with_all(
        ideas
            .iter()
            .filter_map(|idea| idea.priority.map(Priority::label)),
    )
}

fn distinct_with_all<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut options = vec![ALL.to_string()];
    for value in values {
        if !value.is_empty() && !options.iter().any(|existing| existing == value) {
            options.push(value.to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ideas::domain::IdeaId;

    fn idea(id: &str, score: Option<f64>, effort: Option<f64>) -> Idea {
        let mut idea = Idea::new(IdeaId::from(id), format!("Idea {id}"));
        idea.composite_score = score;
        idea.effort = effort;
        idea
    }

    fn ids(ideas: &[Idea]) -> Vec<&str> {
        ideas.iter().map(|idea| idea.id.as_str()).collect()
    }

    #[test]
    fn descending_sort_puts_missing_scores_last_even_below_negatives() {
        let ideas = vec![
            idea("unscored", None, None),
            idea("negative", Some(-2.5), None),
            idea("high", Some(3.0), None),
            idea("zero", Some(0.0), None),
        ];

        let ranked = rank_and_filter(&ideas, &Filters::all(), SortKey::CompositeScore);
        assert_eq!(ids(&ranked), ["high", "zero", "negative", "unscored"]);
        assert_eq!(ids(&ideas), ["unscored", "negative", "high", "zero"]);
    }

    #[test]
    fn ascending_sort_treats_missing_as_lowest() {
        let ideas = vec![
            idea("heavy", None, Some(8.0)),
            idea("unknown", None, None),
            idea("light", None, Some(2.0)),
        ];

        let ranked = rank_and_filter(&ideas, &Filters::all(), SortKey::EffortAsc);
        assert_eq!(ids(&ranked), ["unknown", "light", "heavy"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let ideas = vec![
            idea("b", Some(1.0), None),
            idea("a", Some(1.0), None),
            idea("c", Some(1.0), None),
        ];
        let ranked = rank_and_filter(&ideas, &Filters::all(), SortKey::CompositeScore);
        assert_eq!(ids(&ranked), ["b", "a", "c"]);
    }

    #[test]
    fn parse_filters_and_sort_keys() {
        let filters = Filters::parse(Some("AI"), Some("high")).expect("filters parse");
        assert_eq!(filters.category, FilterValue::Only(Category::Ai));
        assert_eq!(filters.priority, FilterValue::Only(Priority::High));

        assert_eq!(
            Filters::parse(Some("All"), None).expect("all parses"),
            Filters::all()
        );
        assert_eq!(
            Filters::parse(None, Some("urgent")),
            Err(FilterError::UnknownPriority("urgent".to_string()))
        );

        assert_eq!(SortKey::parse("risk_asc"), Ok(SortKey::RiskAsc));
        assert!(SortKey::parse("title").is_err());
        assert_eq!(SortKey::default(), SortKey::CompositeScore);
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let mut sample = idea("search", None, None);
        sample.title = "Dark Mode".to_string();
        sample.description = "Reduce eye strain at night".to_string();

        assert!(matches_search(&sample, "dark"));
        assert!(matches_search(&sample, "EYE"));
        assert!(matches_search(&sample, "  "));
        assert!(!matches_search(&sample, "export"));
    }

    #[test]
    fn options_list_distinct_values_after_all() {
        let mut first = idea("1", None, None);
        first.category = Some(Category::Ai);
        first.priority = Some(Priority::Low);
        let mut second = idea("2", None, None);
        second.category = Some(Category::Mobile);
        let mut third = idea("3", None, None);
        third.category = Some(Category::Ai);
        third.priority = Some(Priority::High);

        let ideas = vec![first, second, third];
        assert_eq!(category_options(&ideas), ["All", "AI", "Mobile"]);
        assert_eq!(priority_options(&ideas), ["All", "Low", "High"]);
    }
}
