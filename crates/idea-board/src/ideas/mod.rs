//! Idea board: submission, voting, metric editing and the ranked dashboard
//! over a hosted document store.

pub mod dashboard;
pub mod domain;
pub mod exchange;
pub mod ranking;
pub mod router;
pub mod scoring;
pub mod service;
pub mod state;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use dashboard::{analyze, summarize, IdeaAnalysis};
pub use domain::{
    Category, Document, Idea, IdeaId, Metric, Priority, Reasoning, RecordError, VoteDirection,
};
pub use exchange::{write_csv, EnrichedIdea, EnrichedImporter, ExchangeError};
pub use ranking::{rank_and_filter, FilterError, FilterValue, Filters, SortKey};
pub use router::{idea_router, BoardHandle};
pub use scoring::{composite_score, CompositeScore, ScoreBand, ScoreInputs, ScoreUndefined};
pub use service::{BoardError, IdeaBoardService, MetricEditOutcome, PublishSummary, VoteReceipt};
pub use state::{
    BoardAction, BoardState, Dispatch, LoadState, Notice, NoticeLevel, PendingOperation,
    SharedBoardState, MAX_NOTICES,
};
pub use store::{
    Collection, DocumentSet, IdeaStore, SnapshotEvent, StoreError, StoredDocument, WriteBatch,
    WriteKind, WriteOp,
};
pub use validation::{IdeaSubmission, MetricEdit, ValidationErrors};
