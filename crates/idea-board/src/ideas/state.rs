use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{Idea, IdeaId, Metric, VoteDirection};
use super::scoring::CompositeScore;
use super::service::BoardError;

/// Where the live list stands relative to the store subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Ready,
    Failed { message: String },
}

impl LoadState {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

/// An inline metric editor currently open on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenEditor {
    pub idea_id: IdeaId,
    pub metric: Metric,
    pub draft: String,
}

/// Store operation in flight. At most one of each is outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingOperation {
    Vote { idea_id: IdeaId },
    MetricEdit { idea_id: IdeaId, metric: Metric },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Transient, dismissible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn submitted() -> Self {
        Self::new(
            NoticeLevel::Success,
            "Idea Submitted!",
            "Thank you for your contribution.",
        )
    }

    pub fn submission_failed(error: &BoardError) -> Self {
        Self::new(NoticeLevel::Error, "Submission Failed", error.to_string())
    }

    pub fn vote_failed(direction: VoteDirection, error: &BoardError) -> Self {
        let title = match direction {
            VoteDirection::Up => "Failed to upvote",
            VoteDirection::Down => "Failed to downvote",
        };
        Self::new(NoticeLevel::Error, title, error.to_string())
    }

    pub fn metric_updated(metric: Metric, score: CompositeScore) -> Self {
        match score {
            CompositeScore::Defined(value) => Self::new(
                NoticeLevel::Success,
                format!("{} updated", metric.label()),
                format!("Composite score is now {value:.2}."),
            ),
            CompositeScore::Undefined => Self::new(
                NoticeLevel::Warning,
                format!("{} updated", metric.label()),
                "Composite score is undefined while effort or risk is zero.",
            ),
        }
    }

    pub fn metric_update_failed(metric: Metric, error: &BoardError) -> Self {
        Self::new(
            NoticeLevel::Error,
            format!("Failed to update {}", metric.label()),
            error.to_string(),
        )
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, "Failed to load ideas", message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoticeEntry {
    pub id: u64,
    #[serde(flatten)]
    pub notice: Notice,
}

/// Every transition the board state accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardAction {
    /// Full replacement from a store snapshot.
    SnapshotReplaced(Vec<Idea>),
    SubscriptionFailed { message: String },
    EditorOpened { idea_id: IdeaId, metric: Metric },
    EditorDraftChanged(String),
    EditorClosed,
    OperationStarted(PendingOperation),
    OperationSettled {
        operation: PendingOperation,
        notice: Option<Notice>,
    },
    NoticePosted(Notice),
    NoticeDismissed(u64),
}

/// Notices kept for display; posting past this drops the oldest.
pub const MAX_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    Ignored,
}

/// Dashboard state container. Rendering reads it, nothing writes it except
/// [`BoardState::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    ideas: Vec<Idea>,
    load: LoadState,
    editor: Option<OpenEditor>,
    pending: HashSet<PendingOperation>,
    notices: Vec<NoticeEntry>,
    next_notice_id: u64,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            ideas: Vec::new(),
            load: LoadState::Loading,
            editor: None,
            pending: HashSet::new(),
            notices: Vec::new(),
            next_notice_id: 1,
        }
    }
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    pub fn load(&self) -> &LoadState {
        &self.load
    }

    pub fn editor(&self) -> Option<&OpenEditor> {
        self.editor.as_ref()
    }

    pub fn notices(&self) -> &[NoticeEntry] {
        &self.notices
    }

    pub fn is_pending(&self, operation: &PendingOperation) -> bool {
        self.pending.contains(operation)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn dispatch(&mut self, action: BoardAction) -> Dispatch {
        match action {
            BoardAction::SnapshotReplaced(ideas) => {
                if let Some(editor) = &self.editor {
                    if !ideas.iter().any(|idea| idea.id == editor.idea_id) {
                        debug!(idea_id = %editor.idea_id, "closing editor for removed idea");
                        self.editor = None;
                    }
                }
                debug!(count = ideas.len(), "idea snapshot replaced");
                self.ideas = ideas;
                self.load = LoadState::Ready;
                Dispatch::Applied
            }
            BoardAction::SubscriptionFailed { message } => {
                warn!(error = %message, "idea subscription failed");
                self.push_notice(Notice::load_failed(message.clone()));
                self.load = LoadState::Failed { message };
                Dispatch::Applied
            }
            BoardAction::EditorOpened { idea_id, metric } => {
                let Some(idea) = self.ideas.iter().find(|idea| idea.id == idea_id) else {
                    return Dispatch::Ignored;
                };
                let draft = idea
                    .metric(metric)
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                self.editor = Some(OpenEditor {
                    idea_id,
                    metric,
                    draft,
                });
                Dispatch::Applied
            }
            BoardAction::EditorDraftChanged(draft) => match self.editor.as_mut() {
                Some(editor) => {
                    editor.draft = draft;
                    Dispatch::Applied
                }
                None => Dispatch::Ignored,
            },
            BoardAction::EditorClosed => {
                if self.editor.take().is_some() {
                    Dispatch::Applied
                } else {
                    Dispatch::Ignored
                }
            }
            BoardAction::OperationStarted(operation) => {
                if self.pending.insert(operation) {
                    Dispatch::Applied
                } else {
                    Dispatch::Ignored
                }
            }
            BoardAction::OperationSettled { operation, notice } => {
                if let PendingOperation::MetricEdit { idea_id, metric } = &operation {
                    let editing_same = self
                        .editor
                        .as_ref()
                        .is_some_and(|editor| &editor.idea_id == idea_id && editor.metric == *metric);
                    if editing_same {
                        self.editor = None;
                    }
                }
                self.pending.remove(&operation);
                if let Some(notice) = notice {
                    self.push_notice(notice);
                }
                Dispatch::Applied
            }
            BoardAction::NoticePosted(notice) => {
                self.push_notice(notice);
                Dispatch::Applied
            }
            BoardAction::NoticeDismissed(id) => {
                let before = self.notices.len();
                self.notices.retain(|entry| entry.id != id);
                if self.notices.len() < before {
                    Dispatch::Applied
                } else {
                    Dispatch::Ignored
                }
            }
        }
    }

    fn push_notice(&mut self, notice: Notice) {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push(NoticeEntry { id, notice });
        if self.notices.len() > MAX_NOTICES {
            let excess = self.notices.len() - MAX_NOTICES;
            self.notices.drain(..excess);
        }
    }
}

/// Board state shared between HTTP handlers and the live feed.
#[derive(Debug, Clone, Default)]
pub struct SharedBoardState {
    inner: Arc<RwLock<BoardState>>,
}

impl SharedBoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, action: BoardAction) -> Dispatch {
        self.write().dispatch(action)
    }

    /// Run `f` against a consistent view of the state.
    pub fn read<T>(&self, f: impl FnOnce(&BoardState) -> T) -> T {
        f(&self.read_guard())
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, BoardState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
