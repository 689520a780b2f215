use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::dashboard::{self, DEFAULT_TOP_FEATURES};
use super::domain::{IdeaId, VoteDirection};
use super::exchange::EnrichedImporter;
use super::ranking::{rank_and_filter, Filters, SortKey};
use super::scoring::ScoreBand;
use super::service::{BoardError, IdeaBoardService};
use super::state::{BoardAction, Dispatch, LoadState, Notice, PendingOperation, SharedBoardState};
use super::store::IdeaStore;
use super::validation::{IdeaSubmission, MetricEdit};

/// Everything the idea handlers share.
pub struct BoardHandle<S> {
    pub service: Arc<IdeaBoardService<S>>,
    pub state: SharedBoardState,
    pub top_features: usize,
}

impl<S> BoardHandle<S> {
    pub fn new(service: Arc<IdeaBoardService<S>>, state: SharedBoardState) -> Self {
        Self {
            service,
            state,
            top_features: DEFAULT_TOP_FEATURES,
        }
    }

    pub fn with_top_features(mut self, top_features: usize) -> Self {
        self.top_features = top_features;
        self
    }
}

impl<S> Clone for BoardHandle<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            state: self.state.clone(),
            top_features: self.top_features,
        }
    }
}

/// Router builder exposing the idea board endpoints.
pub fn idea_router<S>(board: BoardHandle<S>) -> Router
where
    S: IdeaStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/ideas",
            post(submit_handler::<S>).get(list_handler::<S>),
        )
        .route("/api/v1/ideas/enriched", post(import_handler::<S>))
        .route("/api/v1/ideas/:idea_id/votes", post(vote_handler::<S>))
        .route("/api/v1/ideas/:idea_id/metrics", put(metric_handler::<S>))
        .route("/api/v1/ideas/:idea_id/analysis", get(analysis_handler::<S>))
        .route("/api/v1/dashboard", get(dashboard_handler::<S>))
        .route("/api/v1/notices/:notice_id", delete(dismiss_notice_handler::<S>))
        .with_state(board)
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

#[derive(Debug, Deserialize)]
pub struct MetricRequest {
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub category: Option<String>,
    pub priority: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
}

pub(crate) fn board_status(error: &BoardError) -> StatusCode {
    match error {
        BoardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BoardError::NotFound(_) => StatusCode::NOT_FOUND,
        BoardError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        BoardError::StoreRejected(_) => StatusCode::CONFLICT,
        BoardError::PartialVoteFailure { .. } => StatusCode::BAD_GATEWAY,
        BoardError::MalformedRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: &BoardError) -> Response {
    let payload = match error {
        BoardError::Validation(errors) => json!({
            "error": error.to_string(),
            "fields": errors.errors,
        }),
        BoardError::PartialVoteFailure {
            idea_id,
            compensated,
            ..
        } => json!({
            "error": error.to_string(),
            "idea_id": idea_id,
            "compensated": compensated,
        }),
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (board_status(error), axum::Json(payload)).into_response()
}

fn pending_response(operation: &PendingOperation) -> Response {
    let payload = json!({
        "error": "an identical operation is already in progress",
        "pending": operation,
    });
    (StatusCode::CONFLICT, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<S>(
    State(board): State<BoardHandle<S>>,
    axum::Json(submission): axum::Json<IdeaSubmission>,
) -> Response
where
    S: IdeaStore + 'static,
{
    match board.service.submit(submission) {
        Ok(idea) => {
            board
                .state
                .dispatch(BoardAction::NoticePosted(Notice::submitted()));
            (StatusCode::CREATED, axum::Json(idea)).into_response()
        }
        Err(error @ BoardError::Validation(_)) => error_response(&error),
        Err(error) => {
            warn!(error = %error, "idea submission failed");
            board
                .state
                .dispatch(BoardAction::NoticePosted(Notice::submission_failed(&error)));
            error_response(&error)
        }
    }
}

pub(crate) async fn list_handler<S>(
    State(board): State<BoardHandle<S>>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    S: IdeaStore + 'static,
{
    match board.service.submissions(query.search) {
        Ok(ideas) => (StatusCode::OK, axum::Json(json!({ "ideas": ideas }))).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn vote_handler<S>(
    State(board): State<BoardHandle<S>>,
    Path(idea_id): Path<String>,
    axum::Json(request): axum::Json<VoteRequest>,
) -> Response
where
    S: IdeaStore + 'static,
{
    let id = IdeaId(idea_id);
    let operation = PendingOperation::Vote {
        idea_id: id.clone(),
    };
    if board
        .state
        .dispatch(BoardAction::OperationStarted(operation.clone()))
        == Dispatch::Ignored
    {
        return pending_response(&operation);
    }

    let result = board.service.vote(&id, request.direction);
    let notice = match &result {
        Ok(_) => None,
        Err(error) => {
            warn!(idea_id = %id, error = %error, "vote failed");
            Some(Notice::vote_failed(request.direction, error))
        }
    };
    board
        .state
        .dispatch(BoardAction::OperationSettled { operation, notice });

    match result {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn metric_handler<S>(
    State(board): State<BoardHandle<S>>,
    Path(idea_id): Path<String>,
    axum::Json(request): axum::Json<MetricRequest>,
) -> Response
where
    S: IdeaStore + 'static,
{
    let edit = match MetricEdit::parse(&request.field, &request.value) {
        Ok(edit) => edit,
        Err(errors) => return error_response(&BoardError::Validation(errors)),
    };

    let id = IdeaId(idea_id);
    let operation = PendingOperation::MetricEdit {
        idea_id: id.clone(),
        metric: edit.metric,
    };
    if board
        .state
        .dispatch(BoardAction::OperationStarted(operation.clone()))
        == Dispatch::Ignored
    {
        return pending_response(&operation);
    }

    let result = board.service.edit_metric(&id, edit);
    let notice = match &result {
        Ok(outcome) => Notice::metric_updated(outcome.metric, outcome.composite_score),
        Err(error) => Notice::metric_update_failed(edit.metric, error),
    };
    board.state.dispatch(BoardAction::OperationSettled {
        operation,
        notice: Some(notice),
    });

    match result {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn import_handler<S>(
    State(board): State<BoardHandle<S>>,
    body: String,
) -> Response
where
    S: IdeaStore + 'static,
{
    let ideas = match EnrichedImporter::from_text(&body) {
        Ok(ideas) => ideas,
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match board.service.publish_enriched(ideas) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn dashboard_handler<S>(
    State(board): State<BoardHandle<S>>,
    Query(query): Query<DashboardQuery>,
) -> Response
where
    S: IdeaStore + 'static,
{
    let filters = Filters::parse(query.category.as_deref(), query.priority.as_deref())
        .map(|filters| filters.with_search(query.search));
    let sort = query
        .sort
        .as_deref()
        .map_or(Ok(SortKey::default()), SortKey::parse);
    let (filters, sort) = match (filters, sort) {
        (Ok(filters), Ok(sort)) => (filters, sort),
        (Err(error), _) | (_, Err(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    let payload = board.state.read(|state| {
        let ranked = rank_and_filter(state.ideas(), &filters, sort);
        let summary = dashboard::summarize(&ranked, state.ideas(), sort, board.top_features);
        let rows: Vec<Value> = ranked
            .iter()
            .map(|idea| {
                json!({
                    "idea": idea,
                    "band": idea.composite_score.map(ScoreBand::from_score),
                })
            })
            .collect();
        let error = match state.load() {
            LoadState::Failed { message } => Some(message.clone()),
            _ => None,
        };

        json!({
            "status": state.load().label(),
            "error": error,
            "ideas": rows,
            "summary": summary,
            "editor": state.editor(),
            "pending": state.pending_count(),
            "notices": state.notices(),
        })
    });

    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn analysis_handler<S>(
    State(board): State<BoardHandle<S>>,
    Path(idea_id): Path<String>,
) -> Response
where
    S: IdeaStore + 'static,
{
    match board.service.idea(&IdeaId(idea_id)) {
        Ok(idea) => (StatusCode::OK, axum::Json(dashboard::analyze(&idea))).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn dismiss_notice_handler<S>(
    State(board): State<BoardHandle<S>>,
    Path(notice_id): Path<u64>,
) -> Response
where
    S: IdeaStore + 'static,
{
    match board.state.dispatch(BoardAction::NoticeDismissed(notice_id)) {
        Dispatch::Applied => StatusCode::NO_CONTENT.into_response(),
        Dispatch::Ignored => {
            let payload = json!({
                "error": format!("notice {notice_id} not found"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}
