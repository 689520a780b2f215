use crate::cli::ServeArgs;
use crate::feed::spawn_live_feed;
use crate::infra::{AppState, InMemoryIdeaStore};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use idea_board::config::AppConfig;
use idea_board::error::AppError;
use idea_board::ideas::{BoardHandle, EnrichedImporter, IdeaBoardService, SharedBoardState};
use idea_board::telemetry;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryIdeaStore::default());
    let service = Arc::new(IdeaBoardService::new(Arc::clone(&store)));
    if let Some(path) = config.board.seed_path.as_deref() {
        seed_board(&service, path)?;
    }

    let board_state = SharedBoardState::new();
    spawn_live_feed(Arc::clone(&store), board_state.clone());

    let board = BoardHandle::new(service, board_state).with_top_features(config.board.top_features);
    let app = with_operational_routes(board)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        environment = config.environment.label(),
        %addr,
        "idea board ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn seed_board(
    service: &IdeaBoardService<InMemoryIdeaStore>,
    path: &Path,
) -> Result<(), AppError> {
    let ideas = EnrichedImporter::from_path(path)?;
    let summary = service.publish_enriched(ideas)?;
    info!(
        path = %path.display(),
        published = summary.published,
        undefined_scores = summary.undefined_scores.len(),
        "seeded enriched ideas"
    );
    Ok(())
}
