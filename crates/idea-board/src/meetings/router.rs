use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::json;
use tracing::warn;

use super::parse_summary;

/// Router exposing summary parsing for meeting transcripts.
pub fn meeting_router() -> Router {
    Router::new().route("/api/v1/meetings/summary", post(summary_handler))
}

pub(crate) async fn summary_handler(body: String) -> axum::response::Response {
    let summary = parse_summary(&body);
    if summary.is_empty() {
        warn!(bytes = body.len(), "summary text carried no recognised sections");
        let payload = json!({
            "error": "expected TL;DR, Meeting Minutes or Action Items sections",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }
    (StatusCode::OK, Json(summary)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn post_summary(body: &str) -> (StatusCode, Value) {
        let response = meeting_router()
            .oneshot(
                Request::post("/api/v1/meetings/summary")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json payload"))
    }

    #[tokio::test]
    async fn summary_route_returns_structured_sections() {
        let (status, payload) = post_summary(
            "=== TL;DR ===\nShip it.\n=== Meeting Minutes ===\n- Agreed\n=== Action Items ===\n\
             **Task Name:** Tag release\n**Deadline:** Monday\n",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["tl_dr"], json!("Ship it."));
        assert_eq!(payload["meeting_minutes"], json!(["Agreed"]));
        assert_eq!(
            payload["action_items"],
            json!([{ "task": "Tag release", "owner": "", "deadline": "Monday" }])
        );
    }

    #[tokio::test]
    async fn summary_route_rejects_unsectioned_text() {
        let (status, payload) = post_summary("just a transcript").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(payload["error"].as_str().is_some());
    }
}
