//! End-to-end idea board scenarios driven through the public service facade and
//! HTTP router: submission, enrichment, voting, metric edits and the dashboard.

mod common {
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::response::Response;
    use serde_json::Value;
    use tokio::sync::watch;

    use idea_board::ideas::{
        Collection, DocumentSet, IdeaId, IdeaStore, SnapshotEvent, StoreError, StoredDocument,
        WriteBatch, WriteOp,
    };

    /// Minimal transactional store over two document sets.
    #[derive(Clone)]
    pub(super) struct SharedStore {
        sets: Arc<Mutex<(DocumentSet, DocumentSet)>>,
        next_id: Arc<Mutex<u32>>,
    }

    impl Default for SharedStore {
        fn default() -> Self {
            Self {
                sets: Arc::new(Mutex::new((
                    DocumentSet::new(Collection::Input),
                    DocumentSet::new(Collection::Output),
                ))),
                next_id: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl SharedStore {
        pub(super) fn field(&self, collection: Collection, id: &IdeaId, field: &str) -> Option<Value> {
            self.fetch(collection, id)
                .expect("fetch succeeds")
                .and_then(|stored| stored.fields.get(field).cloned())
        }
    }

    impl IdeaStore for SharedStore {
        fn allocate_id(&self, _collection: Collection) -> IdeaId {
            let mut next = self.next_id.lock().expect("id mutex poisoned");
            *next += 1;
            let sequence = *next;
            IdeaId(format!("sub-{sequence}"))
        }

        fn fetch(
            &self,
            collection: Collection,
            id: &IdeaId,
        ) -> Result<Option<StoredDocument>, StoreError> {
            let guard = self.sets.lock().expect("store mutex poisoned");
            Ok(match collection {
                Collection::Input => guard.0.get(id),
                Collection::Output => guard.1.get(id),
            })
        }

        fn list(&self, collection: Collection) -> Result<Vec<StoredDocument>, StoreError> {
            let guard = self.sets.lock().expect("store mutex poisoned");
            Ok(match collection {
                Collection::Input => guard.0.snapshot(),
                Collection::Output => guard.1.snapshot(),
            })
        }

        fn apply(&self, op: WriteOp) -> Result<(), StoreError> {
            self.commit(WriteBatch::new().with(op))
        }

        fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
            let mut guard = self.sets.lock().expect("store mutex poisoned");
            let (mut input, mut output) = guard.clone();
            for op in batch.ops() {
                match op.collection {
                    Collection::Input => input.apply(&op.id, &op.kind)?,
                    Collection::Output => output.apply(&op.id, &op.kind)?,
                }
            }
            *guard = (input, output);
            Ok(())
        }

        fn subscribe(
            &self,
            collection: Collection,
        ) -> Result<watch::Receiver<SnapshotEvent>, StoreError> {
            let (_sender, receiver) = watch::channel(SnapshotEvent::Snapshot(self.list(collection)?));
            Ok(receiver)
        }
    }

    pub(super) fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    pub(super) async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }
}

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use idea_board::ideas::domain::{fields, ideas_from_documents};
use idea_board::ideas::{
    idea_router, BoardAction, BoardHandle, Collection, EnrichedImporter, IdeaBoardService, IdeaId,
    IdeaStore, IdeaSubmission, SharedBoardState, VoteDirection,
};
use serde_json::json;
use tower::ServiceExt;

use common::{json_request, read_json_body, SharedStore};

#[test]
fn submission_enrichment_and_votes_flow_through_both_collections() {
    let store = SharedStore::default();
    let service = IdeaBoardService::new(Arc::new(store.clone()));

    let submitted = service
        .submit(IdeaSubmission {
            title: "  Semantic search  ".to_string(),
            category: "AI".to_string(),
            description: "Rank help articles by meaning".to_string(),
        })
        .expect("submission succeeds");
    assert_eq!(submitted.title, "Semantic search");
    assert_eq!(submitted.id, IdeaId::from("sub-1"));

    for _ in 0..50 {
        service
            .vote(&submitted.id, VoteDirection::Up)
            .expect("vote succeeds");
    }

    let payload = format!(
        "Here are the scored ideas:\n[{{\"id\": \"{}\", \"title\": \"Semantic search\", \
         \"category\": \"AI\", \"roi\": 8, \"effort\": 2, \"risk\": 1, \"alignment\": 3, \
         \"priority\": \"High\"}}]\nLet me know if you need more.",
        submitted.id
    );
    let enriched = EnrichedImporter::from_text(&payload).expect("wrapped payload parses");
    let summary = service.publish_enriched(enriched).expect("publish succeeds");
    assert_eq!(summary.published, 1);
    assert_eq!(
        store.field(Collection::Output, &submitted.id, fields::COMPOSITE_SCORE),
        Some(json!(9.75))
    );

    service
        .vote(&submitted.id, VoteDirection::Up)
        .expect("vote succeeds");
    service
        .vote(&submitted.id, VoteDirection::Down)
        .expect("vote succeeds");
    assert_eq!(
        store.field(Collection::Input, &submitted.id, fields::VOTES),
        Some(json!(50))
    );
    assert_eq!(
        store.field(Collection::Output, &submitted.id, fields::VOTES),
        Some(json!(50))
    );
    assert_eq!(
        store.field(Collection::Output, &submitted.id, fields::COMPOSITE_SCORE),
        Some(json!(9.75))
    );
}

#[tokio::test]
async fn dashboard_reflects_metric_edits_after_snapshot_replacement() {
    let store = SharedStore::default();
    let service = Arc::new(IdeaBoardService::new(Arc::new(store.clone())));
    let enriched = EnrichedImporter::from_text(
        r#"[
            {"id": "a", "title": "Semantic search", "category": "AI", "roi": 8, "effort": 2,
             "risk": 1, "alignment": 3, "priority": "High"},
            {"id": "b", "title": "Dark mode", "category": "UI/UX", "roi": 4, "effort": 3,
             "risk": 1, "priority": "Medium"}
        ]"#,
    )
    .expect("payload parses");
    service.publish_enriched(enriched).expect("publish succeeds");

    let state = SharedBoardState::new();
    let router = idea_router(BoardHandle::new(Arc::clone(&service), state.clone()));

    let response = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/ideas/a/metrics",
            json!({ "field": "risk", "value": 10 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot = store.list(Collection::Output).expect("list succeeds");
    state.dispatch(BoardAction::SnapshotReplaced(ideas_from_documents(&snapshot)));

    let response = router
        .oneshot(
            Request::get("/api/v1/dashboard?sort=composite_score")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    let payload = read_json_body(response).await;

    let titles: Vec<&str> = payload["ideas"]
        .as_array()
        .expect("ideas")
        .iter()
        .filter_map(|row| row["idea"]["title"].as_str())
        .collect();
    assert_eq!(titles, ["Dark mode", "Semantic search"]);
    assert_eq!(payload["summary"]["total"], json!(2));
    assert_eq!(payload["notices"][0]["title"], json!("Risk updated"));
}
