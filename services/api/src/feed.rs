use idea_board::ideas::domain::ideas_from_documents;
use idea_board::ideas::{BoardAction, Collection, IdeaStore, SharedBoardState, SnapshotEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SUBSCRIBE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_SUBSCRIBE_BACKOFF: Duration = Duration::from_secs(30);

/// Keep the board state in step with the enriched collection. A subscription
/// that cannot be opened is retried with capped exponential backoff while the
/// board reports the failure. The task ends when the store drops its sender.
pub(crate) fn spawn_live_feed<S>(store: Arc<S>, state: SharedBoardState) -> JoinHandle<()>
where
    S: IdeaStore + 'static,
{
    spawn_live_feed_with_backoff(store, state, SUBSCRIBE_BACKOFF)
}

fn spawn_live_feed_with_backoff<S>(
    store: Arc<S>,
    state: SharedBoardState,
    initial_backoff: Duration,
) -> JoinHandle<()>
where
    S: IdeaStore + 'static,
{
    tokio::spawn(async move {
        let mut backoff = initial_backoff;
        let mut receiver = loop {
            match store.subscribe(Collection::Output) {
                Ok(receiver) => break receiver,
                Err(error) => {
                    warn!(
                        error = %error,
                        retry_in_ms = backoff.as_millis() as u64,
                        "idea subscription could not be opened"
                    );
                    state.dispatch(BoardAction::SubscriptionFailed {
                        message: error.to_string(),
                    });
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_SUBSCRIBE_BACKOFF);
                }
            }
        };

        info!(collection = %Collection::Output, "idea subscription opened");
        apply_event(&mut receiver, &state);
        while receiver.changed().await.is_ok() {
            apply_event(&mut receiver, &state);
        }
        debug!("idea subscription closed");
    })
}

fn apply_event(receiver: &mut watch::Receiver<SnapshotEvent>, state: &SharedBoardState) {
    let action = match &*receiver.borrow_and_update() {
        SnapshotEvent::Snapshot(documents) => {
            debug!(documents = documents.len(), "idea snapshot received");
            BoardAction::SnapshotReplaced(ideas_from_documents(documents))
        }
        SnapshotEvent::Failed(error) => {
            warn!(error = %error, "idea subscription failed");
            BoardAction::SubscriptionFailed {
                message: error.to_string(),
            }
        }
    };
    state.dispatch(action);
}
