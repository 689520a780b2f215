use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::domain::{
    fields, ideas_from_documents, Document, Idea, IdeaId, Metric, RecordError, VoteDirection,
};
use super::exchange::EnrichedIdea;
use super::ranking::{rank_and_filter, Filters, SortKey};
use super::scoring::{self, CompositeScore};
use super::store::{Collection, IdeaStore, StoreError, WriteBatch, WriteOp};
use super::validation::{IdeaSubmission, MetricEdit, ValidationErrors};

/// Attempts made by a guarded write before a concurrent change is reported.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Service composing validation, scoring and the document store.
pub struct IdeaBoardService<S> {
    store: Arc<S>,
}

impl<S> IdeaBoardService<S>
where
    S: IdeaStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate locally, then create exactly one input record with zero votes.
    pub fn submit(&self, submission: IdeaSubmission) -> Result<Idea, BoardError> {
        let validated = submission.validate()?;
        let id = self.store.allocate_id(Collection::Input);
        let created_at = Utc::now();

        let mut document = Document::new();
        document.insert(fields::ID.to_string(), Value::from(id.as_str()));
        document.insert(fields::TITLE.to_string(), Value::from(validated.title.clone()));
        document.insert(
            fields::CATEGORY.to_string(),
            Value::from(validated.category.label()),
        );
        document.insert(
            fields::DESCRIPTION.to_string(),
            Value::from(validated.description.clone()),
        );
        document.insert(fields::VOTES.to_string(), Value::from(0));
        document.insert(
            fields::CREATED_AT.to_string(),
            Value::from(created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        self.store
            .apply(WriteOp::create(Collection::Input, id.clone(), document))?;
        info!(idea_id = %id, category = %validated.category, "idea submitted");

        let mut idea = Idea::new(id, validated.title);
        idea.description = validated.description;
        idea.category = Some(validated.category);
        idea.votes = Some(0);
        idea.created_at = Some(created_at);
        Ok(idea)
    }

    /// Move the vote counter of every existing mirror of the idea by one.
    ///
    /// The enriched mirror also receives the score recomputed for its new vote
    /// count in the same batch. The batch only commits over the mirror it was
    /// scored from; a concurrent change triggers a fresh read.
    pub fn vote(&self, id: &IdeaId, direction: VoteDirection) -> Result<VoteReceipt, BoardError> {
        retry_stale(id, "vote", || self.try_vote(id, direction))
    }

    fn try_vote(&self, id: &IdeaId, direction: VoteDirection) -> Result<VoteReceipt, BoardError> {
        let input = self.store.fetch(Collection::Input, id)?;
        let output = self.store.fetch(Collection::Output, id)?;
        if input.is_none() && output.is_none() {
            return Err(BoardError::NotFound(id.clone()));
        }

        let delta = direction.delta();
        let mut guard = None;
        let mut ops = Vec::with_capacity(3);
        if input.is_some() {
            ops.push(WriteOp::increment(
                Collection::Input,
                id.clone(),
                fields::VOTES,
                delta,
            ));
        }

        let mut score = None;
        if let Some(output) = output.as_ref() {
            ops.push(WriteOp::increment(
                Collection::Output,
                id.clone(),
                fields::VOTES,
                delta,
            ));
            let mut mirror = Idea::from_document(output.id.clone(), &output.fields)?;
            mirror.votes = Some(mirror.votes.unwrap_or(0).saturating_add(delta));
            let rescored = scoring::score_idea(&mirror);
            ops.push(WriteOp::set(
                Collection::Output,
                id.clone(),
                fields::COMPOSITE_SCORE,
                rescored.to_json(),
            ));
            score = Some(rescored);
            guard = Some(WriteOp::unchanged(
                Collection::Output,
                id.clone(),
                output.fields.clone(),
            ));
        }

        if self.store.supports_atomic_batches() {
            let batch = guard.into_iter().chain(ops).collect::<Vec<_>>();
            self.store.commit(WriteBatch::from(batch))?;
        } else {
            self.apply_votes_sequentially(id, ops)?;
        }

        debug!(idea_id = %id, direction = direction.label(), "vote recorded");
        Ok(VoteReceipt {
            idea_id: id.clone(),
            direction,
            mirrored: input.is_some() && output.is_some(),
            composite_score: score,
        })
    }

    /// Sequential fallback for stores without atomic batches. A failure after
    /// the first write rolls the counter writes already applied back.
    fn apply_votes_sequentially(&self, id: &IdeaId, ops: Vec<WriteOp>) -> Result<(), BoardError> {
        let mut applied: Vec<WriteOp> = Vec::with_capacity(ops.len());
        for op in ops {
            match self.store.apply(op.clone()) {
                Ok(()) => applied.push(op),
                Err(source) if applied.is_empty() => return Err(source.into()),
                Err(source) => {
                    let compensated = applied
                        .iter()
                        .rev()
                        .filter_map(WriteOp::inverse)
                        .all(|inverse| self.store.apply(inverse).is_ok());
                    warn!(
                        idea_id = %id,
                        error = %source,
                        compensated,
                        "vote only partially recorded"
                    );
                    return Err(BoardError::PartialVoteFailure {
                        idea_id: id.clone(),
                        compensated,
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Write a metric of the enriched record together with the score it implies.
    pub fn edit_metric(
        &self,
        id: &IdeaId,
        edit: MetricEdit,
    ) -> Result<MetricEditOutcome, BoardError> {
        retry_stale(id, "metric edit", || self.try_edit_metric(id, edit))
    }

    fn try_edit_metric(
        &self,
        id: &IdeaId,
        edit: MetricEdit,
    ) -> Result<MetricEditOutcome, BoardError> {
        let record = self
            .store
            .fetch(Collection::Output, id)?
            .ok_or_else(|| BoardError::NotFound(id.clone()))?;
        let mut idea = Idea::from_document(record.id.clone(), &record.fields)?;
        idea.set_metric(edit.metric, f64::from(edit.value));
        let score = scoring::score_idea(&idea);

        let metric_write = WriteOp::set(
            Collection::Output,
            id.clone(),
            edit.metric.field_name(),
            Value::from(edit.value),
        );
        let score_write = WriteOp::set(
            Collection::Output,
            id.clone(),
            fields::COMPOSITE_SCORE,
            score.to_json(),
        );

        if self.store.supports_atomic_batches() {
            self.store.commit(
                WriteBatch::new()
                    .with(WriteOp::unchanged(Collection::Output, id.clone(), record.fields))
                    .with(metric_write)
                    .with(score_write),
            )?;
        } else {
            // Unguarded: a concurrent vote can leave the score stale until the
            // record is next rescored.
            self.store.apply(metric_write)?;
            self.store.apply(score_write)?;
        }

        match score {
            CompositeScore::Defined(value) => {
                info!(idea_id = %id, metric = edit.metric.label(), value = edit.value, score = value, "metric updated")
            }
            CompositeScore::Undefined => {
                warn!(idea_id = %id, metric = edit.metric.label(), value = edit.value, "metric updated; composite score undefined")
            }
        }

        Ok(MetricEditOutcome {
            idea_id: id.clone(),
            metric: edit.metric,
            value: edit.value,
            composite_score: score,
        })
    }

    /// Write enriched ideas to the output collection with freshly computed scores.
    /// Vote counts come from the input record when one exists.
    pub fn publish_enriched(&self, ideas: Vec<EnrichedIdea>) -> Result<PublishSummary, BoardError> {
        let mut batch = WriteBatch::new();
        let mut undefined_scores = Vec::new();

        for enriched in ideas {
            let mut idea = enriched.into_idea();
            if let Some(input) = self.store.fetch(Collection::Input, &idea.id)? {
                let submitted = Idea::from_document(input.id, &input.fields)?;
                if submitted.votes.is_some() {
                    idea.votes = submitted.votes;
                }
                if idea.created_at.is_none() {
                    idea.created_at = submitted.created_at;
                }
            }

            if !scoring::rescore(&mut idea).is_defined() {
                undefined_scores.push(idea.id.clone());
            }
            batch.push(WriteOp::put(
                Collection::Output,
                idea.id.clone(),
                idea.to_document(),
            ));
        }

        let published = batch.len();
        if !batch.is_empty() {
            self.store.commit(batch)?;
        }
        info!(
            published,
            undefined = undefined_scores.len(),
            "enriched ideas published"
        );

        Ok(PublishSummary {
            published,
            undefined_scores,
        })
    }

    /// Raw submissions, most voted first.
    pub fn submissions(&self, search: Option<String>) -> Result<Vec<Idea>, BoardError> {
        let documents = self.store.list(Collection::Input)?;
        let ideas = ideas_from_documents(&documents);
        Ok(rank_and_filter(
            &ideas,
            &Filters::all().with_search(search),
            SortKey::Votes,
        ))
    }

    /// Current enriched ideas in store order.
    pub fn enriched(&self) -> Result<Vec<Idea>, BoardError> {
        let documents = self.store.list(Collection::Output)?;
        Ok(ideas_from_documents(&documents))
    }

    pub fn idea(&self, id: &IdeaId) -> Result<Idea, BoardError> {
        let record = self
            .store
            .fetch(Collection::Output, id)?
            .ok_or_else(|| BoardError::NotFound(id.clone()))?;
        Ok(Idea::from_document(record.id, &record.fields)?)
    }
}

/// Re-run an operation whose batch lost a race against another writer.
fn retry_stale<T>(
    id: &IdeaId,
    operation: &'static str,
    mut attempt: impl FnMut() -> Result<T, BoardError>,
) -> Result<T, BoardError> {
    let mut attempts = 1;
    loop {
        match attempt() {
            Err(BoardError::StoreRejected(StoreError::Stale { .. }))
                if attempts < MAX_WRITE_ATTEMPTS =>
            {
                debug!(idea_id = %id, operation, attempts, "enriched record changed concurrently; retrying");
                attempts += 1;
            }
            Err(error @ BoardError::StoreRejected(StoreError::Stale { .. })) => {
                warn!(idea_id = %id, operation, attempts, "enriched record kept changing; giving up");
                return Err(error);
            }
            result => return result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteReceipt {
    pub idea_id: IdeaId,
    pub direction: VoteDirection,
    /// Both the input record and its enriched mirror were updated.
    pub mirrored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_score: Option<CompositeScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEditOutcome {
    pub idea_id: IdeaId,
    pub metric: Metric,
    pub value: u8,
    pub composite_score: CompositeScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishSummary {
    pub published: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub undefined_scores: Vec<IdeaId>,
}

/// Error raised by the board service.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("idea {0} not found")]
    NotFound(IdeaId),
    #[error("idea store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
    #[error("idea store rejected the write: {0}")]
    StoreRejected(#[source] StoreError),
    #[error("vote on idea {idea_id} was only partially recorded (rolled back: {compensated})")]
    PartialVoteFailure {
        idea_id: IdeaId,
        compensated: bool,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    MalformedRecord(#[from] RecordError),
}

impl From<StoreError> for BoardError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { id, .. } => Self::NotFound(id),
            StoreError::Unavailable(_) => Self::StoreUnavailable(error),
            StoreError::Conflict { .. } | StoreError::Stale { .. } | StoreError::Rejected(_) => {
                Self::StoreRejected(error)
            }
        }
    }
}
