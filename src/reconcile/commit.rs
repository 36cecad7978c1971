//! Batched commit of dirty rows.

use super::dirty::{DirtyTracker, FailurePolicy};
use super::grid::ActualsGrid;
use super::sanitizer::sanitize;
use super::sink::{ActualsSink, UpdateActualsRequest};
use crate::core::{Result, TrackError};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of one commit, in completion order.
///
/// `failed` is what a UI surfaces as a notification; whether those rows are
/// dirty again depends on the grid's [`FailurePolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub batch_id: Uuid,
    pub issued: usize,
    pub committed: Vec<String>,
    pub failed: Vec<CommitFailure>,
    /// Dirty ids whose row disappeared before the commit.
    pub skipped: Vec<String>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<S: ActualsSink> ActualsGrid<S> {
    /// Drains the dirty set into one request per row, in edit order.
    ///
    /// Dirty ids without a row are settled immediately and returned
    /// separately.
    fn prepare_batch(&mut self) -> (Vec<UpdateActualsRequest>, Vec<String>) {
        let kind = self.schema.kind();
        let mut requests = Vec::new();
        let mut skipped = Vec::new();

        for id in self.tracker.begin_commit() {
            match self.rows.iter().find(|row| row.id() == id) {
                Some(row) => requests.push(UpdateActualsRequest {
                    id,
                    kind,
                    actuals: sanitize(&self.schema, row.actuals()),
                    progress_updates: row.unsent_progress().to_vec(),
                }),
                None => {
                    event!(Level::WARN, row_id = %id, "dirty row vanished before commit");
                    self.tracker.settle_committed(&id);
                    skipped.push(id);
                }
            }
        }

        (requests, skipped)
    }

    /// Sends every dirty row to the sink.
    ///
    /// The dirty set is emptied before the first call goes out. Calls run
    /// concurrently, up to `max_in_flight`, and settle in whatever order
    /// they finish. Failed rows are retained or dropped per the configured
    /// [`FailurePolicy`]; the commit itself never fails.
    ///
    /// Cancel-safe: if the future is dropped before the calls settle, the
    /// unsettled rows are dirty again and the saving flag is cleared.
    pub async fn commit(&mut self) -> CommitReport {
        let batch_id = Uuid::new_v4();
        let span = info_span!(
            "actuals.commit",
            batch_id = %batch_id,
            kind = %self.schema.kind()
        );

        self.saving = true;
        let (requests, skipped) = self.prepare_batch();
        let issued = requests.len();
        span.in_scope(|| event!(Level::INFO, issued, "actuals batch issued"));

        let policy = self.config.failure_policy;
        let max_in_flight = self.config.max_in_flight;
        let timeout = self.config.timeout();
        let mut committed = Vec::new();
        let mut failed = Vec::new();
        let mut drop_progress = Vec::new();
        {
            let mut batch = InFlight {
                ids: requests.iter().map(|request| request.id.clone()).collect(),
                tracker: &mut self.tracker,
                saving: &mut self.saving,
            };
            let outcomes = dispatch(&self.sink, requests, max_in_flight, timeout)
                .instrument(span.clone())
                .await;

            for (id, outcome) in outcomes {
                match outcome {
                    Ok(()) => {
                        batch.tracker.settle_committed(&id);
                        drop_progress.push(id.clone());
                        committed.push(id);
                    }
                    Err(err) => {
                        span.in_scope(|| {
                            event!(
                                Level::ERROR,
                                row_id = %id,
                                error = %err,
                                "actuals update failed"
                            )
                        });
                        batch.tracker.settle_failed(&id, err.to_string(), policy);
                        if policy == FailurePolicy::Discard {
                            drop_progress.push(id.clone());
                        }
                        failed.push(CommitFailure {
                            id,
                            error: err.to_string(),
                        });
                    }
                }
            }
        }
        for id in &drop_progress {
            self.clear_unsent_progress(id);
        }

        span.in_scope(|| {
            event!(
                Level::INFO,
                committed = committed.len(),
                failed = failed.len(),
                "actuals batch settled"
            )
        });

        CommitReport {
            batch_id,
            issued,
            committed,
            failed,
            skipped,
        }
    }
}

/// An issued batch. Dropping it lowers the saving flag and puts rows that
/// never settled back into the dirty set.
struct InFlight<'a> {
    ids: Vec<String>,
    tracker: &'a mut DirtyTracker,
    saving: &'a mut bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.saving = false;
        let restored = self.tracker.abort_commit(&self.ids);
        if restored > 0 {
            event!(
                Level::WARN,
                restored,
                "commit cancelled before settling; rows are dirty again"
            );
        }
    }
}

async fn dispatch<S: ActualsSink>(
    sink: &S,
    requests: Vec<UpdateActualsRequest>,
    max_in_flight: usize,
    timeout: Option<Duration>,
) -> Vec<(String, Result<()>)> {
    stream::iter(requests.into_iter().map(|request| {
        let id = request.id.clone();
        async move {
            let call = sink.update_actuals(request);
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or_else(|_| Err(TrackError::Timeout(id.clone()))),
                None => call.await,
            };
            (id, outcome)
        }
    }))
    .buffer_unordered(max_in_flight.max(1))
    .collect::<Vec<_>>()
    .await
}
