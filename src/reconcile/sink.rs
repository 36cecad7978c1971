//! Outbound seam: the update-mutation collaborator.

use super::progress::ProgressUpdate;
use super::sanitizer::SanitizedActuals;
use crate::core::{EntityKind, Result, TrackError};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One update call, keyed by entity id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateActualsRequest {
    pub id: String,
    pub kind: EntityKind,
    pub actuals: SanitizedActuals,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub progress_updates: Vec<ProgressUpdate>,
}

/// Persists the actuals of one row.
///
/// Implementations wrap whatever transport the application uses. The grid
/// issues one call per dirty row and does not retry on its own.
#[async_trait]
pub trait ActualsSink: Send + Sync {
    async fn update_actuals(&self, request: UpdateActualsRequest) -> Result<()>;
}

#[async_trait]
impl<S: ActualsSink + ?Sized> ActualsSink for Arc<S> {
    async fn update_actuals(&self, request: UpdateActualsRequest) -> Result<()> {
        (**self).update_actuals(request).await
    }
}

/// Adapts a plain async closure into a sink.
pub struct FnSink<F> {
    callback: F,
}

impl<F> FnSink<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F, Fut> ActualsSink for FnSink<F>
where
    F: Fn(UpdateActualsRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn update_actuals(&self, request: UpdateActualsRequest) -> Result<()> {
        (self.callback)(request).await
    }
}

/// In-memory sink that records every call.
///
/// Used for dry runs from the CLI and in tests. Selected ids can be made to
/// fail or to answer late.
#[derive(Debug, Default)]
pub struct RecordingSink {
    issued: Mutex<Vec<UpdateActualsRequest>>,
    completed: Mutex<Vec<String>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    pub fn delayed(mut self, id: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    /// Requests in the order the calls were made.
    pub fn requests(&self) -> Vec<UpdateActualsRequest> {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ids of successful calls in completion order.
    pub fn completed(&self) -> Vec<String> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_issued(&self, request: UpdateActualsRequest) -> Result<()> {
        self.issued.lock()?.push(request);
        Ok(())
    }

    fn record_completed(&self, id: String) -> Result<()> {
        self.completed.lock()?.push(id);
        Ok(())
    }

    pub fn call_count(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ActualsSink for RecordingSink {
    async fn update_actuals(&self, request: UpdateActualsRequest) -> Result<()> {
        let id = request.id.clone();
        self.record_issued(request)?;

        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&id) {
            return Err(TrackError::Transport(format!(
                "update rejected for '{}'",
                id
            )));
        }

        self.record_completed(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(id: &str) -> UpdateActualsRequest {
        UpdateActualsRequest {
            id: id.to_string(),
            kind: EntityKind::Task,
            actuals: SanitizedActuals::default(),
            progress_updates: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_recording_sink_records_and_fails() {
        let sink = RecordingSink::new().failing_on("bad");
        sink.update_actuals(request("good")).await.unwrap();
        let err = sink.update_actuals(request("bad")).await.unwrap_err();

        assert!(matches!(err, TrackError::Transport(_)));
        assert_eq!(sink.call_count(), 2);
        assert_eq!(sink.completed(), vec!["good".to_string()]);
    }

    #[tokio::test]
    async fn test_fn_sink_invokes_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sink = FnSink::new(move |_request: UpdateActualsRequest| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), TrackError>(())
            }
        });

        sink.update_actuals(request("t1")).await.unwrap();
        sink.update_actuals(request("t2")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
