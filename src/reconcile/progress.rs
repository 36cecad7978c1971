use crate::core::{Result, TrackError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub recorded_at: DateTime<Utc>,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ProgressUpdate {
    pub fn new(recorded_at: DateTime<Utc>, progress: f64, note: Option<String>) -> Self {
        Self {
            recorded_at,
            progress,
            note: note.filter(|note| !note.trim().is_empty()),
        }
    }
}

/// Append-only log of progress updates for one task or activity.
///
/// Entries are ordered by `recorded_at`; progress stays within 0..=100.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ProgressHistory {
    updates: Vec<ProgressUpdate>,
}

impl ProgressHistory {
    /// Rebuilds a history from fetched entries, sorting them by time and
    /// skipping entries that could never have been appended.
    pub fn from_fetched(mut updates: Vec<ProgressUpdate>) -> Self {
        updates.retain(|update| valid_progress(update.progress));
        updates.sort_by_key(|update| update.recorded_at);
        Self { updates }
    }

    pub fn append(&mut self, update: ProgressUpdate) -> Result<()> {
        if !valid_progress(update.progress) {
            return Err(TrackError::InvalidProgress(format!(
                "progress {} is outside 0..=100",
                update.progress
            )));
        }
        if let Some(last) = self.updates.last() {
            if update.recorded_at < last.recorded_at {
                return Err(TrackError::InvalidProgress(format!(
                    "update at {} precedes the latest entry at {}",
                    update.recorded_at, last.recorded_at
                )));
            }
        }
        self.updates.push(update);
        Ok(())
    }

    pub fn latest(&self) -> Option<&ProgressUpdate> {
        self.updates.last()
    }

    pub fn entries(&self) -> &[ProgressUpdate] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

fn valid_progress(progress: f64) -> bool {
    progress.is_finite() && (0.0..=100.0).contains(&progress)
}
