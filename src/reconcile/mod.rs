//! Actuals reconciliation and batched commit
//!
//! One module serves every "actuals" table (projects, tasks, activities);
//! the entity kind only selects the field list.
//!
//! # Architecture
//!
//! - `normalizer.rs` - full-key actuals records
//! - `derived.rs` - duration, remaining days, cost variance
//! - `dirty.rs` - dirty set and per-row commit state
//! - `sanitizer.rs` - strict update payloads
//! - `grid.rs` - row state, edits, reloads
//! - `commit.rs` - batched commit through an `ActualsSink`
//! - `sink.rs` - the update-mutation seam and its adapters
//! - `guard.rs` - delete validation
//! - `progress.rs` - append-only progress history

pub mod commit;
pub mod derived;
pub mod dirty;
pub mod grid;
pub mod guard;
pub mod normalizer;
pub mod progress;
pub mod sanitizer;
pub mod sink;

pub use commit::{CommitFailure, CommitReport};
pub use derived::{CostVariance, DerivedFields, Remaining, derive, duration_days, remaining_days};
pub use dirty::{ACTUALS_NAMESPACE, DirtyTracker, FailurePolicy, RowState};
pub use grid::{ActualsGrid, CellEdit, EditOutcome, GridRow, RefetchPolicy, RowView};
pub use guard::ensure_deletable;
pub use normalizer::{ActualsRecord, normalize};
pub use progress::{ProgressHistory, ProgressUpdate};
pub use sanitizer::{SanitizedActuals, sanitize};
pub use sink::{ActualsSink, FnSink, RecordingSink, UpdateActualsRequest};
