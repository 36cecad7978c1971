// ============================================================================
// sitetrack Library
// ============================================================================

pub mod config;
pub mod core;
pub mod prelude;
pub mod reconcile;

// Re-export main types for convenience
pub use crate::config::GridConfig;
pub use crate::core::{
    ActualsField, ActualsSchema, CellValue, CostCategory, EntityKind, FieldKind, PlannedEntity,
    RawActuals, Result, TrackError,
};
pub use crate::reconcile::{
    ActualsGrid, ActualsRecord, ActualsSink, CellEdit, CommitReport, EditOutcome,
    FailurePolicy, RecordingSink, RefetchPolicy, RowState, RowView, SanitizedActuals,
    UpdateActualsRequest, normalize, sanitize,
};
