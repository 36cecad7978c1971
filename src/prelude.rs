//! Recommended imports grouped by use.
//!
//! `grid` covers application code driving an actuals table.
//! `parts` exposes the building blocks for callers assembling their own flow.

pub mod grid {
    //! Surface for screens that load, edit and commit actuals.
    pub use crate::{
        ActualsGrid, ActualsSchema, ActualsSink, CellEdit, CellValue, CommitReport, GridConfig,
        PlannedEntity, RowView, UpdateActualsRequest,
    };
}

pub mod parts {
    //! Individual steps of the reconciliation pattern.
    pub use crate::reconcile::{
        ActualsRecord, DirtyTracker, SanitizedActuals, derive, duration_days, ensure_deletable,
        normalize, remaining_days, sanitize,
    };
}
