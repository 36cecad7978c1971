//! Row state of one actuals table.

use super::derived::{CostVariance, derive};
use super::dirty::{DirtyTracker, RowState, actuals_field};
use super::guard::ensure_deletable;
use super::normalizer::{ActualsRecord, normalize};
use super::progress::{ProgressHistory, ProgressUpdate};
use crate::config::GridConfig;
use crate::core::{ActualsSchema, CellValue, PlannedEntity, Result, TrackError};
use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// What a reload does with rows that still carry unsaved edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefetchPolicy {
    /// Replace every row; unsaved edits are lost.
    #[default]
    Discard,
    /// Keep local actuals of rows that are still present and dirty.
    PreserveDirty,
}

/// One row: the fetched entity plus its normalized actuals.
///
/// Rows are values. An edit builds a new row and swaps it in.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    entity: Arc<PlannedEntity>,
    actuals: ActualsRecord,
    history: ProgressHistory,
    unsent_progress: Vec<ProgressUpdate>,
}

impl GridRow {
    pub fn from_entity(schema: &ActualsSchema, entity: PlannedEntity) -> Self {
        let actuals = normalize(schema, entity.actuals.as_ref());
        let history = ProgressHistory::from_fetched(entity.progress_history.clone());
        Self {
            entity: Arc::new(entity),
            actuals,
            history,
            unsent_progress: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.entity.id
    }

    pub fn entity(&self) -> &PlannedEntity {
        &self.entity
    }

    pub fn actuals(&self) -> &ActualsRecord {
        &self.actuals
    }

    pub fn history(&self) -> &ProgressHistory {
        &self.history
    }

    /// Progress updates recorded locally and not yet committed.
    pub fn unsent_progress(&self) -> &[ProgressUpdate] {
        &self.unsent_progress
    }

    fn with_actual(&self, field: &str, value: CellValue) -> Self {
        Self {
            actuals: self.actuals.with_value(field, value),
            ..self.clone()
        }
    }

    fn with_progress(&self, update: ProgressUpdate) -> Result<Self> {
        let mut history = self.history.clone();
        history.append(update.clone())?;
        let mut unsent_progress = self.unsent_progress.clone();
        unsent_progress.push(update.clone());
        Ok(Self {
            actuals: self
                .actuals
                .with_value("progress", CellValue::Number(update.progress)),
            history,
            unsent_progress,
            entity: Arc::clone(&self.entity),
        })
    }

    fn without_unsent_progress(&self) -> Self {
        Self {
            unsent_progress: Vec::new(),
            ..self.clone()
        }
    }

    /// Carries local state over onto a freshly fetched entity.
    fn rebased(&self, entity: Arc<PlannedEntity>) -> Self {
        Self {
            entity,
            ..self.clone()
        }
    }
}

/// A single cell change coming from an editor.
///
/// `field` is a path: `actuals.<name>` edits the actuals record, any other
/// path is accepted and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEdit {
    pub row_id: String,
    pub field: String,
    #[serde(default)]
    pub value: CellValue,
}

impl CellEdit {
    pub fn new(
        row_id: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<CellValue>,
    ) -> Self {
        Self {
            row_id: row_id.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Ignored,
}

/// Read model of one row with its derived values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub actuals: ActualsRecord,
    pub planned_duration: Option<i64>,
    pub actual_duration: Option<i64>,
    pub remaining: String,
    pub remaining_days: Option<i64>,
    pub variance: CostVariance,
    pub state: RowState,
}

/// Actuals table of one entity kind.
///
/// Parameterized by the kind's field list (`schema`) and the update
/// collaborator (`sink`); holds rows, dirty state and the saving flag.
pub struct ActualsGrid<S> {
    pub(crate) schema: ActualsSchema,
    pub(crate) config: GridConfig,
    pub(crate) sink: S,
    pub(crate) rows: Vector<GridRow>,
    pub(crate) tracker: DirtyTracker,
    pub(crate) saving: bool,
}

impl<S> ActualsGrid<S> {
    pub fn new(schema: ActualsSchema, sink: S) -> Self {
        Self {
            schema,
            config: GridConfig::default(),
            sink,
            rows: Vector::new(),
            tracker: DirtyTracker::new(),
            saving: false,
        }
    }

    pub fn with_config(schema: ActualsSchema, config: GridConfig, sink: S) -> Result<Self> {
        config.validate()?;
        let mut grid = Self::new(schema, sink);
        grid.config = config;
        Ok(grid)
    }

    pub fn schema(&self) -> &ActualsSchema {
        &self.schema
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cheap immutable copy of the current rows.
    pub fn snapshot(&self) -> Vector<GridRow> {
        self.rows.clone()
    }

    pub fn row(&self, id: &str) -> Option<&GridRow> {
        self.rows.iter().find(|row| row.id() == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.tracker.is_dirty(id)
    }

    pub fn dirty_ids(&self) -> &[String] {
        self.tracker.ids()
    }

    pub fn dirty_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn row_state(&self, id: &str) -> RowState {
        self.tracker.state(id)
    }

    pub fn last_error(&self, id: &str) -> Option<&str> {
        self.tracker.last_error(id)
    }

    /// Replaces all rows with a freshly fetched entity list.
    pub fn load(&mut self, entities: Vec<PlannedEntity>) {
        let span = info_span!(
            "actuals.load",
            kind = %self.schema.kind(),
            rows = entities.len()
        );
        let _enter = span.enter();

        let previous: HashMap<String, GridRow> = match self.config.refetch_policy {
            RefetchPolicy::Discard => HashMap::new(),
            RefetchPolicy::PreserveDirty => self
                .rows
                .iter()
                .filter(|row| self.tracker.is_dirty(row.id()))
                .map(|row| (row.id().to_string(), row.clone()))
                .collect(),
        };

        let rows: Vector<GridRow> = entities
            .into_iter()
            .map(|entity| match previous.get(&entity.id) {
                Some(local) => local.rebased(Arc::new(entity)),
                None => GridRow::from_entity(&self.schema, entity),
            })
            .collect();

        match self.config.refetch_policy {
            RefetchPolicy::Discard => {
                let discarded = self.tracker.len();
                if discarded > 0 {
                    event!(Level::WARN, discarded, "reload discarded unsaved actuals edits");
                }
                self.tracker.clear_all();
            }
            RefetchPolicy::PreserveDirty => {
                let present: HashSet<&str> = rows.iter().map(GridRow::id).collect();
                let before = self.tracker.len();
                self.tracker.retain(|id| present.contains(id));
                let dropped = before - self.tracker.len();
                if dropped > 0 {
                    event!(Level::WARN, dropped, "dirty rows no longer present after reload");
                }
                event!(Level::DEBUG, kept = self.tracker.len(), "kept unsaved edits across reload");
            }
        }

        self.rows = rows;
    }

    /// Applies one cell edit.
    ///
    /// Fields outside the actuals namespace are ignored and leave the dirty
    /// set alone. An `actuals.<name>` path whose name is not in the schema is
    /// rejected with [`TrackError::UnknownField`] and does not mark the row
    /// dirty.
    pub fn apply_edit(&mut self, edit: CellEdit) -> Result<EditOutcome> {
        let Some(field) = actuals_field(&edit.field) else {
            event!(
                Level::DEBUG,
                row_id = %edit.row_id,
                field = %edit.field,
                "edit outside actuals ignored"
            );
            return Ok(EditOutcome::Ignored);
        };
        if self.schema.field(field).is_none() {
            return Err(TrackError::UnknownField {
                kind: self.schema.kind().to_string(),
                field: field.to_string(),
            });
        }
        let index = self
            .position(&edit.row_id)
            .ok_or_else(|| TrackError::RowNotFound(edit.row_id.clone()))?;

        let updated = self.rows[index].with_actual(field, edit.value);
        self.rows.set(index, updated);
        self.tracker.record_edit(&edit.row_id, &edit.field);
        Ok(EditOutcome::Applied)
    }

    /// Applies edits in order, stopping at the first error. Returns how many
    /// edits touched actuals.
    pub fn apply_edits(&mut self, edits: impl IntoIterator<Item = CellEdit>) -> Result<usize> {
        let mut applied = 0;
        for edit in edits {
            if self.apply_edit(edit)? == EditOutcome::Applied {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Appends a progress update to a row's history and sets its actual
    /// progress. The row becomes dirty; the update is sent with the next
    /// commit.
    pub fn record_progress(
        &mut self,
        id: &str,
        progress: f64,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| TrackError::RowNotFound(id.to_string()))?;
        let updated = self.rows[index].with_progress(ProgressUpdate::new(at, progress, note))?;
        self.rows.set(index, updated);
        self.tracker.mark_dirty(id);
        Ok(())
    }

    /// Checks that `id` can be deleted given the child-level records.
    pub fn check_delete(&self, id: &str, children: &[PlannedEntity]) -> Result<()> {
        if self.position(id).is_none() {
            return Err(TrackError::RowNotFound(id.to_string()));
        }
        ensure_deletable(self.schema.kind(), id, children)
    }

    /// Removes a row after [`ActualsGrid::check_delete`] passes. Pending
    /// edits of the row are dropped with it.
    pub fn remove_row(&mut self, id: &str, children: &[PlannedEntity]) -> Result<GridRow> {
        self.check_delete(id, children)?;
        let index = self
            .position(id)
            .ok_or_else(|| TrackError::RowNotFound(id.to_string()))?;
        let removed = self.rows.remove(index);
        self.tracker.retain(|dirty| dirty != id);
        Ok(removed)
    }

    /// Computes the read model for every row. Derived values are not cached.
    pub fn view(&self, now: DateTime<Utc>) -> Vec<RowView> {
        self.rows
            .iter()
            .map(|row| {
                let derived = derive(&self.schema, row.entity(), row.actuals(), now);
                RowView {
                    id: row.id().to_string(),
                    name: row.entity().name.clone(),
                    parent_id: row.entity().parent_id.clone(),
                    actuals: row.actuals().clone(),
                    planned_duration: derived.planned_duration,
                    actual_duration: derived.actual_duration,
                    remaining: derived.remaining.render(&self.config.remaining_sentinel),
                    remaining_days: derived.remaining.days(),
                    variance: derived.variance,
                    state: self.tracker.state(row.id()),
                }
            })
            .collect()
    }

    pub(crate) fn clear_unsent_progress(&mut self, id: &str) {
        if let Some(index) = self.position(id)
            && !self.rows[index].unsent_progress.is_empty()
        {
            let updated = self.rows[index].without_unsent_progress();
            self.rows.set(index, updated);
        }
    }
}
