use crate::core::CellValue;
use crate::reconcile::progress::ProgressUpdate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw `actuals` sub-record as it arrives from the fetch layer: any subset of
/// keys, any loosely typed values.
pub type RawActuals = BTreeMap<String, CellValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Task,
    Activity,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Task => write!(f, "task"),
            Self::Activity => write!(f, "activity"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Labor,
    Material,
    Equipment,
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Date,
    Number,
    Text,
}

/// One recognized key of an actuals record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActualsField {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Set when the field is the actual counterpart of a planned cost.
    pub cost: Option<CostCategory>,
}

impl ActualsField {
    pub const fn date(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Date,
            cost: None,
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
            cost: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            cost: None,
        }
    }

    pub const fn cost(name: &'static str, category: CostCategory) -> Self {
        Self {
            name,
            kind: FieldKind::Number,
            cost: Some(category),
        }
    }
}

const PROJECT_FIELDS: &[ActualsField] = &[
    ActualsField::date("start_date"),
    ActualsField::date("end_date"),
    ActualsField::number("progress"),
    ActualsField::text("status"),
    ActualsField::cost("budget", CostCategory::Budget),
];

const TASK_FIELDS: &[ActualsField] = &[
    ActualsField::date("start_date"),
    ActualsField::date("end_date"),
    ActualsField::number("progress"),
    ActualsField::text("status"),
    ActualsField::cost("labor_cost", CostCategory::Labor),
    ActualsField::cost("material_cost", CostCategory::Material),
    ActualsField::cost("equipment_cost", CostCategory::Equipment),
];

const ACTIVITY_FIELDS: &[ActualsField] = &[
    ActualsField::date("start_date"),
    ActualsField::date("end_date"),
    ActualsField::number("progress"),
    ActualsField::text("status"),
    ActualsField::cost("labor_cost", CostCategory::Labor),
    ActualsField::cost("material_cost", CostCategory::Material),
    ActualsField::cost("equipment_cost", CostCategory::Equipment),
    ActualsField::cost("budget", CostCategory::Budget),
    ActualsField::text("remarks"),
];

/// Field list that parameterizes the reconciliation pattern for one entity
/// kind. The same grid, normalizer and sanitizer serve every kind; only the
/// schema differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActualsSchema {
    kind: EntityKind,
    fields: &'static [ActualsField],
}

impl ActualsSchema {
    pub const fn new(kind: EntityKind, fields: &'static [ActualsField]) -> Self {
        Self { kind, fields }
    }

    pub const fn project() -> Self {
        Self::new(EntityKind::Project, PROJECT_FIELDS)
    }

    pub const fn task() -> Self {
        Self::new(EntityKind::Task, TASK_FIELDS)
    }

    pub const fn activity() -> Self {
        Self::new(EntityKind::Activity, ACTIVITY_FIELDS)
    }

    pub const fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Project => Self::project(),
            EntityKind::Task => Self::task(),
            EntityKind::Activity => Self::activity(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn fields(&self) -> &'static [ActualsField] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static ActualsField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn cost_fields(&self) -> impl Iterator<Item = (&'static ActualsField, CostCategory)> {
        self.fields
            .iter()
            .filter_map(|field| field.cost.map(|category| (field, category)))
    }
}

/// A project, task or activity as delivered by the fetch layer.
///
/// Planned values are read-only here; only `actuals` is edited through the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedEntity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub planned_costs: BTreeMap<CostCategory, f64>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actuals: Option<RawActuals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub progress_history: Vec<ProgressUpdate>,
}

impl PlannedEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: name.into(),
            start_date: None,
            end_date: None,
            planned_costs: BTreeMap::new(),
            progress: None,
            actuals: None,
            progress_history: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_dates(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.start_date = start.map(str::to_string);
        self.end_date = end.map(str::to_string);
        self
    }

    pub fn with_planned_cost(mut self, category: CostCategory, amount: f64) -> Self {
        self.planned_costs.insert(category, amount);
        self
    }

    pub fn with_actual(mut self, field: &str, value: impl Into<CellValue>) -> Self {
        self.actuals
            .get_or_insert_with(RawActuals::new)
            .insert(field.to_string(), value.into());
        self
    }

    pub fn planned_cost(&self, category: CostCategory) -> f64 {
        self.planned_costs.get(&category).copied().unwrap_or(0.0)
    }
}
