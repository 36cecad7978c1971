//! Display values computed from planned vs. actual fields.
//!
//! Nothing here is stored: callers recompute on every read, passing `now`
//! explicitly so results stay deterministic under test.

use super::normalizer::ActualsRecord;
use crate::core::{ActualsSchema, CellValue, CostCategory, PlannedEntity};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub const DEFAULT_REMAINING_SENTINEL: &str = "N/A";

/// Days left until an end date.
///
/// Entities that already ended, or have no end, report `NotApplicable`
/// rather than a negative count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Days(i64),
    NotApplicable,
}

impl Remaining {
    pub fn days(&self) -> Option<i64> {
        match self {
            Self::Days(days) => Some(*days),
            Self::NotApplicable => None,
        }
    }

    pub fn render(&self, sentinel: &str) -> String {
        match self {
            Self::Days(days) => days.to_string(),
            Self::NotApplicable => sentinel.to_string(),
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(DEFAULT_REMAINING_SENTINEL))
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Days(days) => serializer.serialize_i64(*days),
            Self::NotApplicable => serializer.serialize_str(DEFAULT_REMAINING_SENTINEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CostVariance {
    pub by_category: BTreeMap<CostCategory, f64>,
    pub total: f64,
}

impl CostVariance {
    pub fn get(&self, category: CostCategory) -> Option<f64> {
        self.by_category.get(&category).copied()
    }

    pub fn is_over(&self) -> bool {
        self.total > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedFields {
    pub planned_duration: Option<i64>,
    pub actual_duration: Option<i64>,
    pub remaining: Remaining,
    pub variance: CostVariance,
}

fn ceil_days(millis: i64) -> Option<i64> {
    let days = (millis as f64 / MILLIS_PER_DAY).ceil();
    days.is_finite().then_some(days as i64)
}

pub fn duration_between(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<i64> {
    let (start, end) = (start?, end?);
    ceil_days((end - start).num_milliseconds())
}

/// `ceil((end - start) / 1 day)`, or `None` when either bound is missing or
/// does not parse.
pub fn duration_days(start: &CellValue, end: &CellValue) -> Option<i64> {
    duration_between(start.as_datetime(), end.as_datetime())
}

pub fn remaining_until(end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Remaining {
    match end {
        Some(end) if end > now => ceil_days((end - now).num_milliseconds())
            .map(Remaining::Days)
            .unwrap_or(Remaining::NotApplicable),
        _ => Remaining::NotApplicable,
    }
}

pub fn remaining_days(end: &CellValue, now: DateTime<Utc>) -> Remaining {
    remaining_until(end.as_datetime(), now)
}

/// Actual minus planned, per cost category the schema tracks.
///
/// Missing or unparseable amounts count as zero on both sides.
pub fn cost_variance(
    schema: &ActualsSchema,
    planned: &PlannedEntity,
    actuals: &ActualsRecord,
) -> CostVariance {
    let by_category: BTreeMap<CostCategory, f64> = schema
        .cost_fields()
        .map(|(field, category)| {
            let actual = actuals.get(field.name).as_number().unwrap_or(0.0);
            (category, actual - planned.planned_cost(category))
        })
        .collect();
    let total = by_category.values().sum();
    CostVariance { by_category, total }
}

fn planned_date(raw: &Option<String>) -> CellValue {
    raw.as_deref().map(CellValue::from).unwrap_or_default()
}

/// Computes every derived value of one row.
///
/// Remaining days count toward the actual end date when one is recorded and
/// fall back to the planned end date otherwise.
pub fn derive(
    schema: &ActualsSchema,
    planned: &PlannedEntity,
    actuals: &ActualsRecord,
    now: DateTime<Utc>,
) -> DerivedFields {
    let planned_start = planned_date(&planned.start_date);
    let planned_end = planned_date(&planned.end_date);
    let actual_end = actuals.get("end_date");

    let end_for_remaining = actual_end
        .as_datetime()
        .or_else(|| planned_end.as_datetime());

    DerivedFields {
        planned_duration: duration_days(&planned_start, &planned_end),
        actual_duration: duration_days(actuals.get("start_date"), actual_end),
        remaining: remaining_until(end_for_remaining, now),
        variance: cost_variance(schema, planned, actuals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::normalizer::normalize;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_duration_whole_and_partial_days() {
        let start = CellValue::from("2024-01-01");
        assert_eq!(duration_days(&start, &CellValue::from("2024-01-11")), Some(10));
        assert_eq!(
            duration_days(&start, &CellValue::from("2024-01-11T06:00:00Z")),
            Some(11)
        );
        assert_eq!(duration_days(&start, &start), Some(0));
    }

    #[test]
    fn test_duration_blank_when_bound_missing() {
        let start = CellValue::from("2024-01-01");
        assert_eq!(duration_days(&start, &CellValue::Null), None);
        assert_eq!(duration_days(&CellValue::Null, &start), None);
        assert_eq!(duration_days(&start, &CellValue::from("soon")), None);
    }

    #[test]
    fn test_remaining_only_for_future_end() {
        let now = at(2024, 1, 5);
        assert_eq!(
            remaining_days(&CellValue::from("2024-01-11"), now),
            Remaining::Days(6)
        );
        assert_eq!(
            remaining_days(&CellValue::from("2024-01-01"), now),
            Remaining::NotApplicable
        );
        assert_eq!(
            remaining_days(&CellValue::from("2024-01-05"), now),
            Remaining::NotApplicable
        );
        assert_eq!(remaining_days(&CellValue::Null, now), Remaining::NotApplicable);
    }

    #[test]
    fn test_remaining_rendering() {
        assert_eq!(Remaining::NotApplicable.to_string(), "N/A");
        assert_eq!(Remaining::NotApplicable.render("-"), "-");
        assert_eq!(Remaining::Days(3).to_string(), "3");
        assert_eq!(
            serde_json::to_value(Remaining::NotApplicable).unwrap(),
            serde_json::json!("N/A")
        );
    }

    #[test]
    fn test_variance_treats_missing_as_zero() {
        let schema = ActualsSchema::task();
        let planned = PlannedEntity::new("t1", "Framing")
            .with_planned_cost(CostCategory::Labor, 1000.0)
            .with_planned_cost(CostCategory::Material, 400.0);
        let actuals = normalize(&schema, None)
            .with_value("labor_cost", CellValue::from("1250"))
            .with_value("equipment_cost", CellValue::from(75.0));

        let variance = cost_variance(&schema, &planned, &actuals);
        assert_eq!(variance.get(CostCategory::Labor), Some(250.0));
        assert_eq!(variance.get(CostCategory::Material), Some(-400.0));
        assert_eq!(variance.get(CostCategory::Equipment), Some(75.0));
        assert_eq!(variance.get(CostCategory::Budget), None);
        assert_eq!(variance.total, -75.0);
        assert!(!variance.is_over());
    }

    #[test]
    fn test_remaining_falls_back_to_planned_end() {
        let schema = ActualsSchema::task();
        let planned =
            PlannedEntity::new("t1", "Roofing").with_dates(Some("2024-03-01"), Some("2024-03-20"));
        let actuals = normalize(&schema, None);

        let derived = derive(&schema, &planned, &actuals, at(2024, 3, 10));
        assert_eq!(derived.planned_duration, Some(19));
        assert_eq!(derived.actual_duration, None);
        assert_eq!(derived.remaining, Remaining::Days(10));

        let actuals = actuals.with_value("end_date", CellValue::from("2024-03-12"));
        let derived = derive(&schema, &planned, &actuals, at(2024, 3, 10));
        assert_eq!(derived.remaining, Remaining::Days(2));
    }
}
