/// Reconciliation scenario tests
///
/// Load -> edit -> derive -> sanitize flows over the public API
/// Run with: cargo test --test reconcile_tests

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use sitetrack::prelude::parts::{derive, duration_days, remaining_days};
use sitetrack::reconcile::Remaining;
use sitetrack::{
    ActualsGrid, ActualsSchema, CellEdit, CellValue, EditOutcome, PlannedEntity, RawActuals,
    RecordingSink, normalize, sanitize,
};

fn task_grid(entities: Vec<PlannedEntity>) -> ActualsGrid<RecordingSink> {
    let mut grid = ActualsGrid::new(ActualsSchema::task(), RecordingSink::new());
    grid.load(entities);
    grid
}

#[test]
fn test_normalizer_fixed_key_set_for_every_kind() {
    for schema in [
        ActualsSchema::project(),
        ActualsSchema::task(),
        ActualsSchema::activity(),
    ] {
        let mut expected: Vec<&str> = schema.fields().iter().map(|f| f.name).collect();
        expected.sort_unstable();

        let mut partial = RawActuals::new();
        partial.insert("status".to_string(), CellValue::from("started"));

        for raw in [None, Some(RawActuals::new()), Some(partial)] {
            let record = normalize(&schema, raw.as_ref());
            assert_eq!(record.keys().collect::<Vec<_>>(), expected);
            assert_eq!(normalize(&schema, Some(record.values())), record);
        }
    }
}

#[test]
fn test_completed_task_scenario() {
    let entity: PlannedEntity = serde_json::from_value(json!({
        "id": "t1",
        "name": "Site survey",
        "actuals": { "start_date": "2024-01-01", "end_date": "2024-01-11" }
    }))
    .unwrap();
    let grid = task_grid(vec![entity]);

    let views = grid.view(Utc::now());
    assert_eq!(views[0].actual_duration, Some(10));
    assert_eq!(views[0].remaining, "N/A");
    assert_eq!(views[0].remaining_days, None);
}

#[test]
fn test_remaining_counts_future_days() {
    let now = Utc::now();
    let end = CellValue::Date(now + Duration::hours(36));
    assert_eq!(remaining_days(&end, now), Remaining::Days(2));

    let ended = CellValue::Date(now - Duration::days(3));
    assert_eq!(remaining_days(&ended, now), Remaining::NotApplicable);
}

#[test]
fn test_duration_blank_for_unusable_bounds() {
    let valid = CellValue::from("2024-06-01");
    for other in [
        CellValue::Null,
        CellValue::from(""),
        CellValue::from("tomorrow"),
        CellValue::Bool(true),
    ] {
        assert_eq!(duration_days(&valid, &other), None);
        assert_eq!(duration_days(&other, &valid), None);
    }
}

#[test]
fn test_budget_edit_sanitizes_to_number() {
    let mut grid = ActualsGrid::new(ActualsSchema::project(), RecordingSink::new());
    grid.load(vec![PlannedEntity::new("p1", "Warehouse")]);
    assert_eq!(
        grid.row("p1").unwrap().actuals().get("budget"),
        &CellValue::Null
    );

    grid.apply_edit(CellEdit::new("p1", "actuals.budget", "5000"))
        .unwrap();
    let row = grid.row("p1").unwrap();
    let payload = sanitize(grid.schema(), row.actuals());

    assert_eq!(payload.get("budget"), Some(&json!(5000)));
    assert!(payload.get("budget").unwrap().is_number());
}

#[test]
fn test_sanitizer_matches_iso_midnight_and_nulls_garbage() {
    let schema = ActualsSchema::task();
    let mut raw = RawActuals::new();
    raw.insert("start_date".into(), CellValue::from("2024-01-01"));
    raw.insert("end_date".into(), CellValue::from("sometime"));
    raw.insert("labor_cost".into(), CellValue::from("abc"));
    raw.insert("material_cost".into(), CellValue::from(""));
    raw.insert("status".into(), CellValue::from(""));

    let payload = sanitize(&schema, &normalize(&schema, Some(&raw))).into_json();
    assert_eq!(payload["start_date"], json!("2024-01-01T00:00:00.000Z"));
    assert_eq!(payload["end_date"], Value::Null);
    assert_eq!(payload["labor_cost"], Value::Null);
    assert_eq!(payload["material_cost"], Value::Null);
    assert_eq!(payload["status"], Value::Null);
    assert_eq!(payload["equipment_cost"], Value::Null);
}

#[test]
fn test_edits_outside_actuals_leave_dirty_set_alone() {
    let mut grid = task_grid(vec![PlannedEntity::new("t1", "Piling")]);
    for field in ["name", "start_date", "planned_costs.labor", "actualsX.status"] {
        let outcome = grid.apply_edit(CellEdit::new("t1", field, "x")).unwrap();
        assert_eq!(outcome, EditOutcome::Ignored);
    }
    assert_eq!(grid.dirty_count(), 0);

    grid.apply_edit(CellEdit::new("t1", "actuals.status", "x"))
        .unwrap();
    assert_eq!(grid.dirty_count(), 1);
}

#[test]
fn test_derived_values_follow_edits() {
    let schema = ActualsSchema::activity();
    let planned = PlannedEntity::new("a1", "Rebar")
        .with_planned_cost(sitetrack::CostCategory::Budget, 2000.0)
        .with_planned_cost(sitetrack::CostCategory::Material, 800.0);
    let actuals = normalize(&schema, None)
        .with_value("budget", CellValue::from("2500"))
        .with_value("material_cost", CellValue::from(700.0));

    let derived = derive(&schema, &planned, &actuals, Utc::now());
    assert_eq!(derived.variance.total, 400.0);
    assert!(derived.variance.is_over());
}

#[test]
fn test_edit_script_deserializes_loose_values() {
    let edits: Vec<CellEdit> = serde_json::from_value(json!([
        { "row_id": "t1", "field": "actuals.labor_cost", "value": "1200" },
        { "row_id": "t1", "field": "actuals.progress", "value": 40 },
        { "row_id": "t1", "field": "actuals.end_date" }
    ]))
    .unwrap();

    let mut grid = task_grid(vec![PlannedEntity::new("t1", "Piling")]);
    assert_eq!(grid.apply_edits(edits).unwrap(), 3);

    let actuals = grid.row("t1").unwrap().actuals();
    assert_eq!(actuals.get("labor_cost"), &CellValue::from("1200"));
    assert_eq!(actuals.get("progress"), &CellValue::Number(40.0));
    assert_eq!(actuals.get("end_date"), &CellValue::Null);
}
