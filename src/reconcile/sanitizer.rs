//! Converts edited cells into the strict update payload.

use super::normalizer::ActualsRecord;
use crate::core::value::{format_number, to_iso_millis};
use crate::core::{ActualsSchema, CellValue, FieldKind};
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};

/// Wire form of an actuals record: every schema key, each value `null`, a
/// number or a string. Safe to serialize as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SanitizedActuals(Map<String, JsonValue>);

impl SanitizedActuals {
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

/// Date cell to ISO string. Falsy input other than the number zero is null.
pub fn sanitize_date(value: &CellValue) -> JsonValue {
    let zero = matches!(value, CellValue::Number(n) if *n == 0.0);
    if value.is_falsy() && !zero {
        return JsonValue::Null;
    }
    value
        .as_datetime()
        .map(|dt| JsonValue::String(to_iso_millis(&dt)))
        .unwrap_or(JsonValue::Null)
}

/// Numeric cell to a JSON number; whole values become integers.
pub fn sanitize_number(value: &CellValue) -> JsonValue {
    match value.as_number() {
        Some(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => JsonValue::from(n as i64),
        Some(n) => Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        None => JsonValue::Null,
    }
}

pub fn sanitize_text(value: &CellValue) -> JsonValue {
    if value.is_falsy() {
        return JsonValue::Null;
    }
    match value {
        CellValue::Text(s) => JsonValue::String(s.clone()),
        CellValue::Number(n) => JsonValue::String(format_number(*n)),
        other => JsonValue::String(other.to_string()),
    }
}

pub fn sanitize_value(kind: FieldKind, value: &CellValue) -> JsonValue {
    match kind {
        FieldKind::Date => sanitize_date(value),
        FieldKind::Number => sanitize_number(value),
        FieldKind::Text => sanitize_text(value),
    }
}

/// Builds the update payload for one row. Never fails; anything that does
/// not parse is sent as `null`.
pub fn sanitize(schema: &ActualsSchema, actuals: &ActualsRecord) -> SanitizedActuals {
    let map = schema
        .fields()
        .iter()
        .map(|field| {
            (
                field.name.to_string(),
                sanitize_value(field.kind, actuals.get(field.name)),
            )
        })
        .collect();
    SanitizedActuals(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::normalizer::normalize;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_dates() {
        assert_eq!(
            sanitize_date(&CellValue::from("2024-01-01")),
            json!("2024-01-01T00:00:00.000Z")
        );
        let picked = Utc.with_ymd_and_hms(2024, 5, 2, 13, 45, 0).unwrap();
        assert_eq!(
            sanitize_date(&CellValue::Date(picked)),
            json!("2024-05-02T13:45:00.000Z")
        );
        assert_eq!(
            sanitize_date(&CellValue::Number(0.0)),
            json!("1970-01-01T00:00:00.000Z")
        );
        assert_eq!(sanitize_date(&CellValue::from("")), JsonValue::Null);
        assert_eq!(sanitize_date(&CellValue::Bool(false)), JsonValue::Null);
        assert_eq!(sanitize_date(&CellValue::from("31/31/2024")), JsonValue::Null);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(sanitize_number(&CellValue::from("5000")), json!(5000));
        assert_eq!(sanitize_number(&CellValue::from("12.5")), json!(12.5));
        assert_eq!(sanitize_number(&CellValue::Number(0.0)), json!(0));
        assert_eq!(sanitize_number(&CellValue::from("abc")), JsonValue::Null);
        assert_eq!(sanitize_number(&CellValue::from("")), JsonValue::Null);
        assert_eq!(sanitize_number(&CellValue::Null), JsonValue::Null);
        assert_eq!(sanitize_number(&CellValue::Number(f64::NAN)), JsonValue::Null);
    }

    #[test]
    fn test_text() {
        assert_eq!(sanitize_text(&CellValue::from("on hold")), json!("on hold"));
        assert_eq!(sanitize_text(&CellValue::from("")), JsonValue::Null);
        assert_eq!(sanitize_text(&CellValue::Number(0.0)), JsonValue::Null);
        assert_eq!(sanitize_text(&CellValue::Number(3.0)), json!("3"));
    }

    #[test]
    fn test_record_payload_has_every_key() {
        let schema = ActualsSchema::project();
        let actuals = normalize(&schema, None)
            .with_value("budget", CellValue::from("5000"))
            .with_value("start_date", CellValue::from("2024-01-01"))
            .with_value("progress", CellValue::from("n/a"));

        let payload = sanitize(&schema, &actuals);
        assert_eq!(payload.len(), schema.fields().len());
        assert_eq!(
            payload.into_json(),
            json!({
                "start_date": "2024-01-01T00:00:00.000Z",
                "end_date": null,
                "progress": null,
                "status": null,
                "budget": 5000
            })
        );
    }
}
