// Validator Engine: one stateless validator per component kind.
// Every validator runs Schema → Geometry → Ratios; the first failing phase wins.

pub mod column;
pub mod ibeam;

use serde_json::{Map, Value};

use crate::errors::AppError;

/// Schema phase entry: the payload must be a JSON object.
fn as_object(raw: &Value) -> Result<&Map<String, Value>, AppError> {
    raw.as_object()
        .ok_or_else(|| AppError::schema("<root>", "must be a JSON object"))
}

/// Schema phase: field must be present and numeric (strings are rejected, not coerced).
fn require_number(object: &Map<String, Value>, field: &str) -> Result<f64, AppError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(AppError::schema(field, "is required")),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| AppError::schema(field, "must be numeric")),
    }
}

/// Schema phase: like `require_number` but absence is allowed.
fn optional_number(object: &Map<String, Value>, field: &str) -> Result<Option<f64>, AppError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| AppError::schema(field, "must be numeric")),
    }
}

fn ensure_positive(field: &str, value: f64) -> Result<(), AppError> {
    // Written as a negated comparison so NaN is rejected too.
    if !(value > 0.0) {
        return Err(AppError::geometry(
            field,
            format!("{} must be greater than 0 (got {value})", label(field)),
        ));
    }
    Ok(())
}

fn ensure_at_most(field: &str, value: f64, max: f64) -> Result<(), AppError> {
    if value > max {
        return Err(AppError::geometry(
            field,
            format!("{} ({value}) exceeds maximum limit of {max}mm", label(field)),
        ));
    }
    Ok(())
}

fn ensure_at_least(field: &str, value: f64, min: f64) -> Result<(), AppError> {
    if value < min {
        return Err(AppError::geometry(
            field,
            format!("{} ({value}) is below minimum of {min}mm", label(field)),
        ));
    }
    Ok(())
}

fn ensure_within(field: &str, value: f64, min: f64, max: f64) -> Result<(), AppError> {
    ensure_at_least(field, value, min)?;
    ensure_at_most(field, value, max)
}

/// `total_depth` → `Total depth`.
fn label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_number_rejects_strings() {
        let raw = json!({"width": "200"});
        let err = require_number(as_object(&raw).unwrap(), "width").unwrap_err();
        assert!(matches!(err, AppError::Schema { ref field, .. } if field == "width"));
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_require_number_rejects_missing_and_null() {
        let raw = json!({"height": null});
        let object = as_object(&raw).unwrap();
        assert!(require_number(object, "width").is_err());
        assert!(require_number(object, "height").is_err());
    }

    #[test]
    fn test_optional_number() {
        let raw = json!({"length": 1200, "bad": true});
        let object = as_object(&raw).unwrap();
        assert_eq!(optional_number(object, "length").unwrap(), Some(1200.0));
        assert_eq!(optional_number(object, "missing").unwrap(), None);
        assert!(optional_number(object, "bad").is_err());
    }

    #[test]
    fn test_non_object_payload_is_schema_error() {
        let err = as_object(&json!([1, 2])).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_ERROR");
    }

    #[test]
    fn test_ensure_positive_rejects_nan() {
        assert!(ensure_positive("width", f64::NAN).is_err());
        assert!(ensure_positive("width", 0.0).is_err());
        assert!(ensure_positive("width", 0.1).is_ok());
    }

    #[test]
    fn test_label() {
        assert_eq!(label("total_depth"), "Total depth");
        assert_eq!(label("width"), "Width");
    }
}
