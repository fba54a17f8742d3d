//! JSON Schema validation for layout templates and long records.
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `block-layout.json` - a [`StaggeredBlockLayout`] as stored or imported
//! - `long-record.json` - one melted [`LongRecord`](crate::models::LongRecord)
//!
//! Both are JSON Schema Draft 7.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use passboard::validation::{is_valid_layout, validate_layout};
//!
//! let layout = json!({
//!     "blockWidth": 3,
//!     "blocks": [{ "offset": 0, "label": "Central" }, { "offset": 4, "label": "Sabah" }]
//! });
//! assert!(validate_layout(&layout).is_ok());
//!
//! let overlapping = json!({
//!     "blocks": [{ "offset": 0, "label": "Central" }, { "offset": 2, "label": "Sabah" }]
//! });
//! assert!(!is_valid_layout(&overlapping));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::ValidationError;
use crate::models::StaggeredBlockLayout;

static LAYOUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/block-layout.json"))
        .expect("Invalid embedded schema")
});

static LONG_RECORD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/long-record.json"))
        .expect("Invalid embedded schema")
});

/// Validate `data` against `schema`.
///
/// Returns every validation message on failure.
///
/// ```
/// use serde_json::json;
/// use passboard::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "Central" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a layout document and decode it.
///
/// The schema covers shape; block overlap is checked on the decoded layout.
pub fn parse_layout(data: &Value) -> Result<StaggeredBlockLayout, ValidationError> {
    validate(&LAYOUT_SCHEMA, data).map_err(|errors| ValidationError::SchemaError { errors })?;

    let layout: StaggeredBlockLayout =
        serde_json::from_value(data.clone()).map_err(|e| ValidationError::InvalidValue {
            field: "layout".to_string(),
            message: e.to_string(),
        })?;

    layout
        .check()
        .map_err(|message| ValidationError::InvalidValue {
            field: "blocks".to_string(),
            message,
        })?;

    Ok(layout)
}

pub fn validate_layout(data: &Value) -> Result<(), ValidationError> {
    parse_layout(data).map(|_| ())
}

pub fn is_valid_layout(data: &Value) -> bool {
    parse_layout(data).is_ok()
}

/// Validate one serialized long record.
pub fn validate_long_record(data: &Value) -> Result<(), ValidationError> {
    validate(&LONG_RECORD_SCHEMA, data).map_err(|errors| ValidationError::SchemaError { errors })
}

pub fn is_valid_long_record(data: &Value) -> bool {
    is_valid(&LONG_RECORD_SCHEMA, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LongRecord, Status};
    use serde_json::json;

    #[test]
    fn test_default_layout_is_valid() {
        let value = serde_json::to_value(StaggeredBlockLayout::default_outlets()).unwrap();
        assert!(validate_layout(&value).is_ok());
    }

    #[test]
    fn test_layout_missing_label() {
        let value = json!({ "blocks": [{ "offset": 0 }] });
        match validate_layout(&value) {
            Err(ValidationError::SchemaError { errors }) => assert!(!errors.is_empty()),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_layout_too_narrow() {
        let value = json!({ "blockWidth": 2, "blocks": [{ "offset": 0, "label": "Central" }] });
        assert!(!is_valid_layout(&value));
    }

    #[test]
    fn test_layout_overlap_is_invalid_value() {
        let value = json!({
            "blocks": [{ "offset": 0, "label": "Central" }, { "offset": 1, "label": "Sabah" }]
        });
        assert!(matches!(
            validate_layout(&value),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_layout_defaults_width() {
        let layout = parse_layout(&json!({ "blocks": [{ "offset": 4, "label": "Sabah" }] })).unwrap();
        assert_eq!(layout.block_width, 3);
        assert_eq!(layout.labels(), vec!["Sabah".to_string()]);
    }

    #[test]
    fn test_long_record_schema() {
        let plain = serde_json::to_value(LongRecord::new("Central", "Pass", 48)).unwrap();
        assert!(validate_long_record(&plain).is_ok());

        let labelled = serde_json::to_value(
            LongRecord::new("iPhone (Pass)", "Central", 20).with_labels("iPhone", Status::Pass),
        )
        .unwrap();
        assert!(is_valid_long_record(&labelled));

        assert!(!is_valid_long_record(&json!({ "entity": "x", "dimension": "y", "count": -1 })));
        assert!(!is_valid_long_record(&json!({ "entity": "x", "dimension": "y" })));
    }
}
