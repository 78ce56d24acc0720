//! JSON Schema validation of model definitions.
//!
//! The schema is embedded at compile time from
//! `schemas/model-definition.json` and checked with JSON Schema Draft 7.

use serde_json::Value;

const MODEL_DEFINITION_SCHEMA: &str = include_str!("../../schemas/model-definition.json");

/// Validate a JSON value against a schema.
///
/// Returns every violation found, not only the first.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

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

/// The embedded model definition schema.
pub fn model_definition_schema() -> Result<Value, Vec<String>> {
    serde_json::from_str(MODEL_DEFINITION_SCHEMA)
        .map_err(|e| vec![format!("Invalid embedded schema: {}", e)])
}

/// Validate a document against the model definition schema.
pub fn validate_model_definition(data: &Value) -> Result<(), Vec<String>> {
    validate(&model_definition_schema()?, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_definition() {
        let doc = json!({
            "name": "Person",
            "columns": [{ "number": 1, "field": "name", "type": "text" }]
        });
        assert!(validate_model_definition(&doc).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let doc = json!({
            "name": "",
            "columns": [{ "number": 1, "field": "age", "type": "float" }],
            "colour": "blue"
        });
        let errors = validate_model_definition(&doc).unwrap_err();
        assert!(errors.len() >= 3, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("float")));
    }

    #[test]
    fn test_directive_shape() {
        let doc = json!({
            "name": "Row",
            "columns": [{
                "number": 1, "field": "code", "type": "text",
                "directives": [{ "kind": "Trim", "cases": ["sideways"] }]
            }]
        });
        assert!(validate_model_definition(&doc).is_err());
    }
}
