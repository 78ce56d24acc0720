//! Map-backed records for models declared at runtime.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::CellValue;

/// A record whose fields are looked up by name.
///
/// Used for models loaded from JSON definitions, where no Rust struct exists.
/// Missing fields read as `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    fields: BTreeMap<String, CellValue>,
}

impl DynamicRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> CellValue {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style variant of [`DynamicRecord::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as a JSON object, values converted with [`CellValue::to_json`].
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_field_is_null() {
        let record = DynamicRecord::new().with("code", "A1");
        assert_eq!(record.get("code"), CellValue::Text("A1".into()));
        assert_eq!(record.get("other"), CellValue::Null);
        assert_eq!(record.to_json(), json!({ "code": "A1" }));
    }
}
