//! Dynamic record models described in JSON.
//!
//! A definition lists columns with their value types and directives, and
//! may declare its own composite kinds and named type-level directive sets:
//!
//! ```json
//! {
//!   "name": "Member",
//!   "composites": [{
//!     "kind": "app::Code",
//!     "attributes": [{ "name": "size", "type": "integer", "default": 6 }],
//!     "components": [{ "kind": "Upper" }, { "kind": "LengthMax", "attrs": { "max": 0 } }],
//!     "links": [{ "source": "size", "component": 1, "target": "max" }]
//!   }],
//!   "types": { "Name": [{ "kind": "Trim" }] },
//!   "columns": [
//!     { "number": 1, "field": "code", "type": "text", "required": true,
//!       "directives": [{ "kind": "app::Code" }] },
//!     { "number": 2, "field": "name", "type": "text", "component_type": "Name" }
//!   ]
//! }
//! ```
//!
//! Directive kinds are looked up by fully qualified or unambiguous short name.

pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::builder::{build_record_model, ColumnDef, FieldAccess, RecordModel, RecordSchema};
use crate::config::Configuration;
use crate::directive::{
    AttrSpec, AttrType, BuildCase, CompositeDefinition, CompositeDirective, Directive,
    DirectiveCatalog, DirectiveNode, Group, KindId,
};
use crate::error::DefinitionError;
use crate::logs::log_info;
use crate::models::{CellValue, DynamicRecord, ValueType};

pub use validate::{validate, validate_model_definition};

// =============================================================================
// Document Types
// =============================================================================

/// A directive as written in a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveDef {
    pub kind: String,
    #[serde(default)]
    pub attrs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cases: Vec<BuildCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub number: i64,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_on_read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_on_write: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default)]
    pub directives: Vec<DirectiveDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDef {
    pub source: String,
    pub component: usize,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeDef {
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    pub components: Vec<DirectiveDef>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
}

/// A complete model definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default = "default_header")]
    pub header: bool,
    #[serde(default)]
    pub validate_header: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<usize>,
    #[serde(default)]
    pub composites: Vec<CompositeDef>,
    #[serde(default)]
    pub types: BTreeMap<String, Vec<DirectiveDef>>,
    pub columns: Vec<ColumnDefinition>,
}

fn default_header() -> bool {
    true
}

// =============================================================================
// Loading
// =============================================================================

impl ModelDefinition {
    /// Parse and schema-check a definition.
    pub fn from_json_str(content: &str) -> Result<Self, DefinitionError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DefinitionError> {
        validate_model_definition(&value).map_err(|errors| DefinitionError::Schema { errors })?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Add the definition's composites to `config`, in document order.
    pub fn register_composites(&self, config: &mut Configuration) -> Result<(), DefinitionError> {
        for composite in &self.composites {
            let definition = composite_definition(composite, &config.catalog)?;
            config.register_composite(definition)?;
        }
        Ok(())
    }

    /// Schema of `DynamicRecord`s described by this definition.
    ///
    /// Composites must already be registered in `catalog`.
    pub fn to_schema(
        &self,
        catalog: &DirectiveCatalog,
    ) -> Result<RecordSchema<DynamicRecord>, DefinitionError> {
        let mut schema = RecordSchema::<DynamicRecord>::new(&self.name)
            .header(self.header)
            .validate_header(self.validate_header);
        if let Some(size) = self.partial {
            schema = schema.partial(size);
        }

        for column in &self.columns {
            schema = schema.column(self.column_def(column, catalog)?);
        }
        Ok(schema)
    }

    fn column_def(
        &self,
        column: &ColumnDefinition,
        catalog: &DirectiveCatalog,
    ) -> Result<ColumnDef<DynamicRecord>, DefinitionError> {
        let mut def = ColumnDef::new(
            column.number,
            &column.field,
            column.value_type,
            FieldAccess::dynamic(&column.field),
        );
        if let Some(label) = &column.label {
            def = def.label(label);
        }
        if column.required {
            def = def.required();
        }
        if let Some(text) = &column.default {
            def = def.default_value(text);
        }
        if let Some(text) = &column.default_on_read {
            def = def.default_on_read(text);
        }
        if let Some(text) = &column.default_on_write {
            def = def.default_on_write(text);
        }
        for directive in &column.directives {
            def = def.directive(directive_node(directive, &column.field, catalog)?);
        }
        if let Some(type_name) = &column.component_type {
            let entries = self.types.get(type_name).ok_or_else(|| DefinitionError::UnknownType {
                field: column.field.clone(),
                name: type_name.clone(),
            })?;
            let nodes = entries
                .iter()
                .map(|d| directive_node(d, &column.field, catalog))
                .collect::<Result<Vec<_>, _>>()?;
            def = def.with_type_directives(type_name, nodes);
        }
        Ok(def)
    }

    /// Convert a JSON object into a record of this model.
    ///
    /// Missing keys and `null` become null values; other keys are ignored.
    pub fn record_from_json(&self, value: &Value) -> Result<DynamicRecord, DefinitionError> {
        let mut record = DynamicRecord::new();
        for column in &self.columns {
            let raw = value.get(&column.field).unwrap_or(&Value::Null);
            let cell = CellValue::from_json(raw, column.value_type).ok_or_else(|| {
                DefinitionError::InvalidValue {
                    field: column.field.clone(),
                    value: raw.to_string(),
                    expected: column.value_type,
                }
            })?;
            record.set(column.field.clone(), cell);
        }
        Ok(record)
    }

    /// Register composites on a copy of `base` and build the model.
    pub fn build_model(
        &self,
        base: &Configuration,
        groups: &[Group],
    ) -> Result<RecordModel<DynamicRecord>, DefinitionError> {
        let mut config = base.clone();
        self.register_composites(&mut config)?;
        let schema = self.to_schema(&config.catalog)?;
        log_info(format!(
            "Definition '{}': {} columns, {} composites",
            self.name,
            self.columns.len(),
            self.composites.len()
        ));
        Ok(build_record_model(&schema, &config, groups)?)
    }
}

fn resolve_kind(
    name: &str,
    field: &str,
    catalog: &DirectiveCatalog,
) -> Result<KindId, DefinitionError> {
    catalog.lookup(name).ok_or_else(|| DefinitionError::UnknownDirective {
        field: field.to_string(),
        name: name.to_string(),
    })
}

/// Primitive or composite node for a written directive.
fn directive_node(
    def: &DirectiveDef,
    field: &str,
    catalog: &DirectiveCatalog,
) -> Result<DirectiveNode, DefinitionError> {
    let kind = resolve_kind(&def.kind, field, catalog)?;

    if catalog.composite(&kind).is_some() {
        let mut node = CompositeDirective::new(kind);
        for (name, value) in &def.attrs {
            node = node.with_attr(name.clone(), value.clone());
        }
        for case in &def.cases {
            node = node.on(*case);
        }
        for group in &def.groups {
            node = node.in_group(group.clone());
        }
        if let Some(message) = &def.message {
            node = node.with_message(message.clone());
        }
        return Ok(node.into());
    }

    let mut directive = Directive::new(kind);
    for (name, value) in &def.attrs {
        directive = directive.with_attr(name.clone(), value.clone());
    }
    if let Some(order) = def.order {
        directive = directive.with_order(order);
    }
    for case in &def.cases {
        directive = directive.on(*case);
    }
    for group in &def.groups {
        directive = directive.in_group(group.clone());
    }
    if let Some(message) = &def.message {
        directive = directive.with_message(message.clone());
    }
    Ok(directive.into())
}

fn attr_type(name: &str) -> Option<AttrType> {
    match name {
        "bool" => Some(AttrType::Bool),
        "integer" => Some(AttrType::Integer),
        "decimal" => Some(AttrType::Decimal),
        "text" => Some(AttrType::Text),
        "char" => Some(AttrType::Char),
        "text_list" => Some(AttrType::TextList),
        "scalar" => Some(AttrType::Scalar),
        _ => None,
    }
}

fn composite_definition(
    def: &CompositeDef,
    catalog: &DirectiveCatalog,
) -> Result<CompositeDefinition, DefinitionError> {
    let kind = KindId::new(def.kind.clone());
    let mut definition = CompositeDefinition::new(kind).describe(def.description.clone());

    for attribute in &def.attributes {
        let ty = attr_type(&attribute.ty).ok_or_else(|| DefinitionError::Schema {
            errors: vec![format!("{}: unknown attribute type '{}'", def.kind, attribute.ty)],
        })?;
        let spec = match &attribute.default {
            Some(default) => AttrSpec::with_default(&attribute.name, ty, default.clone()),
            None => AttrSpec::required(&attribute.name, ty),
        };
        definition = definition.attribute(spec);
    }
    for component in &def.components {
        definition = definition.component(directive_node(component, &def.kind, catalog)?);
    }
    for link in &def.links {
        definition = definition.link(&link.source, link.component, &link.target);
    }
    Ok(definition)
}
