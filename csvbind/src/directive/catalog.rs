//! Registry of known directive kinds and their attribute schemas.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::kind::{Category, KindId};
use super::kinds;
use super::node::{CompositeDefinition, Directive};
use crate::error::ConfigError;
use crate::models::ValueType;

// =============================================================================
// Attribute Schemas
// =============================================================================

/// JSON shape an attribute value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Bool,
    Integer,
    Decimal,
    Text,
    Char,
    TextList,
    /// String or number, interpreted by the field's formatter.
    Scalar,
}

impl AttrType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            AttrType::Bool => value.is_boolean(),
            AttrType::Integer => value.is_i64() || value.is_u64(),
            AttrType::Decimal => value.is_number(),
            AttrType::Text => value.is_string(),
            AttrType::Char => value.as_str().is_some_and(|s| s.chars().count() == 1),
            AttrType::TextList => match value {
                Value::String(_) => true,
                Value::Array(items) => items.iter().all(Value::is_string),
                _ => false,
            },
            AttrType::Scalar => value.is_string() || value.is_number(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttrType::Bool => "boolean",
            AttrType::Integer => "integer",
            AttrType::Decimal => "number",
            AttrType::Text => "string",
            AttrType::Char => "single character",
            AttrType::TextList => "list of strings",
            AttrType::Scalar => "string or number",
        }
    }
}

/// One attribute of a directive kind.
///
/// An attribute without a default must be supplied. A `null` default marks
/// an optional attribute with no value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: String,
    pub ty: AttrType,
    pub default: Option<Value>,
}

impl AttrSpec {
    pub fn required(name: &str, ty: AttrType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: None,
        }
    }

    pub fn with_default(name: &str, ty: AttrType, default: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: Some(default.into()),
        }
    }

    pub fn optional(name: &str, ty: AttrType) -> Self {
        Self::with_default(name, ty, Value::Null)
    }

    fn admits(&self, value: &Value) -> bool {
        (value.is_null() && self.default == Some(Value::Null)) || self.ty.accepts(value)
    }
}

/// Description of a primitive directive kind.
#[derive(Debug, Clone, PartialEq)]
pub struct KindSpec {
    pub kind: KindId,
    pub category: Category,
    pub attrs: Vec<AttrSpec>,
    /// Field types the kind supports; empty means any type.
    pub value_types: Vec<ValueType>,
    pub description: String,
}

impl KindSpec {
    pub fn new(kind: KindId, category: Category) -> Self {
        Self {
            kind,
            category,
            attrs: Vec::new(),
            value_types: Vec::new(),
            description: String::new(),
        }
    }

    pub fn attr(mut self, spec: AttrSpec) -> Self {
        self.attrs.push(spec);
        self
    }

    pub fn for_types(mut self, types: &[ValueType]) -> Self {
        self.value_types = types.to_vec();
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn supports(&self, value_type: ValueType) -> bool {
        self.value_types.is_empty() || self.value_types.contains(&value_type)
    }

    pub fn attr_spec(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// All directive kinds known to a configuration.
#[derive(Debug, Clone, Default)]
pub struct DirectiveCatalog {
    kinds: BTreeMap<KindId, KindSpec>,
    composites: BTreeMap<KindId, Arc<CompositeDefinition>>,
}

impl DirectiveCatalog {
    /// Catalog with no kinds at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog holding every built-in kind and composite.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for spec in kinds::builtin_specs() {
            catalog.kinds.insert(spec.kind.clone(), spec);
        }
        for def in kinds::builtin_composites() {
            catalog.composites.insert(def.kind.clone(), Arc::new(def));
        }
        catalog
    }

    fn ensure_free(&self, kind: &KindId) -> Result<(), ConfigError> {
        if self.kinds.contains_key(kind) || self.composites.contains_key(kind) {
            return Err(ConfigError::DuplicateKind(kind.clone()));
        }
        Ok(())
    }

    pub fn register(&mut self, spec: KindSpec) -> Result<(), ConfigError> {
        self.ensure_free(&spec.kind)?;
        self.kinds.insert(spec.kind.clone(), spec);
        Ok(())
    }

    /// Register a composite kind. Links are checked when the composite is
    /// expanded, against the catalog in use at that point.
    pub fn register_composite(
        &mut self,
        definition: CompositeDefinition,
    ) -> Result<(), ConfigError> {
        self.ensure_free(&definition.kind)?;
        self.composites
            .insert(definition.kind.clone(), Arc::new(definition));
        Ok(())
    }

    pub fn spec(&self, kind: &KindId) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    pub fn composite(&self, kind: &KindId) -> Option<&Arc<CompositeDefinition>> {
        self.composites.get(kind)
    }

    pub fn specs(&self) -> impl Iterator<Item = &KindSpec> {
        self.kinds.values()
    }

    pub fn composites(&self) -> impl Iterator<Item = &Arc<CompositeDefinition>> {
        self.composites.values()
    }

    /// Find a kind by fully qualified name, or by its short name when that
    /// name is unambiguous.
    pub fn lookup(&self, name: &str) -> Option<KindId> {
        let all = self.kinds.keys().chain(self.composites.keys());
        let mut short_matches = Vec::new();
        for kind in all {
            if kind.as_str() == name {
                return Some(kind.clone());
            }
            if kind.short_name() == name {
                short_matches.push(kind);
            }
        }
        match short_matches.as_slice() {
            [single] => Some((*single).clone()),
            _ => None,
        }
    }

    /// Check a directive's attributes against its kind and fill defaults.
    pub fn normalize(&self, directive: &Directive) -> Result<Directive, ConfigError> {
        let spec = self
            .spec(&directive.kind)
            .ok_or_else(|| ConfigError::UnregisteredKind(directive.kind.clone()))?;

        if let Some(unknown) = directive.attrs.keys().find(|k| spec.attr_spec(k).is_none()) {
            return Err(ConfigError::UnknownAttribute {
                kind: directive.kind.clone(),
                attribute: unknown.clone(),
            });
        }

        let mut normalized = directive.clone();
        for attr in &spec.attrs {
            match directive.attrs.get(&attr.name) {
                Some(value) if !attr.admits(value) => {
                    let expected = format!("expected {}", attr.ty.name());
                    return Err(directive.invalid(&attr.name, expected));
                }
                Some(Value::String(s)) if attr.ty == AttrType::TextList => {
                    normalized
                        .attrs
                        .insert(attr.name.clone(), Value::Array(vec![Value::String(s.clone())]));
                }
                Some(_) => {}
                None => match &attr.default {
                    Some(default) => {
                        normalized.attrs.insert(attr.name.clone(), default.clone());
                    }
                    None => {
                        return Err(ConfigError::MissingAttribute {
                            kind: directive.kind.clone(),
                            attribute: attr.name.clone(),
                        });
                    }
                },
            }
        }
        Ok(normalized)
    }

    /// Build a normalized directive from attribute pairs.
    pub fn instantiate<I, K>(&self, kind: &KindId, attrs: I) -> Result<Directive, ConfigError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let directive = attrs
            .into_iter()
            .fold(Directive::new(kind.clone()), |d, (k, v)| d.with_attr(k, v));
        self.normalize(&directive)
    }

    /// Markdown table of every kind, used by the `kinds` command.
    pub fn describe(&self) -> String {
        let mut out = String::from("| Kind | Category | Attributes | Description |\n");
        out.push_str("|------|----------|------------|-------------|\n");
        for spec in self.kinds.values() {
            let attrs = describe_attrs(&spec.attrs);
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                spec.kind.short_name(),
                spec.category,
                attrs,
                spec.description
            );
        }
        for def in self.composites.values() {
            let attrs = describe_attrs(&def.attributes);
            let _ = writeln!(
                out,
                "| {} | composite | {} | {} |",
                def.kind.short_name(),
                attrs,
                def.description
            );
        }
        out
    }
}

fn describe_attrs(attrs: &[AttrSpec]) -> String {
    if attrs.is_empty() {
        return "-".to_string();
    }
    attrs
        .iter()
        .map(|a| match &a.default {
            None => format!("{}: {}", a.name, a.ty.name()),
            Some(Value::Null) => format!("{}?: {}", a.name, a.ty.name()),
            Some(d) => format!("{}: {} = {}", a.name, a.ty.name(), d),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_fills_defaults() {
        let catalog = DirectiveCatalog::standard();
        let d = catalog
            .instantiate(&kinds::MULTI_PAD, [("size", json!(5))])
            .unwrap();
        assert_eq!(d.attr("pad_char"), Some(&json!(" ")));
        assert_eq!(d.attr("chopped"), Some(&json!(false)));
    }

    #[test]
    fn test_normalize_rejects_bad_attributes() {
        let catalog = DirectiveCatalog::standard();
        let unknown = catalog.instantiate(&kinds::TRIM, [("size", json!(1))]);
        assert!(matches!(unknown, Err(ConfigError::UnknownAttribute { .. })));

        let missing = catalog.instantiate(&kinds::LEFT_PAD, Vec::<(String, Value)>::new());
        assert!(matches!(missing, Err(ConfigError::MissingAttribute { .. })));

        let wrong = catalog.instantiate(&kinds::LEFT_PAD, [("size", json!("four"))]);
        assert!(matches!(wrong, Err(ConfigError::InvalidAttribute { .. })));
    }

    #[test]
    fn test_single_string_becomes_list() {
        let catalog = DirectiveCatalog::standard();
        let d = catalog
            .instantiate(&kinds::EQUALS, [("values", json!("A"))])
            .unwrap();
        assert_eq!(d.attr("values"), Some(&json!(["A"])));
    }

    #[test]
    fn test_lookup_by_short_name() {
        let catalog = DirectiveCatalog::standard();
        assert_eq!(catalog.lookup("NumberRange"), Some(kinds::NUMBER_RANGE));
        assert_eq!(catalog.lookup("csvbind::conversion::FixedSize"), Some(kinds::FIXED_SIZE));
        assert_eq!(catalog.lookup("Nope"), None);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut catalog = DirectiveCatalog::standard();
        let again = KindSpec::new(kinds::TRIM, Category::Conversion);
        assert_eq!(catalog.register(again), Err(ConfigError::DuplicateKind(kinds::TRIM)));
    }
}
