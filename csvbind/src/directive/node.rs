//! Directive values and composite definitions.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::catalog::AttrSpec;
use super::kind::{BuildCase, Group, KindId};
use crate::error::ConfigError;

// =============================================================================
// Primitive Directives
// =============================================================================

/// A primitive directive attached to a field.
///
/// Values are immutable once placed in a schema; the builder methods consume
/// and return `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub(crate) kind: KindId,
    pub(crate) attrs: BTreeMap<String, Value>,
    pub(crate) order: i32,
    pub(crate) cases: BTreeSet<BuildCase>,
    pub(crate) groups: BTreeSet<Group>,
    pub(crate) message: Option<String>,
}

impl Directive {
    pub fn new(kind: KindId) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
            order: 0,
            cases: BTreeSet::new(),
            groups: BTreeSet::new(),
            message: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Restrict the directive to a build case. May be called for both cases.
    pub fn on(mut self, case: BuildCase) -> Self {
        self.cases.insert(case);
        self
    }

    pub fn in_group(mut self, group: impl Into<Group>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Override the message template reported when this directive rejects a value.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    pub fn kind(&self) -> &KindId {
        &self.kind
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn cases(&self) -> &BTreeSet<BuildCase> {
        &self.cases
    }

    pub fn groups(&self) -> &BTreeSet<Group> {
        &self.groups
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// An empty case set applies to both directions.
    pub fn applies_to(&self, case: BuildCase) -> bool {
        self.cases.is_empty() || self.cases.contains(&case)
    }

    // -------------------------------------------------------------------------
    // Typed attribute access, used by processor factories
    // -------------------------------------------------------------------------

    fn required(&self, name: &str) -> Result<&Value, ConfigError> {
        match self.attrs.get(name) {
            Some(Value::Null) | None => Err(ConfigError::MissingAttribute {
                kind: self.kind.clone(),
                attribute: name.to_string(),
            }),
            Some(v) => Ok(v),
        }
    }

    pub(crate) fn invalid(&self, name: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidAttribute {
            kind: self.kind.clone(),
            attribute: name.to_string(),
            message: message.into(),
        }
    }

    pub fn int_attr(&self, name: &str) -> Result<i64, ConfigError> {
        self.required(name)?
            .as_i64()
            .ok_or_else(|| self.invalid(name, "expected an integer"))
    }

    pub fn size_attr(&self, name: &str) -> Result<usize, ConfigError> {
        let value = self.int_attr(name)?;
        usize::try_from(value).map_err(|_| self.invalid(name, format!("{} is negative", value)))
    }

    pub fn bool_attr(&self, name: &str) -> Result<bool, ConfigError> {
        self.required(name)?
            .as_bool()
            .ok_or_else(|| self.invalid(name, "expected a boolean"))
    }

    pub fn text_attr(&self, name: &str) -> Result<&str, ConfigError> {
        self.required(name)?
            .as_str()
            .ok_or_else(|| self.invalid(name, "expected a string"))
    }

    /// Optional text attribute; `null` and absence both read as `None`.
    pub fn opt_text_attr(&self, name: &str) -> Result<Option<&str>, ConfigError> {
        match self.attrs.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.invalid(name, "expected a string")),
        }
    }

    pub fn char_attr(&self, name: &str) -> Result<char, ConfigError> {
        let text = self.text_attr(name)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(self.invalid(name, format!("'{}' is not a single character", text))),
        }
    }

    pub fn list_attr(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        match self.required(name)? {
            Value::String(s) => Ok(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.invalid(name, "expected a list of strings"))
                })
                .collect(),
            _ => Err(self.invalid(name, "expected a list of strings")),
        }
    }

    /// Scalar attribute rendered as text (numbers keep their JSON form).
    pub fn scalar_text_attr(&self, name: &str) -> Result<String, ConfigError> {
        match self.required(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(self.invalid(name, "expected a string or a number")),
        }
    }
}

// =============================================================================
// Composite Directives
// =============================================================================

/// Use of a composite kind on a field, with the attribute values it supplies.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDirective {
    pub(crate) kind: KindId,
    pub(crate) attrs: BTreeMap<String, Value>,
    pub(crate) cases: BTreeSet<BuildCase>,
    pub(crate) groups: BTreeSet<Group>,
    pub(crate) message: Option<String>,
}

impl CompositeDirective {
    pub fn new(kind: KindId) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
            cases: BTreeSet::new(),
            groups: BTreeSet::new(),
            message: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn on(mut self, case: BuildCase) -> Self {
        self.cases.insert(case);
        self
    }

    pub fn in_group(mut self, group: impl Into<Group>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    pub fn kind(&self) -> &KindId {
        &self.kind
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }
}

/// Either a primitive directive or a composite awaiting expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveNode {
    Primitive(Directive),
    Composite(CompositeDirective),
}

impl DirectiveNode {
    pub fn kind(&self) -> &KindId {
        match self {
            DirectiveNode::Primitive(d) => &d.kind,
            DirectiveNode::Composite(c) => &c.kind,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, DirectiveNode::Composite(_))
    }

    pub(crate) fn set_attr(&mut self, name: &str, value: Value) {
        match self {
            DirectiveNode::Primitive(d) => d.attrs.insert(name.to_string(), value),
            DirectiveNode::Composite(c) => c.attrs.insert(name.to_string(), value),
        };
    }
}

impl From<Directive> for DirectiveNode {
    fn from(directive: Directive) -> Self {
        DirectiveNode::Primitive(directive)
    }
}

impl From<CompositeDirective> for DirectiveNode {
    fn from(composite: CompositeDirective) -> Self {
        DirectiveNode::Composite(composite)
    }
}

// =============================================================================
// Composite Definitions
// =============================================================================

/// Assigns a composite attribute to an attribute of one of its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideLink {
    /// Attribute name on the composite.
    pub source: String,
    /// Index into [`CompositeDefinition::components`].
    pub component: usize,
    /// Attribute name on the component.
    pub target: String,
}

impl OverrideLink {
    pub fn new(source: impl Into<String>, component: usize, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            component,
            target: target.into(),
        }
    }
}

/// A directive kind defined as a bundle of component directives.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDefinition {
    pub kind: KindId,
    pub description: String,
    /// Attributes the composite accepts, with their defaults.
    pub attributes: Vec<AttrSpec>,
    /// Component templates, expanded in this order.
    pub components: Vec<DirectiveNode>,
    pub overrides: Vec<OverrideLink>,
}

impl CompositeDefinition {
    pub fn new(kind: KindId) -> Self {
        Self {
            kind,
            description: String::new(),
            attributes: Vec::new(),
            components: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn attribute(mut self, spec: AttrSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    pub fn component(mut self, node: impl Into<DirectiveNode>) -> Self {
        self.components.push(node.into());
        self
    }

    pub fn link(mut self, source: &str, component: usize, target: &str) -> Self {
        self.overrides.push(OverrideLink::new(source, component, target));
        self
    }

    pub fn attribute_spec(&self, name: &str) -> Option<&AttrSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }
}
