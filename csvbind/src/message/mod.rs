//! Rendering of row failures into readable messages.
//!
//! The binding engine only records a failure's kind and variables. This
//! module turns them into text: a [`MessageResolver`] picks a `{var}`
//! template per kind and a [`MessageInterpolator`] fills it in.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::directive::{kinds, KindId};
use crate::error::{FieldFailure, RecordFailure, RowErrors};

static PLACEHOLDER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

const FALLBACK_TEMPLATE: &str = "{label}: value '{rejected}' rejected by {kind}";

/// Substitutes `{name}` placeholders. Unknown names are left as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageInterpolator;

impl MessageInterpolator {
    pub fn interpolate(&self, template: &str, variables: &BTreeMap<String, Value>) -> String {
        let Some(placeholder) = PLACEHOLDER.as_ref() else {
            return template.to_string();
        };
        placeholder
            .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
                Some(value) => display_value(value),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Message templates keyed by directive kind.
#[derive(Debug, Clone)]
pub struct MessageResolver {
    templates: HashMap<KindId, String>,
    fallback: String,
    interpolator: MessageInterpolator,
}

impl Default for MessageResolver {
    fn default() -> Self {
        Self::standard()
    }
}

impl MessageResolver {
    /// Resolver with no templates at all.
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
            fallback: FALLBACK_TEMPLATE.to_string(),
            interpolator: MessageInterpolator,
        }
    }

    /// English templates for every built-in kind.
    pub fn standard() -> Self {
        let mut resolver = Self::empty();
        let defaults: [(KindId, &str); 19] = [
            (kinds::REQUIRE, "{label}: a value is required"),
            (kinds::EQUALS, "{label}: '{rejected}' is not one of {values}"),
            (kinds::PATTERN, "{label}: '{rejected}' does not match {regex}"),
            (kinds::LENGTH_MIN, "{label}: length {length} is below the minimum {min}"),
            (kinds::LENGTH_MAX, "{label}: length {length} exceeds the maximum {max}"),
            (kinds::LENGTH_BETWEEN, "{label}: length {length} is not between {min} and {max}"),
            (kinds::LENGTH_EXACT, "{label}: length {length} differs from the required {expected}"),
            (kinds::NUMBER_MIN, "{label}: {rejected} is below the minimum {min}"),
            (kinds::NUMBER_MAX, "{label}: {rejected} exceeds the maximum {max}"),
            (kinds::NUMBER_RANGE, "{label}: {rejected} is not between {min} and {max}"),
            (kinds::DATE_TIME_MIN, "{label}: {rejected} is before {min}"),
            (kinds::DATE_TIME_MAX, "{label}: {rejected} is after {max}"),
            (kinds::DATE_TIME_RANGE, "{label}: {rejected} is not between {min} and {max}"),
            (kinds::WORD_FORBID, "{label}: '{rejected}' contains forbidden words: {words}"),
            (kinds::WORD_REQUIRE, "{label}: '{rejected}' lacks required words: {words}"),
            (kinds::UNIQUE, "{label}: '{rejected}' already appears on line {duplicated_line}"),
            (kinds::PARSE, "{label}: '{rejected}' is not a valid {type} ({message})"),
            (kinds::PRINT, "{label}: cannot print {rejected} ({message})"),
            (kinds::BIND, "{label}: {rejected} cannot be stored, expected {expected}"),
        ];
        for (kind, template) in defaults {
            resolver.set(kind, template);
        }
        resolver
    }

    /// Add or replace the template of a kind.
    pub fn set(&mut self, kind: KindId, template: impl Into<String>) {
        self.templates.insert(kind, template.into());
    }

    pub fn with_fallback(mut self, template: impl Into<String>) -> Self {
        self.fallback = template.into();
        self
    }

    pub fn template(&self, kind: &KindId) -> &str {
        self.templates.get(kind).map_or(&self.fallback, String::as_str)
    }

    pub fn interpolate(&self, template: &str, variables: &BTreeMap<String, Value>) -> String {
        self.interpolator.interpolate(template, variables)
    }
}

impl FieldFailure {
    /// Variables available to templates: the failure's own plus its position.
    pub fn message_variables(&self) -> BTreeMap<String, Value> {
        let mut vars = self.variables.clone();
        vars.insert("label".into(), Value::from(self.label.clone()));
        vars.insert("field".into(), Value::from(self.field.clone()));
        vars.insert("column".into(), Value::from(self.column));
        vars.insert("line".into(), Value::from(self.line));
        vars.insert("row".into(), Value::from(self.row));
        vars.insert("rejected".into(), Value::from(self.rejected.to_string()));
        vars.insert("kind".into(), Value::from(self.kind.short_name()));
        vars
    }

    /// The directive's own message when set, otherwise the kind's template.
    pub fn render(&self, resolver: &MessageResolver) -> String {
        let template = self.message.as_deref().unwrap_or_else(|| resolver.template(&self.kind));
        resolver.interpolate(template, &self.message_variables())
    }
}

impl RecordFailure {
    pub fn render(&self, resolver: &MessageResolver) -> String {
        resolver.interpolate(&self.message, &self.variables)
    }
}

impl RowErrors {
    /// One line per failure, prefixed with the source line.
    pub fn render(&self, resolver: &MessageResolver) -> Vec<String> {
        let fields = self
            .fields
            .iter()
            .map(|f| format!("line {}: {}", self.line, f.render(resolver)));
        let records = self
            .record
            .iter()
            .map(|r| format!("line {}: {}", self.line, r.render(resolver)));
        fields.chain(records).collect()
    }
}
