//! Formatters: conversion between cell text and typed values.
//!
//! Every column has exactly one [`TextFormatter`], chosen by its value type
//! through the [`FormatterRegistry`] and configured by the field's format
//! directives. The read pipeline calls it from a [`ParseStep`], the write
//! pipeline from a [`PrintStep`].

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::{RowContext, Step, Variables, Violation};
use crate::directive::{kinds, Directive, KindId};
use crate::error::ConfigError;
use crate::models::{CellValue, ValueType};

pub const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d";
pub const DEFAULT_DATE_TIME_PATTERN: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_TIME_PATTERN: &str = "%H:%M:%S";

/// Text could not be parsed, or a value could not be printed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct FormatError {
    pub message: String,
}

impl FormatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn mismatch(expected: ValueType, value: &CellValue) -> Self {
        let found = value.value_type().map(|t| t.name()).unwrap_or("null");
        Self::new(format!("expected a {} value, found {}", expected, found))
    }
}

/// Bidirectional text conversion for one value type.
pub trait TextFormatter: fmt::Debug + Send + Sync {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError>;

    fn print(&self, value: &CellValue) -> Result<String, FormatError>;

    /// Variables added to parse failure messages (pattern, accepted tokens...).
    fn message_variables(&self) -> Variables {
        Variables::new()
    }

    fn describe(&self) -> String;
}

pub type FormatterRef = Arc<dyn TextFormatter>;

// =============================================================================
// Built-in Formatters
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct TextFormat;

impl TextFormatter for TextFormat {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        Ok(CellValue::Text(text.to_string()))
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        Ok(value.to_string())
    }

    fn describe(&self) -> String {
        "text".to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CharFormat;

impl TextFormatter for CharFormat {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(CellValue::Char(c)),
            _ => Err(FormatError::new("expected a single character")),
        }
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        match value {
            CellValue::Char(c) => Ok(c.to_string()),
            other => Err(FormatError::mismatch(ValueType::Char, other)),
        }
    }

    fn describe(&self) -> String {
        "char".to_string()
    }
}

/// Lenient number text drops surrounding whitespace and grouping separators.
fn clean_number(text: &str, lenient: bool) -> String {
    if lenient {
        text.trim().chars().filter(|c| *c != ',' && *c != '_').collect()
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntegerFormat {
    pub lenient: bool,
}

impl TextFormatter for IntegerFormat {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        clean_number(text, self.lenient)
            .parse::<i64>()
            .map(CellValue::Integer)
            .map_err(|e| FormatError::new(e.to_string()))
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        match value {
            CellValue::Integer(i) => Ok(i.to_string()),
            other => Err(FormatError::mismatch(ValueType::Integer, other)),
        }
    }

    fn describe(&self) -> String {
        "integer".to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecimalFormat {
    pub lenient: bool,
    pub precision: Option<usize>,
}

impl TextFormatter for DecimalFormat {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        let value = clean_number(text, self.lenient)
            .parse::<f64>()
            .map_err(|e| FormatError::new(e.to_string()))?;
        if !value.is_finite() {
            return Err(FormatError::new("number is not finite"));
        }
        Ok(CellValue::Decimal(value))
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        let number = match value {
            CellValue::Decimal(d) => *d,
            CellValue::Integer(i) => *i as f64,
            other => return Err(FormatError::mismatch(ValueType::Decimal, other)),
        };
        Ok(match self.precision {
            Some(p) => format!("{:.*}", p, number),
            None => number.to_string(),
        })
    }

    fn message_variables(&self) -> Variables {
        let mut vars = Variables::new();
        if let Some(p) = self.precision {
            vars.insert("precision".to_string(), Value::from(p));
        }
        vars
    }

    fn describe(&self) -> String {
        match self.precision {
            Some(p) => format!("decimal(precision={})", p),
            None => "decimal".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BooleanFormat {
    pub read_true: Vec<String>,
    pub read_false: Vec<String>,
    pub write_true: String,
    pub write_false: String,
    pub ignore_case: bool,
    pub fail_to_false: bool,
}

impl Default for BooleanFormat {
    fn default() -> Self {
        let tokens = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            read_true: tokens(&["true", "1", "yes", "on", "y", "t"]),
            read_false: tokens(&["false", "0", "no", "off", "n", "f"]),
            write_true: "true".to_string(),
            write_false: "false".to_string(),
            ignore_case: false,
            fail_to_false: false,
        }
    }
}

impl BooleanFormat {
    fn from_directive(d: &Directive) -> Result<Self, ConfigError> {
        Ok(Self {
            read_true: d.list_attr("read_true")?,
            read_false: d.list_attr("read_false")?,
            write_true: d.text_attr("write_true")?.to_string(),
            write_false: d.text_attr("write_false")?.to_string(),
            ignore_case: d.bool_attr("ignore_case")?,
            fail_to_false: d.bool_attr("fail_to_false")?,
        })
    }

    fn matches(&self, tokens: &[String], text: &str) -> bool {
        tokens.iter().any(|t| {
            if self.ignore_case {
                t.eq_ignore_ascii_case(text)
            } else {
                t == text
            }
        })
    }
}

impl TextFormatter for BooleanFormat {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        if self.matches(&self.read_true, text) {
            Ok(CellValue::Boolean(true))
        } else if self.matches(&self.read_false, text) || self.fail_to_false {
            Ok(CellValue::Boolean(false))
        } else {
            Err(FormatError::new("not a boolean token"))
        }
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        match value {
            CellValue::Boolean(true) => Ok(self.write_true.clone()),
            CellValue::Boolean(false) => Ok(self.write_false.clone()),
            other => Err(FormatError::mismatch(ValueType::Boolean, other)),
        }
    }

    fn message_variables(&self) -> Variables {
        let mut vars = Variables::new();
        vars.insert("true_values".to_string(), Value::from(self.read_true.join(", ")));
        vars.insert("false_values".to_string(), Value::from(self.read_false.join(", ")));
        vars
    }

    fn describe(&self) -> String {
        format!("boolean({}/{})", self.write_true, self.write_false)
    }
}

/// Dates, date-times and times with a `chrono` strftime pattern.
#[derive(Debug, Clone)]
pub struct TemporalFormat {
    pub value_type: ValueType,
    pub pattern: String,
}

impl TemporalFormat {
    pub fn new(value_type: ValueType, pattern: impl Into<String>) -> Self {
        Self {
            value_type,
            pattern: pattern.into(),
        }
    }

    pub fn default_for(value_type: ValueType) -> Self {
        let pattern = match value_type {
            ValueType::DateTime => DEFAULT_DATE_TIME_PATTERN,
            ValueType::Time => DEFAULT_TIME_PATTERN,
            _ => DEFAULT_DATE_PATTERN,
        };
        Self::new(value_type, pattern)
    }
}

impl TextFormatter for TemporalFormat {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        let parsed = match self.value_type {
            ValueType::DateTime => {
                NaiveDateTime::parse_from_str(text, &self.pattern).map(CellValue::DateTime)
            }
            ValueType::Time => NaiveTime::parse_from_str(text, &self.pattern).map(CellValue::Time),
            _ => NaiveDate::parse_from_str(text, &self.pattern).map(CellValue::Date),
        };
        parsed.map_err(|e| FormatError::new(e.to_string()))
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        match (self.value_type, value) {
            (ValueType::Date, CellValue::Date(d)) => Ok(d.format(&self.pattern).to_string()),
            (ValueType::DateTime, CellValue::DateTime(d)) => {
                Ok(d.format(&self.pattern).to_string())
            }
            (ValueType::Time, CellValue::Time(t)) => Ok(t.format(&self.pattern).to_string()),
            (expected, other) => Err(FormatError::mismatch(expected, other)),
        }
    }

    fn message_variables(&self) -> Variables {
        let mut vars = Variables::new();
        vars.insert("pattern".to_string(), Value::from(self.pattern.clone()));
        vars
    }

    fn describe(&self) -> String {
        format!("{}({})", self.value_type, self.pattern)
    }
}

/// A closed list of tokens. Cells hold the value, CSV text its label.
#[derive(Debug, Clone)]
pub struct EnumFormat {
    pub values: Vec<String>,
    pub labels: Vec<String>,
    pub ignore_case: bool,
}

impl EnumFormat {
    fn from_directive(d: &Directive) -> Result<Self, ConfigError> {
        let values = d.list_attr("values")?;
        if values.is_empty() {
            return Err(d.invalid("values", "should not be empty"));
        }
        let labels = match d.attr("labels") {
            None | Some(Value::Null) => values.clone(),
            Some(_) => d.list_attr("labels")?,
        };
        if labels.len() != values.len() {
            return Err(d.invalid(
                "labels",
                format!("expected {} labels, found {}", values.len(), labels.len()),
            ));
        }
        Ok(Self {
            values,
            labels,
            ignore_case: d.bool_attr("ignore_case")?,
        })
    }
}

impl TextFormatter for EnumFormat {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        let found = if self.ignore_case {
            let lowered = text.to_lowercase();
            self.labels.iter().position(|l| l.to_lowercase() == lowered)
        } else {
            self.labels.iter().position(|l| l == text)
        };
        match found {
            Some(index) => Ok(CellValue::Text(self.values[index].clone())),
            None => Err(FormatError::new("not one of the enumerated values")),
        }
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        match value {
            CellValue::Text(name) => Ok(self
                .values
                .iter()
                .position(|v| v == name)
                .map_or_else(|| name.clone(), |index| self.labels[index].clone())),
            other => Err(FormatError::mismatch(ValueType::Enum, other)),
        }
    }

    fn message_variables(&self) -> Variables {
        let mut vars = Variables::new();
        vars.insert("values".to_string(), Value::from(self.labels.join(", ")));
        vars.insert("ignore_case".to_string(), Value::from(self.ignore_case));
        vars
    }

    fn describe(&self) -> String {
        format!("enum({})", self.labels.join("|"))
    }
}

// =============================================================================
// Stateful Formatters
// =============================================================================

/// A formatter that needs exclusive access while it works.
pub trait StatefulFormatter: Send {
    fn parse(&mut self, text: &str) -> Result<CellValue, FormatError>;

    fn print(&mut self, value: &CellValue) -> Result<String, FormatError>;

    fn describe(&self) -> String {
        "custom".to_string()
    }
}

/// Serializes calls to a [`StatefulFormatter`] so it can be shared by threads.
pub struct SerializedFormatter<F> {
    inner: Mutex<F>,
}

impl<F: StatefulFormatter> SerializedFormatter<F> {
    pub fn new(formatter: F) -> Self {
        Self {
            inner: Mutex::new(formatter),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut F) -> Result<R, FormatError>) -> Result<R, FormatError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl<F> fmt::Debug for SerializedFormatter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedFormatter").finish_non_exhaustive()
    }
}

impl<F: StatefulFormatter> TextFormatter for SerializedFormatter<F> {
    fn parse(&self, text: &str) -> Result<CellValue, FormatError> {
        self.with(|inner| inner.parse(text))
    }

    fn print(&self, value: &CellValue) -> Result<String, FormatError> {
        self.with(|inner| inner.print(value))
    }

    fn describe(&self) -> String {
        self.with(|inner| Ok(inner.describe()))
            .unwrap_or_else(|_| "custom".to_string())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Builds a formatter from a field's format directives.
pub type FormatterBuilder =
    Arc<dyn Fn(&[Directive]) -> Result<FormatterRef, ConfigError> + Send + Sync>;

/// Formatter builders keyed by value type.
#[derive(Clone)]
pub struct FormatterRegistry {
    builders: HashMap<ValueType, FormatterBuilder>,
}

/// Wrap a closure as a [`FormatterBuilder`].
pub fn formatter_builder<F>(f: F) -> FormatterBuilder
where
    F: Fn(&[Directive]) -> Result<FormatterRef, ConfigError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn find<'a>(directives: &'a [Directive], kind: &KindId) -> Option<&'a Directive> {
    directives.iter().find(|d| d.kind() == kind)
}

fn number_options(directives: &[Directive]) -> Result<(bool, Option<usize>), ConfigError> {
    match find(directives, &kinds::NUMBER_FORMAT) {
        Some(d) => {
            let precision = match d.attr("precision") {
                None | Some(Value::Null) => None,
                Some(_) => Some(d.size_attr("precision")?),
            };
            Ok((d.bool_attr("lenient")?, precision))
        }
        None => Ok((false, None)),
    }
}

fn temporal(value_type: ValueType) -> FormatterBuilder {
    formatter_builder(move |directives| {
        let format = match find(directives, &kinds::DATE_TIME_FORMAT) {
            Some(d) => TemporalFormat::new(value_type, d.text_attr("pattern")?),
            None => TemporalFormat::default_for(value_type),
        };
        Ok(Arc::new(format) as FormatterRef)
    })
}

impl FormatterRegistry {
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registry covering every [`ValueType`].
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(ValueType::Text, formatter_builder(|_| {
            Ok(Arc::new(TextFormat) as FormatterRef)
        }));
        registry.register(ValueType::Char, formatter_builder(|_| {
            Ok(Arc::new(CharFormat) as FormatterRef)
        }));
        registry.register(ValueType::Integer, formatter_builder(|directives| {
            let (lenient, _) = number_options(directives)?;
            Ok(Arc::new(IntegerFormat { lenient }) as FormatterRef)
        }));
        registry.register(ValueType::Decimal, formatter_builder(|directives| {
            let (lenient, precision) = number_options(directives)?;
            Ok(Arc::new(DecimalFormat { lenient, precision }) as FormatterRef)
        }));
        registry.register(ValueType::Boolean, formatter_builder(|directives| {
            let format = match find(directives, &kinds::BOOLEAN_FORMAT) {
                Some(d) => BooleanFormat::from_directive(d)?,
                None => BooleanFormat::default(),
            };
            Ok(Arc::new(format) as FormatterRef)
        }));
        for value_type in [ValueType::Date, ValueType::DateTime, ValueType::Time] {
            registry.register(value_type, temporal(value_type));
        }
        registry.register(ValueType::Enum, formatter_builder(|directives| {
            let d = find(directives, &kinds::ENUM_FORMAT).ok_or(ConfigError::MissingAttribute {
                kind: kinds::ENUM_FORMAT,
                attribute: "values".to_string(),
            })?;
            Ok(Arc::new(EnumFormat::from_directive(d)?) as FormatterRef)
        }));
        registry
    }

    pub fn register(&mut self, value_type: ValueType, builder: FormatterBuilder) {
        self.builders.insert(value_type, builder);
    }

    pub fn build(
        &self,
        value_type: ValueType,
        directives: &[Directive],
    ) -> Result<FormatterRef, ConfigError> {
        let builder = self
            .builders
            .get(&value_type)
            .ok_or_else(|| {
                ConfigError::UnregisteredKind(KindId::new(format!("formatter::{}", value_type)))
            })?;
        builder(directives)
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.builders.keys().collect();
        types.sort();
        f.debug_struct("FormatterRegistry")
            .field("types", &types)
            .finish()
    }
}

// =============================================================================
// Parse and Print Steps
// =============================================================================

/// Turns cell text into a typed value. Empty text becomes `Null`.
#[derive(Debug)]
pub struct ParseStep {
    kind: KindId,
    value_type: ValueType,
    formatter: FormatterRef,
}

impl ParseStep {
    pub fn new(value_type: ValueType, formatter: FormatterRef) -> Self {
        Self {
            kind: kinds::PARSE,
            value_type,
            formatter,
        }
    }
}

impl Step for ParseStep {
    fn kind(&self) -> &KindId {
        &self.kind
    }

    fn process(&self, value: CellValue, _ctx: &RowContext) -> Result<CellValue, Violation> {
        let text = match value {
            CellValue::Text(text) => text,
            other => return Ok(other),
        };
        if text.is_empty() {
            return Ok(CellValue::Null);
        }
        self.formatter.parse(&text).map_err(|e| {
            Violation::new(self.kind.clone(), CellValue::Text(text))
                .with_var("type", self.value_type.name())
                .with_var("message", e.message)
                .with_vars(self.formatter.message_variables())
        })
    }

    fn describe(&self) -> String {
        format!("Parse({})", self.formatter.describe())
    }
}

/// Renders a typed value as cell text. `Null` prints as the empty string.
#[derive(Debug)]
pub struct PrintStep {
    kind: KindId,
    formatter: FormatterRef,
}

impl PrintStep {
    pub fn new(formatter: FormatterRef) -> Self {
        Self {
            kind: kinds::PRINT,
            formatter,
        }
    }
}

impl Step for PrintStep {
    fn kind(&self) -> &KindId {
        &self.kind
    }

    fn process(&self, value: CellValue, _ctx: &RowContext) -> Result<CellValue, Violation> {
        if value.is_null() {
            return Ok(CellValue::Text(String::new()));
        }
        match self.formatter.print(&value) {
            Ok(text) => Ok(CellValue::Text(text)),
            Err(e) => Err(Violation::new(self.kind.clone(), value).with_var("message", e.message)),
        }
    }

    fn describe(&self) -> String {
        format!("Print({})", self.formatter.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveCatalog;
    use serde_json::json;

    fn formatter(value_type: ValueType, directives: &[Directive]) -> FormatterRef {
        let catalog = DirectiveCatalog::standard();
        let normalized: Vec<_> = directives
            .iter()
            .map(|d| catalog.normalize(d).unwrap())
            .collect();
        FormatterRegistry::standard()
            .build(value_type, &normalized)
            .unwrap()
    }

    #[test]
    fn test_integer_lenient() {
        let strict = formatter(ValueType::Integer, &[]);
        assert!(strict.parse("1,000").is_err());

        let lenient = formatter(
            ValueType::Integer,
            &[kinds::number_format().with_attr("lenient", true)],
        );
        assert_eq!(lenient.parse(" 1,000 ").unwrap(), CellValue::Integer(1000));
    }

    #[test]
    fn test_decimal_precision() {
        let f = formatter(ValueType::Decimal, &[kinds::number_format().with_attr("precision", 2)]);
        assert_eq!(f.print(&CellValue::Decimal(3.14159)).unwrap(), "3.14");
        assert_eq!(f.message_variables().get("precision"), Some(&Value::from(2)));
    }

    #[test]
    fn test_boolean_tokens() {
        let f = formatter(
            ValueType::Boolean,
            &[kinds::boolean_format()
                .with_attr("read_true", serde_json::json!(["oui"]))
                .with_attr("write_true", "oui")
                .with_attr("ignore_case", true)],
        );
        assert_eq!(f.parse("OUI").unwrap(), CellValue::Boolean(true));
        assert_eq!(f.parse("no").unwrap(), CellValue::Boolean(false));
        assert!(f.parse("maybe").is_err());
        assert_eq!(f.print(&CellValue::Boolean(true)).unwrap(), "oui");
    }

    #[test]
    fn test_date_pattern() {
        let f = formatter(ValueType::Date, &[kinds::date_time_format("%d/%m/%Y")]);
        let parsed = f.parse("15/03/2024").unwrap();
        assert_eq!(parsed, CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()));
        assert_eq!(f.print(&parsed).unwrap(), "15/03/2024");
        assert!(f.print(&CellValue::Integer(1)).is_err());
    }

    #[test]
    fn test_parse_step_reports_variables() {
        let step = ParseStep::new(ValueType::Date, formatter(ValueType::Date, &[]));
        let ctx = RowContext::default();
        assert_eq!(step.process(CellValue::Text(String::new()), &ctx), Ok(CellValue::Null));

        let err = step.process(CellValue::Text("nope".into()), &ctx).unwrap_err();
        assert_eq!(err.kind, kinds::PARSE);
        assert_eq!(err.rejected, CellValue::Text("nope".into()));
        assert_eq!(err.variables.get("type"), Some(&Value::from("date")));
        assert_eq!(err.variables.get("pattern"), Some(&Value::from("%Y-%m-%d")));
    }

    #[test]
    fn test_enum_labels() {
        let format = formatter(
            ValueType::Enum,
            &[kinds::enum_format(["S", "L"])
                .with_attr("labels", json!(["small", "large"]))
                .with_attr("ignore_case", true)],
        );
        assert_eq!(format.parse("LARGE").unwrap(), CellValue::Text("L".into()));
        assert!(format.parse("L").is_err());
        assert_eq!(format.print(&CellValue::Text("S".into())).unwrap(), "small");
        assert_eq!(format.print(&CellValue::Text("M".into())).unwrap(), "M");
        assert_eq!(format.message_variables().get("values"), Some(&json!("small, large")));
    }

    #[test]
    fn test_enum_needs_values() {
        let err = FormatterRegistry::standard().build(ValueType::Enum, &[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAttribute { .. }));

        let catalog = DirectiveCatalog::standard();
        let uneven = catalog
            .normalize(&kinds::enum_format(["A", "B"]).with_attr("labels", json!(["a"])))
            .unwrap();
        let err = FormatterRegistry::standard().build(ValueType::Enum, &[uneven]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAttribute { .. }));
    }

    #[test]
    fn test_print_step_null() {
        let step = PrintStep::new(formatter(ValueType::Integer, &[]));
        let ctx = RowContext::default();
        assert_eq!(step.process(CellValue::Null, &ctx), Ok(CellValue::Text(String::new())));
        assert_eq!(step.process(CellValue::Integer(42), &ctx), Ok(CellValue::Text("42".into())));
    }

    struct Counter {
        calls: usize,
    }

    impl StatefulFormatter for Counter {
        fn parse(&mut self, text: &str) -> Result<CellValue, FormatError> {
            self.calls += 1;
            if text == "boom" {
                panic!("formatter failed mid-call");
            }
            Ok(CellValue::Text(format!("{}#{}", text, self.calls)))
        }

        fn print(&mut self, value: &CellValue) -> Result<String, FormatError> {
            Ok(value.to_string())
        }
    }

    #[test]
    fn test_serialized_formatter_is_shareable() {
        let shared: FormatterRef = Arc::new(SerializedFormatter::new(Counter { calls: 0 }));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let f = Arc::clone(&shared);
                std::thread::spawn(move || f.parse("x").unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(shared.parse("x").unwrap(), CellValue::Text("x#5".into()));
    }

    #[test]
    fn test_serialized_formatter_survives_panic() {
        let shared: FormatterRef = Arc::new(SerializedFormatter::new(Counter { calls: 0 }));
        let f = Arc::clone(&shared);
        assert!(std::thread::spawn(move || f.parse("boom")).join().is_err());

        assert_eq!(shared.parse("x").unwrap(), CellValue::Text("x#2".into()));
        assert_eq!(shared.describe(), "custom");
    }
}
