//! Error types for the binding engine.
//!
//! Two classes of failure never mix:
//!
//! - [`ConfigError`] - Raised while building a record model; fatal
//! - [`FieldFailure`] / [`RowErrors`] - Raised per row while reading or writing
//!
//! Around them sit the I/O and definition layers:
//!
//! - [`CsvError`] - Tokenizer, encoding and header errors
//! - [`RowError`] - A row that could not be bound
//! - [`DefinitionError`] - Invalid JSON model definitions
//! - [`BindError`] - Top-level error wrapping all of the above
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::directive::KindId;
use crate::models::{CellValue, ValueType};

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors detected while building a record model.
///
/// Once a model is built, none of these can occur.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Directive kind does not apply to the field's value type.
    #[error("Field '{field}' of type {value_type} does not support directive {kind}")]
    IncompatibleValueType {
        field: String,
        kind: KindId,
        value_type: ValueType,
    },

    /// A required attribute has no value and no default.
    #[error("Directive {kind} has no value for attribute '{attribute}'")]
    MissingAttribute { kind: KindId, attribute: String },

    /// Attribute not declared by the directive kind.
    #[error("Unknown attribute '{attribute}' for directive {kind}")]
    UnknownAttribute { kind: KindId, attribute: String },

    /// Attribute value is malformed (bad regex, min > max, wrong JSON type...).
    #[error("Invalid attribute '{attribute}' for directive {kind}: {message}")]
    InvalidAttribute {
        kind: KindId,
        attribute: String,
        message: String,
    },

    /// Composite override link targets an attribute the component lacks.
    #[error("Composite {composite} overrides unknown attribute '{target}' of {component}")]
    UnknownOverrideTarget {
        composite: KindId,
        component: KindId,
        target: String,
    },

    /// Composite override link references a component that does not exist.
    #[error("Composite {composite} links to missing component #{index}")]
    UnknownOverrideComponent { composite: KindId, index: usize },

    /// Overridden value has the wrong type for the component attribute.
    #[error("Composite {composite}: '{attribute}' does not fit {component}.{target} ({expected})")]
    IncompatibleOverride {
        composite: KindId,
        attribute: String,
        component: KindId,
        target: String,
        expected: String,
    },

    /// Composite nesting exceeded the configured depth.
    #[error("Composite expansion of {kind} exceeded depth {limit}")]
    ExpansionTooDeep { kind: KindId, limit: usize },

    /// No catalog entry or processor factory for a kind.
    #[error("Directive kind {0} is not registered")]
    UnregisteredKind(KindId),

    /// A kind was registered twice.
    #[error("Directive kind {0} is already registered")]
    DuplicateKind(KindId),

    /// Default text rejected by the field's formatter.
    #[error("Default value '{text}' of field '{field}' cannot be parsed: {message}")]
    InvalidDefault {
        field: String,
        text: String,
        message: String,
    },

    /// Column numbers start at 1.
    #[error("Field '{field}' has invalid column number {number}")]
    InvalidColumnNumber { field: String, number: i64 },

    /// Two fields share a column number.
    #[error("Column {number} is declared by both '{first}' and '{second}'")]
    DuplicateColumns {
        number: usize,
        first: String,
        second: String,
    },

    /// Column numbers have gaps and the schema is not partial.
    #[error("Columns {missing:?} are not declared")]
    MissingColumns { missing: Vec<usize> },

    /// The schema declares no columns.
    #[error("Record type {0} declares no columns")]
    NoColumns(String),

    /// A header-mapped column whose label is absent from the header.
    #[error("Field '{field}' has no column labeled '{label}' in the header")]
    UnresolvedColumn { field: String, label: String },

    /// Fixed-width I/O over columns that have no fixed size.
    #[error("Columns {columns:?} have no fixed size")]
    MissingFixedSize { columns: Vec<String> },
}

// =============================================================================
// Row-level Failures
// =============================================================================

/// One column of one row rejected by a pipeline step.
///
/// Holds everything a message resolver needs: the rejected value, the
/// column identity, the rejecting kind, an optional message template
/// override and the variables the step reported.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}, column {column} ({label}): rejected by {kind}")]
pub struct FieldFailure {
    pub rejected: CellValue,
    pub column: usize,
    pub label: String,
    pub field: String,
    pub kind: KindId,
    pub message: Option<String>,
    pub variables: BTreeMap<String, Value>,
    pub line: usize,
    pub row: usize,
}

/// A failure reported by a record-level validator.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub code: String,
    pub message: String,
    pub variables: BTreeMap<String, Value>,
}

/// Every failure of a single row, collected in one pass over its columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowErrors {
    pub line: usize,
    pub row: usize,
    pub fields: Vec<FieldFailure>,
    pub record: Vec<RecordFailure>,
}

impl RowErrors {
    pub fn new(line: usize, row: usize) -> Self {
        Self {
            line,
            row,
            ..Self::default()
        }
    }

    pub fn push(&mut self, failure: FieldFailure) {
        self.fields.push(failure);
    }

    /// Report a record-level failure.
    pub fn reject(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.record.push(RecordFailure {
            code: code.into(),
            message: message.into(),
            variables: BTreeMap::new(),
        });
    }

    /// Report a record-level failure with message variables.
    pub fn reject_with(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
        variables: BTreeMap<String, Value>,
    ) {
        self.record.push(RecordFailure {
            code: code.into(),
            message: message.into(),
            variables,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.record.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len() + self.record.len()
    }

    /// Whether a given field already failed in this row.
    pub fn has_field_error(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

impl fmt::Display for RowErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} failure(s)", self.line, self.len())
    }
}

impl std::error::Error for RowErrors {}

/// A row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    /// Column count differs from the model.
    #[error("Line {line}: expected {expected} columns, found {actual}")]
    ColumnCount {
        line: usize,
        expected: usize,
        actual: usize,
    },

    /// A fixed-width cell is narrower or wider than its column.
    #[error("Line {line}, column {column}: expected width {expected}, found {actual}")]
    FixedWidth {
        line: usize,
        column: usize,
        expected: usize,
        actual: usize,
    },

    /// A fixed-width cell contains a line break.
    #[error("Line {line}, column {column}: line break in a fixed-width cell")]
    LineBreak { line: usize, column: usize },

    /// One or more columns or record validators rejected the row.
    #[error("{0}")]
    Invalid(RowErrors),
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors from the CSV reading and writing layer.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the input.
    #[error("Failed to decode input: {0}")]
    Encoding(String),

    /// Tokenizer error from the underlying CSV parser.
    #[error("Invalid CSV format: {0}")]
    Format(#[from] csv::Error),

    /// Empty input where a header was expected.
    #[error("CSV input is empty")]
    EmptyFile,

    /// Header labels differ from the model.
    #[error("Header mismatch: expected {expected:?}, found {actual:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// A row failed to bind.
    #[error("{0}")]
    Row(#[from] RowError),
}

impl CsvError {
    /// Row failures are recoverable: the reader can continue with the next row.
    pub fn is_row_error(&self) -> bool {
        matches!(self, CsvError::Row(_))
    }
}

// =============================================================================
// Definition Errors
// =============================================================================

/// Errors loading a JSON model definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Failed to read the definition file.
    #[error("Failed to read definition: {0}")]
    Io(#[from] std::io::Error),

    /// Not valid JSON or wrong shape.
    #[error("Definition JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rejected by the embedded JSON schema.
    #[error("Definition does not match schema: {errors:?}")]
    Schema { errors: Vec<String> },

    /// Directive name not found in the catalog.
    #[error("Field '{field}' uses unknown directive '{name}'")]
    UnknownDirective { field: String, name: String },

    /// Named type set not declared in the definition.
    #[error("Field '{field}' refers to unknown type '{name}'")]
    UnknownType { field: String, name: String },

    /// A JSON record value does not fit the column's value type.
    #[error("Field '{field}': {value} is not a valid {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: ValueType,
    },

    /// Definition is well-formed but the model cannot be built.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Bind Errors (top-level)
// =============================================================================

/// Top-level error returned by the CLI and convenience entry points.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Row error: {0}")]
    Row(#[from] RowError),

    #[error("Settings error: {0}")]
    Settings(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for model construction.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for definition loading.
pub type DefinitionResult<T> = Result<T, DefinitionError>;

/// Result type for top-level operations.
pub type BindResult<T> = Result<T, BindError>;
