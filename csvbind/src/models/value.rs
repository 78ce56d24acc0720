//! Typed cell values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Value Types
// =============================================================================

/// Declared type of a column's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Text,
    Char,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    /// One token out of a closed list, held as text.
    Enum,
}

impl ValueType {
    /// All value types, in declaration order.
    pub const ALL: [ValueType; 9] = [
        ValueType::Text,
        ValueType::Char,
        ValueType::Integer,
        ValueType::Decimal,
        ValueType::Boolean,
        ValueType::Date,
        ValueType::DateTime,
        ValueType::Time,
        ValueType::Enum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Char => "char",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Boolean => "boolean",
            ValueType::Date => "date",
            ValueType::DateTime => "date_time",
            ValueType::Time => "time",
            ValueType::Enum => "enum",
        }
    }

    /// Parse a type name as written in model definitions.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ValueType::Text | ValueType::Char)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ValueType::Date | ValueType::DateTime | ValueType::Time)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Cell Values
// =============================================================================

/// A single cell value, either raw text or the typed result of parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Text(String),
    Char(char),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

const JSON_DATE: &str = "%Y-%m-%d";
const JSON_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";
const JSON_TIME: &str = "%H:%M:%S";

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Borrow the text of a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Type of the value, `None` for `Null`.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            CellValue::Null => None,
            CellValue::Text(_) => Some(ValueType::Text),
            CellValue::Char(_) => Some(ValueType::Char),
            CellValue::Integer(_) => Some(ValueType::Integer),
            CellValue::Decimal(_) => Some(ValueType::Decimal),
            CellValue::Boolean(_) => Some(ValueType::Boolean),
            CellValue::Date(_) => Some(ValueType::Date),
            CellValue::DateTime(_) => Some(ValueType::DateTime),
            CellValue::Time(_) => Some(ValueType::Time),
        }
    }

    /// Numeric view used by range checks.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Length in characters of textual values.
    pub fn char_len(&self) -> Option<usize> {
        match self {
            CellValue::Text(s) => Some(s.chars().count()),
            CellValue::Char(_) => Some(1),
            _ => None,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and decimals compare with each other; every other pairing
    /// requires identical variants. `Null` never compares.
    pub fn compare(&self, other: &CellValue) -> Option<Ordering> {
        match (self, other) {
            (CellValue::Integer(a), CellValue::Integer(b)) => Some(a.cmp(b)),
            (CellValue::Text(a), CellValue::Text(b)) => Some(a.cmp(b)),
            (CellValue::Char(a), CellValue::Char(b)) => Some(a.cmp(b)),
            (CellValue::Boolean(a), CellValue::Boolean(b)) => Some(a.cmp(b)),
            (CellValue::Date(a), CellValue::Date(b)) => Some(a.cmp(b)),
            (CellValue::DateTime(a), CellValue::DateTime(b)) => Some(a.cmp(b)),
            (CellValue::Time(a), CellValue::Time(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// JSON rendering used for message variables and the CLI output.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Char(c) => Value::String(c.to_string()),
            CellValue::Integer(i) => Value::from(*i),
            CellValue::Decimal(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Boolean(b) => Value::Bool(*b),
            CellValue::Date(d) => Value::String(d.format(JSON_DATE).to_string()),
            CellValue::DateTime(d) => Value::String(d.format(JSON_DATE_TIME).to_string()),
            CellValue::Time(t) => Value::String(t.format(JSON_TIME).to_string()),
        }
    }

    /// Inverse of [`CellValue::to_json`] for a known target type.
    pub fn from_json(value: &Value, value_type: ValueType) -> Option<CellValue> {
        if value.is_null() {
            return Some(CellValue::Null);
        }
        match value_type {
            ValueType::Text | ValueType::Enum => {
                value.as_str().map(|s| CellValue::Text(s.to_string()))
            }
            ValueType::Char => {
                let s = value.as_str()?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(CellValue::Char(c)),
                    _ => None,
                }
            }
            ValueType::Integer => value.as_i64().map(CellValue::Integer),
            ValueType::Decimal => value.as_f64().map(CellValue::Decimal),
            ValueType::Boolean => value.as_bool().map(CellValue::Boolean),
            ValueType::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, JSON_DATE).ok())
                .map(CellValue::Date),
            ValueType::DateTime => value
                .as_str()
                .and_then(|s| NaiveDateTime::parse_from_str(s, JSON_DATE_TIME).ok())
                .map(CellValue::DateTime),
            ValueType::Time => value
                .as_str()
                .and_then(|s| NaiveTime::parse_from_str(s, JSON_TIME).ok())
                .map(CellValue::Time),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Char(c) => write!(f, "{}", c),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Decimal(d) => write!(f, "{}", d),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format(JSON_DATE)),
            CellValue::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) => write!(f, "{}", t.format(JSON_TIME)),
        }
    }
}

macro_rules! cell_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for CellValue {
                fn from(value: $ty) -> Self {
                    CellValue::$variant(value $(as $cast)?)
                }
            }
        )*
    };
}

cell_from! {
    String => Text,
    char => Char,
    i64 => Integer,
    i32 => Integer as i64,
    u32 => Integer as i64,
    f64 => Decimal,
    bool => Boolean,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    NaiveTime => Time,
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

// =============================================================================
// Conversion into field types
// =============================================================================

/// A cell value could not be stored into a field of the requested type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot store {found} into a {expected} field")]
pub struct CellTypeError {
    pub expected: &'static str,
    pub found: String,
}

impl CellTypeError {
    pub(crate) fn new(expected: &'static str, value: &CellValue) -> Self {
        let found = value
            .value_type()
            .map(|t| t.name().to_string())
            .unwrap_or_else(|| "null".to_string());
        Self { expected, found }
    }
}

/// Extraction of a Rust value from a [`CellValue`].
///
/// Implemented for the primitive field types and for `Option<T>`, which maps
/// `Null` to `None`. A `String` field receives `Null` as the empty string.
pub trait FromCell: Sized {
    fn from_cell(value: CellValue) -> Result<Self, CellTypeError>;
}

macro_rules! from_cell {
    ($($ty:ty, $name:literal => $pat:pat => $out:expr);* $(;)?) => {
        $(
            impl FromCell for $ty {
                fn from_cell(value: CellValue) -> Result<Self, CellTypeError> {
                    match value {
                        $pat => $out,
                        other => Err(CellTypeError::new($name, &other)),
                    }
                }
            }
        )*
    };
}

impl FromCell for String {
    fn from_cell(value: CellValue) -> Result<Self, CellTypeError> {
        match value {
            CellValue::Text(s) => Ok(s),
            CellValue::Null => Ok(String::new()),
            other => Err(CellTypeError::new("text", &other)),
        }
    }
}

from_cell! {
    char, "char" => CellValue::Char(c) => Ok(c);
    i64, "integer" => CellValue::Integer(i) => Ok(i);
    f64, "decimal" => CellValue::Decimal(d) => Ok(d);
    bool, "boolean" => CellValue::Boolean(b) => Ok(b);
    NaiveDate, "date" => CellValue::Date(d) => Ok(d);
    NaiveDateTime, "date_time" => CellValue::DateTime(d) => Ok(d);
    NaiveTime, "time" => CellValue::Time(t) => Ok(t);
}

impl FromCell for i32 {
    fn from_cell(value: CellValue) -> Result<Self, CellTypeError> {
        match value {
            CellValue::Integer(i) => {
                i32::try_from(i).map_err(|_| CellTypeError::new("i32", &CellValue::Integer(i)))
            }
            other => Err(CellTypeError::new("i32", &other)),
        }
    }
}

impl FromCell for u32 {
    fn from_cell(value: CellValue) -> Result<Self, CellTypeError> {
        match value {
            CellValue::Integer(i) => {
                u32::try_from(i).map_err(|_| CellTypeError::new("u32", &CellValue::Integer(i)))
            }
            other => Err(CellTypeError::new("u32", &other)),
        }
    }
}

impl<T: FromCell> FromCell for Option<T> {
    fn from_cell(value: CellValue) -> Result<Self, CellTypeError> {
        match value {
            CellValue::Null => Ok(None),
            other => T::from_cell(other).map(Some),
        }
    }
}

impl FromCell for CellValue {
    fn from_cell(value: CellValue) -> Result<Self, CellTypeError> {
        Ok(value)
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// A Rust enum stored in a [`ValueType::Enum`] column.
///
/// Cells hold the variant [`name`](CsvEnum::name); the CSV text is its
/// [`label`](CsvEnum::label), which defaults to the name.
pub trait CsvEnum: Sized + Copy + Send + Sync + 'static {
    fn variants() -> &'static [Self];

    fn name(&self) -> &'static str;

    fn label(&self) -> &'static str {
        self.name()
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::variants().iter().copied().find(|v| v.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_comparison_crosses_variants() {
        let a = CellValue::Integer(3);
        let b = CellValue::Decimal(3.5);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(CellValue::Text("a".into()).compare(&a), None);
        assert_eq!(CellValue::Null.compare(&CellValue::Null), None);
    }

    #[test]
    fn test_json_conversion() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let cell = CellValue::Date(date);
        assert_eq!(cell.to_json(), json!("2024-03-15"));
        assert_eq!(CellValue::from_json(&json!("2024-03-15"), ValueType::Date), Some(cell));
        assert_eq!(CellValue::from_json(&json!("ab"), ValueType::Char), None);
        assert_eq!(
            CellValue::from_json(&Value::Null, ValueType::Integer),
            Some(CellValue::Null)
        );
    }

    #[test]
    fn test_from_cell_option() {
        assert_eq!(Option::<i64>::from_cell(CellValue::Null), Ok(None));
        assert_eq!(Option::<i64>::from_cell(CellValue::Integer(7)), Ok(Some(7)));
        let err = i64::from_cell(CellValue::Text("x".into())).unwrap_err();
        assert_eq!(err.found, "text");
        assert!(i32::from_cell(CellValue::Integer(i64::MAX)).is_err());
        assert_eq!(String::from_cell(CellValue::Null), Ok(String::new()));
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Size {
        Small,
        Large,
    }

    impl CsvEnum for Size {
        fn variants() -> &'static [Self] {
            &[Size::Small, Size::Large]
        }

        fn name(&self) -> &'static str {
            match self {
                Size::Small => "Small",
                Size::Large => "Large",
            }
        }
    }

    #[test]
    fn test_enum_lookup() {
        assert_eq!(Size::from_name("Large"), Some(Size::Large));
        assert_eq!(Size::from_name("large"), None);
        assert_eq!(Size::Small.label(), "Small");
    }

    #[test]
    fn test_value_type_names() {
        for t in ValueType::ALL {
            assert_eq!(ValueType::from_name(t.name()), Some(t));
        }
        assert_eq!(CellValue::from(Some(5i32)), CellValue::Integer(5));
        assert_eq!(CellValue::from(None::<String>), CellValue::Null);
    }
}
