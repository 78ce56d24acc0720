//! Value model shared by every layer of the binding engine.
//!
//! - [`ValueType`] - Declared type of a column (text, integer, date...)
//! - [`CellValue`] - A typed cell value flowing through pipelines
//! - [`FromCell`] - Conversion from a cell value into a Rust field type
//! - [`CsvEnum`] - Rust enums stored in enum columns
//! - [`DynamicRecord`] - Map-backed record used by JSON model definitions

mod record;
mod value;

pub use record::DynamicRecord;
pub use value::{CellTypeError, CellValue, CsvEnum, FromCell, ValueType};
