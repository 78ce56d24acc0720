//! CSV input and output around record models.
//!
//! - [`input`] - Encoding and delimiter detection
//! - [`reader`] - [`RecordReader`], rows to records
//! - [`writer`] - [`RecordWriter`], records to rows
//! - [`fixed`] - [`FixedWidthReader`] and [`FixedWidthWriter`], fixed-width lines

pub mod fixed;
pub mod input;
pub mod reader;
pub mod writer;

pub use fixed::{fixed_widths, FixedWidthReader, FixedWidthWriter};
pub use input::{decode_auto, detect_delimiter, detect_encoding, read_file_auto, InputText};
pub use reader::RecordReader;
pub use writer::RecordWriter;
