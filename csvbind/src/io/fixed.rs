//! Fixed-width text, one record per line.
//!
//! Every column needs a width: a `FixedSize` directive on mapped columns,
//! or [`RecordSchema::fixed_placeholder`](crate::builder::RecordSchema::fixed_placeholder)
//! for unmapped ones. Widths count characters, not bytes.

use std::io::{BufRead, Write};
use std::sync::Arc;

use super::reader::check_header;
use crate::builder::{RecordModel, UniqueTracker};
use crate::error::{ConfigError, CsvError, RowError};
use crate::logs::log_warning;
use crate::processor::conversion::PadLayout;
use crate::processor::RowContext;

/// Layout of every column, or the columns lacking one.
pub fn fixed_widths<T>(model: &RecordModel<T>) -> Result<Vec<PadLayout>, ConfigError> {
    let mut widths = Vec::with_capacity(model.columns().len());
    let mut missing = Vec::new();
    for column in model.columns() {
        match column.width() {
            Some(layout) => widths.push(layout),
            None => missing.push(format!("{}({})", column.label(), column.column())),
        }
    }
    if missing.is_empty() {
        Ok(widths)
    } else {
        Err(ConfigError::MissingFixedSize { columns: missing })
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Reads fixed-width lines. Empty lines are skipped.
pub struct FixedWidthReader<R: BufRead, T> {
    model: Arc<RecordModel<T>>,
    widths: Vec<PadLayout>,
    input: R,
    buffer: String,
    unique: UniqueTracker,
    header_done: bool,
    line: usize,
    row: usize,
    finished: bool,
}

impl<R: BufRead, T> FixedWidthReader<R, T> {
    pub fn new(model: Arc<RecordModel<T>>, input: R) -> Result<Self, ConfigError> {
        let widths = fixed_widths(&model)?;
        Ok(Self {
            model,
            widths,
            input,
            buffer: String::new(),
            unique: UniqueTracker::new(),
            header_done: false,
            line: 0,
            row: 0,
            finished: false,
        })
    }

    pub fn model(&self) -> &RecordModel<T> {
        &self.model
    }

    /// Next non-empty line without its terminator; `None` at end of input.
    fn next_line(&mut self) -> Result<Option<String>, CsvError> {
        loop {
            self.buffer.clear();
            if self.input.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buffer.trim_end_matches(['\n', '\r']);
            if !text.is_empty() {
                return Ok(Some(text.to_string()));
            }
        }
    }

    /// Consume the header line if the model expects one.
    ///
    /// Labels are compared with padding and whitespace removed.
    pub fn read_header(&mut self) -> Result<Option<Vec<String>>, CsvError> {
        if self.header_done || !self.model.has_header() {
            self.header_done = true;
            return Ok(None);
        }
        self.header_done = true;

        let text = self.next_line()?.ok_or(CsvError::EmptyFile)?;
        let cells = self.split(&text).map_err(CsvError::Row)?;
        let actual = cells
            .iter()
            .zip(&self.widths)
            .map(|(cell, layout)| {
                cell.trim_matches(|c: char| c == layout.pad || c.is_whitespace())
                    .to_string()
            })
            .collect();
        check_header(&self.model, actual).map(Some)
    }

    /// Cut a line into cells by column width.
    fn split(&self, text: &str) -> Result<Vec<String>, RowError> {
        let expected = self.widths.len();
        let mut cells = Vec::with_capacity(expected);
        let mut rest = text.chars();
        for (index, layout) in self.widths.iter().enumerate() {
            let cell: String = rest.by_ref().take(layout.size).collect();
            if cell.is_empty() {
                return Err(RowError::ColumnCount {
                    line: self.line,
                    expected,
                    actual: index,
                });
            }
            let actual = cell.chars().count();
            if actual < layout.size {
                return Err(RowError::FixedWidth {
                    line: self.line,
                    column: index + 1,
                    expected: layout.size,
                    actual,
                });
            }
            cells.push(cell);
        }
        if rest.next().is_some() {
            return Err(RowError::ColumnCount {
                line: self.line,
                expected,
                actual: expected + 1,
            });
        }
        Ok(cells)
    }

    /// Read the next record; `None` at end of input.
    pub fn next_record(&mut self) -> Option<Result<T, CsvError>> {
        if self.finished {
            return None;
        }
        if let Err(e) = self.read_header() {
            self.finished = true;
            return Some(Err(e));
        }

        let text = match self.next_line() {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };
        self.row += 1;

        let cells = match self.split(&text) {
            Ok(cells) => cells,
            Err(e) => {
                log_warning(format!("{}", e));
                return Some(Err(e.into()));
            }
        };
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        let ctx = RowContext::new(self.line, self.row);
        Some(
            self.model
                .read_row_tracked(&cells, &ctx, Some(&mut self.unique))
                .map_err(|errors| RowError::Invalid(errors).into()),
        )
    }

    /// Read everything, separating records from row failures.
    pub fn read_all(&mut self) -> Result<(Vec<T>, Vec<RowError>), CsvError> {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        while let Some(next) = self.next_record() {
            match next {
                Ok(record) => records.push(record),
                Err(CsvError::Row(failure)) => failures.push(failure),
                Err(e) => return Err(e),
            }
        }
        Ok((records, failures))
    }
}

impl<R: BufRead, T> Iterator for FixedWidthReader<R, T> {
    type Item = Result<T, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Writes records as fixed-width lines ending in `\n`.
pub struct FixedWidthWriter<W: Write, T> {
    model: Arc<RecordModel<T>>,
    widths: Vec<PadLayout>,
    output: W,
    unique: UniqueTracker,
    header_done: bool,
    row: usize,
}

impl<W: Write, T> FixedWidthWriter<W, T> {
    pub fn new(model: Arc<RecordModel<T>>, output: W) -> Result<Self, ConfigError> {
        let widths = fixed_widths(&model)?;
        Ok(Self {
            model,
            widths,
            output,
            unique: UniqueTracker::new(),
            header_done: false,
            row: 0,
        })
    }

    /// Emit the header once, each label padded and chopped to its width.
    pub fn write_header(&mut self) -> Result<(), CsvError> {
        if !self.header_done && self.model.has_header() {
            let mut text: String = self
                .model
                .header_labels()
                .iter()
                .zip(&self.widths)
                .map(|(label, layout)| layout.chopped().apply(label))
                .collect();
            text.push('\n');
            self.output.write_all(text.as_bytes())?;
        }
        self.header_done = true;
        Ok(())
    }

    /// Write one record. A rejected record writes nothing.
    pub fn write(&mut self, record: &T) -> Result<(), CsvError> {
        self.write_header()?;
        self.row += 1;
        let line = self.row + usize::from(self.model.has_header());
        let ctx = RowContext::new(line, self.row);
        let cells = self
            .model
            .write_row_tracked(record, &ctx, Some(&mut self.unique))
            .map_err(RowError::Invalid)?;

        let mut text = String::new();
        for (index, (cell, layout)) in cells.iter().zip(&self.widths).enumerate() {
            if cell.contains(['\n', '\r']) {
                return Err(RowError::LineBreak { line, column: index + 1 }.into());
            }
            let actual = cell.chars().count();
            if actual != layout.size {
                return Err(RowError::FixedWidth {
                    line,
                    column: index + 1,
                    expected: layout.size,
                    actual,
                }
                .into());
            }
            text.push_str(cell);
        }
        text.push('\n');
        self.output.write_all(text.as_bytes())?;
        self.model.after_write(record, &ctx).map_err(RowError::Invalid)?;
        Ok(())
    }

    /// Write every record, stopping at the first failure.
    pub fn write_all<'r, I>(&mut self, records: I) -> Result<usize, CsvError>
    where
        I: IntoIterator<Item = &'r T>,
        T: 'r,
    {
        let mut count = 0;
        for record in records {
            self.write(record)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn flush(&mut self) -> Result<(), CsvError> {
        self.output.flush()?;
        Ok(())
    }

    /// Flush and return the underlying output.
    pub fn into_inner(mut self) -> Result<W, CsvError> {
        self.write_header()?;
        self.output.flush()?;
        Ok(self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_record_model, ColumnDef, FieldAccess, RecordSchema};
    use crate::config::Configuration;
    use crate::directive::kinds;
    use crate::models::{CellValue, DynamicRecord, ValueType};

    fn schema() -> RecordSchema<DynamicRecord> {
        RecordSchema::new("Stock")
            .validate_header(true)
            .partial(3)
            .column(
                ColumnDef::new(1, "sku", ValueType::Text, FieldAccess::dynamic("sku"))
                    .label("SKU")
                    .directive(kinds::fixed_size(6)),
            )
            .column(
                ColumnDef::new(2, "qty", ValueType::Text, FieldAccess::dynamic("qty"))
                    .label("QTY")
                    .directive(
                        kinds::fixed_size(4)
                            .with_attr("pad_char", "0")
                            .with_attr("right_align", true),
                    ),
            )
            .fixed_placeholder(3, "x", PadLayout::new(2).pad_char('-'))
    }

    fn stock_model() -> Arc<RecordModel<DynamicRecord>> {
        Arc::new(build_record_model(&schema(), &Configuration::standard(), &[]).unwrap())
    }

    #[test]
    fn test_widths_required() {
        let schema = RecordSchema::<DynamicRecord>::new("Loose")
            .column(ColumnDef::new(1, "a", ValueType::Text, FieldAccess::dynamic("a")))
            .column(
                ColumnDef::new(2, "b", ValueType::Text, FieldAccess::dynamic("b"))
                    .directive(kinds::fixed_size(2)),
            );
        let model = build_record_model(&schema, &Configuration::standard(), &[]).unwrap();
        assert_eq!(
            fixed_widths(&model).unwrap_err(),
            ConfigError::MissingFixedSize { columns: vec!["a(1)".to_string()] }
        );
        assert_eq!(fixed_widths(&stock_model()).unwrap().len(), 3);
    }

    #[test]
    fn test_write_then_read() {
        let records = vec![
            DynamicRecord::new().with("sku", "AB1").with("qty", "12"),
            DynamicRecord::new().with("sku", "ZZ9").with("qty", "7"),
        ];
        let mut writer = FixedWidthWriter::new(stock_model(), Vec::new()).unwrap();
        writer.write_all(&records).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "SKU   0QTYx-\nAB1   0012--\nZZ9   0007--\n");

        let input = format!("{}\n", out);
        let mut reader = FixedWidthReader::new(stock_model(), input.as_bytes()).unwrap();
        assert_eq!(
            reader.read_header().unwrap(),
            Some(vec!["SKU".to_string(), "QTY".to_string(), "x".to_string()])
        );
        let (read, failures) = reader.read_all().unwrap();
        assert!(failures.is_empty());
        assert_eq!(read[1].get("sku"), CellValue::Text("ZZ9".to_string()));
        assert_eq!(read[1].get("qty"), CellValue::Text("7".to_string()));
    }

    #[test]
    fn test_read_rows() {
        let stock = schema().validate_header(false).placeholder(3, "pad");
        let model =
            Arc::new(build_record_model(&stock, &Configuration::standard(), &[]).unwrap());
        let input = "sku   qty --\nAB1   0012--\n\nCD2   01\nEF3   0001--x\n";
        let mut reader = FixedWidthReader::new(model, input.as_bytes()).unwrap();
        let (records, failures) = reader.read_all().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("sku"), CellValue::Text("AB1".to_string()));
        assert_eq!(records[0].get("qty"), CellValue::Text("12".to_string()));
        assert_eq!(
            failures,
            vec![
                RowError::FixedWidth {
                    line: 4,
                    column: 2,
                    expected: 4,
                    actual: 2,
                },
                RowError::ColumnCount {
                    line: 5,
                    expected: 3,
                    actual: 4,
                },
            ]
        );
    }

    #[test]
    fn test_write_rejects_overflow_and_line_breaks() {
        let schema = RecordSchema::<DynamicRecord>::new("Note").header(false).column(
            ColumnDef::new(1, "note", ValueType::Text, FieldAccess::dynamic("note"))
                .directive(kinds::multi_pad(3)),
        );
        let model = Arc::new(build_record_model(&schema, &Configuration::standard(), &[]).unwrap());
        let mut writer = FixedWidthWriter::new(model, Vec::new()).unwrap();

        let err = writer.write(&DynamicRecord::new().with("note", "long")).unwrap_err();
        assert!(matches!(
            err,
            CsvError::Row(RowError::FixedWidth { line: 1, column: 1, expected: 3, actual: 4 })
        ));
        let err = writer.write(&DynamicRecord::new().with("note", "a\nb")).unwrap_err();
        assert!(matches!(err, CsvError::Row(RowError::LineBreak { line: 2, column: 1 })));

        writer.write(&DynamicRecord::new().with("note", "ok")).unwrap();
        assert_eq!(String::from_utf8(writer.into_inner().unwrap()).unwrap(), "ok \n");
    }
}
