//! Writing records as delimited text.

use std::io::Write;
use std::sync::Arc;

use crate::builder::{RecordModel, UniqueTracker};
use crate::error::{CsvError, RowError};
use crate::processor::RowContext;

/// Writes records through the model's write pipelines.
///
/// A model built from a [`LazyRecordModel`](crate::builder::LazyRecordModel)
/// is resolved against the header to write before it gets here.
pub struct RecordWriter<W: Write, T> {
    model: Arc<RecordModel<T>>,
    writer: csv::Writer<W>,
    unique: UniqueTracker,
    header_done: bool,
    row: usize,
}

impl<W: Write, T> RecordWriter<W, T> {
    pub fn new(model: Arc<RecordModel<T>>, output: W) -> Self {
        Self::with_delimiter(model, output, b',')
    }

    pub fn with_delimiter(model: Arc<RecordModel<T>>, output: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .from_writer(output);
        Self {
            model,
            writer,
            unique: UniqueTracker::new(),
            header_done: false,
            row: 0,
        }
    }

    /// Emit the header row once, if the model has one.
    pub fn write_header(&mut self) -> Result<(), CsvError> {
        if !self.header_done && self.model.has_header() {
            self.writer.write_record(self.model.header_labels())?;
        }
        self.header_done = true;
        Ok(())
    }

    /// Write one record. A rejected record writes nothing.
    ///
    /// `post_write` callbacks run once the row is written; their failures
    /// are reported but the row stays written.
    pub fn write(&mut self, record: &T) -> Result<(), CsvError> {
        self.write_header()?;
        self.row += 1;
        let line = self.row + usize::from(self.model.has_header());
        let ctx = RowContext::new(line, self.row);
        let cells = self
            .model
            .write_row_tracked(record, &ctx, Some(&mut self.unique))
            .map_err(RowError::Invalid)?;
        self.writer.write_record(&cells)?;
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
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying output.
    pub fn into_inner(mut self) -> Result<W, CsvError> {
        self.write_header()?;
        self.writer
            .into_inner()
            .map_err(|e| CsvError::Io(e.into_error()))
    }
}
