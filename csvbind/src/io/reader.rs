//! Reading records from delimited text.

use std::io::Read;
use std::sync::Arc;

use crate::builder::{LazyRecordModel, RecordModel, UniqueTracker};
use crate::error::{BindResult, CsvError, RowError};
use crate::logs::log_warning;
use crate::processor::RowContext;

/// Iterates over the records of a CSV input.
///
/// Row failures are yielded as [`CsvError::Row`] and do not stop the
/// iteration; tokenizer and header errors do. Unique columns are checked
/// across the rows of this reader only.
pub struct RecordReader<R: Read, T> {
    model: Arc<RecordModel<T>>,
    reader: csv::Reader<R>,
    buffer: csv::StringRecord,
    unique: UniqueTracker,
    header_done: bool,
    row: usize,
    finished: bool,
}

impl<R: Read, T> std::fmt::Debug for RecordReader<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("row", &self.row)
            .field("header_done", &self.header_done)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<R: Read, T> RecordReader<R, T> {
    /// Comma-separated input.
    pub fn new(model: Arc<RecordModel<T>>, input: R) -> Self {
        Self::with_delimiter(model, input, b',')
    }

    pub fn with_delimiter(model: Arc<RecordModel<T>>, input: R, delimiter: u8) -> Self {
        Self {
            model,
            reader: tokenizer(input, delimiter),
            buffer: csv::StringRecord::new(),
            unique: UniqueTracker::new(),
            header_done: false,
            row: 0,
            finished: false,
        }
    }

    /// Read the header and number the lazy model's columns from it.
    pub fn lazy(lazy: &LazyRecordModel<T>, input: R, delimiter: u8) -> BindResult<Self> {
        let mut reader = tokenizer(input, delimiter);
        let mut buffer = csv::StringRecord::new();
        if !reader.read_record(&mut buffer).map_err(CsvError::from)? {
            return Err(CsvError::EmptyFile.into());
        }
        let actual: Vec<String> = buffer.iter().map(|s| s.trim().to_string()).collect();
        let model = lazy.resolve(&actual)?;
        check_header(&model, actual)?;

        Ok(Self {
            model,
            reader,
            buffer,
            unique: UniqueTracker::new(),
            header_done: true,
            row: 0,
            finished: false,
        })
    }

    pub fn model(&self) -> &RecordModel<T> {
        &self.model
    }

    /// Consume the header row if the model expects one.
    ///
    /// Returns the labels found. Called implicitly by the first read.
    pub fn read_header(&mut self) -> Result<Option<Vec<String>>, CsvError> {
        if self.header_done || !self.model.has_header() {
            self.header_done = true;
            return Ok(None);
        }
        self.header_done = true;

        if !self.reader.read_record(&mut self.buffer)? {
            return Err(CsvError::EmptyFile);
        }
        let actual: Vec<String> = self.buffer.iter().map(|s| s.trim().to_string()).collect();
        check_header(&self.model, actual).map(Some)
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

        match self.reader.read_record(&mut self.buffer) {
            Ok(true) => {}
            Ok(false) => {
                self.finished = true;
                return None;
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e.into()));
            }
        }

        self.row += 1;
        let line = self
            .buffer
            .position()
            .map_or(self.row, |p| usize::try_from(p.line()).unwrap_or(usize::MAX));
        Some(self.bind(line))
    }

    fn bind(&mut self, line: usize) -> Result<T, CsvError> {
        let expected = self.model.columns().len();
        if self.buffer.len() != expected {
            log_warning(format!(
                "Line {}: expected {} columns, found {}",
                line,
                expected,
                self.buffer.len()
            ));
            return Err(RowError::ColumnCount {
                line,
                expected,
                actual: self.buffer.len(),
            }
            .into());
        }

        let cells: Vec<&str> = self.buffer.iter().collect();
        self.model
            .read_row_tracked(&cells, &RowContext::new(line, self.row), Some(&mut self.unique))
            .map_err(|errors| RowError::Invalid(errors).into())
    }

    /// Read everything, separating records from row failures.
    ///
    /// Stops at the first error that is not a row failure.
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

fn tokenizer<R: Read>(input: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(input)
}

/// Compare header cells with the model's labels when the model asks for it.
pub(crate) fn check_header<T>(
    model: &RecordModel<T>,
    actual: Vec<String>,
) -> Result<Vec<String>, CsvError> {
    if model.validates_header() && actual != model.header_labels() {
        return Err(CsvError::HeaderMismatch {
            expected: model.header_labels().to_vec(),
            actual,
        });
    }
    Ok(actual)
}

impl<R: Read, T> Iterator for RecordReader<R, T> {
    type Item = Result<T, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}
