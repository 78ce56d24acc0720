//! Cross-row uniqueness.
//!
//! Pipelines see one cell at a time and keep no state, so the values already
//! seen live in a [`UniqueTracker`] owned by each reader or writer. Two
//! readers sharing a model track their files independently.

use std::collections::HashMap;

use super::mapping::ColumnMapping;
use crate::directive::kinds;
use crate::error::FieldFailure;
use crate::models::CellValue;
use crate::processor::{RowContext, Violation};

/// Build cases in which a column's values must not repeat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniqueScope {
    pub read: bool,
    pub write: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FirstSeen {
    line: usize,
    row: usize,
}

/// Values seen so far, per column, keyed by their printed text.
#[derive(Debug, Default)]
pub struct UniqueTracker {
    seen: HashMap<usize, HashMap<String, FirstSeen>>,
}

impl UniqueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `value` for `column`, or fail if an earlier row had it.
    ///
    /// Null values are never tracked.
    pub fn check(
        &mut self,
        column: &ColumnMapping,
        value: &CellValue,
        ctx: &RowContext,
    ) -> Result<(), FieldFailure> {
        if value.is_null() {
            return Ok(());
        }
        let key = column
            .formatter()
            .print(value)
            .unwrap_or_else(|_| value.to_string());
        let seen = self.seen.entry(column.column()).or_default();
        if let Some(first) = seen.get(&key) {
            let violation = Violation::new(kinds::UNIQUE, value.clone())
                .with_var("duplicated_line", first.line)
                .with_var("duplicated_row", first.row);
            return Err(column.failure(violation, &ctx.at_column(column.column())));
        }
        seen.insert(
            key,
            FirstSeen {
                line: ctx.line,
                row: ctx.row,
            },
        );
        Ok(())
    }

    /// Number of distinct values remembered across all columns.
    pub fn len(&self) -> usize {
        self.seen.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_record_model, ColumnDef, FieldAccess, RecordSchema};
    use crate::config::Configuration;
    use crate::models::{DynamicRecord, ValueType};
    use serde_json::json;

    fn model() -> crate::builder::RecordModel<DynamicRecord> {
        let schema = RecordSchema::<DynamicRecord>::new("Row").column(
            ColumnDef::new(1, "id", ValueType::Integer, FieldAccess::dynamic("id"))
                .directive(kinds::unique()),
        );
        build_record_model(&schema, &Configuration::standard(), &[]).unwrap()
    }

    #[test]
    fn test_second_occurrence_fails() {
        let model = model();
        let column = &model.columns()[0];
        let mut tracker = UniqueTracker::new();

        let first = RowContext::new(2, 1);
        assert!(tracker.check(column, &CellValue::Integer(7), &first).is_ok());
        assert!(tracker.check(column, &CellValue::Integer(8), &RowContext::new(3, 2)).is_ok());

        let failure = tracker
            .check(column, &CellValue::Integer(7), &RowContext::new(5, 4))
            .unwrap_err();
        assert_eq!(failure.kind, kinds::UNIQUE);
        assert_eq!(failure.line, 5);
        assert_eq!(failure.column, 1);
        assert_eq!(failure.variables.get("duplicated_line"), Some(&json!(2)));
        assert_eq!(failure.variables.get("duplicated_row"), Some(&json!(1)));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_nulls_are_not_tracked() {
        let model = model();
        let column = &model.columns()[0];
        let mut tracker = UniqueTracker::new();
        for row in 1..=3 {
            assert!(tracker.check(column, &CellValue::Null, &RowContext::new(row, row)).is_ok());
        }
        assert!(tracker.is_empty());

        tracker.check(column, &CellValue::Integer(1), &RowContext::new(1, 1)).unwrap();
        tracker.clear();
        assert!(tracker.check(column, &CellValue::Integer(1), &RowContext::new(2, 2)).is_ok());
    }
}
