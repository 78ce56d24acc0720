//! Header-mapped record models.
//!
//! Columns declared with [`ColumnDef::lazy`](super::ColumnDef::lazy) carry
//! no number. Their position is looked up by label in the header of each
//! file, so one schema reads files whose columns come in any order.

use std::fmt;
use std::sync::Arc;

use super::mapping::{build_with_header, RecordModel};
use super::schema::{CsvRecord, RecordSchema};
use crate::config::Configuration;
use crate::directive::Group;
use crate::error::ConfigError;
use crate::logs::log_info_indent;

/// A schema waiting for a header to number its columns.
pub struct LazyRecordModel<T> {
    schema: RecordSchema<T>,
    config: Configuration,
    groups: Vec<Group>,
}

impl<T> fmt::Debug for LazyRecordModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRecordModel")
            .field("name", &self.schema.name)
            .field("groups", &self.groups)
            .finish()
    }
}

impl<T: CsvRecord> LazyRecordModel<T> {
    /// Lazy model of `T` with the standard configuration.
    pub fn for_type(groups: &[Group]) -> Self {
        Self::new(T::schema(), Configuration::standard(), groups)
    }
}

impl<T> LazyRecordModel<T> {
    pub fn new(schema: RecordSchema<T>, config: Configuration, groups: &[Group]) -> Self {
        Self {
            schema,
            config,
            groups: groups.to_vec(),
        }
    }

    pub fn schema(&self) -> &RecordSchema<T> {
        &self.schema
    }

    /// Number the lazy columns from `header` and build the model.
    ///
    /// Header cells are compared trimmed; the first matching cell wins.
    /// Header cells no column claims become placeholders labelled with the
    /// header text.
    pub fn resolve(&self, header: &[String]) -> Result<Arc<RecordModel<T>>, ConfigError> {
        let mut schema = self.schema.clone();
        for column in schema.columns.iter_mut().filter(|c| c.is_lazy()) {
            let label = column.header_label().to_string();
            let index = header
                .iter()
                .position(|cell| cell.trim() == label)
                .ok_or_else(|| ConfigError::UnresolvedColumn {
                    field: column.field.clone(),
                    label: label.clone(),
                })?;
            column.number = i64::try_from(index + 1).unwrap_or(i64::MAX);
            if self.config.settings.verbose {
                log_info_indent(format!("{} -> column {}", column.field, index + 1), 1);
            }
        }
        schema.partial = Some(schema.partial.unwrap_or(0).max(header.len()));

        build_with_header(&schema, &self.config, &self.groups, Some(header)).map(Arc::new)
    }
}
