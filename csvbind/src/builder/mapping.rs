//! Built record models: column mappings and row binding.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::accessor::{FieldAccessor, FieldMetadata};
use super::assembler::PipelineAssembler;
use super::cache::RecordModelCache;
use super::schema::{
    Callbacks, CsvRecord, FieldAccess, PlaceholderColumn, RecordSchema, RecordValidator,
};
use super::unique::{UniqueScope, UniqueTracker};
use crate::config::Configuration;
use crate::directive::{kinds, Group};
use crate::error::{ConfigError, FieldFailure, RowErrors};
use crate::logs::{log_info, log_success};
use crate::models::CellValue;
use crate::processor::conversion::{Conversion, ConversionStep, PadLayout};
use crate::processor::format::{FormatterRef, TextFormat};
use crate::processor::{Pipeline, RowContext, Violation};

// =============================================================================
// Column Mapping
// =============================================================================

/// Metadata and pipelines of one column. Immutable once built.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    metadata: FieldMetadata,
    read: Pipeline,
    write: Pipeline,
    formatter: FormatterRef,
    groups: Vec<Group>,
    unique: UniqueScope,
    width: Option<PadLayout>,
}

impl ColumnMapping {
    /// Pass-through column filling a gap of a partial schema.
    ///
    /// The label comes from the schema's placeholder declaration, then from
    /// the source header, then defaults to `column<N>`.
    fn placeholder(
        record_type: &str,
        column: usize,
        declared: Option<&PlaceholderColumn>,
        source_label: Option<&str>,
        groups: &[Group],
    ) -> Self {
        let mut metadata = FieldMetadata::placeholder(record_type, column);
        if let Some(label) = declared.map(|p| p.label.as_str()).or(source_label) {
            metadata.label = label.to_string();
        }
        let width = declared.and_then(|p| p.width);
        let write = match width {
            Some(layout) => Pipeline::empty().with_front(Arc::new(ConversionStep::new(
                kinds::MULTI_PAD,
                Conversion::MultiPad(layout),
            ))),
            None => Pipeline::empty(),
        };
        Self {
            metadata,
            read: Pipeline::empty(),
            write,
            formatter: Arc::new(TextFormat),
            groups: groups.to_vec(),
            unique: UniqueScope::default(),
            width,
        }
    }

    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    pub fn column(&self) -> usize {
        self.metadata.column
    }

    pub fn label(&self) -> &str {
        &self.metadata.label
    }

    pub fn read_pipeline(&self) -> &Pipeline {
        &self.read
    }

    pub fn write_pipeline(&self) -> &Pipeline {
        &self.write
    }

    pub fn formatter(&self) -> &FormatterRef {
        &self.formatter
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Cases in which values must not repeat across rows.
    pub fn unique(&self) -> UniqueScope {
        self.unique
    }

    /// Padded width of written cells, when the column declares one.
    pub fn width(&self) -> Option<PadLayout> {
        self.width
    }

    /// Whether the column maps to no record field.
    pub fn is_placeholder(&self) -> bool {
        self.metadata.field.is_empty()
    }

    /// Run the read pipeline on one cell. A missing cell reads as null.
    pub fn read(&self, cell: Option<&str>, ctx: &RowContext) -> Result<CellValue, FieldFailure> {
        let ctx = ctx.at_column(self.metadata.column);
        let input = cell.map_or(CellValue::Null, |s| CellValue::Text(s.to_string()));
        self.read.execute(input, &ctx).map_err(|v| self.failure(v, &ctx))
    }

    /// Run the write pipeline on one typed value.
    pub fn write(&self, value: &CellValue, ctx: &RowContext) -> Result<String, FieldFailure> {
        let ctx = ctx.at_column(self.metadata.column);
        match self.write.execute(value.clone(), &ctx) {
            Ok(CellValue::Text(text)) => Ok(text),
            Ok(other) => Ok(other.to_string()),
            Err(v) => Err(self.failure(v, &ctx)),
        }
    }

    /// Read and write chains, one line each.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("read:  {}", self.read.describe().join(" -> ")),
            format!("write: {}", self.write.describe().join(" -> ")),
        ];
        match (self.unique.read, self.unique.write) {
            (false, false) => {}
            (true, true) => lines.push("unique: read, write".to_string()),
            (true, false) => lines.push("unique: read".to_string()),
            (false, true) => lines.push("unique: write".to_string()),
        }
        lines
    }

    pub(crate) fn failure(&self, violation: Violation, ctx: &RowContext) -> FieldFailure {
        FieldFailure {
            rejected: violation.rejected,
            column: self.metadata.column,
            label: self.metadata.label.clone(),
            field: self.metadata.field.clone(),
            kind: violation.kind,
            message: violation.message,
            variables: violation.variables,
            line: ctx.line,
            row: ctx.row,
        }
    }
}

// =============================================================================
// Record Model
// =============================================================================

/// Column mappings of a record type for one set of active groups.
pub struct RecordModel<T> {
    name: String,
    columns: Vec<ColumnMapping>,
    /// Parallel to `columns`; `None` for placeholders.
    accessors: Vec<Option<FieldAccess<T>>>,
    header_labels: Vec<String>,
    header: bool,
    validate_header: bool,
    validators: Vec<RecordValidator<T>>,
    callbacks: Callbacks<T>,
    skip_validation_on_write: bool,
    factory: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> fmt::Debug for RecordModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordModel")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("header", &self.header)
            .field("validate_header", &self.validate_header)
            .field("validators", &self.validators.len())
            .field("callbacks", &!self.callbacks.is_empty())
            .finish()
    }
}

impl<T: CsvRecord> RecordModel<T> {
    /// Cached model of `T` with the standard configuration and default group.
    pub fn for_type() -> Result<Arc<Self>, ConfigError> {
        Self::for_groups(&[])
    }

    pub fn for_groups(groups: &[Group]) -> Result<Arc<Self>, ConfigError> {
        RecordModelCache::global().get_or_build::<T, _>(groups, || {
            build_record_model(&T::schema(), &Configuration::standard(), groups)
        })
    }
}

impl<T> RecordModel<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    pub fn header_labels(&self) -> &[String] {
        &self.header_labels
    }

    pub fn has_header(&self) -> bool {
        self.header
    }

    pub fn validates_header(&self) -> bool {
        self.validate_header
    }

    /// Bind one row, running every column before reporting failures.
    ///
    /// Record validators run only when every column bound. Unique columns
    /// are not checked; see [`RecordModel::read_row_tracked`].
    pub fn read_row(&self, cells: &[&str], ctx: &RowContext) -> Result<T, RowErrors> {
        self.read_row_tracked(cells, ctx, None)
    }

    /// Bind one row, checking unique columns against `tracker`.
    ///
    /// Order: `pre_read` callbacks, columns, record validators when every
    /// column bound, then `post_read` callbacks whatever the outcome.
    pub fn read_row_tracked(
        &self,
        cells: &[&str],
        ctx: &RowContext,
        mut tracker: Option<&mut UniqueTracker>,
    ) -> Result<T, RowErrors> {
        let mut record = (self.factory)();
        let mut errors = RowErrors::new(ctx.line, ctx.row);

        for callback in &self.callbacks.pre_read {
            callback(&mut record, ctx, &mut errors);
        }

        for (index, (column, access)) in self.columns.iter().zip(&self.accessors).enumerate() {
            let value = match column.read(cells.get(index).copied(), ctx) {
                Ok(value) => value,
                Err(failure) => {
                    errors.push(failure);
                    continue;
                }
            };
            if column.unique.read {
                if let Some(tracker) = tracker.as_deref_mut() {
                    if let Err(failure) = tracker.check(column, &value, ctx) {
                        errors.push(failure);
                        continue;
                    }
                }
            }
            let Some(access) = access else { continue };
            if let Err(e) = access.set(&mut record, value.clone()) {
                let mut variables = BTreeMap::new();
                variables.insert("expected".to_string(), e.expected.into());
                variables.insert("found".to_string(), e.found.into());
                let ctx = ctx.at_column(column.column());
                errors.push(column.failure(
                    Violation::new(kinds::BIND, value).with_vars(variables),
                    &ctx,
                ));
            }
        }

        if errors.is_empty() {
            for validator in &self.validators {
                validator(&record, &mut errors);
            }
        }

        for callback in &self.callbacks.post_read {
            callback(&mut record, ctx, &mut errors);
        }

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(errors)
        }
    }

    /// Render one record as cells, running every column before reporting failures.
    pub fn write_row(&self, record: &T, ctx: &RowContext) -> Result<Vec<String>, RowErrors> {
        self.write_row_tracked(record, ctx, None)
    }

    /// Render one record, checking unique columns against `tracker`.
    ///
    /// Order: `pre_write` callbacks, columns, then record validators when
    /// every column rendered and write validation is on. `post_write`
    /// callbacks run separately through [`RecordModel::after_write`].
    pub fn write_row_tracked(
        &self,
        record: &T,
        ctx: &RowContext,
        mut tracker: Option<&mut UniqueTracker>,
    ) -> Result<Vec<String>, RowErrors> {
        let mut errors = RowErrors::new(ctx.line, ctx.row);
        let mut cells = Vec::with_capacity(self.columns.len());

        for callback in &self.callbacks.pre_write {
            callback(record, ctx, &mut errors);
        }

        for (column, access) in self.columns.iter().zip(&self.accessors) {
            let value = access.as_ref().map_or(CellValue::Null, |a| a.get(record));
            if column.unique.write {
                if let Some(tracker) = tracker.as_deref_mut() {
                    if let Err(failure) = tracker.check(column, &value, ctx) {
                        errors.push(failure);
                        continue;
                    }
                }
            }
            match column.write(&value, ctx) {
                Ok(text) => cells.push(text),
                Err(failure) => errors.push(failure),
            }
        }

        if errors.is_empty() && !self.skip_validation_on_write {
            for validator in &self.validators {
                validator(record, &mut errors);
            }
        }

        if errors.is_empty() {
            Ok(cells)
        } else {
            Err(errors)
        }
    }

    /// Run the `post_write` callbacks of a record that has been written.
    pub fn after_write(&self, record: &T, ctx: &RowContext) -> Result<(), RowErrors> {
        let mut errors = RowErrors::new(ctx.line, ctx.row);
        for callback in &self.callbacks.post_write {
            callback(record, ctx, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// =============================================================================
// Building
// =============================================================================

/// Build the model of `schema` for the given active groups.
pub fn build_record_model<T>(
    schema: &RecordSchema<T>,
    config: &Configuration,
    groups: &[Group],
) -> Result<RecordModel<T>, ConfigError> {
    build_with_header(schema, config, groups, None)
}

/// Build a model, labelling undeclared placeholders from `source_header`.
pub(crate) fn build_with_header<T>(
    schema: &RecordSchema<T>,
    config: &Configuration,
    groups: &[Group],
    source_header: Option<&[String]>,
) -> Result<RecordModel<T>, ConfigError> {
    log_info(format!("Building record model '{}'", schema.name));

    let fields = FieldAccessor::new(&config.catalog).fields(schema)?;
    let assembler = PipelineAssembler::new(config, groups);

    let mut built: Vec<(ColumnMapping, FieldAccess<T>)> = Vec::with_capacity(fields.len());
    for (entry, def) in fields.into_iter().zip(&schema.columns) {
        let column =
            assembler.assemble(&entry.metadata, &entry.directives, def.formatter.as_ref())?;
        let mapping = ColumnMapping {
            metadata: entry.metadata,
            read: column.read,
            write: column.write,
            formatter: column.formatter,
            groups: groups.to_vec(),
            unique: column.unique,
            width: column.width,
        };
        built.push((mapping, def.access.clone()));
    }
    built.sort_by_key(|(mapping, _)| mapping.column());

    let size = check_columns(schema, &built)?;

    let mut columns = Vec::with_capacity(size);
    let mut accessors = Vec::with_capacity(size);
    let mut built = built.into_iter().peekable();
    for number in 1..=size {
        match built.next_if(|(mapping, _)| mapping.column() == number) {
            Some((mapping, access)) => {
                columns.push(mapping);
                accessors.push(Some(access));
            }
            None => {
                let source_label = source_header
                    .and_then(|header| header.get(number - 1))
                    .map(|label| label.trim())
                    .filter(|label| !label.is_empty());
                columns.push(ColumnMapping::placeholder(
                    &schema.name,
                    number,
                    schema.placeholders.get(&number),
                    source_label,
                    groups,
                ));
                accessors.push(None);
            }
        }
    }

    let header_labels = columns.iter().map(|c| c.label().to_string()).collect();
    log_success(format!("Record model '{}' ready: {} columns", schema.name, columns.len()));

    Ok(RecordModel {
        name: schema.name.clone(),
        columns,
        accessors,
        header_labels,
        header: schema.header,
        validate_header: schema.validate_header,
        validators: schema.validators.clone(),
        callbacks: schema.callbacks.clone(),
        skip_validation_on_write: config.settings.skip_validation_on_write,
        factory: Arc::clone(&schema.factory),
    })
}

/// Check uniqueness and contiguity of column numbers; returns the column count.
fn check_columns<T>(
    schema: &RecordSchema<T>,
    built: &[(ColumnMapping, FieldAccess<T>)],
) -> Result<usize, ConfigError> {
    let last = match built.last() {
        Some((mapping, _)) => mapping.column(),
        None => return Err(ConfigError::NoColumns(schema.name.clone())),
    };

    for pair in built.windows(2) {
        let (first, second) = (&pair[0].0, &pair[1].0);
        if first.column() == second.column() {
            return Err(ConfigError::DuplicateColumns {
                number: first.column(),
                first: first.metadata.field.clone(),
                second: second.metadata.field.clone(),
            });
        }
    }

    match schema.partial {
        Some(column_size) => Ok(column_size.max(last)),
        None => {
            let missing: Vec<usize> = (1..=last)
                .filter(|n| !built.iter().any(|(m, _)| m.column() == *n))
                .collect();
            if missing.is_empty() {
                Ok(last)
            } else {
                Err(ConfigError::MissingColumns { missing })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::schema::ColumnDef;
    use crate::models::{DynamicRecord, ValueType};

    fn column(number: i64, name: &str, value_type: ValueType) -> ColumnDef<DynamicRecord> {
        ColumnDef::new(number, name, value_type, FieldAccess::dynamic(name))
    }

    fn build(
        schema: RecordSchema<DynamicRecord>,
    ) -> Result<RecordModel<DynamicRecord>, ConfigError> {
        build_record_model(&schema, &Configuration::standard(), &[])
    }

    #[test]
    fn test_columns_sorted_by_number() {
        let model = build(
            RecordSchema::new("Row")
                .column(column(2, "b", ValueType::Text))
                .column(column(1, "a", ValueType::Integer)),
        )
        .unwrap();
        assert_eq!(model.header_labels(), &["a".to_string(), "b".to_string()]);

        let record = model.read_row(&["5", "x"], &RowContext::new(2, 1)).unwrap();
        assert_eq!(record.get("a"), CellValue::Integer(5));
        assert_eq!(record.get("b"), CellValue::Text("x".to_string()));
    }

    #[test]
    fn test_column_number_errors() {
        assert_eq!(
            build(RecordSchema::new("Empty")).unwrap_err(),
            ConfigError::NoColumns("Empty".to_string())
        );
        assert_eq!(
            build(
                RecordSchema::new("Row")
                    .column(column(1, "a", ValueType::Text))
                    .column(column(1, "b", ValueType::Text))
            )
            .unwrap_err(),
            ConfigError::DuplicateColumns {
                number: 1,
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
        assert_eq!(
            build(RecordSchema::new("Row").column(column(3, "c", ValueType::Text))).unwrap_err(),
            ConfigError::MissingColumns { missing: vec![1, 2] }
        );
        assert_eq!(
            build(RecordSchema::new("Row").column(column(0, "z", ValueType::Text))).unwrap_err(),
            ConfigError::InvalidColumnNumber {
                field: "z".to_string(),
                number: 0,
            }
        );
    }

    #[test]
    fn test_partial_schema_placeholders() {
        let model = build(
            RecordSchema::new("Row")
                .partial(4)
                .column(column(2, "name", ValueType::Text)),
        )
        .unwrap();
        assert_eq!(model.header_labels(), &["column1", "name", "column3", "column4"]);
        assert!(model.columns()[0].is_placeholder());

        let record = model.read_row(&["skip", "Ann", "x", "y"], &RowContext::new(1, 1)).unwrap();
        assert_eq!(record.len(), 1);

        let cells = model.write_row(&record, &RowContext::new(1, 1)).unwrap();
        assert_eq!(cells, vec!["", "Ann", "", ""]);
    }

    #[test]
    fn test_read_row_collects_all_failures() {
        let model = build(
            RecordSchema::new("Row")
                .column(column(1, "qty", ValueType::Integer).directive(kinds::number_min(1)))
                .column(column(2, "name", ValueType::Text).required())
                .validator(|_, errors| errors.reject("never", "not reached")),
        )
        .unwrap();

        let errors = model.read_row(&["0", ""], &RowContext::new(3, 2)).unwrap_err();
        assert_eq!(errors.line, 3);
        assert_eq!(errors.fields.len(), 2);
        assert_eq!(errors.fields[0].kind, kinds::NUMBER_MIN);
        assert_eq!(errors.fields[0].column, 1);
        assert_eq!(errors.fields[1].kind, kinds::REQUIRE);
        assert_eq!(errors.fields[1].label, "name");
        assert!(errors.record.is_empty());
    }

    #[test]
    fn test_record_validator() {
        let model = build(
            RecordSchema::new("Range")
                .column(column(1, "low", ValueType::Integer))
                .column(column(2, "high", ValueType::Integer))
                .validator(|record: &DynamicRecord, errors| {
                    let low = record.get("low").as_f64();
                    let high = record.get("high").as_f64();
                    if let (Some(low), Some(high)) = (low, high) {
                        if low > high {
                            errors.reject("range.order", "low must not exceed high");
                        }
                    }
                }),
        )
        .unwrap();

        assert!(model.read_row(&["1", "2"], &RowContext::new(1, 1)).is_ok());
        let errors = model.read_row(&["3", "2"], &RowContext::new(2, 2)).unwrap_err();
        assert_eq!(errors.record[0].code, "range.order");
    }

    #[derive(Debug, Default)]
    struct Item {
        count: u32,
    }

    #[test]
    fn test_bind_failure() {
        let schema = RecordSchema::<Item>::new("Item").column(ColumnDef::new(
            1,
            "count",
            ValueType::Integer,
            FieldAccess::of(|i: &Item| i.count, |i: &mut Item, v: u32| i.count = v),
        ));
        let model = build_record_model(&schema, &Configuration::standard(), &[]).unwrap();

        assert_eq!(model.read_row(&["4"], &RowContext::new(1, 1)).unwrap().count, 4);
        let errors = model.read_row(&["-4"], &RowContext::new(1, 1)).unwrap_err();
        assert_eq!(errors.fields[0].kind, kinds::BIND);
        assert_eq!(errors.fields[0].rejected, CellValue::Integer(-4));
    }

    #[test]
    fn test_placeholder_labels() {
        let schema = RecordSchema::new("Row")
            .partial(4)
            .placeholder(3, "note")
            .fixed_placeholder(4, "filler", PadLayout::new(3).pad_char('.'))
            .column(column(1, "name", ValueType::Text));

        let model = build_with_header(
            &schema,
            &Configuration::standard(),
            &[],
            Some(&["name".to_string(), " code ".to_string()]),
        )
        .unwrap();
        assert_eq!(model.header_labels(), &["name", "code", "note", "filler"]);
        assert_eq!(model.columns()[3].width(), Some(PadLayout::new(3).pad_char('.')));

        let record = DynamicRecord::new().with("name", "Ann");
        let cells = model.write_row(&record, &RowContext::new(1, 1)).unwrap();
        assert_eq!(cells, vec!["Ann", "", "", "..."]);

        let plain = build(schema).unwrap();
        assert_eq!(plain.header_labels()[1], "column2");
    }

    #[test]
    fn test_callback_order() {
        let schema = RecordSchema::new("Row")
            .column(column(1, "qty", ValueType::Integer).directive(kinds::number_min(1)))
            .pre_read(|record: &mut DynamicRecord, _, _| record.set("trace", "pre"))
            .validator(|record, errors| {
                if record.get("qty") == CellValue::Integer(13) {
                    errors.reject("qty.unlucky", "13 is not allowed");
                }
            })
            .post_read(|record, ctx, errors| {
                let trace = format!("{}+post@{}", record.get("trace"), ctx.line);
                record.set("trace", trace);
                if !errors.is_empty() {
                    errors.reject("post.seen", "post_read saw the failure");
                }
            });
        let model = build(schema).unwrap();

        let record = model.read_row(&["2"], &RowContext::new(4, 3)).unwrap();
        assert_eq!(record.get("trace"), CellValue::Text("pre+post@4".to_string()));

        let errors = model.read_row(&["0"], &RowContext::new(5, 4)).unwrap_err();
        assert_eq!(errors.fields[0].kind, kinds::NUMBER_MIN);
        assert_eq!(errors.record[0].code, "post.seen");

        let errors = model.read_row(&["13"], &RowContext::new(6, 5)).unwrap_err();
        let codes: Vec<&str> = errors.record.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["qty.unlucky", "post.seen"]);
    }

    #[test]
    fn test_write_callbacks_and_validators() {
        let schema = RecordSchema::new("Row")
            .column(column(1, "qty", ValueType::Integer))
            .pre_write(|record: &DynamicRecord, _, errors| {
                if record.get("qty").is_null() {
                    errors.reject("qty.missing", "nothing to write");
                }
            })
            .validator(|record, errors| {
                if record.get("qty") == CellValue::Integer(13) {
                    errors.reject("qty.unlucky", "13 is not allowed");
                }
            })
            .post_write(|_, ctx, errors| errors.reject("written", format!("line {}", ctx.line)));

        let model = build(schema.clone()).unwrap();
        let ctx = RowContext::new(2, 1);
        let record = DynamicRecord::new().with("qty", 4i64);
        assert_eq!(model.write_row(&record, &ctx).unwrap(), vec!["4"]);
        let errors = model.after_write(&record, &ctx).unwrap_err();
        assert_eq!(errors.record[0].message, "line 2");

        let errors = model.write_row(&DynamicRecord::new(), &ctx).unwrap_err();
        assert_eq!(errors.record[0].code, "qty.missing");

        let unlucky = DynamicRecord::new().with("qty", 13i64);
        assert_eq!(model.write_row(&unlucky, &ctx).unwrap_err().record[0].code, "qty.unlucky");

        let mut config = Configuration::standard();
        config.settings.skip_validation_on_write = true;
        let relaxed = build_record_model(&schema, &config, &[]).unwrap();
        assert_eq!(relaxed.write_row(&unlucky, &ctx).unwrap(), vec!["13"]);
    }

    #[test]
    fn test_unique_tracked_rows() {
        let model = build(
            RecordSchema::new("Row")
                .column(column(1, "id", ValueType::Integer).directive(kinds::unique()))
                .column(column(2, "name", ValueType::Text)),
        )
        .unwrap();
        assert_eq!(model.columns()[0].describe()[2], "unique: read, write");

        let mut tracker = UniqueTracker::new();
        let first = RowContext::new(2, 1);
        let second = RowContext::new(3, 2);
        model.read_row_tracked(&["1", "a"], &first, Some(&mut tracker)).unwrap();
        let errors = model
            .read_row_tracked(&["01", "b"], &second, Some(&mut tracker))
            .unwrap_err();
        assert_eq!(errors.fields[0].kind, kinds::UNIQUE);
        assert_eq!(errors.fields[0].label, "id");

        // Without a tracker the check is skipped.
        assert!(model.read_row(&["1", "c"], &second).is_ok());

        let mut tracker = UniqueTracker::new();
        let record = DynamicRecord::new().with("id", 5i64);
        model.write_row_tracked(&record, &first, Some(&mut tracker)).unwrap();
        let errors = model.write_row_tracked(&record, &second, Some(&mut tracker)).unwrap_err();
        assert_eq!(errors.fields[0].variables.get("duplicated_line"), Some(&2.into()));
    }
}
