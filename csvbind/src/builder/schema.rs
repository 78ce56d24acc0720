//! Declarative description of a record type.
//!
//! A [`RecordSchema`] lists the columns of a record type, each with its
//! value type, accessors and directives. Concrete structs describe
//! themselves through [`CsvRecord`]; runtime models are produced from JSON
//! definitions as `RecordSchema<DynamicRecord>`.
//!
//! Columns declared with [`ColumnDef::lazy`] take their number from the
//! header of the file, see [`LazyRecordModel`](super::LazyRecordModel).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::directive::DirectiveNode;
use crate::error::RowErrors;
use crate::models::{CellTypeError, CellValue, CsvEnum, DynamicRecord, FromCell, ValueType};
use crate::processor::conversion::PadLayout;
use crate::processor::format::FormatterRef;
use crate::processor::RowContext;

// =============================================================================
// Field Access
// =============================================================================

type Getter<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, CellValue) -> Result<(), CellTypeError> + Send + Sync>;

/// Get/set capability for one field, identical for structs and dynamic records.
pub struct FieldAccess<T> {
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> Clone for FieldAccess<T> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<T> fmt::Debug for FieldAccess<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldAccess")
    }
}

impl<T> FieldAccess<T> {
    /// Accessors working directly on cell values.
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&T) -> CellValue + Send + Sync + 'static,
        S: Fn(&mut T, CellValue) -> Result<(), CellTypeError> + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    /// Accessors for a typed field.
    ///
    /// ```rust,ignore
    /// FieldAccess::of(|r: &Order| r.quantity, |r, v| r.quantity = v)
    /// ```
    pub fn of<V, G, S>(get: G, set: S) -> Self
    where
        V: Into<CellValue> + FromCell,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self::new(
            move |record| get(record).into(),
            move |record, value| {
                set(record, V::from_cell(value)?);
                Ok(())
            },
        )
    }

    /// Accessors for an enum field of an enum column.
    pub fn of_enum<E, G, S>(get: G, set: S) -> Self
    where
        E: CsvEnum,
        G: Fn(&T) -> Option<E> + Send + Sync + 'static,
        S: Fn(&mut T, Option<E>) + Send + Sync + 'static,
    {
        Self::new(
            move |record| {
                get(record).map_or(CellValue::Null, |v| CellValue::Text(v.name().to_string()))
            },
            move |record, value| {
                let variant = match value {
                    CellValue::Null => None,
                    CellValue::Text(name) => match E::from_name(&name) {
                        Some(variant) => Some(variant),
                        None => {
                            return Err(CellTypeError {
                                expected: "enum",
                                found: format!("'{}'", name),
                            })
                        }
                    },
                    other => return Err(CellTypeError::new("enum", &other)),
                };
                set(record, variant);
                Ok(())
            },
        )
    }

    pub fn get(&self, record: &T) -> CellValue {
        (self.get)(record)
    }

    pub fn set(&self, record: &mut T, value: CellValue) -> Result<(), CellTypeError> {
        (self.set)(record, value)
    }
}

impl FieldAccess<DynamicRecord> {
    /// Accessors for a named entry of a [`DynamicRecord`].
    pub fn dynamic(field: &str) -> Self {
        let get_name = field.to_string();
        let set_name = field.to_string();
        Self::new(
            move |record: &DynamicRecord| record.get(&get_name),
            move |record: &mut DynamicRecord, value| {
                record.set(set_name.clone(), value);
                Ok(())
            },
        )
    }
}

// =============================================================================
// Type-level Directives
// =============================================================================

/// Directives shared by every field of a given component type.
///
/// A field-level directive of the same kind takes precedence.
pub trait TypeDirectives {
    const NAME: &'static str;

    fn directives() -> Vec<DirectiveNode>;
}

// =============================================================================
// Columns
// =============================================================================

/// One column of a record schema.
pub struct ColumnDef<T> {
    pub(crate) number: i64,
    pub(crate) field: String,
    pub(crate) label: Option<String>,
    pub(crate) value_type: ValueType,
    pub(crate) optional: bool,
    pub(crate) directives: Vec<DirectiveNode>,
    pub(crate) type_name: Option<String>,
    pub(crate) type_directives: Vec<DirectiveNode>,
    pub(crate) read_default: Option<String>,
    pub(crate) write_default: Option<String>,
    pub(crate) formatter: Option<FormatterRef>,
    pub(crate) access: FieldAccess<T>,
}

impl<T> Clone for ColumnDef<T> {
    fn clone(&self) -> Self {
        Self {
            number: self.number,
            field: self.field.clone(),
            label: self.label.clone(),
            value_type: self.value_type,
            optional: self.optional,
            directives: self.directives.clone(),
            type_name: self.type_name.clone(),
            type_directives: self.type_directives.clone(),
            read_default: self.read_default.clone(),
            write_default: self.write_default.clone(),
            formatter: self.formatter.clone(),
            access: self.access.clone(),
        }
    }
}

impl<T> ColumnDef<T> {
    pub fn new(number: i64, field: &str, value_type: ValueType, access: FieldAccess<T>) -> Self {
        Self {
            number,
            field: field.to_string(),
            label: None,
            value_type,
            optional: true,
            directives: Vec::new(),
            type_name: None,
            type_directives: Vec::new(),
            read_default: None,
            write_default: None,
            formatter: None,
            access,
        }
    }

    /// Column found by its label in the file header.
    pub fn lazy(field: &str, value_type: ValueType, access: FieldAccess<T>) -> Self {
        Self::new(0, field, value_type, access)
    }

    /// Header label; defaults to the field name.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Reject missing values on read.
    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn directive(mut self, node: impl Into<DirectiveNode>) -> Self {
        self.directives.push(node.into());
        self
    }

    /// Default text used in both directions.
    pub fn default_value(mut self, text: &str) -> Self {
        self.read_default = Some(text.to_string());
        self.write_default = Some(text.to_string());
        self
    }

    pub fn default_on_read(mut self, text: &str) -> Self {
        self.read_default = Some(text.to_string());
        self
    }

    pub fn default_on_write(mut self, text: &str) -> Self {
        self.write_default = Some(text.to_string());
        self
    }

    /// Replace the formatter chosen by value type.
    pub fn formatter(mut self, formatter: FormatterRef) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Declare the field's component type, inheriting its directives.
    pub fn of_type<P: TypeDirectives>(self) -> Self {
        self.with_type_directives(P::NAME, P::directives())
    }

    pub fn with_type_directives(mut self, name: &str, directives: Vec<DirectiveNode>) -> Self {
        self.type_name = Some(name.to_string());
        self.type_directives = directives;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    /// Header label, falling back to the field name.
    pub fn header_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }

    pub fn is_lazy(&self) -> bool {
        self.number <= 0
    }
}

// =============================================================================
// Schemas
// =============================================================================

/// Record-level check run after every column bound successfully.
pub type RecordValidator<T> = Arc<dyn Fn(&T, &mut RowErrors) + Send + Sync>;

/// Hook on a record being read.
pub type ReadCallback<T> = Arc<dyn Fn(&mut T, &RowContext, &mut RowErrors) + Send + Sync>;

/// Hook on a record being written.
pub type WriteCallback<T> = Arc<dyn Fn(&T, &RowContext, &mut RowErrors) + Send + Sync>;

/// Lifecycle hooks of a record type, each list run in registration order.
pub struct Callbacks<T> {
    pub(crate) pre_read: Vec<ReadCallback<T>>,
    pub(crate) post_read: Vec<ReadCallback<T>>,
    pub(crate) pre_write: Vec<WriteCallback<T>>,
    pub(crate) post_write: Vec<WriteCallback<T>>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            pre_read: Vec::new(),
            post_read: Vec::new(),
            pre_write: Vec::new(),
            post_write: Vec::new(),
        }
    }
}

impl<T> Clone for Callbacks<T> {
    fn clone(&self) -> Self {
        Self {
            pre_read: self.pre_read.clone(),
            post_read: self.post_read.clone(),
            pre_write: self.pre_write.clone(),
            post_write: self.post_write.clone(),
        }
    }
}

impl<T> Callbacks<T> {
    pub fn is_empty(&self) -> bool {
        self.pre_read.is_empty()
            && self.post_read.is_empty()
            && self.pre_write.is_empty()
            && self.post_write.is_empty()
    }
}

/// Label and optional width of an unmapped column of a partial schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderColumn {
    pub label: String,
    pub width: Option<PadLayout>,
}

/// Complete description of a record type.
pub struct RecordSchema<T> {
    pub(crate) name: String,
    pub(crate) columns: Vec<ColumnDef<T>>,
    pub(crate) header: bool,
    pub(crate) validate_header: bool,
    pub(crate) partial: Option<usize>,
    pub(crate) placeholders: BTreeMap<usize, PlaceholderColumn>,
    pub(crate) validators: Vec<RecordValidator<T>>,
    pub(crate) callbacks: Callbacks<T>,
    pub(crate) factory: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> Clone for RecordSchema<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            header: self.header,
            validate_header: self.validate_header,
            partial: self.partial,
            placeholders: self.placeholders.clone(),
            validators: self.validators.clone(),
            callbacks: self.callbacks.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T: Default + 'static> RecordSchema<T> {
    /// Schema whose records start from `T::default()`.
    pub fn new(name: &str) -> Self {
        Self::with_factory(name, T::default)
    }
}

impl<T> RecordSchema<T> {
    pub fn with_factory(name: &str, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            header: true,
            validate_header: false,
            partial: None,
            placeholders: BTreeMap::new(),
            validators: Vec::new(),
            callbacks: Callbacks::default(),
            factory: Arc::new(factory),
        }
    }

    pub fn column(mut self, column: ColumnDef<T>) -> Self {
        self.columns.push(column);
        self
    }

    /// Whether CSV input starts with a header row and output gets one.
    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Compare header labels when reading.
    pub fn validate_header(mut self, validate: bool) -> Self {
        self.validate_header = validate;
        self
    }

    /// Allow gaps in column numbers, for a file of `column_size` columns.
    pub fn partial(mut self, column_size: usize) -> Self {
        self.partial = Some(column_size);
        self
    }

    /// Label an unmapped column of a partial schema.
    pub fn placeholder(mut self, number: usize, label: &str) -> Self {
        let width = self.placeholders.get(&number).and_then(|p| p.width);
        self.placeholders.insert(number, PlaceholderColumn { label: label.to_string(), width });
        self
    }

    /// Label an unmapped column and give it a fixed width.
    pub fn fixed_placeholder(mut self, number: usize, label: &str, width: PadLayout) -> Self {
        let column = PlaceholderColumn {
            label: label.to_string(),
            width: Some(width),
        };
        self.placeholders.insert(number, column);
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&T, &mut RowErrors) + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Runs on the fresh record before any column binds.
    pub fn pre_read(
        mut self,
        callback: impl Fn(&mut T, &RowContext, &mut RowErrors) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.pre_read.push(Arc::new(callback));
        self
    }

    /// Runs after the record validators, whether or not the row failed.
    pub fn post_read(
        mut self,
        callback: impl Fn(&mut T, &RowContext, &mut RowErrors) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.post_read.push(Arc::new(callback));
        self
    }

    /// Runs before any column is extracted.
    pub fn pre_write(
        mut self,
        callback: impl Fn(&T, &RowContext, &mut RowErrors) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.pre_write.push(Arc::new(callback));
        self
    }

    /// Runs once the row has been written.
    pub fn post_write(
        mut self,
        callback: impl Fn(&T, &RowContext, &mut RowErrors) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.post_write.push(Arc::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef<T>] {
        &self.columns
    }
}

/// A Rust type bound to CSV rows through a static schema.
pub trait CsvRecord: Sized + Send + Sync + 'static {
    fn schema() -> RecordSchema<Self>;
}
