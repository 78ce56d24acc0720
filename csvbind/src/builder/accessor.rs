//! Field enumeration and directive collection.

use std::cmp::Ordering;

use super::ordering;
use super::schema::{ColumnDef, RecordSchema};
use crate::directive::{Directive, DirectiveCatalog, DirectiveNode};
use crate::error::ConfigError;
use crate::models::ValueType;

/// Everything known about a column apart from its pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    /// Name of the declaring record type.
    pub record_type: String,
    pub field: String,
    pub value_type: ValueType,
    /// 1-based column number.
    pub column: usize,
    pub label: String,
    pub optional: bool,
    pub read_default: Option<String>,
    pub write_default: Option<String>,
    /// Declared component type, when the field inherits type-level directives.
    pub type_name: Option<String>,
}

impl FieldMetadata {
    /// Metadata of a gap column in a partial schema.
    pub fn placeholder(record_type: &str, column: usize) -> Self {
        Self {
            record_type: record_type.to_string(),
            field: String::new(),
            value_type: ValueType::Text,
            column,
            label: format!("column{}", column),
            optional: true,
            read_default: None,
            write_default: None,
            type_name: None,
        }
    }
}

/// A field with its raw (unexpanded) directive list.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub metadata: FieldMetadata,
    pub directives: Vec<DirectiveNode>,
}

/// Reads field metadata out of a schema.
pub struct FieldAccessor<'a> {
    catalog: &'a DirectiveCatalog,
}

impl<'a> FieldAccessor<'a> {
    pub fn new(catalog: &'a DirectiveCatalog) -> Self {
        Self { catalog }
    }

    /// Columns in declaration order.
    ///
    /// Column numbers are checked here only for being positive; uniqueness
    /// and contiguity are checked once all columns are known.
    pub fn fields<T>(&self, schema: &RecordSchema<T>) -> Result<Vec<FieldEntry>, ConfigError> {
        schema
            .columns
            .iter()
            .map(|column| self.entry(&schema.name, column))
            .collect()
    }

    fn entry<T>(
        &self,
        record_type: &str,
        column: &ColumnDef<T>,
    ) -> Result<FieldEntry, ConfigError> {
        let number = usize::try_from(column.number)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ConfigError::InvalidColumnNumber {
                field: column.field.clone(),
                number: column.number,
            })?;

        let metadata = FieldMetadata {
            record_type: record_type.to_string(),
            field: column.field.clone(),
            value_type: column.value_type,
            column: number,
            label: column.label.clone().unwrap_or_else(|| column.field.clone()),
            optional: column.optional,
            read_default: column.read_default.clone(),
            write_default: column.write_default.clone(),
            type_name: column.type_name.clone(),
        };

        Ok(FieldEntry {
            metadata,
            directives: merge_type_directives(&column.directives, &column.type_directives),
        })
    }

    /// Normalize resolved directives and check they apply to the field's type.
    pub fn check_directives(
        &self,
        metadata: &FieldMetadata,
        resolved: &[Directive],
    ) -> Result<Vec<Directive>, ConfigError> {
        resolved
            .iter()
            .map(|directive| {
                let spec = self
                    .catalog
                    .spec(directive.kind())
                    .ok_or_else(|| ConfigError::UnregisteredKind(directive.kind().clone()))?;
                if !spec.supports(metadata.value_type) {
                    return Err(ConfigError::IncompatibleValueType {
                        field: metadata.field.clone(),
                        kind: directive.kind().clone(),
                        value_type: metadata.value_type,
                    });
                }
                self.catalog.normalize(directive)
            })
            .collect()
    }

    /// Comparator used to order directives within a pipeline.
    pub fn comparator(&self) -> fn(&Directive, &Directive) -> Ordering {
        ordering::compare
    }
}

/// Field-level directives followed by the type-level ones whose kind the
/// field does not already declare.
fn merge_type_directives(
    field: &[DirectiveNode],
    inherited: &[DirectiveNode],
) -> Vec<DirectiveNode> {
    let mut merged = field.to_vec();
    merged.extend(
        inherited
            .iter()
            .filter(|t| !field.iter().any(|f| f.kind() == t.kind()))
            .cloned(),
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::schema::FieldAccess;
    use crate::directive::kinds;
    use crate::models::DynamicRecord;

    fn column(number: i64) -> ColumnDef<DynamicRecord> {
        ColumnDef::new(number, "code", ValueType::Text, FieldAccess::dynamic("code"))
    }

    #[test]
    fn test_field_directive_shadows_type_directive() {
        let schema = RecordSchema::<DynamicRecord>::new("Row").column(
            column(1)
                .directive(kinds::length_max(3))
                .with_type_directives(
                    "Code",
                    vec![kinds::length_max(10).into(), kinds::upper().into()],
                ),
        );
        let catalog = DirectiveCatalog::standard();
        let fields = FieldAccessor::new(&catalog).fields(&schema).unwrap();
        let found: Vec<_> = fields[0].directives.iter().map(|d| d.kind().clone()).collect();
        assert_eq!(found, vec![kinds::LENGTH_MAX, kinds::UPPER]);
        match &fields[0].directives[0] {
            DirectiveNode::Primitive(d) => assert_eq!(d.size_attr("max"), Ok(3)),
            other => panic!("unexpected node {:?}", other),
        }
        assert_eq!(fields[0].metadata.type_name.as_deref(), Some("Code"));
    }

    #[test]
    fn test_column_number_must_be_positive() {
        let schema = RecordSchema::<DynamicRecord>::new("Row").column(column(0));
        let catalog = DirectiveCatalog::standard();
        let err = FieldAccessor::new(&catalog).fields(&schema).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidColumnNumber { field: "code".into(), number: 0 }
        );
    }

    #[test]
    fn test_incompatible_value_type() {
        let catalog = DirectiveCatalog::standard();
        let accessor = FieldAccessor::new(&catalog);
        let meta = FieldMetadata {
            value_type: ValueType::Text,
            ..FieldMetadata::placeholder("Row", 1)
        };
        let err = accessor
            .check_directives(&meta, &[kinds::number_range(0, 100)])
            .unwrap_err();
        assert!(matches!(err, ConfigError::IncompatibleValueType { .. }));
    }

    #[test]
    fn test_placeholder_label() {
        assert_eq!(FieldMetadata::placeholder("Row", 3).label, "column3");
    }
}
