//! Composition of read and write pipelines for a single column.
//!
//! Read chain, outermost first:
//!
//! ```text
//! presence check -> default substitution -> parse -> directive steps
//! ```
//!
//! Write chain:
//!
//! ```text
//! default substitution -> directive steps -> print
//! ```
//!
//! Directive steps are built by folding the sorted directive list from the
//! last entry to the first, so every factory sees the steps that will run
//! after its own.
//!
//! `Unique` builds no step. It only marks the column for the cross-row
//! check readers and writers run.

use std::sync::Arc;

use super::accessor::{FieldAccessor, FieldMetadata};
use super::expander::CompositeExpander;
use super::factory::FactoryContext;
use super::ordering;
use super::unique::UniqueScope;
use crate::config::Configuration;
use crate::directive::{kinds, BuildCase, Category, Directive, DirectiveNode, Group};
use crate::error::ConfigError;
use crate::logs::{log_info_indent, log_warning_indent};
use crate::models::CellValue;
use crate::processor::constraint::ConstraintStep;
use crate::processor::conversion::{DefaultStep, PadLayout};
use crate::processor::format::{FormatterRef, ParseStep, PrintStep, TextFormatter};
use crate::processor::{Pipeline, StepRef, WithMessage};

/// Both pipelines of a column and the formatter they share.
#[derive(Debug, Clone)]
pub struct AssembledColumn {
    pub read: Pipeline,
    pub write: Pipeline,
    pub formatter: FormatterRef,
    pub unique: UniqueScope,
    /// Layout of the last `MultiPad` of the write chain.
    pub width: Option<PadLayout>,
}

pub struct PipelineAssembler<'a> {
    config: &'a Configuration,
    groups: &'a [Group],
}

impl<'a> PipelineAssembler<'a> {
    pub fn new(config: &'a Configuration, groups: &'a [Group]) -> Self {
        Self { config, groups }
    }

    /// Expand, check and assemble the directives of one field.
    pub fn assemble(
        &self,
        metadata: &FieldMetadata,
        nodes: &[DirectiveNode],
        custom_formatter: Option<&FormatterRef>,
    ) -> Result<AssembledColumn, ConfigError> {
        let catalog = &self.config.catalog;
        let depth = self.config.settings.max_expansion_depth;
        let expanded = CompositeExpander::new(catalog, depth).expand(nodes)?;
        let directives = FieldAccessor::new(catalog).check_directives(metadata, &expanded)?;

        let formatter = match custom_formatter {
            Some(f) => Arc::clone(f),
            None => {
                let formats: Vec<Directive> = directives
                    .iter()
                    .filter(|d| self.category(d) == Some(Category::Format))
                    .filter(|d| ordering::matches_groups(d, self.groups))
                    .cloned()
                    .collect();
                self.config.formatters.build(metadata.value_type, &formats)?
            }
        };

        let read = self.read_chain(metadata, &directives, &formatter)?;
        let write = self.write_chain(metadata, &directives, &formatter)?;

        let written = self.write_selection(&directives);
        let unique = UniqueScope {
            read: ordering::select(&directives, BuildCase::Read, self.groups)
                .iter()
                .any(|d| *d.kind() == kinds::UNIQUE),
            write: written.iter().any(|d| *d.kind() == kinds::UNIQUE),
        };
        let width = written
            .iter()
            .filter(|d| *d.kind() == kinds::MULTI_PAD)
            .last()
            .map(PadLayout::from_directive)
            .transpose()?;

        if self.config.settings.verbose {
            log_info_indent(
                format!(
                    "{} (column {}): read [{}], write [{}]",
                    metadata.field,
                    metadata.column,
                    read.describe().join(" -> "),
                    write.describe().join(" -> ")
                ),
                1,
            );
        }

        Ok(AssembledColumn {
            read,
            write,
            formatter,
            unique,
            width,
        })
    }

    fn read_chain(
        &self,
        metadata: &FieldMetadata,
        directives: &[Directive],
        formatter: &FormatterRef,
    ) -> Result<Pipeline, ConfigError> {
        let (presence, rest): (Vec<Directive>, Vec<Directive>) =
            ordering::select(directives, BuildCase::Read, self.groups)
                .into_iter()
                .partition(|d| *d.kind() == kinds::REQUIRE);

        let pipeline = self.fold(metadata, &rest, BuildCase::Read, formatter, Pipeline::empty())?;
        let mut pipeline = pipeline.with_front(Arc::new(ParseStep::new(
            metadata.value_type,
            Arc::clone(formatter),
        )));

        if let Some(text) = &metadata.read_default {
            parse_default(metadata, text, formatter.as_ref())?;
            if !presence.is_empty() {
                log_warning_indent(
                    format!("{}: read default replaces the presence check", metadata.field),
                    1,
                );
            }
            return Ok(pipeline.with_front(Arc::new(DefaultStep::new(
                BuildCase::Read,
                CellValue::Text(text.clone()),
            ))));
        }

        if presence.len() > 1 {
            log_warning_indent(
                format!(
                    "{}: {} presence directives, using the first",
                    metadata.field,
                    presence.len()
                ),
                1,
            );
        }
        match presence.first() {
            Some(require) => {
                let step =
                    self.dispatch(metadata, require, BuildCase::Read, formatter, &pipeline)?;
                if let Some(step) = step {
                    pipeline = pipeline.with_front(step);
                }
            }
            None if !metadata.optional => {
                pipeline = pipeline.with_front(Arc::new(ConstraintStep::implicit_require()));
            }
            None => {}
        }
        Ok(pipeline)
    }

    fn write_chain(
        &self,
        metadata: &FieldMetadata,
        directives: &[Directive],
        formatter: &FormatterRef,
    ) -> Result<Pipeline, ConfigError> {
        let selected = self.write_selection(directives);

        let print: StepRef = Arc::new(PrintStep::new(Arc::clone(formatter)));
        let pipeline = self.fold(
            metadata,
            &selected,
            BuildCase::Write,
            formatter,
            Pipeline::from_steps(vec![print]),
        )?;

        match &metadata.write_default {
            Some(text) => {
                let value = parse_default(metadata, text, formatter.as_ref())?;
                Ok(pipeline.with_front(Arc::new(DefaultStep::new(BuildCase::Write, value))))
            }
            None => Ok(pipeline),
        }
    }

    /// Write directives in order, without constraints when write validation is off.
    fn write_selection(&self, directives: &[Directive]) -> Vec<Directive> {
        let skip_constraints = self.config.settings.skip_validation_on_write;
        ordering::select(directives, BuildCase::Write, self.groups)
            .into_iter()
            .filter(|d| !(skip_constraints && self.category(d) == Some(Category::Constraint)))
            .collect()
    }

    /// Build steps from last to first in front of `tail`.
    fn fold(
        &self,
        metadata: &FieldMetadata,
        directives: &[Directive],
        case: BuildCase,
        formatter: &FormatterRef,
        tail: Pipeline,
    ) -> Result<Pipeline, ConfigError> {
        directives.iter().rev().try_fold(tail, |downstream, directive| {
            let step = self.dispatch(metadata, directive, case, formatter, &downstream)?;
            Ok(match step {
                Some(step) => downstream.with_front(step),
                None => downstream,
            })
        })
    }

    fn dispatch(
        &self,
        metadata: &FieldMetadata,
        directive: &Directive,
        case: BuildCase,
        formatter: &FormatterRef,
        downstream: &Pipeline,
    ) -> Result<Option<StepRef>, ConfigError> {
        let ctx = FactoryContext {
            field: metadata,
            downstream,
            formatter,
            case,
            groups: self.groups,
        };
        let step = self.config.factories.dispatch(directive, &ctx)?;
        Ok(step.map(|s| WithMessage::wrap(s, directive.message())))
    }

    fn category(&self, directive: &Directive) -> Option<Category> {
        self.config.catalog.spec(directive.kind()).map(|s| s.category)
    }
}

/// Parse a configured default. Empty text stands for null.
fn parse_default(
    metadata: &FieldMetadata,
    text: &str,
    formatter: &dyn TextFormatter,
) -> Result<CellValue, ConfigError> {
    if text.is_empty() {
        return Ok(CellValue::Null);
    }
    formatter.parse(text).map_err(|e| ConfigError::InvalidDefault {
        field: metadata.field.clone(),
        text: text.to_string(),
        message: e.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::directive::KindId;
    use crate::models::ValueType;
    use crate::processor::RowContext;

    fn field(value_type: ValueType) -> FieldMetadata {
        FieldMetadata {
            field: "amount".to_string(),
            label: "Amount".to_string(),
            value_type,
            ..FieldMetadata::placeholder("Order", 1)
        }
    }

    fn assemble(
        meta: &FieldMetadata,
        nodes: Vec<DirectiveNode>,
    ) -> Result<AssembledColumn, ConfigError> {
        let config = Configuration::standard();
        PipelineAssembler::new(&config, &[]).assemble(meta, &nodes, None)
    }

    fn kinds_of(pipeline: &Pipeline) -> Vec<String> {
        pipeline.kinds().into_iter().map(|k| k.short_name().to_string()).collect()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_read_chain_order() {
        let meta = field(ValueType::Integer);
        let column = assemble(
            &meta,
            vec![kinds::number_range(0, 100).into(), kinds::require().with_order(50).into()],
        )
        .unwrap();
        assert_eq!(kinds_of(&column.read), vec!["Require", "Parse", "NumberRange"]);
        assert_eq!(kinds_of(&column.write), vec!["Require", "NumberRange", "Print"]);
    }

    #[test]
    fn test_implicit_presence_for_required_field() {
        let mut meta = field(ValueType::Text);
        meta.optional = false;
        let column = assemble(&meta, vec![]).unwrap();
        assert_eq!(kinds_of(&column.read), vec!["Require", "Parse"]);

        let err = column.read.execute(text(""), &RowContext::default()).unwrap_err();
        assert_eq!(err.kind, kinds::REQUIRE);
    }

    #[test]
    fn test_read_default_replaces_presence() {
        let mut meta = field(ValueType::Integer);
        meta.optional = false;
        meta.read_default = Some("7".to_string());
        let column = assemble(&meta, vec![kinds::require().into()]).unwrap();
        assert_eq!(kinds_of(&column.read), vec!["DefaultValue", "Parse"]);
        assert_eq!(
            column.read.execute(text(""), &RowContext::default()),
            Ok(CellValue::Integer(7))
        );
    }

    #[test]
    fn test_invalid_default() {
        let mut meta = field(ValueType::Integer);
        meta.write_default = Some("seven".to_string());
        assert!(matches!(
            assemble(&meta, vec![]),
            Err(ConfigError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn test_write_default() {
        let mut meta = field(ValueType::Integer);
        meta.write_default = Some("0".to_string());
        let column = assemble(&meta, vec![]).unwrap();
        assert_eq!(
            column.write.execute(CellValue::Null, &RowContext::default()),
            Ok(text("0"))
        );
    }

    #[test]
    fn test_skip_validation_on_write() {
        let config = Configuration::with_settings(Settings {
            skip_validation_on_write: true,
            ..Settings::default()
        });
        let meta = field(ValueType::Integer);
        let nodes: Vec<DirectiveNode> = vec![kinds::number_max(10).into(), kinds::require().into()];
        let column = PipelineAssembler::new(&config, &[]).assemble(&meta, &nodes, None).unwrap();
        assert_eq!(kinds_of(&column.write), vec!["Require", "Print"]);
        assert_eq!(kinds_of(&column.read), vec!["Require", "Parse", "NumberMax"]);
    }

    #[test]
    fn test_message_override_reaches_violation() {
        let meta = field(ValueType::Integer);
        let nodes = vec![kinds::number_max(10).with_message("too big").into()];
        let column = assemble(&meta, nodes).unwrap();
        let err = column.read.execute(text("11"), &RowContext::default()).unwrap_err();
        assert_eq!(err.message.as_deref(), Some("too big"));
    }

    #[test]
    fn test_incompatible_value_type() {
        let meta = field(ValueType::Text);
        let err = assemble(&meta, vec![kinds::number_range(0, 100).into()]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::IncompatibleValueType {
                field: "amount".to_string(),
                kind: kinds::NUMBER_RANGE,
                value_type: ValueType::Text,
            }
        );
    }

    fn probe(_: &Directive, ctx: &FactoryContext<'_>) -> Result<Option<StepRef>, ConfigError> {
        let downstream: Vec<String> =
            ctx.downstream.kinds().iter().map(|k| k.short_name().to_string()).collect();
        match ctx.case {
            BuildCase::Read => assert_eq!(downstream, vec!["Upper"]),
            BuildCase::Write => assert_eq!(downstream, vec!["Upper", "Print"]),
        }
        Ok(None)
    }

    #[test]
    fn test_factory_sees_downstream() {
        let custom = KindId::new("app::Probe");
        let mut config = Configuration::standard();
        config
            .register_kind(
                crate::directive::KindSpec::new(custom.clone(), Category::Conversion),
                Arc::new(probe),
            )
            .unwrap();
        let meta = field(ValueType::Text);
        let nodes: Vec<DirectiveNode> = vec![
            kinds::upper().with_order(2).into(),
            Directive::new(custom).with_order(1).into(),
        ];
        PipelineAssembler::new(&config, &[]).assemble(&meta, &nodes, None).unwrap();
    }

    #[test]
    fn test_unique_and_width_are_recorded() {
        let meta = field(ValueType::Text);
        let column = assemble(
            &meta,
            vec![
                kinds::unique().on(BuildCase::Read).into(),
                kinds::fixed_size(6).with_attr("right_align", true).into(),
            ],
        )
        .unwrap();
        assert_eq!(column.unique, UniqueScope { read: true, write: false });
        assert!(!kinds_of(&column.read).contains(&"Unique".to_string()));
        let width = column.width.unwrap();
        assert_eq!(width.size, 6);
        assert!(width.right_align);

        let plain = assemble(&meta, vec![kinds::trim().into()]).unwrap();
        assert_eq!(plain.width, None);
        assert_eq!(plain.unique, UniqueScope::default());
    }

    #[test]
    fn test_unique_dropped_when_write_validation_is_off() {
        let settings = Settings {
            skip_validation_on_write: true,
            ..Settings::default()
        };
        let config = Configuration::with_settings(settings);
        let column = PipelineAssembler::new(&config, &[])
            .assemble(&field(ValueType::Text), &[kinds::unique().into()], None)
            .unwrap();
        assert_eq!(column.unique, UniqueScope { read: true, write: false });
    }
}
