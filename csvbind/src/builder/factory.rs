//! Dispatch from directive kinds to the factories building their steps.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::accessor::FieldMetadata;
use crate::directive::{kinds, BuildCase, Category, Directive, DirectiveCatalog, Group, KindId};
use crate::error::ConfigError;
use crate::processor::constraint::ConstraintStep;
use crate::processor::conversion::ConversionStep;
use crate::processor::format::FormatterRef;
use crate::processor::{Pipeline, StepRef};

/// What a factory knows about the step it is asked to build.
pub struct FactoryContext<'a> {
    pub field: &'a FieldMetadata,
    /// Steps already built that will run after this one.
    pub downstream: &'a Pipeline,
    pub formatter: &'a FormatterRef,
    pub case: BuildCase,
    pub groups: &'a [Group],
}

/// Builds the step for one directive kind.
///
/// `Ok(None)` means the directive contributes nothing in this context.
pub trait ProcessorFactory: Send + Sync {
    fn create(
        &self,
        directive: &Directive,
        ctx: &FactoryContext<'_>,
    ) -> Result<Option<StepRef>, ConfigError>;
}

impl<F> ProcessorFactory for F
where
    F: Fn(&Directive, &FactoryContext<'_>) -> Result<Option<StepRef>, ConfigError> + Send + Sync,
{
    fn create(
        &self,
        directive: &Directive,
        ctx: &FactoryContext<'_>,
    ) -> Result<Option<StepRef>, ConfigError> {
        self(directive, ctx)
    }
}

/// Factory for text conversions.
pub struct ConversionFactory;

impl ProcessorFactory for ConversionFactory {
    fn create(
        &self,
        directive: &Directive,
        _ctx: &FactoryContext<'_>,
    ) -> Result<Option<StepRef>, ConfigError> {
        Ok(Some(Arc::new(ConversionStep::from_directive(directive)?)))
    }
}

/// Factory for constraints and the presence check.
pub struct ConstraintFactory;

impl ProcessorFactory for ConstraintFactory {
    fn create(
        &self,
        directive: &Directive,
        ctx: &FactoryContext<'_>,
    ) -> Result<Option<StepRef>, ConfigError> {
        let step = ConstraintStep::from_directive(directive, ctx.formatter.as_ref())?;
        Ok(Some(Arc::new(step)))
    }
}

/// Factory for format directives, which configure the formatter instead.
pub struct NoStepFactory;

impl ProcessorFactory for NoStepFactory {
    fn create(
        &self,
        _directive: &Directive,
        _ctx: &FactoryContext<'_>,
    ) -> Result<Option<StepRef>, ConfigError> {
        Ok(None)
    }
}

/// Maps directive kinds to factories.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<KindId, Arc<dyn ProcessorFactory>>,
}

impl FactoryRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// One factory per kind of the catalog, chosen by category.
    pub fn for_catalog(catalog: &DirectiveCatalog) -> Self {
        let conversion: Arc<dyn ProcessorFactory> = Arc::new(ConversionFactory);
        let constraint: Arc<dyn ProcessorFactory> = Arc::new(ConstraintFactory);
        let none: Arc<dyn ProcessorFactory> = Arc::new(NoStepFactory);

        let mut registry = Self::empty();
        for spec in catalog.specs() {
            let factory = match spec.category {
                _ if spec.kind == kinds::UNIQUE => &none,
                Category::Conversion => &conversion,
                Category::Presence | Category::Constraint => &constraint,
                Category::Format => &none,
            };
            registry.register(spec.kind.clone(), Arc::clone(factory));
        }
        registry
    }

    pub fn standard() -> Self {
        Self::for_catalog(&DirectiveCatalog::standard())
    }

    pub fn register(&mut self, kind: KindId, factory: Arc<dyn ProcessorFactory>) {
        self.factories.insert(kind, factory);
    }

    pub fn contains(&self, kind: &KindId) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn dispatch(
        &self,
        directive: &Directive,
        ctx: &FactoryContext<'_>,
    ) -> Result<Option<StepRef>, ConfigError> {
        let factory = self
            .factories
            .get(directive.kind())
            .ok_or_else(|| ConfigError::UnregisteredKind(directive.kind().clone()))?;
        factory.create(directive, ctx)
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.factories.keys().map(KindId::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("FactoryRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::kinds;
    use crate::models::ValueType;
    use crate::processor::format::TextFormat;

    fn with_ctx<R>(f: impl FnOnce(&FactoryContext<'_>) -> R) -> R {
        let field = FieldMetadata {
            value_type: ValueType::Text,
            ..FieldMetadata::placeholder("Row", 1)
        };
        let downstream = Pipeline::empty();
        let formatter: FormatterRef = Arc::new(TextFormat);
        let ctx = FactoryContext {
            field: &field,
            downstream: &downstream,
            formatter: &formatter,
            case: BuildCase::Read,
            groups: &[],
        };
        f(&ctx)
    }

    #[test]
    fn test_dispatch_by_category() {
        let registry = FactoryRegistry::standard();
        let catalog = DirectiveCatalog::standard();
        with_ctx(|ctx| {
            let trim = catalog.normalize(&kinds::trim()).unwrap();
            assert!(registry.dispatch(&trim, ctx).unwrap().is_some());

            let fmt = catalog.normalize(&kinds::date_time_format("%Y")).unwrap();
            assert!(registry.dispatch(&fmt, ctx).unwrap().is_none());
        });
    }

    #[test]
    fn test_unregistered_kind() {
        let registry = FactoryRegistry::empty();
        with_ctx(|ctx| {
            let err = registry.dispatch(&kinds::trim(), ctx).unwrap_err();
            assert_eq!(err, ConfigError::UnregisteredKind(kinds::TRIM));
        });
    }

    fn skip_on_read(
        _: &Directive,
        ctx: &FactoryContext<'_>,
    ) -> Result<Option<StepRef>, ConfigError> {
        assert_eq!(ctx.case, BuildCase::Read);
        Ok(None)
    }

    #[test]
    fn test_function_factory() {
        let mut registry = FactoryRegistry::empty();
        let custom = KindId::new("app::Skip");
        registry.register(custom.clone(), Arc::new(skip_on_read));
        with_ctx(|ctx| {
            assert!(registry.dispatch(&Directive::new(custom), ctx).unwrap().is_none());
        });
    }
}
