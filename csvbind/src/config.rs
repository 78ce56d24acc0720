//! Runtime settings and the registries a model build draws from.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::sync::Arc;

use crate::builder::factory::{FactoryRegistry, ProcessorFactory};
use crate::directive::{CompositeDefinition, DirectiveCatalog, KindSpec};
use crate::error::{BindError, ConfigError};
use crate::processor::format::FormatterRegistry;

pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 8;

/// Build-time switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Leave constraint directives out of write pipelines.
    pub skip_validation_on_write: bool,
    /// Nesting limit for composite expansion.
    pub max_expansion_depth: usize,
    /// Log one entry per column while building.
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skip_validation_on_write: false,
            max_expansion_depth: DEFAULT_MAX_EXPANSION_DEPTH,
            verbose: false,
        }
    }
}

impl Settings {
    /// Defaults overridden by `CSVBIND_SKIP_VALIDATION_ON_WRITE`,
    /// `CSVBIND_MAX_EXPANSION_DEPTH` and `CSVBIND_VERBOSE`.
    pub fn from_env() -> Result<Self, BindError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BindError> {
        let mut settings = Self::default();
        if let Some(v) = lookup("CSVBIND_SKIP_VALIDATION_ON_WRITE") {
            settings.skip_validation_on_write = parse_flag("CSVBIND_SKIP_VALIDATION_ON_WRITE", &v)?;
        }
        if let Some(v) = lookup("CSVBIND_MAX_EXPANSION_DEPTH") {
            settings.max_expansion_depth = v.trim().parse().map_err(|_| {
                BindError::Settings(format!("CSVBIND_MAX_EXPANSION_DEPTH: not a number: {}", v))
            })?;
        }
        if let Some(v) = lookup("CSVBIND_VERBOSE") {
            settings.verbose = parse_flag("CSVBIND_VERBOSE", &v)?;
        }
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BindError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BindError::Settings(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| BindError::Settings(format!("{}: {}", path.display(), e)))
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, BindError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(BindError::Settings(format!("{}: not a boolean: {}", key, other))),
    }
}

/// Settings plus the catalog, factory and formatter registries.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub settings: Settings,
    pub catalog: DirectiveCatalog,
    pub factories: FactoryRegistry,
    pub formatters: FormatterRegistry,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::standard()
    }
}

impl Configuration {
    /// Built-in kinds, factories and formatters with default settings.
    pub fn standard() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let catalog = DirectiveCatalog::standard();
        let factories = FactoryRegistry::for_catalog(&catalog);
        Self {
            settings,
            catalog,
            factories,
            formatters: FormatterRegistry::standard(),
        }
    }

    /// Add a user kind together with the factory building its steps.
    pub fn register_kind(
        &mut self,
        spec: KindSpec,
        factory: Arc<dyn ProcessorFactory>,
    ) -> Result<(), ConfigError> {
        let kind = spec.kind.clone();
        self.catalog.register(spec)?;
        self.factories.register(kind, factory);
        Ok(())
    }

    pub fn register_composite(
        &mut self,
        definition: CompositeDefinition,
    ) -> Result<(), ConfigError> {
        self.catalog.register_composite(definition)
    }
}
