//! # csvbind - Directive-driven binding between CSV rows and typed records
//!
//! Record types declare their columns with directives (presence, text
//! conversions, constraints, formats). csvbind resolves those directives once
//! into an immutable model holding a read pipeline and a write pipeline per
//! column, then runs the model over each row.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ RecordSchema│────▶│  Composite  │────▶│  Ordering & │────▶│   Factory   │
//! │ / JSON def  │     │  expansion  │     │  filtering  │     │  dispatch   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐            │
//! │  CSV rows   │◀───▶│ RecordModel │◀────│  Pipeline   │◀───────────┘
//! │ (io module) │     │  (cached)   │     │  assembler  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvbind::{
//!     kinds, ColumnDef, CsvRecord, FieldAccess, RecordModel, RecordSchema, RowContext, ValueType,
//! };
//!
//! #[derive(Default)]
//! struct Score {
//!     player: String,
//!     points: Option<i64>,
//! }
//!
//! impl CsvRecord for Score {
//!     fn schema() -> RecordSchema<Self> {
//!         RecordSchema::new("Score")
//!             .column(
//!                 ColumnDef::new(
//!                     1,
//!                     "player",
//!                     ValueType::Text,
//!                     FieldAccess::of(
//!                         |s: &Score| s.player.clone(),
//!                         |s: &mut Score, v| s.player = v,
//!                     ),
//!                 )
//!                 .required()
//!                 .directive(kinds::trim()),
//!             )
//!             .column(
//!                 ColumnDef::new(
//!                     2,
//!                     "points",
//!                     ValueType::Integer,
//!                     FieldAccess::of(|s: &Score| s.points, |s: &mut Score, v| s.points = v),
//!                 )
//!                 .directive(kinds::number_range(0, 100)),
//!             )
//!     }
//! }
//!
//! let model = RecordModel::<Score>::for_type()?;
//! let score = model.read_row(&[" Ann ", "42"], &RowContext::new(2, 1))?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Configuration errors, row failures and outer error types
//! - [`models`] - Value types, cell values and dynamic records
//! - [`directive`] - Directive values, kinds and the directive catalog
//! - [`processor`] - Pipeline steps, formatters and constraints
//! - [`builder`] - Record model construction and caching
//! - [`message`] - Failure message rendering
//! - [`io`] - CSV and fixed-width reading and writing
//! - [`definition`] - JSON model definitions
//! - [`config`] - Settings and registries
//! - [`logs`] - Build and binding logs

// Core modules
pub mod error;
pub mod models;

// Directives and steps
pub mod directive;
pub mod processor;

// Model construction
pub mod builder;
pub mod config;

// Collaborators
pub mod definition;
pub mod io;
pub mod message;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BindError, BindResult, ConfigError, ConfigResult, CsvError, CsvResult, DefinitionError,
    DefinitionResult, FieldFailure, RecordFailure, RowError, RowErrors,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellTypeError, CellValue, CsvEnum, DynamicRecord, FromCell, ValueType};

// =============================================================================
// Re-exports - Directives
// =============================================================================

pub use directive::{
    kinds, AttrSpec, AttrType, BuildCase, Category, CompositeDefinition, CompositeDirective,
    Directive, DirectiveCatalog, DirectiveNode, Group, KindId, KindSpec, OverrideLink,
};

// =============================================================================
// Re-exports - Pipelines
// =============================================================================

pub use processor::format::{
    FormatterRef, FormatterRegistry, SerializedFormatter, StatefulFormatter, TextFormatter,
};
pub use processor::conversion::PadLayout;
pub use processor::{Pipeline, RowContext, Step, StepRef, Violation};

// =============================================================================
// Re-exports - Builder
// =============================================================================

pub use builder::{
    build_record_model, Callbacks, ColumnDef, ColumnMapping, CsvRecord, FactoryContext,
    FactoryRegistry, FieldAccess, FieldMetadata, LazyRecordModel, PlaceholderColumn,
    ProcessorFactory, ReadCallback, RecordModel, RecordModelCache, RecordSchema, TypeDirectives,
    UniqueScope, UniqueTracker, WriteCallback,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{Configuration, Settings};

// =============================================================================
// Re-exports - Messages, I/O, Definitions
// =============================================================================

pub use definition::ModelDefinition;
pub use io::{FixedWidthReader, FixedWidthWriter, RecordReader, RecordWriter};
pub use message::{MessageInterpolator, MessageResolver};
