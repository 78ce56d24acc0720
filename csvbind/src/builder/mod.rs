//! Record model construction.
//!
//! Turns a [`RecordSchema`] into an immutable [`RecordModel`]:
//!
//! 1. [`accessor`] enumerates fields and collects their directives
//! 2. [`expander`] flattens composite directives
//! 3. [`ordering`] filters by build case and group, then sorts
//! 4. [`factory`] turns each directive into a pipeline step
//! 5. [`assembler`] composes the read and write chains
//! 6. [`mapping`] validates column numbers and stores the result
//!
//! Built models are memoized per type and group set by [`RecordModelCache`].
//! Schemas whose columns are found by header label go through
//! [`LazyRecordModel`] instead, one build per header. Cross-row uniqueness
//! state lives outside the model in a [`UniqueTracker`].

pub mod accessor;
pub mod assembler;
pub mod cache;
pub mod expander;
pub mod factory;
pub mod lazy;
pub mod mapping;
pub mod ordering;
pub mod schema;
pub mod unique;

pub use accessor::{FieldAccessor, FieldEntry, FieldMetadata};
pub use assembler::{AssembledColumn, PipelineAssembler};
pub use cache::{CacheStats, RecordModelCache};
pub use expander::CompositeExpander;
pub use factory::{FactoryContext, FactoryRegistry, ProcessorFactory};
pub use lazy::LazyRecordModel;
pub use mapping::{build_record_model, ColumnMapping, RecordModel};
pub use schema::{
    Callbacks, ColumnDef, CsvRecord, FieldAccess, PlaceholderColumn, ReadCallback, RecordSchema,
    RecordValidator, TypeDirectives, WriteCallback,
};
pub use unique::{UniqueScope, UniqueTracker};
