//! Directives: the declarative metadata attached to record fields.
//!
//! A field carries a list of [`DirectiveNode`]s. Primitive nodes map to one
//! pipeline step each; composite nodes bundle several primitives and are
//! flattened before pipelines are built.
//!
//! # Example
//!
//! ```rust,ignore
//! use csvbind::directive::{kinds, BuildCase};
//!
//! let pad = kinds::fixed_size(10).with_attr("pad_char", "_");
//! let range = kinds::number_range(0, 100).with_message("{label} out of range");
//! let upper_on_write = kinds::upper().on(BuildCase::Write);
//! ```

pub mod catalog;
pub mod kinds;

mod kind;
mod node;

pub use catalog::{AttrSpec, AttrType, DirectiveCatalog, KindSpec};
pub use kind::{BuildCase, Category, Group, KindId};
pub use node::{CompositeDefinition, CompositeDirective, Directive, DirectiveNode, OverrideLink};
