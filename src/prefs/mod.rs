//! The type registry.
//!
//! This module contains:
//! - Cardinality rules (`1m`, `1o`, `+`, `*`)
//! - Metadata and metadata-group types
//! - Structure types with their allowed children and metadata rules
//! - The [`Prefs`] registry and its ruleset loader

mod cardinality;
mod parser;
mod registry;
mod struct_type;
mod types;

pub use cardinality::Cardinality;
pub use registry::Prefs;
pub use struct_type::{DocStructType, GroupRule};
pub use types::{INTERNAL_PREFIX, MetadataGroupType, MetadataRule, MetadataType, Translations};
