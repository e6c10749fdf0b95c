//! The structure graph.
//!
//! This module contains:
//! - Structure nodes and the [`DigitalDocument`] arena that owns them
//! - Metadata, person, corporate and group values
//! - Cross-tree references with deferred endpoints
//! - Content files and technical metadata
//! - Deep copies of subtrees

mod attach;
mod content;
mod copy;
mod document;
mod node;
mod reference;
mod techmd;
mod value;

pub use attach::ExclusiveAccess;
pub use content::{AreaKind, ContentFile, ContentFileArea, ContentFileReference, FileSet};
pub use document::DigitalDocument;
pub use node::{DocStruct, NodeId};
pub use reference::{Endpoint, LOGICAL_PHYSICAL, Reference};
pub use techmd::{AmdSec, Md, TECH_MD_PREFIX};
pub use value::{Authority, Corporate, Metadata, MetadataGroup, NamePart, Person, Value};
