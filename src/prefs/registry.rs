//! The type registry handed to every structure operation.

use std::path::Path;
use std::sync::Arc;

use super::parser::parse_prefs;
use super::struct_type::DocStructType;
use super::types::{MetadataGroupType, MetadataType};
use super::Cardinality;
use crate::error::{Error, Result};
use crate::util::{decode_text, declared_encoding};

/// A loaded ruleset: every structure, metadata and group type a document may
/// use.
///
/// There is no global registry. Load one per ruleset and pass it to the
/// codec; nodes keep an [`Arc`] to their own [`DocStructType`].
#[derive(Debug, Clone, Default)]
pub struct Prefs {
    doc_struct_types: Vec<Arc<DocStructType>>,
    metadata_types: Vec<MetadataType>,
    group_types: Vec<MetadataGroupType>,
}

impl Prefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ruleset file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Preferences(format!("cannot read ruleset {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "loading ruleset");
        Self::from_bytes(&bytes)
    }

    /// Parse a ruleset from raw bytes, detecting the text encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode_text(bytes, declared_encoding(bytes));
        Self::from_xml(&text)
    }

    /// Parse a ruleset from an XML string.
    pub fn from_xml(xml: &str) -> Result<Self> {
        parse_prefs(xml)
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a structure type. Returns `false` if the name is taken.
    pub fn add_doc_struct_type(&mut self, doc_type: DocStructType) -> bool {
        if self.doc_struct_type(&doc_type.name).is_some() {
            return false;
        }
        self.doc_struct_types.push(Arc::new(doc_type));
        true
    }

    pub fn add_metadata_type(&mut self, md_type: MetadataType) -> bool {
        if self.metadata_type(&md_type.name).is_some() {
            return false;
        }
        self.metadata_types.push(md_type);
        true
    }

    pub fn add_group_type(&mut self, group_type: MetadataGroupType) -> bool {
        if self.group_type(&group_type.name).is_some() {
            return false;
        }
        self.group_types.push(group_type);
        true
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn doc_struct_type(&self, name: &str) -> Option<Arc<DocStructType>> {
        self.doc_struct_types
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }

    pub fn doc_struct_types(&self) -> impl Iterator<Item = &Arc<DocStructType>> {
        self.doc_struct_types.iter()
    }

    pub fn metadata_type(&self, name: &str) -> Option<&MetadataType> {
        self.metadata_types.iter().find(|t| t.name == name)
    }

    pub fn metadata_types(&self) -> &[MetadataType] {
        &self.metadata_types
    }

    pub fn group_type(&self, name: &str) -> Option<&MetadataGroupType> {
        self.group_types.iter().find(|t| t.name == name)
    }

    pub fn group_types(&self) -> &[MetadataGroupType] {
        &self.group_types
    }

    pub fn anchor_types(&self) -> impl Iterator<Item = &Arc<DocStructType>> {
        self.doc_struct_types.iter().filter(|t| t.is_anchor)
    }

    pub fn topmost_types(&self) -> impl Iterator<Item = &Arc<DocStructType>> {
        self.doc_struct_types.iter().filter(|t| t.is_topmost)
    }

    // ------------------------------------------------------------------
    // Permission queries
    //
    // Unknown names answer "not allowed"; callers must not read that as an
    // internal error.
    // ------------------------------------------------------------------

    /// Whether `child` may be placed below a node of type `parent`.
    pub fn resolve_child(&self, parent: &str, child: &str) -> bool {
        self.doc_struct_type(child).is_some()
            && self
                .doc_struct_type(parent)
                .is_some_and(|t| t.allows_child(child))
    }

    /// Cardinality of `value_type` on `owner`; `None` if not allowed.
    pub fn allowed_cardinality(&self, owner: &str, value_type: &str) -> Option<Cardinality> {
        self.doc_struct_type(owner)?.cardinality_of(value_type)
    }

    /// The owner's private copy of a metadata type.
    pub fn local_copy(&self, owner: &str, value_type: &str) -> Option<MetadataType> {
        self.doc_struct_type(owner)?.local_copy(value_type)
    }
}
