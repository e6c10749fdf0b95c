//! Structure nodes.

use std::fmt;
use std::sync::Arc;

use super::content::ContentFileReference;
use super::reference::{Endpoint, Reference};
use super::value::{Corporate, Metadata, MetadataGroup, Person, Value};
use crate::prefs::DocStructType;

/// Identifier of a node within a [`DigitalDocument`](super::DigitalDocument).
///
/// Ids are stable for the lifetime of the node; a deleted node's id is never
/// handed out again by the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(transparent))]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One structural unit: a chapter, an article, a page.
///
/// Links to other nodes are [`NodeId`]s resolved through the owning
/// document; all mutation goes through the document so that both ends of
/// every link stay consistent.
#[derive(Debug, Clone, Default)]
pub struct DocStruct {
    pub(crate) doc_type: Option<Arc<DocStructType>>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) values: Vec<Value>,
    pub(crate) groups: Vec<MetadataGroup>,
    pub(crate) content_files: Vec<ContentFileReference>,
    pub(crate) to: Vec<Reference>,
    pub(crate) from: Vec<Reference>,
    pub(crate) is_logical: bool,
    pub(crate) is_physical: bool,
    pub(crate) tech_md: Vec<String>,
    /// Identifier of the parent document when this node lives below an
    /// anchor stored elsewhere.
    pub reference_to_anchor: Option<String>,
    /// Codec-level identifier (e.g. an XML id). Not interpreted here.
    pub identifier: Option<String>,
}

impl DocStruct {
    pub(crate) fn new(doc_type: Option<Arc<DocStructType>>) -> Self {
        Self {
            doc_type,
            ..Default::default()
        }
    }

    pub fn doc_type(&self) -> Option<&Arc<DocStructType>> {
        self.doc_type.as_ref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.doc_type.as_deref().map(|t| t.name.as_str())
    }

    pub fn is_anchor(&self) -> bool {
        self.doc_type.as_deref().is_some_and(|t| t.is_anchor)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_logical(&self) -> bool {
        self.is_logical
    }

    pub fn is_physical(&self) -> bool {
        self.is_physical
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    /// All attached values in attachment order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Plain metadata values.
    pub fn metadata(&self) -> impl Iterator<Item = &Metadata> {
        self.values.iter().filter_map(Value::as_plain)
    }

    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.values.iter().filter_map(Value::as_person)
    }

    pub fn corporates(&self) -> impl Iterator<Item = &Corporate> {
        self.values.iter().filter_map(Value::as_corporate)
    }

    pub fn values_by_type<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Value> + use<'a, 'n> {
        self.values
            .iter()
            .filter(move |v| v.type_name() == Some(name))
    }

    pub fn metadata_by_type<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Metadata> + use<'a, 'n> {
        self.values_by_type(name).filter_map(Value::as_plain)
    }

    pub fn persons_by_type<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Person> + use<'a, 'n> {
        self.values_by_type(name).filter_map(Value::as_person)
    }

    /// The first plain value of a type, as a string.
    pub fn first_value<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.metadata_by_type(name).find_map(|m| m.value.as_deref())
    }

    /// Number of attached values of a type, across all value variants.
    pub fn count_values(&self, name: &str) -> usize {
        self.values_by_type(name).count()
    }

    pub fn groups(&self) -> &[MetadataGroup] {
        &self.groups
    }

    pub fn count_groups(&self, name: &str) -> usize {
        self.groups
            .iter()
            .filter(|g| g.type_name() == Some(name))
            .count()
    }

    // ------------------------------------------------------------------
    // Files and links
    // ------------------------------------------------------------------

    pub fn content_files(&self) -> &[ContentFileReference] {
        &self.content_files
    }

    /// Outgoing references.
    pub fn references_to(&self) -> &[Reference] {
        &self.to
    }

    /// Incoming references.
    pub fn references_from(&self) -> &[Reference] {
        &self.from
    }

    /// Live targets of outgoing references.
    pub fn reference_targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.to.iter().filter_map(|r| r.target.node())
    }

    /// Live sources of incoming references.
    pub fn reference_sources(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.from.iter().filter_map(|r| r.source.node())
    }

    pub(crate) fn has_reference_to(&self, target: Endpoint) -> bool {
        self.to.iter().any(|r| r.target == target)
    }

    /// Ids of attached technical metadata records.
    pub fn tech_md_ids(&self) -> &[String] {
        &self.tech_md
    }
}
