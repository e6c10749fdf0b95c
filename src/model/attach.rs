//! Attaching values, groups, content files and technical metadata to nodes.
//!
//! Every attach consults the node's own structure type: the value's type
//! must be registered there, the cardinality must admit one more, and the
//! value is rewritten to carry the structure type's private copy of its
//! metadata type.

use std::ops::Deref;

use super::content::{ContentFile, ContentFileArea, ContentFileReference};
use super::document::DigitalDocument;
use super::node::NodeId;
use super::techmd::Md;
use super::value::{MetadataGroup, Value};
use crate::error::{Error, Result};
use crate::prefs::{INTERNAL_PREFIX, MetadataType};

impl DigitalDocument {
    // ------------------------------------------------------------------
    // Metadata values
    // ------------------------------------------------------------------

    /// Attach a metadata, person or corporate value to `node`.
    ///
    /// Types whose name starts with `_` are internal and skip every check.
    pub fn add_metadata(&mut self, node: NodeId, value: impl Into<Value>) -> Result<()> {
        let mut value = value.into();
        let n = self.get(node)?;
        let doc_type = n.doc_type.as_ref().ok_or(Error::NodeHasNoType)?;
        let name = value
            .type_name()
            .ok_or(Error::IncompleteValue(value.kind()))?
            .to_string();

        if name.starts_with(INTERNAL_PREFIX) {
            self.get_mut(node)?.values.push(value);
            return Ok(());
        }

        let Some(rule) = doc_type.metadata_rule(&name) else {
            tracing::warn!(doc_struct = %doc_type.name, metadata = %name, "metadata type not allowed");
            return Err(Error::MetadataTypeNotAllowed {
                doc_struct: doc_type.name.clone(),
                metadata: name,
            });
        };

        let count = n.count_values(&name);
        if !rule.cardinality.admits_another(count) {
            tracing::warn!(
                doc_struct = %doc_type.name,
                metadata = %name,
                cardinality = %rule.cardinality,
                "cardinality exceeded"
            );
            return Err(Error::CardinalityExceeded {
                doc_struct: doc_type.name.clone(),
                metadata: name,
                cardinality: rule.cardinality,
                count,
            });
        }

        if let Some(v) = value.meta().value.as_deref()
            && !rule.md_type.accepts_value(v)
        {
            return Err(Error::InvalidValue {
                metadata: name,
                value: v.to_string(),
            });
        }

        value.meta_mut().md_type = Some(rule.md_type.clone());
        self.get_mut(node)?.values.push(value);
        tracing::debug!(%node, metadata = %name, "metadata added");
        Ok(())
    }

    /// Detach the first value equal to `value`.
    ///
    /// Refuses to drop the last value of an `ExactlyOne` or `OneOrMore`
    /// type unless `force` is set. Returns `false` if nothing was removed.
    pub fn remove_metadata(&mut self, node: NodeId, value: &Value, force: bool) -> bool {
        let Some(n) = self.node(node) else {
            return false;
        };
        let Some(pos) = n.values.iter().position(|v| v == value) else {
            return false;
        };

        if !force
            && let Some(name) = value.type_name()
            && let Some(cardinality) = n.doc_type().and_then(|t| t.cardinality_of(name))
            && !cardinality.permits_removal(n.count_values(name))
        {
            tracing::warn!(%node, metadata = name, %cardinality, "refusing to remove mandatory metadata");
            return false;
        }

        if let Ok(n) = self.get_mut(node) {
            n.values.remove(pos);
        }
        true
    }

    /// Mutable access to a node's values, e.g. to edit a value in place.
    ///
    /// Count and type are not rechecked; only the content should change.
    pub fn values_mut(&mut self, node: NodeId) -> Result<&mut [Value]> {
        Ok(&mut self.get_mut(node)?.values)
    }

    /// Metadata types `node` may still take one more value of.
    pub fn possible_metadata(&self, node: NodeId) -> Vec<MetadataType> {
        let Some(n) = self.node(node) else {
            return Vec::new();
        };
        let Some(doc_type) = n.doc_type() else {
            return Vec::new();
        };
        doc_type
            .metadata_rules()
            .iter()
            .filter(|r| r.cardinality.admits_another(n.count_values(&r.md_type.name)))
            .map(|r| r.md_type.clone())
            .collect()
    }

    /// Metadata types flagged for default display on the node's type.
    pub fn default_display_metadata_types(&self, node: NodeId) -> Vec<MetadataType> {
        self.node(node)
            .and_then(|n| n.doc_type())
            .map(|t| t.default_display_metadata_types().cloned().collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Attach a metadata group, checked like a single value against the
    /// node type's group rules.
    pub fn add_metadata_group(&mut self, node: NodeId, mut group: MetadataGroup) -> Result<()> {
        let n = self.get(node)?;
        let doc_type = n.doc_type.as_ref().ok_or(Error::NodeHasNoType)?;
        let name = group
            .type_name()
            .ok_or(Error::IncompleteValue("metadata group"))?
            .to_string();

        let Some(rule) = doc_type.group_rule(&name) else {
            tracing::warn!(doc_struct = %doc_type.name, group = %name, "group type not allowed");
            return Err(Error::MetadataTypeNotAllowed {
                doc_struct: doc_type.name.clone(),
                metadata: name,
            });
        };
        let count = n.count_groups(&name);
        if !rule.cardinality.admits_another(count) {
            return Err(Error::CardinalityExceeded {
                doc_struct: doc_type.name.clone(),
                metadata: name,
                cardinality: rule.cardinality,
                count,
            });
        }

        group.group_type = Some(rule.group_type.clone());
        self.get_mut(node)?.groups.push(group);
        Ok(())
    }

    /// Detach the first group equal to `group`, with the same minimum rule
    /// as [`remove_metadata`](Self::remove_metadata).
    pub fn remove_metadata_group(&mut self, node: NodeId, group: &MetadataGroup, force: bool) -> bool {
        let Some(n) = self.node(node) else {
            return false;
        };
        let Some(pos) = n.groups.iter().position(|g| g == group) else {
            return false;
        };
        if !force
            && let Some(name) = group.type_name()
            && let Some(rule) = n.doc_type().and_then(|t| t.group_rule(name))
            && !rule.cardinality.permits_removal(n.count_groups(name))
        {
            return false;
        }
        if let Ok(n) = self.get_mut(node) {
            n.groups.remove(pos);
        }
        true
    }

    // ------------------------------------------------------------------
    // Content files
    // ------------------------------------------------------------------

    /// Add a file to the document's file set. Returns `false` on a
    /// duplicate id.
    pub fn add_content_file(&mut self, file: ContentFile) -> bool {
        self.file_set.add_file(file)
    }

    /// Remove a file from the file set and every node reference to it.
    pub fn remove_content_file(&mut self, id: &str) -> Option<ContentFile> {
        let file = self.file_set.remove_file(id)?;
        for n in self.nodes.iter_mut().flatten() {
            n.content_files.retain(|r| r.file != id);
        }
        Some(file)
    }

    /// Link `node` to a file of the file set, optionally to an area of it.
    pub fn add_content_file_reference(
        &mut self,
        node: NodeId,
        file: &str,
        area: Option<ContentFileArea>,
    ) -> Result<()> {
        if self.file_set.get(file).is_none() {
            return Err(Error::UnknownContentFile(file.to_string()));
        }
        self.get_mut(node)?.content_files.push(ContentFileReference {
            file: file.to_string(),
            area,
        });
        Ok(())
    }

    /// Drop every reference from `node` to `file`. Returns the number
    /// removed.
    pub fn remove_content_file_reference(&mut self, node: NodeId, file: &str) -> usize {
        let Ok(n) = self.get_mut(node) else {
            return 0;
        };
        let before = n.content_files.len();
        n.content_files.retain(|r| r.file != file);
        before - n.content_files.len()
    }

    // ------------------------------------------------------------------
    // Technical metadata
    // ------------------------------------------------------------------

    /// Store a record in the administrative section and return its id.
    pub fn add_tech_md(&mut self, md: Md) -> String {
        self.amd_sec.insert(md)
    }

    pub fn get_tech_md(&self, id: &str) -> Option<&Md> {
        self.amd_sec.get(id)
    }

    /// Remove a record and detach it from every node.
    pub fn remove_tech_md(&mut self, id: &str) -> Option<Md> {
        let md = self.amd_sec.remove(id)?;
        for n in self.nodes.iter_mut().flatten() {
            n.tech_md.retain(|t| t != id);
        }
        Some(md)
    }

    pub fn attach_tech_md(&mut self, node: NodeId, id: &str) -> Result<()> {
        if self.amd_sec.get(id).is_none() {
            return Err(Error::UnknownTechMd(id.to_string()));
        }
        let n = self.get_mut(node)?;
        if !n.tech_md.iter().any(|t| t == id) {
            n.tech_md.push(id.to_string());
        }
        Ok(())
    }

    pub fn detach_tech_md(&mut self, node: NodeId, id: &str) -> bool {
        let Ok(n) = self.get_mut(node) else {
            return false;
        };
        let before = n.tech_md.len();
        n.tech_md.retain(|t| t != id);
        n.tech_md.len() != before
    }

    /// Take exclusive access for operations that reorder a node's values.
    pub fn exclusive(&mut self) -> ExclusiveAccess<'_> {
        tracing::debug!("exclusive access acquired");
        ExclusiveAccess { doc: self }
    }
}

/// Scoped exclusive access to a document. Released on drop.
pub struct ExclusiveAccess<'a> {
    doc: &'a mut DigitalDocument,
}

impl ExclusiveAccess<'_> {
    /// Reorder the values of `node` by metadata type, following `order`.
    ///
    /// The sort is stable; values whose type is not named in `order` keep
    /// their relative order after all named ones.
    pub fn sort_metadata(&mut self, node: NodeId, order: &[&str]) -> Result<()> {
        let n = self.doc.get_mut(node)?;
        n.values.sort_by_key(|v| {
            v.type_name()
                .and_then(|name| order.iter().position(|o| *o == name))
                .unwrap_or(order.len())
        });
        Ok(())
    }
}

impl Deref for ExclusiveAccess<'_> {
    type Target = DigitalDocument;

    fn deref(&self) -> &DigitalDocument {
        self.doc
    }
}

impl Drop for ExclusiveAccess<'_> {
    fn drop(&mut self) {
        tracing::debug!("exclusive access released");
    }
}
