//! Structure types: what a node is, what it may contain, and which metadata
//! it may carry.

use super::types::{MetadataGroupType, MetadataRule, MetadataType, Translations};
use super::Cardinality;

/// A metadata group type registered on a structure type.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRule {
    /// The structure type's private copy of the group type.
    pub group_type: MetadataGroupType,
    pub cardinality: Cardinality,
}

/// A structure type such as `Monograph`, `Chapter` or `Page`.
///
/// Metadata and group types are copied in on registration, so editing the
/// shared prototype afterwards never changes an already registered type.
#[derive(Debug, Clone, Default)]
pub struct DocStructType {
    pub name: String,
    /// Represents an external parent document (e.g. a periodical).
    pub is_anchor: bool,
    pub has_file_set: bool,
    /// May be the top of a logical tree.
    pub is_topmost: bool,
    pub names: Translations,
    allowed_children: Vec<String>,
    metadata: Vec<MetadataRule>,
    groups: Vec<GroupRule>,
}

impl DocStructType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, language: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.set(language, name);
        self
    }

    pub fn display_name(&self, language: &str) -> &str {
        self.names.get(language).unwrap_or(&self.name)
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    /// Allow nodes of type `name` below this type. Returns `false` if
    /// already allowed.
    pub fn add_allowed_child(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.allows_child(&name) {
            return false;
        }
        self.allowed_children.push(name);
        true
    }

    pub fn remove_allowed_child(&mut self, name: &str) -> bool {
        let before = self.allowed_children.len();
        self.allowed_children.retain(|c| c != name);
        self.allowed_children.len() != before
    }

    pub fn allowed_children(&self) -> &[String] {
        &self.allowed_children
    }

    pub fn allows_child(&self, name: &str) -> bool {
        self.allowed_children.iter().any(|c| c == name)
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Register a metadata type with the given cardinality.
    ///
    /// Returns `false` if a type with that name is already registered.
    pub fn add_metadata_type(
        &mut self,
        md_type: &MetadataType,
        cardinality: Cardinality,
        default_display: bool,
    ) -> bool {
        if self.metadata_rule(&md_type.name).is_some() {
            return false;
        }
        self.metadata.push(MetadataRule {
            md_type: md_type.clone(),
            cardinality,
            default_display,
        });
        true
    }

    pub fn remove_metadata_type(&mut self, name: &str) -> bool {
        let before = self.metadata.len();
        self.metadata.retain(|r| r.md_type.name != name);
        self.metadata.len() != before
    }

    pub fn metadata_rules(&self) -> &[MetadataRule] {
        &self.metadata
    }

    pub fn metadata_rule(&self, name: &str) -> Option<&MetadataRule> {
        self.metadata.iter().find(|r| r.md_type.name == name)
    }

    pub fn metadata_rule_mut(&mut self, name: &str) -> Option<&mut MetadataRule> {
        self.metadata.iter_mut().find(|r| r.md_type.name == name)
    }

    /// Cardinality for a metadata type on this structure type; `None` means
    /// the type is not allowed here.
    pub fn cardinality_of(&self, name: &str) -> Option<Cardinality> {
        self.metadata_rule(name).map(|r| r.cardinality)
    }

    /// A copy of this structure type's own version of a metadata type.
    pub fn local_copy(&self, name: &str) -> Option<MetadataType> {
        self.metadata_rule(name).map(|r| r.md_type.clone())
    }

    pub fn default_display_metadata_types(&self) -> impl Iterator<Item = &MetadataType> {
        self.metadata
            .iter()
            .filter(|r| r.default_display)
            .map(|r| &r.md_type)
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub fn add_group_type(&mut self, group_type: &MetadataGroupType, cardinality: Cardinality) -> bool {
        if self.group_rule(&group_type.name).is_some() {
            return false;
        }
        self.groups.push(GroupRule {
            group_type: group_type.clone(),
            cardinality,
        });
        true
    }

    pub fn remove_group_type(&mut self, name: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|r| r.group_type.name != name);
        self.groups.len() != before
    }

    pub fn group_rules(&self) -> &[GroupRule] {
        &self.groups
    }

    pub fn group_rule(&self, name: &str) -> Option<&GroupRule> {
        self.groups.iter().find(|r| r.group_type.name == name)
    }
}

impl PartialEq for DocStructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DocStructType {}
