//! Structural validation of a document.
//!
//! The checks never fail: every violation is reported as a [`Diagnostic`]
//! and also emitted as a `warn` event. All traversals use explicit stacks.

use std::fmt;

use crate::model::{DigitalDocument, DocStruct, Endpoint, LOGICAL_PHYSICAL, NodeId, Reference, Value};
use crate::prefs::Cardinality;

/// Metadata type carrying a page's physical page number.
pub const PHYS_PAGE_NUMBER: &str = "physPageNumber";
/// Metadata type carrying a page's printed page number.
pub const LOGICAL_PAGE_NUMBER: &str = "logicalPageNumber";

/// A physical page no logical node links to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct UnlinkedPage {
    pub node: NodeId,
    /// 1-based position below the physical root.
    pub position: usize,
    pub phys_page_number: Option<String>,
    pub logical_page_number: Option<String>,
}

impl fmt::Display for UnlinkedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} ({})", self.position, self.node)?;
        if let Some(n) = &self.phys_page_number {
            write!(f, ", physical number {n}")?;
        }
        if let Some(n) = &self.logical_page_number {
            write!(f, ", logical number {n}")?;
        }
        write!(f, " is not linked to the logical structure")
    }
}

/// A metadata rule a logical node does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct MissingMetadata {
    pub node: NodeId,
    pub doc_struct: String,
    pub metadata: String,
    pub cardinality: Cardinality,
    pub count: usize,
    /// A single value is present but empty.
    pub empty: bool,
}

impl fmt::Display for MissingMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.empty {
            return write!(
                f,
                "{} {}: value of '{}' is empty",
                self.doc_struct, self.node, self.metadata
            );
        }
        let expected = match self.cardinality {
            Cardinality::ExactlyOne => "exactly one value",
            Cardinality::AtMostOne => "at most one value",
            Cardinality::OneOrMore => "at least one value",
            Cardinality::ZeroOrMore => "any number of values",
        };
        write!(
            f,
            "{} {}: '{}' requires {expected}, found {}",
            self.doc_struct, self.node, self.metadata, self.count
        )
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Diagnostic {
    MissingLogicalRoot,
    UnlinkedLogicalNode { node: NodeId, doc_struct: String },
    UnlinkedPhysicalPage(UnlinkedPage),
    MissingMetadata(MissingMetadata),
}

impl Diagnostic {
    /// Short stable code for tooling.
    pub fn code(&self) -> &'static str {
        match self {
            Diagnostic::MissingLogicalRoot => "no-logical-root",
            Diagnostic::UnlinkedLogicalNode { .. } => "unlinked-logical",
            Diagnostic::UnlinkedPhysicalPage(_) => "unlinked-page",
            Diagnostic::MissingMetadata(_) => "metadata-cardinality",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingLogicalRoot => write!(f, "document has no logical structure"),
            Diagnostic::UnlinkedLogicalNode { node, doc_struct } => {
                write!(f, "{doc_struct} {node} is not linked to any page")
            }
            Diagnostic::UnlinkedPhysicalPage(page) => page.fmt(f),
            Diagnostic::MissingMetadata(missing) => missing.fmt(f),
        }
    }
}

/// The outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(code = diagnostic.code(), "{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}

/// Run every check on `doc`.
///
/// The report is valid only if the document has a logical root and no check
/// found anything.
pub fn validate(doc: &DigitalDocument) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(root) = doc.logical_root() else {
        report.push(Diagnostic::MissingLogicalRoot);
        return report;
    };

    for node in find_unlinked_logical_nodes(doc, root) {
        let doc_struct = doc
            .node(node)
            .and_then(|n| n.type_name())
            .unwrap_or_default()
            .to_string();
        report.push(Diagnostic::UnlinkedLogicalNode { node, doc_struct });
    }
    if let Some(physical) = doc.physical_root() {
        for page in find_unlinked_physical_pages(doc, physical) {
            report.push(Diagnostic::UnlinkedPhysicalPage(page));
        }
    }
    for missing in find_missing_mandatory_metadata(doc, root) {
        report.push(Diagnostic::MissingMetadata(missing));
    }

    tracing::debug!(diagnostics = report.len(), "validation finished");
    report
}

/// Whether `r` crosses between the trees: its kind is `logical_physical`,
/// or its far end lies in the tree selected by `in_other_tree`.
fn crosses_trees(
    doc: &DigitalDocument,
    r: &Reference,
    far_end: Endpoint,
    in_other_tree: fn(&DocStruct) -> bool,
) -> bool {
    r.kind == LOGICAL_PHYSICAL
        || far_end
            .node()
            .and_then(|id| doc.node(id))
            .is_some_and(in_other_tree)
}

/// Descendants of the logical root with no outgoing reference into the
/// physical tree.
///
/// The root itself stands for the whole work and is not checked. Anchor
/// types are exempt.
pub fn find_unlinked_logical_nodes(doc: &DigitalDocument, root: NodeId) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|id| {
            doc.node(*id).is_some_and(|n| {
                !n.is_anchor()
                    && !n
                        .references_to()
                        .iter()
                        .any(|r| crosses_trees(doc, r, r.target, DocStruct::is_physical))
            })
        })
        .collect()
}

/// Direct children of the physical root with no incoming reference from the
/// logical tree.
pub fn find_unlinked_physical_pages(doc: &DigitalDocument, physical_root: NodeId) -> Vec<UnlinkedPage> {
    let Some(root) = doc.node(physical_root) else {
        return Vec::new();
    };
    root.children()
        .iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let page = doc.node(*id)?;
            if page
                .references_from()
                .iter()
                .any(|r| crosses_trees(doc, r, r.source, DocStruct::is_logical))
            {
                return None;
            }
            Some(UnlinkedPage {
                node: *id,
                position: i + 1,
                phys_page_number: page.first_value(PHYS_PAGE_NUMBER).map(str::to_string),
                logical_page_number: page.first_value(LOGICAL_PAGE_NUMBER).map(str::to_string),
            })
        })
        .collect()
}

/// Metadata rules violated anywhere in the logical tree, root included.
pub fn find_missing_mandatory_metadata(doc: &DigitalDocument, root: NodeId) -> Vec<MissingMetadata> {
    let mut missing = Vec::new();
    let Ok(nodes) = doc.subtree(root) else {
        return missing;
    };

    for id in nodes {
        let Some(node) = doc.node(id) else {
            continue;
        };
        let Some(doc_type) = node.doc_type() else {
            continue;
        };
        for rule in doc_type.metadata_rules() {
            let name = rule.md_type.name.as_str();
            let count = node.count_values(name);
            let empty = rule.cardinality == Cardinality::ExactlyOne
                && count == 1
                && node.values_by_type(name).next().is_some_and(is_blank);
            if rule.cardinality.is_satisfied_by(count) && !empty {
                continue;
            }
            missing.push(MissingMetadata {
                node: id,
                doc_struct: doc_type.name.clone(),
                metadata: name.to_string(),
                cardinality: rule.cardinality,
                count,
                empty,
            });
        }
    }
    missing
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Plain(m) => m.value_str().is_empty(),
        Value::Person(p) => p.display().is_empty() && p.meta.value_str().is_empty(),
        Value::Corporate(c) => c.main_name.as_deref().unwrap_or("").is_empty() && c.meta.value_str().is_empty(),
    }
}
