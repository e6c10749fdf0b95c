//! Directed cross-tree references.
//!
//! A reference is stored twice: on the source's outgoing list and on the
//! target's incoming list. Every operation here keeps both copies in step.
//! An end that is not yet resident (a page stored in another file, say) is
//! kept as a deferred numeric id until [`DigitalDocument::resolve_deferred`]
//! binds it to a node.

use std::fmt;

use super::document::DigitalDocument;
use super::node::NodeId;
use crate::error::Result;

/// Reference kind used between the logical and the physical tree.
pub const LOGICAL_PHYSICAL: &str = "logical_physical";

/// One end of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Node(NodeId),
    Deferred(u64),
}

impl Endpoint {
    /// The node, if this end is resident.
    pub fn node(self) -> Option<NodeId> {
        match self {
            Endpoint::Node(id) => Some(id),
            Endpoint::Deferred(_) => None,
        }
    }

    pub fn is_deferred(self) -> bool {
        matches!(self, Endpoint::Deferred(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Node(id) => write!(f, "{id}"),
            Endpoint::Deferred(id) => write!(f, "deferred:{id}"),
        }
    }
}

/// A directed, typed link between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub source: Endpoint,
    pub target: Endpoint,
    pub kind: String,
}

impl Reference {
    pub fn new(source: Endpoint, target: Endpoint, kind: impl Into<String>) -> Self {
        Self {
            source,
            target,
            kind: kind.into(),
        }
    }
}

impl DigitalDocument {
    /// Link `source` to `target`. The edge is recorded on both nodes.
    pub fn add_reference(
        &mut self,
        source: NodeId,
        target: NodeId,
        kind: impl Into<String>,
    ) -> Result<Reference> {
        self.get(target)?;
        let reference = Reference::new(Endpoint::Node(source), Endpoint::Node(target), kind);
        self.get_mut(source)?.to.push(reference.clone());
        self.get_mut(target)?.from.push(reference.clone());
        tracing::debug!(%source, %target, kind = %reference.kind, "reference added");
        Ok(reference)
    }

    /// Link `source` to a target that is not resident yet.
    pub fn add_deferred_reference(
        &mut self,
        source: NodeId,
        target: u64,
        kind: impl Into<String>,
    ) -> Result<Reference> {
        let reference = Reference::new(Endpoint::Node(source), Endpoint::Deferred(target), kind);
        self.get_mut(source)?.to.push(reference.clone());
        Ok(reference)
    }

    /// Record an incoming link on `target` from a source that is not
    /// resident yet.
    pub fn add_deferred_reference_from(
        &mut self,
        target: NodeId,
        source: u64,
        kind: impl Into<String>,
    ) -> Result<Reference> {
        let reference = Reference::new(Endpoint::Deferred(source), Endpoint::Node(target), kind);
        self.get_mut(target)?.from.push(reference.clone());
        Ok(reference)
    }

    /// Bind every deferred end with id `deferred` to `node`, adding the
    /// missing half of each edge on `node`. Returns the number of edges
    /// completed.
    pub fn resolve_deferred(&mut self, deferred: u64, node: NodeId) -> Result<usize> {
        self.get(node)?;
        let pending = Endpoint::Deferred(deferred);
        let resident = Endpoint::Node(node);
        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();

        for slot in self.nodes.iter_mut().flatten() {
            for r in slot.to.iter_mut().filter(|r| r.target == pending) {
                r.target = resident;
                incoming.push(r.clone());
            }
            for r in slot.from.iter_mut().filter(|r| r.source == pending) {
                r.source = resident;
                outgoing.push(r.clone());
            }
        }

        let completed = incoming.len() + outgoing.len();
        let n = self.get_mut(node)?;
        n.from.extend(incoming);
        n.to.extend(outgoing);
        tracing::debug!(deferred, %node, completed, "deferred references resolved");
        Ok(completed)
    }

    /// Remove every edge from `node` to `target`, at both ends. Returns the
    /// number of edges removed.
    pub fn remove_reference_to(&mut self, node: NodeId, target: NodeId) -> usize {
        let target_end = Endpoint::Node(target);
        let source_end = Endpoint::Node(node);
        let removed = match self.get_mut(node) {
            Ok(n) => {
                let before = n.to.len();
                n.to.retain(|r| r.target != target_end);
                before - n.to.len()
            }
            Err(_) => return 0,
        };
        if let Ok(t) = self.get_mut(target) {
            t.from.retain(|r| r.source != source_end);
        }
        removed
    }

    /// Remove every edge from `source` to `node`, at both ends. Returns the
    /// number of edges removed.
    pub fn remove_reference_from(&mut self, node: NodeId, source: NodeId) -> usize {
        let source_end = Endpoint::Node(source);
        let target_end = Endpoint::Node(node);
        let removed = match self.get_mut(node) {
            Ok(n) => {
                let before = n.from.len();
                n.from.retain(|r| r.source != source_end);
                before - n.from.len()
            }
            Err(_) => return 0,
        };
        if let Ok(s) = self.get_mut(source) {
            s.to.retain(|r| r.target != target_end);
        }
        removed
    }

    /// Drop every edge touching `id`, including the opposite halves.
    pub(crate) fn unlink_all_references(&mut self, id: NodeId) {
        let Ok(n) = self.get_mut(id) else {
            return;
        };
        let to = std::mem::take(&mut n.to);
        let from = std::mem::take(&mut n.from);
        let this = Endpoint::Node(id);

        for target in to.iter().filter_map(|r| r.target.node()) {
            if let Ok(t) = self.get_mut(target) {
                t.from.retain(|r| r.source != this);
            }
        }
        for source in from.iter().filter_map(|r| r.source.node()) {
            if let Ok(s) = self.get_mut(source) {
                s.to.retain(|r| r.target != this);
            }
        }
    }

    /// Whether `source` has an outgoing edge to `target`.
    pub fn is_linked(&self, source: NodeId, target: NodeId) -> bool {
        self.node(source)
            .is_some_and(|n| n.has_reference_to(Endpoint::Node(target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::tests::{node, prefs};

    #[test]
    fn test_references_are_symmetric() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let ch = node(&mut doc, &prefs, "Chapter");
        let page = node(&mut doc, &prefs, "Page");

        let r = doc.add_reference(ch, page, LOGICAL_PHYSICAL).unwrap();
        assert_eq!(r.source, Endpoint::Node(ch));
        assert_eq!(doc.node(ch).unwrap().references_to(), &[r.clone()]);
        assert_eq!(doc.node(page).unwrap().references_from(), &[r]);
        assert!(doc.is_linked(ch, page));
        assert!(!doc.is_linked(page, ch));
    }

    #[test]
    fn test_remove_reference_removes_all_matches() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let ch = node(&mut doc, &prefs, "Chapter");
        let page = node(&mut doc, &prefs, "Page");
        let other = node(&mut doc, &prefs, "Page");
        doc.add_reference(ch, page, LOGICAL_PHYSICAL).unwrap();
        doc.add_reference(ch, page, "other").unwrap();
        doc.add_reference(ch, other, LOGICAL_PHYSICAL).unwrap();

        assert_eq!(doc.remove_reference_to(ch, page), 2);
        assert!(doc.node(page).unwrap().references_from().is_empty());
        assert_eq!(doc.node(ch).unwrap().references_to().len(), 1);

        assert_eq!(doc.remove_reference_from(other, ch), 1);
        assert!(doc.node(ch).unwrap().references_to().is_empty());
        assert_eq!(doc.remove_reference_from(other, ch), 0);
    }

    #[test]
    fn test_deferred_resolution() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let ch = node(&mut doc, &prefs, "Chapter");
        let page = node(&mut doc, &prefs, "Page");

        doc.add_deferred_reference(ch, 42, LOGICAL_PHYSICAL).unwrap();
        assert_eq!(doc.node(ch).unwrap().reference_targets().count(), 0);

        assert_eq!(doc.resolve_deferred(42, page).unwrap(), 1);
        assert!(doc.is_linked(ch, page));
        assert_eq!(doc.node(page).unwrap().reference_sources().collect::<Vec<_>>(), vec![ch]);
        assert_eq!(doc.resolve_deferred(42, page).unwrap(), 0);
    }

    #[test]
    fn test_deferred_source_resolution() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let ch = node(&mut doc, &prefs, "Chapter");
        let page = node(&mut doc, &prefs, "Page");

        doc.add_deferred_reference_from(page, 7, LOGICAL_PHYSICAL).unwrap();
        assert_eq!(doc.resolve_deferred(7, ch).unwrap(), 1);
        assert!(doc.is_linked(ch, page));
    }

    #[test]
    fn test_delete_drops_edges_at_both_ends() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let ch = node(&mut doc, &prefs, "Chapter");
        let page = node(&mut doc, &prefs, "Page");
        doc.add_reference(ch, page, LOGICAL_PHYSICAL).unwrap();
        doc.add_reference(page, ch, "back").unwrap();

        assert!(doc.delete(page));
        let n = doc.node(ch).unwrap();
        assert!(n.references_to().is_empty());
        assert!(n.references_from().is_empty());
    }
}
