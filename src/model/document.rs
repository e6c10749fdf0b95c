//! The structure graph: an arena of [`DocStruct`] nodes with a logical and a
//! physical root.

use std::sync::Arc;

use super::content::FileSet;
use super::node::{DocStruct, NodeId};
use super::techmd::AmdSec;
use crate::error::{Error, Result};
use crate::prefs::DocStructType;

/// A digitized work: the logical tree, the physical tree, the reference
/// graph between them, content files and technical metadata.
///
/// All nodes live in one arena and address each other by [`NodeId`]. Nodes
/// are created detached; they join a tree through [`add_child`] or by
/// becoming a root.
///
/// [`add_child`]: DigitalDocument::add_child
#[derive(Debug, Clone, Default)]
pub struct DigitalDocument {
    pub(crate) nodes: Vec<Option<DocStruct>>,
    pub(crate) logical: Option<NodeId>,
    pub(crate) physical: Option<NodeId>,
    pub(crate) file_set: FileSet,
    pub(crate) amd_sec: AmdSec,
}

impl DigitalDocument {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------

    /// Create a detached node of the given type.
    pub fn create(&mut self, doc_type: Arc<DocStructType>) -> NodeId {
        self.alloc(DocStruct::new(Some(doc_type)))
    }

    /// Create a detached node without a type. It cannot join a tree or take
    /// metadata until it has one.
    pub fn create_untyped(&mut self) -> NodeId {
        self.alloc(DocStruct::new(None))
    }

    pub(crate) fn alloc(&mut self, node: DocStruct) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&DocStruct> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&DocStruct> {
        self.node(id).ok_or(Error::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut DocStruct> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownNode(id))
    }

    /// Ids of all live nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Give an untyped node its type. Fails if the node already has one.
    pub fn set_type(&mut self, id: NodeId, doc_type: Arc<DocStructType>) -> Result<()> {
        let node = self.get_mut(id)?;
        if let Some(existing) = &node.doc_type {
            return Err(Error::TypeNotAllowed {
                parent: existing.name.clone(),
                child: doc_type.name.clone(),
            });
        }
        node.doc_type = Some(doc_type);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------

    pub fn logical_root(&self) -> Option<NodeId> {
        self.logical
    }

    pub fn physical_root(&self) -> Option<NodeId> {
        self.physical
    }

    /// Make `id` the root of the logical tree and mark its subtree logical.
    pub fn set_logical_root(&mut self, id: NodeId) -> Result<()> {
        if self.get(id)?.doc_type.is_none() {
            return Err(Error::NodeHasNoType);
        }
        self.logical = Some(id);
        self.set_logical(id, true)
    }

    /// Make `id` the root of the physical tree and mark its subtree physical.
    pub fn set_physical_root(&mut self, id: NodeId) -> Result<()> {
        if self.get(id)?.doc_type.is_none() {
            return Err(Error::NodeHasNoType);
        }
        self.physical = Some(id);
        self.set_physical(id, true)
    }

    pub fn file_set(&self) -> &FileSet {
        &self.file_set
    }

    pub fn amd_sec(&self) -> &AmdSec {
        &self.amd_sec
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    /// Set `is_logical` on `id` and every descendant.
    pub fn set_logical(&mut self, id: NodeId, logical: bool) -> Result<()> {
        for n in self.subtree(id)? {
            self.get_mut(n)?.is_logical = logical;
        }
        Ok(())
    }

    /// Set `is_physical` on `id` and every descendant.
    pub fn set_physical(&mut self, id: NodeId, physical: bool) -> Result<()> {
        for n in self.subtree(id)? {
            self.get_mut(n)?.is_physical = physical;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    /// Append `child` below `parent`.
    ///
    /// The child's type must be an allowed child type of the parent's type.
    /// A child that already has a parent is moved. The parent's logical and
    /// physical flags are copied onto the child's whole subtree.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_child(parent, child)?;
        self.attach(parent, child, None)
    }

    /// Insert `child` below `parent` at `index` (clamped to the child count).
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        self.check_child(parent, child)?;
        self.attach(parent, child, Some(index))
    }

    fn check_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_type = self.get(parent)?.doc_type.as_ref().ok_or(Error::NodeHasNoType)?;
        let child_type = self.get(child)?.doc_type.as_ref().ok_or(Error::NodeHasNoType)?;

        if !parent_type.allows_child(&child_type.name) {
            tracing::warn!(
                parent = %parent_type.name,
                child = %child_type.name,
                "child type not allowed"
            );
            return Err(Error::TypeNotAllowed {
                parent: parent_type.name.clone(),
                child: child_type.name.clone(),
            });
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(Error::CyclicStructure { parent, child });
        }
        Ok(())
    }

    /// Link without type checks. Callers have validated the pair.
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> Result<()> {
        if let Some(old) = self.get(child)?.parent {
            self.get_mut(old)?.children.retain(|c| *c != child);
        }

        let parent_node = self.get_mut(parent)?;
        let (logical, physical) = (parent_node.is_logical, parent_node.is_physical);
        let at = index.unwrap_or(parent_node.children.len()).min(parent_node.children.len());
        parent_node.children.insert(at, child);

        self.get_mut(child)?.parent = Some(parent);
        for n in self.subtree(child)? {
            let node = self.get_mut(n)?;
            node.is_logical = logical;
            node.is_physical = physical;
        }
        tracing::debug!(%parent, %child, index = at, "child attached");
        Ok(())
    }

    /// Detach `child` from `parent`. Its subtree loses the logical and
    /// physical flags. Returns `false` if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let is_child = self.node(parent).is_some_and(|p| p.children.contains(&child));
        if !is_child {
            return false;
        }
        if let Ok(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Ok(c) = self.get_mut(child) {
            c.parent = None;
        }
        if let Ok(ids) = self.subtree(child) {
            for n in ids {
                if let Ok(node) = self.get_mut(n) {
                    node.is_logical = false;
                    node.is_physical = false;
                }
            }
        }
        tracing::debug!(%parent, %child, "child removed");
        true
    }

    /// Move `child` to `new_index` among its siblings, clamping the index.
    /// Returns `false` if `child` is not a child of `parent`.
    pub fn move_child(&mut self, parent: NodeId, child: NodeId, new_index: usize) -> bool {
        let Ok(p) = self.get_mut(parent) else {
            return false;
        };
        let Some(pos) = p.children.iter().position(|c| *c == child) else {
            return false;
        };
        p.children.remove(pos);
        let at = new_index.min(p.children.len());
        p.children.insert(at, child);
        true
    }

    /// Delete a node and its subtree.
    ///
    /// The node is detached from its parent, every reference into or out of
    /// the subtree is removed at both ends, and the arena slots are freed.
    /// Returns `false` if the node does not exist.
    pub fn delete(&mut self, id: NodeId) -> bool {
        let Ok(ids) = self.subtree(id) else {
            return false;
        };
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            self.remove_child(parent, id);
        }
        for &n in &ids {
            self.unlink_all_references(n);
        }
        for &n in &ids {
            if let Some(slot) = self.nodes.get_mut(n.0 as usize) {
                *slot = None;
            }
        }
        if self.logical.is_some_and(|r| ids.contains(&r)) {
            self.logical = None;
        }
        if self.physical.is_some_and(|r| ids.contains(&r)) {
            self.physical = None;
        }
        tracing::debug!(node = %id, removed = ids.len(), "subtree deleted");
        true
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// `id` and all its descendants in depth-first pre-order.
    ///
    /// Iterative, so arbitrarily deep trees do not exhaust the stack.
    pub fn subtree(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.get(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            if let Some(node) = self.node(n) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// All descendants of `id` in depth-first pre-order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree(id)
            .map(|mut v| {
                v.remove(0);
                v
            })
            .unwrap_or_default()
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(p) = current {
            out.push(p);
            current = self.node(p).and_then(|n| n.parent);
        }
        out
    }

    /// Whether `ancestor` lies on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.node(p).and_then(|n| n.parent);
        }
        false
    }

    /// Position of `id` among its siblings.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.node(id)?.parent?;
        self.node(parent)?.children.iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        let i = self.index_in_parent(id)?;
        self.node(parent)?.children.get(i + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        let i = self.index_in_parent(id)?.checked_sub(1)?;
        self.node(parent)?.children.get(i).copied()
    }

    /// Direct children of `id` whose type is `type_name`.
    pub fn children_by_type(&self, id: NodeId, type_name: &str) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        node.children
            .iter()
            .copied()
            .filter(|c| self.node(*c).and_then(DocStruct::type_name) == Some(type_name))
            .collect()
    }

    /// The first direct child of `id` whose type is a topmost type.
    pub fn topmost_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.children.iter().copied().find(|c| {
            self.node(*c)
                .and_then(DocStruct::doc_type)
                .is_some_and(|t| t.is_topmost)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::prefs::Prefs;

    /// Monograph > Chapter > Chapter, plus BoundBook > Page.
    pub(crate) fn prefs() -> Prefs {
        let mut monograph = DocStructType::new("Monograph");
        monograph.is_topmost = true;
        monograph.add_allowed_child("Chapter");
        let mut chapter = DocStructType::new("Chapter");
        chapter.add_allowed_child("Chapter");
        let mut book = DocStructType::new("BoundBook");
        book.add_allowed_child("Page");
        let mut periodical = DocStructType::new("Periodical");
        periodical.is_anchor = true;
        periodical.add_allowed_child("Monograph");

        let mut prefs = Prefs::new();
        prefs.add_doc_struct_type(monograph);
        prefs.add_doc_struct_type(chapter);
        prefs.add_doc_struct_type(book);
        prefs.add_doc_struct_type(DocStructType::new("Page"));
        prefs.add_doc_struct_type(periodical);
        prefs
    }

    pub(crate) fn node(doc: &mut DigitalDocument, prefs: &Prefs, t: &str) -> NodeId {
        doc.create(prefs.doc_struct_type(t).unwrap())
    }

    #[test]
    fn test_add_child_checks_type() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let ch = node(&mut doc, &prefs, "Chapter");
        let page = node(&mut doc, &prefs, "Page");

        doc.add_child(mono, ch).unwrap();
        assert_eq!(doc.node(mono).unwrap().children(), &[ch]);
        assert_eq!(doc.node(ch).unwrap().parent(), Some(mono));

        let err = doc.add_child(mono, page).unwrap_err();
        assert!(matches!(err, Error::TypeNotAllowed { .. }));
        assert!(doc.node(page).unwrap().parent().is_none());
    }

    #[test]
    fn test_untyped_nodes_cannot_join() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let bare = doc.create_untyped();
        assert!(matches!(doc.add_child(mono, bare), Err(Error::NodeHasNoType)));
        assert!(matches!(doc.set_logical_root(bare), Err(Error::NodeHasNoType)));

        doc.set_type(bare, prefs.doc_struct_type("Chapter").unwrap()).unwrap();
        doc.add_child(mono, bare).unwrap();
        assert!(doc.set_type(bare, prefs.doc_struct_type("Page").unwrap()).is_err());
    }

    #[test]
    fn test_reparenting_moves_child() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let a = node(&mut doc, &prefs, "Chapter");
        let b = node(&mut doc, &prefs, "Chapter");
        doc.add_child(mono, a).unwrap();
        doc.add_child(mono, b).unwrap();
        doc.add_child(a, b).unwrap();
        assert_eq!(doc.node(mono).unwrap().children(), &[a]);
        assert_eq!(doc.node(a).unwrap().children(), &[b]);
        assert_eq!(doc.node(b).unwrap().parent(), Some(a));
    }

    #[test]
    fn test_cycles_rejected() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let a = node(&mut doc, &prefs, "Chapter");
        let b = node(&mut doc, &prefs, "Chapter");
        doc.add_child(a, b).unwrap();
        assert!(matches!(doc.add_child(b, a), Err(Error::CyclicStructure { .. })));
        assert!(matches!(doc.add_child(a, a), Err(Error::CyclicStructure { .. })));
    }

    #[test]
    fn test_flags_propagate_through_deep_subtree() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let mut chain = vec![node(&mut doc, &prefs, "Chapter")];
        for _ in 0..4 {
            let next = node(&mut doc, &prefs, "Chapter");
            doc.add_child(*chain.last().unwrap(), next).unwrap();
            chain.push(next);
        }
        doc.add_child(mono, chain[0]).unwrap();
        assert!(chain.iter().all(|c| !doc.node(*c).unwrap().is_logical()));

        doc.set_logical_root(mono).unwrap();
        assert!(chain.iter().all(|c| doc.node(*c).unwrap().is_logical()));
        assert!(chain.iter().all(|c| !doc.node(*c).unwrap().is_physical()));

        // New children inherit the flag from their parent.
        let late = node(&mut doc, &prefs, "Chapter");
        doc.add_child(chain[4], late).unwrap();
        assert!(doc.node(late).unwrap().is_logical());
    }

    #[test]
    fn test_remove_child_clears_flags() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let a = node(&mut doc, &prefs, "Chapter");
        let b = node(&mut doc, &prefs, "Chapter");
        doc.set_logical_root(mono).unwrap();
        doc.add_child(mono, a).unwrap();
        doc.add_child(a, b).unwrap();

        assert!(!doc.remove_child(mono, b));
        assert!(doc.remove_child(mono, a));
        assert!(doc.node(a).unwrap().parent().is_none());
        assert!(!doc.node(a).unwrap().is_logical());
        assert!(!doc.node(b).unwrap().is_logical());
        assert!(!doc.remove_child(mono, a));
    }

    #[test]
    fn test_move_child_clamps() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let ids: Vec<_> = (0..3).map(|_| node(&mut doc, &prefs, "Chapter")).collect();
        for id in &ids {
            doc.add_child(mono, *id).unwrap();
        }
        assert!(doc.move_child(mono, ids[0], 99));
        assert_eq!(doc.node(mono).unwrap().children(), &[ids[1], ids[2], ids[0]]);
        assert!(doc.move_child(mono, ids[0], 0));
        assert_eq!(doc.node(mono).unwrap().children(), &[ids[0], ids[1], ids[2]]);

        let stranger = node(&mut doc, &prefs, "Chapter");
        assert!(!doc.move_child(mono, stranger, 0));
    }

    #[test]
    fn test_insert_child_at_index() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let a = node(&mut doc, &prefs, "Chapter");
        let b = node(&mut doc, &prefs, "Chapter");
        doc.add_child(mono, a).unwrap();
        doc.insert_child(mono, b, 0).unwrap();
        assert_eq!(doc.node(mono).unwrap().children(), &[b, a]);
        assert_eq!(doc.next_sibling(b), Some(a));
        assert_eq!(doc.prev_sibling(a), Some(b));
        assert_eq!(doc.prev_sibling(b), None);
    }

    #[test]
    fn test_traversal_helpers() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let periodical = node(&mut doc, &prefs, "Periodical");
        let mono = node(&mut doc, &prefs, "Monograph");
        let a = node(&mut doc, &prefs, "Chapter");
        let b = node(&mut doc, &prefs, "Chapter");
        doc.add_child(periodical, mono).unwrap();
        doc.add_child(mono, a).unwrap();
        doc.add_child(a, b).unwrap();

        assert_eq!(doc.descendants(periodical), vec![mono, a, b]);
        assert_eq!(doc.ancestors(b), vec![a, mono, periodical]);
        assert!(doc.is_ancestor(periodical, b));
        assert!(!doc.is_ancestor(b, periodical));
        assert_eq!(doc.children_by_type(mono, "Chapter"), vec![a]);
        assert_eq!(doc.topmost_child(periodical), Some(mono));
        assert_eq!(doc.topmost_child(mono), None);
    }

    #[test]
    fn test_delete_subtree() {
        let prefs = prefs();
        let mut doc = DigitalDocument::new();
        let mono = node(&mut doc, &prefs, "Monograph");
        let a = node(&mut doc, &prefs, "Chapter");
        let b = node(&mut doc, &prefs, "Chapter");
        doc.set_logical_root(mono).unwrap();
        doc.add_child(mono, a).unwrap();
        doc.add_child(a, b).unwrap();

        assert!(doc.delete(a));
        assert!(!doc.contains(a));
        assert!(!doc.contains(b));
        assert!(doc.node(mono).unwrap().children().is_empty());
        assert_eq!(doc.len(), 1);
        assert!(!doc.delete(a));

        assert!(doc.delete(mono));
        assert_eq!(doc.logical_root(), None);
        assert!(doc.is_empty());
    }
}
