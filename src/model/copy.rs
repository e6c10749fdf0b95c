//! Deep copies of nodes and subtrees.

use std::collections::HashMap;

use super::document::DigitalDocument;
use super::node::{DocStruct, NodeId};
use super::reference::Endpoint;
use crate::error::Result;

impl DigitalDocument {
    /// Clone `node` into a new, independent node of the same document.
    ///
    /// `with_metadata` copies values, groups, content-file references and
    /// technical metadata ids; `recursive` clones the children the same way.
    /// References are recreated: edges between nodes of the copied subtree
    /// point at the corresponding clones, edges leaving it point at the
    /// original targets.
    ///
    /// The clone's parent is the original's parent, but the clone is not in
    /// that parent's child list. Attach it with [`add_child`] to make it part
    /// of a tree.
    ///
    /// [`add_child`]: DigitalDocument::add_child
    pub fn copy(&mut self, node: NodeId, with_metadata: bool, recursive: bool) -> Result<NodeId> {
        let originals = if recursive {
            self.subtree(node)?
        } else {
            self.get(node)?;
            vec![node]
        };

        let mut map: HashMap<NodeId, NodeId> = HashMap::with_capacity(originals.len());
        for &old in &originals {
            let src = self.get(old)?;
            let mut clone = DocStruct::new(src.doc_type.clone());
            clone.is_logical = src.is_logical;
            clone.is_physical = src.is_physical;
            clone.reference_to_anchor = src.reference_to_anchor.clone();
            clone.identifier = src.identifier.clone();
            clone.parent = src.parent;
            if with_metadata {
                clone.values = src.values.clone();
                clone.groups = src.groups.clone();
                clone.content_files = src.content_files.clone();
                clone.tech_md = src.tech_md.clone();
            }
            let id = self.alloc(clone);
            map.insert(old, id);
        }

        // Children lists, in original order.
        for &old in &originals[1..] {
            let Some(parent) = self.get(old)?.parent.and_then(|p| map.get(&p).copied()) else {
                continue;
            };
            let new = map[&old];
            self.get_mut(new)?.parent = Some(parent);
            self.get_mut(parent)?.children.push(new);
        }

        self.copy_references(&originals, &map)?;
        let top = map[&node];
        tracing::debug!(original = %node, copy = %top, nodes = map.len(), "subtree copied");
        Ok(top)
    }

    fn copy_references(&mut self, originals: &[NodeId], map: &HashMap<NodeId, NodeId>) -> Result<()> {
        let remap = |e: Endpoint| match e {
            Endpoint::Node(id) => Endpoint::Node(map.get(&id).copied().unwrap_or(id)),
            deferred => deferred,
        };

        for &old in originals {
            let new = map[&old];
            let to = self.get(old)?.to.clone();
            for r in to {
                match remap(r.target) {
                    Endpoint::Node(target) => {
                        self.add_reference(new, target, r.kind)?;
                    }
                    Endpoint::Deferred(id) => {
                        self.add_deferred_reference(new, id, r.kind)?;
                    }
                }
            }

            // Incoming edges from inside the subtree are already recreated
            // as outgoing edges of the cloned sources.
            let from = self.get(old)?.from.clone();
            for r in from {
                match r.source {
                    Endpoint::Node(source) if map.contains_key(&source) => {}
                    Endpoint::Node(source) => {
                        self.add_reference(source, new, r.kind)?;
                    }
                    Endpoint::Deferred(id) => {
                        self.add_deferred_reference_from(new, id, r.kind)?;
                    }
                }
            }
        }
        Ok(())
    }
}
