//! Deep structural comparison of nodes.
//!
//! Nodes reach each other through the tree and through references, and
//! references may form cycles. A comparison keeps the set of node pairs
//! whose reference lists are currently being compared; meeting such a pair
//! again counts as equal, which bounds the recursion.
//!
//! Settled pairs are remembered for the rest of the top-level call, so each
//! pair is compared once. A pair found unequal after its in-progress
//! assumption was used discards the results settled since it started.
//!
//! Matching rules:
//! - children compare positionally
//! - metadata, persons, corporates, groups and content-file references
//!   compare existentially: every element on the left must have an equal
//!   element on the right
//! - references compare existentially by kind and by the structural
//!   equality of their far ends

use std::collections::{HashMap, HashSet};

use crate::model::{DigitalDocument, DocStruct, Endpoint, NodeId, Reference};

/// Whether node `a` of `doc_a` and node `b` of `doc_b` are structurally
/// equal. The documents may be the same.
pub fn structurally_equal(doc_a: &DigitalDocument, a: NodeId, doc_b: &DigitalDocument, b: NodeId) -> bool {
    Comparison::new(doc_a, doc_b).nodes(a, b)
}

/// Whether two documents have equal trees, file sets and technical
/// metadata.
pub fn documents_equal(doc_a: &DigitalDocument, doc_b: &DigitalDocument) -> bool {
    let roots = |ra: Option<NodeId>, rb: Option<NodeId>| match (ra, rb) {
        (None, None) => true,
        (Some(x), Some(y)) => structurally_equal(doc_a, x, doc_b, y),
        _ => false,
    };
    doc_a.file_set() == doc_b.file_set()
        && doc_a.amd_sec().records() == doc_b.amd_sec().records()
        && roots(doc_a.logical_root(), doc_b.logical_root())
        && roots(doc_a.physical_root(), doc_b.physical_root())
}

impl DigitalDocument {
    /// See [`documents_equal`].
    pub fn structurally_equals(&self, other: &DigitalDocument) -> bool {
        documents_equal(self, other)
    }
}

struct Comparison<'a> {
    doc_a: &'a DigitalDocument,
    doc_b: &'a DigitalDocument,
    visiting: HashSet<(NodeId, NodeId)>,
    /// Pairs whose in-progress assumption answered a re-entry.
    assumed: HashSet<(NodeId, NodeId)>,
    settled: HashMap<(NodeId, NodeId), bool>,
    /// Pairs settled as equal, in order, for rollback.
    trail: Vec<(NodeId, NodeId)>,
}

/// Both empty: equal. One empty or sizes differ: not equal. Otherwise the
/// lists need a full comparison (`None`).
fn quick_pair(len_a: usize, len_b: usize) -> Option<bool> {
    match (len_a, len_b) {
        (0, 0) => Some(true),
        (0, _) | (_, 0) => Some(false),
        (x, y) if x != y => Some(false),
        _ => None,
    }
}

/// Every element of `a` has an equal element in `b`.
fn existential<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.iter().all(|x| b.iter().any(|y| x == y))
}

impl<'a> Comparison<'a> {
    fn new(doc_a: &'a DigitalDocument, doc_b: &'a DigitalDocument) -> Self {
        Self {
            doc_a,
            doc_b,
            visiting: HashSet::new(),
            assumed: HashSet::new(),
            settled: HashMap::new(),
            trail: Vec::new(),
        }
    }

    fn nodes(&mut self, a: NodeId, b: NodeId) -> bool {
        if let Some(&equal) = self.settled.get(&(a, b)) {
            return equal;
        }
        let mark = self.trail.len();
        let equal = self.compare(a, b);
        if equal {
            self.trail.push((a, b));
        } else if self.assumed.remove(&(a, b)) {
            for pair in self.trail.drain(mark..) {
                self.settled.remove(&pair);
            }
        }
        self.settled.insert((a, b), equal);
        equal
    }

    fn compare(&mut self, a: NodeId, b: NodeId) -> bool {
        let (doc_a, doc_b) = (self.doc_a, self.doc_b);
        let (Some(x), Some(y)) = (doc_a.node(a), doc_b.node(b)) else {
            return false;
        };

        if x.is_logical() != y.is_logical()
            || x.is_physical() != y.is_physical()
            || x.reference_to_anchor != y.reference_to_anchor
            || x.type_name() != y.type_name()
        {
            return false;
        }

        if !Self::values(x, y) {
            return false;
        }

        match quick_pair(x.children().len(), y.children().len()) {
            Some(false) => return false,
            Some(true) => {}
            None => {
                let pairs: Vec<_> = x.children().iter().copied().zip(y.children().iter().copied()).collect();
                if !pairs.into_iter().all(|(ca, cb)| self.nodes(ca, cb)) {
                    return false;
                }
            }
        }

        self.references(a, b, x.references_to(), y.references_to(), |r| r.target)
            && self.references(a, b, x.references_from(), y.references_from(), |r| r.source)
    }

    /// Attached values, groups and content-file references.
    fn values(x: &DocStruct, y: &DocStruct) -> bool {
        fn check<T: PartialEq>(a: &[T], b: &[T]) -> bool {
            quick_pair(a.len(), b.len()).unwrap_or_else(|| existential(a, b))
        }

        let (meta_a, meta_b): (Vec<_>, Vec<_>) = (x.metadata().collect(), y.metadata().collect());
        let (pers_a, pers_b): (Vec<_>, Vec<_>) = (x.persons().collect(), y.persons().collect());
        let (corp_a, corp_b): (Vec<_>, Vec<_>) = (x.corporates().collect(), y.corporates().collect());

        check(&meta_a, &meta_b)
            && check(&pers_a, &pers_b)
            && check(&corp_a, &corp_b)
            && check(x.groups(), y.groups())
            && check(x.content_files(), y.content_files())
    }

    fn references(
        &mut self,
        a: NodeId,
        b: NodeId,
        refs_a: &[Reference],
        refs_b: &[Reference],
        far_end: fn(&Reference) -> Endpoint,
    ) -> bool {
        if let Some(result) = quick_pair(refs_a.len(), refs_b.len()) {
            return result;
        }
        if !self.visiting.insert((a, b)) {
            self.assumed.insert((a, b));
            return true;
        }
        let equal = refs_a.iter().all(|ra| {
            refs_b
                .iter()
                .any(|rb| ra.kind == rb.kind && self.endpoints(far_end(ra), far_end(rb)))
        });
        self.visiting.remove(&(a, b));
        equal
    }

    fn endpoints(&mut self, a: Endpoint, b: Endpoint) -> bool {
        match (a, b) {
            (Endpoint::Node(x), Endpoint::Node(y)) => self.nodes(x, y),
            (Endpoint::Deferred(x), Endpoint::Deferred(y)) => x == y,
            _ => false,
        }
    }
}
