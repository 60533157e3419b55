//! Arena-backed element tree
//!
//! A flattened element list stored as a slab of nodes plus a pre-order
//! sequence. Hierarchy is implied by element paths, exactly as in the wire
//! form. Node ids are stable for the lifetime of the tree: structural edits
//! renumber positions in the sequence, never ids, so a handle taken before
//! an insertion still points at the same logical element afterwards.

use crucible_models::ElementDefinition;

/// Stable handle to a node in an [`ElementTree`]. Ids are never reused
/// within the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A saved navigator position.
///
/// The empty bookmark marks the virtual position above the root element,
/// where a freshly created navigator starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark(pub(crate) Option<NodeId>);

impl Bookmark {
    /// The position above the root element.
    pub fn start() -> Self {
        Bookmark(None)
    }

    pub fn node(&self) -> Option<NodeId> {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    /// Slab of all nodes ever added, indexed by `NodeId`.
    nodes: Vec<ElementDefinition>,
    /// Pre-order sequence of live nodes.
    order: Vec<NodeId>,
    /// Position of each node id in `order`.
    positions: Vec<usize>,
}

impl ElementTree {
    /// Build a tree over a pre-ordered element list.
    pub fn from_elements(elements: Vec<ElementDefinition>) -> Self {
        let order: Vec<NodeId> = (0..elements.len()).map(NodeId).collect();
        let positions: Vec<usize> = (0..elements.len()).collect();
        Self {
            nodes: elements,
            order,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> &ElementDefinition {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut ElementDefinition {
        &mut self.nodes[id.0]
    }

    /// Position of a node in the pre-order sequence.
    pub fn position(&self, id: NodeId) -> usize {
        self.positions[id.0]
    }

    /// Node at a pre-order position.
    pub fn at(&self, position: usize) -> Option<NodeId> {
        self.order.get(position).copied()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    /// Pre-order traversal of the live nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ElementDefinition)> + '_ {
        self.order.iter().map(move |&id| (id, &self.nodes[id.0]))
    }

    /// Exclusive end of the subtree rooted at `id`: the first following
    /// position whose element is not deeper than `id`.
    pub fn subtree_end(&self, id: NodeId) -> usize {
        let depth = self.get(id).depth();
        let mut end = self.position(id) + 1;
        while end < self.order.len() && self.get(self.order[end]).depth() > depth {
            end += 1;
        }
        end
    }

    /// Deep copies of the subtree rooted at `id`, in pre-order.
    pub fn subtree_elements(&self, id: NodeId) -> Vec<ElementDefinition> {
        let start = self.position(id);
        let end = self.subtree_end(id);
        self.order[start..end]
            .iter()
            .map(|&node| self.nodes[node.0].clone())
            .collect()
    }

    /// Splice a pre-ordered run of elements in directly after the subtree of
    /// `after`. Every spliced element gets a fresh id; the id of the first
    /// one is returned.
    ///
    /// `elements` must not be empty.
    pub fn graft_after(&mut self, elements: Vec<ElementDefinition>, after: NodeId) -> NodeId {
        debug_assert!(!elements.is_empty());
        let insert_at = self.subtree_end(after);
        let mut fresh = Vec::with_capacity(elements.len());
        for element in elements {
            let id = NodeId(self.nodes.len());
            self.nodes.push(element);
            self.positions.push(usize::MAX);
            fresh.push(id);
        }
        let first = fresh[0];
        self.order.splice(insert_at..insert_at, fresh);
        for position in insert_at..self.order.len() {
            self.positions[self.order[position].0] = position;
        }
        first
    }

    /// Deep-copy the subtree at `source` and splice the copy in after the
    /// subtree of `after`. The copy gets fresh ids disjoint from the
    /// original's; returns the id of the copied root.
    pub fn duplicate_after(&mut self, source: NodeId, after: NodeId) -> NodeId {
        let elements = self.subtree_elements(source);
        self.graft_after(elements, after)
    }

    /// Rewrite the path of `id` to `new_path`, re-prefixing every descendant.
    pub fn rebase_subtree(&mut self, id: NodeId, new_path: &str) {
        let start = self.position(id);
        let end = self.subtree_end(id);
        let old_path = self.get(id).path.clone();
        for position in start..end {
            let node = self.order[position];
            let element = &mut self.nodes[node.0];
            let suffix = element.path[old_path.len()..].to_string();
            element.path = format!("{new_path}{suffix}");
        }
    }

    /// Consume the tree into its pre-ordered element list.
    pub fn into_elements(self) -> Vec<ElementDefinition> {
        let mut nodes: Vec<Option<ElementDefinition>> =
            self.nodes.into_iter().map(Some).collect();
        let mut elements = Vec::with_capacity(self.order.len());
        for id in &self.order {
            if let Some(element) = nodes[id.0].take() {
                elements.push(element);
            }
        }
        elements
    }

    /// Clone the live elements into a pre-ordered list.
    pub fn to_elements(&self) -> Vec<ElementDefinition> {
        self.order
            .iter()
            .map(|&id| self.nodes[id.0].clone())
            .collect()
    }
}
