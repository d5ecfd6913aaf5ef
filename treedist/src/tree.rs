//! Labeled ordered trees backed by an `indextree` arena.
//!
//! A [`Tree`] owns every node in a single arena; children are referenced by
//! [`NodeId`] and keep their left-to-right order. Trees may be empty, which is how
//! an input without any statement is represented.
//!
//! Per-node bookkeeping (pre-order index, subtree size, sibling position, depth and
//! a Merkle hash) is computed on first use and cached. Mutation requires `&mut`,
//! which drops the cache, so a shared tree is effectively immutable.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::OnceLock;

use indextree::{Arena, NodeId};
use rapidhash::RapidHasher;
use smallvec::SmallVec;

/// One syntax construct: a category label plus optional literal text.
///
/// Two nodes are equivalent when both `label` and `value` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeData {
    /// Syntactic category, e.g. `Select` or `Identifier`.
    pub label: String,
    /// Literal text carried by the node, e.g. an identifier or an operator.
    pub value: Option<String>,
}

impl NodeData {
    /// A node with a label and no value.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }

    /// A node with a label and a literal value.
    pub fn with_value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}({})", self.label, value),
            None => write!(f, "{}", self.label),
        }
    }
}

/// Structural hash of a subtree (label, value and children, Merkle style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHash(pub u64);

/// Child positions leading from the root to a node.
///
/// Uses `SmallVec<[u32; 16]>` since syntax trees for realistic queries are rarely
/// deeper than that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(pub SmallVec<[u32; 16]>);

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for idx in &self.0 {
            write!(f, "/{}", idx)?;
        }
        Ok(())
    }
}

/// Capability shared by anything tree-shaped that can be turned into a [`Tree`].
///
/// Parsers expose their output through this trait so the edit distance engine never
/// depends on a particular grammar's node taxonomy.
pub trait SyntaxNode {
    /// Syntactic category of this node.
    fn label(&self) -> &str;

    /// Literal text of this node, if any.
    fn value(&self) -> Option<&str>;

    /// Children in source order.
    fn children(&self) -> impl Iterator<Item = &Self> + '_;
}

/// Bookkeeping derived from the arena, indexed by pre-order position.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    /// Pre-order position to arena id.
    pub(crate) order: Vec<NodeId>,
    /// `usize::from(NodeId)` to pre-order position.
    index: Vec<usize>,
    pub(crate) parent: Vec<Option<usize>>,
    pub(crate) children: Vec<SmallVec<[usize; 4]>>,
    pub(crate) size: Vec<usize>,
    position: Vec<u32>,
    depth: Vec<usize>,
    hash: Vec<NodeHash>,
}

impl Layout {
    fn compute(tree: &Tree) -> Self {
        let order: Vec<NodeId> = tree.preorder().collect();
        let n = order.len();

        let mut index = vec![usize::MAX; tree.arena.count() + 1];
        for (pos, &id) in order.iter().enumerate() {
            index[usize::from(id)] = pos;
        }

        let mut parent = vec![None; n];
        let mut children: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];
        let mut position = vec![0u32; n];
        for (pos, &id) in order.iter().enumerate() {
            for (i, child) in id.children(&tree.arena).enumerate() {
                let child_pos = index[usize::from(child)];
                parent[child_pos] = Some(pos);
                position[child_pos] = i as u32;
                children[pos].push(child_pos);
            }
        }

        // Parents precede their descendants in pre-order.
        let mut depth = vec![0usize; n];
        for pos in 0..n {
            if let Some(p) = parent[pos] {
                depth[pos] = depth[p] + 1;
            }
        }

        let mut size = vec![1usize; n];
        let mut hash = vec![NodeHash(0); n];
        for pos in (0..n).rev() {
            let mut hasher = RapidHasher::default();
            tree.arena[order[pos]].get().hash(&mut hasher);
            for &child in &children[pos] {
                size[pos] += size[child];
                hash[child].0.hash(&mut hasher);
            }
            hash[pos] = NodeHash(hasher.finish());
        }

        Self {
            order,
            index,
            parent,
            children,
            size,
            position,
            depth,
            hash,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

/// A labeled ordered tree.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Arena<NodeData>,
    root: Option<NodeId>,
    layout: OnceLock<Layout>,
}

impl Tree {
    /// Create a tree with a single root node.
    pub fn new(root: NodeData) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root);
        Self {
            arena,
            root: Some(root),
            layout: OnceLock::new(),
        }
    }

    /// Create a tree with zero nodes.
    pub fn empty() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            layout: OnceLock::new(),
        }
    }

    /// Copy any [`SyntaxNode`] structure into a new tree.
    pub fn from_syntax<N: SyntaxNode>(root: &N) -> Self {
        let mut tree = Self::new(node_data_of(root));
        let Some(root_id) = tree.root else {
            return tree;
        };

        // Explicit stack so deeply nested expressions cannot overflow the call stack.
        let mut stack: Vec<(&N, NodeId)> = vec![(root, root_id)];
        while let Some((node, id)) = stack.pop() {
            let mut pending = Vec::new();
            for child in node.children() {
                let child_id = tree.add_child(id, node_data_of(child));
                pending.push((child, child_id));
            }
            // Reverse so the leftmost child is expanded first.
            stack.extend(pending.into_iter().rev());
        }
        tree
    }

    /// Append a child under `parent` and return its id.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.arena.new_node(data);
        parent.append(id, &mut self.arena);
        self.layout.take();
        id
    }

    /// The root node, or `None` for an empty tree.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.layout().len()
    }

    /// Whether the tree has zero nodes.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Label and value of a node.
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Parent of a node (`None` for the root).
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Children of a node in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Lazy pre-order traversal. Call again to restart.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            arena: &self.arena,
            root: self.root,
            next: self.root,
        }
    }

    pub(crate) fn layout(&self) -> &Layout {
        self.layout.get_or_init(|| Layout::compute(self))
    }

    /// Pre-order position of a node.
    pub fn preorder_index(&self, id: NodeId) -> usize {
        self.layout().index[usize::from(id)]
    }

    /// Node at a pre-order position.
    pub fn node_at(&self, index: usize) -> NodeId {
        self.layout().order[index]
    }

    /// Label and value of the node at a pre-order position.
    pub fn data_at(&self, index: usize) -> &NodeData {
        self.get(self.node_at(index))
    }

    /// Number of nodes in the subtree rooted at `id`, including `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        let layout = self.layout();
        layout.size[layout.index[usize::from(id)]]
    }

    /// Distance from the root (the root has depth 0).
    pub fn depth(&self, id: NodeId) -> usize {
        let layout = self.layout();
        layout.depth[layout.index[usize::from(id)]]
    }

    /// Merkle hash of the subtree rooted at `id`.
    pub fn hash(&self, id: NodeId) -> NodeHash {
        let layout = self.layout();
        layout.hash[layout.index[usize::from(id)]]
    }

    /// Child positions from the root to `id`.
    pub fn path(&self, id: NodeId) -> NodePath {
        self.path_at(self.preorder_index(id))
    }

    /// Child positions from the root to the node at a pre-order position.
    pub fn path_at(&self, index: usize) -> NodePath {
        let layout = self.layout();
        let mut steps = SmallVec::new();
        let mut current = index;
        while let Some(parent) = layout.parent[current] {
            steps.push(layout.position[current]);
            current = parent;
        }
        steps.reverse();
        NodePath(steps)
    }

    /// Whether both trees have the same shape, labels and values.
    pub fn is_identical(&self, other: &Tree) -> bool {
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if self.hash(a) != other.hash(b) || self.len() != other.len() {
                    return false;
                }
                // Hash equality is not proof; confirm node by node.
                let (la, lb) = (self.layout(), other.layout());
                (0..la.len()).all(|i| {
                    la.children[i].len() == lb.children[i].len()
                        && self.data_at(i) == other.data_at(i)
                })
            }
            _ => false,
        }
    }
}

fn node_data_of<N: SyntaxNode>(node: &N) -> NodeData {
    NodeData {
        label: node.label().to_owned(),
        value: node.value().map(str::to_owned),
    }
}

/// Pre-order walk over a [`Tree`] that follows arena links without allocating.
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    arena: &'a Arena<NodeData>,
    root: Option<NodeId>,
    next: Option<NodeId>,
}

impl Preorder<'_> {
    fn successor(&self, mut id: NodeId) -> Option<NodeId> {
        loop {
            if Some(id) == self.root {
                return None;
            }
            let node = &self.arena[id];
            if let Some(sibling) = node.next_sibling() {
                return Some(sibling);
            }
            id = node.parent()?;
        }
    }
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = match self.arena[current].first_child() {
            Some(child) => Some(child),
            None => self.successor(current),
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    struct Sample {
        label: &'static str,
        value: Option<&'static str>,
        children: Vec<Sample>,
    }

    impl SyntaxNode for Sample {
        fn label(&self) -> &str {
            self.label
        }

        fn value(&self) -> Option<&str> {
            self.value
        }

        fn children(&self) -> impl Iterator<Item = &Self> + '_ {
            self.children.iter()
        }
    }

    fn leaf(label: &'static str, value: &'static str) -> Sample {
        Sample {
            label,
            value: Some(value),
            children: vec![],
        }
    }

    fn sample() -> Sample {
        // select -> [projection -> [col(id), col(name)], from -> [table(users)]]
        Sample {
            label: "select",
            value: None,
            children: vec![
                Sample {
                    label: "projection",
                    value: None,
                    children: vec![leaf("col", "id"), leaf("col", "name")],
                },
                Sample {
                    label: "from",
                    value: None,
                    children: vec![leaf("table", "users")],
                },
            ],
        }
    }

    #[test]
    fn test_from_syntax_preserves_preorder() {
        let tree = Tree::from_syntax(&sample());
        let labels: Vec<String> = tree.preorder().map(|id| tree.get(id).to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "select",
                "projection",
                "col(id)",
                "col(name)",
                "from",
                "table(users)"
            ]
        );
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_preorder_is_restartable() {
        let tree = Tree::from_syntax(&sample());
        let walk = tree.preorder();
        let first: Vec<NodeId> = walk.clone().collect();
        let second: Vec<NodeId> = walk.collect();
        assert_eq!(first, second);
        assert_eq!(first, tree.preorder().collect::<Vec<_>>());
    }

    #[test]
    fn test_subtree_sizes_and_paths() {
        let tree = Tree::from_syntax(&sample());
        let root = tree.root().unwrap();
        assert_eq!(tree.subtree_size(root), 6);

        let projection = tree.node_at(1);
        assert_eq!(tree.subtree_size(projection), 3);
        assert_eq!(tree.depth(projection), 1);

        let table = tree.node_at(5);
        assert_eq!(tree.subtree_size(table), 1);
        assert_eq!(tree.path(table).to_string(), "/1/0");
        assert_eq!(tree.path(root).to_string(), "/");
        assert_eq!(tree.preorder_index(table), 5);
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::empty();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.preorder().count(), 0);
        assert!(tree.is_identical(&Tree::empty()));
    }

    #[test]
    fn test_add_child_invalidates_cache() {
        let mut tree = Tree::new(NodeData::new("root"));
        let root = tree.root().unwrap();
        assert_eq!(tree.subtree_size(root), 1);

        tree.add_child(root, NodeData::with_value("leaf", "x"));
        assert_eq!(tree.subtree_size(root), 2);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_identical_detection() {
        let a = Tree::from_syntax(&sample());
        let b = Tree::from_syntax(&sample());
        assert!(a.is_identical(&b));
        assert_eq!(a.hash(a.root().unwrap()), b.hash(b.root().unwrap()));

        let mut c = Tree::from_syntax(&sample());
        let from = c.node_at(4);
        c.add_child(from, NodeData::with_value("table", "orders"));
        assert!(!a.is_identical(&c));
    }

    #[test]
    fn test_value_changes_hash() {
        let a = Tree::new(NodeData::with_value("table", "t"));
        let b = Tree::new(NodeData::with_value("table", "t2"));
        assert_ne!(a.hash(a.root().unwrap()), b.hash(b.root().unwrap()));
        assert!(!a.is_identical(&b));
    }
}
