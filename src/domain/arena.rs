use std::collections::BTreeMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

/// Stable handle of a node in a [`DocumentTree`].
pub type NodeId = Index;

/// Namespace-qualified element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI, None for elements outside any namespace
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// True if this name has the given local part in the given namespace.
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// Data payload for tree nodes: one document element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Attributes by name; order is not significant
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: BTreeMap::new(),
            text: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.local)?;
        for (k, v) in &self.attributes {
            write!(f, " @{}={:?}", k, v)?;
        }
        if let Some(text) = &self.text {
            write!(f, " {:?}", text)?;
        }
        Ok(())
    }
}

/// Tree node in the arena-based document structure.
#[derive(Debug)]
pub struct TreeNode {
    pub data: Element,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<NodeId>,
    /// Indices of child nodes in document order
    pub children: Vec<NodeId>,
}

/// Arena-based document tree.
///
/// Nodes are addressed by generational indices, so handles stay valid
/// while siblings are inserted around them.
#[derive(Debug, Default)]
pub struct DocumentTree {
    arena: Arena<TreeNode>,
    root: Option<NodeId>,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Create a tree holding a single root element.
    pub fn with_root(data: Element) -> Self {
        let mut tree = Self::new();
        tree.insert_root(data);
        tree
    }

    /// Insert a parentless node and make it the root.
    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_root(&mut self, data: Element) -> NodeId {
        let idx = self.arena.insert(TreeNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.root = Some(idx);
        idx
    }

    /// Insert `data` as child of `parent` at `position` (clamped to the
    /// number of children). Returns None if `parent` is not in the tree.
    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_child(&mut self, parent: NodeId, position: usize, data: Element) -> Option<NodeId> {
        if !self.arena.contains(parent) {
            return None;
        }
        let node_idx = self.arena.insert(TreeNode {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        let parent_node = self.arena.get_mut(parent)?;
        let position = position.min(parent_node.children.len());
        parent_node.children.insert(position, node_idx);
        Some(node_idx)
    }

    pub fn append_child(&mut self, parent: NodeId, data: Element) -> Option<NodeId> {
        self.insert_child(parent, usize::MAX, data)
    }

    pub fn get_node(&self, idx: NodeId) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: NodeId) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn element(&self, idx: NodeId) -> Option<&Element> {
        self.arena.get(idx).map(|n| &n.data)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Children of `idx` in document order; empty for unknown nodes.
    pub fn children(&self, idx: NodeId) -> &[NodeId] {
        self.arena
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Local names of the children of `idx`, in document order.
    pub fn child_names(&self, idx: NodeId) -> Vec<&str> {
        self.children(idx)
            .iter()
            .filter_map(|&c| self.element(c))
            .map(|e| e.name.local.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order traversal from the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: NodeId) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }
}

pub struct TreeIterator<'a> {
    tree: &'a DocumentTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a DocumentTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let current_idx = self.stack.pop()?;
        let node = self.tree.get_node(current_idx)?;
        // Push children in reverse order for left-to-right traversal
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some((current_idx, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(name: &str) -> Element {
        Element::new(QName::new(None, name))
    }

    #[test]
    fn given_positions_when_inserting_children_then_order_follows_positions() {
        let mut tree = DocumentTree::with_root(el("root"));
        let root = tree.root().unwrap();

        tree.append_child(root, el("c"));
        tree.insert_child(root, 0, el("a"));
        tree.insert_child(root, 1, el("b"));
        tree.insert_child(root, 99, el("d"));

        assert_eq!(tree.child_names(root), vec!["a", "b", "c", "d"]);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn given_nested_tree_when_iterating_then_visits_in_preorder() {
        let mut tree = DocumentTree::with_root(el("root"));
        let root = tree.root().unwrap();
        let a = tree.append_child(root, el("a")).unwrap();
        tree.append_child(a, el("a1"));
        tree.append_child(root, el("b"));

        let names: Vec<_> = tree.iter().map(|(_, n)| n.data.name.local.clone()).collect();

        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn given_unknown_parent_when_inserting_then_returns_none() {
        let mut tree = DocumentTree::with_root(el("root"));
        let unknown = NodeId::from_raw_parts(42, 0);

        assert!(tree.insert_child(unknown, 0, el("z")).is_none());
        assert_eq!(tree.len(), 1);
        assert_eq!(DocumentTree::new().depth(), 0);
    }
}
