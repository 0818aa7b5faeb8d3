// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test outline tree.
//!
//! Nodes live in an arena owned by [`TestTree`] and refer to each other through [`NodeId`]s.
//! Children are owned by their parent. The parent link is a plain index and does not keep the
//! parent alive.

use crate::verdict::TestVerdict;
use smol_str::SmolStr;
use std::fmt;

/// Identifies a node within a [`TestTree`].
///
/// Ids of removed nodes may be reused for new nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The four levels of the test outline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A module or class containing traces.
    Symbol,

    /// A trace.
    Trace,

    /// A page of tests within a trace.
    TestGroup,

    /// A single test.
    Test,
}

impl NodeKind {
    /// Returns the context value tree hosts use to decide which actions apply to a node.
    pub fn context_value(self) -> &'static str {
        match self {
            NodeKind::Symbol => "ctSymbol",
            NodeKind::Trace => "trace",
            NodeKind::TestGroup => "testgroup",
            NodeKind::Test => "test",
        }
    }
}

/// Whether a node is displayed open, closed, or cannot be opened at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionState {
    /// The node is a leaf.
    None,

    /// The node is closed.
    Collapsed,

    /// The node is open.
    Expanded,
}

/// A node of the test outline.
#[derive(Clone, Debug)]
pub struct TreeNode {
    pub(crate) label: SmolStr,
    pub(crate) kind: NodeKind,
    pub(crate) description: Option<String>,
    pub(crate) verdict: Option<TestVerdict>,
    pub(crate) expansion: ExpansionState,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl TreeNode {
    /// Creates a new node without children.
    ///
    /// An empty description is stored as `None`.
    pub fn new(
        label: impl Into<SmolStr>,
        kind: NodeKind,
        description: impl Into<String>,
        verdict: Option<TestVerdict>,
    ) -> Self {
        let description = description.into();
        let expansion = match kind {
            NodeKind::Test => ExpansionState::None,
            _ => ExpansionState::Collapsed,
        };
        Self {
            label: label.into(),
            kind,
            description: (!description.is_empty()).then_some(description),
            verdict,
            expansion,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Returns the label, unique among siblings.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the kind of node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the verdict, or `None` if it is not known yet.
    pub fn verdict(&self) -> Option<TestVerdict> {
        self.verdict
    }

    /// Returns the expansion state.
    pub fn expansion(&self) -> ExpansionState {
        self.expansion
    }

    /// Returns the parent node, if this is not a root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the children, in display order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// An arena of [`TreeNode`]s plus the ordered list of roots.
#[derive(Clone, Debug, Default)]
pub struct TestTree {
    nodes: Vec<Option<TreeNode>>,
    free: Vec<usize>,
    roots: Vec<NodeId>,
}

impl TestTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the root nodes.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Returns the node with the given id, or `None` if it was removed.
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Returns the number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the children of a node. Removed nodes have no children.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |node| &node.children)
    }

    /// Returns the parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Returns the nearest ancestor of the given kind, including the node itself.
    pub fn ancestor_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.get(id)?;
            if node.kind == kind {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// Finds a child of `parent` (or a root, if `parent` is `None`) by label.
    pub fn find_child(&self, parent: Option<NodeId>, label: &str) -> Option<NodeId> {
        let candidates = match parent {
            Some(parent) => self.children(parent),
            None => &self.roots,
        };
        candidates
            .iter()
            .copied()
            .find(|&id| self.get(id).is_some_and(|node| node.label == label))
    }

    pub(crate) fn insert(&mut self, node: TreeNode) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Replaces the children of `parent` (or the roots), removing every previous child that is
    /// not part of the new list.
    pub(crate) fn set_children(&mut self, parent: Option<NodeId>, children: Vec<NodeId>) {
        for &child in &children {
            if let Some(node) = self.get_mut(child) {
                node.parent = parent;
            }
        }

        let old = match parent {
            Some(parent) => match self.get_mut(parent) {
                Some(node) => std::mem::replace(&mut node.children, children),
                None => return,
            },
            None => std::mem::replace(&mut self.roots, children),
        };

        let kept = match parent {
            Some(parent) => self.children(parent).to_vec(),
            None => self.roots.clone(),
        };
        for id in old {
            if !kept.contains(&id) {
                self.remove_subtree(id);
            }
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.free.push(id.0);
        for child in node.children {
            self.remove_subtree(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_children_removes_dropped_subtrees() {
        let mut tree = TestTree::new();
        let symbol = tree.insert(TreeNode::new("A", NodeKind::Symbol, "", None));
        tree.set_children(None, vec![symbol]);

        let t1 = tree.insert(TreeNode::new("T1", NodeKind::Trace, "", None));
        let t2 = tree.insert(TreeNode::new("T2", NodeKind::Trace, "", None));
        tree.set_children(Some(symbol), vec![t1, t2]);
        let group = tree.insert(TreeNode::new("test group", NodeKind::TestGroup, "1-3", None));
        tree.set_children(Some(t2), vec![group]);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.parent(group), Some(t2));
        assert_eq!(tree.ancestor_of_kind(group, NodeKind::Symbol), Some(symbol));

        tree.set_children(Some(symbol), vec![t1]);
        assert_eq!(tree.len(), 2);
        assert!(tree.get(t2).is_none());
        assert!(tree.get(group).is_none());
        assert_eq!(tree.find_child(Some(symbol), "T1"), Some(t1));
        assert_eq!(tree.find_child(Some(symbol), "T2"), None);

        // Freed slots are reused.
        let t3 = tree.insert(TreeNode::new("T3", NodeKind::Trace, "", None));
        assert!(t3 == t2 || t3 == group);
    }

    #[test]
    fn empty_description_is_none() {
        let node = TreeNode::new("1", NodeKind::Test, "", None);
        assert_eq!(node.description(), None);
        assert_eq!(node.expansion(), ExpansionState::None);
        let node = TreeNode::new("test group", NodeKind::TestGroup, "1-300", None);
        assert_eq!(node.description(), Some("1-300"));
        assert_eq!(node.expansion(), ExpansionState::Collapsed);
    }
}
