// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds the test outline on demand from the [`CtCatalog`].
//!
//! The provider never redraws on its own. Every change that a tree host must pick up is announced
//! through a [`DirtyEvent`] sent to each subscriber.

use crate::{
    catalog::CtCatalog,
    model::{GroupRange, group_ranges},
    tree::{ExpansionState, NodeId, NodeKind, TestTree, TreeNode},
    verdict::{TestVerdict, aggregate_verdict},
};
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use tracing::debug;

/// Label shared by every test group node. Groups are told apart by their description.
pub const TEST_GROUP_LABEL: &str = "test group";

/// Announces that the subtree below `node` is stale and must be queried again.
///
/// `None` means the whole tree is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyEvent {
    /// The root of the stale subtree.
    pub node: Option<NodeId>,
}

/// A displayable snapshot of a tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeItem {
    /// The node this item was created for.
    pub id: NodeId,

    /// The label.
    pub label: String,

    /// The kind of node.
    pub kind: NodeKind,

    /// The description, if any.
    pub description: Option<String>,

    /// The verdict, if known.
    pub verdict: Option<TestVerdict>,

    /// The icon to show for the verdict.
    pub icon: Option<&'static str>,

    /// The context value, used by hosts to decide which actions to offer.
    pub context_value: &'static str,

    /// Whether the node is open.
    pub expansion: ExpansionState,
}

/// Produces and refreshes the four-level test outline.
#[derive(Debug)]
pub struct CtDataProvider {
    tree: TestTree,
    group_size: u32,
    verdicts_to_show: Option<BTreeSet<TestVerdict>>,
    subscribers: Vec<mpsc::UnboundedSender<DirtyEvent>>,
}

impl CtDataProvider {
    /// Creates a new provider that pages traces into groups of `group_size` tests.
    pub fn new(group_size: u32) -> Self {
        Self {
            tree: TestTree::new(),
            group_size: group_size.max(1),
            verdicts_to_show: None,
            subscribers: Vec::new(),
        }
    }

    /// Returns the number of tests per group.
    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    /// Returns the underlying tree.
    pub fn tree(&self) -> &TestTree {
        &self.tree
    }

    /// Returns the symbol nodes built by the last root query.
    pub fn roots(&self) -> &[NodeId] {
        self.tree.roots()
    }

    /// Returns the verdicts shown while filtering, or `None` if filtering is disabled.
    pub fn verdicts_to_show(&self) -> Option<&BTreeSet<TestVerdict>> {
        self.verdicts_to_show.as_ref()
    }

    /// Returns a receiver for dirty events.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DirtyEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Marks the subtree below `node`, or the whole tree, as stale.
    pub fn rebuild_view_from_element(&mut self, node: Option<NodeId>) {
        let event = DirtyEvent { node };
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Enables or disables verdict filtering.
    ///
    /// Only trace subtrees are marked stale. Groups and tests are recomputed under the new filter
    /// the next time they are queried.
    pub fn filter_tree(&mut self, enabled: bool, verdicts: impl IntoIterator<Item = TestVerdict>) {
        self.verdicts_to_show = enabled.then(|| verdicts.into_iter().collect());
        debug!("tree filter set to {:?}", self.verdicts_to_show);

        let traces: Vec<_> = self
            .tree
            .roots()
            .iter()
            .flat_map(|&symbol| self.tree.children(symbol).iter().copied())
            .collect();
        for trace in traces {
            self.rebuild_view_from_element(Some(trace));
        }
    }

    /// Records that a node was opened.
    pub fn handle_element_expanded(&mut self, node: NodeId) {
        self.set_expansion(node, ExpansionState::Expanded);
    }

    /// Records that a node was closed.
    pub fn handle_element_collapsed(&mut self, node: NodeId) {
        self.set_expansion(node, ExpansionState::Collapsed);
    }

    fn set_expansion(&mut self, node: NodeId, state: ExpansionState) {
        match self.tree.get_mut(node) {
            Some(node) if node.expansion != ExpansionState::None => node.expansion = state,
            Some(_) => {}
            None => debug!("expansion change for removed node {node}"),
        }
    }

    /// Returns a displayable view of a node, or `None` if the node was removed.
    pub fn tree_item(&self, id: NodeId) -> Option<TreeItem> {
        let node = self.tree.get(id)?;
        Some(TreeItem {
            id,
            label: node.label.to_string(),
            kind: node.kind,
            description: node.description.clone(),
            verdict: node.verdict,
            icon: node.verdict.map(TestVerdict::icon_name),
            context_value: node.kind.context_value(),
            expansion: node.expansion,
        })
    }

    /// Finds the node for a trace by name.
    pub fn find_trace(&self, trace_name: &str) -> Option<NodeId> {
        self.tree
            .roots()
            .iter()
            .find_map(|&symbol| self.tree.find_child(Some(symbol), trace_name))
    }

    /// Returns the test range a group node covers.
    pub fn group_range(&self, group: NodeId) -> Option<GroupRange> {
        let node = self.tree.get(group)?;
        if node.kind != NodeKind::TestGroup {
            return None;
        }
        node.description.as_deref()?.parse().ok()
    }

    /// Returns the children of `node`, rebuilding them from the catalog.
    ///
    /// With `None`, the symbol roots are rebuilt.
    pub fn children(&mut self, catalog: &CtCatalog, node: Option<NodeId>) -> Vec<NodeId> {
        let Some(id) = node else {
            return self.build_roots(catalog);
        };
        let Some(kind) = self.tree.get(id).map(TreeNode::kind) else {
            debug!("children requested for removed node {id}");
            return Vec::new();
        };

        match kind {
            NodeKind::Symbol => self.build_traces(catalog, id),
            NodeKind::Trace => self.build_groups(catalog, id),
            NodeKind::TestGroup => self.build_tests(catalog, id),
            NodeKind::Test => Vec::new(),
        }
    }

    fn build_roots(&mut self, catalog: &CtCatalog) -> Vec<NodeId> {
        let roots: Vec<_> = catalog
            .symbol_names()
            .map(|name| {
                self.tree
                    .find_child(None, name)
                    .unwrap_or_else(|| {
                        self.tree
                            .insert(TreeNode::new(name, NodeKind::Symbol, "", None))
                    })
            })
            .collect();
        self.tree.set_children(None, roots.clone());
        roots
    }

    fn build_traces(&mut self, catalog: &CtCatalog, symbol: NodeId) -> Vec<NodeId> {
        let symbol_name = self.label(symbol);
        let traces: Vec<_> = catalog
            .traces(&symbol_name)
            .iter()
            .map(|trace| match self.tree.find_child(Some(symbol), &trace.name) {
                Some(existing) => {
                    if let Some(node) = self.tree.get_mut(existing) {
                        node.verdict = trace.verdict;
                    }
                    existing
                }
                None => self.tree.insert(TreeNode::new(
                    trace.name.as_str(),
                    NodeKind::Trace,
                    "",
                    trace.verdict,
                )),
            })
            .collect();
        self.tree.set_children(Some(symbol), traces.clone());
        traces
    }

    fn build_groups(&mut self, catalog: &CtCatalog, trace_node: NodeId) -> Vec<NodeId> {
        let trace_name = self.label(trace_node);
        let Some(trace) = catalog.trace(&trace_name) else {
            debug!("trace `{trace_name}` is no longer known, showing no groups");
            self.tree.set_children(Some(trace_node), Vec::new());
            return Vec::new();
        };

        let old_groups = self.tree.children(trace_node).to_vec();
        let mut groups = Vec::new();
        for (index, range) in group_ranges(trace.number_of_tests(), self.group_size).enumerate() {
            let results = trace.test_results(range);
            if !self.is_shown(results.iter().map(|tc| tc.verdict)) {
                continue;
            }

            let verdict = aggregate_verdict(results.iter().map(|tc| tc.verdict));
            let description = range.to_string();
            let id = match old_groups.get(index).copied() {
                Some(existing) if !groups.contains(&existing) => {
                    if let Some(node) = self.tree.get_mut(existing) {
                        node.description = Some(description);
                        node.verdict = verdict;
                    }
                    existing
                }
                _ => self.tree.insert(TreeNode::new(
                    TEST_GROUP_LABEL,
                    NodeKind::TestGroup,
                    description,
                    verdict,
                )),
            };
            groups.push(id);
        }

        self.tree.set_children(Some(trace_node), groups.clone());
        groups
    }

    fn build_tests(&mut self, catalog: &CtCatalog, group: NodeId) -> Vec<NodeId> {
        let (Some(range), Some(trace_node)) = (self.group_range(group), self.tree.parent(group))
        else {
            debug!("test group {group} has no valid range or parent");
            return Vec::new();
        };
        let trace_name = self.label(trace_node);

        let nodes: Vec<_> = catalog
            .test_results(range, &trace_name)
            .iter()
            .filter(|tc| self.is_shown(std::iter::once(tc.verdict)))
            .map(|tc| {
                let description = tc.verdict.map_or("n/a", TestVerdict::name);
                TreeNode::new(tc.id.to_string(), NodeKind::Test, description, tc.verdict)
            })
            .collect();
        let tests: Vec<_> = nodes.into_iter().map(|node| self.tree.insert(node)).collect();

        self.tree.set_children(Some(group), tests.clone());
        tests
    }

    /// Returns true if, under the current filter, any of the verdicts may be shown.
    fn is_shown(&self, mut verdicts: impl Iterator<Item = Option<TestVerdict>>) -> bool {
        match &self.verdicts_to_show {
            None => true,
            Some(allowed) => verdicts.any(|v| v.is_some_and(|v| allowed.contains(&v))),
        }
    }

    fn label(&self, id: NodeId) -> String {
        self.tree
            .get(id)
            .map(|node| node.label.to_string())
            .unwrap_or_default()
    }
}
