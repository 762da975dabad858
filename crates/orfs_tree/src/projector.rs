//! Projects a flat discovery result into the three-level tree.
//!
//! Nothing is stored between reads: every call rebuilds the requested level
//! from the discovery result and the current highlight state.

use orfs_core::{Action, ActionKind};
use orfs_tasks::{Discovery, WorkspaceDiscovery};

use crate::highlight::HighlightState;
use crate::naming::{
    CLEAN_ALL, clean_name, gui_name, is_leaf_stage, is_stage_name, log_name, stage_prefix,
};
use crate::node::{Collapsible, NodeKind, TreeNode};

/// Children of `parent`, or the roots when `parent` is `None`. Sorted by
/// label.
pub fn children(
    discovery: &Discovery,
    highlights: &HighlightState,
    parent: Option<&TreeNode>,
) -> Vec<TreeNode> {
    let mut nodes = match parent {
        None => discovery.workspaces.iter().map(root_node).collect(),
        Some(parent) => {
            let Some(found) = discovery
                .workspaces
                .iter()
                .find(|w| w.workspace == parent.workspace)
            else {
                return Vec::new();
            };
            match parent.kind {
                NodeKind::Root => stage_nodes(found, highlights),
                NodeKind::Stage if !is_leaf_stage(&parent.label) => {
                    substage_nodes(found, &parent.label)
                }
                NodeKind::Stage | NodeKind::Substage => Vec::new(),
            }
        }
    };
    nodes.sort_by(|a, b| a.label.cmp(&b.label));
    nodes
}

fn builds(found: &WorkspaceDiscovery) -> impl Iterator<Item = &Action> {
    found.actions.iter().filter(|a| a.kind == ActionKind::Build)
}

fn root_node(found: &WorkspaceDiscovery) -> TreeNode {
    let mut node = TreeNode::new(NodeKind::Root, found.label(), found.workspace.clone());
    node.collapsible = Collapsible::Collapsed;
    node.clean = found.find(CLEAN_ALL).cloned();
    node
}

fn stage_nodes(found: &WorkspaceDiscovery, highlights: &HighlightState) -> Vec<TreeNode> {
    builds(found)
        .filter(|a| is_stage_name(&a.name))
        .map(|action| {
            let prefix = stage_prefix(&action.name);
            let mut node =
                TreeNode::new(NodeKind::Stage, action.name.clone(), found.workspace.clone());
            if !is_leaf_stage(&action.name) {
                node.collapsible = Collapsible::Collapsed;
            }
            node.log = found.find(&log_name(&action.name)).cloned();
            node.clean = found.find(&clean_name(prefix)).cloned();
            node.gui = found.find(&gui_name(prefix)).cloned();
            node.highlighted = highlights.contains(prefix);
            node.action = Some(action.clone());
            node
        })
        .collect()
}

fn substage_nodes(found: &WorkspaceDiscovery, stage: &str) -> Vec<TreeNode> {
    let prefix = stage_prefix(stage);
    builds(found)
        .filter(|a| a.name != stage && stage_prefix(&a.name) == prefix)
        .map(|action| {
            let mut node = TreeNode::new(
                NodeKind::Substage,
                action.name.clone(),
                found.workspace.clone(),
            );
            node.log = substage_log(found, &action.name).cloned();
            node.gui = found.find(&gui_name(prefix)).cloned();
            node.action = Some(action.clone());
            node
        })
        .collect()
}

/// The exact `log <name>` when present, otherwise the first log whose name
/// starts with it.
fn substage_log<'a>(found: &'a WorkspaceDiscovery, name: &str) -> Option<&'a Action> {
    let wanted = log_name(name);
    found.find(&wanted).or_else(|| {
        found
            .actions
            .iter()
            .find(|a| a.kind == ActionKind::Log && a.name.starts_with(&wanted))
    })
}
