use orfs_core::{Action, Workspace};
use std::ops::Range;

use crate::naming::stage_prefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// One per workspace, labelled `<platform>/<nickname>`.
    Root,
    Stage,
    Substage,
}

impl NodeKind {
    /// Context value the host uses to decide which commands to offer.
    pub fn context_value(self) -> &'static str {
        match self {
            Self::Root => "design",
            Self::Stage => "stage",
            Self::Substage => "substage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
}

/// Commands a tree item responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCommand {
    Run,
    ShowLog,
    Clean,
    Gui,
}

/// One projected tree element. Rebuilt on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub label: String,
    pub workspace: Workspace,
    pub collapsible: Collapsible,
    pub action: Option<Action>,
    pub log: Option<Action>,
    pub gui: Option<Action>,
    pub clean: Option<Action>,
    pub highlighted: bool,
}

impl TreeNode {
    pub fn new(kind: NodeKind, label: impl Into<String>, workspace: Workspace) -> Self {
        Self {
            kind,
            label: label.into(),
            workspace,
            collapsible: Collapsible::None,
            action: None,
            log: None,
            gui: None,
            clean: None,
            highlighted: false,
        }
    }

    pub fn prefix(&self) -> &str {
        stage_prefix(&self.label)
    }

    pub fn description(&self) -> &str {
        &self.workspace.name
    }

    pub fn tooltip(&self) -> String {
        format!("{}-{}", self.label, self.workspace.name)
    }

    pub fn context_value(&self) -> &'static str {
        self.kind.context_value()
    }

    pub fn is_expandable(&self) -> bool {
        self.collapsible == Collapsible::Collapsed
    }

    /// Label ranges to emphasise. A highlighted node emphasises its whole
    /// label.
    pub fn highlight_ranges(&self) -> Vec<Range<usize>> {
        if self.highlighted {
            vec![0..self.label.len()]
        } else {
            Vec::new()
        }
    }

    /// The action a command would run, if this node has one.
    pub fn command_target(&self, command: NodeCommand) -> Option<&Action> {
        match command {
            NodeCommand::Run => self.action.as_ref(),
            NodeCommand::ShowLog => self.log.as_ref(),
            NodeCommand::Clean => self.clean.as_ref(),
            NodeCommand::Gui => self.gui.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orfs_core::ActionKind;

    fn ws() -> Workspace {
        Workspace::new("gcd", "/w/gcd")
    }

    #[test]
    fn presentation_fields() {
        let node = TreeNode::new(NodeKind::Stage, "3_place", ws());
        assert_eq!(node.prefix(), "3");
        assert_eq!(node.description(), "gcd");
        assert_eq!(node.tooltip(), "3_place-gcd");
        assert_eq!(node.context_value(), "stage");
        assert!(!node.is_expandable());
        assert!(node.highlight_ranges().is_empty());
    }

    #[test]
    fn highlighted_node_covers_whole_label() {
        let mut node = TreeNode::new(NodeKind::Stage, "4_cts", ws());
        node.highlighted = true;
        assert_eq!(node.highlight_ranges(), vec![0..5]);
    }

    #[test]
    fn command_targets() {
        let mut node = TreeNode::new(NodeKind::Substage, "5_1_grt", ws());
        assert!(node.command_target(NodeCommand::ShowLog).is_none());
        node.log = Some(Action {
            kind: ActionKind::Log,
            name: "log 5_1_grt".into(),
            target: "do-5_1_grt".into(),
            invocation: "true".into(),
            workspace: ws(),
        });
        assert_eq!(
            node.command_target(NodeCommand::ShowLog).map(|a| a.name.as_str()),
            Some("log 5_1_grt")
        );
        assert!(node.command_target(NodeCommand::Run).is_none());
    }
}
