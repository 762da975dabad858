use orfs_core::{Action, LineLevel, OutputLine};
use orfs_tree::{NodeCommand, NodeKind, TreeNode};

const SIBLINGS: [(NodeCommand, &str); 3] = [
    (NodeCommand::ShowLog, "log"),
    (NodeCommand::Gui, "gui"),
    (NodeCommand::Clean, "clean"),
];

/// One tree row: `+` marks expandable nodes, `*` highlighted ones, and the
/// bracketed list names the extra commands the node offers.
pub fn node_line(node: &TreeNode, depth: usize) -> String {
    let mut line = "  ".repeat(depth);
    line.push_str(if node.is_expandable() { "+ " } else { "- " });
    line.push_str(&node.label);
    if node.highlighted {
        line.push_str(" *");
    }
    if node.kind == NodeKind::Root {
        line.push_str(&format!(" ({})", node.description()));
    }

    let extras: Vec<&str> = SIBLINGS
        .iter()
        .filter(|(command, _)| node.command_target(*command).is_some())
        .map(|(_, name)| *name)
        .collect();
    if !extras.is_empty() {
        line.push_str(&format!("  [{}]", extras.join(" ")));
    }
    line
}

pub fn task_table(actions: &[Action]) -> String {
    let width = actions.iter().map(|a| a.name.len()).max().unwrap_or(0);
    actions
        .iter()
        .map(|a| format!("{:<5}  {:<width$}  {}", a.kind.label(), a.name, a.invocation))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn output_line(channel: &str, line: &OutputLine) -> String {
    let level = match line.level {
        LineLevel::Info => "info",
        LineLevel::Warning => "warning",
        LineLevel::Error => "error",
    };
    format!("[{channel}] {level}: {}", line.text)
}

pub fn command_name(command: NodeCommand) -> &'static str {
    match command {
        NodeCommand::Run => "run",
        NodeCommand::ShowLog => "log",
        NodeCommand::Clean => "clean",
        NodeCommand::Gui => "gui",
    }
}
