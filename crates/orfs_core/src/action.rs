use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Task type tag under which every discovered action is registered.
pub const TASK_TYPE: &str = "orfs";

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// A workspace folder holding a design. Discovery runs once per folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub path: PathBuf,
}

impl Workspace {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Build a workspace from a directory, naming it after the last path
    /// component.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, path)
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Build,
    Clean,
    Log,
    Gui,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Clean => "clean",
            Self::Log => "log",
            Self::Gui => "gui",
        }
    }
}

/// A runnable unit produced by discovery.
///
/// Actions are rebuilt wholesale on every discovery run and are only ever
/// matched against each other by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Display identity, e.g. `2_floorplan`, `log 2_1_floorplan`, `clean_2`.
    pub name: String,
    /// Raw build-tool target this action was derived from.
    pub target: String,
    /// Full shell command line.
    pub invocation: String,
    pub workspace: Workspace,
}

impl Action {
    pub fn task_type(&self) -> &'static str {
        TASK_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_from_path_uses_last_component() {
        let ws = Workspace::from_path(Path::new("/designs/gcd"));
        assert_eq!(ws.name, "gcd");
        assert_eq!(ws.path, PathBuf::from("/designs/gcd"));
    }

    #[test]
    fn workspace_from_root_falls_back_to_display() {
        let ws = Workspace::from_path(Path::new("/"));
        assert_eq!(ws.name, "/");
    }

    #[test]
    fn action_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ActionKind::Gui).unwrap();
        assert_eq!(json, "\"gui\"");
        assert_eq!(ActionKind::Clean.label(), "clean");
    }
}
