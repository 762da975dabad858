use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::naming::log_file_prefix;

/// Which stages are emphasised because their log was written recently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HighlightState {
    #[default]
    Idle,
    Highlighted {
        prefixes: BTreeSet<String>,
        last_path: PathBuf,
    },
}

impl HighlightState {
    /// A log file was created or modified. Returns `true` when the visible
    /// set changed.
    ///
    /// The same file reported twice in a row changes nothing. Any other log
    /// replaces the whole set with its own prefix, even when no stage carries
    /// that prefix.
    pub fn on_log_changed(&mut self, path: &Path) -> bool {
        if self.last_path() == Some(path) {
            return false;
        }
        let Some(prefix) = log_file_prefix(path) else {
            debug!(path = %path.display(), "log path without file stem");
            return false;
        };
        *self = Self::Highlighted {
            prefixes: BTreeSet::from([prefix]),
            last_path: path.to_path_buf(),
        };
        true
    }

    pub fn clear(&mut self) {
        *self = Self::Idle;
    }

    pub fn contains(&self, prefix: &str) -> bool {
        match self {
            Self::Idle => false,
            Self::Highlighted { prefixes, .. } => prefixes.contains(prefix),
        }
    }

    pub fn prefixes(&self) -> BTreeSet<String> {
        match self {
            Self::Idle => BTreeSet::new(),
            Self::Highlighted { prefixes, .. } => prefixes.clone(),
        }
    }

    pub fn last_path(&self) -> Option<&Path> {
        match self {
            Self::Idle => None,
            Self::Highlighted { last_path, .. } => Some(last_path),
        }
    }
}

/// [`HighlightState`] shared between the watcher callback, task completion
/// handling and tree reads.
#[derive(Debug, Default)]
pub struct HighlightSet {
    state: Mutex<HighlightState>,
}

impl HighlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_log_changed(&self, path: &Path) -> bool {
        self.state.lock().on_log_changed(path)
    }

    pub fn clear(&self) {
        self.state.lock().clear();
    }

    pub fn snapshot(&self) -> HighlightState {
        self.state.lock().clone()
    }

    pub fn prefixes(&self) -> BTreeSet<String> {
        self.state.lock().prefixes()
    }
}
