use anyhow::Result;
use orfs_core::{TASK_TYPE, TaskHandle, TaskHost, TreeHost};
use orfs_tasks::DiscoveryCache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::highlight::{HighlightSet, HighlightState};
use crate::node::{NodeCommand, TreeNode};
use crate::projector;

/// Everything that can make the tree stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Some setting changed. Only flow path, design config and editor matter.
    ConfigurationChanged,
    /// A launched task finished.
    TaskCompleted,
    /// A log file under the flow's log directory was created or written.
    LogFileChanged(PathBuf),
    ClearHighlights,
    /// User-requested rediscovery.
    Refresh,
}

/// What the host has to do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Repaint,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Session-scoped state: the discovery memo and the highlight set.
pub struct Session {
    cache: Arc<DiscoveryCache>,
    highlights: HighlightSet,
}

impl Session {
    pub fn new(cache: Arc<DiscoveryCache>) -> Self {
        Self {
            cache,
            highlights: HighlightSet::new(),
        }
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }

    /// Offer the discovered actions to the task host under [`TASK_TYPE`].
    pub fn register(&self, host: &dyn TaskHost) {
        let provider: Arc<DiscoveryCache> = Arc::clone(&self.cache);
        host.register(TASK_TYPE, provider);
    }

    pub fn highlights(&self) -> HighlightState {
        self.highlights.snapshot()
    }

    /// Log directory of the current flow, once it is known.
    pub async fn logs_dir(&self) -> Option<PathBuf> {
        self.cache
            .current()
            .await
            .environment
            .as_ref()
            .map(|env| env.logs_dir())
    }

    pub fn handle(&self, event: SessionEvent) -> Effect {
        debug!(?event, "session event");
        match event {
            SessionEvent::ConfigurationChanged => {
                if self.cache.on_settings_changed() {
                    Effect::Repaint
                } else {
                    Effect::None
                }
            }
            SessionEvent::TaskCompleted | SessionEvent::ClearHighlights => {
                self.highlights.clear();
                Effect::Repaint
            }
            SessionEvent::LogFileChanged(path) => {
                if self.is_flow_log(&path) && self.highlights.on_log_changed(&path) {
                    Effect::Repaint
                } else {
                    Effect::None
                }
            }
            SessionEvent::Refresh => {
                info!("refreshing discovered tasks");
                self.cache.invalidate();
                Effect::Repaint
            }
        }
    }

    /// [`handle`](Self::handle), then push the repaint to `tree`.
    pub fn apply(&self, event: SessionEvent, tree: &dyn TreeHost) -> Effect {
        let effect = self.handle(event);
        if effect == Effect::Repaint {
            tree.invalidate();
        }
        effect
    }

    /// Children of `parent`, or the workspace roots for `None`.
    pub async fn children(&self, parent: Option<&TreeNode>) -> Vec<TreeNode> {
        let discovery = self.cache.current().await;
        let highlights = self.highlights.snapshot();
        projector::children(&discovery, &highlights, parent)
    }

    /// Launch the action a node command refers to. `Ok(None)` when the node
    /// has nothing for that command.
    pub async fn dispatch(
        &self,
        host: &dyn TaskHost,
        node: &TreeNode,
        command: NodeCommand,
    ) -> Result<Option<TaskHandle>> {
        let Some(action) = node.command_target(command) else {
            debug!(node = %node.label, ?command, "no action for command");
            return Ok(None);
        };
        host.execute(action).await.map(Some)
    }

    /// `.log` files only, and only under the known log directory.
    fn is_flow_log(&self, path: &Path) -> bool {
        if path.extension().is_none_or(|ext| ext != "log") {
            return false;
        }
        match self.cache.peek().and_then(|d| d.environment.clone()) {
            Some(env) => path.starts_with(env.logs_dir()),
            None => true,
        }
    }
}
