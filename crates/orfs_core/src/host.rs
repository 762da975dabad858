//! Capabilities the discovery engine and projector consume from the host.
//!
//! Each trait is deliberately narrow so the core can be exercised with fakes.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::action::Action;

// ---------------------------------------------------------------------------
// Process execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A command that could not be run or exited unsuccessfully. Whatever the
/// process printed before failing is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecError {
    pub message: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a shell command line in `cwd`.
    async fn execute(&self, command_line: &str, cwd: &Path) -> Result<ExecOutput, ExecError>;
}

// ---------------------------------------------------------------------------
// Filesystem and settings
// ---------------------------------------------------------------------------

pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

pub trait SettingsSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Task execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: String,
    pub action_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    pub handle: TaskHandle,
    pub exit_code: Option<i32>,
}

/// Supplies the tasks registered under a task type tag.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    async fn provide_tasks(&self) -> Vec<Action>;
}

#[async_trait]
pub trait TaskHost: Send + Sync {
    fn register(&self, task_type: &str, provider: Arc<dyn TaskProvider>);

    /// All tasks currently offered by the provider registered for `task_type`.
    async fn fetch_tasks(&self, task_type: &str) -> Vec<Action>;

    /// Start an action. Returns once the task has been launched.
    async fn execute(&self, action: &Action) -> anyhow::Result<TaskHandle>;

    /// Notified each time a launched task finishes.
    fn subscribe_completions(&self) -> broadcast::Receiver<TaskCompletion>;
}

// ---------------------------------------------------------------------------
// Tree view
// ---------------------------------------------------------------------------

/// Push side of the tree view. The host re-pulls children after this fires.
pub trait TreeHost: Send + Sync {
    fn invalidate(&self);
}
