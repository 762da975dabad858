use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orfs_core::{Action, TaskCompletion, TaskHandle, TaskHost, TaskProvider};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::executor::CommandExecutor;

// ---------------------------------------------------------------------------
// Task status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// TaskRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub action_name: String,
    pub invocation: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl TaskRecord {
    fn start(action: &Action) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action_name: action.name.clone(),
            invocation: action.invocation.clone(),
            status: TaskStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    fn finish(&mut self, exit_code: Option<i32>, stdout: String, stderr: String) {
        self.status = if exit_code == Some(0) {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        self.completed_at = Some(Utc::now());
        self.exit_code = exit_code;
        self.stdout = stdout;
        self.stderr = stderr;
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            id: self.id.clone(),
            action_name: self.action_name.clone(),
        }
    }

    /// Returns `true` if the task has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.status != TaskStatus::Running
    }
}

// ---------------------------------------------------------------------------
// ShellTaskHost
// ---------------------------------------------------------------------------

/// Task host that runs each action's invocation as a background shell
/// process in the action's workspace folder.
pub struct ShellTaskHost {
    executor: CommandExecutor,
    providers: RwLock<HashMap<String, Arc<dyn TaskProvider>>>,
    tasks: Arc<Mutex<Vec<TaskRecord>>>,
    completions: broadcast::Sender<TaskCompletion>,
}

impl Default for ShellTaskHost {
    fn default() -> Self {
        Self::new(CommandExecutor::new())
    }
}

impl ShellTaskHost {
    pub fn new(executor: CommandExecutor) -> Self {
        let (completions, _) = broadcast::channel(64);
        Self {
            executor,
            providers: RwLock::new(HashMap::new()),
            tasks: Arc::new(Mutex::new(Vec::new())),
            completions,
        }
    }

    /// Look up a task by ID.
    pub fn status(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.lock().iter().find(|t| t.id == task_id).cloned()
    }

    pub fn list_tasks(&self) -> Vec<TaskRecord> {
        self.tasks.lock().clone()
    }

    /// Number of tasks still running.
    pub fn running_count(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }

    /// Remove all tasks that have reached a terminal state.
    pub fn cleanup_completed(&self) {
        self.tasks.lock().retain(|t| !t.is_finished());
    }

    /// Launch an action and wait until it finishes.
    pub async fn run_to_completion(&self, action: &Action) -> Result<TaskRecord> {
        let mut rx = self.completions.subscribe();
        let handle = self.execute(action).await?;
        loop {
            let completion = rx
                .recv()
                .await
                .context("Task host stopped before the task completed")?;
            if completion.handle.id == handle.id {
                break;
            }
        }
        self.status(&handle.id)
            .with_context(|| format!("Task record vanished: {}", handle.id))
    }
}

#[async_trait]
impl TaskHost for ShellTaskHost {
    fn register(&self, task_type: &str, provider: Arc<dyn TaskProvider>) {
        debug!(task_type, "registering task provider");
        self.providers.write().insert(task_type.to_string(), provider);
    }

    async fn fetch_tasks(&self, task_type: &str) -> Vec<Action> {
        let provider = self.providers.read().get(task_type).cloned();
        match provider {
            Some(provider) => provider.provide_tasks().await,
            None => {
                warn!(task_type, "no task provider registered");
                Vec::new()
            }
        }
    }

    async fn execute(&self, action: &Action) -> Result<TaskHandle> {
        let record = TaskRecord::start(action);
        let handle = record.handle();
        self.tasks.lock().push(record);

        info!(task = %action.name, cmd = %action.invocation, "starting task");

        let executor = self.executor.clone();
        let tasks = Arc::clone(&self.tasks);
        let completions = self.completions.clone();
        let invocation = action.invocation.clone();
        let cwd = action.workspace.path.clone();
        let task_handle = handle.clone();

        tokio::spawn(async move {
            let (exit_code, stdout, stderr) = match executor.execute_in(&invocation, &cwd).await {
                Ok(output) => (Some(output.exit_code), output.stdout, output.stderr),
                Err(e) => (None, String::new(), format!("{e:#}")),
            };
            if let Some(record) = tasks.lock().iter_mut().find(|t| t.id == task_handle.id) {
                record.finish(exit_code, stdout, stderr);
            }
            info!(task = %task_handle.action_name, ?exit_code, "task finished");
            let _ = completions.send(TaskCompletion {
                handle: task_handle,
                exit_code,
            });
        });

        Ok(handle)
    }

    fn subscribe_completions(&self) -> broadcast::Receiver<TaskCompletion> {
        self.completions.subscribe()
    }
}
