use anyhow::{Context, Result, bail};
use orfs_core::{
    OutputChannel, SettingsManager, TASK_TYPE, TaskCompletion, TaskHandle, TaskHost, TreeHost,
    Workspace,
};
use orfs_fs::{FsProbe, LogWatcher};
use orfs_tasks::{DiscoveryCache, TaskDiscovery};
use orfs_terminal::{CommandExecutor, ShellTaskHost, TaskStatus};
use orfs_tree::{Effect, NodeCommand, Session, SessionEvent, TreeNode};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{info, warn};

use crate::render;

const CHANNEL_NAME: &str = "OpenROAD-flow-scripts";

// ---------------------------------------------------------------------------
// Console tree host
// ---------------------------------------------------------------------------

/// Repaint requests from the session, consumed by the watch loop.
#[derive(Default)]
struct ConsoleTree {
    changed: Notify,
}

impl TreeHost for ConsoleTree {
    fn invalidate(&self) {
        self.changed.notify_one();
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Wires the discovery engine, session and task host together.
pub struct App {
    settings: Arc<SettingsManager>,
    output: OutputChannel,
    host: Arc<ShellTaskHost>,
    session: Session,
    printed: AtomicUsize,
}

impl App {
    pub fn new(settings: Arc<SettingsManager>, workspaces: Vec<Workspace>) -> Self {
        let output = OutputChannel::new(CHANNEL_NAME);
        let engine = TaskDiscovery::new(
            Arc::new(CommandExecutor::new()),
            Arc::new(FsProbe),
            settings.clone(),
            output.clone(),
        );
        let cache = DiscoveryCache::new(Arc::new(engine), workspaces);
        let session = Session::new(Arc::new(cache));
        let host = Arc::new(ShellTaskHost::default());
        session.register(host.as_ref());

        Self {
            settings,
            output,
            host,
            session,
            printed: AtomicUsize::new(0),
        }
    }

    /// Print channel lines not shown yet, if the channel asked to be shown.
    pub fn flush_output(&self) {
        if !self.output.take_reveal() {
            return;
        }
        let from = self.printed.swap(self.output.appended(), Ordering::SeqCst);
        for line in self.output.lines_since(from) {
            eprintln!("{}", render::output_line(self.output.name(), &line));
        }
    }

    // -- Reading -----------------------------------------------------------

    async fn tree_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for root in self.session.children(None).await {
            lines.push(render::node_line(&root, 0));
            for stage in self.session.children(Some(&root)).await {
                lines.push(render::node_line(&stage, 1));
                if !stage.is_expandable() {
                    continue;
                }
                for substage in self.session.children(Some(&stage)).await {
                    lines.push(render::node_line(&substage, 2));
                }
            }
        }
        lines
    }

    pub async fn print_tree(&self) -> Result<()> {
        let lines = self.tree_lines().await;
        if lines.is_empty() {
            println!("No workspace discovered.");
        }
        for line in lines {
            println!("{line}");
        }
        Ok(())
    }

    pub async fn print_tasks(&self, json: bool) -> Result<()> {
        let tasks = self.host.fetch_tasks(TASK_TYPE).await;
        if json {
            let text =
                serde_json::to_string_pretty(&tasks).context("Failed to serialize tasks")?;
            println!("{text}");
        } else if !tasks.is_empty() {
            println!("{}", render::task_table(&tasks));
        }
        Ok(())
    }

    /// First node with this label, searching roots, stages and substages.
    async fn find_node(&self, label: &str) -> Option<TreeNode> {
        let mut level = self.session.children(None).await;
        while !level.is_empty() {
            if let Some(node) = level.iter().find(|n| n.label == label) {
                return Some(node.clone());
            }
            let mut next = Vec::new();
            for node in level.iter().filter(|n| n.is_expandable()) {
                next.extend(self.session.children(Some(node)).await);
            }
            level = next;
        }
        None
    }

    // -- Launching ---------------------------------------------------------

    /// Run `command` on the node labelled `name` and wait for it. `Run` also
    /// accepts any discovered action name, e.g. `clean_all`.
    pub async fn launch(&self, name: &str, command: NodeCommand) -> Result<()> {
        let mut completions = self.host.subscribe_completions();
        let handle = match self.find_node(name).await {
            Some(node) => self
                .session
                .dispatch(self.host.as_ref(), &node, command)
                .await?
                .with_context(|| {
                    format!("{} has no {} action", node.label, render::command_name(command))
                })?,
            None if command == NodeCommand::Run => {
                let tasks = self.host.fetch_tasks(TASK_TYPE).await;
                let action = tasks
                    .iter()
                    .find(|a| a.name == name)
                    .with_context(|| format!("No task named {name}"))?;
                self.host.execute(action).await?
            }
            None => bail!("No stage named {name}"),
        };
        self.wait(&mut completions, &handle).await
    }

    pub async fn clean(&self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) => self.launch(name, NodeCommand::Clean).await,
            None => {
                let roots = self.session.children(None).await;
                let root = roots.first().context("No workspace discovered")?;
                self.launch(&root.label, NodeCommand::Clean).await
            }
        }
    }

    async fn wait(
        &self,
        completions: &mut broadcast::Receiver<TaskCompletion>,
        handle: &TaskHandle,
    ) -> Result<()> {
        info!(task = %handle.action_name, "waiting for task");
        loop {
            let completion = completions
                .recv()
                .await
                .context("Task host stopped before the task completed")?;
            if completion.handle.id == handle.id {
                break;
            }
        }
        self.session.handle(SessionEvent::TaskCompleted);

        let record = self
            .host
            .status(&handle.id)
            .with_context(|| format!("Task record vanished: {}", handle.id))?;
        print!("{}", record.stdout);
        eprint!("{}", record.stderr);
        if record.status != TaskStatus::Completed {
            bail!(
                "{} failed (exit code {:?})",
                record.action_name,
                record.exit_code
            );
        }
        Ok(())
    }

    // -- Watching ----------------------------------------------------------

    async fn watch_logs(
        &self,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Option<LogWatcher>> {
        let Some(logs_dir) = self.session.logs_dir().await else {
            warn!("flow location unknown, log activity is not followed");
            return Ok(None);
        };
        let events = events.clone();
        let watcher = LogWatcher::new(&logs_dir, move |event| {
            let _ = events.send(SessionEvent::LogFileChanged(event.path().to_path_buf()));
        })?;
        info!("following logs under {}", logs_dir.display());
        Ok(Some(watcher))
    }

    /// Reprint the tree whenever the session asks for a repaint, until
    /// Ctrl-C.
    pub async fn watch(&self) -> Result<()> {
        let tree = ConsoleTree::default();
        let (events, mut event_rx) = mpsc::unbounded_channel();
        let mut settings_rx = self.settings.subscribe();
        let mut completions = self.host.subscribe_completions();

        self.print_tree().await?;
        self.flush_output();
        let mut _watcher = self.watch_logs(&events).await?;

        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    self.session.apply(event, &tree);
                }
                Ok(()) = settings_rx.recv() => {
                    if self.session.apply(SessionEvent::ConfigurationChanged, &tree) == Effect::Repaint {
                        _watcher = self.watch_logs(&events).await?;
                    }
                }
                Ok(_) = completions.recv() => {
                    self.session.apply(SessionEvent::TaskCompleted, &tree);
                }
                _ = tree.changed.notified() => {
                    println!();
                    self.print_tree().await?;
                    self.flush_output();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("watch interrupted");
                    break;
                }
            }
        }
        Ok(())
    }
}
