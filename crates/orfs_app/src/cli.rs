//! Command line front end.
//!
//! Every subcommand runs discovery over the given workspace folders and then
//! either prints the result or launches one of the discovered actions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orfs_core::{Settings, SettingsManager, Workspace};
use orfs_tree::NodeCommand;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::App;

/// Browse and run OpenROAD-flow-scripts stages.
#[derive(Debug, Parser)]
#[command(name = "orfs", version)]
pub struct Cli {
    /// Settings file. Defaults to `~/.orfs/settings.json`.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Design workspace folder. Repeat for several. Defaults to the current
    /// directory.
    #[arg(long = "workspace", short = 'w', global = true)]
    workspaces: Vec<PathBuf>,

    /// OpenROAD-flow-scripts checkout, overriding the settings file.
    #[arg(long, global = true)]
    flow_path: Option<String>,

    /// Directory holding `config.mk`, relative to each workspace.
    #[arg(long, global = true)]
    design_config: Option<String>,

    /// Command used to open log files.
    #[arg(long, global = true)]
    editor: Option<String>,

    /// Log filter, e.g. `debug` or `orfs_tasks=trace`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the stage tree of every workspace.
    Tree,

    /// List every discovered action with its command line.
    Tasks {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Run a stage or substage, or any action by name.
    Run { name: String },

    /// Open the log of a stage or substage.
    Log { name: String },

    /// Clean a stage. Without a name, cleans the whole design.
    Clean { name: Option<String> },

    /// Open the GUI for a stage.
    Gui { name: String },

    /// Keep the tree on screen and follow log activity until interrupted.
    Watch,
}

impl Cli {
    /// The settings file, with command line overrides applied on top.
    ///
    /// Overrides are never written back; when any is given the settings are
    /// held in memory and file changes are no longer followed.
    pub fn open_settings(&self) -> Result<Arc<SettingsManager>> {
        let manager = match &self.settings {
            Some(path) => SettingsManager::open(path.clone())?,
            None => SettingsManager::new()?,
        };
        if self.flow_path.is_none() && self.design_config.is_none() && self.editor.is_none() {
            return Ok(Arc::new(manager));
        }

        let mut settings: Settings = manager.snapshot();
        if let Some(flow_path) = &self.flow_path {
            settings.flow_path = Some(flow_path.clone());
        }
        if let Some(design_config) = &self.design_config {
            settings.design_config = Some(design_config.clone());
        }
        if let Some(editor) = &self.editor {
            settings.editor = editor.clone();
        }
        Ok(Arc::new(SettingsManager::in_memory(settings)))
    }

    fn workspaces(&self) -> Result<Vec<Workspace>> {
        let dirs = if self.workspaces.is_empty() {
            vec![std::env::current_dir().context("Could not determine current directory")?]
        } else {
            self.workspaces.clone()
        };
        dirs.iter()
            .map(|dir| {
                let path = dir
                    .canonicalize()
                    .with_context(|| format!("Workspace not found: {}", dir.display()))?;
                Ok(Workspace::from_path(&path))
            })
            .collect()
    }

    pub async fn run(self, settings: Arc<SettingsManager>) -> Result<()> {
        let app = App::new(settings, self.workspaces()?);
        let result = match self.command {
            Command::Tree => app.print_tree().await,
            Command::Tasks { json } => app.print_tasks(json).await,
            Command::Run { name } => app.launch(&name, NodeCommand::Run).await,
            Command::Log { name } => app.launch(&name, NodeCommand::ShowLog).await,
            Command::Clean { name } => app.clean(name.as_deref()).await,
            Command::Gui { name } => app.launch(&name, NodeCommand::Gui).await,
            Command::Watch => app.watch().await,
        };
        app.flush_output();
        result
    }
}
