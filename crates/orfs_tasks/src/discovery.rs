//! Build target discovery.
//!
//! Each workspace folder is queried with a handful of read-only `make`
//! invocations. Every query fails independently; a failed query only empties
//! its own category. Nothing in here returns an error to the caller: problems
//! are written to the [`OutputChannel`] and the result shrinks.

use orfs_core::config::{KEY_DESIGN_CONFIG, KEY_EDITOR, KEY_FLOW_PATH};
use orfs_core::{
    Action, ActionKind, OrfsError, OutputChannel, PathProbe, ProcessRunner, SettingsSource,
    Workspace,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::classify::{Classification, classify};
use crate::invocation::{MakeInvocation, UNKNOWN, log_path, open_log_command};
use crate::overrides::OverrideTable;

const DEFAULT_EDITOR: &str = "code -r";

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Validated flow location plus the settings discovery depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEnvironment {
    /// OpenROAD-flow-scripts checkout.
    pub flow_home: PathBuf,
    /// `<flow_home>/flow`, where the Makefile lives.
    pub build_root: PathBuf,
    /// Directory relative to each workspace that holds `config.mk`.
    pub design_config: Option<String>,
    pub editor: String,
}

impl FlowEnvironment {
    pub fn logs_dir(&self) -> PathBuf {
        self.build_root.join("logs")
    }

    /// `<workspace>/<design config>/config.mk`
    pub fn config_file(&self, workspace: &Workspace) -> PathBuf {
        let mut path = workspace.path.clone();
        if let Some(sub) = self.design_config.as_deref().filter(|s| !s.is_empty()) {
            path.push(sub);
        }
        path.join("config.mk")
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Everything discovered for one workspace folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDiscovery {
    pub workspace: Workspace,
    pub platform: Option<String>,
    pub nickname: Option<String>,
    pub actions: Vec<Action>,
}

impl WorkspaceDiscovery {
    pub fn empty(workspace: Workspace) -> Self {
        Self {
            workspace,
            platform: None,
            nickname: None,
            actions: Vec::new(),
        }
    }

    /// `<platform>/<nickname>`
    pub fn label(&self) -> String {
        format!(
            "{}/{}",
            self.platform.as_deref().unwrap_or(UNKNOWN),
            self.nickname.as_deref().unwrap_or(UNKNOWN)
        )
    }

    pub fn find(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }
}

/// One complete discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub environment: Option<FlowEnvironment>,
    pub workspaces: Vec<WorkspaceDiscovery>,
}

impl Discovery {
    /// All actions of all workspaces, in discovery order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.workspaces.iter().flat_map(|w| w.actions.iter())
    }

    pub fn workspace(&self, name: &str) -> Option<&WorkspaceDiscovery> {
        self.workspaces.iter().find(|w| w.workspace.name == name)
    }
}

/// Raw query results for one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetListing {
    pub do_targets: Vec<String>,
    pub gui_targets: Vec<String>,
    pub clean_targets: Vec<String>,
    pub platform: Option<String>,
    pub nickname: Option<String>,
}

// ---------------------------------------------------------------------------
// TaskDiscovery
// ---------------------------------------------------------------------------

/// The discovery engine. Cheap to share behind an `Arc`.
pub struct TaskDiscovery {
    runner: Arc<dyn ProcessRunner>,
    probe: Arc<dyn PathProbe>,
    settings: Arc<dyn SettingsSource>,
    output: OutputChannel,
    overrides: OverrideTable,
}

impl TaskDiscovery {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        probe: Arc<dyn PathProbe>,
        settings: Arc<dyn SettingsSource>,
        output: OutputChannel,
    ) -> Self {
        Self {
            runner,
            probe,
            settings,
            output,
            overrides: OverrideTable::builtin(),
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn output(&self) -> &OutputChannel {
        &self.output
    }

    pub fn settings(&self) -> &Arc<dyn SettingsSource> {
        &self.settings
    }

    /// Validate the configured flow checkout.
    ///
    /// Returns `None`, after logging why, when the flow cannot be used.
    pub fn resolve_environment(&self) -> Option<FlowEnvironment> {
        let Some(flow_home) = self.settings.get(KEY_FLOW_PATH) else {
            self.output.report(&OrfsError::Configuration(
                "OpenROAD-flow-scripts directory is not provided in the configuration.".into(),
            ));
            self.output.report(&OrfsError::Configuration(format!(
                "Please configure the {KEY_FLOW_PATH} setting to a checkout of \
                 https://github.com/The-OpenROAD-Project/OpenROAD-flow-scripts."
            )));
            return None;
        };
        let flow_home = PathBuf::from(flow_home);
        let build_root = flow_home.join("flow");

        if !self.probe.exists(&build_root) {
            self.output.report(&OrfsError::Configuration(format!(
                "{} does not exist. Please provide correct {KEY_FLOW_PATH}",
                build_root.display()
            )));
            return None;
        }
        let makefile = build_root.join("Makefile");
        if !self.probe.exists(&makefile) {
            self.output.report(&OrfsError::Configuration(format!(
                "{} does not exist. {} is not an OpenROAD-flow-scripts checkout",
                makefile.display(),
                flow_home.display()
            )));
            return None;
        }

        let design_config = self.settings.get(KEY_DESIGN_CONFIG);
        if design_config.is_none() {
            self.output.info("Design config path has not been set in settings");
            self.output.info("This will search for config.mk file in workspace root");
            self.output.info(
                "If this approach fails, all started flows will process the default ORFS target",
            );
        }

        Some(FlowEnvironment {
            flow_home,
            build_root,
            design_config,
            editor: self
                .settings
                .get(KEY_EDITOR)
                .unwrap_or_else(|| DEFAULT_EDITOR.into()),
        })
    }

    /// Run discovery for every workspace folder.
    pub async fn discover(&self, workspaces: &[Workspace]) -> Discovery {
        let Some(env) = self.resolve_environment() else {
            return Discovery {
                environment: None,
                workspaces: workspaces
                    .iter()
                    .cloned()
                    .map(WorkspaceDiscovery::empty)
                    .collect(),
            };
        };
        self.output
            .info(format!("OpenROAD-flow-scripts path: {}", env.flow_home.display()));

        let runs = workspaces.iter().map(|ws| self.discover_actions(&env, ws));
        let results = futures::future::join_all(runs).await;

        Discovery {
            environment: Some(env),
            workspaces: results,
        }
    }

    /// Query the build tool for one workspace and synthesize its actions.
    pub async fn discover_actions(
        &self,
        env: &FlowEnvironment,
        workspace: &Workspace,
    ) -> WorkspaceDiscovery {
        let config_file = env.config_file(workspace);
        let design_config = if self.probe.exists(&config_file) {
            Some(config_file)
        } else {
            self.output.report(&OrfsError::ConfigFileMissing(config_file));
            None
        };
        let make = MakeInvocation::new(env.build_root.clone(), design_config);

        let (do_out, gui_out, clean_out, platform, nickname) = tokio::join!(
            self.query(workspace, make.list_targets("^(do-[0-9])")),
            self.query(workspace, make.list_targets("^gui_")),
            self.query(workspace, make.list_targets("^clean")),
            self.query(workspace, make.print_variable("PLATFORM")),
            self.query(workspace, make.print_variable("DESIGN_NICKNAME")),
        );

        let listing = TargetListing {
            do_targets: lines(do_out),
            gui_targets: lines(gui_out),
            clean_targets: lines(clean_out),
            platform: scalar(platform),
            nickname: scalar(nickname),
        };
        self.output.info(format!(
            "PLATFORM: {}",
            listing.platform.as_deref().unwrap_or(UNKNOWN)
        ));
        self.output.info(format!(
            "NICKNAME: {}",
            listing.nickname.as_deref().unwrap_or(UNKNOWN)
        ));

        let actions = synthesize(env, workspace, &make, &listing, &self.overrides);
        debug!(
            workspace = %workspace.name,
            count = actions.len(),
            "discovered actions"
        );

        WorkspaceDiscovery {
            workspace: workspace.clone(),
            platform: listing.platform,
            nickname: listing.nickname,
            actions,
        }
    }

    /// Run one query. Any failure is logged and yields `None`.
    async fn query(&self, workspace: &Workspace, command: String) -> Option<String> {
        match self.runner.execute(&command, &workspace.path).await {
            Ok(out) => {
                if !out.stderr.trim().is_empty() {
                    self.output.report(&OrfsError::ExternalTool {
                        command: command.clone(),
                        stderr: out.stderr,
                    });
                }
                Some(out.stdout).filter(|s| !s.is_empty())
            }
            Err(err) => {
                if !err.stderr.trim().is_empty() {
                    self.output.report(&OrfsError::ExternalTool {
                        command: command.clone(),
                        stderr: err.stderr.clone(),
                    });
                }
                if !err.stdout.trim().is_empty() {
                    self.output.info(err.stdout.trim_end());
                }
                debug!(cmd = %command, error = %err, "query yielded no result");
                None
            }
        }
    }
}

fn lines(output: Option<String>) -> Vec<String> {
    output
        .map(|s| {
            s.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn scalar(output: Option<String>) -> Option<String> {
    output
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Action synthesis
// ---------------------------------------------------------------------------

/// Turn raw target names into actions. Pure: same listing, same actions.
///
/// Names are unique in the result; a later target that maps onto an
/// already-used name is dropped.
pub fn synthesize(
    env: &FlowEnvironment,
    workspace: &Workspace,
    make: &MakeInvocation,
    listing: &TargetListing,
    overrides: &OverrideTable,
) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |action: Action| {
        if seen.insert(action.name.clone()) {
            actions.push(action);
        } else {
            debug!(name = %action.name, "dropping duplicate action");
        }
    };
    let action = |kind, name: &str, target: &str, invocation: String| Action {
        kind,
        name: name.to_string(),
        target: target.to_string(),
        invocation,
        workspace: workspace.clone(),
    };
    let log_action = |name: &str, target: &str, file_name: &str| {
        let path = log_path(
            &env.build_root,
            listing.platform.as_deref(),
            listing.nickname.as_deref(),
            file_name,
        );
        action(
            ActionKind::Log,
            &format!("log {name}"),
            target,
            open_log_command(&env.editor, &path),
        )
    };

    for raw in listing.do_targets.iter().map(String::as_str) {
        match classify(raw, overrides) {
            Classification::Override(entry) => {
                push(action(
                    ActionKind::Build,
                    entry.display_name,
                    raw,
                    make.command(entry.launch_args),
                ));
                if let Some(file_name) = entry.log_file_name {
                    push(log_action(entry.display_name, raw, file_name));
                }
            }
            Classification::MajorStep {
                display_name,
                launch,
            } => push(action(
                ActionKind::Build,
                &display_name,
                raw,
                make.command(&launch),
            )),
            Classification::MinorStep { display_name } => {
                push(action(ActionKind::Build, &display_name, raw, make.command(raw)));
                push(log_action(
                    &display_name,
                    raw,
                    &format!("{display_name}.log"),
                ));
            }
            Classification::Unrecognized => {
                debug!(target = %raw, "ignoring unrecognized target");
            }
        }
    }

    let direct = [
        (ActionKind::Gui, &listing.gui_targets),
        (ActionKind::Clean, &listing.clean_targets),
    ];
    for (kind, raws) in direct {
        for raw in raws.iter().map(String::as_str) {
            let (name, launch) = match overrides.lookup(raw) {
                Some(entry) => (entry.display_name, entry.launch_args),
                None => (raw, raw),
            };
            push(action(kind, name, raw, make.command(launch)));
        }
    }

    actions
}
