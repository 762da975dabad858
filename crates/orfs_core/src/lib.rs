// Shared model, settings, diagnostics and host capabilities

pub mod action;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod output;

pub use action::{Action, ActionKind, TASK_TYPE, Workspace};
pub use config::{Settings, SettingsManager};
pub use error::{ErrorSeverity, OrfsError};
pub use host::{
    ExecError, ExecOutput, PathProbe, ProcessRunner, SettingsSource, TaskCompletion, TaskHandle,
    TaskHost, TaskProvider, TreeHost,
};
pub use output::{LineLevel, OutputChannel, OutputLine};
