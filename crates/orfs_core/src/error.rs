use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Diagnostics raised while resolving the flow environment or querying the
/// build tool. None of these abort discovery; they are reported to the
/// output channel and the affected result degrades to empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrfsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("config.mk not found at {}", .0.display())]
    ConfigFileMissing(PathBuf),

    #[error("Build tool failed running `{command}`: {stderr}")]
    ExternalTool { command: String, stderr: String },
}

/// How loudly a diagnostic is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Degraded mode notice, discovery continues with defaults.
    Warning,
    /// Part of the result is missing.
    Error,
}

impl OrfsError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ConfigFileMissing(_) => ErrorSeverity::Warning,
            Self::Configuration(_) | Self::ExternalTool { .. } => ErrorSeverity::Error,
        }
    }

    /// Whether the output channel should be brought to front.
    pub fn reveals_output(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::ExternalTool { .. })
    }

    /// Line written to the output channel.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(msg) => msg.clone(),
            Self::ConfigFileMissing(_) => {
                "WARNING config.mk not found, all processing will use default targets in ORFS!"
                    .into()
            }
            Self::ExternalTool { stderr, .. } => stderr.trim_end().to_string(),
        }
    }
}
