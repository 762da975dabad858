use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Settings;

/// Daily files are named `orfs.<date>`.
const LOG_FILE_PREFIX: &str = "orfs";

const CRATES: &[&str] = &[
    "orfs_app",
    "orfs_core",
    "orfs_fs",
    "orfs_tasks",
    "orfs_terminal",
    "orfs_tree",
];

/// `level` for this workspace's crates, `warn` for everything else.
pub fn default_filter(level: &str) -> String {
    let mut filter = String::from("warn");
    for name in CRATES {
        filter.push_str(&format!(",{name}={level}"));
    }
    filter
}

/// File logging under `~/.orfs/logs` plus compact console output.
/// `RUST_LOG` takes precedence over `level`. Keep the guard alive for the
/// lifetime of the process.
pub fn init_logging(level: &str) -> Result<WorkerGuard> {
    install(&Settings::logs_dir()?, &default_filter(level), true)
}

/// File logging only, into `logs_dir`.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    install(logs_dir, filter, false)
}

fn install(logs_dir: &Path, filter: &str, console: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory: {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_ansi(false)
        .with_writer(writer);
    let console_layer = console.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}
