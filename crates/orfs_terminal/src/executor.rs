use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use orfs_core::{ExecError, ExecOutput, ProcessRunner};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Maximum output size in bytes (4 MB). `make -np` on a full flow prints a
/// lot; anything beyond this is truncated.
const MAX_OUTPUT_BYTES: usize = 4 * 1_048_576;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The captured result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ---------------------------------------------------------------------------
// CommandExecutor
// ---------------------------------------------------------------------------

/// Runs shell command lines through `sh -c` (or `cmd /c` on Windows).
///
/// No timeout is applied unless one is configured with [`with_timeout`].
///
/// [`with_timeout`]: CommandExecutor::with_timeout
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    timeout: Option<Duration>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Execute a command in `working_dir` with the configured timeout.
    pub async fn execute_in(&self, command: &str, working_dir: &Path) -> Result<CommandOutput> {
        match self.timeout {
            Some(timeout) => self.execute_with_timeout(command, working_dir, timeout).await,
            None => run(command, working_dir).await,
        }
    }

    /// Execute a command with an explicit timeout, killing it on expiry.
    pub async fn execute_with_timeout(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        match tokio::time::timeout(timeout, run(command, working_dir)).await {
            Ok(result) => result,
            Err(_) => {
                // The child is spawned with kill_on_drop, dropping the future
                // has already killed it.
                warn!(cmd = command, "command timed out, killing process");
                bail!(
                    "Command timed out after {:.1}s: {command}",
                    timeout.as_secs_f64()
                );
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for CommandExecutor {
    async fn execute(&self, command_line: &str, cwd: &Path) -> Result<ExecOutput, ExecError> {
        match self.execute_in(command_line, cwd).await {
            Ok(output) if output.success() => Ok(ExecOutput {
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Ok(output) => Err(ExecError {
                message: format!("Command exited with code {}: {command_line}", output.exit_code),
                stdout: output.stdout,
                stderr: output.stderr,
                exit_code: Some(output.exit_code),
            }),
            Err(e) => Err(ExecError {
                message: format!("{e:#}"),
                ..ExecError::default()
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn run(command: &str, working_dir: &Path) -> Result<CommandOutput> {
    validate_working_dir(working_dir)?;

    debug!(cmd = command, dir = %working_dir.display(), "executing command");

    let mut child = build_command(command, working_dir)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .context("Failed to spawn child process")?;

    let start = Instant::now();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (stdout_buf, stderr_buf) = tokio::try_join!(read_capped(stdout), read_capped(stderr))?;
    let status = child.wait().await.context("Failed to wait for process")?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        exit_code: status.code().unwrap_or(-1),
        duration: start.elapsed(),
    })
}

async fn read_capped<R: AsyncRead + Unpin>(stream: Option<R>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(stream) = stream {
        stream
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await
            .context("Failed to read process output")?;
    }
    Ok(buf)
}

/// Build a platform-appropriate `Command` that runs a shell string.
fn build_command(command: &str, working_dir: &Path) -> Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.arg("/c").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };
    cmd.current_dir(working_dir);
    cmd
}

fn validate_working_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        bail!("Working directory does not exist: {}", dir.display());
    }
    if !dir.is_dir() {
        bail!("Path is not a directory: {}", dir.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn executes_echo() {
        let dir = TempDir::new().unwrap();
        let output = CommandExecutor::new()
            .execute_in("echo hello", dir.path())
            .await
            .expect("echo should succeed");
        assert_eq!(output.stdout.trim(), "hello");
        assert!(output.success());
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let output = CommandExecutor::new()
            .execute_in("ls", dir.path())
            .await
            .unwrap();
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn captures_stderr() {
        let dir = TempDir::new().unwrap();
        let output = CommandExecutor::new()
            .execute_in("echo error_text >&2", dir.path())
            .await
            .unwrap();
        assert!(output.stderr.contains("error_text"), "stderr was: {}", output.stderr);
    }

    #[tokio::test]
    async fn runner_maps_nonzero_exit_to_exec_error() {
        let dir = TempDir::new().unwrap();
        let err = CommandExecutor::new()
            .execute("echo partial; echo boom >&2; exit 3", dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code, Some(3));
        assert_eq!(err.stdout.trim(), "partial");
        assert_eq!(err.stderr.trim(), "boom");
        assert!(err.message.contains("code 3"));
    }

    #[tokio::test]
    async fn runner_keeps_stderr_on_success() {
        let dir = TempDir::new().unwrap();
        let out = CommandExecutor::new()
            .execute("echo ok; echo note >&2", dir.path())
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "ok");
        assert_eq!(out.stderr.trim(), "note");
    }

    #[tokio::test]
    async fn runner_reports_missing_working_dir() {
        let err = CommandExecutor::new()
            .execute("true", Path::new("/no/such/orfs/dir"))
            .await
            .unwrap_err();
        assert!(err.message.contains("does not exist"), "got: {}", err.message);
        assert!(err.exit_code.is_none());
    }

    #[tokio::test]
    async fn timeout_kills_long_running_process() {
        let dir = TempDir::new().unwrap();
        let result = CommandExecutor::new()
            .execute_with_timeout("sleep 60", dir.path(), Duration::from_millis(200))
            .await;
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("timed out"), "got: {msg}");
    }

    #[test]
    fn validate_rejects_file_as_working_dir() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("afile.txt");
        std::fs::write(&file_path, "hi").unwrap();
        let msg = validate_working_dir(&file_path).unwrap_err().to_string();
        assert!(msg.contains("not a directory"), "got: {msg}");
    }
}
