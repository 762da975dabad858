use std::path::{Path, PathBuf};

/// Placeholder used when the build tool did not report a value.
pub const UNKNOWN: &str = "unknown";

/// Builds `make` command lines against the flow's build root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeInvocation {
    pub build_root: PathBuf,
    /// Absolute path of the workspace's `config.mk`, only set if it exists.
    pub design_config: Option<PathBuf>,
}

impl MakeInvocation {
    pub fn new(build_root: impl Into<PathBuf>, design_config: Option<PathBuf>) -> Self {
        Self {
            build_root: build_root.into(),
            design_config,
        }
    }

    /// `make -C <root> [DESIGN_CONFIG=<cfg>] <args>`
    pub fn command(&self, args: &str) -> String {
        let mut cmd = format!("make -C {}", self.build_root.display());
        if let Some(config) = &self.design_config {
            cmd.push_str(&format!(" DESIGN_CONFIG={}", config.display()));
        }
        cmd.push(' ');
        cmd.push_str(args);
        cmd
    }

    /// Dry-run target enumeration filtered by an extended regex.
    pub fn list_targets(&self, pattern: &str) -> String {
        self.command(&format!(
            "-np | grep -E '^[a-zA-Z0-9_-]+:.*?($|:| )' | cut -d ':' -f 1 | sort | uniq | grep -E '{pattern}'"
        ))
    }

    /// Value of a make variable through the `print-<VAR>` target.
    pub fn print_variable(&self, var: &str) -> String {
        self.command(&format!(
            "print-{var} 2>/dev/null | grep {var} | tr ' ' '\\n' | tail -n 1"
        ))
    }
}

/// `<root>/logs/<platform>/<nickname>/base/<file>`
pub fn log_path(
    build_root: &Path,
    platform: Option<&str>,
    nickname: Option<&str>,
    file_name: &str,
) -> PathBuf {
    build_root
        .join("logs")
        .join(platform.unwrap_or(UNKNOWN))
        .join(nickname.unwrap_or(UNKNOWN))
        .join("base")
        .join(file_name)
}

/// Shell snippet that opens the log in the editor, or reports that it is
/// missing. Always exits successfully.
pub fn open_log_command(editor: &str, log: &Path) -> String {
    let log = log.display();
    format!("if [ -f '{log}' ]; then {editor} '{log}'; else echo \"Log file not found: {log}\"; fi")
}
