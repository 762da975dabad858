// Process execution and the shell-backed task host

pub mod executor;
pub mod task_host;

pub use executor::{CommandExecutor, CommandOutput};
pub use task_host::{ShellTaskHost, TaskRecord, TaskStatus};
