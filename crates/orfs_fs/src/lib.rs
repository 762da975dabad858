// Path probing and log directory watching

pub mod probe;
pub mod watcher;

pub use probe::FsProbe;
pub use watcher::{LogWatcher, WatchEvent};
