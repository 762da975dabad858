use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Log file activity the tree cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Modified(p) => p,
        }
    }
}

/// Watches the flow's log directory for `*.log` creations and changes.
pub struct LogWatcher {
    logs_dir: PathBuf,
    _watcher: RecommendedWatcher,
}

impl LogWatcher {
    /// Start watching `logs_dir`.
    ///
    /// The directory does not have to exist yet: the nearest existing
    /// ancestor is watched instead and events outside `logs_dir` are
    /// dropped. The watcher stays active as long as this struct is alive.
    pub fn new(logs_dir: &Path, callback: impl Fn(WatchEvent) + Send + 'static) -> Result<Self> {
        let root = logs_dir.to_path_buf();
        let filter_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    for watch_event in translate_event(&event, &filter_root) {
                        callback(watch_event);
                    }
                }
                Err(e) => {
                    warn!("Log watcher error: {e}");
                }
            }
        })
        .context("Failed to create log watcher")?;

        let watch_path = nearest_existing(&root)
            .with_context(|| format!("No existing ancestor for {}", root.display()))?;
        watcher
            .watch(&watch_path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch path: {}", watch_path.display()))?;

        debug!("Watching logs under {} (via {})", root.display(), watch_path.display());
        Ok(Self {
            logs_dir: root,
            _watcher: watcher,
        })
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }
}

fn nearest_existing(path: &Path) -> Option<PathBuf> {
    path.ancestors().find(|p| p.is_dir()).map(Path::to_path_buf)
}

fn is_log_under(path: &Path, logs_dir: &Path) -> bool {
    path.starts_with(logs_dir) && path.extension().is_some_and(|ext| ext == "log")
}

/// Translate a raw `notify::Event` into zero or more `WatchEvent`s.
fn translate_event(event: &Event, logs_dir: &Path) -> Vec<WatchEvent> {
    let logs = event.paths.iter().filter(|p| is_log_under(p, logs_dir));

    match &event.kind {
        EventKind::Create(_) => logs.map(|p| WatchEvent::Created(p.clone())).collect(),
        EventKind::Modify(modify_kind) => {
            use notify::event::ModifyKind;
            match modify_kind {
                // A rename reports the old path first; only the destination
                // is a live log.
                ModifyKind::Name(_) if event.paths.len() >= 2 => event.paths[1..]
                    .iter()
                    .filter(|p| is_log_under(p, logs_dir))
                    .map(|p| WatchEvent::Created(p.clone()))
                    .collect(),
                _ => logs.map(|p| WatchEvent::Modified(p.clone())).collect(),
            }
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn logs() -> PathBuf {
        PathBuf::from("/orfs/flow/logs")
    }

    #[test]
    fn test_watcher_detects_log_creation() {
        let dir = tempfile::tempdir().unwrap();
        let logs_dir = dir.path().join("logs").join("nangate45").join("gcd").join("base");
        fs::create_dir_all(&logs_dir).unwrap();
        let events: Arc<Mutex<Vec<WatchEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);

        let _watcher = LogWatcher::new(&dir.path().join("logs"), move |event| {
            events_clone.lock().unwrap().push(event);
        })
        .unwrap();

        // Give the watcher time to initialize
        std::thread::sleep(Duration::from_millis(100));

        fs::write(logs_dir.join("2_1_floorplan.log"), "start").unwrap();
        fs::write(logs_dir.join("notes.txt"), "ignored").unwrap();

        // Wait for events to propagate
        std::thread::sleep(Duration::from_millis(500));

        let captured = events.lock().unwrap();
        assert!(!captured.is_empty(), "Expected an event from log creation");
        assert!(captured.iter().all(|e| e.path().extension().unwrap() == "log"));
    }

    #[test]
    fn test_watcher_accepts_missing_logs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = LogWatcher::new(&dir.path().join("logs"), |_| {}).unwrap();
        assert_eq!(watcher.logs_dir(), dir.path().join("logs"));
    }

    #[test]
    fn test_translate_create_event() {
        let event = Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![logs().join("nangate45/gcd/base/3_1_place_gp.log")],
            attrs: Default::default(),
        };
        let translated = translate_event(&event, &logs());
        assert_eq!(translated.len(), 1);
        assert!(matches!(&translated[0], WatchEvent::Created(p) if p.ends_with("3_1_place_gp.log")));
    }

    #[test]
    fn test_translate_ignores_non_log_and_outside_paths() {
        let event = Event {
            kind: EventKind::Modify(notify::event::ModifyKind::Any),
            paths: vec![
                logs().join("nangate45/gcd/base/2_floorplan.tmp"),
                PathBuf::from("/orfs/flow/results/2_floorplan.log"),
            ],
            attrs: Default::default(),
        };
        assert!(translate_event(&event, &logs()).is_empty());
    }

    #[test]
    fn test_translate_rename_reports_destination() {
        let event = Event {
            kind: EventKind::Modify(notify::event::ModifyKind::Name(
                notify::event::RenameMode::Both,
            )),
            paths: vec![
                logs().join("nangate45/gcd/base/6_report.tmp"),
                logs().join("nangate45/gcd/base/6_report.log"),
            ],
            attrs: Default::default(),
        };
        let translated = translate_event(&event, &logs());
        assert_eq!(translated, vec![WatchEvent::Created(logs().join("nangate45/gcd/base/6_report.log"))]);
    }

    #[test]
    fn test_translate_delete_is_ignored() {
        let event = Event {
            kind: EventKind::Remove(notify::event::RemoveKind::File),
            paths: vec![logs().join("nangate45/gcd/base/2_floorplan.log")],
            attrs: Default::default(),
        };
        assert!(translate_event(&event, &logs()).is_empty());
    }
}
