use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::host::SettingsSource;

/// Setting keys as they appear in `settings.json`.
pub const KEY_FLOW_PATH: &str = "openroad-flow-scripts.path";
pub const KEY_DESIGN_CONFIG: &str = "openroad-flow-scripts.design config";
pub const KEY_EDITOR: &str = "openroad-flow-scripts.editor";

const DEFAULT_EDITOR: &str = "code -r";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// User settings stored at `~/.orfs/settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// OpenROAD-flow-scripts checkout. The build tool lives in its `flow/`.
    #[serde(rename = "openroad-flow-scripts.path")]
    pub flow_path: Option<String>,

    /// Directory, relative to each workspace, holding `config.mk`.
    #[serde(rename = "openroad-flow-scripts.design config")]
    pub design_config: Option<String>,

    /// Command used to open a log file in the editor.
    #[serde(rename = "openroad-flow-scripts.editor")]
    pub editor: String,

    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            flow_path: None,
            design_config: None,
            editor: DEFAULT_EDITOR.into(),
            log_level: "info".into(),
        }
    }
}

impl Settings {
    /// Returns the base settings directory: `~/.orfs/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".orfs"))
    }

    /// Returns the settings file path: `~/.orfs/settings.json`
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("settings.json"))
    }

    /// Returns the logs directory: `~/.orfs/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Look up a setting by its key. Empty strings count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            KEY_FLOW_PATH => self.flow_path.clone(),
            KEY_DESIGN_CONFIG => self.design_config.clone(),
            KEY_EDITOR => Some(self.editor.clone()),
            "log_level" => Some(self.log_level.clone()),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }

    /// Load settings from a specific file path, creating the default file if
    /// it is missing.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings: {}", path.display()))?;
            let settings: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            info!("Loaded settings from {}", path.display());
            Ok(settings)
        } else {
            let settings = Self::default();
            settings.save_to_path(path)?;
            info!("Created default settings at {}", path.display());
            Ok(settings)
        }
    }

    /// Save settings to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SettingsManager
// ---------------------------------------------------------------------------

/// Thread-safe settings holder with a file watcher for hot reload.
///
/// Every effective change (update or reload that alters a value) is broadcast
/// to subscribers.
pub struct SettingsManager {
    settings: Arc<RwLock<Settings>>,
    path: Option<PathBuf>,
    changes: broadcast::Sender<()>,
    _watcher: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("path", &self.path)
            .field("settings", &*self.settings.read())
            .finish()
    }
}

impl SettingsManager {
    /// Open `~/.orfs/settings.json`.
    pub fn new() -> Result<Self> {
        Self::open(Settings::settings_path()?)
    }

    /// Open a settings file and watch it for changes.
    pub fn open(path: PathBuf) -> Result<Self> {
        let settings = Arc::new(RwLock::new(Settings::load_from_path(&path)?));
        let (changes, _) = broadcast::channel(16);
        let watcher = Self::setup_watcher(Arc::clone(&settings), path.clone(), changes.clone())?;

        Ok(Self {
            settings,
            path: Some(path),
            changes,
            _watcher: Some(watcher),
        })
    }

    /// Settings that live only in memory. Updates are never persisted.
    pub fn in_memory(settings: Settings) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path: None,
            changes,
            _watcher: None,
        }
    }

    /// Get a clone of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Mutate the settings, persist them if file-backed, and notify
    /// subscribers when something actually changed.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        let changed = {
            let mut settings = self.settings.write();
            let before = settings.clone();
            f(&mut settings);
            if let Some(path) = &self.path {
                settings.save_to_path(path)?;
            }
            *settings != before
        };
        if changed {
            let _ = self.changes.send(());
        }
        Ok(())
    }

    /// Receive a unit message on every settings change.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn setup_watcher(
        settings: Arc<RwLock<Settings>>,
        path: PathBuf,
        changes: broadcast::Sender<()>,
    ) -> Result<RecommendedWatcher> {
        let watch_dir = path
            .parent()
            .context("Settings path has no parent directory")?
            .to_path_buf();
        let file_name = path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
            let Ok(event) = res else {
                return;
            };
            let touches_settings = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if !touches_settings {
                return;
            }
            match Settings::load_from_path(&path) {
                Ok(reloaded) => {
                    let mut current = settings.write();
                    if *current != reloaded {
                        *current = reloaded;
                        drop(current);
                        info!("Settings hot-reloaded");
                        let _ = changes.send(());
                    } else {
                        debug!("Settings file touched without changes");
                    }
                }
                Err(e) => warn!("Failed to hot-reload settings: {e}"),
            }
        })?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}

impl SettingsSource for SettingsManager {
    fn get(&self, key: &str) -> Option<String> {
        self.settings.read().get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_settings_values() {
        let settings = Settings::default();
        assert!(settings.flow_path.is_none());
        assert!(settings.design_config.is_none());
        assert_eq!(settings.editor, "code -r");
        assert_eq!(settings.get(KEY_EDITOR).as_deref(), Some("code -r"));
    }

    #[test]
    fn get_treats_empty_as_unset() {
        let settings = Settings {
            flow_path: Some(String::new()),
            design_config: Some("designs/gcd".into()),
            ..Settings::default()
        };
        assert!(settings.get(KEY_FLOW_PATH).is_none());
        assert_eq!(settings.get(KEY_DESIGN_CONFIG).as_deref(), Some("designs/gcd"));
        assert!(settings.get("no.such.key").is_none());
    }

    #[test]
    fn settings_json_uses_extension_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let settings = Settings {
            flow_path: Some("/opt/orfs".into()),
            ..Settings::default()
        };
        settings.save_to_path(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"openroad-flow-scripts.path\""));
        assert!(raw.contains("/opt/orfs"));

        let loaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn load_missing_file_creates_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let loaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(loaded, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"openroad-flow-scripts.design config": "cfg"}"#).unwrap();
        let loaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(loaded.design_config.as_deref(), Some("cfg"));
        assert_eq!(loaded.editor, "code -r");
    }

    #[test]
    fn in_memory_update_notifies_only_on_change() {
        let manager = SettingsManager::in_memory(Settings::default());
        let mut rx = manager.subscribe();

        manager.update(|_| {}).unwrap();
        assert!(rx.try_recv().is_err());

        manager
            .update(|s| s.flow_path = Some("/opt/orfs".into()))
            .unwrap();
        assert!(rx.try_recv().is_ok());
        assert_eq!(
            SettingsSource::get(&manager, KEY_FLOW_PATH).as_deref(),
            Some("/opt/orfs")
        );
        assert!(manager.path().is_none());
    }

    #[test]
    fn file_backed_update_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let manager = SettingsManager::open(path.clone()).unwrap();
        manager
            .update(|s| s.design_config = Some("flow/designs/gcd".into()))
            .unwrap();

        let reloaded = Settings::load_from_path(&path).unwrap();
        assert_eq!(reloaded.design_config.as_deref(), Some("flow/designs/gcd"));
    }

    #[test]
    fn hot_reload_picks_up_external_edit() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        let manager = SettingsManager::open(path.clone()).unwrap();
        let mut rx = manager.subscribe();

        // Give the watcher time to initialize
        std::thread::sleep(Duration::from_millis(100));

        let edited = Settings {
            flow_path: Some("/elsewhere".into()),
            ..Settings::default()
        };
        edited.save_to_path(&path).unwrap();

        // Wait for events to propagate
        std::thread::sleep(Duration::from_millis(500));

        assert_eq!(manager.snapshot().flow_path.as_deref(), Some("/elsewhere"));
        assert!(rx.try_recv().is_ok());
    }
}
