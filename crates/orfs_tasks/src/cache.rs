use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use orfs_core::config::{KEY_DESIGN_CONFIG, KEY_EDITOR, KEY_FLOW_PATH};
use orfs_core::{Action, TaskProvider, Workspace};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

use crate::discovery::{Discovery, TaskDiscovery};

type PendingDiscovery = Shared<BoxFuture<'static, Arc<Discovery>>>;

/// The settings baked into a memoized discovery. The editor ends up in every
/// log action's command line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SettingsKey {
    flow_path: Option<String>,
    design_config: Option<String>,
    editor: Option<String>,
}

/// Session-wide memo of the latest discovery run.
///
/// The pending future itself is cached, so readers that arrive while a run
/// is in flight await that same run instead of starting another one.
pub struct DiscoveryCache {
    engine: Arc<TaskDiscovery>,
    workspaces: RwLock<Vec<Workspace>>,
    pending: Mutex<Option<PendingDiscovery>>,
    observed: Mutex<SettingsKey>,
}

impl DiscoveryCache {
    pub fn new(engine: Arc<TaskDiscovery>, workspaces: Vec<Workspace>) -> Self {
        let observed = settings_key(&engine);
        Self {
            engine,
            workspaces: RwLock::new(workspaces),
            pending: Mutex::new(None),
            observed: Mutex::new(observed),
        }
    }

    pub fn engine(&self) -> &Arc<TaskDiscovery> {
        &self.engine
    }

    pub fn workspaces(&self) -> Vec<Workspace> {
        self.workspaces.read().clone()
    }

    /// Replace the workspace folders and drop the memo.
    pub fn set_workspaces(&self, workspaces: Vec<Workspace>) {
        *self.workspaces.write() = workspaces;
        self.invalidate();
    }

    /// The memoized run, starting one if there is none.
    pub fn get(&self) -> PendingDiscovery {
        let mut pending = self.pending.lock();
        if let Some(run) = pending.as_ref() {
            return run.clone();
        }

        debug!("starting discovery run");
        let engine = Arc::clone(&self.engine);
        let workspaces = self.workspaces();
        let run = async move { Arc::new(engine.discover(&workspaces).await) }
            .boxed()
            .shared();
        *pending = Some(run.clone());
        run
    }

    /// Await the memoized discovery result.
    pub async fn current(&self) -> Arc<Discovery> {
        self.get().await
    }

    /// The resolved result, if a completed run is memoized.
    pub fn peek(&self) -> Option<Arc<Discovery>> {
        self.pending.lock().as_ref().and_then(|run| run.peek().cloned())
    }

    /// Forget the memo. An in-flight run still completes but nobody reads
    /// its result; the next read starts a fresh run.
    pub fn invalidate(&self) {
        if self.pending.lock().take().is_some() {
            debug!("discovery memo invalidated");
        }
    }

    /// Compare flow path, design config and editor against the values seen
    /// last time and invalidate if any changed. Returns whether it did.
    pub fn on_settings_changed(&self) -> bool {
        let current = settings_key(&self.engine);
        let mut observed = self.observed.lock();
        if *observed == current {
            return false;
        }
        info!(
            flow_path = ?current.flow_path,
            design_config = ?current.design_config,
            editor = ?current.editor,
            "flow settings changed, rediscovering"
        );
        *observed = current;
        drop(observed);
        self.invalidate();
        true
    }
}

fn settings_key(engine: &TaskDiscovery) -> SettingsKey {
    SettingsKey {
        flow_path: engine.settings().get(KEY_FLOW_PATH),
        design_config: engine.settings().get(KEY_DESIGN_CONFIG),
        editor: engine.settings().get(KEY_EDITOR),
    }
}

#[async_trait]
impl TaskProvider for DiscoveryCache {
    async fn provide_tasks(&self) -> Vec<Action> {
        self.current().await.actions().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orfs_core::{
        ExecError, ExecOutput, OutputChannel, PathProbe, ProcessRunner, SettingsSource,
    };
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts platform queries (one per workspace per run) and answers
    /// slowly so overlapping reads really overlap.
    #[derive(Default)]
    struct SlowMake {
        platform_queries: AtomicUsize,
    }

    #[async_trait]
    impl ProcessRunner for SlowMake {
        async fn execute(&self, command_line: &str, _cwd: &Path) -> Result<ExecOutput, ExecError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let stdout = if command_line.contains("print-PLATFORM") {
                self.platform_queries.fetch_add(1, Ordering::SeqCst);
                "sky130hd"
            } else if command_line.contains("print-DESIGN_NICKNAME") {
                "aes"
            } else if command_line.contains("'^(do-[0-9])'") {
                "do-3_place\ndo-3_1_place_gp_skip_io\n"
            } else {
                ""
            };
            Ok(ExecOutput {
                stdout: stdout.into(),
                stderr: String::new(),
            })
        }
    }

    struct AnyPath;

    impl PathProbe for AnyPath {
        fn exists(&self, _path: &Path) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct MutableSettings(Mutex<HashMap<String, String>>);

    impl SettingsSource for MutableSettings {
        fn get(&self, key: &str) -> Option<String> {
            self.0.lock().get(key).cloned()
        }
    }

    fn cache() -> (Arc<SlowMake>, Arc<MutableSettings>, DiscoveryCache) {
        let make = Arc::new(SlowMake::default());
        let settings = Arc::new(MutableSettings::default());
        settings.0.lock().insert(KEY_FLOW_PATH.into(), "/orfs".into());
        let engine = TaskDiscovery::new(
            make.clone(),
            Arc::new(AnyPath),
            settings.clone(),
            OutputChannel::new("orfs"),
        );
        let cache = DiscoveryCache::new(Arc::new(engine), vec![Workspace::new("aes", "/w/aes")]);
        (make, settings, cache)
    }

    #[tokio::test]
    async fn overlapping_reads_share_one_run() {
        let (make, _settings, cache) = cache();
        let (a, b, c) = tokio::join!(cache.current(), cache.current(), cache.current());
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
        assert_eq!(make.platform_queries.load(Ordering::SeqCst), 1);

        let again = cache.current().await;
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(make.platform_queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_new_run() {
        let (make, _settings, cache) = cache();
        let first = cache.current().await;
        assert!(cache.peek().is_some());

        cache.invalidate();
        assert!(cache.peek().is_none());
        let second = cache.current().await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(make.platform_queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn editor_change_invalidates() {
        let (_make, settings, cache) = cache();
        let before = cache.current().await;
        let log = before.actions().find(|a| a.name.starts_with("log ")).unwrap();
        assert!(log.invocation.contains("code -r '"));

        settings.0.lock().insert(KEY_EDITOR.into(), "vim".into());
        assert!(cache.on_settings_changed());
        let after = cache.current().await;
        let log = after.actions().find(|a| a.name.starts_with("log ")).unwrap();
        assert!(log.invocation.contains("then vim '"), "got: {}", log.invocation);
    }

    #[tokio::test]
    async fn only_flow_settings_invalidate() {
        let (_make, settings, cache) = cache();
        cache.current().await;

        settings.0.lock().insert("log_level".into(), "debug".into());
        assert!(!cache.on_settings_changed());
        assert!(cache.peek().is_some());

        settings
            .0
            .lock()
            .insert(KEY_DESIGN_CONFIG.into(), "designs/sky130hd/aes".into());
        assert!(cache.on_settings_changed());
        assert!(cache.peek().is_none());
        assert!(!cache.on_settings_changed());
    }

    #[tokio::test]
    async fn provides_flat_task_list() {
        let (_make, _settings, cache) = cache();
        let tasks = cache.provide_tasks().await;
        let names: Vec<_> = tasks.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["3_place", "3_1_place_gp_skip_io", "log 3_1_place_gp_skip_io"]
        );
    }

    #[tokio::test]
    async fn set_workspaces_rediscovers() {
        let (make, _settings, cache) = cache();
        cache.current().await;
        cache.set_workspaces(vec![
            Workspace::new("aes", "/w/aes"),
            Workspace::new("gcd", "/w/gcd"),
        ]);
        let result = cache.current().await;
        assert_eq!(result.workspaces.len(), 2);
        assert_eq!(make.platform_queries.load(Ordering::SeqCst), 3);
    }
}
