//! Runtime reload of the dotenv layer.
//!
//! [`ReloadService`] owns the current variable snapshot. A reload builds a
//! complete new snapshot off to the side and then swaps it in, so readers
//! observe either the old variables or the new ones and never a mixture.
//! Reloads are serialized; a second caller waits for the first to finish and
//! then performs its own refresh.

use crate::config::LayeredConfig;
use crate::dotenv_layer::DotenvLayer;
use crate::dotenv_parser::Variables;
use crate::error::ConfigResult;
use crate::loader::{DefaultEnvLoader, EnvLoader};
use crate::options::{keys, DotenvOptions};
use crate::priority::{install_layer, Priority};
use arc_swap::ArcSwap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{error, info, warn};

/// Callback invoked after every successful reload.
pub type ReloadListener = Arc<dyn Fn(&ReloadEvent) + Send + Sync>;

/// Lifecycle of a [`ReloadService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    /// Nothing has been loaded yet (loading was disabled at construction).
    Uninitialized,
    /// A snapshot is active.
    Ready,
    /// A reload is in progress; the previous snapshot is still active.
    Reloading,
}

/// Passed to listeners after a successful reload.
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    /// The snapshot that is now active.
    pub variables: Arc<Variables>,
    /// Priority the layer was installed with.
    pub priority: Priority,
    /// File the snapshot was read from.
    pub path: PathBuf,
}

/// Result of an externally triggered reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded { variables: usize },
    Disabled,
    Failed { reason: String },
}

impl ReloadOutcome {
    /// Human readable message suitable for a management endpoint response.
    pub fn message(&self) -> String {
        match self {
            ReloadOutcome::Reloaded { .. } => "Dotenv successfully reloaded!".to_string(),
            ReloadOutcome::Disabled => format!(
                "Dotenv reload is disabled. Enable it with '{}=true'.",
                keys::RELOAD_ENABLED
            ),
            ReloadOutcome::Failed { reason } => format!("Dotenv reload failed: {reason}"),
        }
    }

    pub fn is_reloaded(&self) -> bool {
        matches!(self, ReloadOutcome::Reloaded { .. })
    }
}

impl fmt::Display for ReloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Keeps the dotenv layer of a [`LayeredConfig`] in sync with the file.
///
/// Hosts create one service and share it behind an `Arc` with whatever
/// triggers reloads (a management endpoint, a signal handler, the file
/// watcher).
///
/// # Example
/// ```
/// use dotspice::{LayeredConfig, MapLayer, ReloadService};
/// use std::sync::Arc;
///
/// let dir = tempfile::tempdir().unwrap();
/// let env = dir.path().join(".env");
/// std::fs::write(&env, "GREETING=hello\n").unwrap();
///
/// let config = Arc::new(LayeredConfig::new());
/// config.add_last(Arc::new(
///     MapLayer::new("application")
///         .with_value("dotenv.path", env.display().to_string())
///         .with_value("dotenv.reload.enabled", true),
/// ));
///
/// let service = ReloadService::with_default_loader(Arc::clone(&config)).unwrap();
/// std::fs::write(&env, "GREETING=bonjour\n").unwrap();
///
/// assert!(service.reload().unwrap());
/// assert_eq!(config.get_string("GREETING").as_deref(), Some("bonjour"));
/// ```
pub struct ReloadService {
    config: Arc<LayeredConfig>,
    loader: Arc<dyn EnvLoader>,
    cache: ArcSwap<Variables>,
    state: RwLock<ReloadState>,
    reload_lock: Mutex<()>,
    listeners: Mutex<Vec<ReloadListener>>,
}

impl ReloadService {
    /// Creates the service with the snapshot the host is currently serving.
    ///
    /// When a [`DotenvLayer`] is already installed (by
    /// [`load_initial`](crate::startup::load_initial)), the service adopts its
    /// snapshot without reading the file again. Otherwise the file is loaded
    /// once and the result is both cached and installed. When
    /// `dotenv.enabled` is false nothing is read and the service starts
    /// [`Uninitialized`](ReloadState::Uninitialized).
    ///
    /// # Errors
    /// Any error from resolving the options or from the loader.
    pub fn new(config: Arc<LayeredConfig>, loader: Arc<dyn EnvLoader>) -> ConfigResult<Self> {
        let options = DotenvOptions::from_config(&config)?;
        let (initial, state) = if !options.enabled {
            (Arc::new(Variables::new()), ReloadState::Uninitialized)
        } else if let Some(installed) = installed_snapshot(&config) {
            (installed, ReloadState::Ready)
        } else {
            let variables = Arc::new(loader.load(&config)?);
            install_layer(
                &config,
                Arc::new(DotenvLayer::standard(Arc::clone(&variables))),
                options.priority,
            );
            (variables, ReloadState::Ready)
        };

        Ok(Self {
            config,
            loader,
            cache: ArcSwap::new(initial),
            state: RwLock::new(state),
            reload_lock: Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Creates the service with a [`DefaultEnvLoader`].
    pub fn with_default_loader(config: Arc<LayeredConfig>) -> ConfigResult<Self> {
        Self::new(config, Arc::new(DefaultEnvLoader::new()))
    }

    /// Re-reads the dotenv file and swaps in the new layer.
    ///
    /// Returns `Ok(false)` without touching anything when reload is
    /// disabled. On error the previous snapshot and layer stay active.
    ///
    /// # Errors
    /// * `ConfigError::MissingFile` - If the file is gone and
    ///   `dotenv.fail-on-missing` is set
    /// * `ConfigError::Read` - If the file cannot be read
    /// * `ConfigError::InvalidValue` - If a `dotenv.*` option is malformed
    pub fn reload(&self) -> ConfigResult<bool> {
        Ok(self.reload_snapshot()?.is_some())
    }

    /// Runs [`reload`](Self::reload) on behalf of an external trigger.
    pub fn trigger(&self) -> ReloadOutcome {
        match self.reload_snapshot() {
            Ok(Some(variables)) => ReloadOutcome::Reloaded {
                variables: variables.len(),
            },
            Ok(None) => ReloadOutcome::Disabled,
            Err(e) => ReloadOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Reloads and returns the installed snapshot, or `None` when disabled.
    fn reload_snapshot(&self) -> ConfigResult<Option<Arc<Variables>>> {
        let options = DotenvOptions::from_config(&self.config)?;
        if !options.enabled || !options.reload.enabled {
            warn!(
                "[Dotenv] Reload is disabled. Enable it with '{}=true'",
                keys::RELOAD_ENABLED
            );
            return Ok(None);
        }

        let variables = {
            let _guard = self
                .reload_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            info!(path = %options.path.display(), "[Dotenv] Reloading .env file...");
            let previous_state = self.set_state(ReloadState::Reloading);

            let variables = match self.loader.load(&self.config) {
                Ok(variables) => Arc::new(variables),
                Err(e) => {
                    self.set_state(previous_state);
                    error!(
                        path = %options.path.display(),
                        error = %e,
                        "[Dotenv] Reload failed, keeping previous variables"
                    );
                    return Err(e);
                }
            };

            self.cache.store(Arc::clone(&variables));
            install_layer(
                &self.config,
                Arc::new(DotenvLayer::standard(Arc::clone(&variables))),
                options.priority,
            );
            self.set_state(ReloadState::Ready);
            variables
        };

        info!(
            variables = variables.len(),
            priority = %options.priority,
            "[Dotenv] .env file reloaded successfully"
        );

        // Listeners run unlocked and may reload again.
        self.notify(&ReloadEvent {
            variables: Arc::clone(&variables),
            priority: options.priority,
            path: options.path,
        });
        Ok(Some(variables))
    }

    /// Returns the active snapshot.
    pub fn variables(&self) -> Arc<Variables> {
        self.cache.load_full()
    }

    /// Returns the number of variables in the active snapshot.
    pub fn current_variable_count(&self) -> usize {
        self.cache.load().len()
    }

    pub fn state(&self) -> ReloadState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the configuration this service maintains.
    pub fn config(&self) -> &Arc<LayeredConfig> {
        &self.config
    }

    /// Registers a listener called after each successful reload.
    ///
    /// Listeners run on the reloading thread once the new layer is visible.
    /// A panicking listener is logged and does not affect the others.
    pub fn on_config_change<F>(&self, listener: F)
    where
        F: Fn(&ReloadEvent) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    fn set_state(&self, state: ReloadState) -> ReloadState {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, state)
    }

    fn notify(&self, event: &ReloadEvent) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!("[Dotenv] Reload listener panicked");
            }
        }
    }
}

/// Snapshot behind the installed `"dotenv"` layer, if it is a [`DotenvLayer`].
fn installed_snapshot(config: &LayeredConfig) -> Option<Arc<Variables>> {
    let layer = config.layer(keys::PROPERTY_SOURCE_NAME)?;
    let dotenv = layer.as_any().downcast_ref::<DotenvLayer>()?;
    Some(Arc::clone(dotenv.variables()))
}

impl fmt::Debug for ReloadService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadService")
            .field("state", &self.state())
            .field("variables", &self.current_variable_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::map_layer::MapLayer;
    use crate::value::ConfigValue;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    fn host(reload_enabled: bool) -> Arc<LayeredConfig> {
        let config = Arc::new(LayeredConfig::new());
        config.add_last(Arc::new(
            MapLayer::new("application")
                .with_value("SHARED", "application")
                .with_value(keys::RELOAD_ENABLED, reload_enabled),
        ));
        config
    }

    /// Loader returning `GEN=<n>` where n counts calls, starting at 1.
    fn counting_loader() -> (Arc<dyn EnvLoader>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader: Arc<dyn EnvLoader> =
            Arc::new(move |_: &LayeredConfig| -> ConfigResult<Variables> {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Variables::from([
                    ("GEN".to_string(), n.to_string()),
                    ("SHARED".to_string(), "dotenv".to_string()),
                ]))
            });
        (loader, calls)
    }

    #[test]
    fn test_new_installs_the_snapshot_it_caches() {
        let config = host(true);
        let (loader, calls) = counting_loader();
        let service = ReloadService::new(Arc::clone(&config), loader).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.state(), ReloadState::Ready);
        assert_eq!(service.variables()["GEN"], "1");
        assert_eq!(config.get_string("GEN").as_deref(), Some("1"));
        assert!(Arc::ptr_eq(
            &service.variables(),
            &installed_snapshot(&config).unwrap()
        ));
    }

    #[test]
    fn test_new_adopts_installed_layer_without_reading() {
        let config = host(true);
        let installed = Arc::new(Variables::from([("A".to_string(), "1".to_string())]));
        config.add_last(Arc::new(DotenvLayer::standard(Arc::clone(&installed))));

        let (loader, calls) = counting_loader();
        let service = ReloadService::new(Arc::clone(&config), loader).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(Arc::ptr_eq(&service.variables(), &installed));
        assert_eq!(service.current_variable_count(), 1);
        assert_eq!(config.get_string("GEN"), None);
    }

    #[test]
    fn test_new_when_disabled_is_uninitialized() {
        let config = host(true);
        config.add_first(Arc::new(
            MapLayer::new("args").with_value(keys::ENABLED, false),
        ));
        let (loader, calls) = counting_loader();
        let service = ReloadService::new(config, loader).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.state(), ReloadState::Uninitialized);
        assert_eq!(service.current_variable_count(), 0);
    }

    #[test]
    fn test_new_propagates_loader_error() {
        let loader = |_: &LayeredConfig| -> ConfigResult<Variables> {
            Err(ConfigError::missing_file("/nowhere/.env"))
        };
        let err = ReloadService::new(host(true), Arc::new(loader)).unwrap_err();
        assert!(err.is_missing_file());
    }

    #[test]
    fn test_reload_swaps_cache_and_layer() {
        let config = host(true);
        let (loader, _) = counting_loader();
        let service = ReloadService::new(Arc::clone(&config), loader).unwrap();

        assert!(service.reload().unwrap());
        assert_eq!(service.variables()["GEN"], "2");
        assert_eq!(config.get_string("GEN"), Some("2".to_string()));
        // Low priority by default: the host value still wins.
        assert_eq!(config.get_string("SHARED"), Some("application".to_string()));
        assert_eq!(config.position("dotenv"), Some(1));
        assert_eq!(service.state(), ReloadState::Ready);
    }

    #[test]
    fn test_reload_honours_current_priority() {
        let config = host(true);
        let (loader, _) = counting_loader();
        let service = ReloadService::new(Arc::clone(&config), loader).unwrap();
        service.reload().unwrap();

        config.add_first(Arc::new(
            MapLayer::new("overrides").with_value(keys::PRIORITY, "high"),
        ));
        service.reload().unwrap();

        assert_eq!(config.position("dotenv"), Some(0));
        assert_eq!(config.get_string("SHARED"), Some("dotenv".to_string()));
        assert_eq!(config.layer_count(), 3);
    }

    #[test]
    fn test_reload_is_idempotent_for_unchanged_input() {
        let config = host(true);
        let loader = |_: &LayeredConfig| -> ConfigResult<Variables> {
            Ok(Variables::from([("A".to_string(), "1".to_string())]))
        };
        let service = ReloadService::new(Arc::clone(&config), Arc::new(loader)).unwrap();

        assert!(service.reload().unwrap());
        let first = (config.layer_names(), config.all_settings());
        assert!(service.reload().unwrap());
        let second = (config.layer_names(), config.all_settings());

        assert_eq!(first, second);
        assert_eq!(service.current_variable_count(), 1);
    }

    #[test]
    fn test_disabled_reload_changes_nothing() {
        let config = host(false);
        let (loader, calls) = counting_loader();
        let service = ReloadService::new(Arc::clone(&config), loader).unwrap();
        let before = service.variables();
        let names = config.layer_names();

        assert!(!service.reload().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&before, &service.variables()));
        assert!(Arc::ptr_eq(&before, &installed_snapshot(&config).unwrap()));
        assert_eq!(config.layer_names(), names);
        assert_eq!(service.trigger(), ReloadOutcome::Disabled);
    }

    #[test]
    fn test_failed_reload_keeps_previous_state() {
        let config = host(true);
        let fail = Arc::new(AtomicBool::new(false));
        let should_fail = Arc::clone(&fail);
        let loader = move |_: &LayeredConfig| -> ConfigResult<Variables> {
            if should_fail.load(Ordering::SeqCst) {
                Err(ConfigError::missing_file(".env"))
            } else {
                Ok(Variables::from([("KEEP".to_string(), "me".to_string())]))
            }
        };
        let service = ReloadService::new(Arc::clone(&config), Arc::new(loader)).unwrap();
        service.reload().unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        service.on_config_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        fail.store(true, Ordering::SeqCst);
        let err = service.reload().unwrap_err();
        assert!(err.is_missing_file());
        assert_eq!(service.variables()["KEEP"], "me");
        assert_eq!(config.get("KEEP"), Some(ConfigValue::from("me")));
        assert_eq!(service.state(), ReloadState::Ready);
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        match service.trigger() {
            ReloadOutcome::Failed { reason } => assert!(reason.contains(".env")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_listeners_see_new_layer() {
        let config = host(true);
        let (loader, _) = counting_loader();
        let service = ReloadService::new(Arc::clone(&config), loader).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observed = Arc::clone(&config);
        service.on_config_change(move |event| {
            let from_config = observed.get_string("GEN").unwrap_or_default();
            sink.lock()
                .unwrap()
                .push((event.variables["GEN"].clone(), from_config, event.priority));
        });

        service.reload().unwrap();
        service.reload().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("2".to_string(), "2".to_string(), Priority::Low),
                ("3".to_string(), "3".to_string(), Priority::Low),
            ]
        );
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let (loader, _) = counting_loader();
        let service = ReloadService::new(host(true), loader).unwrap();

        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        service.on_config_change(|_| panic!("listener failure"));
        service.on_config_change(move |_| flag.store(true, Ordering::SeqCst));

        assert!(service.reload().unwrap());
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_listener_may_reload_the_service() {
        let (loader, calls) = counting_loader();
        let service = Arc::new(ReloadService::new(host(true), loader).unwrap());

        let weak = Arc::downgrade(&service);
        let reentered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reentered);
        service.on_config_change(move |_| {
            if !flag.swap(true, Ordering::SeqCst) {
                if let Some(service) = weak.upgrade() {
                    service.reload().unwrap();
                }
            }
        });

        let (done_tx, done_rx) = mpsc::channel();
        let worker = Arc::clone(&service);
        std::thread::spawn(move || {
            let _ = done_tx.send(worker.reload());
        });

        let result = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("reload did not return");
        assert!(result.unwrap());
        assert!(reentered.load(Ordering::SeqCst));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(service.variables()["GEN"], "3");
        assert_eq!(service.state(), ReloadState::Ready);
    }

    #[test]
    fn test_trigger_counts_its_own_snapshot() {
        // Call n yields n variables.
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader = move |_: &LayeredConfig| -> ConfigResult<Variables> {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((0..n).map(|i| (format!("K{i}"), i.to_string())).collect())
        };
        let service = Arc::new(ReloadService::new(host(true), Arc::new(loader)).unwrap());

        // A listener reloads again before the outer trigger reports.
        let weak = Arc::downgrade(&service);
        let reentered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reentered);
        service.on_config_change(move |_| {
            if !flag.swap(true, Ordering::SeqCst) {
                if let Some(service) = weak.upgrade() {
                    service.reload().unwrap();
                }
            }
        });

        assert_eq!(service.trigger(), ReloadOutcome::Reloaded { variables: 2 });
        assert_eq!(service.current_variable_count(), 3);
    }

    #[test]
    fn test_trigger_messages() {
        let (loader, _) = counting_loader();
        let service = ReloadService::new(host(true), loader).unwrap();

        let outcome = service.trigger();
        assert_eq!(outcome, ReloadOutcome::Reloaded { variables: 2 });
        assert!(outcome.is_reloaded());
        assert_eq!(outcome.message(), "Dotenv successfully reloaded!");
        assert_eq!(
            ReloadOutcome::Disabled.to_string(),
            "Dotenv reload is disabled. Enable it with 'dotenv.reload.enabled=true'."
        );
    }

    #[test]
    fn test_readers_never_observe_a_gap() {
        let config = host(true);
        let (loader, _) = counting_loader();
        let service = Arc::new(ReloadService::new(Arc::clone(&config), loader).unwrap());
        service.reload().unwrap();

        let done = AtomicBool::new(false);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        assert!(config.get("GEN").is_some());
                        let snapshot = service.variables();
                        assert_eq!(snapshot.len(), 2);
                        assert!(snapshot.contains_key("GEN"));
                    }
                });
            }

            let reloaders: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        for _ in 0..50 {
                            service.reload().unwrap();
                        }
                    })
                })
                .collect();
            for reloader in reloaders {
                reloader.join().unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });

        // 1 initial load, 1 explicit reload, 100 concurrent reloads.
        assert_eq!(service.variables()["GEN"], "102");
        assert_eq!(config.layer_count(), 2);
    }
}
