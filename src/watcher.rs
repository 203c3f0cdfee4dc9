//! Reloads the dotenv layer when the file changes on disk.

use crate::error::{ConfigError, ConfigResult};
use crate::options::DotenvOptions;
use crate::reload::{ReloadOutcome, ReloadService};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Quiet period after the last file event before a reload is triggered.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Watches a dotenv file and calls [`ReloadService::trigger`] when it changes.
///
/// The parent directory is watched rather than the file itself, so editors
/// that replace the file on save, and files created after startup, are
/// picked up. Bursts of events are collapsed into one reload. Dropping the
/// watcher stops the background thread.
pub struct DotenvWatcher {
    watcher: Option<RecommendedWatcher>,
    path: PathBuf,
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DotenvWatcher {
    /// Watches the file named by the service's current `dotenv.path`.
    ///
    /// # Errors
    /// * `ConfigError::FileWatch` - If the directory cannot be watched
    pub fn for_service(service: Arc<ReloadService>) -> ConfigResult<Self> {
        let path = DotenvOptions::from_config(service.config())?.path;
        Self::start(service, path)
    }

    /// Watches `path` with the default debounce.
    pub fn start(service: Arc<ReloadService>, path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::start_with_debounce(service, path, DEFAULT_DEBOUNCE)
    }

    /// Watches `path`, waiting `debounce` after the last event before reloading.
    ///
    /// # Errors
    /// * `ConfigError::FileWatch` - If the path has no file name or its
    ///   directory cannot be watched
    pub fn start_with_debounce(
        service: Arc<ReloadService>,
        path: impl AsRef<Path>,
        debounce: Duration,
    ) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name = path.file_name().map(OsString::from).ok_or_else(|| {
            ConfigError::file_watch(format!("Cannot watch {}: no file name", path.display()))
        })?;
        let directory = watched_directory(&path);

        let (event_sender, event_receiver) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(event_sender)
            .map_err(|e| ConfigError::file_watch(e.to_string()))?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ConfigError::file_watch(format!("Cannot watch {}: {e}", directory.display()))
            })?;

        let (stop_sender, stop_receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("dotenv-watcher".to_string())
            .spawn(move || {
                watch_loop(
                    &service,
                    &file_name,
                    &event_receiver,
                    &stop_receiver,
                    debounce,
                )
            })?;

        info!(path = %path.display(), "[Dotenv] Watching .env file for changes");
        Ok(Self {
            watcher: Some(watcher),
            path,
            stop: Some(stop_sender),
            handle: Some(handle),
        })
    }

    /// Returns the watched dotenv file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_watching(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops watching and waits for the background thread to exit.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        // Dropping the watcher disconnects the event channel.
        self.watcher.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(path = %self.path.display(), "[Dotenv] Watcher thread panicked");
            }
            debug!(path = %self.path.display(), "[Dotenv] Stopped watching .env file");
        }
    }
}

impl Drop for DotenvWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DotenvWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DotenvWatcher")
            .field("path", &self.path)
            .field("watching", &self.is_watching())
            .finish()
    }
}

/// Directory to watch for `path`; `.` for a bare file name.
fn watched_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

fn watch_loop(
    service: &ReloadService,
    file_name: &OsString,
    events: &mpsc::Receiver<notify::Result<Event>>,
    stop: &mpsc::Receiver<()>,
    debounce: Duration,
) {
    let mut pending: Option<Instant> = None;

    loop {
        match stop.try_recv() {
            Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        match events.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                if is_relevant(&event, file_name) {
                    pending = Some(Instant::now());
                }
            }
            Ok(Err(e)) => warn!(error = %e, "[Dotenv] File watch error"),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if pending.is_some_and(|since| since.elapsed() >= debounce) {
            pending = None;
            match service.trigger() {
                ReloadOutcome::Reloaded { variables } => {
                    debug!(variables = variables, "[Dotenv] Reloaded after file change")
                }
                outcome => warn!("[Dotenv] {}", outcome.message()),
            }
        }
    }
}
