//! Background file watcher for the two source logs.
//!
//! Watches the parent directories (X-Plane and most sensor plugins replace
//! files atomically, so watching the file inode itself misses rewrites),
//! debounces bursts, then re-ingests both logs and replaces the record
//! store wholesale. At most one watch task runs at a time: starting a new
//! watch stops and joins the previous one with a bounded wait first, so
//! two watchers can never race to mutate state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::landing_log::parse_landing_log;
use crate::logbook::parse_logbook;
use crate::state::AppState;

const DEBOUNCE: Duration = Duration::from_millis(500);
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// The two watched source files.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    pub logbook: PathBuf,
    pub landing_log: PathBuf,
}

struct RunningWatch {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns at most one running watch task.
#[derive(Default)]
pub struct LogWatcher {
    running: Option<RunningWatch>,
}

impl LogWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching `paths`, stopping any previous watch first.
    ///
    /// Performs one initial ingest before the watch task spawns, so the
    /// state reflects the new sources immediately rather than on the
    /// first file event.
    pub async fn start(&mut self, paths: WatchPaths, state: AppState) {
        self.stop().await;

        reingest(&paths, &state).await;

        let cancel = CancellationToken::new();
        let cancel_for_task = cancel.clone();
        info!(logbook = ?paths.logbook, landing_log = ?paths.landing_log, "Starting log watcher");

        let handle = tokio::spawn(async move {
            run_watch_task(paths, state, cancel_for_task).await;
        });

        self.running = Some(RunningWatch { cancel, handle });
    }

    /// Stop the running watch, if any. Waits a bounded few seconds for the
    /// task to join and proceeds regardless of whether it stopped cleanly.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            match tokio::time::timeout(STOP_TIMEOUT, running.handle).await {
                Ok(_) => info!("Log watcher stopped"),
                Err(_) => warn!("Timed out waiting for log watcher to stop, proceeding"),
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

/// Parse both logs and replace the record store. Parse failures keep the
/// previous snapshot rather than publishing a half-empty one.
async fn reingest(paths: &WatchPaths, state: &AppState) {
    let flights = match parse_logbook(&paths.logbook) {
        Ok(flights) => flights,
        Err(e) => {
            error!(path = ?paths.logbook, error = %e, "Failed to re-read logbook");
            return;
        }
    };
    let landings = match parse_landing_log(&paths.landing_log) {
        Ok(landings) => landings,
        Err(e) => {
            error!(path = ?paths.landing_log, error = %e, "Failed to re-read landing log");
            return;
        }
    };

    info!(
        flights = flights.len(),
        landings = landings.len(),
        "Ingested source logs"
    );
    state.replace_records(flights, landings).await;
}

async fn run_watch_task(paths: WatchPaths, state: AppState, cancel: CancellationToken) {
    use notify::{Event, EventKind, RecursiveMode, Watcher};

    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);

    let logbook_name = paths.logbook.file_name().map(|n| n.to_os_string());
    let landing_name = paths.landing_log.file_name().map(|n| n.to_os_string());

    let mut watcher = match notify::recommended_watcher(move |res: Result<Event, _>| {
        if let Ok(event) = res {
            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    let interesting = event.paths.iter().any(|p| {
                        let name = p.file_name();
                        name.is_some()
                            && (name == logbook_name.as_deref()
                                || name == landing_name.as_deref())
                    });
                    if interesting {
                        let _ = tx.try_send(());
                    }
                }
                _ => {}
            }
        }
    }) {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "Failed to create file watcher");
            return;
        }
    };

    let mut watch_dirs: Vec<PathBuf> = vec![
        parent_dir(&paths.logbook),
        parent_dir(&paths.landing_log),
    ];
    watch_dirs.dedup();
    for dir in &watch_dirs {
        if let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            error!(error = %e, path = ?dir, "Failed to watch directory");
            return;
        }
    }

    info!("Log watcher started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Log watcher cancelled");
                break;
            }
            received = rx.recv() => {
                if received.is_none() {
                    break;
                }
                // Debounce: drain further events arriving inside the window
                tokio::time::sleep(DEBOUNCE).await;
                while rx.try_recv().is_ok() {}

                info!("Source log changed, re-ingesting");
                reingest(&paths, &state).await;
            }
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().unwrap_or(Path::new(".")).to_path_buf()
}
