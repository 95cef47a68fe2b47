//! Background sync and content watching.
//!
//! In live-reload mode the server answers requests while the initial sync
//! runs in the background. With watching enabled, every change to the
//! post-processor's hash snapshot triggers another sync once the burst of
//! filesystem events settles.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hubdocs_index::RetryPolicy;
use hubdocs_site::{HASHES_FILE, IndexRepository};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::sync_with_retry;

/// Quiet period after the last change before a sync starts.
pub(crate) const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Run one sync with the outer retry on the blocking pool.
///
/// Failures are logged; the server keeps serving whatever the index holds.
pub(crate) fn spawn_sync(
    repository: Arc<IndexRepository>,
    retry: RetryPolicy,
    trigger: &'static str,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        match sync_with_retry(&repository, &retry) {
            Ok(report) => tracing::info!(
                trigger,
                added = report.added,
                updated = report.updated,
                deleted = report.deleted,
                elapsed_ms = start.elapsed().as_millis(),
                "Background sync finished"
            ),
            Err(e) => tracing::error!(trigger, error = %e, "Background sync failed"),
        }
    })
}

/// Watches the content directory and syncs when the hash snapshot changes.
///
/// Dropping the watcher stops the notifications; the sync task then exits.
pub(crate) struct ContentWatcher {
    _watcher: RecommendedWatcher,
}

impl ContentWatcher {
    /// Start watching `content_dir`.
    ///
    /// The directory is watched rather than the file so that snapshots
    /// replaced by rename are still seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or the directory
    /// cannot be watched.
    pub(crate) fn start(
        content_dir: &Path,
        repository: Arc<IndexRepository>,
        retry: RetryPolicy,
        debounce: Duration,
    ) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel::<()>(16);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if touches_snapshot(&event) => {
                    // A full queue already holds a pending trigger.
                    let _ = tx.try_send(());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Content watcher error"),
            }
        })?;
        watcher.watch(content_dir, RecursiveMode::NonRecursive)?;
        tracing::info!(file = %snapshot_path(content_dir).display(), "Watching content for changes");

        tokio::spawn(debounced_sync(rx, repository, retry, debounce));
        Ok(Self { _watcher: watcher })
    }
}

/// Whether a filesystem event writes the hash snapshot.
fn touches_snapshot(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(OsStr::new(HASHES_FILE)))
}

/// Sync once per burst of triggers.
async fn debounced_sync(
    mut rx: mpsc::Receiver<()>,
    repository: Arc<IndexRepository>,
    retry: RetryPolicy,
    debounce: Duration,
) {
    while rx.recv().await.is_some() {
        let mut open = true;
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(())) => {}
                Ok(None) => {
                    open = false;
                    break;
                }
                Err(_) => break,
            }
        }

        tracing::debug!("Content snapshot changed");
        if let Err(e) = spawn_sync(Arc::clone(&repository), retry, "watch").await {
            tracing::error!(error = %e, "Sync task failed");
        }

        if !open {
            break;
        }
    }
}

/// Path of the snapshot a watcher on `content_dir` reacts to.
#[must_use]
pub(crate) fn snapshot_path(content_dir: &Path) -> PathBuf {
    content_dir.join(HASHES_FILE)
}
