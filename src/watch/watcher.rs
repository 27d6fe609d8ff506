// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::event_handler::ChangeBatch;

/// Handle for the filesystem watcher.
///
/// Keeps the debouncer (and the OS watcher behind it) alive. Dropping the
/// handle stops file watching and closes the batch channel.
pub struct WatcherHandle {
    _inner: Debouncer<RecommendedWatcher>,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Watch `root` recursively and deliver one `ChangeBatch` per quiet period.
///
/// Paths inside a batch are de-duplicated and sorted.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    debounce: Duration,
) -> Result<(WatcherHandle, mpsc::UnboundedReceiver<ChangeBatch>)> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    let (batch_tx, batch_rx) = mpsc::unbounded_channel::<ChangeBatch>();

    // Called on the debouncer's own thread.
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            let paths: BTreeSet<PathBuf> = events.into_iter().map(|e| e.path).collect();
            if paths.is_empty() {
                return;
            }
            if batch_tx.send(ChangeBatch::new(paths.into_iter().collect())).is_err() {
                debug!("change batch receiver dropped");
            }
        }
        Err(err) => warn!("file watch error: {err}"),
    })
    .context("creating file watcher")?;

    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {}", root.display()))?;

    info!(?root, debounce_ms = debounce.as_millis() as u64, "file watcher started");

    Ok((
        WatcherHandle {
            _inner: debouncer,
            root,
        },
        batch_rx,
    ))
}
