// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher over the configured roots and send
/// `RuntimeEvent::PathChanged` for every changed path, relative to `root`.
///
/// - `root` is the project root against which rule patterns are evaluated.
/// - `watch_paths` are files or directories relative to `root`; directories
///   are watched recursively. A missing path is skipped with a warning so a
///   fresh checkout without e.g. a `target/` directory still starts.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    watch_paths: &[String],
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so stripping the prefix from event paths is stable.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // Tracing is unavailable inside the notify callback.
                    eprintln!("pipewatch: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("pipewatch: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for path in watch_paths {
        let full = root.join(path);
        if !full.exists() {
            warn!(path = %full.display(), "watch path does not exist; skipping");
            continue;
        }

        let mode = if full.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&full, mode)?;
        debug!(path = %full.display(), ?mode, "watching path");
    }

    info!("file watcher started on {:?}", root);

    // Async task that consumes notify events and forwards relative paths to
    // the runtime.
    let async_root = root.clone();
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");

            for path in event.paths {
                let Ok(rel) = path.strip_prefix(&async_root) else {
                    continue;
                };

                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if rel_str.is_empty() {
                    continue;
                }

                if runtime_tx
                    .send(RuntimeEvent::PathChanged { path: rel_str })
                    .await
                    .is_err()
                {
                    debug!("runtime gone; stopping watcher event loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
