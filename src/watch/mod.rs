//! Directory watching: turns file-creation events in the spec and data
//! directories into compile / load work.

pub mod classify;
pub mod debounce;
pub mod dispatcher;

pub use classify::{Classified, Classifier, FileKind, UnmatchedEvent};
pub use debounce::Debouncer;
pub use dispatcher::{Dispatcher, ProcessError, Processed, SettleDelays};

use std::fs;
use std::path::Path;

use anyhow::Context;
use crossbeam_channel::Receiver;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Create (if needed) and watch `dirs`, non-recursively.
///
/// Call this before building the [`Classifier`] so that it resolves the
/// directories that actually exist. Events stop when the returned watcher is
/// dropped.
pub fn spawn_watcher(
    dirs: &[&Path],
) -> crate::Result<(RecommendedWatcher, Receiver<notify::Result<Event>>)> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // The receiver only goes away on shutdown.
        let _ = tx.send(res);
    })
    .context("initialize file watcher")?;

    for dir in dirs {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watch directory {}", dir.display()))?;
    }

    Ok((watcher, rx))
}
