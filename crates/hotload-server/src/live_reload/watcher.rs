//! Filesystem watching for the build output directory.
//!
//! Wraps a `notify` watcher and turns its callbacks into a stream of
//! [`ChangeEvent`]s on a tokio channel. Only paths ending in `.js` are
//! forwarded.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::ServerError;

/// Extension of files that count as build output.
pub(crate) const BUILD_EXTENSION: &str = ".js";

/// Capacity of the event channel between the notify thread and the dispatcher.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A qualifying change in the output directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Active watch on the output directory.
///
/// Dropping the watcher (or calling [`stop`](Self::stop)) ends the watch and
/// closes the event stream.
pub(crate) struct BuildWatcher {
    _watcher: RecommendedWatcher,
    dir: PathBuf,
}

impl BuildWatcher {
    /// Start watching `dir`.
    ///
    /// Each call creates a fresh event stream; a stopped watcher cannot be
    /// resumed. The directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Watch`] if the watcher cannot be created or the
    /// directory cannot be watched.
    pub(crate) fn start(
        dir: &Path,
        mode: RecursiveMode,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>), ServerError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let watch_error = |source| ServerError::Watch {
            path: dir.to_path_buf(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => forward_event(event, &tx),
                Err(e) => tracing::warn!(error = %e, "Filesystem watcher error"),
            }
        })
        .map_err(watch_error)?;

        watcher.watch(dir, mode).map_err(watch_error)?;
        tracing::info!(dir = %dir.display(), ?mode, "Watching output directory");

        Ok((
            Self {
                _watcher: watcher,
                dir: dir.to_path_buf(),
            },
            rx,
        ))
    }

    /// Stop watching.
    pub(crate) fn stop(self) {
        tracing::debug!(dir = %self.dir.display(), "Stopped watching output directory");
    }
}

/// Send every qualifying path of a notify event to the channel.
///
/// Runs on the notify thread, so it uses the blocking send.
fn forward_event(event: Event, tx: &mpsc::Sender<ChangeEvent>) {
    let Some(kind) = change_kind(event.kind) else {
        return;
    };

    for path in event.paths {
        if !is_build_file(&path) {
            continue;
        }
        tracing::debug!(path = %path.display(), ?kind, "Recorded filesystem event");
        if tx.blocking_send(ChangeEvent { path, kind }).is_err() {
            // Dispatcher is gone; nothing left to notify
            return;
        }
    }
}

/// Convert a `notify::EventKind` to a [`ChangeKind`].
///
/// Access notifications are not changes and yield `None`.
fn change_kind(kind: EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Some(ChangeKind::Modified),
        EventKind::Access(_) => None,
    }
}

/// Check whether a changed path is build output.
pub(crate) fn is_build_file(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(BUILD_EXTENSION))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    use super::*;

    #[test]
    fn test_is_build_file() {
        assert!(is_build_file(Path::new("/dist/index_1.js")));
        assert!(is_build_file(Path::new("/dist/chunks/vendor.js")));
        assert!(!is_build_file(Path::new("/dist/index_1.js.map")));
        assert!(!is_build_file(Path::new("/dist/style.css")));
        assert!(!is_build_file(Path::new("/dist")));
    }

    #[test]
    fn test_change_kind_mapping() {
        assert_eq!(
            change_kind(EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            change_kind(EventKind::Modify(ModifyKind::Any)),
            Some(ChangeKind::Modified)
        );
        assert_eq!(
            change_kind(EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Removed)
        );
        assert_eq!(change_kind(EventKind::Any), Some(ChangeKind::Modified));
        assert_eq!(change_kind(EventKind::Access(AccessKind::Any)), None);
    }

    #[test]
    fn test_forward_event_filters_paths() {
        let (tx, mut rx) = mpsc::channel(8);
        let event = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/dist/index_1.js"))
            .add_path(PathBuf::from("/dist/index_1.js.map"))
            .add_path(PathBuf::from("/dist/other.txt"));

        forward_event(event, &tx);
        drop(tx);

        let received = rx.try_recv().unwrap();
        assert_eq!(
            received,
            ChangeEvent {
                path: PathBuf::from("/dist/index_1.js"),
                kind: ChangeKind::Modified,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forward_event_drops_access() {
        let (tx, mut rx) = mpsc::channel(8);
        let event = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/dist/index_1.js"));

        forward_event(event, &tx);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_start_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let result = BuildWatcher::start(&missing, RecursiveMode::Recursive);

        assert!(matches!(result, Err(ServerError::Watch { .. })));
    }

    #[tokio::test]
    async fn test_watcher_reports_new_build_file() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, mut rx) = BuildWatcher::start(dir.path(), RecursiveMode::Recursive).unwrap();

        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("index_1.js"), "console.log(1)").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout waiting for change event")
            .expect("event stream closed");
        assert!(event.path.ends_with("index_1.js"));

        watcher.stop();
    }
}
