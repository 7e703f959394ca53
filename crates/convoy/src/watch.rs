use std::any::Any;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Weak;

use notify::EventKind;
use notify::RecursiveMode;
use notify::Watcher as _;
use parking_lot::Mutex;

/// Called with the changed path
pub type ChangeHandler = Arc<dyn Fn(&Path) + Send + Sync>;

pub type WatcherRef = Arc<dyn Watcher>;

/// Keeps a watch alive. Dropping the handle stops watching.
pub struct WatchHandle {
  _guard: Box<dyn Any + Send>,
}

impl WatchHandle {
  pub fn new(guard: impl Any + Send) -> Self {
    Self {
      _guard: Box::new(guard),
    }
  }
}

impl fmt::Debug for WatchHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("WatchHandle")
  }
}

/// Reports changes below a path.
///
/// Directories are watched recursively. Handlers may run on any thread.
pub trait Watcher: fmt::Debug + Send + Sync {
  fn watch(&self, path: &Path, on_change: ChangeHandler) -> anyhow::Result<WatchHandle>;
}

/// Watches the OS file system through the `notify` crate
#[derive(Debug, Default)]
pub struct NotifyWatcher {}

impl Watcher for NotifyWatcher {
  fn watch(&self, path: &Path, on_change: ChangeHandler) -> anyhow::Result<WatchHandle> {
    let mode = if path.is_dir() {
      RecursiveMode::Recursive
    } else {
      RecursiveMode::NonRecursive
    };

    let watched = path.to_path_buf();
    let mut watcher =
      notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
        Ok(event) if !matches!(event.kind, EventKind::Access(_)) => {
          let changed = event.paths.first().unwrap_or(&watched);
          on_change(changed);
        }
        Ok(_) => {}
        Err(error) => tracing::warn!("watch of {} failed: {error}", watched.display()),
      })?;

    watcher.watch(path, mode)?;
    tracing::trace!("watching {}", path.display());

    Ok(WatchHandle::new(watcher))
  }
}

struct ManualWatch {
  path: PathBuf,
  on_change: Weak<dyn Fn(&Path) + Send + Sync>,
}

/// Watcher driven by hand, for tests and embedders with their own change feed
#[derive(Default)]
pub struct ManualWatcher {
  watches: Mutex<Vec<ManualWatch>>,
}

impl fmt::Debug for ManualWatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ManualWatcher")
      .field("active", &self.active_watches())
      .finish()
  }
}

impl ManualWatcher {
  /// Report a change of `path` to every live watch on it or on one of its ancestors
  pub fn fire(&self, path: &Path) {
    let handlers = {
      let mut watches = self.watches.lock();
      watches.retain(|watch| watch.on_change.strong_count() > 0);
      watches
        .iter()
        .filter(|watch| path.starts_with(&watch.path))
        .filter_map(|watch| watch.on_change.upgrade())
        .collect::<Vec<_>>()
    };

    for handler in handlers {
      handler(path);
    }
  }

  /// Paths with a live watch
  pub fn watched_paths(&self) -> Vec<PathBuf> {
    self
      .watches
      .lock()
      .iter()
      .filter(|watch| watch.on_change.strong_count() > 0)
      .map(|watch| watch.path.clone())
      .collect()
  }

  pub fn active_watches(&self) -> usize {
    self.watched_paths().len()
  }
}

impl Watcher for ManualWatcher {
  fn watch(&self, path: &Path, on_change: ChangeHandler) -> anyhow::Result<WatchHandle> {
    self.watches.lock().push(ManualWatch {
      path: path.to_path_buf(),
      on_change: Arc::downgrade(&on_change),
    });

    Ok(WatchHandle::new(on_change))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;
  use std::sync::atomic::Ordering;

  use super::*;

  #[test]
  fn manual_watches_fire_for_descendants_until_dropped() {
    let watcher = ManualWatcher::default();
    let count = Arc::new(AtomicUsize::new(0));

    let counter = count.clone();
    let handle = watcher
      .watch(
        Path::new("/app/public"),
        Arc::new(move |_| {
          counter.fetch_add(1, Ordering::SeqCst);
        }),
      )
      .unwrap();

    watcher.fire(Path::new("/app/public/images/logo.png"));
    watcher.fire(Path::new("/app/lib/main.js"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(watcher.active_watches(), 1);

    drop(handle);
    watcher.fire(Path::new("/app/public/index.html"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(watcher.active_watches(), 0);
  }
}
