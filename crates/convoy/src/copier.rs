use std::fmt;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Weak;

use convoy_core::events::Event;
use convoy_core::events::EventEmitter;
use convoy_core::events::SubscriptionId;
use convoy_core::types::content_type_for;
use convoy_core::types::AssetBody;
use convoy_core::types::BuiltAsset;
use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;
use convoy_filesystem::normalize_path;
use convoy_filesystem::FileSystemRef;
use glob_match::glob_match;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::CopyConfig;
use crate::WatchHandle;
use crate::WatcherRef;

type ListingCell = Arc<OnceCell<ConvoyResult<Arc<Vec<String>>>>>;

/// Serves the files below a root directory verbatim under its own path prefix
#[derive(Clone)]
pub struct Copier {
  inner: Arc<CopierInner>,
}

struct CopierInner {
  path: String,
  root: PathBuf,
  config: CopyConfig,
  file_system: FileSystemRef,
  watcher: WatcherRef,
  events: EventEmitter,
  state: Mutex<CopierState>,
}

#[derive(Default)]
struct CopierState {
  generation: u64,
  listing: Option<ListingCell>,
  watch: Option<WatchHandle>,
}

impl fmt::Debug for Copier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Copier")
      .field("path", &self.inner.path)
      .field("root", &self.inner.root)
      .finish()
  }
}

impl Copier {
  pub fn new(
    path: impl Into<String>,
    config: CopyConfig,
    file_system: FileSystemRef,
    watcher: WatcherRef,
  ) -> Self {
    let cwd = file_system.cwd().unwrap_or_else(|_| PathBuf::from("/"));

    Self {
      inner: Arc::new(CopierInner {
        path: path.into(),
        root: normalize_path(&cwd, &config.root),
        config,
        file_system,
        watcher,
        events: EventEmitter::default(),
        state: Mutex::new(CopierState::default()),
      }),
    }
  }

  /// Logical path prefix
  pub fn path(&self) -> &str {
    &self.inner.path
  }

  pub fn root(&self) -> &Path {
    &self.inner.root
  }

  pub fn events(&self) -> &EventEmitter {
    &self.inner.events
  }

  pub fn subscribe(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
    self.inner.events.subscribe(handler)
  }

  /// Whether `path` names a file or directory this rule copies
  pub fn exists(&self, path: &str) -> bool {
    let Some((real, relative)) = self.inner.locate(path) else {
      return false;
    };

    match self.inner.file_system.metadata(&real) {
      Ok(metadata) if metadata.is_dir => true,
      Ok(metadata) if metadata.is_file => self.inner.is_included(&relative),
      _ => false,
    }
  }

  pub async fn build(&self, path: &str) -> ConvoyResult<Arc<BuiltAsset>> {
    let not_found = || ConvoyError::AssetNotFound {
      path: path.to_string(),
    };

    let (real, relative) = self.inner.locate(path).ok_or_else(not_found)?;
    let metadata = self
      .inner
      .file_system
      .metadata(&real)
      .map_err(|error| ConvoyError::io(&real, error))?;

    if metadata.is_dir {
      return Err(ConvoyError::IsDirectory { path: real });
    }

    if !self.inner.is_included(&relative) {
      return Err(not_found());
    }

    tracing::debug!("copying {} from {}", path, real.display());

    Ok(Arc::new(BuiltAsset {
      path: path.to_string(),
      content_type: content_type_for(&real).to_string(),
      mtime: Some(metadata.modified_millis()),
      body: AssetBody::File(real),
    }))
  }

  /// Logical paths of every file this rule copies, sorted. Kept until `invalidate`.
  pub async fn find_paths(&self) -> ConvoyResult<Arc<Vec<String>>> {
    let (cell, generation) = {
      let mut state = self.inner.state.lock();
      let cell = state.listing.get_or_insert_with(ListingCell::default).clone();
      (cell, state.generation)
    };

    let result = cell
      .get_or_init(|| async {
        let listing = self.inner.list();
        if listing.is_ok() && self.inner.config.watch {
          CopierInner::arm_watch(&self.inner, generation);
        }
        listing
      })
      .await
      .clone();

    if result.is_err() {
      let mut state = self.inner.state.lock();
      if state
        .listing
        .as_ref()
        .is_some_and(|current| Arc::ptr_eq(current, &cell))
      {
        state.listing = None;
      }
    }

    result
  }

  pub fn invalidate(&self) {
    self.inner.invalidate(None, None);
  }
}

impl CopierInner {
  /// Real path and root-relative path of a logical path, when it falls under this rule
  fn locate(&self, path: &str) -> Option<(PathBuf, PathBuf)> {
    let relative = Path::new(path).strip_prefix(&self.path).ok()?;
    if relative
      .components()
      .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
      return None;
    }

    if relative.as_os_str().is_empty() {
      let name = self.root.file_name().map(PathBuf::from).unwrap_or_default();
      return Some((self.root.clone(), name));
    }

    Some((self.root.join(relative), relative.to_path_buf()))
  }

  fn is_included(&self, relative: &Path) -> bool {
    let relative = relative.to_string_lossy().replace('\\', "/");
    let included = self.config.include.is_empty()
      || self
        .config
        .include
        .iter()
        .any(|pattern| glob_match(pattern, &relative));

    included
      && !self
        .config
        .exclude
        .iter()
        .any(|pattern| glob_match(pattern, &relative))
  }

  fn list(&self) -> ConvoyResult<Arc<Vec<String>>> {
    let metadata = self
      .file_system
      .metadata(&self.root)
      .map_err(|error| ConvoyError::io(&self.root, error))?;

    if !metadata.is_dir {
      let name = self.root.file_name().map(PathBuf::from).unwrap_or_default();
      let paths = if self.is_included(&name) {
        vec![self.path.clone()]
      } else {
        Vec::new()
      };
      return Ok(Arc::new(paths));
    }

    let mut paths = Vec::new();
    let mut pending = vec![self.root.clone()];
    while let Some(dir) = pending.pop() {
      let entries = self
        .file_system
        .read_dir(&dir)
        .map_err(|error| ConvoyError::io(&dir, error))?;

      for entry in entries {
        if self.file_system.is_dir(&entry) {
          pending.push(entry);
          continue;
        }

        let Ok(relative) = entry.strip_prefix(&self.root) else {
          continue;
        };

        if self.is_included(relative) {
          let relative = relative.to_string_lossy().replace('\\', "/");
          paths.push(if self.path.is_empty() {
            relative
          } else {
            format!("{}/{relative}", self.path.trim_end_matches('/'))
          });
        }
      }
    }

    paths.sort();
    tracing::debug!("{} files below {}", paths.len(), self.root.display());
    Ok(Arc::new(paths))
  }

  fn arm_watch(this: &Arc<Self>, generation: u64) {
    let weak: Weak<Self> = Arc::downgrade(this);
    let handle = this.watcher.watch(
      &this.root,
      Arc::new(move |changed: &Path| {
        if let Some(inner) = weak.upgrade() {
          inner.invalidate(Some(generation), Some(changed));
        }
      }),
    );

    match handle {
      Ok(handle) => {
        let mut state = this.state.lock();
        if state.generation == generation && state.watch.is_none() {
          state.watch = Some(handle);
        }
      }
      Err(error) => this
        .events
        .warn(format!("failed to watch {}: {error}", this.root.display())),
    }
  }

  fn invalidate(&self, expected_generation: Option<u64>, changed: Option<&Path>) {
    let watch = {
      let mut state = self.state.lock();
      if expected_generation.is_some_and(|generation| generation != state.generation) {
        return;
      }

      state.generation += 1;
      state.listing = None;
      state.watch.take()
    };

    drop(watch);

    if let Some(changed) = changed {
      self.events.info(format!("changed {}", changed.display()));
    }

    tracing::debug!("invalidated {}", self.path);
    self.events.emit(Event::Invalidate);
  }
}
