use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use convoy_core::events::Event;
use convoy_core::events::EventEmitter;
use convoy_core::events::SubscriptionId;
use convoy_core::types::AssetBody;
use convoy_core::types::BuiltAsset;
use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;
use convoy_filesystem::normalize_path;
use convoy_filesystem::FileSystemRef;
use futures::future::try_join_all;
use indexmap::IndexMap;
use indexmap::IndexSet;
use parking_lot::RwLock;

use crate::write::copy_atomic;
use crate::write::write_atomic;
use crate::Copier;
use crate::DirectoryCreator;
use crate::Encoding;
use crate::Packager;
use crate::PackagerConfig;
use crate::TargetConfig;
use crate::WatcherRef;

/// What serves a pipeline path
#[derive(Clone, Debug)]
pub enum Target {
  Packager(Packager),
  Copier(Copier),
}

impl Target {
  pub fn exists(&self, path: &str) -> bool {
    match self {
      Target::Packager(packager) => packager.exists(path),
      Target::Copier(copier) => copier.exists(path),
    }
  }

  pub async fn build(&self, path: &str) -> ConvoyResult<Arc<BuiltAsset>> {
    match self {
      Target::Packager(packager) => packager.build().await,
      Target::Copier(copier) => copier.build(path).await.inspect_err(|error| {
        copier.events().error(error.to_string());
      }),
    }
  }

  pub async fn find_paths(&self) -> ConvoyResult<Vec<String>> {
    match self {
      Target::Packager(packager) => Ok(packager.find_paths()),
      Target::Copier(copier) => Ok(copier.find_paths().await?.to_vec()),
    }
  }

  pub fn invalidate(&self) {
    match self {
      Target::Packager(packager) => packager.invalidate(),
      Target::Copier(copier) => copier.invalidate(),
    }
  }

  pub fn events(&self) -> &EventEmitter {
    match self {
      Target::Packager(packager) => packager.events(),
      Target::Copier(copier) => copier.events(),
    }
  }

  fn encoding(&self) -> Encoding {
    match self {
      Target::Packager(packager) => packager.config().encoding,
      Target::Copier(_) => Encoding::default(),
    }
  }
}

struct Member {
  target: Target,
  subscription: SubscriptionId,
}

/// Output paths and the packagers and copy rules that produce them.
///
/// A target's own invalidation is re-emitted by the pipeline as a single `Invalidate` without
/// touching the other targets. `invalidate` resets every target and also emits one `Invalidate`.
#[derive(Clone)]
pub struct Pipeline {
  inner: Arc<PipelineInner>,
}

struct PipelineInner {
  file_system: FileSystemRef,
  watcher: WatcherRef,
  events: EventEmitter,
  targets: RwLock<IndexMap<String, Member>>,
  propagating: AtomicBool,
  directories: DirectoryCreator,
}

impl fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pipeline")
      .field("targets", &self.inner.targets.read().keys().collect::<Vec<_>>())
      .finish()
  }
}

impl Pipeline {
  pub fn new(file_system: FileSystemRef, watcher: WatcherRef) -> Self {
    Self {
      inner: Arc::new(PipelineInner {
        directories: DirectoryCreator::new(file_system.clone()),
        file_system,
        watcher,
        events: EventEmitter::default(),
        targets: RwLock::new(IndexMap::new()),
        propagating: AtomicBool::new(false),
      }),
    }
  }

  pub fn subscribe(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
    self.inner.events.subscribe(handler)
  }

  pub fn unsubscribe(&self, id: SubscriptionId) {
    self.inner.events.unsubscribe(id);
  }

  /// Register `config` under `path`, replacing any target already there
  pub fn add(&self, path: impl Into<String>, config: impl Into<TargetConfig>) -> ConvoyResult<Target> {
    let path = path.into();
    let target = match config.into() {
      TargetConfig::Packager(config) => Target::Packager(Packager::new(
        PackagerConfig {
          path: path.clone(),
          ..config
        },
        self.inner.file_system.clone(),
        self.inner.watcher.clone(),
      )),
      TargetConfig::Copy(config) => {
        if config.root.as_os_str().is_empty() {
          return Err(ConvoyError::MissingCopyRoot { path });
        }

        Target::Copier(Copier::new(
          path.clone(),
          config,
          self.inner.file_system.clone(),
          self.inner.watcher.clone(),
        ))
      }
    };

    let subscription = target.events().subscribe({
      let pipeline = Arc::downgrade(&self.inner);
      let path = path.clone();
      move |event: &Event| {
        if let Some(pipeline) = Weak::upgrade(&pipeline) {
          pipeline.forward(&path, event);
        }
      }
    });

    tracing::debug!("adding {path}");
    let previous = self.inner.targets.write().insert(
      path,
      Member {
        target: target.clone(),
        subscription,
      },
    );

    if let Some(previous) = previous {
      previous.target.events().unsubscribe(previous.subscription);
    }

    Ok(target)
  }

  /// Drop the target registered under `path`
  pub fn remove(&self, path: &str) -> Option<Target> {
    let member = self.inner.targets.write().shift_remove(path)?;
    member.target.events().unsubscribe(member.subscription);
    Some(member.target)
  }

  /// The target registered under exactly `path`
  pub fn get(&self, path: &str) -> Option<Target> {
    self
      .inner
      .targets
      .read()
      .get(path)
      .map(|member| member.target.clone())
  }

  /// The target serving `path`. Packagers claim the paths they generate; otherwise the copy rule
  /// with the longest matching prefix is used.
  pub fn lookup(&self, path: &str) -> Option<Target> {
    let targets = self.inner.targets.read();

    let packager = targets
      .values()
      .map(|member| &member.target)
      .find(|target| matches!(target, Target::Packager(packager) if packager.exists(path)));

    if let Some(packager) = packager {
      return Some(packager.clone());
    }

    targets
      .iter()
      .filter(|(_, member)| matches!(member.target, Target::Copier(_)))
      .filter(|(prefix, _)| Path::new(path).starts_with(prefix.as_str()))
      .max_by_key(|(prefix, _)| Path::new(prefix.as_str()).components().count())
      .map(|(_, member)| member.target.clone())
  }

  pub fn exists(&self, path: &str) -> bool {
    self
      .lookup(path)
      .is_some_and(|target| target.exists(path))
  }

  pub async fn build(&self, path: &str) -> ConvoyResult<Arc<BuiltAsset>> {
    let Some(target) = self.lookup(path) else {
      let error = ConvoyError::AssetNotFound {
        path: path.to_string(),
      };
      self.inner.events.error(error.to_string());
      return Err(error);
    };

    target.build(path).await
  }

  /// Every path some target generates, in registration order
  pub async fn find_paths(&self) -> ConvoyResult<Vec<String>> {
    let targets = self.targets();
    let listings = try_join_all(targets.iter().map(|target| target.find_paths())).await?;

    Ok(
      listings
        .into_iter()
        .flatten()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect(),
    )
  }

  /// Build `path` and write it below `dir`, returning the written file
  #[tracing::instrument(level = "debug", skip(self, dir))]
  pub async fn write_file(&self, path: &str, dir: &Path) -> ConvoyResult<PathBuf> {
    let target = self.lookup(path).ok_or_else(|| ConvoyError::AssetNotFound {
      path: path.to_string(),
    })?;
    let asset = target.build(path).await?;

    let cwd = self
      .inner
      .file_system
      .cwd()
      .unwrap_or_else(|_| PathBuf::from("/"));
    let destination = normalize_path(&normalize_path(&cwd, dir), Path::new(path));

    if let Some(parent) = destination.parent() {
      self.inner.directories.create_all(parent).await?;
    }

    match &asset.body {
      AssetBody::Inline(body) => {
        let contents = target.encoding().encode(body);
        write_atomic(&self.inner.file_system, &destination, contents).await?;
      }
      AssetBody::File(source) => {
        copy_atomic(&self.inner.file_system, source, &destination).await?;
      }
    }

    self
      .inner
      .events
      .info(format!("wrote {}", destination.display()));

    Ok(destination)
  }

  /// Write everything `find_paths` lists below `dir`, concurrently
  pub async fn write_all(&self, dir: &Path) -> ConvoyResult<Vec<PathBuf>> {
    let paths = self.find_paths().await?;
    try_join_all(paths.iter().map(|path| self.write_file(path, dir))).await
  }

  /// Invalidate every target, emitting a single `Invalidate`
  pub fn invalidate(&self) {
    self.inner.broadcast(|| {
      for target in self.targets() {
        target.invalidate();
      }
      self.inner.directories.clear();
    });
  }

  fn targets(&self) -> Vec<Target> {
    self
      .inner
      .targets
      .read()
      .values()
      .map(|member| member.target.clone())
      .collect()
  }
}

impl PipelineInner {
  fn forward(&self, path: &str, event: &Event) {
    match event {
      Event::Invalidate => self.broadcast(|| {}),
      event => self.events.emit(event.clone().prefixed(path)),
    }
  }

  /// Run `invalidate` then emit `Invalidate`, unless a broadcast is already under way
  fn broadcast(&self, invalidate: impl FnOnce()) {
    if self.propagating.swap(true, Ordering::SeqCst) {
      tracing::trace!("suppressed nested invalidation");
      return;
    }

    invalidate();
    tracing::info!("pipeline invalidated");
    self.events.emit(Event::Invalidate);

    self.propagating.store(false, Ordering::SeqCst);
  }
}
