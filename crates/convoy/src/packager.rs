use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Weak;

use convoy_core::error::PluginStage;
use convoy_core::events::Event;
use convoy_core::events::EventEmitter;
use convoy_core::events::SubscriptionId;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::AssetBody;
use convoy_core::types::BuiltAsset;
use convoy_core::types::ExpandedAssetList;
use convoy_core::types::GeneratedAsset;
use convoy_core::types::SourceAsset;
use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;
use convoy_filesystem::normalize_path;
use convoy_filesystem::FileSystemRef;
use convoy_resolver::Resolution;
use convoy_resolver::ResolverError;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::expand;
use crate::source_asset_cache::CompiledHook;
use crate::PackagerConfig;
use crate::SourceAssetCache;
use crate::WatchHandle;
use crate::WatcherRef;

type BuildCell = Arc<OnceCell<ConvoyResult<Arc<BuiltAsset>>>>;

/// Builds one output from its main modules and keeps the result until invalidated.
///
/// Everything cached is scoped to a generation: compiled assets, package descriptors, watches
/// and the built asset. `invalidate` starts a new generation. When a build is running at that
/// moment, its callers still get its result and the caches are replaced once it settles.
#[derive(Clone)]
pub struct Packager {
  inner: Arc<PackagerInner>,
}

struct PackagerInner {
  this: Weak<PackagerInner>,
  config: Arc<PackagerConfig>,
  basedir: PathBuf,
  file_system: FileSystemRef,
  watcher: WatcherRef,
  events: EventEmitter,
  state: Mutex<PackagerState>,
}

struct PackagerState {
  generation: u64,
  sources: Arc<SourceAssetCache>,
  build: Option<BuildCell>,
  invalidate_pending: bool,
  watches: HashMap<PathBuf, WatchHandle>,
}

impl fmt::Debug for Packager {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Packager")
      .field("path", &self.inner.config.path)
      .field("generation", &self.generation())
      .finish()
  }
}

impl Packager {
  pub fn new(config: PackagerConfig, file_system: FileSystemRef, watcher: WatcherRef) -> Self {
    let cwd = file_system.cwd().unwrap_or_else(|_| PathBuf::from("/"));
    let basedir = normalize_path(&cwd, &config.basedir);

    let inner = Arc::new_cyclic(|weak: &Weak<PackagerInner>| {
      let config = Arc::new(config);
      let sources = PackagerInner::new_sources(weak, &config, &basedir, &file_system, 0);

      PackagerInner {
        this: weak.clone(),
        config,
        basedir,
        file_system,
        watcher,
        events: EventEmitter::default(),
        state: Mutex::new(PackagerState {
          generation: 0,
          sources,
          build: None,
          invalidate_pending: false,
          watches: HashMap::new(),
        }),
      }
    });

    Self { inner }
  }

  pub fn config(&self) -> &PackagerConfig {
    &self.inner.config
  }

  pub fn path(&self) -> &str {
    &self.inner.config.path
  }

  /// Absolute base directory
  pub fn basedir(&self) -> &Path {
    &self.inner.basedir
  }

  pub fn events(&self) -> &EventEmitter {
    &self.inner.events
  }

  pub fn subscribe(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
    self.inner.events.subscribe(handler)
  }

  /// Number of invalidations so far
  pub fn generation(&self) -> u64 {
    self.inner.state.lock().generation
  }

  /// A packager generates exactly its own output path
  pub fn exists(&self, path: &str) -> bool {
    path == self.inner.config.path
  }

  pub fn find_paths(&self) -> Vec<String> {
    vec![self.inner.config.path.clone()]
  }

  /// Context plugins of the current generation see
  pub fn context(&self) -> Arc<PackagerContext> {
    self.sources().context().clone()
  }

  pub async fn get_source_asset(&self, path: &Path) -> ConvoyResult<Arc<SourceAsset>> {
    self.sources().get_source_asset(path).await
  }

  pub fn resolve(&self, id: &str, basedir: &Path) -> ConvoyResult<Resolution> {
    self.context().resolve(id, basedir)
  }

  pub fn unresolve(&self, path: &Path) -> String {
    self.context().unresolve(path)
  }

  pub async fn expand(&self, roots: Vec<Arc<SourceAsset>>) -> ConvoyResult<ExpandedAssetList> {
    expand(&self.sources(), roots, &self.inner.events).await
  }

  /// The built output. Concurrent callers share one build and its result, which is kept until
  /// `invalidate`. Failed builds are not kept.
  pub async fn build(&self) -> ConvoyResult<Arc<BuiltAsset>> {
    let (cell, sources) = {
      let mut state = self.inner.state.lock();
      let cell = state.build.get_or_insert_with(BuildCell::default).clone();
      (cell, state.sources.clone())
    };

    let result = cell
      .get_or_init(|| self.inner.run_build(sources))
      .await
      .clone();

    self.inner.settle(&cell, result.is_err());
    result
  }

  /// Discard everything cached and emit `Invalidate`
  pub fn invalidate(&self) {
    self.inner.invalidate(None, None);
  }

  fn sources(&self) -> Arc<SourceAssetCache> {
    self.inner.state.lock().sources.clone()
  }
}

impl PackagerInner {
  fn new_sources(
    weak: &Weak<PackagerInner>,
    config: &Arc<PackagerConfig>,
    basedir: &Path,
    file_system: &FileSystemRef,
    generation: u64,
  ) -> Arc<SourceAssetCache> {
    let ctx = PackagerContext::new(
      config.path.clone(),
      basedir.to_path_buf(),
      file_system.clone(),
      config.resolve_options(),
    )
    .with_minify(config.minify.clone(), config.minifier.clone());

    let on_compiled = config.watch.then(|| {
      let weak = weak.clone();
      let hook: CompiledHook = Arc::new(move |asset: &SourceAsset| {
        if let Some(inner) = weak.upgrade() {
          inner.arm_watch(&asset.path, generation);
        }
      });
      hook
    });

    Arc::new(SourceAssetCache::new(
      config.clone(),
      Arc::new(ctx),
      on_compiled,
    ))
  }

  #[tracing::instrument(level = "info", skip_all, fields(path = %self.config.path))]
  async fn run_build(&self, sources: Arc<SourceAssetCache>) -> ConvoyResult<Arc<BuiltAsset>> {
    match self.try_build(&sources).await {
      Ok(asset) => {
        self.events.info(format!("built {}", asset.path));
        Ok(asset)
      }
      Err(error) => {
        self.events.error(error.to_string());
        Err(error)
      }
    }
  }

  async fn try_build(&self, sources: &SourceAssetCache) -> ConvoyResult<Arc<BuiltAsset>> {
    let config = &self.config;
    config.validate()?;

    let ctx = sources.context();
    let output = Path::new(&config.path);

    let mut roots = Vec::with_capacity(config.main.len());
    for specifier in &config.main {
      let path = self.resolve_root(specifier, ctx)?;
      roots.push(sources.get_source_asset(&path).await?);
    }

    let assets = expand(sources, roots, &self.events).await?;
    let mut generated = GeneratedAsset {
      assets,
      ..GeneratedAsset::new(config.path.clone(), config.content_type.clone())
    };

    if let Some(linker) = &config.linker {
      linker
        .link(&mut generated, ctx)
        .await
        .map_err(|error| ConvoyError::plugin(PluginStage::Link, output, error))?;
    }

    for postprocessor in &config.postprocessors {
      postprocessor
        .process(&mut generated, ctx)
        .await
        .map_err(|error| ConvoyError::plugin(PluginStage::Postprocess, output, error))?;
    }

    if let Some(minifier) = config.minifier.as_ref().filter(|_| config.minify.is_enabled()) {
      minifier
        .minify(&mut generated, ctx)
        .await
        .map_err(|error| ConvoyError::plugin(PluginStage::Minify, output, error))?;
    }

    for finalizer in &config.finalizers {
      finalizer
        .process(&mut generated, ctx)
        .await
        .map_err(|error| ConvoyError::plugin(PluginStage::Finalize, output, error))?;
    }

    Ok(Arc::new(BuiltAsset {
      path: generated.path,
      content_type: generated.content_type,
      body: AssetBody::Inline(generated.body),
      mtime: generated.mtime,
    }))
  }

  /// Resolve a main module specifier, as a path below the base directory first and as a module
  /// id second
  fn resolve_root(&self, specifier: &str, ctx: &PackagerContext) -> ConvoyResult<PathBuf> {
    let candidate = normalize_path(&self.basedir, Path::new(specifier));
    let resolution = ctx
      .resolve(&candidate.to_string_lossy(), &self.basedir)
      .or_else(|_| ctx.resolve(specifier, &self.basedir))?;

    match resolution {
      Resolution::Path(path) => Ok(path),
      Resolution::Builtin(id) => Err(ConvoyError::Resolve(ResolverError::ModuleNotFound {
        id,
        context: Some(format!("main module of {}", self.config.path)),
      })),
    }
  }

  /// Apply an invalidation recorded while a build was running
  fn settle(&self, cell: &BuildCell, failed: bool) {
    let dropped = {
      let mut state = self.state.lock();
      if !state
        .build
        .as_ref()
        .is_some_and(|current| Arc::ptr_eq(current, cell))
      {
        return;
      }

      if state.invalidate_pending {
        state.invalidate_pending = false;
        self.reset(&mut state)
      } else {
        if failed {
          state.build = None;
        }
        HashMap::new()
      }
    };

    drop(dropped);
  }

  /// Start a new generation. `expected_generation` makes the call a no-op when another
  /// invalidation got there first.
  fn invalidate(&self, expected_generation: Option<u64>, changed: Option<&Path>) {
    let dropped = {
      let mut state = self.state.lock();
      if expected_generation.is_some_and(|generation| generation != state.generation) {
        return;
      }

      state.generation += 1;

      let building = state.build.as_ref().is_some_and(|cell| !cell.initialized());
      if building {
        state.invalidate_pending = true;
        HashMap::new()
      } else {
        self.reset(&mut state)
      }
    };

    // Watches are stopped outside of the lock, their handlers take it
    drop(dropped);

    if let Some(changed) = changed {
      self.events.info(format!("changed {}", changed.display()));
    }

    tracing::debug!("invalidated {}", self.config.path);
    self.events.emit(Event::Invalidate);
  }

  /// Replace the caches with those of the current generation, returning the old watches
  fn reset(&self, state: &mut PackagerState) -> HashMap<PathBuf, WatchHandle> {
    state.build = None;
    state.sources = Self::new_sources(
      &self.this,
      &self.config,
      &self.basedir,
      &self.file_system,
      state.generation,
    );

    std::mem::take(&mut state.watches)
  }

  fn arm_watch(self: Arc<Self>, path: &Path, generation: u64) {
    {
      let state = self.state.lock();
      if state.generation != generation || state.watches.contains_key(path) {
        return;
      }
    }

    let weak = Arc::downgrade(&self);
    let handle = self.watcher.watch(
      path,
      Arc::new(move |changed: &Path| {
        if let Some(inner) = weak.upgrade() {
          inner.invalidate(Some(generation), Some(changed));
        }
      }),
    );

    let handle = match handle {
      Ok(handle) => handle,
      Err(error) => {
        self
          .events
          .warn(format!("failed to watch {}: {error}", path.display()));
        return;
      }
    };

    let mut state = self.state.lock();
    if state.generation == generation {
      state.watches.entry(path.to_path_buf()).or_insert(handle);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;
  use std::sync::atomic::Ordering;

  use async_trait::async_trait;
  use convoy_core::plugin::Compiler;
  use convoy_core::plugin::Minifier;
  use convoy_core::plugin::Processor;
  use convoy_filesystem::FileSystem;
  use convoy_filesystem::MockFileSystem;
  use convoy_plugin_generic::GenericCompiler;
  use pretty_assertions::assert_eq;
  use tokio::sync::Notify;

  use super::*;
  use crate::test_utils::legacy_config;
  use crate::test_utils::packager_for;
  use crate::test_utils::CountingCompiler;
  use crate::test_utils::EventLog;
  use crate::ManualWatcher;
  use crate::PackagerConfigBuilder;

  const APP: &[(&str, &str)] = &[
    ("/app/main.js", "//= require ./dep\nmain();"),
    ("/app/dep.js", "dep();"),
  ];

  fn body(asset: &BuiltAsset) -> &str {
    match &asset.body {
      AssetBody::Inline(body) => body,
      AssetBody::File(path) => panic!("expected an inline body, got {}", path.display()),
    }
  }

  #[derive(Debug)]
  struct Suffix(&'static str);

  #[async_trait]
  impl Processor for Suffix {
    async fn process(
      &self,
      asset: &mut GeneratedAsset,
      _ctx: &PackagerContext,
    ) -> anyhow::Result<()> {
      asset.body.push_str(self.0);
      Ok(())
    }
  }

  #[derive(Debug, Default)]
  struct Uppercase {
    calls: AtomicUsize,
  }

  #[async_trait]
  impl Minifier for Uppercase {
    async fn minify(&self, asset: &mut GeneratedAsset, _ctx: &PackagerContext) -> anyhow::Result<()> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      asset.body = asset.body.to_uppercase();
      Ok(())
    }
  }

  /// Reads the file, then waits to be released
  #[derive(Debug, Default)]
  struct GatedCompiler {
    started: Arc<Notify>,
    release: Arc<Notify>,
  }

  #[async_trait]
  impl Compiler for GatedCompiler {
    async fn compile(&self, asset: &mut SourceAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
      GenericCompiler::default().compile(asset, ctx).await?;
      self.started.notify_one();
      self.release.notified().await;
      Ok(())
    }
  }

  #[tokio::test]
  async fn builds_dependencies_first_and_keeps_the_result() {
    let compiler = CountingCompiler::default();
    let (packager, _fs, _watcher) = packager_for(
      legacy_config()
        .compiler(".js", Arc::new(compiler.clone()))
        .main_module("main"),
      APP,
    );
    let log = EventLog::default();
    packager.subscribe(log.handler());

    let first = packager.build().await.unwrap();
    let second = packager.build().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(body(&first), "dep();\n//= require ./dep\nmain();");
    assert_eq!(first.content_type, "application/javascript");
    assert_eq!(compiler.count(), 2);
    assert_eq!(log.events(), vec![Event::Info(String::from("built app.js"))]);
  }

  #[tokio::test]
  async fn concurrent_builds_share_one_run() {
    let compiler = CountingCompiler::default();
    let (packager, _fs, _watcher) = packager_for(
      legacy_config()
        .compiler(".js", Arc::new(compiler.clone()))
        .main_module("main"),
      APP,
    );

    let (a, b) = tokio::join!(packager.build(), packager.build());

    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(compiler.count(), 2);
  }

  #[tokio::test]
  async fn invalidate_discards_compiled_assets() {
    let (packager, fs, _watcher) = packager_for(legacy_config().main_module("main"), APP);
    let log = EventLog::default();
    packager.subscribe(log.handler());

    packager.build().await.unwrap();
    fs.write(Path::new("/app/dep.js"), b"dep(2);").unwrap();
    assert_eq!(
      body(&packager.build().await.unwrap()),
      "dep();\n//= require ./dep\nmain();"
    );

    packager.invalidate();

    assert_eq!(log.invalidations(), 1);
    assert_eq!(packager.generation(), 1);
    assert_eq!(
      body(&packager.build().await.unwrap()),
      "dep(2);\n//= require ./dep\nmain();"
    );
  }

  #[tokio::test]
  async fn watched_changes_invalidate_once() {
    let (packager, _fs, watcher) = packager_for(legacy_config().main_module("main").watch(true), APP);
    let log = EventLog::default();
    packager.subscribe(log.handler());

    packager.build().await.unwrap();

    let mut watched = watcher.watched_paths();
    watched.sort();
    assert_eq!(
      watched,
      vec![PathBuf::from("/app/dep.js"), PathBuf::from("/app/main.js")]
    );

    log.clear();
    watcher.fire(Path::new("/app/dep.js"));
    watcher.fire(Path::new("/app/dep.js"));
    watcher.fire(Path::new("/app/main.js"));

    assert_eq!(
      log.events(),
      vec![
        Event::Info(String::from("changed /app/dep.js")),
        Event::Invalidate
      ]
    );
    assert_eq!(watcher.active_watches(), 0);

    packager.build().await.unwrap();
    assert_eq!(watcher.active_watches(), 2);
  }

  #[tokio::test]
  async fn unwatched_packagers_do_not_watch() {
    let (packager, _fs, watcher) = packager_for(legacy_config().main_module("main"), APP);

    packager.build().await.unwrap();

    assert_eq!(watcher.active_watches(), 0);
  }

  #[tokio::test]
  async fn invalidating_during_a_build_applies_when_it_settles() {
    let compiler = Arc::new(GatedCompiler::default());
    let (packager, fs, _watcher) = packager_for(
      legacy_config()
        .compiler(".js", compiler.clone())
        .main_module("main"),
      &[("/app/main.js", "v1")],
    );
    let log = EventLog::default();
    packager.subscribe(log.handler());

    let building = tokio::spawn({
      let packager = packager.clone();
      async move { packager.build().await }
    });

    compiler.started.notified().await;
    fs.write(Path::new("/app/main.js"), b"v2").unwrap();
    packager.invalidate();

    assert_eq!(log.invalidations(), 1);

    compiler.release.notify_one();
    let stale = building.await.unwrap().unwrap();
    assert_eq!(body(&stale), "v1");

    compiler.release.notify_one();
    let fresh = packager.build().await.unwrap();
    assert_eq!(body(&fresh), "v2");
    assert_eq!(log.invalidations(), 1);
  }

  #[tokio::test]
  async fn configuration_errors_are_reported_before_any_io() {
    let mut fs = MockFileSystem::new();
    fs.expect_cwd().returning(|| Ok(PathBuf::from("/")));

    let packager = Packager::new(
      PackagerConfigBuilder::default().path("app.js").build(),
      Arc::new(fs),
      Arc::new(ManualWatcher::default()),
    );
    let log = EventLog::default();
    packager.subscribe(log.handler());

    let error = packager.build().await.unwrap_err();

    assert!(matches!(error, ConvoyError::MissingMain { .. }));
    assert_eq!(
      log.events(),
      vec![Event::Error(String::from("Main module not specified for app.js"))]
    );
  }

  #[tokio::test]
  async fn failed_builds_are_retried() {
    let (packager, fs, _watcher) = packager_for(legacy_config().main_module("main"), &[]);

    assert!(matches!(
      packager.build().await,
      Err(ConvoyError::Resolve(ResolverError::ModuleNotFound { .. }))
    ));

    fs.write(Path::new("/app/main.js"), b"main();").unwrap();
    assert_eq!(body(&packager.build().await.unwrap()), "main();");
  }

  #[tokio::test]
  async fn main_modules_may_be_packages() {
    let (packager, _fs, _watcher) = packager_for(
      legacy_config().main(vec![String::from("lib"), String::from("./main")]),
      &[
        ("/app/main.js", "main();"),
        ("/app/node_modules/lib/package.json", r#"{ "name": "lib", "main": "lib.js" }"#),
        ("/app/node_modules/lib/lib.js", "lib();"),
      ],
    );

    assert_eq!(body(&packager.build().await.unwrap()), "lib();\nmain();");
  }

  #[tokio::test]
  async fn processors_run_around_the_minifier() {
    let minifier = Arc::new(Uppercase::default());
    let (packager, _fs, _watcher) = packager_for(
      legacy_config()
        .main_module("main")
        .postprocessor(Arc::new(Suffix(" post")))
        .finalizer(Arc::new(Suffix(" fin")))
        .minifier(minifier.clone())
        .minify(true),
      &[("/app/main.js", "main();")],
    );

    assert_eq!(body(&packager.build().await.unwrap()), "MAIN(); POST fin");
    assert_eq!(minifier.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn minifier_is_skipped_unless_enabled() {
    let minifier = Arc::new(Uppercase::default());
    let (packager, _fs, _watcher) = packager_for(
      legacy_config().main_module("main").minifier(minifier.clone()),
      &[("/app/main.js", "main();")],
    );

    assert_eq!(body(&packager.build().await.unwrap()), "main();");
    assert_eq!(minifier.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn resolves_and_unresolves_with_the_current_context() {
    let (packager, _fs, _watcher) = packager_for(
      legacy_config().main_module("main"),
      &[
        ("/app/package.json", r#"{ "name": "app" }"#),
        ("/app/lib/util.js", ""),
      ],
    );

    let resolved = packager
      .resolve("./lib/util", Path::new("/app"))
      .unwrap()
      .into_path()
      .unwrap();

    assert_eq!(resolved, PathBuf::from("/app/lib/util.js"));
    assert_eq!(packager.unresolve(&resolved), "app/lib/util");
    assert!(packager.exists("app.js"));
    assert!(!packager.exists("app.css"));
    assert_eq!(packager.find_paths(), vec![String::from("app.js")]);
  }
}
