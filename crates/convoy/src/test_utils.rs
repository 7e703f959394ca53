use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use convoy_core::events::Event;
use convoy_core::plugin::Compiler;
use convoy_core::plugin::PackagerContext;
use convoy_core::plugin::Preprocessor;
use convoy_core::types::SourceAsset;
use convoy_filesystem::in_memory_file_system::InMemoryFileSystem;
use convoy_filesystem::FileSystem;
use convoy_plugin_generic::GenericAnalyzer;
use convoy_plugin_generic::GenericCompiler;
use convoy_plugin_generic::SimpleMergeLinker;
use parking_lot::Mutex;

use crate::source_asset_cache::CompiledHook;
use crate::ManualWatcher;
use crate::Packager;
use crate::PackagerConfigBuilder;
use crate::SourceAssetCache;

/// `app.js` from `/app`, concatenating `//= require` dependencies
pub fn legacy_config() -> PackagerConfigBuilder {
  PackagerConfigBuilder::default()
    .path("app.js")
    .basedir("/app")
    .compiler(".js", Arc::new(GenericCompiler::default()))
    .analyzer(Arc::new(GenericAnalyzer::default()))
    .linker(Arc::new(SimpleMergeLinker::default()))
}

pub fn file_system(files: &[(&str, &str)]) -> Arc<InMemoryFileSystem> {
  let fs = Arc::new(InMemoryFileSystem::default());
  for (path, contents) in files {
    fs.write(Path::new(path), contents.as_bytes()).unwrap();
  }
  fs
}

pub fn cache_for(
  builder: PackagerConfigBuilder,
  files: &[(&str, &str)],
) -> (SourceAssetCache, Arc<InMemoryFileSystem>) {
  cache_with(builder, files, None)
}

pub fn cache_with_hook(
  builder: PackagerConfigBuilder,
  files: &[(&str, &str)],
  hook: CompiledHook,
) -> (SourceAssetCache, Arc<InMemoryFileSystem>) {
  cache_with(builder, files, Some(hook))
}

fn cache_with(
  builder: PackagerConfigBuilder,
  files: &[(&str, &str)],
  hook: Option<CompiledHook>,
) -> (SourceAssetCache, Arc<InMemoryFileSystem>) {
  let fs = file_system(files);
  let config = Arc::new(builder.build());
  let ctx = PackagerContext::new(
    config.path.clone(),
    config.basedir.clone(),
    fs.clone(),
    config.resolve_options(),
  )
  .with_minify(config.minify.clone(), config.minifier.clone());

  (SourceAssetCache::new(config, Arc::new(ctx), hook), fs)
}

pub fn packager_for(
  builder: PackagerConfigBuilder,
  files: &[(&str, &str)],
) -> (Packager, Arc<InMemoryFileSystem>, Arc<ManualWatcher>) {
  let fs = file_system(files);
  let watcher = Arc::new(ManualWatcher::default());
  let packager = Packager::new(builder.build(), fs.clone(), watcher.clone());

  (packager, fs, watcher)
}

/// Every event a subscriber saw, in order
#[derive(Clone, Default)]
pub struct EventLog {
  events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
  pub fn handler(&self) -> impl Fn(&Event) + Send + Sync + 'static {
    let events = self.events.clone();
    move |event: &Event| events.lock().push(event.clone())
  }

  pub fn events(&self) -> Vec<Event> {
    self.events.lock().clone()
  }

  pub fn invalidations(&self) -> usize {
    self
      .events
      .lock()
      .iter()
      .filter(|event| **event == Event::Invalidate)
      .count()
  }

  pub fn clear(&self) {
    self.events.lock().clear();
  }
}

/// Reads files like `GenericCompiler`, counting compiles
#[derive(Clone, Debug, Default)]
pub struct CountingCompiler {
  count: Arc<AtomicUsize>,
}

impl CountingCompiler {
  pub fn count(&self) -> usize {
    self.count.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Compiler for CountingCompiler {
  async fn compile(&self, asset: &mut SourceAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
    self.count.fetch_add(1, Ordering::SeqCst);
    GenericCompiler::default().compile(asset, ctx).await
  }
}

/// Appends a line to every body
#[derive(Debug)]
pub struct Append(pub &'static str);

#[async_trait]
impl Preprocessor for Append {
  async fn preprocess(&self, asset: &mut SourceAsset, _ctx: &PackagerContext) -> anyhow::Result<()> {
    asset.body.push('\n');
    asset.body.push_str(self.0);
    Ok(())
  }
}
