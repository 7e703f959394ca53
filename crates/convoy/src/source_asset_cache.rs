use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_core::error::PluginStage;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::extension_key;
use convoy_core::types::SourceAsset;
use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;
use convoy_filesystem::normalize_path;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::PackagerConfig;

type SourceCell = Arc<OnceCell<ConvoyResult<Arc<SourceAsset>>>>;

/// Called after every successful compile
pub type CompiledHook = Arc<dyn Fn(&SourceAsset) + Send + Sync>;

/// Compiled source assets of one packager, by absolute path.
///
/// Each path is compiled at most once at a time; concurrent requests share the compile and its
/// result. Failed compiles are forgotten so the next request retries.
pub struct SourceAssetCache {
  config: Arc<PackagerConfig>,
  ctx: Arc<PackagerContext>,
  on_compiled: Option<CompiledHook>,
  assets: Mutex<HashMap<PathBuf, SourceCell>>,
}

impl fmt::Debug for SourceAssetCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SourceAssetCache")
      .field("path", &self.config.path)
      .field("assets", &self.assets.lock().len())
      .finish()
  }
}

impl SourceAssetCache {
  pub fn new(
    config: Arc<PackagerConfig>,
    ctx: Arc<PackagerContext>,
    on_compiled: Option<CompiledHook>,
  ) -> Self {
    Self {
      config,
      ctx,
      on_compiled,
      assets: Mutex::new(HashMap::new()),
    }
  }

  pub fn context(&self) -> &Arc<PackagerContext> {
    &self.ctx
  }

  /// The compiled asset for `path`, which is resolved against the packager base directory
  pub async fn get_source_asset(&self, path: &Path) -> ConvoyResult<Arc<SourceAsset>> {
    let path = normalize_path(self.ctx.basedir(), path);

    let cell = self.assets.lock().entry(path.clone()).or_default().clone();
    if cell.initialized() {
      tracing::trace!("source asset cache hit for {}", path.display());
    }

    let result = cell.get_or_init(|| self.compile(&path)).await.clone();

    if result.is_err() {
      let mut assets = self.assets.lock();
      if assets
        .get(&path)
        .is_some_and(|current| Arc::ptr_eq(current, &cell))
      {
        assets.remove(&path);
      }
    }

    result
  }

  /// Forget every compiled asset and package descriptor
  pub fn clear(&self) {
    self.assets.lock().clear();
    self.ctx.clear_packages();
  }

  pub fn len(&self) -> usize {
    self.assets.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[tracing::instrument(level = "debug", skip(self), fields(packager = %self.config.path))]
  async fn compile(&self, path: &Path) -> ConvoyResult<Arc<SourceAsset>> {
    let metadata = self
      .ctx
      .file_system()
      .metadata(path)
      .map_err(|error| ConvoyError::io(path, error))?;

    if metadata.is_dir {
      return Err(ConvoyError::IsDirectory {
        path: path.to_path_buf(),
      });
    }

    let extension = extension_key(path);
    let compiler = self
      .config
      .compilers
      .get(&extension)
      .ok_or_else(|| ConvoyError::NoCompiler {
        path: path.to_path_buf(),
      })?;

    let analyzer = self
      .config
      .analyzer
      .as_ref()
      .ok_or_else(|| ConvoyError::NoAnalyzer {
        path: path.to_path_buf(),
      })?;

    let mut asset = SourceAsset::new(path.to_path_buf(), self.ctx.unresolve(path));
    asset.mtime = metadata.modified_millis();

    compiler
      .compile(&mut asset, &self.ctx)
      .await
      .map_err(|error| ConvoyError::plugin(PluginStage::Compile, path, error))?;

    for preprocessor in self.config.preprocessors.get(&extension).into_iter().flatten() {
      preprocessor
        .preprocess(&mut asset, &self.ctx)
        .await
        .map_err(|error| ConvoyError::plugin(PluginStage::Preprocess, path, error))?;
    }

    analyzer
      .analyze(&mut asset, &self.ctx)
      .await
      .map_err(|error| ConvoyError::plugin(PluginStage::Analyze, path, error))?;

    tracing::debug!(
      "compiled {} as {} with {} dependencies",
      path.display(),
      asset.id,
      asset.dependencies.len()
    );

    if let Some(on_compiled) = &self.on_compiled {
      on_compiled(&asset);
    }

    Ok(Arc::new(asset))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;
  use std::sync::atomic::Ordering;

  use convoy_filesystem::FileSystem;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_utils::cache_for;
  use crate::test_utils::legacy_config;
  use crate::test_utils::CountingCompiler;

  #[tokio::test]
  async fn compiles_analyzes_and_memoizes() {
    let compiler = CountingCompiler::default();
    let (cache, _fs) = cache_for(
      legacy_config().compiler(".js", Arc::new(compiler.clone())),
      &[
        ("/app/package.json", r#"{"name": "app"}"#),
        ("/app/main.js", "//= require ./lib/util\nmain();"),
        ("/app/lib/util.js", "util();"),
      ],
    );

    let first = cache.get_source_asset(Path::new("main.js")).await.unwrap();
    let second = cache
      .get_source_asset(Path::new("/app/main.js"))
      .await
      .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(compiler.count(), 1);
    assert_eq!(first.id, "app/main");
    assert_eq!(first.dependencies, vec![PathBuf::from("/app/lib/util.js")]);
  }

  #[tokio::test]
  async fn concurrent_requests_share_one_compile() {
    let compiler = CountingCompiler::default();
    let (cache, _fs) = cache_for(
      legacy_config().compiler(".js", Arc::new(compiler.clone())),
      &[("/app/main.js", "main();")],
    );

    let path = Path::new("/app/main.js");
    let (a, b, c) = tokio::join!(
      cache.get_source_asset(path),
      cache.get_source_asset(path),
      cache.get_source_asset(path)
    );

    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert!(c.is_ok());
    assert_eq!(compiler.count(), 1);
  }

  #[tokio::test]
  async fn reports_missing_files_and_directories() {
    let (cache, _fs) = cache_for(legacy_config(), &[("/app/lib/util.js", "")]);

    assert!(matches!(
      cache.get_source_asset(Path::new("/app/missing.js")).await,
      Err(ConvoyError::NotFound { .. })
    ));
    assert!(matches!(
      cache.get_source_asset(Path::new("/app/lib")).await,
      Err(ConvoyError::IsDirectory { .. })
    ));
  }

  #[tokio::test]
  async fn requires_a_compiler_for_the_extension() {
    let (cache, _fs) = cache_for(legacy_config(), &[("/app/main.ts", "")]);

    assert!(matches!(
      cache.get_source_asset(Path::new("/app/main.ts")).await,
      Err(ConvoyError::NoCompiler { .. })
    ));
  }

  #[tokio::test]
  async fn failures_are_retried() {
    let (cache, fs) = cache_for(legacy_config(), &[]);
    let path = Path::new("/app/late.js");

    assert!(cache.get_source_asset(path).await.is_err());
    assert!(cache.is_empty());

    fs.write(path, b"late();").unwrap();
    assert_eq!(cache.get_source_asset(path).await.unwrap().body, "late();");
  }

  #[tokio::test]
  async fn preprocessors_run_in_order_before_analysis() {
    let (cache, _fs) = cache_for(
      legacy_config()
        .preprocessor(".js", Arc::new(crate::test_utils::Append("// one")))
        .preprocessor(".js", Arc::new(crate::test_utils::Append("//= require ./dep"))),
      &[("/app/main.js", "main();"), ("/app/dep.js", "")],
    );

    let asset = cache
      .get_source_asset(Path::new("/app/main.js"))
      .await
      .unwrap();

    assert_eq!(asset.body, "main();\n// one\n//= require ./dep");
    assert_eq!(asset.dependencies, vec![PathBuf::from("/app/dep.js")]);
  }

  #[tokio::test]
  async fn clear_forgets_compiled_assets() {
    let compiled = Arc::new(AtomicUsize::new(0));
    let counter = compiled.clone();
    let (cache, _fs) = crate::test_utils::cache_with_hook(
      legacy_config(),
      &[("/app/main.js", "")],
      Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
      }),
    );
    let path = Path::new("/app/main.js");

    cache.get_source_asset(path).await.unwrap();
    cache.clear();
    cache.get_source_asset(path).await.unwrap();

    assert_eq!(compiled.load(Ordering::SeqCst), 2);
  }
}
