use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_filesystem::FileSystemRef;
use convoy_resolver::unresolve;
use convoy_resolver::PackageCache;
use convoy_resolver::PackageJson;
use convoy_resolver::Resolution;
use convoy_resolver::ResolveOptions;
use convoy_resolver::Resolver;

use crate::plugin::Minifier;
use crate::types::GeneratedAsset;
use crate::types::MinifyOption;
use crate::ConvoyError;
use crate::ConvoyResult;

/// What plugins of one packager can see and do
pub struct PackagerContext {
  path: String,
  basedir: PathBuf,
  file_system: FileSystemRef,
  resolver: Resolver,
  packages: PackageCache,
  minify: MinifyOption,
  minifier: Option<Arc<dyn Minifier>>,
}

impl fmt::Debug for PackagerContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PackagerContext")
      .field("path", &self.path)
      .field("basedir", &self.basedir)
      .field("minify", &self.minify)
      .finish()
  }
}

impl PackagerContext {
  pub fn new(
    path: impl Into<String>,
    basedir: PathBuf,
    file_system: FileSystemRef,
    resolve_options: ResolveOptions,
  ) -> Self {
    Self {
      path: path.into(),
      basedir,
      resolver: Resolver::new(file_system.clone(), resolve_options),
      packages: PackageCache::new(file_system.clone()),
      file_system,
      minify: MinifyOption::Disabled,
      minifier: None,
    }
  }

  pub fn with_minify(mut self, minify: MinifyOption, minifier: Option<Arc<dyn Minifier>>) -> Self {
    self.minify = minify;
    self.minifier = minifier;
    self
  }

  /// Output path of the packager
  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn basedir(&self) -> &Path {
    &self.basedir
  }

  pub fn file_system(&self) -> &FileSystemRef {
    &self.file_system
  }

  pub fn resolve_options(&self) -> &ResolveOptions {
    self.resolver.options()
  }

  pub fn minify(&self) -> &MinifyOption {
    &self.minify
  }

  pub fn minifier(&self) -> Option<&Arc<dyn Minifier>> {
    self.minifier.as_ref()
  }

  /// Resolve `id` as if it was required from a file in `basedir`
  pub fn resolve(&self, id: &str, basedir: &Path) -> ConvoyResult<Resolution> {
    Ok(self.resolver.resolve(id, basedir, &self.packages)?)
  }

  /// The module id other modules use to refer to `path`
  pub fn unresolve(&self, path: &Path) -> String {
    unresolve(path, &self.packages)
  }

  pub fn nearest_package(&self, path: &Path) -> Option<Arc<PackageJson>> {
    self.packages.nearest_package(path)
  }

  /// Forget every package descriptor read so far
  pub fn clear_packages(&self) {
    self.packages.clear();
  }

  pub fn read_to_string(&self, path: &Path) -> ConvoyResult<String> {
    self
      .file_system
      .read_to_string(path)
      .map_err(|error| ConvoyError::io(path, error))
  }

  /// Minify a single module body when minification is on, for linkers that shrink each module
  /// separately
  pub async fn minify_body(&self, body: String) -> anyhow::Result<String> {
    let Some(minifier) = self.minifier.as_ref().filter(|_| self.minify.is_enabled()) else {
      return Ok(body);
    };

    let mut asset = GeneratedAsset::from_body(self.path.clone(), body);
    minifier.minify(&mut asset, self).await?;
    Ok(asset.body)
  }
}
