use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_filesystem::FileSystemRef;
use parking_lot::RwLock;

use crate::PackageJson;

/// Caches parsed `package.json` descriptors by package directory.
///
/// Misses (no descriptor, or one that does not parse) are cached too. Owners clear the cache
/// whenever their compiled assets are invalidated.
pub struct PackageCache {
  fs: FileSystemRef,
  packages: RwLock<HashMap<PathBuf, Option<Arc<PackageJson>>>>,
}

impl fmt::Debug for PackageCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PackageCache").finish()
  }
}

impl PackageCache {
  pub fn new(fs: FileSystemRef) -> Self {
    Self {
      fs,
      packages: RwLock::new(HashMap::new()),
    }
  }

  /// Read the descriptor of the package rooted at `dir`
  pub fn read_package(&self, dir: &Path) -> Option<Arc<PackageJson>> {
    if let Some(package) = self.packages.read().get(dir) {
      return package.clone();
    }

    let package = self.load(dir).map(Arc::new);
    self
      .packages
      .write()
      .insert(dir.to_path_buf(), package.clone());

    package
  }

  /// Find the package owning `path`: the closest ancestor directory with a `package.json`
  pub fn nearest_package(&self, path: &Path) -> Option<Arc<PackageJson>> {
    let start = if self.fs.is_dir(path) {
      Some(path)
    } else {
      path.parent()
    };

    start?
      .ancestors()
      .find_map(|dir| self.read_package(dir))
  }

  pub fn clear(&self) {
    self.packages.write().clear();
  }

  fn load(&self, dir: &Path) -> Option<PackageJson> {
    let descriptor = dir.join("package.json");
    if !self.fs.is_file(&descriptor) {
      return None;
    }

    let contents = match self.fs.read_to_string(&descriptor) {
      Ok(contents) => contents,
      Err(error) => {
        tracing::debug!("Unable to read {}: {error}", descriptor.display());
        return None;
      }
    };

    match PackageJson::parse(dir.to_path_buf(), &contents) {
      Ok(package) => Some(package),
      Err(error) => {
        tracing::debug!("Ignoring package descriptor: {error}");
        None
      }
    }
  }
}
