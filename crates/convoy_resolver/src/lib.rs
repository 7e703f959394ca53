use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use convoy_filesystem::normalize_path;
use convoy_filesystem::FileSystemRef;

pub use builtins::is_builtin;
pub use builtins::BUILTINS;
pub use cache::PackageCache;
pub use error::ResolverError;
pub use package_json::PackageJson;

mod builtins;
mod cache;
mod error;
mod package_json;

/// What a module id maps to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
  /// A platform module, returned unchanged and never loaded from disk
  Builtin(String),

  /// An absolute path to a loadable file
  Path(PathBuf),
}

impl Resolution {
  pub fn into_path(self) -> Option<PathBuf> {
    match self {
      Resolution::Builtin(_) => None,
      Resolution::Path(path) => Some(path),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
  /// Extensions tried, in order, when the id does not name a file. Include the leading dot.
  pub extensions: Vec<String>,

  /// Field of `package.json` naming the package entry point
  pub main_key: String,

  /// Extra directories searched for packages before any `node_modules` directory
  pub paths: Vec<PathBuf>,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    Self {
      extensions: vec![String::from(".js")],
      main_key: String::from("main"),
      paths: Vec::new(),
    }
  }
}

/// Maps module ids to files the way node does, minus the module cache.
///
/// Package descriptors are read through the `PackageCache` handed to each call, which lets the
/// owner decide how long they stay cached.
#[derive(Debug)]
pub struct Resolver {
  fs: FileSystemRef,
  options: ResolveOptions,
}

impl Resolver {
  pub fn new(fs: FileSystemRef, options: ResolveOptions) -> Self {
    Self { fs, options }
  }

  pub fn options(&self) -> &ResolveOptions {
    &self.options
  }

  #[tracing::instrument(level = "trace", skip(self, packages))]
  pub fn resolve(
    &self,
    id: &str,
    basedir: &Path,
    packages: &PackageCache,
  ) -> Result<Resolution, ResolverError> {
    if is_builtin(id) {
      return Ok(Resolution::Builtin(id.to_string()));
    }

    let basedir = self.absolute(basedir);

    if is_relative(id) {
      let target = normalize_path(&basedir, Path::new(id));
      if let Some(path) = self.load(&target, packages) {
        return Ok(Resolution::Path(path));
      }
    } else {
      for dir in self.search_paths(&basedir) {
        if let Some(path) = self.load(&dir.join(id), packages) {
          return Ok(Resolution::Path(path));
        }
      }
    }

    Err(ResolverError::ModuleNotFound {
      id: id.to_string(),
      context: None,
    })
  }

  /// Try `target` as a file and then as a directory
  fn load(&self, target: &Path, packages: &PackageCache) -> Option<PathBuf> {
    self
      .load_as_file(target)
      .or_else(|| self.load_as_directory(target, packages))
  }

  fn load_as_file(&self, target: &Path) -> Option<PathBuf> {
    if self.fs.is_file(target) {
      return Some(target.to_path_buf());
    }

    self
      .options
      .extensions
      .iter()
      .map(|extension| with_suffix(target, extension))
      .find(|candidate| self.fs.is_file(candidate))
  }

  fn load_as_directory(&self, target: &Path, packages: &PackageCache) -> Option<PathBuf> {
    if !self.fs.is_dir(target) {
      return None;
    }

    let main = packages
      .read_package(target)
      .and_then(|package| package.entry(&self.options.main_key).map(String::from));

    if let Some(main) = main {
      let main = normalize_path(target, Path::new(&main));
      let resolved = self
        .load_as_file(&main)
        .or_else(|| self.load_as_file(&main.join("index")));

      if resolved.is_some() {
        return resolved;
      }
    }

    self.load_as_file(&target.join("index"))
  }

  /// Directories searched for package ids, closest first
  fn search_paths(&self, basedir: &Path) -> Vec<PathBuf> {
    let mut dirs = self
      .options
      .paths
      .iter()
      .map(|path| self.absolute(path))
      .collect::<Vec<_>>();

    for ancestor in basedir.ancestors() {
      if ancestor.file_name().is_some_and(|name| name == "node_modules") {
        continue;
      }

      dirs.push(ancestor.join("node_modules"));
    }

    dirs
  }

  fn absolute(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      return normalize_path(path, path);
    }

    match self.fs.cwd() {
      Ok(cwd) => normalize_path(&cwd, path),
      Err(_) => path.to_path_buf(),
    }
  }
}

/// Reverse a file path into the module id other modules of the bundle use for it.
///
/// Files inside a package become `<package dir>/<path without extension>`; anything else keeps
/// its absolute path.
pub fn unresolve(path: &Path, packages: &PackageCache) -> String {
  let Some(package) = packages.nearest_package(path) else {
    return path.to_string_lossy().into_owned();
  };

  let stem = path.with_extension("");
  let relative = pathdiff::diff_paths(&stem, &package.path).unwrap_or(stem);

  let mut id = package.dir_name();
  for component in relative.components() {
    if !id.is_empty() {
      id.push('/');
    }
    id.push_str(&component.as_os_str().to_string_lossy());
  }

  id
}

fn is_relative(id: &str) -> bool {
  id == "."
    || id == ".."
    || id.starts_with("./")
    || id.starts_with("../")
    || id.starts_with('/')
    || id.starts_with('\\')
    || is_windows_absolute(id)
}

fn is_windows_absolute(id: &str) -> bool {
  let bytes = id.as_bytes();
  bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\'
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
  let mut value = OsString::from(path.as_os_str());
  value.push(suffix);
  PathBuf::from(value)
}
