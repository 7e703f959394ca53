use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_resolver::PackageJson;

/// One compiled source file within a packager
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceAsset {
  /// Absolute path of the backing file. Unique within one packager.
  pub path: PathBuf,

  /// Logical module id, package relative and without extension.
  ///
  /// Two assets with the same id and different paths are candidates for conflict resolution.
  pub id: String,

  /// Compiled text
  pub body: String,

  /// Modification time of the backing file in milliseconds since the Unix epoch
  pub mtime: u64,

  /// Absolute paths of the files this asset depends on, in declaration order
  pub dependencies: Vec<PathBuf>,

  /// Descriptor of the package containing the file
  pub package: Option<Arc<PackageJson>>,
}

impl SourceAsset {
  pub fn new(path: PathBuf, id: String) -> Self {
    Self {
      path,
      id,
      ..SourceAsset::default()
    }
  }

  /// Key used to select compilers and preprocessors, e.g. `.js`
  pub fn extension(&self) -> String {
    extension_key(&self.path)
  }

  /// Directory dependencies are resolved from
  pub fn dirname(&self) -> &Path {
    self.path.parent().unwrap_or(Path::new("/"))
  }
}

/// The extension of `path` including the leading dot, or an empty string
pub fn extension_key(path: &Path) -> String {
  path
    .extension()
    .map(|extension| format!(".{}", extension.to_string_lossy()))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extension_includes_the_dot() {
    let asset = SourceAsset::new(PathBuf::from("/app/lib/a.coffee"), String::from("app/lib/a"));

    assert_eq!(asset.extension(), ".coffee");
    assert_eq!(asset.dirname(), Path::new("/app/lib"));
    assert_eq!(extension_key(Path::new("/app/Makefile")), "");
  }
}
