use std::path::PathBuf;

use serde::Deserialize;

use crate::ResolverError;

/// A parsed `package.json` descriptor
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PackageJson {
  /// Directory containing the descriptor
  #[serde(skip)]
  pub path: PathBuf,

  #[serde(default)]
  pub name: Option<String>,

  #[serde(default)]
  pub version: Option<String>,

  /// Overrides consulted before the top level keys, e.g. `{"convoy": {"main": "lib/browser"}}`
  #[serde(default)]
  pub convoy: Option<serde_json::Map<String, serde_json::Value>>,

  #[serde(flatten)]
  pub fields: serde_json::Map<String, serde_json::Value>,
}

impl PackageJson {
  pub fn parse(path: PathBuf, data: &str) -> Result<PackageJson, ResolverError> {
    let mut package: PackageJson =
      serde_json::from_str(data).map_err(|error| ResolverError::InvalidJson {
        path: path.join("package.json"),
        line: error.line(),
        column: error.column(),
        message: error.to_string(),
      })?;

    package.path = path;
    Ok(package)
  }

  /// The entry point named by `main_key`, preferring the `convoy` override
  pub fn entry(&self, main_key: &str) -> Option<&str> {
    self
      .convoy
      .as_ref()
      .and_then(|convoy| convoy.get(main_key))
      .and_then(|value| value.as_str())
      .or_else(|| self.fields.get(main_key).and_then(|value| value.as_str()))
  }

  /// Directory name of the package, used as the first segment of its module ids
  pub fn dir_name(&self) -> String {
    self
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn entry_prefers_convoy_override() {
    let package = PackageJson::parse(
      PathBuf::from("/node_modules/widget"),
      r#"{ "name": "widget", "main": "lib/node.js", "convoy": { "main": "lib/browser.js" } }"#,
    )
    .unwrap();

    assert_eq!(package.entry("main"), Some("lib/browser.js"));
    assert_eq!(package.name.as_deref(), Some("widget"));
    assert_eq!(package.dir_name(), "widget");
  }

  #[test]
  fn entry_reads_custom_main_key() {
    let package = PackageJson::parse(
      PathBuf::from("/pkg"),
      r#"{ "main": "index.js", "browser": "browser.js" }"#,
    )
    .unwrap();

    assert_eq!(package.entry("browser"), Some("browser.js"));
    assert_eq!(package.entry("main"), Some("index.js"));
    assert_eq!(package.entry("module"), None);
  }

  #[test]
  fn parse_reports_position() {
    let error = PackageJson::parse(PathBuf::from("/pkg"), "{\n  \"main\": }").unwrap_err();

    match error {
      ResolverError::InvalidJson { path, line, .. } => {
        assert_eq!(path, PathBuf::from("/pkg/package.json"));
        assert_eq!(line, 2);
      }
      error => panic!("unexpected error {error:?}"),
    }
  }
}
