use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_core::plugin::Analyzer;
use convoy_core::plugin::Compiler;
use convoy_core::plugin::Linker;
use convoy_core::plugin::Minifier;
use convoy_core::plugin::Preprocessor;
use convoy_core::plugin::Processor;
use convoy_core::types::content_type_for;
use convoy_core::types::MinifyOption;
use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;
use convoy_resolver::ResolveOptions;
use derive_builder::Builder;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

/// Character encoding used when writing inline bodies to disk
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Encoding {
  #[default]
  #[serde(rename = "utf8", alias = "utf-8")]
  Utf8,

  #[serde(rename = "utf16le", alias = "utf-16le", alias = "ucs2")]
  Utf16Le,

  /// Characters outside of Latin-1 are written as `?`
  #[serde(rename = "latin1", alias = "binary")]
  Latin1,
}

impl Encoding {
  pub fn encode(&self, body: &str) -> Vec<u8> {
    match self {
      Encoding::Utf8 => body.as_bytes().to_vec(),
      Encoding::Utf16Le => body.encode_utf16().flat_map(u16::to_le_bytes).collect(),
      Encoding::Latin1 => body
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect(),
    }
  }
}

/// Everything a packager needs to turn its main modules into one output.
///
/// Configurations are immutable once built. Presets in [`crate::presets`] return builders with
/// the plugins filled in, so callers only add what differs.
#[derive(Builder, Clone, Debug)]
#[builder(build_fn(skip), pattern = "owned", setter(strip_option), derive(Clone))]
pub struct PackagerConfig {
  /// Output path, relative to the pipeline root. `Pipeline::add` sets it from the target path.
  #[builder(setter(into))]
  pub path: String,

  /// Defaults to the content type of the output path's extension
  #[builder(setter(into))]
  pub content_type: String,

  /// Directory main modules and relative paths are resolved from. Defaults to the working
  /// directory.
  #[builder(setter(into))]
  pub basedir: PathBuf,

  /// Root module specifiers: file paths relative to `basedir`, package directories or names
  pub main: Vec<String>,

  /// Compilers by extension, including the dot. The keys are also the extensions the resolver
  /// tries, in order.
  pub compilers: IndexMap<String, Arc<dyn Compiler>>,

  pub preprocessors: IndexMap<String, Vec<Arc<dyn Preprocessor>>>,

  pub analyzer: Option<Arc<dyn Analyzer>>,

  pub linker: Option<Arc<dyn Linker>>,

  pub minifier: Option<Arc<dyn Minifier>>,

  pub postprocessors: Vec<Arc<dyn Processor>>,

  pub finalizers: Vec<Arc<dyn Processor>>,

  #[builder(setter(into))]
  pub minify: MinifyOption,

  /// Watch compiled files and invalidate when they change
  pub watch: bool,

  /// Field of `package.json` naming the package entry point
  #[builder(setter(into))]
  pub main_key: String,

  /// Extra package search directories
  pub paths: Vec<PathBuf>,

  pub encoding: Encoding,
}

impl PackagerConfigBuilder {
  pub fn compiler(mut self, extension: impl Into<String>, compiler: Arc<dyn Compiler>) -> Self {
    self
      .compilers
      .get_or_insert_with(IndexMap::new)
      .insert(extension.into(), compiler);
    self
  }

  pub fn preprocessor(
    mut self,
    extension: impl Into<String>,
    preprocessor: Arc<dyn Preprocessor>,
  ) -> Self {
    self
      .preprocessors
      .get_or_insert_with(IndexMap::new)
      .entry(extension.into())
      .or_default()
      .push(preprocessor);
    self
  }

  pub fn postprocessor(mut self, postprocessor: Arc<dyn Processor>) -> Self {
    self
      .postprocessors
      .get_or_insert_with(Vec::new)
      .push(postprocessor);
    self
  }

  pub fn finalizer(mut self, finalizer: Arc<dyn Processor>) -> Self {
    self.finalizers.get_or_insert_with(Vec::new).push(finalizer);
    self
  }

  /// Replace the main modules with a single one
  pub fn main_module(self, main: impl Into<String>) -> Self {
    self.main(vec![main.into()])
  }

  pub fn build(self) -> PackagerConfig {
    let path = self.path.unwrap_or_default();
    let content_type = self
      .content_type
      .unwrap_or_else(|| content_type_for(Path::new(&path)).to_string());

    PackagerConfig {
      path,
      content_type,
      basedir: self.basedir.unwrap_or_default(),
      main: self.main.unwrap_or_default(),
      compilers: self.compilers.unwrap_or_default(),
      preprocessors: self.preprocessors.unwrap_or_default(),
      analyzer: self.analyzer.flatten(),
      linker: self.linker.flatten(),
      minifier: self.minifier.flatten(),
      postprocessors: self.postprocessors.unwrap_or_default(),
      finalizers: self.finalizers.unwrap_or_default(),
      minify: self.minify.unwrap_or_default(),
      watch: self.watch.unwrap_or_default(),
      main_key: self.main_key.unwrap_or_else(|| String::from("main")),
      paths: self.paths.unwrap_or_default(),
      encoding: self.encoding.unwrap_or_default(),
    }
  }
}

impl PackagerConfig {
  /// Check the settings a build cannot start without
  pub fn validate(&self) -> ConvoyResult<()> {
    if self.path.is_empty() {
      return Err(ConvoyError::MissingPath);
    }

    if self.main.is_empty() {
      return Err(ConvoyError::MissingMain {
        path: self.path.clone(),
      });
    }

    if self.linker.is_none() {
      return Err(ConvoyError::MissingLinker {
        path: self.path.clone(),
      });
    }

    if self.minify.is_enabled() && self.minifier.is_none() {
      return Err(ConvoyError::MissingMinifier {
        path: self.path.clone(),
      });
    }

    Ok(())
  }

  pub fn resolve_options(&self) -> ResolveOptions {
    ResolveOptions {
      extensions: self.compilers.keys().cloned().collect(),
      main_key: self.main_key.clone(),
      paths: self.paths.clone(),
    }
  }
}

/// A directory or file served verbatim under a path prefix
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CopyConfig {
  pub root: PathBuf,

  /// Glob patterns relative to `root`. When any are given only matching files are copied.
  pub include: Vec<String>,

  /// Glob patterns relative to `root` of files to leave out
  pub exclude: Vec<String>,

  pub watch: bool,
}

impl CopyConfig {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      ..CopyConfig::default()
    }
  }
}

/// What a pipeline path is served by
#[derive(Clone, Debug)]
pub enum TargetConfig {
  Packager(PackagerConfig),
  Copy(CopyConfig),
}

impl TargetConfig {
  pub fn with_watch(self, watch: bool) -> Self {
    match self {
      TargetConfig::Packager(config) => TargetConfig::Packager(PackagerConfig { watch, ..config }),
      TargetConfig::Copy(config) => TargetConfig::Copy(CopyConfig { watch, ..config }),
    }
  }
}

impl From<PackagerConfig> for TargetConfig {
  fn from(config: PackagerConfig) -> Self {
    TargetConfig::Packager(config)
  }
}

impl From<PackagerConfigBuilder> for TargetConfig {
  fn from(builder: PackagerConfigBuilder) -> Self {
    TargetConfig::Packager(builder.build())
  }
}

impl From<CopyConfig> for TargetConfig {
  fn from(config: CopyConfig) -> Self {
    TargetConfig::Copy(config)
  }
}

#[cfg(test)]
mod tests {
  use convoy_plugin_generic::GenericCompiler;
  use convoy_plugin_generic::SimpleMergeLinker;
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn builder_fills_defaults() {
    let config = PackagerConfigBuilder::default()
      .path("app.css")
      .main_module("main.css")
      .build();

    assert_eq!(config.content_type, "text/css");
    assert_eq!(config.main_key, "main");
    assert_eq!(config.main, vec![String::from("main.css")]);
    assert_eq!(config.minify, MinifyOption::Disabled);
    assert_eq!(config.encoding, Encoding::Utf8);
  }

  #[test]
  fn compiler_keys_become_resolver_extensions() {
    let config = PackagerConfigBuilder::default()
      .compiler(".js", Arc::new(GenericCompiler::default()))
      .compiler(".coffee", Arc::new(GenericCompiler::default()))
      .paths(vec![PathBuf::from("/vendor")])
      .build();

    assert_eq!(
      config.resolve_options(),
      ResolveOptions {
        extensions: vec![String::from(".js"), String::from(".coffee")],
        main_key: String::from("main"),
        paths: vec![PathBuf::from("/vendor")],
      }
    );
  }

  #[test]
  fn validation_reports_the_first_missing_setting() {
    let builder = PackagerConfigBuilder::default().path("app.js");

    assert!(matches!(
      PackagerConfigBuilder::default().build().validate(),
      Err(ConvoyError::MissingPath)
    ));
    assert!(matches!(
      builder.clone().build().validate(),
      Err(ConvoyError::MissingMain { .. })
    ));
    assert!(matches!(
      builder.clone().main_module("main").build().validate(),
      Err(ConvoyError::MissingLinker { .. })
    ));

    let linked = builder
      .main_module("main")
      .linker(Arc::new(SimpleMergeLinker::default()));
    assert!(linked.clone().build().validate().is_ok());
    assert!(matches!(
      linked.minify(true).build().validate(),
      Err(ConvoyError::MissingMinifier { .. })
    ));
  }

  #[test]
  fn encodings() {
    assert_eq!(Encoding::Utf8.encode("é"), vec![0xc3, 0xa9]);
    assert_eq!(Encoding::Utf16Le.encode("aé"), vec![0x61, 0x00, 0xe9, 0x00]);
    assert_eq!(Encoding::Latin1.encode("é€"), vec![0xe9, b'?']);
  }
}
