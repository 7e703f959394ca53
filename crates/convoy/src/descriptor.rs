use std::path::Path;
use std::path::PathBuf;

use convoy_core::types::MinifyOption;
use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;
use convoy_filesystem::normalize_path;
use convoy_filesystem::FileSystemRef;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::presets;
use crate::CopyConfig;
use crate::Encoding;
use crate::TargetConfig;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

/// One entry of a `convoy.json` file.
///
/// ```json
/// {
///   "app.js": { "packager": "javascript", "main": "app/main", "minify": true },
///   "app.css": { "type": "css", "main": ["styles/reset.css", "styles/app.css"] },
///   "assets": { "type": "copy", "root": "public", "exclude": ["**/*.psd"] }
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
  /// Preset name, or `copy`. Inferred from `root` and the output extension when missing.
  #[serde(alias = "type")]
  pub packager: Option<String>,

  #[serde(default)]
  main: Option<OneOrMany>,

  pub basedir: Option<PathBuf>,

  #[serde(default)]
  pub minify: MinifyOption,

  #[serde(default)]
  pub watch: bool,

  pub main_key: Option<String>,

  #[serde(default)]
  pub paths: Vec<PathBuf>,

  #[serde(default)]
  pub encoding: Encoding,

  pub root: Option<PathBuf>,

  #[serde(default)]
  pub include: Vec<String>,

  #[serde(default)]
  pub exclude: Vec<String>,
}

/// Contents of a `convoy.json` file: targets by output path, in file order
pub type PipelineDescriptor = IndexMap<String, TargetDescriptor>;

impl TargetDescriptor {
  pub fn main(&self) -> Vec<String> {
    match &self.main {
      Some(OneOrMany::One(main)) => vec![main.clone()],
      Some(OneOrMany::Many(main)) => main.clone(),
      None => Vec::new(),
    }
  }

  fn kind(&self, path: &str) -> String {
    match &self.packager {
      Some(kind) => kind.clone(),
      None if self.root.is_some() => String::from("copy"),
      None if path.ends_with(".css") => String::from("css"),
      None => String::from("javascript"),
    }
  }

  /// The target for `path`, resolving relative paths against `config_dir`
  pub fn into_target(self, path: &str, config_dir: &Path) -> ConvoyResult<TargetConfig> {
    let kind = self.kind(path);

    if kind == "copy" {
      let root = self.root.ok_or_else(|| ConvoyError::MissingCopyRoot {
        path: path.to_string(),
      })?;

      return Ok(TargetConfig::Copy(CopyConfig {
        root: normalize_path(config_dir, &root),
        include: self.include,
        exclude: self.exclude,
        watch: self.watch,
      }));
    }

    let preset = presets::by_name(&kind).ok_or_else(|| ConvoyError::UnknownPackagerType {
      kind: kind.clone(),
      path: path.to_string(),
    })?;

    let basedir = match &self.basedir {
      Some(basedir) => normalize_path(config_dir, basedir),
      None => config_dir.to_path_buf(),
    };

    let mut builder = preset
      .path(path)
      .main(self.main())
      .basedir(basedir)
      .minify(self.minify)
      .watch(self.watch)
      .paths(
        self
          .paths
          .iter()
          .map(|search_path| normalize_path(config_dir, search_path))
          .collect(),
      )
      .encoding(self.encoding);

    if let Some(main_key) = self.main_key {
      builder = builder.main_key(main_key);
    }

    Ok(TargetConfig::Packager(builder.build()))
  }
}

/// Parse a pipeline configuration file into targets by output path
pub fn parse_pipeline_config(
  contents: &str,
  config_path: &Path,
) -> ConvoyResult<Vec<(String, TargetConfig)>> {
  let descriptor: PipelineDescriptor = serde_json::from_str(contents).map_err(|error| {
    ConvoyError::Config(format!(
      "{}:{}:{}: {error}",
      config_path.display(),
      error.line(),
      error.column()
    ))
  })?;

  let config_dir = config_path.parent().unwrap_or(Path::new("/"));

  descriptor
    .into_iter()
    .map(|(path, target)| {
      let config = target.into_target(&path, config_dir)?;
      Ok((path, config))
    })
    .collect()
}

#[tracing::instrument(level = "debug", skip(fs))]
pub fn load_pipeline_config(
  fs: &FileSystemRef,
  config_path: &Path,
) -> ConvoyResult<Vec<(String, TargetConfig)>> {
  let config_path = fs
    .canonicalize(config_path)
    .map_err(|error| ConvoyError::io(config_path, error))?;

  let contents = fs
    .read_to_string(&config_path)
    .map_err(|error| ConvoyError::io(&config_path, error))?;

  parse_pipeline_config(&contents, &config_path)
}
