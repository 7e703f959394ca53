use std::fmt;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_resolver::ResolverError;
use thiserror::Error;

pub type ConvoyResult<T> = std::result::Result<T, ConvoyError>;

/// Plugin step that produced an error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginStage {
  Compile,
  Preprocess,
  Analyze,
  Link,
  Postprocess,
  Minify,
  Finalize,
}

impl fmt::Display for PluginStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      PluginStage::Compile => "compiler",
      PluginStage::Preprocess => "preprocessor",
      PluginStage::Analyze => "analyzer",
      PluginStage::Link => "linker",
      PluginStage::Postprocess => "postprocessor",
      PluginStage::Minify => "minifier",
      PluginStage::Finalize => "finalizer",
    };

    f.write_str(name)
  }
}

/// Every failure the pipeline reports.
///
/// Errors are `Clone` so that every caller waiting on one shared operation receives the same
/// error value.
#[derive(Clone, Debug, Error)]
pub enum ConvoyError {
  #[error("Main module not specified for {path}")]
  MissingMain { path: String },

  #[error("Linker not found for {path}")]
  MissingLinker { path: String },

  #[error("Minifier not found for {path}")]
  MissingMinifier { path: String },

  #[error("Packager requires an output path")]
  MissingPath,

  #[error("Copier requires root for {path}")]
  MissingCopyRoot { path: String },

  #[error("Unknown packager type '{kind}' for {path}")]
  UnknownPackagerType { kind: String, path: String },

  #[error("{0}")]
  Config(String),

  #[error(transparent)]
  Resolve(#[from] ResolverError),

  #[error("{} not found (required in {})", .path.display(), .required_by.display())]
  DependencyNotFound {
    path: PathBuf,
    required_by: PathBuf,
    #[source]
    source: Box<ConvoyError>,
  },

  #[error("{} not found", .path.display())]
  NotFound { path: PathBuf },

  #[error("{} is a directory", .path.display())]
  IsDirectory { path: PathBuf },

  #[error("{} is not a directory", .path.display())]
  NotADirectory { path: PathBuf },

  #[error("{}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: Arc<io::Error>,
  },

  #[error("No compiler for {}", .path.display())]
  NoCompiler { path: PathBuf },

  #[error("No analyzer for {}", .path.display())]
  NoAnalyzer { path: PathBuf },

  #[error("{stage} failed for {}: {source}", .path.display())]
  Plugin {
    stage: PluginStage,
    path: PathBuf,
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync>,
  },

  #[error("asset not found for {path}")]
  AssetNotFound { path: String },
}

impl ConvoyError {
  /// Map an I/O failure on `path`, keeping "missing" distinct from other failures
  pub fn io(path: &Path, error: io::Error) -> Self {
    match error.kind() {
      io::ErrorKind::NotFound => ConvoyError::NotFound {
        path: path.to_path_buf(),
      },
      _ => ConvoyError::Io {
        path: path.to_path_buf(),
        source: Arc::new(error),
      },
    }
  }

  /// Wrap a plugin failure. Errors the plugin got back from the pipeline itself, such as a failed
  /// `resolve`, are passed through unchanged.
  pub fn plugin(stage: PluginStage, path: &Path, error: anyhow::Error) -> Self {
    let error = match error.downcast::<ConvoyError>() {
      Ok(error) => return error,
      Err(error) => error,
    };

    match error.downcast::<ResolverError>() {
      Ok(error) => ConvoyError::Resolve(error),
      Err(error) => ConvoyError::Plugin {
        stage,
        path: path.to_path_buf(),
        source: Arc::from(Box::<dyn std::error::Error + Send + Sync>::from(error)),
      },
    }
  }

  pub fn is_configuration_error(&self) -> bool {
    matches!(
      self,
      ConvoyError::MissingMain { .. }
        | ConvoyError::MissingLinker { .. }
        | ConvoyError::MissingMinifier { .. }
        | ConvoyError::MissingPath
        | ConvoyError::MissingCopyRoot { .. }
        | ConvoyError::UnknownPackagerType { .. }
        | ConvoyError::Config(_)
    )
  }
}
