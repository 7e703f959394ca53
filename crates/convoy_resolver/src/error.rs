use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolverError {
  #[error("Cannot find module '{id}'{}", .context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
  ModuleNotFound { id: String, context: Option<String> },

  #[error("Unable to parse {}: {message} at line {line}, column {column}", .path.display())]
  InvalidJson {
    path: PathBuf,
    line: usize,
    column: usize,
    message: String,
  },
}

impl ResolverError {
  /// Attach a description of the requester, e.g. `required in app/main`
  pub fn with_context(self, requester: impl Into<String>) -> Self {
    match self {
      ResolverError::ModuleNotFound { id, .. } => ResolverError::ModuleNotFound {
        id,
        context: Some(requester.into()),
      },
      error => error,
    }
  }
}
