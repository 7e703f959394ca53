use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Lexically resolve `path` against `cwd`, dropping `.` and folding `..`.
///
/// The file-system is never touched, so symlinks are not followed and the result may not exist.
pub fn normalize_path(cwd: &Path, path: &Path) -> PathBuf {
  let mut result = if path.is_absolute() {
    vec![]
  } else {
    cwd.components().collect::<Vec<_>>()
  };

  for component in path.components() {
    match component {
      Component::Prefix(prefix) => {
        result = vec![Component::Prefix(prefix)];
      }
      Component::RootDir => {
        result.retain(|c| matches!(c, Component::Prefix(_)));
        result.push(Component::RootDir);
      }
      Component::CurDir => {}
      Component::ParentDir => {
        if !matches!(
          result.last(),
          None | Some(Component::RootDir) | Some(Component::Prefix(_))
        ) {
          result.pop();
        }
      }
      Component::Normal(part) => {
        result.push(Component::Normal(part));
      }
    }
  }

  PathBuf::from_iter(result)
}
