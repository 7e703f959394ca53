use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;
use convoy_filesystem::FileSystemRef;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

type DirectoryCell = Arc<OnceCell<ConvoyResult<()>>>;

/// Creates output directories, running each `create_dir` once however many writers need it.
///
/// Created directories are remembered until `clear`.
#[derive(Debug)]
pub struct DirectoryCreator {
  fs: FileSystemRef,
  created: Mutex<HashMap<PathBuf, DirectoryCell>>,
}

impl DirectoryCreator {
  pub fn new(fs: FileSystemRef) -> Self {
    Self {
      fs,
      created: Mutex::new(HashMap::new()),
    }
  }

  /// Create `dir` and any missing ancestors
  pub async fn create_all(&self, dir: &Path) -> ConvoyResult<()> {
    let mut missing = Vec::new();
    for ancestor in dir.ancestors() {
      if ancestor.as_os_str().is_empty() || self.fs.is_dir(ancestor) {
        break;
      }

      if self.fs.is_file(ancestor) {
        return Err(ConvoyError::NotADirectory {
          path: ancestor.to_path_buf(),
        });
      }

      missing.push(ancestor.to_path_buf());
    }

    for dir in missing.into_iter().rev() {
      self.create(dir).await?;
    }

    Ok(())
  }

  pub fn clear(&self) {
    self.created.lock().clear();
  }

  async fn create(&self, dir: PathBuf) -> ConvoyResult<()> {
    let cell = self.created.lock().entry(dir.clone()).or_default().clone();

    let result = cell
      .get_or_init(|| {
        let fs = self.fs.clone();
        let dir = dir.clone();
        async move {
          let target = dir.clone();
          let result = tokio::task::spawn_blocking(move || {
            let result = fs.create_dir(&target);
            match result {
              Err(error) if error.kind() == io::ErrorKind::AlreadyExists && fs.is_dir(&target) => {
                Ok(())
              }
              Err(error) => Err(ConvoyError::io(&target, error)),
              Ok(()) => {
                tracing::trace!("created {}", target.display());
                Ok(())
              }
            }
          })
          .await;

          result.unwrap_or_else(|error| Err(ConvoyError::io(&dir, io::Error::other(error))))
        }
      })
      .await
      .clone();

    if result.is_err() {
      let mut created = self.created.lock();
      if created
        .get(&dir)
        .is_some_and(|current| Arc::ptr_eq(current, &cell))
      {
        created.remove(&dir);
      }
    }

    result
  }
}

/// Write `contents` to `path` through a temporary sibling, so readers never see a partial file
pub(crate) async fn write_atomic(
  fs: &FileSystemRef,
  path: &Path,
  contents: Vec<u8>,
) -> ConvoyResult<()> {
  let fs = fs.clone();
  let target = path.to_path_buf();

  run_blocking(path, move || {
    let temp = temp_sibling(&target);
    let result = fs
      .write(&temp, &contents)
      .map_err(|error| ConvoyError::io(&temp, error))
      .and_then(|()| {
        fs.rename(&temp, &target)
          .map_err(|error| ConvoyError::io(&target, error))
      });

    discard_on_error(&fs, &temp, result)
  })
  .await
}

/// Copy `from` to `to` through a temporary sibling of `to`
pub(crate) async fn copy_atomic(fs: &FileSystemRef, from: &Path, to: &Path) -> ConvoyResult<()> {
  let fs = fs.clone();
  let source = from.to_path_buf();
  let target = to.to_path_buf();

  run_blocking(to, move || {
    let temp = temp_sibling(&target);
    let result = fs
      .copy(&source, &temp)
      .map_err(|error| ConvoyError::io(&source, error))
      .and_then(|_| {
        fs.rename(&temp, &target)
          .map_err(|error| ConvoyError::io(&target, error))
      });

    discard_on_error(&fs, &temp, result)
  })
  .await
}

/// Remove the temporary sibling when writing or renaming it failed
fn discard_on_error(fs: &FileSystemRef, temp: &Path, result: ConvoyResult<()>) -> ConvoyResult<()> {
  if result.is_err() && fs.is_file(temp) {
    if let Err(error) = fs.remove_file(temp) {
      tracing::debug!("Failed to remove {}: {error}", temp.display());
    }
  }

  result
}

fn temp_sibling(path: &Path) -> PathBuf {
  let name = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();

  path.with_file_name(format!(".{name}.convoy-tmp"))
}

async fn run_blocking(
  path: &Path,
  task: impl FnOnce() -> ConvoyResult<()> + Send + 'static,
) -> ConvoyResult<()> {
  tokio::task::spawn_blocking(task)
    .await
    .unwrap_or_else(|error| Err(ConvoyError::io(path, io::Error::other(error))))
}
