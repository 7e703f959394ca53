use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

pub use normalize::normalize_path;

/// In-memory file-system for testing
pub mod in_memory_file_system;

/// File-system implementation using std::fs
pub mod os_file_system;

mod normalize;

/// FileSystem abstraction instance
///
/// This should be `OsFileSystem` for non-testing environments and `InMemoryFileSystem` for testing.
pub type FileSystemRef = Arc<dyn FileSystem + Send + Sync>;

/// The subset of file metadata the pipeline cares about
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileMetadata {
  pub is_file: bool,
  pub is_dir: bool,
  pub len: u64,
  pub modified: Option<SystemTime>,
}

impl FileMetadata {
  /// Last modified time in milliseconds since the Unix epoch, or zero when unknown
  pub fn modified_millis(&self) -> u64 {
    self
      .modified
      .and_then(|modified| modified.duration_since(SystemTime::UNIX_EPOCH).ok())
      .map(|duration| duration.as_millis() as u64)
      .unwrap_or_default()
  }
}

/// Trait abstracting file-system operations
///
/// Implementations are synchronous. Async callers that need to yield around large writes wrap
/// calls in `tokio::task::spawn_blocking`.
#[mockall::automock]
pub trait FileSystem: std::fmt::Debug {
  fn cwd(&self) -> io::Result<PathBuf>;

  /// Absolute form of `path`, resolved against the current working directory
  fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

  fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

  fn is_file(&self, path: &Path) -> bool {
    self
      .metadata(path)
      .map(|metadata| metadata.is_file)
      .unwrap_or(false)
  }

  fn is_dir(&self, path: &Path) -> bool {
    self
      .metadata(path)
      .map(|metadata| metadata.is_dir)
      .unwrap_or(false)
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  fn read_to_string(&self, path: &Path) -> io::Result<String>;

  /// Immediate children of a directory, sorted by path
  fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

  fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

  /// Create a single directory. Fails with `AlreadyExists` when the path is taken.
  fn create_dir(&self, path: &Path) -> io::Result<()>;

  fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

  fn remove_file(&self, path: &Path) -> io::Result<()>;
}
