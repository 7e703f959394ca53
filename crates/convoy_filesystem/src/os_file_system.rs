use std::path::Path;
use std::path::PathBuf;

use crate::normalize_path;
use crate::FileMetadata;
use crate::FileSystem;

#[derive(Default, Debug)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
  fn cwd(&self) -> std::io::Result<PathBuf> {
    std::env::current_dir()
  }

  fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
      return Ok(normalize_path(Path::new("/"), path));
    }

    Ok(normalize_path(&self.cwd()?, path))
  }

  fn metadata(&self, path: &Path) -> std::io::Result<FileMetadata> {
    let metadata = std::fs::metadata(path)?;

    Ok(FileMetadata {
      is_file: metadata.is_file(),
      is_dir: metadata.is_dir(),
      len: metadata.len(),
      modified: metadata.modified().ok(),
    })
  }

  fn is_file(&self, path: &Path) -> bool {
    path.is_file()
  }

  fn is_dir(&self, path: &Path) -> bool {
    path.is_dir()
  }

  fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
  }

  fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
  }

  fn read_dir(&self, path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(path)?
      .map(|entry| entry.map(|entry| entry.path()))
      .collect::<std::io::Result<Vec<_>>>()?;

    entries.sort();
    Ok(entries)
  }

  fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
  }

  fn create_dir(&self, path: &Path) -> std::io::Result<()> {
    std::fs::create_dir(path)
  }

  fn copy(&self, from: &Path, to: &Path) -> std::io::Result<u64> {
    std::fs::copy(from, to)
  }

  fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::rename(from, to)
  }

  fn remove_file(&self, path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)
  }
}

#[cfg(test)]
mod tests {
  use assert_fs::prelude::*;

  use super::*;

  #[test]
  fn test_read_dir_is_sorted() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    temp_dir.child("b.txt").write_str("b").unwrap();
    temp_dir.child("a.txt").write_str("a").unwrap();
    temp_dir.child("nested").create_dir_all().unwrap();

    let entries = OsFileSystem.read_dir(temp_dir.path()).unwrap();

    assert_eq!(
      entries,
      vec![
        temp_dir.path().join("a.txt"),
        temp_dir.path().join("b.txt"),
        temp_dir.path().join("nested"),
      ]
    );
  }

  #[test]
  fn test_metadata_reports_kind_and_mtime() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    temp_dir.child("file.js").write_str("contents").unwrap();

    let metadata = OsFileSystem
      .metadata(&temp_dir.path().join("file.js"))
      .unwrap();

    assert!(metadata.is_file);
    assert!(!metadata.is_dir);
    assert_eq!(metadata.len, 8);
    assert!(metadata.modified_millis() > 0);
    assert!(OsFileSystem.is_dir(temp_dir.path()));
  }

  #[test]
  fn test_create_dir_fails_when_present() {
    let temp_dir = assert_fs::TempDir::new().unwrap();
    let error = OsFileSystem.create_dir(temp_dir.path()).unwrap_err();
    assert_eq!(error.kind(), std::io::ErrorKind::AlreadyExists);
  }
}
