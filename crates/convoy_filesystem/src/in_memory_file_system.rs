use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::normalize_path;
use crate::FileMetadata;
use crate::FileSystem;

#[cfg(not(target_os = "windows"))]
fn root_dir() -> PathBuf {
  PathBuf::from("/")
}

#[cfg(target_os = "windows")]
fn root_dir() -> PathBuf {
  PathBuf::from("C:/")
}

/// In memory implementation of a file-system entry
#[derive(Debug, Clone)]
enum InMemoryFileSystemEntry {
  File {
    contents: Vec<u8>,
    modified: SystemTime,
  },
  Directory,
}

/// In memory implementation of the `FileSystem` trait, for testing purposes.
#[derive(Debug)]
pub struct InMemoryFileSystem {
  files: RwLock<HashMap<PathBuf, InMemoryFileSystemEntry>>,
  current_working_directory: RwLock<PathBuf>,
}

impl Default for InMemoryFileSystem {
  fn default() -> Self {
    let files = HashMap::from([(root_dir(), InMemoryFileSystemEntry::Directory)]);

    Self {
      files: RwLock::new(files),
      current_working_directory: RwLock::new(root_dir()),
    }
  }
}

impl InMemoryFileSystem {
  /// Change the current working directory. Used for resolving relative paths.
  pub fn set_current_working_directory(&self, cwd: &Path) {
    let cwd = self.absolute(cwd);
    let mut state = self.current_working_directory.write();
    *state = cwd;
  }

  /// Override the modification time of a file
  pub fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
    let path = self.absolute(path);
    let mut files = self.files.write();
    match files.get_mut(&path) {
      Some(InMemoryFileSystemEntry::File { modified, .. }) => {
        *modified = time;
        Ok(())
      }
      Some(InMemoryFileSystemEntry::Directory) => Err(is_a_directory()),
      None => Err(not_found()),
    }
  }

  fn absolute(&self, path: &Path) -> PathBuf {
    normalize_path(&self.current_working_directory.read(), path)
  }
}

fn not_found() -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, "File not found")
}

fn is_a_directory() -> io::Error {
  io::Error::new(io::ErrorKind::InvalidInput, "Path is a directory")
}

impl FileSystem for InMemoryFileSystem {
  fn cwd(&self) -> io::Result<PathBuf> {
    Ok(self.current_working_directory.read().clone())
  }

  fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
    Ok(self.absolute(path))
  }

  fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
    let path = self.absolute(path);
    let files = self.files.read();

    match files.get(&path) {
      None => Err(not_found()),
      Some(InMemoryFileSystemEntry::File { contents, modified }) => Ok(FileMetadata {
        is_file: true,
        is_dir: false,
        len: contents.len() as u64,
        modified: Some(*modified),
      }),
      Some(InMemoryFileSystemEntry::Directory) => Ok(FileMetadata {
        is_file: false,
        is_dir: true,
        len: 0,
        modified: None,
      }),
    }
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    let path = self.absolute(path);
    let files = self.files.read();
    match files.get(&path) {
      None => Err(not_found()),
      Some(InMemoryFileSystemEntry::File { contents, .. }) => Ok(contents.clone()),
      Some(InMemoryFileSystemEntry::Directory) => Err(is_a_directory()),
    }
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    let bytes = self.read(path)?;
    String::from_utf8(bytes).map_err(|_| io::Error::other("Unable to read file as string"))
  }

  fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
    let path = self.absolute(path);
    let files = self.files.read();

    match files.get(&path) {
      None => return Err(not_found()),
      Some(InMemoryFileSystemEntry::File { .. }) => {
        return Err(io::Error::new(
          io::ErrorKind::InvalidInput,
          "Path is not a directory",
        ))
      }
      Some(InMemoryFileSystemEntry::Directory) => {}
    }

    let mut entries = files
      .keys()
      .filter(|entry| entry.parent() == Some(path.as_path()))
      .cloned()
      .collect::<Vec<_>>();

    entries.sort();
    Ok(entries)
  }

  fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    let path = self.absolute(path);
    let mut files = self.files.write();

    if let Some(InMemoryFileSystemEntry::Directory) = files.get(&path) {
      return Err(is_a_directory());
    }

    files.insert(
      path.clone(),
      InMemoryFileSystemEntry::File {
        contents: contents.to_vec(),
        modified: SystemTime::now(),
      },
    );

    let mut dir = path.parent();
    while let Some(path) = dir {
      files.insert(path.to_path_buf(), InMemoryFileSystemEntry::Directory);
      dir = path.parent();
    }

    Ok(())
  }

  fn create_dir(&self, path: &Path) -> io::Result<()> {
    let path = self.absolute(path);
    let mut files = self.files.write();

    if files.contains_key(&path) {
      return Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "File exists",
      ));
    }

    match path.parent().map(|parent| files.get(parent)) {
      Some(Some(InMemoryFileSystemEntry::Directory)) | None => {}
      Some(Some(InMemoryFileSystemEntry::File { .. })) => {
        return Err(io::Error::new(
          io::ErrorKind::InvalidInput,
          "Parent is not a directory",
        ))
      }
      Some(None) => return Err(not_found()),
    }

    files.insert(path, InMemoryFileSystemEntry::Directory);
    Ok(())
  }

  fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
    let contents = self.read(from)?;
    self.write(to, &contents)?;
    Ok(contents.len() as u64)
  }

  fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
    let from = self.absolute(from);
    let to = self.absolute(to);
    let mut files = self.files.write();

    let moved = files
      .keys()
      .filter(|entry| entry.starts_with(&from))
      .cloned()
      .collect::<Vec<_>>();

    if moved.is_empty() {
      return Err(not_found());
    }

    for entry in moved {
      if let Some(value) = files.remove(&entry) {
        let target = match entry.strip_prefix(&from) {
          Ok(relative) if !relative.as_os_str().is_empty() => to.join(relative),
          _ => to.clone(),
        };
        files.insert(target, value);
      }
    }

    Ok(())
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    let path = self.absolute(path);
    let mut files = self.files.write();
    match files.get(&path) {
      None => Err(not_found()),
      Some(InMemoryFileSystemEntry::Directory) => Err(is_a_directory()),
      Some(InMemoryFileSystemEntry::File { .. }) => {
        files.remove(&path);
        Ok(())
      }
    }
  }
}
