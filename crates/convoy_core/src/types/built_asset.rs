use std::path::PathBuf;

use convoy_filesystem::FileSystemRef;

use crate::hash::hash_bytes;
use crate::ConvoyError;
use crate::ConvoyResult;

/// Where the bytes of a built asset live
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetBody {
  Inline(String),

  /// A file copied verbatim, kept on disk rather than loaded into memory
  File(PathBuf),
}

/// A finished output, ready to be served or written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltAsset {
  pub path: String,
  pub content_type: String,
  pub body: AssetBody,
  pub mtime: Option<u64>,
}

impl BuiltAsset {
  pub fn read_body(&self, fs: &FileSystemRef) -> ConvoyResult<Vec<u8>> {
    match &self.body {
      AssetBody::Inline(body) => Ok(body.as_bytes().to_vec()),
      AssetBody::File(path) => fs.read(path).map_err(|error| ConvoyError::io(path, error)),
    }
  }

  /// Entity tag for conditional requests
  pub fn etag(&self, fs: &FileSystemRef) -> ConvoyResult<String> {
    Ok(format!("\"{}\"", hash_bytes(&self.read_body(fs)?)))
  }
}
