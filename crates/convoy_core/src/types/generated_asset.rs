use crate::types::ExpandedAssetList;

/// The merged output of a packager while it moves through linking and post-processing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedAsset {
  /// Output path, relative to the pipeline root
  pub path: String,

  pub content_type: String,

  /// Expanded source assets, in dependency order
  pub assets: ExpandedAssetList,

  pub body: String,

  /// Newest source modification time, when the linker tracks it
  pub mtime: Option<u64>,
}

impl GeneratedAsset {
  pub fn new(path: impl Into<String>, content_type: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      content_type: content_type.into(),
      ..GeneratedAsset::default()
    }
  }

  /// A standalone body, used when minifying individual modules
  pub fn from_body(path: impl Into<String>, body: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      body: body.into(),
      ..GeneratedAsset::default()
    }
  }
}
