use std::path::PathBuf;
use std::sync::Arc;

use crate::types::SourceAsset;

/// One entry of an expansion, with links to other entries of the same list
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandedAsset {
  pub asset: Arc<SourceAsset>,

  /// Indices of the entries that depend on this one
  pub parents: Vec<usize>,

  /// Indices of the entries this one depends on, in declaration order
  pub children: Vec<usize>,

  /// Index into `ExpandedAssetList::conflicts` when the id is shared with a different body
  pub conflict_group: Option<usize>,
}

/// Dependency-ordered result of expanding a packager's root assets.
///
/// Every asset appears after all of its dependencies, except where a cycle makes that
/// impossible. Exact duplicates have been removed; conflicting assets are all retained and
/// grouped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpandedAssetList {
  entries: Vec<ExpandedAsset>,
  conflicts: Vec<Vec<usize>>,
}

impl ExpandedAssetList {
  pub fn new(entries: Vec<ExpandedAsset>, conflicts: Vec<Vec<usize>>) -> Self {
    Self { entries, conflicts }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&ExpandedAsset> {
    self.entries.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ExpandedAsset> {
    self.entries.iter()
  }

  pub fn assets(&self) -> impl Iterator<Item = &Arc<SourceAsset>> {
    self.entries.iter().map(|entry| &entry.asset)
  }

  pub fn paths(&self) -> Vec<PathBuf> {
    self.assets().map(|asset| asset.path.clone()).collect()
  }

  /// Conflict groups, each listing member indices with the canonical asset first
  pub fn conflicts(&self) -> &[Vec<usize>] {
    &self.conflicts
  }

  /// Members of the conflict group `index` belongs to
  pub fn conflict_group(&self, index: usize) -> Option<&[usize]> {
    self
      .entries
      .get(index)
      .and_then(|entry| entry.conflict_group)
      .and_then(|group| self.conflicts.get(group))
      .map(|group| group.as_slice())
  }

  /// Newest modification time across all assets
  pub fn max_mtime(&self) -> Option<u64> {
    self.assets().map(|asset| asset.mtime).max()
  }
}
