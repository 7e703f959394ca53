use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_core::plugin::PackagerContext;
use convoy_core::types::ExpandedAsset;
use convoy_core::types::ExpandedAssetList;
use convoy_core::types::SourceAsset;
use convoy_filesystem::in_memory_file_system::InMemoryFileSystem;
use convoy_filesystem::FileSystem;
use convoy_resolver::ResolveOptions;

pub fn context_with_files(files: &[(&str, &str)]) -> PackagerContext {
  let fs = Arc::new(InMemoryFileSystem::default());
  for (path, contents) in files {
    fs.write(Path::new(path), contents.as_bytes()).unwrap();
  }

  PackagerContext::new(
    "out",
    PathBuf::from("/app"),
    fs,
    ResolveOptions {
      extensions: vec![String::from(".js"), String::from(".css")],
      ..ResolveOptions::default()
    },
  )
}

pub fn expanded(assets: &[(&str, &str, u64)]) -> ExpandedAssetList {
  let entries = assets
    .iter()
    .map(|(path, body, mtime)| ExpandedAsset {
      asset: Arc::new(SourceAsset {
        path: PathBuf::from(path),
        body: body.to_string(),
        mtime: *mtime,
        ..SourceAsset::default()
      }),
      parents: Vec::new(),
      children: Vec::new(),
      conflict_group: None,
    })
    .collect();

  ExpandedAssetList::new(entries, Vec::new())
}
