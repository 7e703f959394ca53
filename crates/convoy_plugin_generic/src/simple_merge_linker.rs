use async_trait::async_trait;
use convoy_core::plugin::Linker;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::GeneratedAsset;

/// Concatenates the bodies of all expanded assets, one per line
#[derive(Debug, Default)]
pub struct SimpleMergeLinker {}

#[async_trait]
impl Linker for SimpleMergeLinker {
  async fn link(&self, asset: &mut GeneratedAsset, _ctx: &PackagerContext) -> anyhow::Result<()> {
    asset.body = asset
      .assets
      .assets()
      .map(|source| source.body.as_str())
      .collect::<Vec<_>>()
      .join("\n");

    asset.mtime = Some(asset.assets.max_mtime().unwrap_or_default());
    Ok(())
  }
}
