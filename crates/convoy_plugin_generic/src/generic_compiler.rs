use async_trait::async_trait;
use convoy_core::plugin::Compiler;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::SourceAsset;

/// Reads the file as UTF-8 text, unchanged
#[derive(Debug, Default)]
pub struct GenericCompiler {}

#[async_trait]
impl Compiler for GenericCompiler {
  async fn compile(&self, asset: &mut SourceAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
    asset.body = ctx.read_to_string(&asset.path)?;
    Ok(())
  }
}
