use async_trait::async_trait;
use convoy_core::plugin::Linker;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::GeneratedAsset;

/// Concatenates stylesheets, minifying each one on its own when minification is on
#[derive(Debug, Default)]
pub struct CssLinker {}

#[async_trait]
impl Linker for CssLinker {
  async fn link(&self, asset: &mut GeneratedAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
    let mut bodies = Vec::with_capacity(asset.assets.len());
    for source in asset.assets.assets() {
      bodies.push(ctx.minify_body(source.body.clone()).await?);
    }

    asset.body = bodies.join("\n");
    asset.mtime = Some(asset.assets.max_mtime().unwrap_or_default());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use convoy_core::plugin::Minifier;
  use convoy_core::types::MinifyOption;

  use super::*;
  use crate::test_utils::context_with_files;
  use crate::test_utils::expanded;

  #[derive(Debug)]
  struct StripWhitespace {}

  #[async_trait]
  impl Minifier for StripWhitespace {
    async fn minify(&self, asset: &mut GeneratedAsset, _ctx: &PackagerContext) -> anyhow::Result<()> {
      asset.body.retain(|c| !c.is_whitespace());
      Ok(())
    }
  }

  fn stylesheets() -> GeneratedAsset {
    GeneratedAsset {
      assets: expanded(&[("/a.css", "a { color: red; }", 5), ("/b.css", "b { margin: 0; }", 7)]),
      ..GeneratedAsset::new("app.css", "text/css")
    }
  }

  #[tokio::test]
  async fn joins_stylesheets() {
    let ctx = context_with_files(&[]);
    let mut asset = stylesheets();

    CssLinker::default().link(&mut asset, &ctx).await.unwrap();

    assert_eq!(asset.body, "a { color: red; }\nb { margin: 0; }");
    assert_eq!(asset.mtime, Some(7));
  }

  #[tokio::test]
  async fn minifies_each_stylesheet() {
    let ctx = context_with_files(&[])
      .with_minify(MinifyOption::Enabled, Some(Arc::new(StripWhitespace {})));
    let mut asset = stylesheets();

    CssLinker::default().link(&mut asset, &ctx).await.unwrap();

    assert_eq!(asset.body, "a{color:red;}\nb{margin:0;}");
  }
}
