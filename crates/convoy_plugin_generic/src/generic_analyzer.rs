use async_trait::async_trait;
use convoy_core::plugin::Analyzer;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::SourceAsset;
use convoy_core::ConvoyError;
use once_cell::sync::Lazy;
use regex::Regex;

static REQUIRE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?m)^[ \t]*/(/|\*)=[ \t]+require[ \t]+(.+?)[ \t]*(\*/)?[ \t\r]*$")
    .expect("require directive pattern is valid")
});

/// Finds Sprockets style directives:
///
/// ```text
/// //= require foo
/// /*= require foo */
/// ```
///
/// Each directive is resolved from the directory of the asset.
#[derive(Debug, Default)]
pub struct GenericAnalyzer {}

impl GenericAnalyzer {
  fn required_ids(body: &str) -> Vec<&str> {
    REQUIRE_DIRECTIVE
      .captures_iter(body)
      .filter_map(|captures| captures.get(2))
      .map(|id| id.as_str())
      .collect()
  }
}

#[async_trait]
impl Analyzer for GenericAnalyzer {
  async fn analyze(&self, asset: &mut SourceAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
    let mut dependencies = Vec::new();

    for id in Self::required_ids(&asset.body) {
      let resolution = ctx.resolve(id, asset.dirname()).map_err(|error| match error {
        ConvoyError::Resolve(error) => {
          ConvoyError::Resolve(error.with_context(format!("required in {}", asset.id)))
        }
        error => error,
      })?;

      if let Some(path) = resolution.into_path() {
        dependencies.push(path);
      }
    }

    asset.dependencies = dependencies;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_utils::context_with_files;

  #[test]
  fn finds_both_directive_styles() {
    let body = "//= require ./a\n/*= require b */\n  //= require   c  \nvar x = require('d');\n// require e";

    assert_eq!(GenericAnalyzer::required_ids(body), vec!["./a", "b", "c"]);
  }

  #[test]
  fn handles_crlf_line_endings() {
    let body = "//= require ./dep\r\n/*= require ./other */\r\nmain();\r\n";

    assert_eq!(GenericAnalyzer::required_ids(body), vec!["./dep", "./other"]);
  }

  #[tokio::test]
  async fn resolves_relative_to_the_asset() {
    let ctx = context_with_files(&[
      ("/app/styles/base.css", ""),
      ("/app/styles/theme/colors.css", ""),
    ]);
    let mut asset = SourceAsset {
      path: PathBuf::from("/app/styles/main.css"),
      body: String::from("/*= require ./base */\n/*= require ./theme/colors */\nbody {}"),
      ..SourceAsset::default()
    };

    GenericAnalyzer::default()
      .analyze(&mut asset, &ctx)
      .await
      .unwrap();

    assert_eq!(
      asset.dependencies,
      vec![
        PathBuf::from("/app/styles/base.css"),
        PathBuf::from("/app/styles/theme/colors.css"),
      ]
    );
  }

  #[tokio::test]
  async fn unresolvable_directives_name_the_requester() {
    let ctx = context_with_files(&[]);
    let mut asset = SourceAsset {
      path: PathBuf::from("/app/main.js"),
      id: String::from("app/main"),
      body: String::from("//= require ./missing"),
      ..SourceAsset::default()
    };

    let error = GenericAnalyzer::default()
      .analyze(&mut asset, &ctx)
      .await
      .unwrap_err();

    assert_eq!(
      error.to_string(),
      "Cannot find module './missing' (required in app/main)"
    );
  }
}
