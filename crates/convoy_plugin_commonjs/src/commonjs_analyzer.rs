use anyhow::Context;
use async_trait::async_trait;
use convoy_core::plugin::Analyzer;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::SourceAsset;
use convoy_core::ConvoyError;
use convoy_resolver::is_builtin;

use crate::require_collector::RequireCollector;

/// Modules provided by other CommonJS platforms
const PLATFORM_EXCEPTIONS: &[&str] = &["system", "file"];

/// Modules that specific packages require only outside of browsers
fn package_exceptions(package: &str) -> &'static [&'static str] {
  match package {
    "jquery" => &["jsdom", "xmlhttprequest", "location", "navigator"],
    _ => &[],
  }
}

/// Finds `require("...")` calls and resolves them from the directory of the asset.
///
/// Requires of platform modules are skipped since the runtime provides them.
#[derive(Debug, Default)]
pub struct CommonJsAnalyzer {}

impl CommonJsAnalyzer {
  fn required_ids(body: &str) -> anyhow::Result<Vec<String>> {
    RequireCollector::collect(body)
  }

  fn is_exception(id: &str, package: Option<&str>) -> bool {
    is_builtin(id)
      || PLATFORM_EXCEPTIONS.contains(&id)
      || package.is_some_and(|package| package_exceptions(package).contains(&id))
  }
}

#[async_trait]
impl Analyzer for CommonJsAnalyzer {
  async fn analyze(&self, asset: &mut SourceAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
    asset.package = ctx.nearest_package(&asset.path);
    let package_name = asset
      .package
      .as_ref()
      .and_then(|package| package.name.as_deref());

    let mut dependencies = Vec::new();
    let ids = Self::required_ids(&asset.body)
      .with_context(|| format!("Failed to parse {}", asset.path.display()))?;

    for id in ids {
      if Self::is_exception(&id, package_name) {
        continue;
      }

      let resolution = ctx.resolve(&id, asset.dirname()).map_err(|error| match error {
        ConvoyError::Resolve(error) => {
          ConvoyError::Resolve(error.with_context(format!("required in {}", asset.id)))
        }
        error => error,
      })?;

      if let Some(path) = resolution.into_path() {
        dependencies.push(path);
      }
    }

    tracing::trace!(
      "{} requires {} modules",
      asset.path.display(),
      dependencies.len()
    );

    asset.dependencies = dependencies;
    Ok(())
  }
}
