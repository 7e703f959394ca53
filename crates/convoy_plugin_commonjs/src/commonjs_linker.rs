use std::collections::BTreeMap;

use async_trait::async_trait;
use convoy_core::plugin::Linker;
use convoy_core::plugin::PackagerContext;
use convoy_core::types::ExpandedAssetList;
use convoy_core::types::GeneratedAsset;
use convoy_core::types::SourceAsset;
use serde_json::Value;

use crate::loader::GLOBAL_NAME;
use crate::loader::LOADER;

/// A `define` call registering one module with the runtime
pub fn wrap(module_id: &Value, body: &str, options: Option<&Value>) -> String {
  let body = Value::String(body.to_string());
  match options {
    Some(options) => format!("{GLOBAL_NAME}.define({module_id}, {body}, {options});"),
    None => format!("{GLOBAL_NAME}.define({module_id}, {body});"),
  }
}

/// Wraps every module in a factory function and registers it with the client runtime.
///
/// Modules sharing an id with different contents are kept apart: every member of a conflict
/// group after the first is registered under `/__conflicts_<n>__/<id>` and the modules depending
/// on it get an alias from the shared id to that one.
#[derive(Debug, Default)]
pub struct CommonJsLinker {}

impl CommonJsLinker {
  /// Registered id of every entry
  fn module_ids(assets: &ExpandedAssetList) -> Vec<String> {
    let mut ids = assets
      .assets()
      .map(|asset| asset.id.clone())
      .collect::<Vec<_>>();

    for group in assets.conflicts() {
      for (position, &index) in group.iter().enumerate().skip(1) {
        ids[index] = format!("/__conflicts_{position}__/{}", ids[index]);
      }
    }

    ids
  }

  /// Per module redirects from an id to the conflicting module it really depends on
  fn aliases(assets: &ExpandedAssetList, ids: &[String]) -> Vec<BTreeMap<String, String>> {
    let mut aliases = vec![BTreeMap::new(); assets.len()];

    for group in assets.conflicts() {
      for &index in group.iter().skip(1) {
        let Some(entry) = assets.get(index) else {
          continue;
        };

        for &parent in &entry.parents {
          aliases[parent].insert(entry.asset.id.clone(), ids[index].clone());
        }
      }
    }

    aliases
  }

  /// Whether the asset is the entry point of its package, which makes it loadable by package name
  fn is_package_main(asset: &SourceAsset, ctx: &PackagerContext) -> bool {
    let Some(package) = asset.package.as_ref() else {
      return false;
    };

    let Some(entry) = package.entry(&ctx.resolve_options().main_key) else {
      return false;
    };

    ctx
      .resolve(&format!("./{entry}"), &package.path)
      .ok()
      .and_then(|resolution| resolution.into_path())
      .is_some_and(|path| path == asset.path)
  }

  fn factory(asset: &SourceAsset) -> String {
    format!(
      "(function(require, exports, module) {{ {}\n}});\n//@ sourceURL={}\n",
      asset.body, asset.id
    )
  }
}

#[async_trait]
impl Linker for CommonJsLinker {
  async fn link(&self, asset: &mut GeneratedAsset, ctx: &PackagerContext) -> anyhow::Result<()> {
    let ids = Self::module_ids(&asset.assets);
    let aliases = Self::aliases(&asset.assets, &ids);

    let mut defines = Vec::with_capacity(asset.assets.len());
    for (index, source) in asset.assets.assets().enumerate() {
      let module_id = match source.package.as_ref() {
        Some(package) if Self::is_package_main(source, ctx) => {
          Value::from(vec![ids[index].clone(), package.dir_name()])
        }
        _ => Value::String(ids[index].clone()),
      };

      let options = (!aliases[index].is_empty()).then(|| {
        let aliases = aliases[index]
          .iter()
          .map(|(id, alias)| (id.clone(), Value::String(alias.clone())))
          .collect::<serde_json::Map<_, _>>();

        serde_json::json!({ "aliases": aliases })
      });

      let factory = ctx.minify_body(Self::factory(source)).await?;
      defines.push(wrap(&module_id, &factory, options.as_ref()));
    }

    tracing::debug!("linked {} modules into {}", defines.len(), asset.path);

    asset.body = format!("{LOADER}\n{}", defines.join("\n"));
    asset.mtime = Some(asset.assets.max_mtime().unwrap_or_default());
    Ok(())
  }
}
