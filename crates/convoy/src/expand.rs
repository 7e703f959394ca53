use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use convoy_core::events::EventEmitter;
use convoy_core::types::ExpandedAsset;
use convoy_core::types::ExpandedAssetList;
use convoy_core::types::SourceAsset;
use convoy_core::ConvoyError;
use convoy_core::ConvoyResult;

use crate::SourceAssetCache;

struct Node {
  asset: Arc<SourceAsset>,
  children: Vec<usize>,
}

/// Expand `roots` into every asset they transitively depend on.
///
/// The result is in post order: each asset comes after its dependencies, which keep their
/// declaration order, and roots keep the order given. Assets are identified by path, so a cycle
/// or a shared dependency is visited once. Assets with the same id are then deduplicated: exact
/// copies are dropped, different bodies are all kept and reported as one conflict.
#[tracing::instrument(level = "debug", skip_all, fields(roots = roots.len()))]
pub async fn expand(
  sources: &SourceAssetCache,
  roots: Vec<Arc<SourceAsset>>,
  events: &EventEmitter,
) -> ConvoyResult<ExpandedAssetList> {
  let mut nodes: Vec<Node> = Vec::new();
  let mut seen: HashMap<PathBuf, usize> = HashMap::new();
  let mut order: Vec<usize> = Vec::new();

  for root in roots {
    if seen.contains_key(&root.path) {
      continue;
    }

    seen.insert(root.path.clone(), nodes.len());
    nodes.push(Node {
      asset: root,
      children: Vec::new(),
    });

    // (node, index of the next dependency to visit)
    let mut stack = vec![(nodes.len() - 1, 0)];

    while let Some(&(node, next)) = stack.last() {
      let Some(dependency) = nodes[node].asset.dependencies.get(next).cloned() else {
        order.push(node);
        stack.pop();
        continue;
      };

      if let Some(frame) = stack.last_mut() {
        frame.1 += 1;
      }

      if let Some(&child) = seen.get(&dependency) {
        nodes[node].children.push(child);
        continue;
      }

      let asset = sources
        .get_source_asset(&dependency)
        .await
        .map_err(|error| ConvoyError::DependencyNotFound {
          path: dependency.clone(),
          required_by: nodes[node].asset.path.clone(),
          source: Box::new(error),
        })?;

      if let Some(&child) = seen.get(&asset.path) {
        nodes[node].children.push(child);
        continue;
      }

      let child = nodes.len();
      seen.insert(asset.path.clone(), child);
      nodes.push(Node {
        asset,
        children: Vec::new(),
      });
      nodes[node].children.push(child);
      stack.push((child, 0));
    }
  }

  let list = resolve_conflicts(&nodes, &order);

  for group in list.conflicts() {
    let paths = group
      .iter()
      .filter_map(|&index| list.get(index))
      .map(|entry| entry.asset.path.display().to_string())
      .collect::<Vec<_>>();

    events.warn(format!("conflicting assets: \n  {}", paths.join("\n  ")));
  }

  Ok(list)
}

/// Drop exact duplicates and group conflicting assets, keeping the expansion order
///
/// The first asset with an id is canonical. Later assets are only compared against it.
fn resolve_conflicts(nodes: &[Node], order: &[usize]) -> ExpandedAssetList {
  // Dropped node to the retained node with the same id and body
  let mut replaced: HashMap<usize, usize> = HashMap::new();
  let mut members_by_id: HashMap<&str, usize> = HashMap::new();
  let mut groups: Vec<Vec<usize>> = Vec::new();
  let mut retained: Vec<usize> = Vec::new();

  for &node in order {
    let asset = &nodes[node].asset;

    if asset.id.is_empty() {
      retained.push(node);
      continue;
    }

    let Some(&group) = members_by_id.get(asset.id.as_str()) else {
      members_by_id.insert(&asset.id, groups.len());
      groups.push(vec![node]);
      retained.push(node);
      continue;
    };

    let canonical = groups[group][0];
    if nodes[canonical].asset.body == asset.body {
      tracing::debug!(
        "{} duplicates {}",
        asset.path.display(),
        nodes[canonical].asset.path.display()
      );
      replaced.insert(node, canonical);
    } else {
      groups[group].push(node);
      retained.push(node);
    }
  }

  let position = retained
    .iter()
    .enumerate()
    .map(|(index, &node)| (node, index))
    .collect::<HashMap<_, _>>();
  let target = |node: usize| position[replaced.get(&node).unwrap_or(&node)];

  let mut entries = retained
    .iter()
    .map(|&node| ExpandedAsset {
      asset: nodes[node].asset.clone(),
      parents: Vec::new(),
      children: Vec::new(),
      conflict_group: None,
    })
    .collect::<Vec<_>>();

  for &node in order {
    let from = target(node);
    for &child in &nodes[node].children {
      let to = target(child);
      if from == to || entries[from].children.contains(&to) {
        continue;
      }

      entries[from].children.push(to);
      entries[to].parents.push(from);
    }
  }

  let conflicts = groups
    .into_iter()
    .filter(|group| group.len() > 1)
    .map(|group| group.iter().map(|node| position[node]).collect::<Vec<_>>())
    .collect::<Vec<_>>();

  for (group, members) in conflicts.iter().enumerate() {
    for &member in members {
      entries[member].conflict_group = Some(group);
    }
  }

  ExpandedAssetList::new(entries, conflicts)
}
