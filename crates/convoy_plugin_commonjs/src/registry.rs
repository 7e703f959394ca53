use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
  #[error("Invalid module id {0}")]
  InvalidId(String),

  #[error("module not found {0}")]
  NotFound(String),

  #[error("module {id} failed: {message}")]
  Factory { id: String, message: String },
}

pub type Exports = Map<String, Value>;

/// Body of a module. It receives a scope to require other modules and publish exports.
pub type Factory = Arc<dyn Fn(&ModuleScope<'_>) -> Result<(), RegistryError> + Send + Sync>;

#[derive(Clone, Debug, Default)]
pub struct DefineOptions {
  /// Redirects requires made by this module, from a canonical id to an alias id
  pub aliases: HashMap<String, String>,
}

struct Definition {
  factory: Factory,
  aliases: HashMap<String, String>,
}

/// An instantiated module
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModuleRecord {
  pub id: String,
  pub exports: Exports,
  pub loaded: bool,
  pub parent: Option<String>,
  pub children: Vec<String>,
}

#[derive(Default)]
struct RegistryState {
  defined: HashMap<String, Definition>,
  aliases: HashMap<String, String>,
  modules: HashMap<String, ModuleRecord>,
}

/// Module registry with the lookup rules of the bundle runtime.
///
/// Each registry is independent; nothing is global. A module is evaluated on its first require
/// and cached afterwards, and a module required again while it is still being evaluated (a cycle)
/// yields the exports published so far.
#[derive(Default)]
pub struct ModuleRegistry {
  state: Mutex<RegistryState>,
}

impl fmt::Debug for ModuleRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("ModuleRegistry")
      .field("defined", &state.defined.len())
      .field("modules", &state.modules.len())
      .finish()
  }
}

/// Handle given to a module body while it runs
pub struct ModuleScope<'a> {
  registry: &'a ModuleRegistry,
  id: String,
}

impl ModuleScope<'_> {
  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn require(&self, id: &str) -> Result<Exports, RegistryError> {
    self.registry.require_from(id, Some(&self.id))
  }

  pub fn export(&self, key: impl Into<String>, value: Value) {
    let mut state = self.registry.state.lock();
    if let Some(module) = state.modules.get_mut(&self.id) {
      module.exports.insert(key.into(), value);
    }
  }
}

impl ModuleRegistry {
  /// Register a module under `ids[0]`, with any further ids as aliases
  pub fn define(&self, ids: &[&str], factory: Factory, options: DefineOptions) {
    let Some((id, aliases)) = ids.split_first() else {
      return;
    };

    let mut state = self.state.lock();
    state.defined.insert(
      id.to_string(),
      Definition {
        factory,
        aliases: options.aliases,
      },
    );

    for alias in aliases {
      state.aliases.insert(alias.to_string(), id.to_string());
    }
  }

  pub fn require(&self, id: &str) -> Result<Exports, RegistryError> {
    self.require_from(id, None)
  }

  pub fn module(&self, id: &str) -> Option<ModuleRecord> {
    self.state.lock().modules.get(id).cloned()
  }

  fn require_from(&self, id: &str, caller: Option<&str>) -> Result<Exports, RegistryError> {
    let normalized = normalize_id(id, caller)?;

    let (id, factory) = {
      let mut state = self.state.lock();
      let mut id = state.search(&normalized);

      if let Some(alias) = caller
        .and_then(|caller| state.defined.get(caller))
        .and_then(|definition| definition.aliases.get(&id))
      {
        id = alias.clone();
      }

      if state.modules.contains_key(&id) {
        state.add_child(caller, &id);
        return Ok(state.modules[&id].exports.clone());
      }

      let factory = state
        .defined
        .get(&id)
        .map(|definition| definition.factory.clone())
        .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

      state.modules.insert(
        id.clone(),
        ModuleRecord {
          id: id.clone(),
          parent: caller.map(String::from),
          ..ModuleRecord::default()
        },
      );

      (id, factory)
    };

    // Run without holding the lock, the body may require other modules
    let scope = ModuleScope {
      registry: self,
      id: id.clone(),
    };
    factory(&scope)?;

    let mut state = self.state.lock();
    if let Some(module) = state.modules.get_mut(&id) {
      module.loaded = true;
    }
    state.add_child(caller, &id);

    Ok(
      state
        .modules
        .get(&id)
        .map(|module| module.exports.clone())
        .unwrap_or_default(),
    )
  }
}

impl RegistryState {
  fn search(&self, id: &str) -> String {
    if self.modules.contains_key(id) || self.defined.contains_key(id) {
      return id.to_string();
    }

    if let Some(alias) = self.aliases.get(id) {
      return alias.clone();
    }

    let index = format!("{id}/index");
    if self.modules.contains_key(&index) || self.defined.contains_key(&index) {
      index
    } else {
      id.to_string()
    }
  }

  fn add_child(&mut self, caller: Option<&str>, id: &str) {
    let Some(parent) = caller.and_then(|caller| self.modules.get_mut(caller)) else {
      return;
    };

    if !parent.children.iter().any(|child| child == id) {
      parent.children.push(id.to_string());
    }
  }
}

/// Resolve `.` and `..` segments of `id`, relative ones against the directory of `caller`
pub fn normalize_id(id: &str, caller: Option<&str>) -> Result<String, RegistryError> {
  if !id.contains('.') {
    return Ok(id.to_string());
  }

  let parts = id.split('/').collect::<Vec<_>>();
  let mut out: Vec<&str> = Vec::new();

  if let (Some(&"." | &".."), Some(caller)) = (parts.first(), caller) {
    out = caller.split('/').collect();
    out.pop();
  }

  for (index, part) in parts.iter().enumerate() {
    match *part {
      ".." => {
        if out.is_empty() || out == [""] {
          return Err(RegistryError::InvalidId(id.to_string()));
        }
        out.pop();
      }
      "." => {}
      "" if index > 0 => {}
      part => out.push(part),
    }
  }

  Ok(out.join("/"))
}
