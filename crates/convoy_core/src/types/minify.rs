use serde::Deserialize;
use serde::Serialize;

/// Whether to minify, optionally carrying options for the minifier
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(from = "MinifyValue", into = "MinifyValue")]
pub enum MinifyOption {
  #[default]
  Disabled,
  Enabled,
  Options(serde_json::Map<String, serde_json::Value>),
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum MinifyValue {
  Flag(bool),
  Options(serde_json::Map<String, serde_json::Value>),
}

impl From<MinifyValue> for MinifyOption {
  fn from(value: MinifyValue) -> Self {
    match value {
      MinifyValue::Flag(true) => MinifyOption::Enabled,
      MinifyValue::Flag(false) => MinifyOption::Disabled,
      MinifyValue::Options(options) => MinifyOption::Options(options),
    }
  }
}

impl From<MinifyOption> for MinifyValue {
  fn from(value: MinifyOption) -> Self {
    match value {
      MinifyOption::Disabled => MinifyValue::Flag(false),
      MinifyOption::Enabled => MinifyValue::Flag(true),
      MinifyOption::Options(options) => MinifyValue::Options(options),
    }
  }
}

impl From<bool> for MinifyOption {
  fn from(value: bool) -> Self {
    MinifyValue::Flag(value).into()
  }
}

impl MinifyOption {
  pub fn is_enabled(&self) -> bool {
    !matches!(self, MinifyOption::Disabled)
  }

  /// Options forwarded to the minifier, when any were given
  pub fn options(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
    match self {
      MinifyOption::Options(options) => Some(options),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn deserializes_flags_and_objects() {
    let enabled: MinifyOption = serde_json::from_value(json!(true)).unwrap();
    let disabled: MinifyOption = serde_json::from_value(json!(false)).unwrap();
    let options: MinifyOption = serde_json::from_value(json!({ "mangle": false })).unwrap();

    assert_eq!(enabled, MinifyOption::Enabled);
    assert_eq!(disabled, MinifyOption::Disabled);
    assert!(options.is_enabled());
    assert_eq!(
      options.options().and_then(|options| options.get("mangle")),
      Some(&json!(false))
    );
  }
}
