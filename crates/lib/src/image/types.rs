use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_PATH_ENV;
use crate::platform::Platform;

/// OCI image configuration, limited to the fields this crate reads or writes.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
  pub architecture: String,
  pub os: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
  #[serde(default)]
  pub config: RuntimeConfig,
}

/// Empty JSON object, used for OCI set-like maps such as `Volumes`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// The `config` section of an OCI image configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuntimeConfig {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub env: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entrypoint: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cmd: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub working_dir: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user: Option<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub labels: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub volumes: BTreeMap<String, Empty>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stop_signal: Option<String>,
}

impl ImageSpec {
  /// A minimal config for `platform` with the conventional `PATH`.
  pub fn for_platform(platform: &Platform) -> Self {
    Self {
      architecture: platform.architecture.clone(),
      os: platform.os.clone(),
      variant: platform.variant.clone(),
      config: RuntimeConfig {
        env: vec![DEFAULT_PATH_ENV.to_string()],
        ..Default::default()
      },
    }
  }

  /// Value of environment variable `key`, if set.
  pub fn env_value(&self, key: &str) -> Option<&str> {
    self.config.env.iter().find_map(|entry| {
      let (k, v) = entry.split_once('=')?;
      (k == key).then_some(v)
    })
  }
}

impl RuntimeConfig {
  /// Set `key=value`, replacing an existing entry for `key` in place.
  pub fn set_env(&mut self, key: &str, value: &str) {
    let entry = format!("{}={}", key, value);
    let existing = self
      .env
      .iter()
      .position(|e| e.split_once('=').map(|(k, _)| k) == Some(key) || e == key);
    match existing {
      Some(i) => self.env[i] = entry,
      None => self.env.push(entry),
    }
  }
}
