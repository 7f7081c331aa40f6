use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A resolved build specification.
///
/// Build args have already been substituted by the time a `Spec` exists;
/// `args` records the effective values.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
  #[serde(default, deserialize_with = "scalar::string")]
  pub name: String,
  #[serde(default, deserialize_with = "scalar::string", skip_serializing_if = "String::is_empty")]
  pub version: String,
  #[serde(default, deserialize_with = "scalar::string", skip_serializing_if = "String::is_empty")]
  pub revision: String,
  #[serde(default, deserialize_with = "scalar::string", skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(default, deserialize_with = "scalar::string", skip_serializing_if = "String::is_empty")]
  pub license: String,
  #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
  pub vendor: Option<String>,
  #[serde(default, deserialize_with = "scalar::opt_string", skip_serializing_if = "Option::is_none")]
  pub packager: Option<String>,
  /// Declared build args and their values.
  #[serde(default, deserialize_with = "scalar::map", skip_serializing_if = "BTreeMap::is_empty")]
  pub args: BTreeMap<String, String>,
  /// Runtime package names, informational only.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub dependencies: Vec<String>,
  /// Spec-level image defaults.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<ImageConfig>,
  /// Per-target overrides, keyed by target name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub targets: BTreeMap<String, Target>,
  /// Top-level keys this crate does not model (`sources`, `build`, `tests`, ...).
  ///
  /// They go through build-arg substitution and are written back out by the
  /// resolve target unchanged otherwise.
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Overrides that apply to a single target.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<ImageConfig>,
}

/// Image customization, either spec-wide or per target.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
  /// Base image reference the packages are installed on top of.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entrypoint: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cmd: Option<Vec<String>>,
  #[serde(default, deserialize_with = "scalar::map", skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
  #[serde(default, deserialize_with = "scalar::map", skip_serializing_if = "BTreeMap::is_empty")]
  pub labels: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub volumes: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub working_dir: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stop_signal: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub post: Option<PostInstall>,
}

/// Actions applied to the staged root after packages are installed.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInstall {
  /// Source path inside the root mapped to where the link is created.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub symlinks: BTreeMap<String, SymlinkTarget>,
}

impl PostInstall {
  pub fn is_empty(&self) -> bool {
    self.symlinks.is_empty()
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymlinkTarget {
  pub path: String,
}

/// Scalar fields that accept any YAML scalar and keep it as text, so
/// `version: 1.2` reads the same as `version: "1.2"`.
mod scalar {
  use std::collections::BTreeMap;

  use serde::de::{Deserializer, Error};
  use serde::Deserialize;
  use serde_yaml::Value;

  fn text<E: Error>(value: Value) -> Result<Option<String>, E> {
    match value {
      Value::Null => Ok(None),
      Value::String(s) => Ok(Some(s)),
      Value::Bool(b) => Ok(Some(b.to_string())),
      Value::Number(n) => Ok(Some(n.to_string())),
      Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => Err(E::custom("expected a scalar value")),
    }
  }

  pub fn string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(text::<D::Error>(Value::deserialize(de)?)?.unwrap_or_default())
  }

  pub fn opt_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    text(Value::deserialize(de)?)
  }

  pub fn map<'de, D: Deserializer<'de>>(de: D) -> Result<BTreeMap<String, String>, D::Error> {
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(de)?;
    raw
      .unwrap_or_default()
      .into_iter()
      .map(|(k, v)| Ok((k, text::<D::Error>(v)?.unwrap_or_default())))
      .collect()
  }
}

impl Spec {
  /// Look up an image setting for `target`.
  ///
  /// The target's own image block wins when it carries the setting;
  /// otherwise the spec-level image block is consulted. Every per-target
  /// lookup goes through here so the container pipeline and the image
  /// config agree on precedence.
  pub fn image_setting<'a, T: ?Sized>(
    &'a self,
    target: &str,
    get: impl Fn(&'a ImageConfig) -> Option<&'a T>,
  ) -> Option<&'a T> {
    self
      .targets
      .get(target)
      .and_then(|t| t.image.as_ref())
      .and_then(&get)
      .or_else(|| self.image.as_ref().and_then(&get))
  }

  /// Base image reference declared for `target`, if any.
  pub fn base_image(&self, target: &str) -> Option<&str> {
    self.image_setting(target, |img| img.base.as_deref())
  }

  /// Post-install block for `target`.
  ///
  /// A target that declares its own (even empty) block replaces the spec-level one.
  pub fn post_install(&self, target: &str) -> Option<&PostInstall> {
    self.image_setting(target, |img| img.post.as_ref())
  }

  /// Image settings for `target` with target values layered over the spec defaults.
  ///
  /// Scalar settings come from [`Spec::image_setting`]; `env` and `labels`
  /// merge by key with the target winning.
  pub fn merged_image(&self, target: &str) -> ImageConfig {
    let mut env = BTreeMap::new();
    let mut labels = BTreeMap::new();
    let mut volumes = Vec::new();

    let layers = [
      self.image.as_ref(),
      self.targets.get(target).and_then(|t| t.image.as_ref()),
    ];
    for img in layers.into_iter().flatten() {
      env.extend(img.env.iter().map(|(k, v)| (k.clone(), v.clone())));
      labels.extend(img.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
      for vol in &img.volumes {
        if !volumes.contains(vol) {
          volumes.push(vol.clone());
        }
      }
    }

    ImageConfig {
      base: self.base_image(target).map(str::to_string),
      entrypoint: self.image_setting(target, |img| img.entrypoint.as_ref()).cloned(),
      cmd: self.image_setting(target, |img| img.cmd.as_ref()).cloned(),
      env,
      labels,
      volumes,
      working_dir: self
        .image_setting(target, |img| img.working_dir.as_deref())
        .map(str::to_string),
      stop_signal: self
        .image_setting(target, |img| img.stop_signal.as_deref())
        .map(str::to_string),
      user: self.image_setting(target, |img| img.user.as_deref()).map(str::to_string),
      post: self.post_install(target).cloned(),
    }
  }

  /// Serialize the spec back to YAML.
  pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(self)
  }
}
