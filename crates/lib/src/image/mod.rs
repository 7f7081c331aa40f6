//! Image metadata.
//!
//! Resolves which base image a target builds on and assembles the final
//! OCI image configuration from the base image's config and the spec's
//! image settings.

mod types;

pub use types::*;

use tracing::debug;

use crate::platform::Platform;
use crate::spec::Spec;
use crate::util::BoxError;

/// Registry access, external to this crate.
///
/// Returns the image configuration of `reference` for `platform`.
pub trait ImageProvider {
  fn resolve_image_config(&self, reference: &str, platform: &Platform) -> Result<ImageSpec, BoxError>;
}

/// Base image reference for `target`: the target's override, else the
/// spec-level default, else `fallback`.
pub fn base_image_ref<'a>(spec: &'a Spec, target: &str, fallback: &'a str) -> &'a str {
  spec.base_image(target).unwrap_or(fallback)
}

/// Build the final image configuration for `target`.
///
/// Starts from `base` and layers the spec's image settings (per-target over
/// spec-level) on top. Environment entries and labels merge by key. Setting
/// an entrypoint drops an inherited command unless the spec also sets one.
pub fn build_image_config(spec: &Spec, target: &str, base: &ImageSpec, platform: &Platform) -> ImageSpec {
  let mut img = base.clone();
  img.architecture = platform.architecture.clone();
  img.os = platform.os.clone();
  img.variant = platform.variant.clone();

  let settings = spec.merged_image(target);
  let config = &mut img.config;

  if let Some(entrypoint) = settings.entrypoint {
    config.entrypoint = Some(entrypoint);
    if settings.cmd.is_none() {
      config.cmd = None;
    }
  }
  if let Some(cmd) = settings.cmd {
    config.cmd = Some(cmd);
  }
  for (key, value) in &settings.env {
    config.set_env(key, value);
  }
  config.labels.extend(settings.labels);
  for volume in settings.volumes {
    config.volumes.insert(volume, Empty {});
  }
  if let Some(dir) = settings.working_dir {
    config.working_dir = Some(dir);
  }
  if let Some(signal) = settings.stop_signal {
    config.stop_signal = Some(signal);
  }
  if let Some(user) = settings.user {
    config.user = Some(user);
  }

  debug!(build_target = %target, env = config.env.len(), labels = config.labels.len(), "assembled image config");
  img
}
