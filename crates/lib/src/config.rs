//! Frontend configuration.
//!
//! Defaults come from [`crate::consts`]. Each value can be overridden from
//! the environment, and callers (the CLI) may override again on top.

use crate::consts::{DISTROLESS_REF, RELEASEVER, WORKER_IMAGE_REF};

pub const ENV_DISTROLESS_REF: &str = "PKGIMAGE_DISTROLESS_REF";
pub const ENV_WORKER_IMAGE: &str = "PKGIMAGE_WORKER_IMAGE";
pub const ENV_RELEASEVER: &str = "PKGIMAGE_RELEASEVER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendConfig {
  /// Base image used when neither the target nor the spec names one.
  pub distroless_ref: String,
  /// Image the install and post-install steps run in.
  pub worker_image: String,
  /// Release version pinned for the package manager.
  pub releasever: String,
}

impl Default for FrontendConfig {
  fn default() -> Self {
    Self {
      distroless_ref: DISTROLESS_REF.to_string(),
      worker_image: WORKER_IMAGE_REF.to_string(),
      releasever: RELEASEVER.to_string(),
    }
  }
}

impl FrontendConfig {
  /// Defaults with `PKGIMAGE_*` environment overrides applied.
  ///
  /// Empty variables are ignored.
  pub fn from_env() -> Self {
    let mut config = Self::default();
    if let Some(v) = env_override(ENV_DISTROLESS_REF) {
      config.distroless_ref = v;
    }
    if let Some(v) = env_override(ENV_WORKER_IMAGE) {
      config.worker_image = v;
    }
    if let Some(v) = env_override(ENV_RELEASEVER) {
      config.releasever = v;
    }
    config
  }
}

fn env_override(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn defaults_without_environment() {
    temp_env::with_vars_unset([ENV_DISTROLESS_REF, ENV_WORKER_IMAGE, ENV_RELEASEVER], || {
      assert_eq!(FrontendConfig::from_env(), FrontendConfig::default());
    });
  }

  #[test]
  #[serial]
  fn environment_overrides_defaults() {
    temp_env::with_vars(
      [
        (ENV_DISTROLESS_REF, Some("registry.example/distroless:3")),
        (ENV_RELEASEVER, Some("3.0")),
        (ENV_WORKER_IMAGE, Some("")),
      ],
      || {
        let config = FrontendConfig::from_env();
        assert_eq!(config.distroless_ref, "registry.example/distroless:3");
        assert_eq!(config.releasever, "3.0");
        assert_eq!(config.worker_image, WORKER_IMAGE_REF);
      },
    );
  }
}
