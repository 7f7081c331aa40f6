//! Target platform of a build.
//!
//! A [`Platform`] is the `os/architecture[/variant]` triple the graph engine
//! builds for. The engine fans out across platforms; every function in this
//! crate receives exactly one.

mod arch;

pub use arch::Arch;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
  #[error("invalid platform {0:?}: expected os/arch[/variant]")]
  Malformed(String),

  #[error("unsupported architecture {0:?}")]
  UnsupportedArch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
  pub os: String,
  pub architecture: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
}

impl Platform {
  pub fn linux(arch: Arch) -> Self {
    Self {
      os: "linux".to_string(),
      architecture: arch.oci_name().to_string(),
      variant: None,
    }
  }

  /// The platform of the running host, falling back to linux/amd64.
  pub fn current() -> Self {
    Self::linux(Arch::current().unwrap_or(Arch::X86_64))
  }

  pub fn arch(&self) -> Option<Arch> {
    Arch::parse(&self.architecture)
  }
}

impl Default for Platform {
  fn default() -> Self {
    Self::current()
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.os, self.architecture)?;
    if let Some(variant) = &self.variant {
      write!(f, "/{}", variant)?;
    }
    Ok(())
  }
}

impl FromStr for Platform {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = s.split('/').collect();
    let (os, arch, variant) = match parts.as_slice() {
      [os, arch] => (*os, *arch, None),
      [os, arch, variant] => (*os, *arch, Some(variant.to_string())),
      _ => return Err(PlatformError::Malformed(s.to_string())),
    };
    if os.is_empty() || arch.is_empty() {
      return Err(PlatformError::Malformed(s.to_string()));
    }
    let arch = Arch::parse(arch).ok_or_else(|| PlatformError::UnsupportedArch(arch.to_string()))?;

    Ok(Self {
      os: os.to_string(),
      architecture: arch.oci_name().to_string(),
      variant,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_os_and_arch() {
    let p: Platform = "linux/arm64".parse().unwrap();
    assert_eq!(p, Platform::linux(Arch::Aarch64));
    assert_eq!(p.to_string(), "linux/arm64");
  }

  #[test]
  fn kernel_arch_spelling_is_normalized() {
    let p: Platform = "linux/x86_64".parse().unwrap();
    assert_eq!(p.architecture, "amd64");
  }

  #[test]
  fn variant_round_trips_through_display() {
    let p: Platform = "linux/arm64/v8".parse().unwrap();
    assert_eq!(p.variant.as_deref(), Some("v8"));
    assert_eq!(p.to_string(), "linux/arm64/v8");
  }

  #[test]
  fn malformed_platform_is_rejected() {
    assert_eq!(
      "linux".parse::<Platform>(),
      Err(PlatformError::Malformed("linux".to_string()))
    );
    assert!(matches!(
      "linux/sparc".parse::<Platform>(),
      Err(PlatformError::UnsupportedArch(_))
    ));
  }
}
