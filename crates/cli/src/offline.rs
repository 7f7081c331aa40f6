//! Collaborators for planning without a graph engine or registry.
//!
//! Image metadata is not fetched: every reference resolves to a minimal
//! config for the requested platform. Packages and the buildroot are named
//! local contexts the caller is expected to supply at build time.

use pkgimage_lib::graph::{Constraints, State};
use pkgimage_lib::image::{ImageProvider, ImageSpec};
use pkgimage_lib::frontend::{BuildrootProvider, PackageResolver};
use pkgimage_lib::platform::Platform;
use pkgimage_lib::spec::Spec;
use pkgimage_lib::util::BoxError;

pub const RPMS_CONTEXT: &str = "rpms";
pub const BUILDROOT_CONTEXT: &str = "buildroot";

pub struct OfflineRegistry;

impl ImageProvider for OfflineRegistry {
  fn resolve_image_config(&self, _reference: &str, platform: &Platform) -> Result<ImageSpec, BoxError> {
    Ok(ImageSpec::for_platform(platform))
  }
}

pub struct LocalContexts;

impl PackageResolver for LocalContexts {
  fn resolve_packages(
    &self,
    _spec: &Spec,
    _target: &str,
    _platform: &Platform,
    constraints: &Constraints,
  ) -> Result<State, BoxError> {
    Ok(State::local(RPMS_CONTEXT, constraints.clone().with_custom_name("Package artifacts")))
  }
}

impl BuildrootProvider for LocalContexts {
  fn buildroot(&self, _spec: &Spec, _platform: &Platform, constraints: &Constraints) -> Result<State, BoxError> {
    Ok(State::local(BUILDROOT_CONTEXT, constraints.clone().with_custom_name("Buildroot")))
  }
}
