//! Fake collaborators for frontend tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use pkgimage_lib::config::FrontendConfig;
use pkgimage_lib::frontend::{BuildrootProvider, Frontend, GraphClient, PackageResolver, Reference, TestRunner};
use pkgimage_lib::graph::{Constraints, Definition, State};
use pkgimage_lib::image::{ImageProvider, ImageSpec};
use pkgimage_lib::platform::{Arch, Platform};
use pkgimage_lib::spec::Spec;
use pkgimage_lib::util::BoxError;

pub fn platform() -> Platform {
  Platform::linux(Arch::X86_64)
}

/// Serves canned image configs, recording every lookup.
#[derive(Default)]
pub struct FakeRegistry {
  pub images: BTreeMap<String, ImageSpec>,
  pub lookups: RefCell<Vec<String>>,
}

impl FakeRegistry {
  pub fn with_image(mut self, reference: &str, image: ImageSpec) -> Self {
    self.images.insert(reference.to_string(), image);
    self
  }
}

impl ImageProvider for FakeRegistry {
  fn resolve_image_config(&self, reference: &str, platform: &Platform) -> Result<ImageSpec, BoxError> {
    self.lookups.borrow_mut().push(reference.to_string());
    Ok(
      self
        .images
        .get(reference)
        .cloned()
        .unwrap_or_else(|| ImageSpec::for_platform(platform)),
    )
  }
}

/// Packages come from a local context named after the spec.
pub struct LocalPackages;

impl PackageResolver for LocalPackages {
  fn resolve_packages(
    &self,
    spec: &Spec,
    _target: &str,
    _platform: &Platform,
    constraints: &Constraints,
  ) -> Result<State, BoxError> {
    Ok(State::local(
      format!("rpms-{}", spec.name),
      constraints.clone().with_custom_name("Build rpms"),
    ))
  }
}

pub struct FailingPackages;

impl PackageResolver for FailingPackages {
  fn resolve_packages(&self, _: &Spec, _: &str, _: &Platform, _: &Constraints) -> Result<State, BoxError> {
    Err("rpmbuild exited with status 1".into())
  }
}

pub struct LocalBuildroot;

impl BuildrootProvider for LocalBuildroot {
  fn buildroot(&self, spec: &Spec, _platform: &Platform, constraints: &Constraints) -> Result<State, BoxError> {
    Ok(State::local(format!("buildroot-{}", spec.name), constraints.clone()))
  }
}

/// Records solved definitions and answers with a reference per call.
#[derive(Default)]
pub struct RecordingGraph {
  pub solved: RefCell<Vec<Definition>>,
}

impl GraphClient for RecordingGraph {
  fn solve(&self, definition: &Definition) -> Result<Reference, BoxError> {
    let mut solved = self.solved.borrow_mut();
    solved.push(definition.clone());
    Ok(Reference(format!("ref-{}", solved.len())))
  }
}

/// Records test runs, optionally failing them.
#[derive(Default)]
pub struct RecordingTests {
  pub failure: Option<String>,
  pub runs: RefCell<Vec<(String, Reference)>>,
}

impl TestRunner for RecordingTests {
  fn run(&self, _spec: &Spec, target: &str, reference: &Reference) -> Result<(), BoxError> {
    self.runs.borrow_mut().push((target.to_string(), reference.clone()));
    match &self.failure {
      Some(message) => Err(message.clone().into()),
      None => Ok(()),
    }
  }
}

pub fn frontend<'a>(registry: &'a FakeRegistry, packages: &'a dyn PackageResolver) -> Frontend<'a> {
  Frontend::new(FrontendConfig::default(), registry, packages, &LocalBuildroot)
}

pub fn load_spec(yaml: &str) -> Spec {
  pkgimage_lib::spec::load::parse(yaml, &BTreeMap::new()).unwrap()
}
