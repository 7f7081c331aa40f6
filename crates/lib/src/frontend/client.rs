//! Collaborators the frontend drives but does not implement.
//!
//! Each trait is one external system: the graph engine, the package
//! resolver, the buildroot producer and the test harness. Errors are
//! returned boxed and wrapped by the frontend with the failing stage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{Constraints, Definition, State};
use crate::platform::Platform;
use crate::spec::Spec;
use crate::util::BoxError;

/// Handle to a filesystem produced by the graph engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference(pub String);

impl fmt::Display for Reference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// The build-graph execution and caching engine.
pub trait GraphClient {
  /// Execute `definition` and return a reference to its output.
  fn solve(&self, definition: &Definition) -> Result<Reference, BoxError>;
}

/// Turns a spec's package list into an artifact set.
pub trait PackageResolver {
  /// A state whose `/RPMS` directory holds the packages to install for
  /// `target` on `platform`.
  fn resolve_packages(
    &self,
    spec: &Spec,
    target: &str,
    platform: &Platform,
    constraints: &Constraints,
  ) -> Result<State, BoxError>;
}

/// Produces the buildroot output.
pub trait BuildrootProvider {
  fn buildroot(&self, spec: &Spec, platform: &Platform, constraints: &Constraints) -> Result<State, BoxError>;
}

/// Runs the spec's tests against a finished image.
pub trait TestRunner {
  fn run(&self, spec: &Spec, target: &str, reference: &Reference) -> Result<(), BoxError>;
}

/// A [`TestRunner`] that accepts every image.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipTests;

impl TestRunner for SkipTests {
  fn run(&self, _spec: &Spec, _target: &str, _reference: &Reference) -> Result<(), BoxError> {
    Ok(())
  }
}
