//! Target dispatch.
//!
//! A caller asks for a named target; the frontend routes the name to the
//! buildroot, resolved-spec or container path, builds the operation graph
//! for it and, when a graph engine is supplied, solves it.
//!
//! Planning and building share one path. [`Frontend::plan`] stops after
//! marshalling, which is what the CLI prints. [`Frontend::build`] hands the
//! definition to a [`GraphClient`], then assembles the image config and
//! runs the tests once against the result.

mod client;

pub use client::*;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FrontendConfig;
use crate::consts::RESOLVED_SPEC_FILE;
use crate::graph::{Constraints, Definition, FileAction, GraphError, State};
use crate::image::{ImageProvider, ImageSpec, base_image_ref, build_image_config};
use crate::pipeline::{PipelineError, SourceOpts, build_container_state};
use crate::platform::Platform;
use crate::spec::Spec;
use crate::util::BoxError;

pub const TARGET_BUILDROOT: &str = "buildroot";
pub const TARGET_RESOLVE: &str = "resolve";
pub const TARGET_CONTAINER: &str = "container";

#[derive(Debug, Error)]
pub enum FrontendError {
  #[error("unknown target {0:?}")]
  UnknownTarget(String),

  #[error("failed to serialize resolved spec: {0}")]
  Resolve(#[source] serde_yaml::Error),

  #[error("error creating rpm for {target}: {source}")]
  Packages {
    target: String,
    #[source]
    source: BoxError,
  },

  #[error("error creating buildroot: {0}")]
  Buildroot(#[source] BoxError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  #[error("failed to solve {target}: {source}")]
  Solve {
    target: String,
    #[source]
    source: BoxError,
  },

  #[error("failed to resolve base image config for {reference}: {source}")]
  BaseImage {
    reference: String,
    #[source]
    source: BoxError,
  },

  /// Test failures are reported as the test runner phrased them.
  #[error("{0}")]
  Tests(BoxError),
}

/// One entry of the list-targets answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetInfo {
  pub name: String,
  pub description: String,
  pub default: bool,
}

impl TargetInfo {
  fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      default: false,
    }
  }
}

/// Every target `spec` can be built as. The first entry is the default.
pub fn list_targets(spec: &Spec) -> Vec<TargetInfo> {
  let mut targets = vec![
    TargetInfo {
      default: true,
      ..TargetInfo::new(
        TARGET_BUILDROOT,
        "Outputs an rpm buildroot suitable for passing to rpmbuild",
      )
    },
    TargetInfo::new(TARGET_RESOLVE, "Outputs the resolved yaml spec with build args expanded"),
    TargetInfo::new(TARGET_CONTAINER, "Builds a container image with the spec's packages installed"),
  ];
  for key in spec.targets.keys() {
    if targets.iter().any(|t| &t.name == key) {
      continue;
    }
    targets.push(TargetInfo::new(
      key.clone(),
      format!("Builds a container image using the {} target settings", key),
    ));
  }
  targets
}

/// Which build path a requested target takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
  Buildroot,
  Resolve,
  /// `target_key` selects the per-target settings in the spec.
  Container { target_key: String },
}

/// Route a requested target name.
///
/// The empty name is the default target.
pub fn route(requested: &str, spec: &Spec) -> Result<Route, FrontendError> {
  match requested {
    "" | TARGET_BUILDROOT => Ok(Route::Buildroot),
    TARGET_RESOLVE => Ok(Route::Resolve),
    name if name == TARGET_CONTAINER || spec.targets.contains_key(name) => Ok(Route::Container {
      target_key: name.to_string(),
    }),
    name => Err(FrontendError::UnknownTarget(name.to_string())),
  }
}

/// A marshalled build for one target, not yet solved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
  pub route: Route,
  pub definition: Definition,
  /// Final image config; only container targets produce one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<ImageSpec>,
}

/// The result of a solved build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
  pub reference: Reference,
  pub image: Option<ImageSpec>,
}

/// Builds targets on one platform at a time.
pub struct Frontend<'a> {
  pub config: FrontendConfig,
  pub images: &'a dyn ImageProvider,
  pub packages: &'a dyn PackageResolver,
  pub buildroot: &'a dyn BuildrootProvider,
}

impl<'a> Frontend<'a> {
  pub fn new(
    config: FrontendConfig,
    images: &'a dyn ImageProvider,
    packages: &'a dyn PackageResolver,
    buildroot: &'a dyn BuildrootProvider,
  ) -> Self {
    Self {
      config,
      images,
      packages,
      buildroot,
    }
  }

  /// Route `requested` and marshal its graph without solving it.
  pub fn plan(&self, platform: &Platform, spec: &Spec, requested: &str) -> Result<Plan, FrontendError> {
    let route = route(requested, spec)?;
    let state = self.state_for(&route, platform, spec)?;
    let definition = Definition::marshal(&state)?;
    let image = match &route {
      Route::Container { target_key } => Some(self.image_config(platform, spec, target_key)?),
      _ => None,
    };
    Ok(Plan {
      route,
      definition,
      image,
    })
  }

  /// Route `requested`, build it with `graph` and test container results.
  pub fn build(
    &self,
    graph: &dyn GraphClient,
    tests: &dyn TestRunner,
    platform: &Platform,
    spec: &Spec,
    requested: &str,
  ) -> Result<BuildResult, FrontendError> {
    match route(requested, spec)? {
      Route::Container { target_key } => self.build_container(graph, tests, platform, spec, &target_key),
      route => {
        let state = self.state_for(&route, platform, spec)?;
        let reference = solve(graph, &state, requested)?;
        Ok(BuildResult { reference, image: None })
      }
    }
  }

  /// Build, solve and test the container for `target_key`.
  pub fn build_container(
    &self,
    graph: &dyn GraphClient,
    tests: &dyn TestRunner,
    platform: &Platform,
    spec: &Spec,
    target_key: &str,
  ) -> Result<BuildResult, FrontendError> {
    let state = self.container_state(platform, spec, target_key)?;
    let reference = solve(graph, &state, target_key)?;
    let image = self.image_config(platform, spec, target_key)?;

    tests
      .run(spec, target_key, &reference)
      .map_err(FrontendError::Tests)?;

    info!(spec = %spec.name, build_target = %target_key, reference = %reference, "container built");
    Ok(BuildResult {
      reference,
      image: Some(image),
    })
  }

  fn state_for(&self, route: &Route, platform: &Platform, spec: &Spec) -> Result<State, FrontendError> {
    match route {
      Route::Buildroot => {
        let constraints = Constraints::new().with_platform(platform.clone());
        self
          .buildroot
          .buildroot(spec, platform, &constraints)
          .map_err(FrontendError::Buildroot)
      }
      Route::Resolve => resolve_state(spec),
      Route::Container { target_key } => self.container_state(platform, spec, target_key),
    }
  }

  fn container_state(&self, platform: &Platform, spec: &Spec, target_key: &str) -> Result<State, FrontendError> {
    let constraints = Constraints::new()
      .with_platform(platform.clone())
      .with_progress_group(format!("Build container: {}", spec.name));

    let rpm_dir = self
      .packages
      .resolve_packages(spec, target_key, platform, &constraints)
      .map_err(|source| FrontendError::Packages {
        target: target_key.to_string(),
        source,
      })?;

    let worker = State::image_resolved(
      &self.config.worker_image,
      self.images,
      platform,
      constraints.clone().with_custom_name("Worker image"),
    )?;

    let sopt = SourceOpts {
      resolver: self.images,
      platform,
    };
    Ok(build_container_state(
      spec,
      target_key,
      &worker,
      &rpm_dir,
      sopt,
      &self.config,
      &constraints,
    )?)
  }

  fn image_config(&self, platform: &Platform, spec: &Spec, target_key: &str) -> Result<ImageSpec, FrontendError> {
    let reference = base_image_ref(spec, target_key, &self.config.distroless_ref);
    let base = self
      .images
      .resolve_image_config(reference, platform)
      .map_err(|source| FrontendError::BaseImage {
        reference: reference.to_string(),
        source,
      })?;
    Ok(build_image_config(spec, target_key, &base, platform))
  }
}

/// The resolved spec as `spec.yml` in an otherwise empty filesystem.
pub fn resolve_state(spec: &Spec) -> Result<State, FrontendError> {
  let yaml = spec.to_yaml().map_err(FrontendError::Resolve)?;
  Ok(State::scratch().file(
    FileAction::mkfile(RESOLVED_SPEC_FILE, 0o644, yaml),
    Constraints::new().with_custom_name("Write resolved spec"),
  ))
}

fn solve(graph: &dyn GraphClient, state: &State, target: &str) -> Result<Reference, FrontendError> {
  let definition = Definition::marshal(state)?;
  debug!(build_target = %target, ops = definition.ops.len(), "solving definition");
  graph.solve(&definition).map_err(|source| FrontendError::Solve {
    target: target.to_string(),
    source,
  })
}
