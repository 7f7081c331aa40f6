//! Container assembly.
//!
//! Composes the base image, the package install step and the optional
//! post-install step into one state whose contents are the finished
//! container root:
//!
//! ```text
//! base image ──mounted at staging──┐
//! artifact set (/RPMS, ro) ────────┤
//! install.sh (ro) ─────────────────┼─> install exec on worker ──> staged root
//! tdnf caches ─────────────────────┘                                 │
//!                                 post-install exec on worker <──────┘ (only with symlinks)
//! ```
//!
//! Nothing runs here. The returned state is marshalled and handed to the
//! graph engine by the frontend.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::FrontendConfig;
use crate::consts::{
  ARTIFACTS_MOUNT, ARTIFACTS_SOURCE_PATH, INSTALL_SCRIPT_MOUNT, INSTALL_SCRIPT_NAME, STAGING_PATH, TDNF_CACHE_DIR,
  TDNF_CACHE_ID,
};
use crate::graph::{CacheSharing, Constraints, FileAction, GraphError, Mount, State};
use crate::image::{ImageProvider, base_image_ref};
use crate::install::InstallScript;
use crate::platform::Platform;
use crate::post_install::symlink_script;
use crate::spec::Spec;
use crate::util::path::join_rooted;
use crate::util::shell::QuoteError;

pub const STEP_WRITE_INSTALLER: &str = "Write install script";
pub const STEP_INSTALL: &str = "Install packages";
pub const STEP_SYMLINKS: &str = "Add post-install symlinks";

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error(transparent)]
  Graph(#[from] GraphError),

  /// A path or symlink source cannot be written into a generated script.
  #[error(transparent)]
  Script(#[from] QuoteError),
}

/// What states are resolved against.
#[derive(Clone, Copy)]
pub struct SourceOpts<'a> {
  pub resolver: &'a dyn ImageProvider,
  pub platform: &'a Platform,
}

/// Wrap `script` for execution with `sh -c`.
pub fn sh_args(script: &str) -> Vec<String> {
  vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Build the container root for `target`.
///
/// `worker` runs the install script; `rpm_dir` holds the artifact set under
/// `/RPMS`. `constraints` (progress group, platform) are applied to every
/// operation created here.
pub fn build_container_state(
  spec: &Spec,
  target: &str,
  worker: &State,
  rpm_dir: &State,
  sopt: SourceOpts<'_>,
  config: &FrontendConfig,
  constraints: &Constraints,
) -> Result<State, PipelineError> {
  let base_ref = base_image_ref(spec, target, &config.distroless_ref);
  info!(spec = %spec.name, build_target = %target, base = %base_ref, "assembling container root");

  let base = State::image_resolved(
    base_ref,
    sopt.resolver,
    sopt.platform,
    constraints.clone().with_custom_name(format!("Base image {}", base_ref)),
  )?;

  let script = InstallScript::new().with_releasever(&config.releasever).render()?;
  let installer = State::scratch().file(
    FileAction::mkfile(INSTALL_SCRIPT_NAME, 0o755, script),
    constraints.clone().with_custom_name(STEP_WRITE_INSTALLER),
  );

  // The staged cache keeps repo data and downloaded packages out of the image layer.
  let mut rootfs = worker
    .run(sh_args(INSTALL_SCRIPT_MOUNT))
    .mount(Mount::cache(TDNF_CACHE_DIR, TDNF_CACHE_ID, CacheSharing::Shared))
    .mount(
      Mount::bind(ARTIFACTS_MOUNT, rpm_dir.clone())
        .with_selector(ARTIFACTS_SOURCE_PATH)
        .readonly(),
    )
    .mount(
      Mount::bind(INSTALL_SCRIPT_MOUNT, installer)
        .with_selector(INSTALL_SCRIPT_NAME)
        .readonly(),
    )
    .mount(Mount::cache(
      join_rooted(STAGING_PATH, TDNF_CACHE_DIR),
      TDNF_CACHE_ID,
      CacheSharing::Locked,
    ))
    .constraints(constraints.clone().with_custom_name(STEP_INSTALL))
    .add_mount(STAGING_PATH, base);

  if let Some(script) = symlink_script(spec.post_install(target), STAGING_PATH)? {
    debug!(build_target = %target, "adding post-install symlink step");
    rootfs = worker
      .run(sh_args(&script))
      .constraints(constraints.clone().with_custom_name(STEP_SYMLINKS))
      .add_mount(STAGING_PATH, rootfs);
  }

  Ok(rootfs)
}
