//! Package install script.
//!
//! Generates the `sh` script that installs the package artifact set into
//! the staged root. The script runs inside the worker with the artifact set
//! mounted at [`ARTIFACTS_MOUNT`] and the base image mounted at the staging
//! path.
//!
//! # Phases
//!
//! 1. Check the `noarch` and current-architecture directories for packages.
//!    The check suppresses errors so a missing directory counts as empty.
//! 2. Install whatever was found with the package manager, offline, into
//!    the staged root. A failed install aborts the script.
//! 3. Look for the `rpm` binary in the staged root's executable search path.
//!    Which branch follows is only known when the script runs, see
//!    [`RootKind`].
//! 4. Distroless roots only: write both package manifests, then remove the
//!    package database.

use std::path::Path;

use serde::Serialize;

use crate::consts::{
  ARTIFACTS_MOUNT, CHROOT_SEARCH_PATH, NOARCH_DIR, PACKAGE_MANAGER, RELEASEVER, RPM_BIN, RPM_MANIFEST_1,
  RPM_MANIFEST_2, RPM_MANIFEST_2_QUERY_FORMAT, RPM_MANIFEST_DIR, RPMDB_DIR, STAGING_PATH,
};
use crate::util::path::join_rooted;
use crate::util::shell::{QuoteError, quote};

/// What kind of root the install ran against.
///
/// The graph builder never knows this; the generated script decides at
/// execution time by looking in the staged root for the `rpm` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
  /// `rpm` is reachable in the root. Nothing happens after the install.
  Full,
  /// `rpm` is absent. Manifests are written and the database is removed.
  Distroless,
}

impl RootKind {
  /// Classify an unpacked root on the host the same way the script does.
  pub fn detect(root: &Path) -> Self {
    let found = CHROOT_SEARCH_PATH.iter().any(|dir| {
      let candidate = root.join(dir.trim_start_matches('/')).join(RPM_BIN);
      is_executable_file(&candidate)
    });
    if found { RootKind::Full } else { RootKind::Distroless }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      RootKind::Full => "full",
      RootKind::Distroless => "distroless",
    }
  }

  pub fn needs_manifest(self) -> bool {
    matches!(self, RootKind::Distroless)
  }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;
  std::fs::metadata(path)
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
  path.is_file()
}

/// Builder for the install script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallScript {
  /// Root being assembled.
  pub staging: String,
  /// Where the artifact set is mounted.
  pub artifacts: String,
  /// Release version passed to the package manager.
  pub releasever: String,
  pub package_manager: String,
}

impl Default for InstallScript {
  fn default() -> Self {
    Self {
      staging: STAGING_PATH.to_string(),
      artifacts: ARTIFACTS_MOUNT.to_string(),
      releasever: RELEASEVER.to_string(),
      package_manager: PACKAGE_MANAGER.to_string(),
    }
  }
}

impl InstallScript {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_staging(mut self, staging: impl Into<String>) -> Self {
    self.staging = staging.into();
    self
  }

  pub fn with_artifacts(mut self, artifacts: impl Into<String>) -> Self {
    self.artifacts = artifacts.into();
    self
  }

  pub fn with_releasever(mut self, releasever: impl Into<String>) -> Self {
    self.releasever = releasever.into();
    self
  }

  pub fn manifest_dir(&self) -> String {
    join_rooted(&self.staging, RPM_MANIFEST_DIR)
  }

  pub fn manifest_paths(&self) -> (String, String) {
    let dir = self.manifest_dir();
    (join_rooted(&dir, RPM_MANIFEST_1), join_rooted(&dir, RPM_MANIFEST_2))
  }

  pub fn rpmdb_dir(&self) -> String {
    join_rooted(&self.staging, RPMDB_DIR)
  }

  /// The staged root's executable search path, in lookup order.
  pub fn chroot_search_path(&self) -> Vec<String> {
    CHROOT_SEARCH_PATH
      .iter()
      .map(|dir| join_rooted(&self.staging, dir))
      .collect()
  }

  /// Package manager invocation, without the package arguments.
  pub fn install_command(&self) -> Result<String, QuoteError> {
    Ok(format!(
      "{} -v install --releasever={} -y --nogpgcheck --installroot {} --setopt=reposdir=/etc/yum.repos.d",
      self.package_manager,
      self.releasever,
      quote(&self.staging)?
    ))
  }

  /// Statements of the distroless branch, in execution order: create the
  /// manifest directory, write manifest 1, write manifest 2, remove the
  /// package database.
  pub fn distroless_statements(&self) -> Result<Vec<String>, QuoteError> {
    let rpmdb = self.rpmdb_dir();
    let (manifest_1, manifest_2) = self.manifest_paths();
    let manifest_dir = self.manifest_dir();
    Ok(vec![
      format!("mkdir -p {}", quote(&manifest_dir)?),
      format!("{} --dbpath={} -qa > {}", RPM_BIN, quote(&rpmdb)?, quote(&manifest_1)?),
      format!(
        "{} --dbpath={} -qa --qf \"{}\" > {}",
        RPM_BIN,
        quote(&rpmdb)?,
        RPM_MANIFEST_2_QUERY_FORMAT,
        quote(&manifest_2)?
      ),
      format!("rm -rf {}", quote(&rpmdb)?),
    ])
  }

  /// What the script runs after the install for a root of `kind`.
  pub fn statements_for(&self, kind: RootKind) -> Result<Vec<String>, QuoteError> {
    if kind.needs_manifest() {
      self.distroless_statements()
    } else {
      Ok(Vec::new())
    }
  }

  /// Render the complete script.
  pub fn render(&self) -> Result<String, QuoteError> {
    let artifacts = self.artifacts.trim_end_matches('/');
    let search_path = self
      .chroot_search_path()
      .iter()
      .map(|d| quote(d).map(|q| q.into_owned()))
      .collect::<Result<Vec<_>, _>>()?;

    let mut lines: Vec<String> = vec![
      "#!/usr/bin/env sh".to_string(),
      String::new(),
      "check_non_empty() {".to_string(),
      "\tls ${1} > /dev/null 2>&1".to_string(),
      "}".to_string(),
      String::new(),
      format!("arch_dir={}/$(uname -m)", quote(artifacts)?),
      format!("noarch_dir={}", quote(&format!("{}/{}", artifacts, NOARCH_DIR))?),
      String::new(),
      "rpms=\"\"".to_string(),
      String::new(),
      "if check_non_empty \"${noarch_dir}/*.rpm\"; then".to_string(),
      "\trpms=\"${noarch_dir}/*.rpm\"".to_string(),
      "fi".to_string(),
      String::new(),
      "if check_non_empty \"${arch_dir}/*.rpm\"; then".to_string(),
      "\trpms=\"${rpms} ${arch_dir}/*.rpm\"".to_string(),
      "fi".to_string(),
      String::new(),
      "if [ -n \"${rpms}\" ]; then".to_string(),
      format!("\t{} ${{rpms}} || exit", self.install_command()?),
      "fi".to_string(),
      String::new(),
      "# rpm in the root means a full base image: no bookkeeping needed.".to_string(),
      format!("for dir in {}; do", search_path.join(" ")),
      format!("\tif [ -f \"${{dir}}/{rpm}\" ] && [ -x \"${{dir}}/{rpm}\" ]; then", rpm = RPM_BIN),
      "\t\texit 0".to_string(),
      "\tfi".to_string(),
      "done".to_string(),
      String::new(),
      "# Distroless root: record what was installed, then drop the database.".to_string(),
      "set -e".to_string(),
    ];
    lines.extend(self.statements_for(RootKind::Distroless)?);
    lines.push(String::new());
    Ok(lines.join("\n"))
  }
}
