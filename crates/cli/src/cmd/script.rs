//! Implementation of the `pkgimage script` command.
//!
//! Prints the install script exactly as it is written into the build, and
//! the post-install script when a spec declares one for the target.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use pkgimage_lib::config::FrontendConfig;
use pkgimage_lib::install::InstallScript;
use pkgimage_lib::post_install::symlink_script;

use super::load_spec;
use crate::output::print_warning;

pub fn cmd_script(spec_path: Option<&Path>, target: &str, staging: &str, config: &FrontendConfig) -> Result<()> {
  let install = InstallScript::new()
    .with_staging(staging)
    .with_releasever(&config.releasever);
  print!("{}", install.render().context("failed to render install script")?);

  let Some(spec_path) = spec_path else {
    return Ok(());
  };
  let spec = load_spec(spec_path, &BTreeMap::new())?;
  let post = symlink_script(spec.post_install(target), staging)
    .with_context(|| format!("failed to render post-install script for {}", target))?;
  match post {
    Some(script) => {
      println!();
      println!("# post-install ({})", target);
      print!("{}", script);
    }
    None => print_warning(&format!("{} declares no post-install steps for {}", spec.name, target)),
  }
  Ok(())
}
