//! Implementation of the `pkgimage root` command.
//!
//! Classifies an unpacked root filesystem the way the install script does
//! at execution time and prints the bookkeeping the script would run
//! against it.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use pkgimage_lib::install::{InstallScript, RootKind};

use crate::output::{print_info, print_json, print_stat, print_success};

#[derive(Serialize)]
struct RootReport {
  root: String,
  kind: RootKind,
  statements: Vec<String>,
}

pub fn cmd_root(root: &Path, json: bool) -> Result<()> {
  if !root.is_dir() {
    bail!("{} is not a directory", root.display());
  }

  let staging = root.display().to_string();
  let kind = RootKind::detect(root);
  let statements = InstallScript::new()
    .with_staging(&staging)
    .statements_for(kind)
    .with_context(|| format!("failed to render bookkeeping for {}", staging))?;

  if json {
    return print_json(&RootReport {
      root: staging,
      kind,
      statements,
    });
  }

  print_stat("Root", &staging);
  print_stat("Kind", kind.as_str());
  if statements.is_empty() {
    print_success("rpm found in the root, no bookkeeping needed");
    return Ok(());
  }
  print_info("rpm not found in the root, after install the script runs:");
  for statement in &statements {
    println!("  {}", statement);
  }
  Ok(())
}
