//! Implementation of the `pkgimage targets` command.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use pkgimage_lib::frontend::list_targets;

use super::load_spec;
use crate::output::{print_item, print_json};

pub fn cmd_targets(spec_path: &Path, json: bool) -> Result<()> {
  let spec = load_spec(spec_path, &BTreeMap::new())?;
  let targets = list_targets(&spec);

  if json {
    return print_json(&targets);
  }

  println!("Targets for {}:", spec.name);
  for target in &targets {
    let name = if target.default {
      format!("{} (default)", target.name)
    } else {
      target.name.clone()
    };
    print_item(&name, &target.description);
  }
  Ok(())
}
