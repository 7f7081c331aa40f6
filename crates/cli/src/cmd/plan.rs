//! Implementation of the `pkgimage plan` command.
//!
//! Loads a spec, routes the requested target and prints the marshalled
//! operation graph. Nothing is built: image metadata and package artifacts
//! come from the offline collaborators.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use pkgimage_lib::artifacts::ArtifactSet;
use pkgimage_lib::config::FrontendConfig;
use pkgimage_lib::frontend::{Frontend, Plan, Route};
use pkgimage_lib::graph::{Op, OpEntry};
use pkgimage_lib::platform::Platform;

use super::load_spec;
use crate::offline::{LocalContexts, OfflineRegistry};
use crate::output::{format_bytes, print_info, print_json, print_stat, print_success, print_warning, truncate_hash};

pub struct PlanArgs {
  pub spec: PathBuf,
  pub target: String,
  pub build_args: BTreeMap<String, String>,
  pub platform: Option<String>,
  pub artifacts: Option<PathBuf>,
  pub config: FrontendConfig,
  pub json: bool,
  pub verbose: bool,
}

#[derive(Serialize)]
struct PlanReport<'a> {
  platform: String,
  #[serde(flatten)]
  plan: &'a Plan,
  #[serde(skip_serializing_if = "Option::is_none")]
  artifacts: Option<&'a ArtifactSet>,
}

pub fn cmd_plan(args: PlanArgs) -> Result<()> {
  let spec = load_spec(&args.spec, &args.build_args)?;
  let platform = match &args.platform {
    Some(p) => p.parse::<Platform>().with_context(|| format!("Invalid platform: {}", p))?,
    None => Platform::current(),
  };

  debug!(spec = %spec.name, platform = %platform, build_target = %args.target, "planning");

  let artifacts = args
    .artifacts
    .as_deref()
    .map(ArtifactSet::scan)
    .transpose()
    .context("Failed to inventory artifacts")?;

  let contexts = LocalContexts;
  let frontend = Frontend::new(args.config, &OfflineRegistry, &contexts, &contexts);
  let plan = frontend
    .plan(&platform, &spec, &args.target)
    .with_context(|| format!("Failed to plan {}", display_target(&args.target)))?;

  if args.json {
    return print_json(&PlanReport {
      platform: platform.to_string(),
      plan: &plan,
      artifacts: artifacts.as_ref(),
    });
  }

  print_success(&format!(
    "Plan for {} ({}) on {}",
    spec.name,
    route_label(&plan.route),
    platform
  ));
  print_stat("Operations", &plan.definition.ops.len().to_string());
  if let Some(output) = &plan.definition.output {
    print_stat("Output", &format!("{}[{}]", truncate_hash(output.digest.hex()), output.index));
  }
  println!();
  for entry in &plan.definition.ops {
    println!("  {}", describe(entry));
    if args.verbose
      && let Op::Exec { meta, mounts } = &entry.op
    {
      for mount in mounts {
        println!("      mount {}", mount.dest);
      }
      if let Some(script) = meta.args.last() {
        for line in script.lines() {
          println!("      | {}", line);
        }
      }
    }
  }

  if let Some(image) = &plan.image {
    println!();
    print_info("Image config");
    if let Some(entrypoint) = &image.config.entrypoint {
      print_stat("Entrypoint", &entrypoint.join(" "));
    }
    if let Some(cmd) = &image.config.cmd {
      print_stat("Cmd", &cmd.join(" "));
    }
    for env in &image.config.env {
      print_stat("Env", env);
    }
  }

  if let Some(set) = &artifacts {
    println!();
    print_info(&format!("Artifacts in {}", set.root.display()));
    for (arch, found) in &set.arches {
      print_stat(
        arch,
        &format!("{} package(s), {}", found.packages.len(), format_bytes(found.bytes)),
      );
    }
    if let Some(arch) = platform.arch()
      && set.installable(arch).is_empty()
    {
      print_warning(&format!("No packages would be installed on {}", arch.as_str()));
    }
  }

  Ok(())
}

fn display_target(target: &str) -> &str {
  if target.is_empty() { "default target" } else { target }
}

fn route_label(route: &Route) -> String {
  match route {
    Route::Buildroot => "buildroot".to_string(),
    Route::Resolve => "resolve".to_string(),
    Route::Container { target_key } => format!("container {}", target_key),
  }
}

fn describe(entry: &OpEntry) -> String {
  let digest = truncate_hash(entry.digest.hex());
  let kind = match &entry.op {
    Op::Source { identifier } => format!("source {}", identifier),
    Op::File { .. } => "file".to_string(),
    Op::Exec { .. } => "exec".to_string(),
  };
  match &entry.constraints.custom_name {
    Some(name) => format!("{} {} ({})", digest, kind, name),
    None => format!("{} {}", digest, kind),
  }
}
