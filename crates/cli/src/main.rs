mod cmd;
mod offline;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pkgimage_lib::config::FrontendConfig;
use pkgimage_lib::consts::STAGING_PATH;

use crate::cmd::{PlanArgs, cmd_info, cmd_plan, cmd_root, cmd_script, cmd_targets};

/// pkgimage - build container images from package specs
#[derive(Parser)]
#[command(name = "pkgimage")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List the targets a spec can be built as
  Targets {
    /// Path to the spec file
    spec: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Print the operation graph for a target without building it
  Plan {
    /// Path to the spec file
    spec: PathBuf,

    /// Target to plan (default: buildroot)
    #[arg(short, long, default_value = "")]
    target: String,

    /// Build arg override, repeatable
    #[arg(long = "build-arg", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    build_args: Vec<(String, String)>,

    /// Platform to plan for, as os/arch (default: host)
    #[arg(long)]
    platform: Option<String>,

    /// Local artifact set to inventory alongside the plan
    #[arg(long)]
    artifacts: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Print the package install script, and the post-install script for a spec
  Script {
    /// Spec whose post-install step to print as well
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Target whose post-install settings apply
    #[arg(short, long, default_value = "container")]
    target: String,

    /// Directory the root is staged in
    #[arg(long, default_value = STAGING_PATH)]
    staging: String,

    #[command(flatten)]
    config: ConfigArgs,
  },

  /// Classify an unpacked root and show the bookkeeping the install script runs on it
  Root {
    /// Path to the unpacked root filesystem
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show version, host platform and effective configuration
  Info {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

/// Overrides applied on top of the environment configuration.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
  /// Base image used when the spec names none
  #[arg(long)]
  distroless_ref: Option<String>,

  /// Image the install steps run in
  #[arg(long)]
  worker_image: Option<String>,

  /// Release version passed to the package manager
  #[arg(long)]
  releasever: Option<String>,
}

impl ConfigArgs {
  fn resolve(self) -> FrontendConfig {
    let mut config = FrontendConfig::from_env();
    if let Some(v) = self.distroless_ref {
      config.distroless_ref = v;
    }
    if let Some(v) = self.worker_image {
      config.worker_image = v;
    }
    if let Some(v) = self.releasever {
      config.releasever = v;
    }
    config
  }
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("invalid build arg '{}': expected KEY=VALUE", s)),
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Targets { spec, json } => cmd_targets(&spec, json),
    Commands::Plan {
      spec,
      target,
      build_args,
      platform,
      artifacts,
      config,
      json,
    } => cmd_plan(PlanArgs {
      spec,
      target,
      build_args: build_args.into_iter().collect(),
      platform,
      artifacts,
      config: config.resolve(),
      json,
      verbose: cli.verbose,
    }),
    Commands::Script {
      spec,
      target,
      staging,
      config,
    } => cmd_script(spec.as_deref(), &target, &staging, &config.resolve()),
    Commands::Root { path, json } => cmd_root(&path, json),
    Commands::Info { config, json } => cmd_info(&config.resolve(), json),
  }
}
