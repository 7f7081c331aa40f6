//! Build specifications.
//!
//! A [`Spec`] describes the package to install and how the resulting image
//! is customized, both spec-wide and per target. All per-target lookups go
//! through [`Spec::image_setting`], which gives a target's own image block
//! precedence over the spec-level one.
//!
//! # Submodules
//!
//! - [`load`] - YAML loading and build-arg substitution

pub mod load;
mod types;

pub use load::{SpecLoader, YamlSpecLoader};
pub use types::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
  #[error("could not read spec file {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("error loading spec: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("error loading spec: document must be a mapping")]
  NotAMapping,

  #[error("error loading spec: `args` must map names to scalar values")]
  InvalidArgs,

  #[error("error loading spec: `name` is required")]
  MissingName,

  #[error("build arg {0:?} is not declared in the spec")]
  UndeclaredArg(String),
}
