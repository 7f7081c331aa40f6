//! Operation graphs.
//!
//! This module models the filesystem operations handed to the external
//! graph engine. A [`State`] describes a filesystem lazily: a registry
//! image, a local context, a file written on top of another state, or one
//! output of a command run with mounts. Composing states only records
//! operations; [`Definition::marshal`] flattens the graph into a
//! dependency-ordered list of content-addressed entries the engine can
//! execute and cache.
//!
//! # Operation kinds
//!
//! - `Source` - registry image or local context
//! - `File` - create a file on top of an input
//! - `Exec` - run a command on a root filesystem with extra mounts
//!
//! # Outputs
//!
//! An exec's root filesystem is output 0. Each writable bind mount adds an
//! output in the order the mounts were added, holding the mount's contents
//! after the command finished.

mod definition;
mod state;
mod types;

pub use definition::*;
pub use state::{ExecBuilder, State};
pub use types::*;

use thiserror::Error;

use crate::util::BoxError;
use crate::util::hash::HashError;

#[derive(Debug, Error)]
pub enum GraphError {
  /// Image metadata could not be resolved.
  #[error("failed to resolve image metadata for {reference}: {source}")]
  ImageResolution {
    reference: String,
    #[source]
    source: BoxError,
  },

  #[error("exec operation {} has no arguments", .name.as_deref().unwrap_or("<unnamed>"))]
  EmptyArgs { name: Option<String> },

  #[error("mount target {0} is used more than once")]
  DuplicateMount(String),

  #[error("mount target {0} must be an absolute path")]
  RelativeMount(String),

  #[error("operation graph contains a cycle")]
  Cycle,

  #[error("failed to digest operation: {0}")]
  Digest(#[from] HashError),
}
