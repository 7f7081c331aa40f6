//! Shared utilities.
//!
//! Digests for graph operations, rooted path joining, and test helpers.

pub mod hash;
pub mod path;
pub mod shell;

#[cfg(test)]
pub mod testutil;

/// Error type returned by external collaborators (graph engine, registries, resolvers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
