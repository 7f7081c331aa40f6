//! pkgimage-lib: Core types and logic for pkgimage
//!
//! This crate turns a package spec into the operation graph that builds its
//! outputs:
//! - `Spec`: the declarative package and image description
//! - `State`/`Definition`: lazily described filesystems and their marshalled graph
//! - `InstallScript`: the package install step, including the distroless cleanup
//! - `Frontend`: routes a requested target to the buildroot, resolve or container path

pub mod artifacts;
pub mod config;
pub mod consts;
pub mod frontend;
pub mod graph;
pub mod image;
pub mod install;
pub mod pipeline;
pub mod platform;
pub mod post_install;
pub mod spec;
pub mod util;
