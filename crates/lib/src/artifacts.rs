//! Local inventory of a package artifact set.
//!
//! An artifact set is a directory with one subdirectory per architecture
//! plus `noarch`, each holding `*.rpm` files. The install script only looks
//! at `noarch` and the worker's own architecture; [`ArtifactSet::installable`]
//! answers the same question ahead of time.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::consts::NOARCH_DIR;
use crate::platform::Arch;

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("artifact directory {0} does not exist")]
  Missing(PathBuf),

  #[error("failed to read artifact directory {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ArchArtifacts {
  pub packages: Vec<String>,
  pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
  pub root: PathBuf,
  /// Keyed by subdirectory name (`x86_64`, `aarch64`, `noarch`, ...).
  pub arches: BTreeMap<String, ArchArtifacts>,
}

impl ArtifactSet {
  /// Inventory the `*.rpm` files directly under each subdirectory of `dir`.
  ///
  /// Stray files at the top level and deeper nesting are ignored, matching
  /// the globs the install script uses.
  pub fn scan(dir: &Path) -> Result<Self, ArtifactError> {
    if !dir.is_dir() {
      return Err(ArtifactError::Missing(dir.to_path_buf()));
    }

    let mut arches: BTreeMap<String, ArchArtifacts> = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(2).sort_by_file_name() {
      let entry = entry.map_err(|e| ArtifactError::Walk {
        path: dir.to_path_buf(),
        source: e.into(),
      })?;

      if entry.depth() == 1 {
        if entry.file_type().is_dir() {
          arches.entry(entry.file_name().to_string_lossy().into_owned()).or_default();
        }
        continue;
      }

      let name = entry.file_name().to_string_lossy().into_owned();
      if !entry.file_type().is_file() || !name.ends_with(".rpm") {
        continue;
      }
      let Some(arch) = entry.path().parent().and_then(Path::file_name) else {
        continue;
      };
      let bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
      let slot = arches.entry(arch.to_string_lossy().into_owned()).or_default();
      slot.packages.push(name);
      slot.bytes += bytes;
    }

    debug!(root = %dir.display(), arches = arches.len(), "scanned artifact set");
    Ok(Self {
      root: dir.to_path_buf(),
      arches,
    })
  }

  /// Packages the install script would pass to the package manager on `arch`.
  pub fn installable(&self, arch: Arch) -> Vec<&str> {
    [NOARCH_DIR, arch.as_str()]
      .iter()
      .filter_map(|dir| self.arches.get(*dir))
      .flat_map(|a| a.packages.iter().map(String::as_str))
      .collect()
  }

  pub fn total_packages(&self) -> usize {
    self.arches.values().map(|a| a.packages.len()).sum()
  }
}
