use serde::{Deserialize, Serialize};

use crate::platform::Platform;

use super::State;

/// Metadata attached to an operation that does not change what it does,
/// only how the engine reports and schedules it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraints {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub platform: Option<Platform>,
  /// Groups related operations in the engine's progress output.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub progress_group: Option<String>,
  /// Display name of the operation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub custom_name: Option<String>,
}

impl Constraints {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_platform(mut self, platform: Platform) -> Self {
    self.platform = Some(platform);
    self
  }

  pub fn with_progress_group(mut self, group: impl Into<String>) -> Self {
    self.progress_group = Some(group.into());
    self
  }

  pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
    self.custom_name = Some(name.into());
    self
  }
}

/// Where a source operation gets its filesystem from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
  /// A container image from a registry.
  Image { reference: String },
  /// A named local context supplied by the caller.
  Local { name: String },
}

impl Source {
  pub fn identifier(&self) -> String {
    match self {
      Source::Image { reference } => format!("docker-image://{}", reference),
      Source::Local { name } => format!("local://{}", name),
    }
  }
}

/// A filesystem mutation applied on top of an input state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileAction {
  /// Create (or replace) a file with the given content and mode.
  Mkfile { path: String, mode: u32, data: String },
}

impl FileAction {
  pub fn mkfile(path: impl Into<String>, mode: u32, data: impl Into<String>) -> Self {
    FileAction::Mkfile {
      path: path.into(),
      mode,
      data: data.into(),
    }
  }
}

/// How concurrent builds may share a cache mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSharing {
  Shared,
  Locked,
}

/// A mount added to an exec operation.
#[derive(Debug, Clone)]
pub struct Mount {
  pub target: String,
  pub kind: MountKind,
}

#[derive(Debug, Clone)]
pub enum MountKind {
  /// Mount the contents of a state, optionally only a subdirectory of it.
  Bind {
    source: State,
    selector: Option<String>,
    readonly: bool,
  },
  /// A persistent cache directory owned by the engine.
  Cache { id: String, sharing: CacheSharing },
}

impl Mount {
  /// A writable mount of `source` at `target`.
  pub fn bind(target: impl Into<String>, source: State) -> Self {
    Self {
      target: target.into(),
      kind: MountKind::Bind {
        source,
        selector: None,
        readonly: false,
      },
    }
  }

  pub fn cache(target: impl Into<String>, id: impl Into<String>, sharing: CacheSharing) -> Self {
    Self {
      target: target.into(),
      kind: MountKind::Cache {
        id: id.into(),
        sharing,
      },
    }
  }

  /// Mount only `path` from the source state.
  pub fn with_selector(mut self, path: impl Into<String>) -> Self {
    if let MountKind::Bind { selector, .. } = &mut self.kind {
      *selector = Some(path.into());
    }
    self
  }

  pub fn readonly(mut self) -> Self {
    if let MountKind::Bind { readonly, .. } = &mut self.kind {
      *readonly = true;
    }
    self
  }

  /// Whether the mount produces an output state.
  pub fn is_writable_bind(&self) -> bool {
    matches!(self.kind, MountKind::Bind { readonly: false, .. })
  }
}
