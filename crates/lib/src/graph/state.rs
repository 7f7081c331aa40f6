use std::sync::Arc;

use tracing::debug;

use crate::image::ImageProvider;
use crate::platform::Platform;

use super::{Constraints, FileAction, GraphError, Mount, Source};

/// A lazily described filesystem.
///
/// A `State` is either scratch (empty) or one output of an operation.
/// Nothing is executed when states are composed; the graph is only turned
/// into something the engine can run by [`Definition::marshal`](super::Definition::marshal).
///
/// States also carry the environment and working directory that exec
/// operations started on them inherit, which image sources fill in from
/// resolved image metadata.
#[derive(Debug, Clone, Default)]
pub struct State {
  output: Option<Output>,
  env: Vec<String>,
  cwd: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Output {
  pub(crate) node: Node,
  pub(crate) index: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
  Source(Arc<SourceOp>),
  File(Arc<FileOp>),
  Exec(Arc<ExecOp>),
}

#[derive(Debug)]
pub(crate) struct SourceOp {
  pub(crate) source: Source,
  pub(crate) constraints: Constraints,
}

#[derive(Debug)]
pub(crate) struct FileOp {
  pub(crate) input: State,
  pub(crate) action: FileAction,
  pub(crate) constraints: Constraints,
}

#[derive(Debug)]
pub(crate) struct ExecOp {
  pub(crate) root: State,
  pub(crate) args: Vec<String>,
  pub(crate) env: Vec<String>,
  pub(crate) cwd: String,
  pub(crate) mounts: Vec<Mount>,
  pub(crate) constraints: Constraints,
}

impl Node {
  /// Identity of the operation; shared by every state that is an output of it.
  pub(crate) fn id(&self) -> usize {
    match self {
      Node::Source(op) => Arc::as_ptr(op) as *const () as usize,
      Node::File(op) => Arc::as_ptr(op) as *const () as usize,
      Node::Exec(op) => Arc::as_ptr(op) as *const () as usize,
    }
  }

  /// States this operation reads from.
  pub(crate) fn inputs(&self) -> Vec<&State> {
    match self {
      Node::Source(_) => Vec::new(),
      Node::File(op) => vec![&op.input],
      Node::Exec(op) => {
        let mut inputs = vec![&op.root];
        for mount in &op.mounts {
          if let super::MountKind::Bind { source, .. } = &mount.kind {
            inputs.push(source);
          }
        }
        inputs
      }
    }
  }
}

impl ExecOp {
  /// Output index of the writable bind mount at `target`.
  ///
  /// The root filesystem is output 0; writable bind mounts follow in the
  /// order they were added.
  pub(crate) fn output_index(&self, target: &str) -> Option<usize> {
    self
      .mounts
      .iter()
      .filter(|m| m.is_writable_bind())
      .position(|m| m.target == target)
      .map(|i| i + 1)
  }
}

impl State {
  /// The empty filesystem.
  pub fn scratch() -> Self {
    Self::default()
  }

  /// An image from a registry, without resolving its metadata.
  pub fn image(reference: impl Into<String>, constraints: Constraints) -> Self {
    Self::source(
      Source::Image {
        reference: reference.into(),
      },
      constraints,
    )
  }

  /// An image from a registry whose metadata is resolved now.
  ///
  /// Exec operations started on the returned state inherit the image's
  /// environment and working directory.
  pub fn image_resolved(
    reference: impl Into<String>,
    resolver: &dyn ImageProvider,
    platform: &Platform,
    constraints: Constraints,
  ) -> Result<Self, GraphError> {
    let reference = reference.into();
    let config = resolver
      .resolve_image_config(&reference, platform)
      .map_err(|source| GraphError::ImageResolution {
        reference: reference.clone(),
        source,
      })?;
    debug!(reference = %reference, platform = %platform, "resolved image metadata");

    let mut state = Self::image(reference, constraints);
    state.env = config.config.env;
    state.cwd = config.config.working_dir;
    Ok(state)
  }

  /// A named local context.
  pub fn local(name: impl Into<String>, constraints: Constraints) -> Self {
    Self::source(Source::Local { name: name.into() }, constraints)
  }

  fn source(source: Source, constraints: Constraints) -> Self {
    Self {
      output: Some(Output {
        node: Node::Source(Arc::new(SourceOp { source, constraints })),
        index: 0,
      }),
      env: Vec::new(),
      cwd: None,
    }
  }

  /// Apply a file action on top of this state.
  pub fn file(&self, action: FileAction, constraints: Constraints) -> Self {
    Self {
      output: Some(Output {
        node: Node::File(Arc::new(FileOp {
          input: self.clone(),
          action,
          constraints,
        })),
        index: 0,
      }),
      env: self.env.clone(),
      cwd: self.cwd.clone(),
    }
  }

  /// Start describing a command run with this state as the root filesystem.
  pub fn run<I, S>(&self, args: I) -> ExecBuilder
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    ExecBuilder {
      root: self.clone(),
      args: args.into_iter().map(Into::into).collect(),
      env: self.env.clone(),
      cwd: self.cwd.clone().unwrap_or_else(|| "/".to_string()),
      mounts: Vec::new(),
      constraints: Constraints::default(),
    }
  }

  pub(crate) fn output(&self) -> Option<&Output> {
    self.output.as_ref()
  }
}

/// Collects the mounts and options of an exec operation.
///
/// Finishing the builder with [`add_mount`](Self::add_mount) or
/// [`root`](Self::root) creates the operation and returns one of its outputs.
#[derive(Debug)]
pub struct ExecBuilder {
  root: State,
  args: Vec<String>,
  env: Vec<String>,
  cwd: String,
  mounts: Vec<Mount>,
  constraints: Constraints,
}

impl ExecBuilder {
  pub fn mount(mut self, mount: Mount) -> Self {
    self.mounts.push(mount);
    self
  }

  pub fn constraints(mut self, constraints: Constraints) -> Self {
    self.constraints = constraints;
    self
  }

  /// Mount `source` writable at `target` and return the mount's contents
  /// after the command has run.
  pub fn add_mount(mut self, target: impl Into<String>, source: State) -> State {
    let target = target.into();
    self.mounts.push(Mount::bind(target.clone(), source));
    let op = self.finish();
    let index = op.output_index(&target).unwrap_or(0);
    Self::output_state(op, index)
  }

  /// The root filesystem after the command has run.
  pub fn root(self) -> State {
    let op = self.finish();
    Self::output_state(op, 0)
  }

  fn finish(self) -> Arc<ExecOp> {
    Arc::new(ExecOp {
      root: self.root,
      args: self.args,
      env: self.env,
      cwd: self.cwd,
      mounts: self.mounts,
      constraints: self.constraints,
    })
  }

  fn output_state(op: Arc<ExecOp>, index: usize) -> State {
    State {
      output: Some(Output {
        node: Node::Exec(op),
        index,
      }),
      env: Vec::new(),
      cwd: None,
    }
  }
}
