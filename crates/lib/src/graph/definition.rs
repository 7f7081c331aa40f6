use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::hash::{Digest, Hashable};

use super::state::{ExecOp, Node, Output};
use super::{CacheSharing, Constraints, FileAction, GraphError, MountKind, State};

/// A marshalled operation graph, ready to be submitted to the engine.
///
/// Operations are listed in dependency order: every operation appears after
/// all of the operations it reads from. Identical operations are listed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
  pub ops: Vec<OpEntry>,
  /// The output that is the result of the graph. `None` for scratch.
  pub output: Option<InputRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpEntry {
  pub digest: Digest,
  pub inputs: Vec<InputRef>,
  pub op: Op,
  #[serde(default)]
  pub constraints: Constraints,
}

/// Reference to one output of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputRef {
  pub digest: Digest,
  pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
  Source {
    identifier: String,
  },
  File {
    /// Index into the entry's inputs; `None` means scratch.
    input: Option<usize>,
    action: FileAction,
  },
  Exec {
    meta: ExecMeta,
    mounts: Vec<MountEntry>,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecMeta {
  pub args: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub env: Vec<String>,
  pub cwd: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountEntry {
  /// Index into the entry's inputs; `None` means scratch or cache.
  pub input: Option<usize>,
  pub dest: String,
  /// Output index produced by this mount, if it is writable.
  pub output: Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selector: Option<String>,
  #[serde(default)]
  pub readonly: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cache: Option<CacheOpt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOpt {
  pub id: String,
  pub sharing: CacheSharing,
}

/// The digested part of an entry.
#[derive(Serialize)]
struct EntryContent<'a> {
  inputs: &'a [InputRef],
  op: &'a Op,
  constraints: &'a Constraints,
}

impl Hashable for EntryContent<'_> {}
impl Hashable for Definition {}

impl Definition {
  /// Flatten the graph reachable from `state` into a definition.
  pub fn marshal(state: &State) -> Result<Self, GraphError> {
    let Some(root) = state.output() else {
      return Ok(Self {
        ops: Vec::new(),
        output: None,
      });
    };

    let mut graph: DiGraph<Node, ()> = DiGraph::new();
    let mut indices: HashMap<usize, NodeIndex> = HashMap::new();
    add_node(&root.node, &mut graph, &mut indices);

    let order = toposort(&graph, None).map_err(|_| GraphError::Cycle)?;

    let mut digests: HashMap<usize, Digest> = HashMap::new();
    let mut seen: HashSet<Digest> = HashSet::new();
    let mut ops = Vec::with_capacity(order.len());

    for idx in order {
      let node = &graph[idx];
      let entry = to_entry(node, &digests)?;
      digests.insert(node.id(), entry.digest.clone());
      if seen.insert(entry.digest.clone()) {
        ops.push(entry);
      }
    }

    let output = input_ref(root, &digests);
    debug!(ops = ops.len(), "marshalled definition");
    Ok(Self { ops, output })
  }

  /// The entry with `digest`.
  pub fn get(&self, digest: &Digest) -> Option<&OpEntry> {
    self.ops.iter().find(|e| &e.digest == digest)
  }

  /// Position of the first entry whose custom name is `name`.
  pub fn position_by_name(&self, name: &str) -> Option<usize> {
    self
      .ops
      .iter()
      .position(|e| e.constraints.custom_name.as_deref() == Some(name))
  }

  /// All exec entries, in dependency order.
  pub fn execs(&self) -> impl Iterator<Item = &OpEntry> {
    self.ops.iter().filter(|e| matches!(e.op, Op::Exec { .. }))
  }

  /// All source identifiers, in dependency order.
  pub fn sources(&self) -> impl Iterator<Item = &str> {
    self.ops.iter().filter_map(|e| match &e.op {
      Op::Source { identifier } => Some(identifier.as_str()),
      _ => None,
    })
  }
}

impl OpEntry {
  /// The mount at `dest`, if this is an exec entry.
  pub fn mount(&self, dest: &str) -> Option<&MountEntry> {
    match &self.op {
      Op::Exec { mounts, .. } => mounts.iter().find(|m| m.dest == dest),
      _ => None,
    }
  }

  pub fn args(&self) -> Option<&[String]> {
    match &self.op {
      Op::Exec { meta, .. } => Some(&meta.args),
      _ => None,
    }
  }

  /// The input feeding the mount at `dest`.
  pub fn mount_input(&self, dest: &str) -> Option<&InputRef> {
    let input = self.mount(dest)?.input?;
    self.inputs.get(input)
  }
}

fn add_node(node: &Node, graph: &mut DiGraph<Node, ()>, indices: &mut HashMap<usize, NodeIndex>) -> NodeIndex {
  if let Some(&idx) = indices.get(&node.id()) {
    return idx;
  }
  let idx = graph.add_node(node.clone());
  indices.insert(node.id(), idx);

  for input in node.inputs() {
    if let Some(output) = input.output() {
      let dep = add_node(&output.node, graph, indices);
      graph.update_edge(dep, idx, ());
    }
  }
  idx
}

fn input_ref(output: &Output, digests: &HashMap<usize, Digest>) -> Option<InputRef> {
  digests.get(&output.node.id()).map(|digest| InputRef {
    digest: digest.clone(),
    index: output.index,
  })
}

/// Register `state` as an input, reusing an identical earlier input.
fn push_input(state: &State, inputs: &mut Vec<InputRef>, digests: &HashMap<usize, Digest>) -> Option<usize> {
  let input = input_ref(state.output()?, digests)?;
  match inputs.iter().position(|i| i == &input) {
    Some(pos) => Some(pos),
    None => {
      inputs.push(input);
      Some(inputs.len() - 1)
    }
  }
}

fn to_entry(node: &Node, digests: &HashMap<usize, Digest>) -> Result<OpEntry, GraphError> {
  let mut inputs = Vec::new();
  let (op, constraints) = match node {
    Node::Source(op) => (
      Op::Source {
        identifier: op.source.identifier(),
      },
      op.constraints.clone(),
    ),
    Node::File(op) => {
      let input = push_input(&op.input, &mut inputs, digests);
      (
        Op::File {
          input,
          action: op.action.clone(),
        },
        op.constraints.clone(),
      )
    }
    Node::Exec(op) => (exec_op(op, &mut inputs, digests)?, op.constraints.clone()),
  };

  let digest = EntryContent {
    inputs: &inputs,
    op: &op,
    constraints: &constraints,
  }
  .compute_digest()?;

  Ok(OpEntry {
    digest,
    inputs,
    op,
    constraints,
  })
}

fn exec_op(op: &ExecOp, inputs: &mut Vec<InputRef>, digests: &HashMap<usize, Digest>) -> Result<Op, GraphError> {
  if op.args.is_empty() {
    return Err(GraphError::EmptyArgs {
      name: op.constraints.custom_name.clone(),
    });
  }

  let mut mounts = vec![MountEntry {
    input: push_input(&op.root, inputs, digests),
    dest: "/".to_string(),
    output: Some(0),
    selector: None,
    readonly: false,
    cache: None,
  }];

  let mut next_output = 1;
  for mount in &op.mounts {
    if !mount.target.starts_with('/') {
      return Err(GraphError::RelativeMount(mount.target.clone()));
    }
    if mounts.iter().any(|m| m.dest == mount.target) {
      return Err(GraphError::DuplicateMount(mount.target.clone()));
    }

    let entry = match &mount.kind {
      MountKind::Bind {
        source,
        selector,
        readonly,
      } => {
        let output = if *readonly {
          None
        } else {
          next_output += 1;
          Some(next_output - 1)
        };
        MountEntry {
          input: push_input(source, inputs, digests),
          dest: mount.target.clone(),
          output,
          selector: selector.clone(),
          readonly: *readonly,
          cache: None,
        }
      }
      MountKind::Cache { id, sharing } => MountEntry {
        input: None,
        dest: mount.target.clone(),
        output: None,
        selector: None,
        readonly: false,
        cache: Some(CacheOpt {
          id: id.clone(),
          sharing: *sharing,
        }),
      },
    };
    mounts.push(entry);
  }

  // Parents must be mounted before the mounts nested inside them.
  mounts.sort_by_key(|m| m.dest.split('/').filter(|c| !c.is_empty()).count());

  Ok(Op::Exec {
    meta: ExecMeta {
      args: op.args.clone(),
      env: op.env.clone(),
      cwd: op.cwd.clone(),
    },
    mounts,
  })
}
