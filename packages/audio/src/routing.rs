//! Deck signal path and repatching
//!
//! A playing deck routes its source either straight into its gain stage or through a vocal
//! boost chain. A repatch is planned as a plain list of graph operations, then applied.

use crate::graph::{AudioGraph, NodeId};
use crate::vocal_boost::VocalBoostChain;

/// Route from a deck's source to its gain stage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalPath {
  /// source -> gain
  Direct,
  /// source -> hpf -> lpf -> peaking -> compressor -> gain
  Boosted(VocalBoostChain),
}

impl SignalPath {
  pub fn is_boosted(&self) -> bool {
    matches!(self, SignalPath::Boosted(_))
  }

  /// Nodes owned by this path (empty when direct)
  pub fn nodes(&self) -> &[NodeId] {
    match self {
      SignalPath::Direct => &[],
      SignalPath::Boosted(chain) => chain.stages(),
    }
  }
}

/// One graph mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOp {
  /// Disconnect every output of a node
  Disconnect(NodeId),
  Connect(NodeId, NodeId),
  /// Disconnect a node and drop it
  Discard(NodeId),
}

/// Operations that move a live `source` from `current` to `next`
///
/// The source is always unplugged first and the old chain discarded, so the result is exactly one
/// path into `gain` regardless of what was there before.
pub fn plan_repatch(
  source: NodeId,
  gain: NodeId,
  current: &SignalPath,
  next: &SignalPath,
) -> Vec<PatchOp> {
  let mut ops = vec![PatchOp::Disconnect(source)];
  ops.extend(current.nodes().iter().map(|&node| PatchOp::Discard(node)));

  match next {
    SignalPath::Direct => ops.push(PatchOp::Connect(source, gain)),
    SignalPath::Boosted(chain) => {
      let mut upstream = source;
      for &stage in chain.stages() {
        ops.push(PatchOp::Connect(upstream, stage));
        upstream = stage;
      }
      ops.push(PatchOp::Connect(upstream, gain));
    }
  }
  ops
}

/// Operations that tear a path down entirely, source included
pub fn plan_teardown(source: NodeId, current: &SignalPath) -> Vec<PatchOp> {
  let mut ops = vec![PatchOp::Discard(source)];
  ops.extend(current.nodes().iter().map(|&node| PatchOp::Discard(node)));
  ops
}

pub fn apply<G: AudioGraph>(graph: &mut G, ops: &[PatchOp]) {
  for op in ops {
    match *op {
      PatchOp::Disconnect(node) => graph.disconnect(node),
      PatchOp::Connect(from, to) => graph.connect(from, to),
      PatchOp::Discard(node) => {
        graph.disconnect(node);
        graph.release(node);
      }
    }
  }
}

/// Build the path a deck with `boost` should use and wire `source` through it
pub fn repatch<G: AudioGraph>(
  graph: &mut G,
  source: NodeId,
  gain: NodeId,
  current: &SignalPath,
  boost: bool,
) -> SignalPath {
  let next = if boost {
    SignalPath::Boosted(VocalBoostChain::build(graph))
  } else {
    SignalPath::Direct
  };
  apply(graph, &plan_repatch(source, gain, current, &next));
  next
}
