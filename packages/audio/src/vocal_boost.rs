//! Vocal boost chain
//!
//! Four stages that pull the vocal range forward:
//! - HPF at 400 Hz (strips bass and kick)
//! - LPF at 8 kHz (strips cymbals and hiss)
//! - Peaking +18 dB at 3 kHz (presence)
//! - Compressor, -30 dB threshold, 12:1 (evens out the result)

use crate::graph::{AudioGraph, FilterKind, NodeId, NodeKind};

const HIGHPASS_FREQ: f32 = 400.0;
const LOWPASS_FREQ: f32 = 8000.0;
const PRESENCE_FREQ: f32 = 3000.0;
const PRESENCE_GAIN_DB: f32 = 18.0;
const COMPRESSOR_THRESHOLD_DB: f32 = -30.0;
const COMPRESSOR_RATIO: f32 = 12.0;

/// Stage definitions in signal order
pub const STAGES: [NodeKind; 4] = [
  NodeKind::Filter {
    kind: FilterKind::Highpass,
    frequency: HIGHPASS_FREQ,
    gain_db: 0.0,
  },
  NodeKind::Filter {
    kind: FilterKind::Lowpass,
    frequency: LOWPASS_FREQ,
    gain_db: 0.0,
  },
  NodeKind::Filter {
    kind: FilterKind::Peaking,
    frequency: PRESENCE_FREQ,
    gain_db: PRESENCE_GAIN_DB,
  },
  NodeKind::Compressor {
    threshold_db: COMPRESSOR_THRESHOLD_DB,
    ratio: COMPRESSOR_RATIO,
  },
];

/// A built, not yet wired, boost chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VocalBoostChain {
  stages: [NodeId; 4],
}

impl VocalBoostChain {
  /// Create fresh stage nodes. Connecting them is the caller's job.
  pub fn build<G: AudioGraph>(graph: &mut G) -> Self {
    Self {
      stages: STAGES.map(|kind| graph.create_node(kind)),
    }
  }

  pub fn stages(&self) -> &[NodeId; 4] {
    &self.stages
  }

  pub fn input(&self) -> NodeId {
    self.stages[0]
  }

  pub fn output(&self) -> NodeId {
    self.stages[3]
  }
}
