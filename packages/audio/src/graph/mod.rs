//! Audio graph runtime boundary
//!
//! The mixer decides what topology and which parameter values to apply. Sample-level rendering,
//! filters, compressors and panners live behind [`AudioGraph`]. Two runtimes ship with the crate:
//! - [`web::WebAudioGraph`]: real-time rendering through `web-audio-api`
//! - [`simulated::SimulatedGraph`]: deterministic offline model with a manual clock

pub mod simulated;
pub mod web;

use std::fmt;

use crate::decoder::DecodedAudio;
use crate::error::Result;

/// Opaque handle to a node owned by the runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Biquad response types used by the mixer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
  Highpass,
  Lowpass,
  Peaking,
}

/// Processing nodes the mixer asks the runtime for
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
  Gain,
  StereoPanner,
  Analyser {
    fft_size: usize,
  },
  Filter {
    kind: FilterKind,
    frequency: f32,
    gain_db: f32,
  },
  Compressor {
    threshold_db: f32,
    ratio: f32,
  },
}

/// Automatable control parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
  /// Linear gain of a gain node
  Gain,
  /// Stereo position of a panner, -1 (left) to 1 (right)
  Pan,
  /// Cutoff / center frequency of a filter
  Frequency,
  /// Boost or cut of a peaking filter (dB)
  FilterGain,
  /// Compressor threshold (dB)
  Threshold,
  /// Compressor ratio
  Ratio,
}

/// Capabilities the mixer needs from a rendering runtime
///
/// Writes never block: they take effect immediately or through the runtime's own smoothing.
/// Unknown handles are ignored by implementations.
pub trait AudioGraph {
  /// Runtime-side representation of a loaded track
  type Buffer: Clone;

  /// Monotonic render clock in seconds
  fn current_time(&self) -> f64;

  /// Wake a suspended runtime before playback
  fn resume(&mut self) {}

  fn create_buffer(&mut self, audio: &DecodedAudio) -> Self::Buffer;

  fn buffer_duration(&self, buffer: &Self::Buffer) -> f64;

  fn create_node(&mut self, kind: NodeKind) -> NodeId;

  /// A one-shot playable instance bound to `buffer`
  fn create_source(&mut self, buffer: &Self::Buffer) -> NodeId;

  /// The runtime's output node
  fn destination(&self) -> NodeId;

  fn connect(&mut self, from: NodeId, to: NodeId);

  /// Disconnect every output of `node`
  fn disconnect(&mut self, node: NodeId);

  /// Drop a node that is no longer referenced. Must already be disconnected.
  fn release(&mut self, node: NodeId);

  /// Begin emission at render time `when`, `offset` seconds into the buffer
  fn start_source(&mut self, source: NodeId, when: f64, offset: f64);

  /// Stop a source. Fails with `RuntimeHalt` when the source is not running.
  fn halt(&mut self, source: NodeId) -> Result<()>;

  /// Jump a parameter to `value` now
  fn set_param(&mut self, node: NodeId, param: Param, value: f32);

  /// Approach `target` exponentially from the current value, starting now
  fn set_param_smoothed(&mut self, node: NodeId, param: Param, target: f32, time_constant: f64);

  /// Current effective value of a parameter
  fn param_value(&self, node: NodeId, param: Param) -> f32;

  /// Number of samples an analyser exposes per read
  fn analysis_window(&self, analyser: NodeId) -> usize;

  /// Most recent waveform as unsigned bytes, 128 = silence
  fn time_domain_data(&mut self, analyser: NodeId, out: &mut [u8]);

  /// Most recent magnitude spectrum as bytes
  fn frequency_data(&mut self, analyser: NodeId, out: &mut [u8]);
}
