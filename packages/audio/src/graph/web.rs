//! Real-time runtime backed by `web-audio-api`
//!
//! Nodes live in a slab keyed by [`NodeId`]. Source lifecycles are tracked here because the
//! runtime panics on stop-before-start and double stop, where the mixer expects a recoverable
//! `RuntimeHalt`.

use std::collections::HashMap;

use web_audio_api::context::{
  AudioContext, AudioContextOptions, AudioContextState, BaseAudioContext,
};
use web_audio_api::node::{
  AnalyserNode, AudioBufferSourceNode, AudioDestinationNode, AudioNode, AudioScheduledSourceNode,
  BiquadFilterNode, BiquadFilterType, DynamicsCompressorNode, GainNode, StereoPannerNode,
};
use web_audio_api::{AudioBuffer, AudioParam};

use super::{AudioGraph, FilterKind, NodeId, NodeKind, Param};
use crate::config::MixerConfig;
use crate::decoder::DecodedAudio;
use crate::error::{MixerError, Result};

#[derive(Clone, Copy, PartialEq)]
enum SourcePhase {
  Idle,
  Started,
  Halted,
}

enum WebNode {
  Destination(AudioDestinationNode),
  Gain(GainNode),
  Panner(StereoPannerNode),
  Analyser(AnalyserNode),
  Filter(BiquadFilterNode),
  Compressor(DynamicsCompressorNode),
  Source(AudioBufferSourceNode, SourcePhase),
}

impl WebNode {
  fn as_node(&self) -> &dyn AudioNode {
    match self {
      WebNode::Destination(n) => n,
      WebNode::Gain(n) => n,
      WebNode::Panner(n) => n,
      WebNode::Analyser(n) => n,
      WebNode::Filter(n) => n,
      WebNode::Compressor(n) => n,
      WebNode::Source(n, _) => n,
    }
  }

  fn param(&self, param: Param) -> Option<&AudioParam> {
    match (self, param) {
      (WebNode::Gain(n), Param::Gain) => Some(n.gain()),
      (WebNode::Panner(n), Param::Pan) => Some(n.pan()),
      (WebNode::Filter(n), Param::Frequency) => Some(n.frequency()),
      (WebNode::Filter(n), Param::FilterGain) => Some(n.gain()),
      (WebNode::Compressor(n), Param::Threshold) => Some(n.threshold()),
      (WebNode::Compressor(n), Param::Ratio) => Some(n.ratio()),
      _ => None,
    }
  }
}

pub struct WebAudioGraph {
  context: AudioContext,
  nodes: HashMap<NodeId, WebNode>,
  next_id: u64,
  destination: NodeId,
}

impl WebAudioGraph {
  /// Open an audio context on the configured output sink
  pub fn new(config: &MixerConfig) -> Self {
    let options = AudioContextOptions {
      sink_id: config.output_sink.clone().unwrap_or_default(),
      ..AudioContextOptions::default()
    };
    let context = AudioContext::new(options);
    log::info!(
      "[WebAudioGraph] Context open: sample_rate={}, sink={:?}",
      context.sample_rate(),
      config.output_sink
    );

    let destination = NodeId(0);
    let mut nodes = HashMap::new();
    nodes.insert(destination, WebNode::Destination(context.destination()));

    Self {
      context,
      nodes,
      next_id: 1,
      destination,
    }
  }

  fn insert(&mut self, node: WebNode) -> NodeId {
    let id = NodeId(self.next_id);
    self.next_id += 1;
    self.nodes.insert(id, node);
    id
  }

  fn with_param(&self, node: NodeId, param: Param, apply: impl FnOnce(&AudioParam)) {
    match self.nodes.get(&node).and_then(|n| n.param(param)) {
      Some(p) => apply(p),
      None => log::warn!("[WebAudioGraph] {:?} not available on {}", param, node),
    }
  }
}

fn biquad_type(kind: FilterKind) -> BiquadFilterType {
  match kind {
    FilterKind::Highpass => BiquadFilterType::Highpass,
    FilterKind::Lowpass => BiquadFilterType::Lowpass,
    FilterKind::Peaking => BiquadFilterType::Peaking,
  }
}

impl AudioGraph for WebAudioGraph {
  type Buffer = AudioBuffer;

  fn current_time(&self) -> f64 {
    self.context.current_time()
  }

  fn resume(&mut self) {
    if self.context.state() == AudioContextState::Suspended {
      log::info!("[WebAudioGraph] Resuming suspended context");
      self.context.resume_sync();
    }
  }

  fn create_buffer(&mut self, audio: &DecodedAudio) -> Self::Buffer {
    let channels = (0..audio.channels).map(|ch| audio.channel(ch)).collect();
    AudioBuffer::from(channels, audio.sample_rate as f32)
  }

  fn buffer_duration(&self, buffer: &Self::Buffer) -> f64 {
    buffer.duration()
  }

  fn create_node(&mut self, kind: NodeKind) -> NodeId {
    let node = match kind {
      NodeKind::Gain => WebNode::Gain(self.context.create_gain()),
      NodeKind::StereoPanner => WebNode::Panner(self.context.create_stereo_panner()),
      NodeKind::Analyser { fft_size } => {
        let mut analyser = self.context.create_analyser();
        analyser.set_fft_size(fft_size);
        WebNode::Analyser(analyser)
      }
      NodeKind::Filter {
        kind,
        frequency,
        gain_db,
      } => {
        let mut filter = self.context.create_biquad_filter();
        filter.set_type(biquad_type(kind));
        filter.frequency().set_value(frequency);
        filter.gain().set_value(gain_db);
        WebNode::Filter(filter)
      }
      NodeKind::Compressor {
        threshold_db,
        ratio,
      } => {
        let compressor = self.context.create_dynamics_compressor();
        compressor.threshold().set_value(threshold_db);
        compressor.ratio().set_value(ratio);
        WebNode::Compressor(compressor)
      }
    };
    self.insert(node)
  }

  fn create_source(&mut self, buffer: &Self::Buffer) -> NodeId {
    let mut source = self.context.create_buffer_source();
    source.set_buffer(buffer.clone());
    self.insert(WebNode::Source(source, SourcePhase::Idle))
  }

  fn destination(&self) -> NodeId {
    self.destination
  }

  fn connect(&mut self, from: NodeId, to: NodeId) {
    match (self.nodes.get(&from), self.nodes.get(&to)) {
      (Some(src), Some(dest)) => {
        src.as_node().connect(dest.as_node());
      }
      _ => log::warn!("[WebAudioGraph] connect {} -> {}: unknown node", from, to),
    }
  }

  fn disconnect(&mut self, node: NodeId) {
    if let Some(n) = self.nodes.get(&node) {
      n.as_node().disconnect();
    }
  }

  fn release(&mut self, node: NodeId) {
    if node != self.destination {
      self.nodes.remove(&node);
    }
  }

  fn start_source(&mut self, source: NodeId, when: f64, offset: f64) {
    match self.nodes.get_mut(&source) {
      Some(WebNode::Source(node, phase)) if *phase == SourcePhase::Idle => {
        node.start_at_with_offset(when, offset);
        *phase = SourcePhase::Started;
      }
      _ => log::warn!("[WebAudioGraph] {} is not a startable source", source),
    }
  }

  fn halt(&mut self, source: NodeId) -> Result<()> {
    match self.nodes.get_mut(&source) {
      Some(WebNode::Source(node, phase)) => match *phase {
        SourcePhase::Started => {
          node.stop();
          *phase = SourcePhase::Halted;
          Ok(())
        }
        SourcePhase::Idle => Err(MixerError::RuntimeHalt(format!("{} was never started", source))),
        SourcePhase::Halted => Err(MixerError::RuntimeHalt(format!("{} already halted", source))),
      },
      _ => Err(MixerError::RuntimeHalt(format!("{} is not a source", source))),
    }
  }

  fn set_param(&mut self, node: NodeId, param: Param, value: f32) {
    let now = self.context.current_time();
    self.with_param(node, param, |p| {
      p.set_value_at_time(value, now);
    });
  }

  fn set_param_smoothed(&mut self, node: NodeId, param: Param, target: f32, time_constant: f64) {
    let now = self.context.current_time();
    self.with_param(node, param, |p| {
      p.set_target_at_time(target, now, time_constant);
    });
  }

  fn param_value(&self, node: NodeId, param: Param) -> f32 {
    self
      .nodes
      .get(&node)
      .and_then(|n| n.param(param))
      .map(|p| p.value())
      .unwrap_or(0.0)
  }

  fn analysis_window(&self, analyser: NodeId) -> usize {
    match self.nodes.get(&analyser) {
      Some(WebNode::Analyser(node)) => node.fft_size(),
      _ => 0,
    }
  }

  fn time_domain_data(&mut self, analyser: NodeId, out: &mut [u8]) {
    match self.nodes.get_mut(&analyser) {
      Some(WebNode::Analyser(node)) => node.get_byte_time_domain_data(out),
      _ => out.fill(128),
    }
  }

  fn frequency_data(&mut self, analyser: NodeId, out: &mut [u8]) {
    match self.nodes.get_mut(&analyser) {
      Some(WebNode::Analyser(node)) => node.get_byte_frequency_data(out),
      _ => out.fill(0),
    }
  }
}
