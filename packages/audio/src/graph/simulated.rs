//! Deterministic offline runtime
//!
//! Models topology, source lifecycles and parameter automation without rendering audio. Time only
//! moves when the host calls [`SimulatedGraph::advance`], which makes ramps and clocks exactly
//! reproducible. Analyser input is injected with [`SimulatedGraph::set_level`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use super::{AudioGraph, NodeId, NodeKind, Param};
use crate::decoder::DecodedAudio;
use crate::error::{MixerError, Result};

/// Automation state of one parameter
#[derive(Clone, Copy, Debug)]
struct SimParam {
  /// Value at `anchor`
  base: f32,
  anchor: f64,
  /// Exponential approach target and time constant
  target: Option<(f32, f64)>,
}

impl SimParam {
  fn fixed(value: f32) -> Self {
    Self {
      base: value,
      anchor: 0.0,
      target: None,
    }
  }

  fn value_at(&self, now: f64) -> f32 {
    match self.target {
      Some((target, tc)) if tc > 0.0 => {
        let elapsed = (now - self.anchor).max(0.0);
        let decay = (-elapsed / tc).exp() as f32;
        target + (self.base - target) * decay
      }
      Some((target, _)) => target,
      None => self.base,
    }
  }
}

/// Lifecycle of a playable source
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceState {
  /// `(when, offset)` of the start request
  pub started: Option<(f64, f64)>,
  pub halted: bool,
  pub buffer_duration: f64,
}

/// What a simulated node stands for
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimKind {
  Destination,
  Source,
  Processor(NodeKind),
}

struct SimNode {
  kind: SimKind,
  outputs: BTreeSet<NodeId>,
  params: HashMap<Param, SimParam>,
  source: Option<SourceState>,
  window: Vec<u8>,
}

impl SimNode {
  fn new(kind: SimKind) -> Self {
    let mut params = HashMap::new();
    let mut window = Vec::new();
    match kind {
      SimKind::Processor(NodeKind::Gain) => {
        params.insert(Param::Gain, SimParam::fixed(1.0));
      }
      SimKind::Processor(NodeKind::StereoPanner) => {
        params.insert(Param::Pan, SimParam::fixed(0.0));
      }
      SimKind::Processor(NodeKind::Analyser { fft_size }) => {
        window = vec![128; fft_size];
      }
      SimKind::Processor(NodeKind::Filter {
        frequency, gain_db, ..
      }) => {
        params.insert(Param::Frequency, SimParam::fixed(frequency));
        params.insert(Param::FilterGain, SimParam::fixed(gain_db));
      }
      SimKind::Processor(NodeKind::Compressor {
        threshold_db,
        ratio,
      }) => {
        params.insert(Param::Threshold, SimParam::fixed(threshold_db));
        params.insert(Param::Ratio, SimParam::fixed(ratio));
      }
      SimKind::Destination | SimKind::Source => {}
    }
    Self {
      kind,
      outputs: BTreeSet::new(),
      params,
      source: None,
      window,
    }
  }
}

pub struct SimulatedGraph {
  now: f64,
  next_id: u64,
  nodes: BTreeMap<NodeId, SimNode>,
  destination: NodeId,
  reject_halts: bool,
  resumed: usize,
}

impl Default for SimulatedGraph {
  fn default() -> Self {
    Self::new()
  }
}

impl SimulatedGraph {
  pub fn new() -> Self {
    let destination = NodeId(0);
    let mut nodes = BTreeMap::new();
    nodes.insert(destination, SimNode::new(SimKind::Destination));
    Self {
      now: 0.0,
      next_id: 1,
      nodes,
      destination,
      reject_halts: false,
      resumed: 0,
    }
  }

  fn insert(&mut self, node: SimNode) -> NodeId {
    let id = NodeId(self.next_id);
    self.next_id += 1;
    self.nodes.insert(id, node);
    id
  }

  /// Move the render clock forward
  pub fn advance(&mut self, seconds: f64) {
    self.now += seconds.max(0.0);
  }

  pub fn set_time(&mut self, seconds: f64) {
    self.now = seconds.max(self.now);
  }

  /// Make every subsequent halt fail, as a runtime would for a source still pending start
  pub fn reject_halts(&mut self, reject: bool) {
    self.reject_halts = reject;
  }

  /// Feed an analyser a square wave whose RMS equals `amplitude`
  pub fn set_level(&mut self, analyser: NodeId, amplitude: f32) {
    let Some(node) = self.nodes.get_mut(&analyser) else {
      log::warn!("sim: set_level on unknown node {}", analyser);
      return;
    };
    let delta = (amplitude.clamp(0.0, 1.0) * 128.0).round().min(127.0) as u8;
    for (i, byte) in node.window.iter_mut().enumerate() {
      *byte = if i % 2 == 0 { 128 + delta } else { 128 - delta };
    }
  }

  pub fn outputs(&self, node: NodeId) -> Vec<NodeId> {
    self
      .nodes
      .get(&node)
      .map(|n| n.outputs.iter().copied().collect())
      .unwrap_or_default()
  }

  pub fn inputs(&self, node: NodeId) -> Vec<NodeId> {
    self
      .nodes
      .iter()
      .filter(|(_, n)| n.outputs.contains(&node))
      .map(|(id, _)| *id)
      .collect()
  }

  pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
    self
      .nodes
      .get(&from)
      .is_some_and(|n| n.outputs.contains(&to))
  }

  /// Nodes currently alive, destination included
  pub fn live_nodes(&self) -> usize {
    self.nodes.len()
  }

  pub fn contains(&self, node: NodeId) -> bool {
    self.nodes.contains_key(&node)
  }

  pub fn kind(&self, node: NodeId) -> Option<SimKind> {
    self.nodes.get(&node).map(|n| n.kind)
  }

  pub fn source_state(&self, source: NodeId) -> Option<SourceState> {
    self.nodes.get(&source).and_then(|n| n.source)
  }

  /// How many times playback asked the runtime to wake up
  pub fn resume_count(&self) -> usize {
    self.resumed
  }

  /// Follow single-output links from `start` until a node with no or several outputs
  pub fn chain_from(&self, start: NodeId) -> Vec<NodeId> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(node) = self.nodes.get(&current) {
      if node.outputs.len() != 1 || chain.len() > self.nodes.len() {
        break;
      }
      current = *node.outputs.iter().next().unwrap_or(&current);
      chain.push(current);
    }
    chain
  }
}

impl AudioGraph for SimulatedGraph {
  type Buffer = Arc<DecodedAudio>;

  fn current_time(&self) -> f64 {
    self.now
  }

  fn resume(&mut self) {
    self.resumed += 1;
  }

  fn create_buffer(&mut self, audio: &DecodedAudio) -> Self::Buffer {
    Arc::new(audio.clone())
  }

  fn buffer_duration(&self, buffer: &Self::Buffer) -> f64 {
    buffer.duration()
  }

  fn create_node(&mut self, kind: NodeKind) -> NodeId {
    self.insert(SimNode::new(SimKind::Processor(kind)))
  }

  fn create_source(&mut self, buffer: &Self::Buffer) -> NodeId {
    let mut node = SimNode::new(SimKind::Source);
    node.source = Some(SourceState {
      started: None,
      halted: false,
      buffer_duration: buffer.duration(),
    });
    self.insert(node)
  }

  fn destination(&self) -> NodeId {
    self.destination
  }

  fn connect(&mut self, from: NodeId, to: NodeId) {
    if !self.nodes.contains_key(&to) {
      log::warn!("sim: connect to unknown node {}", to);
      return;
    }
    match self.nodes.get_mut(&from) {
      Some(node) => {
        node.outputs.insert(to);
      }
      None => log::warn!("sim: connect from unknown node {}", from),
    }
  }

  fn disconnect(&mut self, node: NodeId) {
    if let Some(node) = self.nodes.get_mut(&node) {
      node.outputs.clear();
    }
  }

  fn release(&mut self, node: NodeId) {
    if node == self.destination {
      return;
    }
    if let Some(removed) = self.nodes.remove(&node) {
      if !removed.outputs.is_empty() {
        log::warn!("sim: released {} while still connected", node);
      }
      for other in self.nodes.values_mut() {
        other.outputs.remove(&node);
      }
    }
  }

  fn start_source(&mut self, source: NodeId, when: f64, offset: f64) {
    match self.nodes.get_mut(&source).and_then(|n| n.source.as_mut()) {
      Some(state) => state.started = Some((when, offset)),
      None => log::warn!("sim: start on non-source {}", source),
    }
  }

  fn halt(&mut self, source: NodeId) -> Result<()> {
    if self.reject_halts {
      return Err(MixerError::RuntimeHalt(format!("halt of {} rejected", source)));
    }
    let state = self
      .nodes
      .get_mut(&source)
      .and_then(|n| n.source.as_mut())
      .ok_or_else(|| MixerError::RuntimeHalt(format!("{} is not a source", source)))?;
    if state.started.is_none() {
      return Err(MixerError::RuntimeHalt(format!("{} was never started", source)));
    }
    if state.halted {
      return Err(MixerError::RuntimeHalt(format!("{} already halted", source)));
    }
    state.halted = true;
    Ok(())
  }

  fn set_param(&mut self, node: NodeId, param: Param, value: f32) {
    let now = self.now;
    if let Some(p) = self.nodes.get_mut(&node).and_then(|n| n.params.get_mut(&param)) {
      *p = SimParam {
        base: value,
        anchor: now,
        target: None,
      };
    }
  }

  fn set_param_smoothed(&mut self, node: NodeId, param: Param, target: f32, time_constant: f64) {
    let now = self.now;
    if let Some(p) = self.nodes.get_mut(&node).and_then(|n| n.params.get_mut(&param)) {
      let current = p.value_at(now);
      *p = SimParam {
        base: current,
        anchor: now,
        target: Some((target, time_constant)),
      };
    }
  }

  fn param_value(&self, node: NodeId, param: Param) -> f32 {
    self
      .nodes
      .get(&node)
      .and_then(|n| n.params.get(&param))
      .map(|p| p.value_at(self.now))
      .unwrap_or(0.0)
  }

  fn analysis_window(&self, analyser: NodeId) -> usize {
    self.nodes.get(&analyser).map(|n| n.window.len()).unwrap_or(0)
  }

  fn time_domain_data(&mut self, analyser: NodeId, out: &mut [u8]) {
    match self.nodes.get(&analyser) {
      Some(node) => {
        let len = out.len().min(node.window.len());
        out[..len].copy_from_slice(&node.window[..len]);
        out[len..].fill(128);
      }
      None => out.fill(128),
    }
  }

  fn frequency_data(&mut self, analyser: NodeId, out: &mut [u8]) {
    // Flat spectrum proportional to the injected level
    let level = self
      .nodes
      .get(&analyser)
      .and_then(|n| n.window.first())
      .map(|b| b.abs_diff(128) as u16 * 2)
      .unwrap_or(0)
      .min(255) as u8;
    out.fill(level);
  }
}
