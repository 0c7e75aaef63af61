//! Deck - one independently playable lane
//!
//! Each deck owns a fixed output strip (gain -> panner -> analyser -> destination) created once,
//! and at most one live source that is rebuilt on every play. The transport state carries the
//! source handle, so a deck cannot be `Playing` without one or hold one while `Stopped`.

use std::fmt;

use crate::clock::PlaybackClock;
use crate::config::MixerConfig;
use crate::decoder::DecodedAudio;
use crate::error::MixerError;
use crate::graph::{AudioGraph, NodeId, NodeKind, Param};
use crate::routing::{self, SignalPath};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeckId {
  A,
  B,
}

impl DeckId {
  /// Addon numbering: 1 is deck A, anything else deck B
  pub fn from_index(deck: u32) -> Self {
    if deck == 1 {
      DeckId::A
    } else {
      DeckId::B
    }
  }
}

impl fmt::Display for DeckId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeckId::A => write!(f, "A"),
      DeckId::B => write!(f, "B"),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
  Stopped,
  Playing,
}

struct LoadedTrack<B> {
  buffer: B,
  duration: f64,
}

enum Transport {
  Stopped,
  Playing {
    source: NodeId,
    clock: PlaybackClock,
    path: SignalPath,
    /// Duration of the buffer the source was bound to
    duration: f64,
  },
}

pub struct Deck<G: AudioGraph> {
  id: DeckId,
  track: Option<LoadedTrack<G::Buffer>>,
  transport: Transport,
  start_offset: f64,
  volume: f32,
  pan: f32,
  boost: bool,
  gain: NodeId,
  panner: NodeId,
  analyser: NodeId,
}

impl<G: AudioGraph> Deck<G> {
  /// Build the deck's output strip and apply the initial volume
  pub fn new(id: DeckId, graph: &mut G, config: &MixerConfig) -> Self {
    let gain = graph.create_node(NodeKind::Gain);
    let panner = graph.create_node(NodeKind::StereoPanner);
    let analyser = graph.create_node(NodeKind::Analyser {
      fft_size: config.analyser_fft_size,
    });
    let destination = graph.destination();

    graph.connect(gain, panner);
    graph.connect(panner, analyser);
    graph.connect(analyser, destination);

    let volume = config.initial_volume.clamp(0.0, 1.0);
    graph.set_param(gain, Param::Gain, volume);

    Self {
      id,
      track: None,
      transport: Transport::Stopped,
      start_offset: 0.0,
      volume,
      pan: 0.0,
      boost: false,
      gain,
      panner,
      analyser,
    }
  }

  /// Replace the loaded buffer. A running source keeps playing the previous one.
  pub fn load(&mut self, graph: &mut G, audio: &DecodedAudio) {
    let buffer = graph.create_buffer(audio);
    let duration = graph.buffer_duration(&buffer);
    log::info!("[Deck {}] Loaded {:.2}s", self.id, duration);
    self.track = Some(LoadedTrack { buffer, duration });
  }

  /// Start playback from `at_offset` at render time `now`
  ///
  /// Stops a running source first. Returns `false`, changing nothing, when no buffer is loaded.
  pub fn play(&mut self, graph: &mut G, at_offset: f64, now: f64) -> bool {
    let Some(track) = self.track.as_ref() else {
      log::debug!("[Deck {}] play ignored: {}", self.id, MixerError::NoBuffer(self.id));
      return false;
    };
    let buffer = track.buffer.clone();
    let duration = track.duration;

    self.stop(graph);

    let offset = self.clamp_offset(at_offset);
    let source = graph.create_source(&buffer);
    let path = routing::repatch(graph, source, self.gain, &SignalPath::Direct, self.boost);
    graph.start_source(source, now, offset);

    self.start_offset = offset;
    self.transport = Transport::Playing {
      source,
      clock: PlaybackClock::new(offset, now),
      path,
      duration,
    };
    log::debug!(
      "[Deck {}] Playing from {:.3}s (boost={})",
      self.id,
      offset,
      self.boost
    );
    true
  }

  /// Halt and release the live source. Returns whether the deck was playing.
  pub fn stop(&mut self, graph: &mut G) -> bool {
    let Transport::Playing { source, path, .. } =
      std::mem::replace(&mut self.transport, Transport::Stopped)
    else {
      return false;
    };

    // The runtime may refuse (source still pending, or already ended); stopping stays a no-op then
    if let Err(e) = graph.halt(source) {
      log::debug!("[Deck {}] {}", self.id, e);
    }
    routing::apply(graph, &routing::plan_teardown(source, &path));
    log::debug!("[Deck {}] Stopped", self.id);
    true
  }

  /// Move the start offset; restart from it when `resume_if_playing` and the deck is playing.
  /// Returns whether playback was restarted.
  pub fn seek(&mut self, graph: &mut G, offset: f64, resume_if_playing: bool, now: f64) -> bool {
    self.start_offset = self.clamp_offset(offset);
    if resume_if_playing && self.is_playing() {
      let offset = self.start_offset;
      return self.play(graph, offset, now);
    }
    false
  }

  /// Position in seconds at render time `now`
  pub fn position(&self, now: f64) -> f64 {
    match &self.transport {
      Transport::Stopped => self.start_offset,
      Transport::Playing {
        clock, duration, ..
      } => clock.position(now, *duration),
    }
  }

  /// Store the user volume; write it to the gain stage when `apply` is set
  pub fn set_volume(&mut self, graph: &mut G, volume: f32, apply: bool) {
    self.volume = if volume.is_nan() {
      0.0
    } else {
      volume.clamp(0.0, 1.0)
    };
    if apply {
      graph.set_param(self.gain, Param::Gain, self.volume);
    }
  }

  /// Put the gain stage back at the user volume, dropping any automation in progress
  pub fn reset_gain(&self, graph: &mut G) {
    graph.set_param(self.gain, Param::Gain, self.volume);
  }

  pub fn ramp_gain(&self, graph: &mut G, target: f32, time_constant: f64) {
    graph.set_param_smoothed(self.gain, Param::Gain, target, time_constant);
  }

  pub fn set_pan(&mut self, graph: &mut G, pan: f32, time_constant: f64) {
    self.pan = pan.clamp(-1.0, 1.0);
    graph.set_param_smoothed(self.panner, Param::Pan, self.pan, time_constant);
  }

  /// Toggle the vocal boost chain. A live source is rewired immediately; a stopped deck picks
  /// the new path up on its next play.
  pub fn set_boost(&mut self, graph: &mut G, enabled: bool) {
    self.boost = enabled;
    if let Transport::Playing { source, path, .. } = &mut self.transport {
      *path = routing::repatch(graph, *source, self.gain, path, enabled);
    }
    log::debug!("[Deck {}] Vocal boost {}", self.id, if enabled { "on" } else { "off" });
  }

  fn clamp_offset(&self, offset: f64) -> f64 {
    let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
    match &self.track {
      Some(track) => offset.min(track.duration),
      None => offset,
    }
  }

  pub fn id(&self) -> DeckId {
    self.id
  }

  pub fn has_buffer(&self) -> bool {
    self.track.is_some()
  }

  /// Loaded buffer length, 0 when empty
  pub fn duration(&self) -> f64 {
    self.track.as_ref().map(|t| t.duration).unwrap_or(0.0)
  }

  pub fn state(&self) -> PlaybackState {
    match self.transport {
      Transport::Stopped => PlaybackState::Stopped,
      Transport::Playing { .. } => PlaybackState::Playing,
    }
  }

  pub fn is_playing(&self) -> bool {
    self.state() == PlaybackState::Playing
  }

  /// Handle of the live source, if any
  pub fn source(&self) -> Option<NodeId> {
    match self.transport {
      Transport::Stopped => None,
      Transport::Playing { source, .. } => Some(source),
    }
  }

  /// Current route between source and gain; `None` while stopped
  pub fn signal_path(&self) -> Option<SignalPath> {
    match self.transport {
      Transport::Stopped => None,
      Transport::Playing { path, .. } => Some(path),
    }
  }

  pub fn start_offset(&self) -> f64 {
    self.start_offset
  }

  /// Render time the current playback began
  pub fn play_started_at(&self) -> Option<f64> {
    match self.transport {
      Transport::Stopped => None,
      Transport::Playing { clock, .. } => Some(clock.started_at()),
    }
  }

  pub fn volume(&self) -> f32 {
    self.volume
  }

  pub fn pan(&self) -> f32 {
    self.pan
  }

  pub fn boost_enabled(&self) -> bool {
    self.boost
  }

  pub fn gain_node(&self) -> NodeId {
    self.gain
  }

  pub fn panner_node(&self) -> NodeId {
    self.panner
  }

  pub fn analyser(&self) -> NodeId {
    self.analyser
  }
}
