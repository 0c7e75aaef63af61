//! Audio Engine - two-deck mixer with side-chain ducking
//!
//! This module provides the mixer façade that handles:
//! - Dual deck playback with independent positions
//! - Per-deck volume and vocal boost chain
//! - Stereo split (A hard left, B hard right) with smoothed panning
//! - Automatic ducking of deck B while deck A carries signal
//!
//! All commands are synchronous and never block on the runtime. [`MixingEngine::tick`] is the
//! per-tick update driven by the scheduler in [`crate::session`].

use crate::config::MixerConfig;
use crate::deck::{Deck, DeckId};
use crate::decoder::{DecodedAudio, Decoder, SymphoniaDecoder};
use crate::ducking::{DuckingMonitor, TickOutcome};
use crate::error::Result;
use crate::graph::{AudioGraph, NodeId, Param};

/// Per-deck part of a state report
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeckSnapshot {
  pub position: f64,
  pub duration: f64,
  pub playing: bool,
  pub has_buffer: bool,
  /// User-set volume
  pub volume: f32,
  /// Gain actually applied right now (differs from `volume` while ducked)
  pub effective_gain: f32,
  pub boost: bool,
  pub pan: f32,
}

/// State report emitted once per tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSnapshot {
  pub time: f64,
  pub deck_a: DeckSnapshot,
  pub deck_b: DeckSnapshot,
  pub ducked: bool,
  pub ducking_enabled: bool,
  pub stereo_split_enabled: bool,
  pub monitor_active: bool,
}

pub struct MixingEngine<G: AudioGraph> {
  graph: G,
  config: MixerConfig,
  deck_a: Deck<G>,
  deck_b: Deck<G>,
  monitor: DuckingMonitor,
  ducking_enabled: bool,
  stereo_split_enabled: bool,
  decoder: Box<dyn Decoder>,
}

impl<G: AudioGraph> MixingEngine<G> {
  /// Build both decks on `graph` and apply the configured global settings
  ///
  /// Out-of-range config fields are replaced by their defaults first.
  pub fn new(mut graph: G, mut config: MixerConfig) -> Self {
    config.sanitize();
    let deck_a = Deck::new(DeckId::A, &mut graph, &config);
    let deck_b = Deck::new(DeckId::B, &mut graph, &config);
    let monitor = DuckingMonitor::new(&config);

    let mut engine = Self {
      graph,
      deck_a,
      deck_b,
      monitor,
      ducking_enabled: config.ducking_enabled,
      stereo_split_enabled: false,
      decoder: Box::new(SymphoniaDecoder::default()),
      config,
    };
    if engine.config.stereo_split_enabled {
      engine.set_stereo_split(true);
    }
    log::info!(
      "[MixingEngine] Ready: ducking={}, stereo_split={}",
      engine.ducking_enabled,
      engine.stereo_split_enabled
    );
    engine
  }

  /// Swap the decoder used by [`MixingEngine::load`]
  pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
    self.decoder = Box::new(decoder);
    self
  }

  fn deck_mut(&mut self, id: DeckId) -> (&mut Deck<G>, &mut G) {
    match id {
      DeckId::A => (&mut self.deck_a, &mut self.graph),
      DeckId::B => (&mut self.deck_b, &mut self.graph),
    }
  }

  pub fn deck(&self, id: DeckId) -> &Deck<G> {
    match id {
      DeckId::A => &self.deck_a,
      DeckId::B => &self.deck_b,
    }
  }

  pub fn graph(&self) -> &G {
    &self.graph
  }

  pub fn graph_mut(&mut self) -> &mut G {
    &mut self.graph
  }

  pub fn config(&self) -> &MixerConfig {
    &self.config
  }

  /// Decode raw file bytes onto a deck
  ///
  /// On a decode failure the deck keeps whatever it had loaded before.
  pub fn load(&mut self, id: DeckId, raw: &[u8]) -> Result<()> {
    let audio = self.decoder.decode(raw).map_err(|e| {
      log::warn!("[MixingEngine] Load on deck {} failed: {}", id, e);
      e
    })?;
    self.load_decoded(id, &audio);
    Ok(())
  }

  /// Load already decoded audio onto a deck
  pub fn load_decoded(&mut self, id: DeckId, audio: &DecodedAudio) {
    let (deck, graph) = self.deck_mut(id);
    deck.load(graph, audio);
  }

  /// Restart a deck from its start offset. No-op without a buffer.
  pub fn play(&mut self, id: DeckId) -> bool {
    self.graph.resume();
    self.stop_deck(id);

    let now = self.graph.current_time();
    let (deck, graph) = self.deck_mut(id);
    let offset = deck.start_offset();
    let started = deck.play(graph, offset, now);
    if started {
      self.monitor.activate();
    }
    started
  }

  /// Stop one deck. Stopping B also puts its gain back at the user volume.
  pub fn stop_deck(&mut self, id: DeckId) {
    let (deck, graph) = self.deck_mut(id);
    deck.stop(graph);
    if id == DeckId::B {
      self.deck_b.reset_gain(&mut self.graph);
      self.monitor.clear_duck();
    }
  }

  /// Start both decks on the same render instant
  pub fn play_both(&mut self) {
    self.graph.resume();
    self.stop();

    let now = self.graph.current_time();
    let offset_a = self.deck_a.start_offset();
    let offset_b = self.deck_b.start_offset();
    let started_a = self.deck_a.play(&mut self.graph, offset_a, now);
    let started_b = self.deck_b.play(&mut self.graph, offset_b, now);
    self.monitor.activate();

    log::info!(
      "[MixingEngine] Play both at {:.3}s (A={}, B={})",
      now,
      started_a,
      started_b
    );
  }

  /// Stop both decks and cancel the monitor, whatever its own state
  pub fn stop(&mut self) {
    self.stop_deck(DeckId::A);
    self.stop_deck(DeckId::B);
    self.monitor.deactivate();
  }

  /// Move a deck's start offset, restarting it there when `resume` and playing
  pub fn seek(&mut self, id: DeckId, seconds: f64, resume: bool) {
    let now = self.graph.current_time();
    let (deck, graph) = self.deck_mut(id);
    let restarted = deck.seek(graph, seconds, resume, now);
    if restarted && id == DeckId::B {
      self.deck_b.reset_gain(&mut self.graph);
      self.monitor.clear_duck();
    }
  }

  /// Set a deck's volume (clamped to 0..1)
  ///
  /// For deck B this is the user volume the monitor ducks from. While deck A plays with ducking
  /// on, the monitor owns B's gain and picks the new value up on its next tick.
  pub fn set_volume(&mut self, id: DeckId, volume: f32) {
    let apply = match id {
      DeckId::A => true,
      DeckId::B => !self.ducking_enabled || !self.deck_a.is_playing(),
    };
    let (deck, graph) = self.deck_mut(id);
    deck.set_volume(graph, volume, apply);
  }

  pub fn set_boost(&mut self, id: DeckId, enabled: bool) {
    let (deck, graph) = self.deck_mut(id);
    deck.set_boost(graph, enabled);
  }

  /// Turn automatic ducking on or off
  ///
  /// Switching off ramps deck B back to its user volume so a duck in progress is undone.
  /// Switching on changes nothing until the monitor's next qualifying tick.
  pub fn set_ducking(&mut self, enabled: bool) {
    self.ducking_enabled = enabled;
    if !enabled {
      let volume = self.deck_b.volume();
      self
        .deck_b
        .ramp_gain(&mut self.graph, volume, self.config.release_time_constant);
      self.monitor.clear_duck();
    }
    log::info!(
      "[MixingEngine] Ducking {}",
      if enabled { "enabled" } else { "disabled" }
    );
  }

  /// Pan A left and B right, or both back to center
  pub fn set_stereo_split(&mut self, enabled: bool) {
    self.stereo_split_enabled = enabled;
    let (pan_a, pan_b) = if enabled { (-1.0, 1.0) } else { (0.0, 0.0) };
    let tc = self.config.pan_time_constant;
    self.deck_a.set_pan(&mut self.graph, pan_a, tc);
    self.deck_b.set_pan(&mut self.graph, pan_b, tc);
  }

  /// One scheduler tick: run the ducking monitor and report state
  pub fn tick(&mut self) -> EngineSnapshot {
    let outcome = self.monitor.tick(
      &mut self.graph,
      &self.deck_a,
      &self.deck_b,
      self.ducking_enabled,
    );
    if outcome == TickOutcome::Terminated {
      log::debug!("[MixingEngine] Monitor idle");
    }
    self.snapshot()
  }

  pub fn snapshot(&self) -> EngineSnapshot {
    EngineSnapshot {
      time: self.graph.current_time(),
      deck_a: self.deck_snapshot(DeckId::A),
      deck_b: self.deck_snapshot(DeckId::B),
      ducked: self.monitor.is_ducked(),
      ducking_enabled: self.ducking_enabled,
      stereo_split_enabled: self.stereo_split_enabled,
      monitor_active: self.monitor.is_active(),
    }
  }

  fn deck_snapshot(&self, id: DeckId) -> DeckSnapshot {
    let deck = self.deck(id);
    DeckSnapshot {
      position: self.position(id),
      duration: deck.duration(),
      playing: deck.is_playing(),
      has_buffer: deck.has_buffer(),
      volume: deck.volume(),
      effective_gain: self.effective_gain(id),
      boost: deck.boost_enabled(),
      pan: deck.pan(),
    }
  }

  pub fn position(&self, id: DeckId) -> f64 {
    self.deck(id).position(self.graph.current_time())
  }

  pub fn duration(&self, id: DeckId) -> f64 {
    self.deck(id).duration()
  }

  pub fn has_buffer(&self, id: DeckId) -> bool {
    self.deck(id).has_buffer()
  }

  pub fn is_playing(&self, id: DeckId) -> bool {
    self.deck(id).is_playing()
  }

  pub fn volume(&self, id: DeckId) -> f32 {
    self.deck(id).volume()
  }

  /// Last volume explicitly set for deck B
  pub fn user_volume_b(&self) -> f32 {
    self.deck_b.volume()
  }

  /// Gain currently applied on a deck's gain stage
  pub fn effective_gain(&self, id: DeckId) -> f32 {
    self.graph.param_value(self.deck(id).gain_node(), Param::Gain)
  }

  pub fn is_ducked(&self) -> bool {
    self.monitor.is_ducked()
  }

  pub fn monitor_active(&self) -> bool {
    self.monitor.is_active()
  }

  pub fn ducking_enabled(&self) -> bool {
    self.ducking_enabled
  }

  pub fn stereo_split_enabled(&self) -> bool {
    self.stereo_split_enabled
  }

  /// Analyser node for visualisers
  pub fn analysis_handle(&self, id: DeckId) -> NodeId {
    self.deck(id).analyser()
  }

  /// Magnitude spectrum of a deck's output
  pub fn frequency_data(&mut self, id: DeckId) -> Vec<u8> {
    let analyser = self.deck(id).analyser();
    let bins = self.graph.analysis_window(analyser) / 2;
    let mut data = vec![0u8; bins];
    self.graph.frequency_data(analyser, &mut data);
    data
  }

  /// Waveform of a deck's output
  pub fn time_domain_data(&mut self, id: DeckId) -> Vec<u8> {
    let analyser = self.deck(id).analyser();
    let mut data = vec![128u8; self.graph.analysis_window(analyser)];
    self.graph.time_domain_data(analyser, &mut data);
    data
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::MixerError;
  use crate::graph::simulated::SimulatedGraph;
  use crate::routing::SignalPath;

  const TICK: f64 = 1.0 / 60.0;

  fn track(seconds: f64) -> DecodedAudio {
    let rate = 100;
    DecodedAudio::new(vec![0.0; (seconds * rate as f64) as usize], 1, rate)
  }

  fn engine() -> MixingEngine<SimulatedGraph> {
    MixingEngine::new(SimulatedGraph::new(), MixerConfig::default())
  }

  fn loaded(a: f64, b: f64) -> MixingEngine<SimulatedGraph> {
    let mut engine = engine();
    engine.load_decoded(DeckId::A, &track(a));
    engine.load_decoded(DeckId::B, &track(b));
    engine
  }

  /// Advance the clock tick by tick, running the monitor each time
  fn run(engine: &mut MixingEngine<SimulatedGraph>, seconds: f64) {
    let ticks = (seconds / TICK).round() as usize;
    for _ in 0..ticks {
      engine.graph_mut().advance(TICK);
      engine.tick();
    }
  }

  fn set_level_a(engine: &mut MixingEngine<SimulatedGraph>, level: f32) {
    let analyser = engine.analysis_handle(DeckId::A);
    engine.graph_mut().set_level(analyser, level);
  }

  #[test]
  fn test_defaults() {
    let engine = engine();
    assert!(engine.ducking_enabled());
    assert!(!engine.stereo_split_enabled());
    assert!(!engine.monitor_active());
    assert_eq!(engine.user_volume_b(), 0.8);
    assert_eq!(engine.duration(DeckId::A), 0.0);
    assert!(!engine.has_buffer(DeckId::B));
  }

  #[test]
  fn test_play_both_shares_start_instant() {
    let mut engine = loaded(120.0, 90.0);
    engine.graph_mut().advance(3.0);
    engine.play_both();

    let a = engine.deck(DeckId::A).play_started_at();
    let b = engine.deck(DeckId::B).play_started_at();
    assert_eq!(a, Some(3.0));
    assert_eq!(a, b);
    assert!(engine.monitor_active());
    assert!(engine.graph().resume_count() > 0);
  }

  #[test]
  fn test_play_both_positions_after_thirty_seconds() {
    let mut engine = loaded(120.0, 90.0);
    engine.play_both();
    run(&mut engine, 30.0);

    assert!((engine.position(DeckId::A) - 30.0).abs() < 1e-6);
    assert!((engine.position(DeckId::B) - 30.0).abs() < 1e-6);
    assert!(engine.is_playing(DeckId::A));
    assert!(engine.is_playing(DeckId::B));
    assert!(!engine.is_ducked());
  }

  #[test]
  fn test_play_both_with_missing_deck_b() {
    let mut engine = engine();
    engine.load_decoded(DeckId::A, &track(60.0));
    engine.play_both();

    assert!(engine.is_playing(DeckId::A));
    assert!(!engine.is_playing(DeckId::B));
    assert!(!engine.has_buffer(DeckId::B));
    run(&mut engine, 0.5);
    assert!(engine.monitor_active());
  }

  #[test]
  fn test_play_both_with_nothing_loaded_goes_idle() {
    let mut engine = engine();
    engine.play_both();
    run(&mut engine, TICK);
    assert!(!engine.monitor_active());
  }

  #[test]
  fn test_play_restarts_from_start_offset() {
    let mut engine = loaded(60.0, 60.0);
    engine.seek(DeckId::A, 10.0, false);
    assert!(engine.play(DeckId::A));
    run(&mut engine, 2.0);
    assert!((engine.position(DeckId::A) - 12.0).abs() < 1e-6);

    assert!(engine.play(DeckId::A));
    assert!((engine.position(DeckId::A) - 10.0).abs() < 1e-6);
  }

  #[test]
  fn test_play_without_buffer_raises_nothing() {
    let mut engine = engine();
    assert!(!engine.play(DeckId::B));
    assert!(!engine.is_playing(DeckId::B));
    assert!(!engine.monitor_active());
  }

  #[test]
  fn test_seek_resume_while_playing() {
    let mut engine = loaded(120.0, 120.0);
    engine.play(DeckId::A);
    run(&mut engine, 4.0);

    engine.seek(DeckId::A, 75.0, true);
    assert!(engine.is_playing(DeckId::A));
    assert!((engine.position(DeckId::A) - 75.0).abs() < 1e-6);
  }

  #[test]
  fn test_seek_stopped_deck_does_not_start_it() {
    let mut engine = loaded(120.0, 120.0);
    engine.seek(DeckId::B, 20.0, true);
    assert!(!engine.is_playing(DeckId::B));
    assert_eq!(engine.position(DeckId::B), 20.0);
  }

  #[test]
  fn test_global_stop_is_idempotent_and_cancels_monitor() {
    let mut engine = loaded(60.0, 60.0);
    engine.play_both();
    run(&mut engine, 1.0);

    engine.stop();
    let first = engine.snapshot();
    engine.stop();
    assert_eq!(engine.snapshot(), first);
    assert!(!engine.monitor_active());
    assert!(!engine.is_playing(DeckId::A));
    assert!(engine.deck(DeckId::A).source().is_none());
  }

  #[test]
  fn test_no_gain_writes_after_global_stop() {
    let mut engine = loaded(60.0, 60.0);
    engine.play_both();
    set_level_a(&mut engine, 0.5);
    run(&mut engine, 0.5);
    engine.stop();

    let gain = engine.effective_gain(DeckId::B);
    run(&mut engine, 1.0);
    assert_eq!(engine.effective_gain(DeckId::B), gain);
    assert!((gain - 0.8).abs() < 1e-6);
  }

  #[test]
  fn test_ducking_converges_and_recovers() {
    let mut engine = loaded(120.0, 120.0);
    engine.play_both();

    set_level_a(&mut engine, 0.3);
    run(&mut engine, 1.0);
    assert!(engine.is_ducked());
    assert!((engine.effective_gain(DeckId::B) - 0.32).abs() < 0.005);

    set_level_a(&mut engine, 0.01);
    run(&mut engine, 1.0);
    assert!(!engine.is_ducked());
    assert!((engine.effective_gain(DeckId::B) - 0.8).abs() < 0.005);
  }

  #[test]
  fn test_ducking_follows_user_volume() {
    let mut engine = loaded(120.0, 120.0);
    engine.play_both();
    set_level_a(&mut engine, 0.3);
    run(&mut engine, 0.5);

    // Deferred while the monitor owns the gain
    engine.set_volume(DeckId::B, 0.5);
    assert_eq!(engine.user_volume_b(), 0.5);
    run(&mut engine, 1.0);
    assert!((engine.effective_gain(DeckId::B) - 0.2).abs() < 0.005);
  }

  #[test]
  fn test_volume_b_applies_immediately_when_a_stopped() {
    let mut engine = loaded(60.0, 60.0);
    engine.play(DeckId::B);
    engine.set_volume(DeckId::B, 0.6);
    assert!((engine.effective_gain(DeckId::B) - 0.6).abs() < 1e-6);

    engine.set_ducking(false);
    engine.play(DeckId::A);
    engine.set_volume(DeckId::B, 0.4);
    assert!((engine.effective_gain(DeckId::B) - 0.4).abs() < 1e-6);
  }

  #[test]
  fn test_volume_a_always_immediate() {
    let mut engine = loaded(60.0, 60.0);
    engine.play_both();
    engine.set_volume(DeckId::A, 0.25);
    assert!((engine.effective_gain(DeckId::A) - 0.25).abs() < 1e-6);
    engine.set_volume(DeckId::A, -1.0);
    assert_eq!(engine.effective_gain(DeckId::A), 0.0);
  }

  #[test]
  fn test_disabling_ducking_releases_within_time_constant() {
    let mut engine = loaded(120.0, 120.0);
    engine.play_both();
    set_level_a(&mut engine, 0.3);
    run(&mut engine, 1.0);
    let ducked = engine.effective_gain(DeckId::B);

    engine.set_ducking(false);
    assert!(!engine.is_ducked());
    run(&mut engine, 0.1);
    let after_one_tc = engine.effective_gain(DeckId::B);
    let expected = 0.8 - (0.8 - ducked) * (-1.0f32).exp();
    assert!((after_one_tc - expected).abs() < 0.01, "gain {}", after_one_tc);

    run(&mut engine, 1.0);
    assert!((engine.effective_gain(DeckId::B) - 0.8).abs() < 0.005);
  }

  #[test]
  fn test_enabling_ducking_waits_for_next_tick() {
    let mut engine = loaded(120.0, 120.0);
    engine.set_ducking(false);
    engine.play_both();
    set_level_a(&mut engine, 0.3);
    run(&mut engine, 0.5);
    assert!((engine.effective_gain(DeckId::B) - 0.8).abs() < 1e-6);

    engine.set_ducking(true);
    assert!((engine.effective_gain(DeckId::B) - 0.8).abs() < 1e-6);
    run(&mut engine, 1.0);
    assert!(engine.is_ducked());
  }

  #[test]
  fn test_stop_b_resets_ducked_gain() {
    let mut engine = loaded(120.0, 120.0);
    engine.set_volume(DeckId::B, 0.8);
    engine.play_both();
    set_level_a(&mut engine, 0.3);
    run(&mut engine, 1.0);
    assert!((engine.effective_gain(DeckId::B) - 0.32).abs() < 0.005);

    engine.stop_deck(DeckId::B);
    engine.play(DeckId::B);
    assert!((engine.effective_gain(DeckId::B) - 0.8).abs() < 1e-6);
  }

  #[test]
  fn test_stop_a_keeps_its_settings() {
    let mut engine = loaded(60.0, 60.0);
    engine.set_boost(DeckId::A, true);
    engine.set_volume(DeckId::A, 0.3);
    engine.set_stereo_split(true);
    engine.play(DeckId::A);
    engine.stop_deck(DeckId::A);

    let deck = engine.deck(DeckId::A);
    assert!(deck.boost_enabled());
    assert_eq!(deck.volume(), 0.3);
    assert_eq!(deck.pan(), -1.0);
  }

  #[test]
  fn test_monitor_restarts_on_next_play() {
    let mut engine = loaded(60.0, 60.0);
    engine.play(DeckId::A);
    engine.stop_deck(DeckId::A);
    run(&mut engine, TICK);
    assert!(!engine.monitor_active());

    engine.play(DeckId::B);
    assert!(engine.monitor_active());
  }

  #[test]
  fn test_stereo_split_ramps_pan() {
    let mut engine = engine();
    engine.set_stereo_split(true);
    let panner_a = engine.deck(DeckId::A).panner_node();
    let panner_b = engine.deck(DeckId::B).panner_node();
    assert_eq!(engine.graph().param_value(panner_a, Param::Pan), 0.0);

    engine.graph_mut().advance(0.1);
    let a = engine.graph().param_value(panner_a, Param::Pan);
    assert!((a + 1.0 - (-1.0f32).exp()).abs() < 1e-3, "pan {}", a);

    engine.graph_mut().advance(1.0);
    assert!((engine.graph().param_value(panner_a, Param::Pan) + 1.0).abs() < 1e-3);
    assert!((engine.graph().param_value(panner_b, Param::Pan) - 1.0).abs() < 1e-3);

    engine.set_stereo_split(false);
    engine.graph_mut().advance(1.0);
    assert!(engine.graph().param_value(panner_b, Param::Pan).abs() < 1e-3);
  }

  #[test]
  fn test_stereo_split_from_config() {
    let config = MixerConfig {
      stereo_split_enabled: true,
      ..MixerConfig::default()
    };
    let engine = MixingEngine::new(SimulatedGraph::new(), config);
    assert!(engine.stereo_split_enabled());
    assert_eq!(engine.deck(DeckId::B).pan(), 1.0);
  }

  #[test]
  fn test_out_of_range_config_is_replaced_before_use() {
    let config = MixerConfig {
      analyser_fft_size: 1000,
      pan_time_constant: -0.1,
      stereo_split_enabled: true,
      ..MixerConfig::default()
    };
    let mut engine = MixingEngine::new(SimulatedGraph::new(), config);
    assert_eq!(engine.config().analyser_fft_size, 256);
    assert_eq!(engine.config().pan_time_constant, 0.1);
    assert_eq!(engine.time_domain_data(DeckId::A).len(), 256);

    engine.graph_mut().advance(0.1);
    let pan_b = engine.graph().param_value(engine.deck(DeckId::B).panner_node(), Param::Pan);
    assert!(pan_b > 0.5 && pan_b < 1.0, "pan {}", pan_b);
  }

  #[test]
  fn test_boost_toggle_is_deck_local() {
    let mut engine = loaded(60.0, 60.0);
    engine.play_both();
    let source_b = engine.deck(DeckId::B).source().unwrap();
    let gain_b = engine.deck(DeckId::B).gain_node();

    engine.set_boost(DeckId::A, true);
    assert!(engine.deck(DeckId::A).signal_path().unwrap().is_boosted());
    assert_eq!(engine.deck(DeckId::B).signal_path(), Some(SignalPath::Direct));
    assert_eq!(engine.graph().outputs(source_b), vec![gain_b]);
  }

  #[test]
  fn test_load_garbage_keeps_previous_buffer() {
    let mut engine = loaded(42.0, 10.0);
    let err = engine.load(DeckId::A, b"RIFF-but-not-really").unwrap_err();
    assert!(matches!(err, MixerError::Decode(_)));
    assert!(engine.has_buffer(DeckId::A));
    assert_eq!(engine.duration(DeckId::A), 42.0);
  }

  #[test]
  fn test_load_with_custom_decoder() {
    struct Fixed;
    impl Decoder for Fixed {
      fn decode(&self, _raw: &[u8]) -> Result<DecodedAudio> {
        Ok(DecodedAudio::new(vec![0.0; 500], 1, 100))
      }
    }

    let mut engine = engine().with_decoder(Fixed);
    engine.load(DeckId::B, b"anything").unwrap();
    assert_eq!(engine.duration(DeckId::B), 5.0);
  }

  #[test]
  fn test_analysis_data_for_visualisers() {
    let mut engine = loaded(60.0, 60.0);
    set_level_a(&mut engine, 0.5);
    assert_eq!(engine.time_domain_data(DeckId::A).len(), 256);
    let spectrum = engine.frequency_data(DeckId::A);
    assert_eq!(spectrum.len(), 128);
    assert!(spectrum.iter().all(|&b| b > 0));
    assert!(engine.frequency_data(DeckId::B).iter().all(|&b| b == 0));
  }

  #[test]
  fn test_tick_snapshot_reports_state() {
    let mut engine = loaded(60.0, 30.0);
    engine.set_boost(DeckId::B, true);
    engine.play(DeckId::A);
    engine.graph_mut().advance(2.0);
    let snapshot = engine.tick();

    assert!(snapshot.monitor_active);
    assert!(snapshot.deck_a.playing);
    assert!(!snapshot.deck_b.playing);
    assert!((snapshot.deck_a.position - 2.0).abs() < 1e-9);
    assert_eq!(snapshot.deck_b.duration, 30.0);
    assert!(snapshot.deck_b.boost);
    assert!((snapshot.deck_b.effective_gain - 0.8).abs() < 1e-6);
  }
}
