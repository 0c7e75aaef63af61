//! Side-chain ducking monitor
//!
//! Runs once per scheduler tick. While both decks play and ducking is on, it measures deck A's
//! loudness and ramps deck B toward a reduced or full level. The loop switches itself off on the
//! first tick where neither deck plays; the next play switches it back on.

use crate::config::MixerConfig;
use crate::deck::Deck;
use crate::graph::AudioGraph;

/// What one monitor tick did
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
  /// Monitor is not scheduled
  Idle,
  /// Preconditions not met (ducking off or a deck stopped); deck B left alone
  Skipped,
  /// Deck B ramped toward `target`
  Applied { rms: f32, target: f32 },
  /// Neither deck plays; the monitor unscheduled itself
  Terminated,
}

/// RMS of an unsigned byte waveform where 128 is the zero line
pub fn rms_from_bytes(window: &[u8]) -> f32 {
  if window.is_empty() {
    return 0.0;
  }
  let sum_square: f32 = window
    .iter()
    .map(|&b| {
      let normalized = (b as f32 - 128.0) / 128.0;
      normalized * normalized
    })
    .sum();
  (sum_square / window.len() as f32).sqrt()
}

pub struct DuckingMonitor {
  active: bool,
  ducked: bool,
  window: Vec<u8>,
  threshold: f32,
  ratio: f32,
  time_constant: f64,
}

impl DuckingMonitor {
  pub fn new(config: &MixerConfig) -> Self {
    Self {
      active: false,
      ducked: false,
      window: vec![128; config.analyser_fft_size],
      threshold: config.duck_threshold,
      ratio: config.duck_ratio,
      time_constant: config.duck_time_constant,
    }
  }

  /// Schedule the loop. Returns `true` if it was not already running.
  pub fn activate(&mut self) -> bool {
    let started = !self.active;
    if started {
      log::debug!("[DuckingMonitor] Started");
    }
    self.active = true;
    started
  }

  /// Unschedule unconditionally
  pub fn deactivate(&mut self) {
    if self.active {
      log::debug!("[DuckingMonitor] Cancelled");
    }
    self.active = false;
    self.ducked = false;
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Whether the last applied target was the ducked level
  pub fn is_ducked(&self) -> bool {
    self.ducked
  }

  /// Forget the duck decision after deck B's gain was reset externally
  pub fn clear_duck(&mut self) {
    self.ducked = false;
  }

  /// Level deck B is driven to for a given deck A loudness
  pub fn target_gain(&self, rms: f32, user_volume: f32) -> f32 {
    if rms > self.threshold {
      user_volume * self.ratio
    } else {
      user_volume
    }
  }

  pub fn tick<G: AudioGraph>(
    &mut self,
    graph: &mut G,
    deck_a: &Deck<G>,
    deck_b: &Deck<G>,
    ducking_enabled: bool,
  ) -> TickOutcome {
    if !self.active {
      return TickOutcome::Idle;
    }

    if !deck_a.is_playing() && !deck_b.is_playing() {
      self.active = false;
      self.ducked = false;
      log::debug!("[DuckingMonitor] Both decks stopped, terminating");
      return TickOutcome::Terminated;
    }

    if !ducking_enabled || !deck_a.is_playing() || !deck_b.is_playing() {
      return TickOutcome::Skipped;
    }

    let window = graph.analysis_window(deck_a.analyser());
    if window > 0 && window != self.window.len() {
      self.window.resize(window, 128);
    }
    graph.time_domain_data(deck_a.analyser(), &mut self.window);
    let rms = rms_from_bytes(&self.window);

    let target = self.target_gain(rms, deck_b.volume());
    deck_b.ramp_gain(graph, target, self.time_constant);

    let ducked = rms > self.threshold;
    if ducked != self.ducked {
      log::debug!(
        "[DuckingMonitor] {} deck B (rms={:.3}, target={:.3})",
        if ducked { "Ducking" } else { "Releasing" },
        rms,
        target
      );
    }
    self.ducked = ducked;

    TickOutcome::Applied { rms, target }
  }
}
