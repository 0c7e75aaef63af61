//! Playback clock
//!
//! Derives a deck's position from the runtime clock instead of counting rendered frames, so the
//! reported position needs no feedback from the render thread.

/// Anchor of a running playback: where in the buffer it began and at which render time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackClock {
  start_offset: f64,
  started_at: f64,
}

impl PlaybackClock {
  pub fn new(start_offset: f64, started_at: f64) -> Self {
    Self {
      start_offset,
      started_at,
    }
  }

  pub fn start_offset(&self) -> f64 {
    self.start_offset
  }

  pub fn started_at(&self) -> f64 {
    self.started_at
  }

  /// Position in seconds at render time `now`, wrapped into `[0, duration)`
  ///
  /// A zero-length buffer wraps at one second.
  pub fn position(&self, now: f64, duration: f64) -> f64 {
    let duration = if duration > 0.0 { duration } else { 1.0 };
    let elapsed = now - self.started_at;
    (self.start_offset + elapsed).rem_euclid(duration)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_position_advances_with_clock() {
    let clock = PlaybackClock::new(10.0, 2.0);
    assert!((clock.position(2.0, 120.0) - 10.0).abs() < 1e-9);
    assert!((clock.position(7.5, 120.0) - 15.5).abs() < 1e-9);
  }

  #[test]
  fn test_position_wraps_at_duration() {
    let clock = PlaybackClock::new(80.0, 0.0);
    assert!((clock.position(15.0, 90.0) - 5.0).abs() < 1e-9);
  }

  #[test]
  fn test_zero_duration_wraps_at_one_second() {
    let clock = PlaybackClock::new(0.0, 0.0);
    assert!((clock.position(2.25, 0.0) - 0.25).abs() < 1e-9);
  }
}
