//! Mixer configuration
//!
//! Tunables for the ducking loop, the smoothing ramps and the output strip. Everything has a
//! default so a missing or partial YAML file still yields a working mixer.

use std::path::Path;

use serde::Deserialize;

use crate::error::{MixerError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
  /// Scheduler rate for the ducking monitor and position reports (Hz)
  pub tick_rate_hz: f64,

  /// RMS level of deck A above which deck B gets ducked
  pub duck_threshold: f32,

  /// Fraction of deck B's user volume kept while ducked
  pub duck_ratio: f32,

  /// Time constant of the duck/unduck ramp (seconds)
  pub duck_time_constant: f64,

  /// Time constant used to undo a duck when ducking is switched off (seconds)
  pub release_time_constant: f64,

  /// Time constant of the stereo split pan ramp (seconds)
  pub pan_time_constant: f64,

  /// Volume both decks start with, and the initial user volume of deck B
  pub initial_volume: f32,

  /// Analyser window size; also the number of samples the monitor reads per tick
  pub analyser_fft_size: usize,

  pub ducking_enabled: bool,

  pub stereo_split_enabled: bool,

  /// Output device id for the real-time runtime. `None` picks the system default,
  /// `Some("none")` renders without a device.
  pub output_sink: Option<String>,
}

impl Default for MixerConfig {
  fn default() -> Self {
    Self {
      tick_rate_hz: 60.0,
      duck_threshold: 0.05,
      duck_ratio: 0.4,
      duck_time_constant: 0.15,
      release_time_constant: 0.1,
      pan_time_constant: 0.1,
      initial_volume: 0.8,
      analyser_fft_size: 256,
      ducking_enabled: true,
      stereo_split_enabled: false,
      output_sink: None,
    }
  }
}

impl MixerConfig {
  /// Interval between two scheduler ticks
  pub fn tick_interval(&self) -> std::time::Duration {
    let rate = if self.tick_rate_hz > 0.0 { self.tick_rate_hz } else { 60.0 };
    std::time::Duration::from_secs_f64(1.0 / rate)
  }

  /// Replace every out-of-range field with its default and return the names of those fields
  ///
  /// The real-time runtime panics on a non power of two analyser size or a negative time
  /// constant, so nothing reaches it unchecked.
  pub fn sanitize(&mut self) -> Vec<&'static str> {
    let defaults = Self::default();
    let config = self;
    let mut replaced = Vec::new();
    let unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
    let positive = |v: f64| v.is_finite() && v > 0.0;

    macro_rules! fall_back_unless {
      ($field:ident, $valid:expr) => {
        if !$valid {
          config.$field = defaults.$field;
          replaced.push(stringify!($field));
        }
      };
    }

    fall_back_unless!(tick_rate_hz, positive(config.tick_rate_hz));
    fall_back_unless!(duck_threshold, unit(config.duck_threshold));
    fall_back_unless!(duck_ratio, unit(config.duck_ratio));
    fall_back_unless!(duck_time_constant, positive(config.duck_time_constant));
    fall_back_unless!(release_time_constant, positive(config.release_time_constant));
    fall_back_unless!(pan_time_constant, positive(config.pan_time_constant));
    fall_back_unless!(initial_volume, unit(config.initial_volume));
    fall_back_unless!(
      analyser_fft_size,
      FFT_SIZES.contains(&config.analyser_fft_size) && config.analyser_fft_size.is_power_of_two()
    );

    for name in &replaced {
      log::warn!("[MixerConfig] {} out of range, using default", name);
    }
    replaced
  }
}

/// Analyser window sizes the runtime accepts (powers of two in this range)
const FFT_SIZES: std::ops::RangeInclusive<usize> = 32..=32768;

fn read_config(path: &Path) -> Result<MixerConfig> {
  let contents = std::fs::read_to_string(path)?;
  serde_yaml::from_str(&contents).map_err(|e| MixerError::Config(e.to_string()))
}

/// Load the mixer config from a YAML file
///
/// A missing file yields defaults. So does an unreadable or unparseable one, with a warning.
/// Fields out of range fall back to their defaults one by one.
pub fn load_config(path: &Path) -> MixerConfig {
  let mut config = match read_config(path) {
    Ok(config) => {
      log::info!("[MixerConfig] Loaded {:?}", path);
      config
    }
    Err(MixerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
      log::info!("[MixerConfig] {:?} not found, using defaults", path);
      MixerConfig::default()
    }
    Err(e) => {
      log::warn!("[MixerConfig] {:?}: {}, using defaults", path, e);
      MixerConfig::default()
    }
  };
  config.sanitize();
  config
}
