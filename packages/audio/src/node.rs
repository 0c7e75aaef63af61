//! Node.js addon surface
//!
//! Wraps a [`Session`] on the real-time runtime in a napi class. State snapshots are forwarded
//! to a JS callback from a dedicated thread so the tick loop never waits on JS.

use std::path::Path;
use std::thread::{self, JoinHandle};

use napi::bindgen_prelude::*;
use napi::threadsafe_function::ThreadsafeFunctionCallMode;
use napi_derive::napi;

use crate::audio_engine::{DeckSnapshot, EngineSnapshot, MixingEngine};
use crate::config::{load_config, MixerConfig};
use crate::deck::DeckId;
use crate::decoder::{Decoder, SymphoniaDecoder};
use crate::graph::web::WebAudioGraph;
use crate::session::Session;

/// Returns the crate version so JS can verify the native module loaded correctly.
#[napi]
pub fn addon_version() -> String {
  env!("CARGO_PKG_VERSION").to_string()
}

#[napi(object)]
pub struct DeckStateJs {
  pub position: f64,
  pub duration: f64,
  pub playing: bool,
  pub has_buffer: bool,
  pub volume: f64,
  pub effective_gain: f64,
  pub boost: bool,
  pub pan: f64,
}

/// State update sent to JavaScript
#[napi(object)]
pub struct AudioEngineStateUpdate {
  pub time: f64,
  pub deck_a: DeckStateJs,
  pub deck_b: DeckStateJs,
  pub ducked: bool,
  pub ducking_enabled: bool,
  pub stereo_split_enabled: bool,
  pub monitor_active: bool,
}

fn deck_state(deck: &DeckSnapshot) -> DeckStateJs {
  DeckStateJs {
    position: deck.position,
    duration: deck.duration,
    playing: deck.playing,
    has_buffer: deck.has_buffer,
    volume: deck.volume as f64,
    effective_gain: deck.effective_gain as f64,
    boost: deck.boost,
    pan: deck.pan as f64,
  }
}

fn state_update(snapshot: &EngineSnapshot) -> AudioEngineStateUpdate {
  AudioEngineStateUpdate {
    time: snapshot.time,
    deck_a: deck_state(&snapshot.deck_a),
    deck_b: deck_state(&snapshot.deck_b),
    ducked: snapshot.ducked,
    ducking_enabled: snapshot.ducking_enabled,
    stereo_split_enabled: snapshot.stereo_split_enabled,
    monitor_active: snapshot.monitor_active,
  }
}

#[napi]
pub struct AudioEngine {
  session: Session<WebAudioGraph>,
  decoder: SymphoniaDecoder,
  forward_thread: Option<JoinHandle<()>>,
}

#[napi]
impl AudioEngine {
  /// Create a new AudioEngine instance
  #[napi(constructor)]
  pub fn new(
    config_path: Option<String>,
    #[napi(ts_arg_type = "(state: AudioEngineStateUpdate) => void")] state_callback: Function<
      AudioEngineStateUpdate,
      (),
    >,
  ) -> Result<Self> {
    let config: MixerConfig = match config_path {
      Some(path) => load_config(Path::new(&path)),
      None => MixerConfig::default(),
    };

    let graph = WebAudioGraph::new(&config);
    let session = Session::start(MixingEngine::new(graph, config)).map_err(map_err)?;

    let tsfn = state_callback
      .build_threadsafe_function()
      .callee_handled::<false>()
      .build()?;

    // Ends once the session drops its senders on close
    let updates = session.subscribe(4);
    let forward_thread = thread::spawn(move || {
      for snapshot in updates.iter() {
        tsfn.call(state_update(&snapshot), ThreadsafeFunctionCallMode::NonBlocking);
      }
    });

    Ok(Self {
      session,
      decoder: SymphoniaDecoder::default(),
      forward_thread: Some(forward_thread),
    })
  }

  /// Decode an audio file's bytes onto a deck
  #[napi]
  pub fn load_track(&self, deck: u32, data: Buffer) -> Result<()> {
    // Decode outside the engine lock so ticks keep running
    let audio = self.decoder.decode(&data).map_err(map_err)?;
    self
      .session
      .with(|engine| engine.load_decoded(DeckId::from_index(deck), &audio));
    Ok(())
  }

  #[napi]
  pub fn play(&self, deck: u32) -> Result<bool> {
    Ok(self.session.with(|engine| engine.play(DeckId::from_index(deck))))
  }

  #[napi]
  pub fn play_both(&self) -> Result<()> {
    self.session.with(|engine| engine.play_both());
    Ok(())
  }

  #[napi]
  pub fn stop(&self, deck: u32) -> Result<()> {
    self
      .session
      .with(|engine| engine.stop_deck(DeckId::from_index(deck)));
    Ok(())
  }

  #[napi]
  pub fn stop_all(&self) -> Result<()> {
    self.session.with(|engine| engine.stop());
    Ok(())
  }

  /// Seek a deck to `seconds`; restarts it there when `resume` and playing
  #[napi]
  pub fn seek(&self, deck: u32, seconds: f64, resume: bool) -> Result<()> {
    self
      .session
      .with(|engine| engine.seek(DeckId::from_index(deck), seconds, resume));
    Ok(())
  }

  /// Set deck volume (0.0 to 1.0)
  #[napi]
  pub fn set_volume(&self, deck: u32, volume: f64) -> Result<()> {
    self
      .session
      .with(|engine| engine.set_volume(DeckId::from_index(deck), volume as f32));
    Ok(())
  }

  #[napi]
  pub fn set_boost(&self, deck: u32, enabled: bool) -> Result<()> {
    self
      .session
      .with(|engine| engine.set_boost(DeckId::from_index(deck), enabled));
    Ok(())
  }

  #[napi]
  pub fn set_ducking(&self, enabled: bool) -> Result<()> {
    self.session.with(|engine| engine.set_ducking(enabled));
    Ok(())
  }

  #[napi]
  pub fn set_stereo_split(&self, enabled: bool) -> Result<()> {
    self.session.with(|engine| engine.set_stereo_split(enabled));
    Ok(())
  }

  #[napi]
  pub fn get_position(&self, deck: u32) -> f64 {
    self
      .session
      .with(|engine| engine.position(DeckId::from_index(deck)))
  }

  #[napi]
  pub fn get_duration(&self, deck: u32) -> f64 {
    self
      .session
      .with(|engine| engine.duration(DeckId::from_index(deck)))
  }

  #[napi]
  pub fn has_buffer(&self, deck: u32) -> bool {
    self
      .session
      .with(|engine| engine.has_buffer(DeckId::from_index(deck)))
  }

  #[napi]
  pub fn is_playing(&self, deck: u32) -> bool {
    self
      .session
      .with(|engine| engine.is_playing(DeckId::from_index(deck)))
  }

  /// Byte spectrum of a deck's output, for visualisers
  #[napi]
  pub fn get_frequency_data(&self, deck: u32) -> Buffer {
    self
      .session
      .with(|engine| engine.frequency_data(DeckId::from_index(deck)))
      .into()
  }

  /// Byte waveform of a deck's output, 128 = silence
  #[napi]
  pub fn get_time_domain_data(&self, deck: u32) -> Buffer {
    self
      .session
      .with(|engine| engine.time_domain_data(DeckId::from_index(deck)))
      .into()
  }

  /// Get current state
  #[napi]
  pub fn get_state(&self) -> AudioEngineStateUpdate {
    state_update(&self.session.snapshot())
  }

  /// Clean up and stop the engine
  #[napi]
  pub fn close(&mut self) -> Result<()> {
    self.session.close();
    if let Some(handle) = self.forward_thread.take() {
      if handle.join().is_err() {
        log::warn!("[AudioEngine] State forwarding thread panicked");
      }
    }
    Ok(())
  }
}

fn map_err<E: ToString>(err: E) -> Error {
  Error::from_reason(err.to_string())
}
