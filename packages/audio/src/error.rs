//! Mixer error types

use thiserror::Error;

use crate::deck::DeckId;

/// Errors that can occur while driving the mixer
///
/// Only the decode path reaches callers. Config errors are absorbed by `load_config`, which falls
/// back to defaults; runtime errors are absorbed by the engine, which degrades to a no-op.
#[derive(Error, Debug)]
pub enum MixerError {
  /// Input bytes are not decodable audio
  #[error("Failed to decode audio: {0}")]
  Decode(String),

  /// Transport command on a deck that has nothing loaded
  #[error("Deck {0} has no buffer loaded")]
  NoBuffer(DeckId),

  /// The runtime refused to halt a source (never started, or already halted)
  #[error("Runtime rejected halt: {0}")]
  RuntimeHalt(String),

  /// Configuration file could not be parsed
  #[error("Invalid configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MixerError>;
