#![deny(clippy::all)]

//! Two-deck mixing engine with vocal boost and side-chain ducking.
//!
//! [`MixingEngine`] owns two [`Deck`]s and a [`DuckingMonitor`] on top of an [`AudioGraph`]
//! runtime. [`Session`] drives it from a fixed-rate scheduler thread. With the `node` feature
//! the crate builds as a Node.js addon exposing the same commands.

// ============================================================================
// Runtime boundary - graph trait, real-time and simulated runtimes, decoding
// ============================================================================

mod decoder;
mod error;
pub mod graph;

pub use decoder::*;
pub use error::{MixerError, Result};

// ============================================================================
// Mixer core
// ============================================================================

mod audio_engine;
mod clock;
mod config;
mod deck;
mod ducking;
mod routing;
mod session;
mod vocal_boost;

pub use audio_engine::*;
pub use clock::PlaybackClock;
pub use config::*;
pub use deck::*;
pub use ducking::*;
pub use routing::{PatchOp, SignalPath};
pub use session::*;
pub use vocal_boost::VocalBoostChain;

// ============================================================================
// Node.js addon
// ============================================================================

#[cfg(feature = "node")]
mod node;
#[cfg(feature = "node")]
pub use node::*;
