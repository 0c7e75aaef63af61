//! Session - fixed-rate scheduler around a shared engine
//!
//! The engine is a single-owner object; a session puts it behind a mutex and drives
//! [`MixingEngine::tick`] from a background thread. Commands and ticks take the same lock, so a
//! command never interleaves with a monitor update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::audio_engine::{EngineSnapshot, MixingEngine};
use crate::error::Result;
use crate::graph::AudioGraph;

/// Background thread running a task at a fixed interval until stopped
pub struct Ticker {
  running: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl Ticker {
  pub fn spawn<F>(name: &str, interval: Duration, mut task: F) -> Result<Self>
  where
    F: FnMut() + Send + 'static,
  {
    let running = Arc::new(AtomicBool::new(true));
    let running_for_thread = Arc::clone(&running);

    let handle = thread::Builder::new()
      .name(name.to_string())
      .spawn(move || {
        let mut next = Instant::now() + interval;
        while running_for_thread.load(Ordering::Acquire) {
          task();

          let now = Instant::now();
          if next > now {
            thread::sleep(next - now);
          } else {
            // Fell behind; don't try to catch up with a burst of ticks
            next = now;
          }
          next += interval;
        }
      })?;

    Ok(Self {
      running,
      handle: Some(handle),
    })
  }

  pub fn is_running(&self) -> bool {
    self.running.load(Ordering::Acquire)
  }

  /// Signal the thread and wait for its current iteration to finish
  pub fn stop(&mut self) {
    self.running.store(false, Ordering::Release);
    if let Some(handle) = self.handle.take() {
      if handle.join().is_err() {
        log::warn!("[Ticker] Thread panicked");
      }
    }
  }
}

impl Drop for Ticker {
  fn drop(&mut self) {
    self.stop();
  }
}

type Subscribers = Arc<Mutex<Vec<Sender<EngineSnapshot>>>>;

pub struct Session<G: AudioGraph> {
  engine: Arc<Mutex<MixingEngine<G>>>,
  subscribers: Subscribers,
  ticker: Option<Ticker>,
}

impl<G> Session<G>
where
  G: AudioGraph + Send + 'static,
  G::Buffer: Send,
{
  /// Start ticking `engine` at its configured rate
  pub fn start(engine: MixingEngine<G>) -> Result<Self> {
    let interval = engine.config().tick_interval();
    let engine = Arc::new(Mutex::new(engine));
    let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));

    let engine_for_tick = Arc::clone(&engine);
    let subscribers_for_tick = Arc::clone(&subscribers);
    let ticker = Ticker::spawn("mixer-tick", interval, move || {
      let snapshot = engine_for_tick.lock().tick();
      broadcast(&subscribers_for_tick, snapshot);
    })?;

    log::info!("[Session] Started, tick every {:?}", interval);
    Ok(Self {
      engine,
      subscribers,
      ticker: Some(ticker),
    })
  }

  /// Run a command against the engine between ticks
  pub fn with<R>(&self, f: impl FnOnce(&mut MixingEngine<G>) -> R) -> R {
    f(&mut self.engine.lock())
  }

  /// Receive a snapshot per tick. Slow receivers miss frames instead of stalling the loop.
  pub fn subscribe(&self, capacity: usize) -> Receiver<EngineSnapshot> {
    let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
    self.subscribers.lock().push(tx);
    rx
  }

  pub fn snapshot(&self) -> EngineSnapshot {
    self.engine.lock().snapshot()
  }

  pub fn is_running(&self) -> bool {
    self.ticker.as_ref().is_some_and(Ticker::is_running)
  }

  /// Stop the scheduler and both decks; disconnects all subscribers
  pub fn close(&mut self) {
    if let Some(mut ticker) = self.ticker.take() {
      ticker.stop();
      self.engine.lock().stop();
      self.subscribers.lock().clear();
      log::info!("[Session] Closed");
    }
  }
}

impl<G: AudioGraph> Drop for Session<G> {
  fn drop(&mut self) {
    if let Some(mut ticker) = self.ticker.take() {
      ticker.stop();
      self.engine.lock().stop();
    }
  }
}

fn broadcast(subscribers: &Subscribers, snapshot: EngineSnapshot) {
  subscribers.lock().retain(|tx| match tx.try_send(snapshot) {
    Ok(()) | Err(TrySendError::Full(_)) => true,
    Err(TrySendError::Disconnected(_)) => false,
  });
}
