//! Keyed, cancellable deferred actions for Gunduel.
//!
//! The coordinator has exactly one timing need: "tear this session down
//! five seconds after the match was won, unless it is already gone".
//! [`DeferredActions`] covers that without letting timers touch shared
//! state: when a delay elapses it only sends a [`Fired`] notice back over
//! a channel, and the owner decides what to do when it next reads it.
//!
//! # Integration
//!
//! ```ignore
//! let (mut timers, mut fired_rx) = DeferredActions::new();
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* may call timers.schedule(..) */ }
//!         Some(fired) = fired_rx.recv() => {
//!             if timers.acknowledge(&fired) {
//!                 // re-check the target still exists, then act
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! # Stale notices
//!
//! A delay can elapse in the same instant it is cancelled, so a notice may
//! already be in the channel when [`DeferredActions::cancel`] runs. Every
//! schedule gets a fresh generation number and [`DeferredActions::acknowledge`]
//! rejects notices whose generation is no longer current.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

/// Notice that the delay for `key` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired<K> {
    /// The key the action was scheduled under.
    pub key: K,
    generation: u64,
}

struct Pending {
    generation: u64,
    task: AbortHandle,
}

/// A set of delayed actions, at most one per key.
///
/// Must be used from within a Tokio runtime: scheduling spawns a task.
/// Dropping the set aborts everything still pending.
pub struct DeferredActions<K> {
    pending: HashMap<K, Pending>,
    fired_tx: mpsc::UnboundedSender<Fired<K>>,
    next_generation: u64,
}

impl<K> DeferredActions<K>
where
    K: Copy + Eq + Hash + fmt::Display + Send + 'static,
{
    /// Creates an empty set and the receiver its notices arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fired<K>>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let actions = Self {
            pending: HashMap::new(),
            fired_tx,
            next_generation: 0,
        };
        (actions, fired_rx)
    }

    /// Schedules a notice for `key` after `delay`.
    ///
    /// Replaces (and cancels) any action already pending under `key`.
    pub fn schedule(&mut self, key: K, delay: Duration) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let fired_tx = self.fired_tx.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The owner may have been dropped; nothing to notify then.
            let _ = fired_tx.send(Fired { key, generation });
        })
        .abort_handle();

        if let Some(previous) = self.pending.insert(key, Pending { generation, task }) {
            previous.task.abort();
            debug!(%key, "replaced pending deferred action");
        }
        debug!(%key, delay_ms = delay.as_millis() as u64, "deferred action scheduled");
    }

    /// Cancels the action pending under `key`. Returns `true` if one was.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(pending) => {
                pending.task.abort();
                debug!(%key, "deferred action cancelled");
                true
            }
            None => false,
        }
    }

    /// Consumes a notice from the receiver.
    ///
    /// Returns `true` if it belongs to the action currently pending under
    /// its key, which is then considered done. Returns `false` for notices
    /// of cancelled or replaced actions; those must be ignored.
    pub fn acknowledge(&mut self, fired: &Fired<K>) -> bool {
        match self.pending.get(&fired.key) {
            Some(pending) if pending.generation == fired.generation => {
                self.pending.remove(&fired.key);
                true
            }
            _ => {
                debug!(key = %fired.key, "ignoring stale deferred action");
                false
            }
        }
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K> Drop for DeferredActions<K> {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.task.abort();
        }
    }
}
