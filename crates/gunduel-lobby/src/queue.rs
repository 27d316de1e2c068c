//! FIFO matchmaking queue.

use std::collections::{HashSet, VecDeque};

use gunduel_protocol::ClientId;

/// Clients waiting for an opponent, oldest first.
///
/// `order` holds the FIFO sequence; `members` is an index kept in sync
/// with it so duplicate detection is O(1). The queue is unbounded.
#[derive(Debug, Default)]
pub struct MatchQueue {
    order: VecDeque<ClientId>,
    members: HashSet<ClientId>,
}

impl MatchQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a client to the back of the queue.
    ///
    /// Returns `false` (and changes nothing) if it is already waiting.
    pub fn enqueue(&mut self, client_id: ClientId) -> bool {
        if !self.members.insert(client_id) {
            return false;
        }
        self.order.push_back(client_id);
        tracing::debug!(%client_id, waiting = self.order.len(), "client queued");
        true
    }

    /// Removes and returns the two oldest clients, if at least two wait.
    ///
    /// Pairing strictly oldest-first means nobody starves.
    pub fn try_pair(&mut self) -> Option<(ClientId, ClientId)> {
        if self.order.len() < 2 {
            return None;
        }
        let first = self.order.pop_front()?;
        let second = self.order.pop_front()?;
        self.members.remove(&first);
        self.members.remove(&second);
        Some((first, second))
    }

    /// Removes a client wherever it sits. Returns `true` if it was queued.
    ///
    /// Idempotent: removing an absent client is a no-op.
    pub fn remove(&mut self, client_id: &ClientId) -> bool {
        if !self.members.remove(client_id) {
            return false;
        }
        self.order.retain(|queued| queued != client_id);
        true
    }

    /// Number of waiting clients.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
