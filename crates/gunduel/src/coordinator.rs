//! The coordinator: a single Tokio task that owns all lobby and session
//! state.
//!
//! Connection handlers never touch the registry, queue, or sessions
//! directly. They send [`Command`]s through a [`CoordinatorHandle`] and the
//! coordinator applies them one at a time, so every event sees the effects
//! of the one before it. Delayed teardowns re-enter the same loop as
//! [`Fired`] notices.

use gunduel_lobby::{ClientSender, ConnectionRegistry, Gateway, MatchQueue};
use gunduel_protocol::{ClientId, ClientMessage, ServerMessage, SessionId};
use gunduel_session::{EndReason, HitOutcome, MatchConfig, SessionManager};
use gunduel_timer::{DeferredActions, Fired};
use tokio::sync::{mpsc, oneshot};

use crate::GunduelError;

/// Commands sent to the coordinator through its channel.
pub(crate) enum Command {
    /// A client connected; `sender` reaches its connection handler.
    Connect {
        client_id: ClientId,
        sender: ClientSender,
    },

    /// A client's connection closed.
    Disconnect { client_id: ClientId },

    /// A decoded message from a client.
    Event {
        client_id: ClientId,
        msg: ClientMessage,
    },

    /// Request a snapshot of coordinator counters.
    GetStats {
        reply: oneshot::Sender<CoordinatorStats>,
    },

    /// Stop the coordinator. Every client's outbound channel closes.
    Shutdown,
}

/// Counters describing what the coordinator currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Connected clients.
    pub clients: usize,
    /// Clients waiting for an opponent.
    pub queued: usize,
    /// Live sessions, including won ones awaiting teardown.
    pub sessions: usize,
    /// Scheduled teardowns that haven't fired yet.
    pub pending_teardowns: usize,
}

/// Handle to the running coordinator.
///
/// Cheap to clone: it's an `mpsc::Sender` wrapper. Every connection
/// handler holds one.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Registers a client and the channel its notifications go to.
    pub async fn connect(
        &self,
        client_id: ClientId,
        sender: ClientSender,
    ) -> Result<(), GunduelError> {
        self.send(Command::Connect { client_id, sender }).await
    }

    /// Reports that a client's connection closed.
    pub async fn disconnect(&self, client_id: ClientId) -> Result<(), GunduelError> {
        self.send(Command::Disconnect { client_id }).await
    }

    /// Delivers a client message (fire-and-forget).
    pub async fn event(
        &self,
        client_id: ClientId,
        msg: ClientMessage,
    ) -> Result<(), GunduelError> {
        self.send(Command::Event { client_id, msg }).await
    }

    /// Requests the current counters.
    pub async fn stats(&self) -> Result<CoordinatorStats, GunduelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::GetStats { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| GunduelError::CoordinatorGone)
    }

    /// Tells the coordinator to stop.
    pub async fn shutdown(&self) -> Result<(), GunduelError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, cmd: Command) -> Result<(), GunduelError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| GunduelError::CoordinatorGone)
    }
}

/// The coordinator state. Runs inside a Tokio task.
pub struct Coordinator {
    registry: ConnectionRegistry,
    queue: MatchQueue,
    sessions: SessionManager,
    /// Post-win teardowns, keyed by session.
    teardowns: DeferredActions<SessionId>,
}

impl Coordinator {
    /// Spawns the coordinator task and returns a handle to it.
    ///
    /// `buffer` is the command channel capacity. Must be called from
    /// within a Tokio runtime.
    pub fn spawn(config: MatchConfig, buffer: usize) -> CoordinatorHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(buffer.max(1));
        let (coordinator, fired_rx) = Self::new(config);
        tokio::spawn(coordinator.run(cmd_rx, fired_rx));
        CoordinatorHandle { sender: cmd_tx }
    }

    fn new(config: MatchConfig) -> (Self, mpsc::UnboundedReceiver<Fired<SessionId>>) {
        let (teardowns, fired_rx) = DeferredActions::new();
        let coordinator = Self {
            registry: ConnectionRegistry::new(),
            queue: MatchQueue::new(),
            sessions: SessionManager::new(config),
            teardowns,
        };
        (coordinator, fired_rx)
    }

    /// Processes commands and teardown notices until shutdown, or until
    /// every handle is dropped.
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut fired_rx: mpsc::UnboundedReceiver<Fired<SessionId>>,
    ) {
        tracing::info!("coordinator started");

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Connect { client_id, sender }) => {
                        self.on_connect(client_id, sender);
                    }
                    Some(Command::Disconnect { client_id }) => {
                        self.on_disconnect(client_id);
                    }
                    Some(Command::Event { client_id, msg }) => {
                        self.on_event(client_id, msg);
                    }
                    Some(Command::GetStats { reply }) => {
                        let _ = reply.send(self.stats());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(fired) = fired_rx.recv() => {
                    self.on_teardown_due(fired);
                }
            }
        }

        tracing::info!(
            clients = self.registry.len(),
            sessions = self.sessions.len(),
            "coordinator stopped"
        );
    }

    fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            clients: self.registry.len(),
            queued: self.queue.len(),
            sessions: self.sessions.len(),
            pending_teardowns: self.teardowns.len(),
        }
    }

    fn on_connect(&mut self, client_id: ClientId, sender: ClientSender) {
        if let Err(e) = self.registry.register(client_id, sender) {
            tracing::warn!(%client_id, error = %e, "duplicate connect ignored");
            return;
        }
        self.registry
            .emit(client_id, ServerMessage::Connected { client_id });
    }

    fn on_disconnect(&mut self, client_id: ClientId) {
        match self.registry.unregister(client_id) {
            Ok(connected_for) => {
                tracing::info!(
                    %client_id,
                    connected_ms = connected_for.as_millis() as u64,
                    "client disconnected"
                );
            }
            Err(e) => tracing::warn!(%client_id, error = %e, "disconnect for unknown client"),
        }

        if self.queue.remove(&client_id) {
            tracing::debug!(%client_id, "removed from queue");
        }
        if let Some(session_id) = self.sessions.lookup_session_for(&client_id) {
            self.end_session(session_id, EndReason::Disconnected(client_id));
        }
    }

    fn on_event(&mut self, client_id: ClientId, msg: ClientMessage) {
        // A late event from a torn-down handler must not queue a ghost.
        if !self.registry.is_connected(&client_id) {
            tracing::debug!(%client_id, "event from unregistered client dropped");
            return;
        }
        match msg {
            ClientMessage::FindMatch => self.on_find_match(client_id),
            ClientMessage::LeaveQueue => {
                if self.queue.remove(&client_id) {
                    tracing::info!(%client_id, "left queue");
                }
            }
            ClientMessage::LeaveMatch => match self.sessions.lookup_session_for(&client_id) {
                Some(session_id) => self.end_session(session_id, EndReason::Left(client_id)),
                None => tracing::debug!(%client_id, "leaveMatch outside a session ignored"),
            },
            ClientMessage::PlayerUpdate(delta) => {
                if let Err(e) = self.sessions.handle_update(client_id, delta, &self.registry) {
                    tracing::debug!(%client_id, error = %e, "playerUpdate ignored");
                }
            }
            ClientMessage::Shoot { gun_side } => {
                if let Err(e) = self.sessions.handle_shot(client_id, gun_side, &self.registry) {
                    tracing::debug!(%client_id, error = %e, "shoot ignored");
                }
            }
            ClientMessage::PlayerHit(hit) => {
                match self.sessions.handle_hit(client_id, hit, &self.registry) {
                    Ok(HitOutcome::Continue) => {}
                    Ok(HitOutcome::MatchWon { winner }) => {
                        if let Some(session_id) = self.sessions.lookup_session_for(&winner) {
                            let delay = self.sessions.config().teardown_delay;
                            self.teardowns.schedule(session_id, delay);
                        }
                    }
                    Err(e) => tracing::debug!(%client_id, error = %e, "playerHit ignored"),
                }
            }
        }
    }

    fn on_find_match(&mut self, client_id: ClientId) {
        if let Some(session_id) = self.sessions.lookup_session_for(&client_id) {
            tracing::debug!(%client_id, %session_id, "findMatch while in a session ignored");
            return;
        }
        if !self.queue.enqueue(client_id) {
            tracing::debug!(%client_id, "already queued");
            return;
        }
        tracing::info!(%client_id, queued = self.queue.len(), "client queued");

        while let Some((a, b)) = self.queue.try_pair() {
            if let Err(e) = self.sessions.create_session(a, b, &self.registry) {
                tracing::warn!(player_a = %a, player_b = %b, error = %e, "pairing failed");
            }
        }
    }

    fn on_teardown_due(&mut self, fired: Fired<SessionId>) {
        if !self.teardowns.acknowledge(&fired) {
            return;
        }
        let session_id = fired.key;
        if self.sessions.get(&session_id).is_none() {
            tracing::debug!(%session_id, "teardown due for a session already gone");
            return;
        }
        self.end_session(session_id, EndReason::MatchComplete);
    }

    fn end_session(&mut self, session_id: SessionId, reason: EndReason) {
        self.teardowns.cancel(&session_id);
        self.sessions.end_session(session_id, reason, &self.registry);
    }
}
