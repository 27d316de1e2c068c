//! `GunduelServer` builder and accept loop.
//!
//! Ties the layers together: the transport accepts sockets, each socket
//! gets a handler task speaking the JSON protocol, and every handler feeds
//! the one coordinator that owns lobby and session state.

use std::future::Future;
use std::net::SocketAddr;

use gunduel_protocol::{Codec, JsonCodec};
use gunduel_session::MatchConfig;
use gunduel_transport::{Transport, WebSocketTransport};

use crate::coordinator::{Coordinator, CoordinatorHandle};
use crate::handler::handle_connection;
use crate::{GunduelError, ServerConfig};

/// Configures and binds a [`GunduelServer`].
///
/// ```rust,no_run
/// use gunduel::prelude::*;
///
/// # async fn start() -> Result<(), GunduelError> {
/// let server = GunduelServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GunduelServerBuilder {
    config: ServerConfig,
}

impl GunduelServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting with `config`.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn match_config(mut self, config: MatchConfig) -> Self {
        self.config.match_config = config;
        self
    }

    /// Capacity of the coordinator's command channel.
    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.config.command_buffer = capacity;
        self
    }

    /// Binds the listener and starts the coordinator task.
    ///
    /// # Errors
    /// [`GunduelError::Transport`] if the address can't be bound.
    pub async fn build(self) -> Result<GunduelServer<JsonCodec>, GunduelError> {
        let ServerConfig {
            bind_addr,
            command_buffer,
            match_config,
        } = self.config;

        let transport = WebSocketTransport::bind(&bind_addr).await?;
        tracing::info!(
            addr = %bind_addr,
            win_score = match_config.win_score,
            teardown_ms = match_config.teardown_delay.as_millis() as u64,
            "server configured"
        );
        let coordinator = Coordinator::spawn(match_config, command_buffer);

        Ok(GunduelServer {
            transport,
            coordinator,
            codec: JsonCodec,
        })
    }
}

/// A bound server, ready to accept clients.
pub struct GunduelServer<C: Codec> {
    transport: WebSocketTransport,
    coordinator: CoordinatorHandle,
    codec: C,
}

impl GunduelServer<JsonCodec> {
    pub fn builder() -> GunduelServerBuilder {
        GunduelServerBuilder::new()
    }
}

impl<C> GunduelServer<C>
where
    C: Codec + Clone,
{
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the coordinator, e.g. for [`stats`](CoordinatorHandle::stats).
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.coordinator.clone()
    }

    /// Accepts clients forever.
    pub async fn run(self) -> Result<(), GunduelError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts clients until `shutdown` completes, then stops the
    /// coordinator. Connected clients see their socket close.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), GunduelError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("accepting clients");

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let coordinator = self.coordinator.clone();
                        let codec = self.codec.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, coordinator, codec).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    // A failed handshake only loses that one client.
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("shutting down");
        // Already stopped is fine.
        let _ = self.coordinator.shutdown().await;
        Ok(())
    }
}
