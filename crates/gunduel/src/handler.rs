//! Per-connection handler: bridges one socket and the coordinator.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Derive the `ClientId` and register an outbound channel
//!   2. Loop: decode inbound frames into coordinator events, and write
//!      coordinator notifications back to the socket
//!   3. On exit, report the disconnect

use gunduel_protocol::{ClientId, ClientMessage, Codec, ServerMessage};
use gunduel_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::GunduelError;
use crate::coordinator::CoordinatorHandle;

/// Drop guard that reports the disconnect when the handler exits.
///
/// Runs even if the handler bails out early with `?` or panics. `Drop`
/// is synchronous, so the report goes through a spawned task.
struct DisconnectGuard {
    client_id: ClientId,
    coordinator: CoordinatorHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let client_id = self.client_id;
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            // A stopped coordinator has nothing left to clean up.
            let _ = coordinator.disconnect(client_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    coordinator: CoordinatorHandle,
    codec: C,
) -> Result<(), GunduelError> {
    let client_id = ClientId::from(conn.id());
    tracing::debug!(conn_id = %conn.id(), peer = %conn.peer_addr(), %client_id, "handling new connection");

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    coordinator.connect(client_id, outbound_tx).await?;
    let _guard = DisconnectGuard {
        client_id,
        coordinator: coordinator.clone(),
    };

    loop {
        tokio::select! {
            incoming = conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%client_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%client_id, error = %e, "recv error");
                        break;
                    }
                };
                match codec.decode::<ClientMessage>(&data) {
                    Ok(msg) => coordinator.event(client_id, msg).await?,
                    Err(e) => {
                        tracing::debug!(%client_id, error = %e, "failed to decode client message");
                    }
                }
            }
            outbound = outbound_rx.recv() => {
                let Some(msg) = outbound else {
                    // The coordinator dropped our channel: it has shut down.
                    tracing::debug!(%client_id, "outbound channel closed");
                    let _ = conn.close().await;
                    break;
                };
                let bytes = codec.encode(&msg)?;
                conn.send(&bytes).await?;
            }
        }
    }

    // _guard drops here → disconnect is reported.
    Ok(())
}
