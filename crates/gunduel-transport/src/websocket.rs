//! WebSocket transport on top of `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Largest message a client may send. Duel messages are a few hundred
/// bytes; anything near this is garbage or abuse.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

type Sink = SplitSink<WebSocketStream<TcpStream>, Message>;
type Stream = SplitStream<WebSocketStream<TcpStream>>;

/// Listens for browser clients and upgrades them to WebSocket.
pub struct WebSocketTransport {
    listener: TcpListener,
    ws_config: WebSocketConfig,
    next_id: u64,
}

impl WebSocketTransport {
    /// Binds the listener.
    ///
    /// # Errors
    /// [`TransportError::Bind`] if the address is invalid or taken.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(MAX_MESSAGE_SIZE);

        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            ws_config,
            next_id: 1,
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (tcp, peer_addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        // Duel updates are tiny and latency-sensitive.
        if let Err(e) = tcp.set_nodelay(true) {
            tracing::debug!(%peer_addr, error = %e, "could not set TCP_NODELAY");
        }

        let ws = tokio_tungstenite::accept_async_with_config(tcp, Some(self.ws_config))
            .await
            .map_err(|e| TransportError::Handshake(to_io(io::ErrorKind::ConnectionRefused, e)))?;

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        tracing::debug!(%id, %peer_addr, "WebSocket upgrade complete");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer_addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    /// Differs from the requested address when binding port 0.
    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// One upgraded client socket.
///
/// Read and write halves sit behind separate locks, so a handler can wait
/// on `recv` and `send` from the same `select!`.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    sink: Mutex<Sink>,
    stream: Mutex<Stream>,
}

impl Connection for WebSocketConnection {
    /// UTF-8 payloads go out as text frames, which is what browser JSON
    /// clients read. Anything else goes out as binary.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let frame = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text),
            Err(_) => Message::binary(data.to_vec()),
        };
        let mut sink = self.sink.lock().await;
        sink.send(frame)
            .await
            .map_err(|e| TransportError::Send(to_io(io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(text.as_bytes().to_vec())),
                Ok(Message::Binary(bytes)) => return Ok(Some(bytes.to_vec())),
                Ok(Message::Close(frame)) => {
                    tracing::trace!(id = %self.id, ?frame, "close frame received");
                    return Ok(None);
                }
                // tungstenite answers pings on its own.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => {
                    return Err(TransportError::Receive(to_io(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        sink.close()
            .await
            .map_err(|e| TransportError::Send(to_io(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

fn to_io(kind: io::ErrorKind, err: tungstenite::Error) -> io::Error {
    match err {
        tungstenite::Error::Io(e) => e,
        other => io::Error::new(kind, other),
    }
}
