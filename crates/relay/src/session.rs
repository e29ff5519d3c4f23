//! WebSocket session lifecycle, from upgrade to disconnect
//!
//! 1. Register a [`Connection`] and spawn the outbound writer
//! 2. Dispatch each inbound frame through [`SessionHandler`]
//! 3. On disconnect, leave the room and let the writer drain

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use contracts::{Clock, ClientMessage, RoomId, RoomMember, ServerMessage};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use observability::metrics;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::connection::{Connection, Outbound};
use crate::coordinator::StartCoordinator;
use crate::rate_limiter::RateLimiter;
use crate::registry::RoomRegistry;
use crate::server::AppState;

/// Close code for oversized frames
pub const CLOSE_MESSAGE_TOO_BIG: u16 = 1009;

/// Close code for policy violations (rejected origin)
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// How long the writer gets to flush after the reader stops
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// What the session loop does after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Close { code: u16, reason: &'static str },
}

/// Protocol handling for one connection, independent of the socket
pub struct SessionHandler {
    connection: Arc<Connection>,
    registry: Arc<RoomRegistry>,
    coordinator: Arc<StartCoordinator>,
    clock: Arc<dyn Clock>,
    ping_limiter: RateLimiter,
    start_limiter: RateLimiter,
    max_message_bytes: usize,
}

impl SessionHandler {
    pub fn new(connection: Arc<Connection>, state: &AppState) -> Self {
        Self {
            connection,
            registry: state.registry.clone(),
            coordinator: state.coordinator.clone(),
            clock: state.clock.clone(),
            ping_limiter: RateLimiter::new(state.config.ping_limit),
            start_limiter: RateLimiter::new(state.config.start_limit),
            max_message_bytes: state.config.max_message_bytes,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Handle one text frame.
    pub fn handle_text(&mut self, text: &str) -> Control {
        if text.len() > self.max_message_bytes {
            debug!(
                connection_id = %self.connection.id(),
                len = text.len(),
                "message too large"
            );
            return Control::Close {
                code: CLOSE_MESSAGE_TOO_BIG,
                reason: "Message too large",
            };
        }

        match ClientMessage::decode(text) {
            Some(ClientMessage::Join { room_id }) => self.on_join(room_id),
            Some(ClientMessage::Ping { t0 }) => self.on_ping(t0),
            Some(ClientMessage::StartReq { delay_ms }) => self.on_start(delay_ms),
            None => debug!(connection_id = %self.connection.id(), "dropping malformed message"),
        }
        Control::Continue
    }

    fn on_join(&mut self, room_id: RoomId) {
        let member: Arc<dyn RoomMember> = self.connection.clone();
        let previous = self.registry.join(room_id.clone(), member);
        self.connection.send_message(&ServerMessage::Joined {
            room_id: room_id.clone(),
        });

        metrics::record_join(self.registry.room_count());
        info!(
            room_id = %room_id,
            previous = ?previous.as_deref(),
            connection_id = %self.connection.id(),
            "JOIN"
        );
    }

    fn on_ping(&mut self, t0: serde_json::Number) {
        let now = self.clock.now_ms();
        if !self.ping_limiter.try_acquire(now) {
            metrics::record_rate_limited("ping");
            debug!(connection_id = %self.connection.id(), "ping rate limited");
            return;
        }
        self.connection
            .send_message(&ServerMessage::Pong { t0, t1: now });
        metrics::record_ping();
    }

    fn on_start(&mut self, delay_ms: Option<f64>) {
        if !self.start_limiter.try_acquire(self.clock.now_ms()) {
            metrics::record_rate_limited("start");
            debug!(connection_id = %self.connection.id(), "start rate limited");
            return;
        }

        match self.coordinator.request_start(self.connection.id(), delay_ms) {
            Ok(Some(_)) => {}
            Ok(None) => debug!(
                connection_id = %self.connection.id(),
                "start request outside any room ignored"
            ),
            Err(e) => debug!(connection_id = %self.connection.id(), error = %e, "start failed"),
        }
    }

    /// Leave the room and stop routing to this connection.
    pub fn finish(&self) {
        self.connection.mark_closed();
        if self.registry.leave(self.connection.id()).is_some() {
            metrics::record_rooms_active(self.registry.room_count());
        }
    }
}

/// Run a WebSocket session for an accepted connection.
#[instrument(name = "session", skip_all, fields(connection_id))]
pub async fn run_session(socket: WebSocket, state: AppState) {
    let started = Instant::now();
    let id = state.ids.next(state.clock.now_ms());
    tracing::Span::current().record("connection_id", tracing::field::display(&id));

    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel(state.config.send_queue_capacity);
    let connection = Arc::new(Connection::new(id.clone(), tx));
    let writer = tokio::spawn(write_outbound(sink, rx));

    metrics::record_connection_opened();
    info!(connection_id = %id, "CONNECTED");

    let mut handler = SessionHandler::new(connection, &state);
    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "read failed");
                break;
            }
        };

        let control = match frame {
            Message::Text(text) => handler.handle_text(text.as_str()),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => handler.handle_text(text),
                Err(_) => Control::Continue,
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => Control::Continue,
        };

        if let Control::Close { code, reason } = control {
            handler.connection().close(code, reason).await;
            break;
        }
    }

    handler.finish();
    // last sender goes away with the handler; the writer then drains and exits
    drop(handler);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        debug!("writer did not drain in time");
    }

    metrics::record_connection_closed(started.elapsed().as_secs_f64());
    info!(connection_id = %id, "DISCONNECTED");
}

/// Drain queued frames into the socket.
async fn write_outbound(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(outbound) = rx.recv().await {
        let (message, last) = match outbound {
            Outbound::Text(text) => (Message::Text(Utf8Bytes::from(text.to_string())), false),
            Outbound::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: Utf8Bytes::from_static(reason),
                })),
                true,
            ),
        };
        if sink.send(message).await.is_err() || last {
            return;
        }
    }
    let _ = sink.close().await;
}
