//! Per-connection handle shared with the room registry
//!
//! Outbound frames go through a bounded channel drained by the session's
//! writer task, so routing never waits on a socket.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{MemberId, RoomMember, ServerMessage};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Frame queued for the writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(Arc<str>),
    /// Close handshake; the writer stops after sending it
    Close { code: u16, reason: &'static str },
}

/// One accepted WebSocket connection
pub struct Connection {
    id: MemberId,
    tx: mpsc::Sender<Outbound>,
    open: AtomicBool,
}

impl Connection {
    pub fn new(id: MemberId, tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            tx,
            open: AtomicBool::new(true),
        }
    }

    /// Encode and queue a reply to this connection only.
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        match message.encode() {
            Ok(text) => self.send_text(text.into()),
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "failed to encode reply");
                false
            }
        }
    }

    /// Stop accepting frames. Broadcasts skip this connection from now on.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Queue a close frame behind anything already pending.
    pub async fn close(&self, code: u16, reason: &'static str) {
        self.mark_closed();
        let _ = self.tx.send(Outbound::Close { code, reason }).await;
    }
}

impl RoomMember for Connection {
    fn id(&self) -> &MemberId {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn send_text(&self, text: Arc<str>) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.tx.try_send(Outbound::Text(text)) {
            Ok(()) => true,
            Err(e) => {
                trace!(connection_id = %self.id, error = %e, "outbound frame dropped");
                false
            }
        }
    }
}

/// Connection id generator: `c_<epoch-ms>_<counter>`
#[derive(Debug, Default)]
pub struct ConnectionIds {
    counter: AtomicU64,
}

impl ConnectionIds {
    pub fn next(&self, now_ms: i64) -> MemberId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        MemberId::from(format!("c_{now_ms}_{n}"))
    }
}
