//! RoomMember trait - broadcast routing interface
//!
//! The transport owns each connection; rooms only hold a shared handle
//! that can answer "still open?" and accept an encoded message.

use std::sync::Arc;

use crate::MemberId;

/// A routable room member
pub trait RoomMember: Send + Sync {
    /// Connection identity
    fn id(&self) -> &MemberId;

    /// Whether the underlying connection can still take messages
    fn is_open(&self) -> bool;

    /// Queue an already-encoded text frame
    ///
    /// Must not block. Returns `false` if the frame was not accepted.
    fn send_text(&self, text: Arc<str>) -> bool;
}
