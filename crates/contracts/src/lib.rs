//! # Contracts
//!
//! Frozen interface contracts shared by the relay and the sync client:
//! wire messages, identifiers, configuration shapes and the clock seam.
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Timestamps are wall-clock epoch milliseconds (`i64`)
//! - Offsets are "server time − local time" in milliseconds (`f64`, may be fractional)

mod client_config;
mod clock;
mod error;
mod event;
mod gosync_config;
mod ids;
mod member;
mod message;
mod relay_config;

pub use client_config::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::*;
pub use event::StartEvent;
pub use gosync_config::GosyncConfig;
pub use ids::{MemberId, RoomId, MAX_ROOM_ID_CHARS};
pub use member::RoomMember;
pub use message::{probe_key, ClientMessage, ServerMessage};
pub use relay_config::*;
