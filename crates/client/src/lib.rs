//! # Client
//!
//! Synchronized-start client for the relay.
//!
//! [`SyncClient`] connects over WebSocket, keeps a clock offset estimate
//! against the relay, joins a room and counts down to every `START` it
//! receives. Callers drive it through a [`ClientHandle`] and observe it
//! through a stream of [`ClientEvent`]s.
//!
//! ```ignore
//! let (handle, mut events) = SyncClient::new(config.client)?.spawn();
//! handle.join(RoomId::parse("r1").unwrap()).await?;
//! while let Some(event) = events.recv().await {
//!     if let ClientEvent::Go { .. } = event {
//!         println!("GO!");
//!     }
//! }
//! ```

mod client;
pub mod error;
mod event;
mod reconnect;

pub use client::{parse_server_url, ClientHandle, SyncClient};
pub use error::{ClientError, Result};
pub use event::{ClientCommand, ClientEvent};
pub use reconnect::ReconnectPolicy;
pub use sync_engine::Phase;
