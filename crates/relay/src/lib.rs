//! # Relay
//!
//! Synchronized-start relay server.
//!
//! Clients join rooms over WebSocket, probe the server clock with
//! `PING`/`PONG`, and ask for a synchronized start with `START_REQ`. The
//! relay answers a start request by broadcasting one absolute server-clock
//! instant to every member of the requester's room.
//!
//! ## Components
//!
//! - [`RoomRegistry`]: room membership and broadcast routing
//! - [`StartCoordinator`]: lead-time policy and `START` fan-out
//! - [`RateLimiter`] / [`OriginPolicy`]: per-connection abuse limits
//! - [`RelayServer`]: axum router, session loop, graceful shutdown

pub mod connection;
pub mod coordinator;
pub mod error;
pub mod origin;
pub mod rate_limiter;
pub mod registry;
pub mod server;
pub mod session;

pub use coordinator::{lead_time, LeadPolicy, StartCoordinator, StartDispatch};
pub use error::{RelayError, Result};
pub use origin::OriginPolicy;
pub use rate_limiter::RateLimiter;
pub use registry::RoomRegistry;
pub use server::{router, AppState, RelayServer};
