//! StartEvent - StartCoordinator output
//!
//! The single absolute instant a room fires at.

use serde::{Deserialize, Serialize};

use crate::RoomId;

/// Synchronized start instruction for one room
///
/// Ephemeral: built once per accepted start request, broadcast, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    /// Target room
    pub room_id: RoomId,

    /// Absolute fire instant in server clock (epoch ms)
    pub start_at: i64,
}
