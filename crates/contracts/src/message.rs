//! Wire protocol
//!
//! One JSON object per text frame, discriminated by `type`.
//! Decoding is lenient: anything malformed or unknown decodes to `None`
//! and is dropped by the receiver without further feedback.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

use crate::{ContractError, RoomId, StartEvent};

/// Client → server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Move this connection into a room
    #[serde(rename_all = "camelCase")]
    Join { room_id: RoomId },

    /// Offset probe carrying the client send time (epoch ms)
    ///
    /// Any JSON number is accepted and echoed back exactly as received.
    Ping { t0: Number },

    /// Request a synchronized start
    ///
    /// A missing or non-numeric `delayMs` decodes to `None`.
    #[serde(rename_all = "camelCase")]
    StartReq {
        #[serde(
            default,
            deserialize_with = "lenient_number",
            skip_serializing_if = "Option::is_none"
        )]
        delay_ms: Option<f64>,
    },
}

/// Server → client messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Join acknowledged
    #[serde(rename_all = "camelCase")]
    Joined { room_id: RoomId },

    /// Probe echo plus server receive time
    Pong {
        t0: Number,
        #[serde(deserialize_with = "epoch_ms")]
        t1: i64,
    },

    /// Absolute server-clock instant (epoch ms) to fire at
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(deserialize_with = "epoch_ms")]
        start_at: i64,
    },
}

impl ClientMessage {
    /// Decode a text frame, dropping anything malformed.
    pub fn decode(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Encode to a text frame.
    pub fn encode(&self) -> Result<String, ContractError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerMessage {
    /// Decode a text frame, dropping anything malformed.
    pub fn decode(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    /// Encode to a text frame.
    pub fn encode(&self) -> Result<String, ContractError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&StartEvent> for ServerMessage {
    fn from(event: &StartEvent) -> Self {
        ServerMessage::Start {
            start_at: event.start_at,
        }
    }
}

/// Probe key for an echoed `t0`: integral values only.
pub fn probe_key(t0: &Number) -> Option<i64> {
    t0.as_i64().or_else(|| {
        t0.as_f64()
            .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
            .map(|n| n as i64)
    })
}

/// Epoch-ms timestamp from any finite JSON number, rounded to the nearest ms.
fn epoch_ms<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = f64::deserialize(deserializer)?;
    if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
        return Err(D::Error::custom("timestamp out of range"));
    }
    Ok(ms.round() as i64)
}

/// Accept any JSON value; keep it only if it is a finite number.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|n| n.is_finite()))
}
