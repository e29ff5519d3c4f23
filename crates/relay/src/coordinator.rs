//! StartCoordinator - turns a start request into one absolute instant
//!
//! 1. Requester must be in a room
//! 2. Requested delay is clamped into `[0, max_delay_ms]`; missing → default
//! 3. Lead time = `max(clamped, min_lead_ms)`
//! 4. `startAt = server_now + lead`, broadcast verbatim to the room

use std::sync::Arc;

use contracts::{Clock, ContractError, MemberId, RelayConfig, ServerMessage, StartEvent};
use tracing::{info, instrument};

use crate::registry::RoomRegistry;

/// Lead time for a requested delay
///
/// `max(clamp(requested_ms, 0, max_delay_ms), min_lead_ms)`, truncated to
/// whole milliseconds. NaN counts as zero.
pub fn lead_time(requested_ms: f64, min_lead_ms: u64, max_delay_ms: u64) -> u64 {
    let clamped = if requested_ms.is_nan() {
        0.0
    } else {
        requested_ms.clamp(0.0, max_delay_ms as f64)
    };
    (clamped as u64).max(min_lead_ms)
}

/// Lead-time settings taken from [`RelayConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadPolicy {
    pub min_lead_ms: u64,
    pub max_delay_ms: u64,
    pub default_delay_ms: u64,
}

impl LeadPolicy {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            min_lead_ms: config.min_lead_ms,
            max_delay_ms: config.max_delay_ms,
            default_delay_ms: config.default_delay_ms,
        }
    }

    /// Lead time for a request; `None` or NaN means the default delay.
    pub fn lead_for(&self, requested_ms: Option<f64>) -> u64 {
        let requested = requested_ms
            .filter(|ms| !ms.is_nan())
            .unwrap_or(self.default_delay_ms as f64);
        lead_time(requested, self.min_lead_ms, self.max_delay_ms)
    }
}

impl Default for LeadPolicy {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// A broadcast start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartDispatch {
    pub event: StartEvent,
    pub lead_ms: u64,
    /// Members that accepted the frame
    pub recipients: usize,
}

/// Server-side start coordinator
pub struct StartCoordinator {
    registry: Arc<RoomRegistry>,
    clock: Arc<dyn Clock>,
    policy: LeadPolicy,
}

impl StartCoordinator {
    pub fn new(registry: Arc<RoomRegistry>, clock: Arc<dyn Clock>, policy: LeadPolicy) -> Self {
        Self {
            registry,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> LeadPolicy {
        self.policy
    }

    /// Schedule and broadcast a start for the requester's room.
    ///
    /// Returns `Ok(None)` when the requester is not in a room.
    #[instrument(
        name = "request_start",
        level = "debug",
        skip_all,
        fields(requester = %requester, requested = ?requested_delay_ms)
    )]
    pub fn request_start(
        &self,
        requester: &MemberId,
        requested_delay_ms: Option<f64>,
    ) -> Result<Option<StartDispatch>, ContractError> {
        let Some(room_id) = self.registry.current_room(requester) else {
            return Ok(None);
        };

        let lead_ms = self.policy.lead_for(requested_delay_ms);
        let start_at = self
            .clock
            .now_ms()
            .saturating_add(i64::try_from(lead_ms).unwrap_or(i64::MAX));
        let event = StartEvent { room_id, start_at };

        let frame: Arc<str> = ServerMessage::from(&event).encode()?.into();
        let recipients = self.registry.broadcast(&event.room_id, frame);

        observability::metrics::record_start(lead_ms, recipients);
        info!(
            room_id = %event.room_id,
            start_at,
            lead_ms,
            recipients,
            connection_id = %requester,
            "START"
        );

        Ok(Some(StartDispatch {
            event,
            lead_ms,
            recipients,
        }))
    }
}
