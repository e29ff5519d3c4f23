//! Commands into and events out of the client event loop

use std::time::Duration;

use contracts::RoomId;
use sync_engine::Phase;

/// Caller → event loop
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Join (or switch to) a room. Remembered across reconnects.
    Join(RoomId),
    /// Ask the relay for a synchronized start; `None` uses the server default
    Start { delay_ms: Option<f64> },
    /// Close the connection and stop
    Shutdown,
}

/// Event loop → caller
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected {
        url: String,
    },
    /// An estimation round closed
    Synced {
        offset_ms: f64,
        /// RTT of the adopted sample; `None` when the round got no replies
        best_rtt_ms: Option<i64>,
        samples: usize,
    },
    Joined {
        room_id: RoomId,
    },
    /// A `START` arrived and the countdown is armed
    StartScheduled {
        start_at: i64,
    },
    /// Countdown progress, once per coarse tick and on entering the fine phase
    Countdown {
        remaining_ms: f64,
        phase: Phase,
    },
    /// The countdown reached zero
    Go {
        start_at: i64,
        late_ms: f64,
    },
    Disconnected {
        retry_in: Duration,
    },
}
