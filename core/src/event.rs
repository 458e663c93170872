//! Lifecycle events reported by the poller.
//!
//! Every decision the poller makes about playback is returned as an event.
//! The runner logs them; tests assert on them.

use crate::{
    snapshot::{LobbyStatus, Phase, Winner},
    types::{DayNumber, Millis},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpectatorEvent {
    // ── Polling ────────────────────────────────────
    SnapshotApplied {
        server_now_ms: Millis,
        status: LobbyStatus,
        phase: Phase,
        payload_day: DayNumber,
    },

    // ── Payloads ───────────────────────────────────
    PayloadRequested {
        day: DayNumber,
    },
    PayloadCached {
        day: DayNumber,
        frames: usize,
    },
    PayloadFailed {
        day: DayNumber,
        reason: String,
    },

    // ── Playback ───────────────────────────────────
    SessionStarted {
        day: DayNumber,
        frames: usize,
        duration_ms: Millis,
    },
    SessionStopped {
        day: DayNumber,
    },

    // ── Match ──────────────────────────────────────
    WinnerLatched {
        winner: Winner,
    },
    MatchReset,
}

impl SpectatorEvent {
    /// Stable name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            SpectatorEvent::SnapshotApplied { .. }  => "snapshot_applied",
            SpectatorEvent::PayloadRequested { .. } => "payload_requested",
            SpectatorEvent::PayloadCached { .. }    => "payload_cached",
            SpectatorEvent::PayloadFailed { .. }    => "payload_failed",
            SpectatorEvent::SessionStarted { .. }   => "session_started",
            SpectatorEvent::SessionStopped { .. }   => "session_stopped",
            SpectatorEvent::WinnerLatched { .. }    => "winner_latched",
            SpectatorEvent::MatchReset              => "match_reset",
        }
    }
}
