//! Server clock estimate: linear offset between local and server time.
//!
//! Every successful poll re-anchors the offset. Between polls the estimate
//! advances with the local clock. There is no drift correction; accuracy is
//! bounded by one poll interval.

use crate::{
    error::{SpectatorError, SpectatorResult},
    types::Millis,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local wall-clock time in Unix milliseconds.
pub fn local_now_ms() -> Millis {
    Utc::now().timestamp_millis()
}

/// Parse an ISO-8601 timestamp into Unix milliseconds.
/// Offset-less timestamps are taken as UTC.
pub fn parse_timestamp_ms(raw: &str) -> SpectatorResult<Millis> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_millis())
        .map_err(|_| SpectatorError::Timing { raw: raw.to_string() })
}

/// Lenient variant: absent or unparsable input yields `None`.
pub fn parse_optional_ms(raw: Option<&str>) -> Option<Millis> {
    let raw = raw?;
    match parse_timestamp_ms(raw) {
        Ok(ms) => Some(ms),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}

/// A `(server, local)` pair recorded at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockAnchor {
    pub server_ms: Millis,
    pub local_ms:  Millis,
}

impl ClockAnchor {
    /// Estimated server time at local time `local_now`.
    pub fn estimate(&self, local_now: Millis) -> Millis {
        self.server_ms + (local_now - self.local_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSync {
    anchor: ClockAnchor,
}

impl ClockSync {
    /// Start with a zero offset: server time is assumed equal to local time
    /// until the first poll lands.
    pub fn new(local_now: Millis) -> Self {
        Self {
            anchor: ClockAnchor { server_ms: local_now, local_ms: local_now },
        }
    }

    /// Record the server time reported by a poll received at `local_now`.
    /// Returns the server time actually recorded. A missing or unparsable
    /// timestamp falls back to the local clock.
    pub fn observe(&mut self, server_time: Option<&str>, local_now: Millis) -> Millis {
        let server_ms = match server_time.map(parse_timestamp_ms) {
            Some(Ok(ms)) => ms,
            Some(Err(e)) => {
                log::warn!("{e}; falling back to local clock");
                local_now
            }
            None => local_now,
        };
        self.anchor = ClockAnchor { server_ms, local_ms: local_now };
        server_ms
    }

    pub fn estimate(&self, local_now: Millis) -> Millis {
        self.anchor.estimate(local_now)
    }

    /// Server minus local, as of the last observation.
    pub fn offset_ms(&self) -> Millis {
        self.anchor.server_ms - self.anchor.local_ms
    }

    pub fn anchor(&self) -> ClockAnchor {
        self.anchor
    }
}
