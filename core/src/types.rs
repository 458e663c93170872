//! Shared primitive types used across the spectator.

/// One simulation day. Day payloads are numbered from 1.
pub type DayNumber = u32;

/// Milliseconds. Absolute values are Unix-epoch milliseconds;
/// spans (durations, offsets) use the same unit.
pub type Millis = i64;

/// Server-assigned creature identity, stable across a day's frames.
pub type CreatureId = i64;

/// Team (player slot) index, 1..=4 on the reference server.
pub type TeamId = u32;

/// The lobby being watched.
pub type LobbyId = u64;
