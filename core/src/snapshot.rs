//! Lobby snapshots: the authoritative state returned by each poll.
//!
//! `StateResponse` mirrors the wire shape. `ServerSnapshot` is the
//! normalised form the poller works with: timestamps resolved to Unix
//! milliseconds, server time anchored through `ClockSync`.
//! A snapshot is immutable once built and is superseded by the next poll.

use crate::{
    clock::{parse_optional_ms, ClockSync},
    lenient,
    types::{DayNumber, LobbyId, Millis, TeamId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Day,
    Pause,
    Finished,
    /// Also the fallback for phases this client does not know.
    #[default]
    #[serde(other)]
    Waiting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyStatus {
    Running,
    Finished,
    /// The server calls this `WAITING`; unknown statuses land here too.
    #[default]
    #[serde(alias = "WAITING", other)]
    Pending,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotInfo {
    #[serde(deserialize_with = "lenient::count")]
    pub slot_index:   TeamId,
    #[serde(deserialize_with = "lenient::text")]
    pub display_name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub color_hex:    String,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_bot:       bool,
    #[serde(deserialize_with = "lenient::int")]
    pub coins:        i64,
    #[serde(deserialize_with = "lenient::int")]
    pub energy_bonus: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub vision_bonus: i64,
    #[serde(deserialize_with = "lenient::count")]
    pub alive:        u32,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_size:     f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_speed:    f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_danger:   f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_energy:   f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_vision:   f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub base_x:       f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub base_y:       f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopPrices {
    pub energy_cost: i64,
    pub vision_cost: i64,
    pub energy_add:  i64,
    pub vision_add:  i64,
}

impl ShopPrices {
    pub fn energy_label(&self) -> String {
        format!("Buy energy (+{}) - {} coins", self.energy_add, self.energy_cost)
    }

    pub fn vision_label(&self) -> String {
        format!("Buy vision (+{}) - {} coins", self.vision_add, self.vision_cost)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Winner {
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub slot:  Option<TeamId>,
    pub name:  Option<String>,
    /// The server reports -1 when nobody could win; that reads as 0.
    #[serde(deserialize_with = "lenient::count")]
    pub alive: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyState {
    pub id:                  LobbyId,
    pub name:                String,
    pub status:              LobbyStatus,
    #[serde(deserialize_with = "lenient::count")]
    pub day:                 DayNumber,
    #[serde(deserialize_with = "lenient::count")]
    pub max_days:            DayNumber,
    pub map_w:               u32,
    pub map_h:               u32,
    pub food_per_day:        u32,
    pub phase:               Phase,
    pub phase_started_at:    Option<String>,
    pub phase_end_at:        Option<String>,
    #[serde(deserialize_with = "lenient::count")]
    pub current_payload_day: DayNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seat {
    pub slot: Option<TeamId>,
}

/// Body of `GET /api/lobby/<id>/state/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateResponse {
    pub server_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt")]
    pub winner:      Option<Winner>,
    #[serde(deserialize_with = "lenient::opt")]
    pub shop:        Option<ShopPrices>,
    pub lobby:       LobbyState,
    pub me:          Seat,
    #[serde(deserialize_with = "lenient::seq")]
    pub slots:       Vec<SlotInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSnapshot {
    pub server_now_ms:       Millis,
    pub phase:               Phase,
    pub status:              LobbyStatus,
    pub day:                 DayNumber,
    pub max_days:            DayNumber,
    pub phase_start_ms:      Option<Millis>,
    pub phase_end_ms:        Option<Millis>,
    pub current_payload_day: DayNumber,
    pub map_size:            (u32, u32),
    pub food_per_day:        u32,
    pub slots:               Vec<SlotInfo>,
    pub shop:                Option<ShopPrices>,
    pub winner:              Option<Winner>,
    pub my_slot:             Option<TeamId>,
}

impl ServerSnapshot {
    /// Normalise a poll response received at `local_now`. Records the
    /// reported server time into `clock` as a side effect.
    pub fn from_response(response: StateResponse, clock: &mut ClockSync, local_now: Millis) -> Self {
        let server_now_ms = clock.observe(response.server_time.as_deref(), local_now);
        let lobby = response.lobby;
        Self {
            server_now_ms,
            phase:               lobby.phase,
            status:              lobby.status,
            day:                 lobby.day,
            max_days:            lobby.max_days,
            phase_start_ms:      parse_optional_ms(lobby.phase_started_at.as_deref()),
            phase_end_ms:        parse_optional_ms(lobby.phase_end_at.as_deref()),
            current_payload_day: lobby.current_payload_day,
            map_size:            (lobby.map_w, lobby.map_h),
            food_per_day:        lobby.food_per_day,
            slots:               response.slots,
            shop:                response.shop,
            winner:              response.winner,
            my_slot:             response.me.slot,
        }
    }

    /// Upgrades can only be bought during a running match's pause.
    pub fn can_purchase(&self) -> bool {
        self.phase == Phase::Pause && self.status == LobbyStatus::Running
    }

    /// Whole seconds until the current phase ends, rounded up, never negative.
    pub fn seconds_left(&self) -> Option<i64> {
        let end = self.phase_end_ms?;
        let remaining = (end - self.server_now_ms).max(0);
        Some((remaining + 999) / 1000)
    }

    /// True when this poll asks for a day to be played back.
    pub fn wants_playback(&self) -> bool {
        self.status == LobbyStatus::Running
            && self.phase == Phase::Day
            && self.current_payload_day > 0
    }
}
