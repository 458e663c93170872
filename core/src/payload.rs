//! Day payloads: the pre-computed frame sequence for one simulated day.
//!
//! Payloads are produced by the server once a day has been simulated and
//! never change afterwards. Every field is optional or defaulted: a malformed
//! entry is dropped or defaulted here, at the fetch boundary, so the render
//! path never sees a parse failure.

use crate::types::{CreatureId, DayNumber, Millis, TeamId};
use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureState {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub id:           Option<CreatureId>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub x:            Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub y:            Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub size:         Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub energy:       Option<f64>,
    #[serde(deserialize_with = "lenient::opt_f64")]
    pub energy_max:   Option<f64>,
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub owner:        Option<TeamId>,
    #[serde(deserialize_with = "lenient::count")]
    pub carried_food: u32,
    /// Absent means "not known to be alive" and is treated as dead.
    #[serde(deserialize_with = "lenient::flag")]
    pub alive:        bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodState {
    #[serde(deserialize_with = "lenient::opt_i64")]
    pub id:     Option<i64>,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub x:      f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub y:      f64,
    #[serde(deserialize_with = "lenient::flag")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub creatures: Vec<CreatureState>,
    #[serde(default, deserialize_with = "lenient::seq")]
    pub foods:     Vec<FoodState>,
}

/// Per-player outcome at the end of a day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerDayResult {
    #[serde(deserialize_with = "lenient::count")]
    pub slot:       TeamId,
    #[serde(deserialize_with = "lenient::text")]
    pub name:       String,
    #[serde(deserialize_with = "lenient::int")]
    pub coins:      i64,
    #[serde(deserialize_with = "lenient::count")]
    pub alive:      u32,
    #[serde(deserialize_with = "lenient::flag")]
    pub is_bot:     bool,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_size:   f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_speed:  f64,
    #[serde(deserialize_with = "lenient::f64_or_zero")]
    pub avg_danger: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    #[serde(deserialize_with = "lenient::count")]
    pub day_completed: DayNumber,
    #[serde(deserialize_with = "lenient::count")]
    pub births:        u32,
    #[serde(deserialize_with = "lenient::count")]
    pub deaths:        u32,
    #[serde(deserialize_with = "lenient::seq")]
    pub players:       Vec<PlayerDayResult>,
    #[serde(deserialize_with = "lenient::flag")]
    pub finished:      bool,
    #[serde(deserialize_with = "lenient::opt_u32")]
    pub winner_slot:   Option<TeamId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPayload {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub duration_ms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub frame_ms:    Option<f64>,
    /// `null` frames are kept as empty frames so indices stay aligned.
    #[serde(default, deserialize_with = "lenient_frames")]
    pub frames:      Vec<Frame>,
    #[serde(default, deserialize_with = "lenient::opt")]
    pub summary:     Option<DaySummary>,
}

fn lenient_frames<'de, D>(deserializer: D) -> Result<Vec<Frame>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

impl DayPayload {
    /// Wall-clock span of the whole frame sequence. Missing, zero, negative
    /// or non-finite durations normalise to 1 ms.
    pub fn normalized_duration_ms(&self) -> Millis {
        match self.duration_ms {
            Some(d) if d.is_finite() && d >= 1.0 => d.round() as Millis,
            _ => 1,
        }
    }

    /// Parse a payload from an arbitrary JSON value. `null` and values that
    /// are not payload-shaped yield `None`.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::warn!("Discarding malformed day payload: {e}");
                None
            }
        }
    }
}
