//! Shared fixtures: JSON builders and an in-memory render surface.

#![allow(dead_code)]

use serde_json::{json, Value};
use spectator_core::{
    payload::DayPayload,
    render::{CreatureVisual, DayScene, FoodVisual, HudState, RenderSurface, StaticKind, StaticView},
    snapshot::{StateResponse, Winner},
    types::{DayNumber, Millis},
};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 2024-01-01T00:00:00Z in Unix milliseconds.
pub const T0_MS: Millis = 1_704_067_200_000;

/// ISO-8601 text for `T0 + offset_ms`.
pub fn iso(offset_ms: Millis) -> String {
    let secs = offset_ms.div_euclid(1000);
    let millis = offset_ms.rem_euclid(1000);
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    format!("2024-01-01T{h:02}:{m:02}:{s:02}.{millis:03}Z")
}

pub fn creature(id: i64, x: f64, y: f64) -> Value {
    json!({ "id": id, "x": x, "y": y, "energy": 50.0, "size": 1.0, "owner": 1, "alive": true })
}

pub fn frame(creatures: Vec<Value>) -> Value {
    json!({ "creatures": creatures, "foods": [] })
}

pub fn payload(duration_ms: f64, frames: Vec<Value>) -> DayPayload {
    DayPayload::from_value(json!({ "duration_ms": duration_ms, "frame_ms": 50, "frames": frames }))
        .expect("payload fixture parses")
}

/// Three frames of one creature walking along x: 0, 10, 20.
pub fn walking_day() -> DayPayload {
    payload(
        1000.0,
        vec![
            frame(vec![creature(1, 0.0, 0.0)]),
            frame(vec![creature(1, 10.0, 5.0)]),
            frame(vec![creature(1, 20.0, 10.0)]),
        ],
    )
}

/// A poll response. `server_ms` and `phase_start_ms` are offsets from T0.
pub fn state(
    status: &str,
    phase: &str,
    payload_day: DayNumber,
    server_ms: Millis,
    phase_start_ms: Option<Millis>,
) -> StateResponse {
    serde_json::from_value(json!({
        "server_time": iso(server_ms),
        "winner": null,
        "shop": { "energy_cost": 10, "vision_cost": 15, "energy_add": 25, "vision_add": 1 },
        "lobby": {
            "id": 1,
            "name": "Test lobby",
            "status": status,
            "day": payload_day,
            "max_days": 5,
            "map_w": 800,
            "map_h": 600,
            "food_per_day": 40,
            "phase": phase,
            "phase_started_at": phase_start_ms.map(iso),
            "phase_end_at": phase_start_ms.map(|s| iso(s + 30_000)),
            "current_payload_day": payload_day,
        },
        "me": { "slot": 1 },
        "slots": [
            { "slot_index": 1, "display_name": "Ada", "base_x": 100.0, "base_y": 100.0 },
            { "slot_index": 2, "display_name": "Bot 2", "is_bot": true, "base_x": 700.0, "base_y": 500.0 },
        ],
    }))
    .expect("state fixture parses")
}

pub fn day_state(payload_day: DayNumber, server_ms: Millis, phase_start_ms: Millis) -> StateResponse {
    state("RUNNING", "DAY", payload_day, server_ms, Some(phase_start_ms))
}

pub fn finished_state(server_ms: Millis, winner: Option<Winner>) -> StateResponse {
    let mut response = state("FINISHED", "FINISHED", 5, server_ms, None);
    response.winner = winner;
    response
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnDay {
    pub day:       DayNumber,
    pub i0:        usize,
    pub i1:        usize,
    pub weight:    f64,
    pub creatures: Vec<CreatureVisual>,
    pub foods:     Vec<FoodVisual>,
    pub bases:     usize,
}

/// Render surface that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub days:    Vec<DrawnDay>,
    pub statics: Vec<(StaticKind, Option<Winner>)>,
    pub huds:    Vec<HudState>,
}

impl RecordingSurface {
    pub fn last_day(&self) -> &DrawnDay {
        self.days.last().expect("at least one day frame drawn")
    }
}

impl RenderSurface for RecordingSurface {
    fn draw_day(&mut self, scene: &DayScene<'_>) {
        self.days.push(DrawnDay {
            day:       scene.day,
            i0:        scene.i0,
            i1:        scene.i1,
            weight:    scene.weight,
            creatures: scene.creatures.clone(),
            foods:     scene.foods.clone(),
            bases:     scene.bases.len(),
        });
    }

    fn draw_static(&mut self, view: &StaticView<'_>) {
        self.statics.push((view.kind, view.winner.cloned()));
    }

    fn update_hud(&mut self, hud: &HudState) {
        self.huds.push(hud.clone());
    }
}
