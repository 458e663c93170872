//! The render seam.
//!
//! RULE: the core never draws. It computes visual state and hands it to a
//! `RenderSurface`. Per render pass the surface receives either one
//! `draw_day` call from the live playback session or one `draw_static`
//! call from the poller, never both.

use crate::{
    snapshot::{LobbyStatus, Phase, ServerSnapshot, ShopPrices, SlotInfo, Winner},
    types::{CreatureId, DayNumber, TeamId},
};
use serde::{Deserialize, Serialize};

const TEAM_COLORS: [&str; 4] = ["#3b82f6", "#ef4444", "#22c55e", "#facc15"];
const UNKNOWN_TEAM_COLOR: &str = "#aaaaaa";

pub const MIN_CREATURE_SCALE: f64 = 0.55;
pub const MAX_CREATURE_SCALE: f64 = 2.3;
pub const DEFAULT_ENERGY_MAX: f64 = 100.0;
/// At or below this energy ratio a creature is shown as low on energy.
pub const LOW_ENERGY_RATIO: f64 = 0.45;

/// Fixed palette for teams 1..=4; anything else is grey.
pub fn team_color(team: Option<TeamId>) -> &'static str {
    match team {
        Some(t @ 1..=4) => TEAM_COLORS[(t - 1) as usize],
        _ => UNKNOWN_TEAM_COLOR,
    }
}

/// A team's home base, drawn under every view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseMarker {
    pub team:  TeamId,
    pub name:  String,
    pub x:     f64,
    pub y:     f64,
    pub color: &'static str,
}

impl BaseMarker {
    pub fn from_slot(slot: &SlotInfo) -> Self {
        Self {
            team:  slot.slot_index,
            name:  slot.display_name.clone(),
            x:     slot.base_x,
            y:     slot.base_y,
            color: team_color(Some(slot.slot_index)),
        }
    }
}

pub fn base_markers(slots: &[SlotInfo]) -> Vec<BaseMarker> {
    slots.iter().map(BaseMarker::from_slot).collect()
}

/// Interpolated state of one creature for one render pass.
/// `x`, `y` and `energy` are blended; the rest come from the earlier frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureVisual {
    pub id:           CreatureId,
    pub x:            f64,
    pub y:            f64,
    pub energy:       f64,
    pub size:         Option<f64>,
    pub energy_max:   Option<f64>,
    pub team:         Option<TeamId>,
    pub carried_food: u32,
}

impl CreatureVisual {
    pub fn scale(&self) -> f64 {
        self.size
            .unwrap_or(1.0)
            .clamp(MIN_CREATURE_SCALE, MAX_CREATURE_SCALE)
    }

    pub fn shown_energy(&self) -> i64 {
        (self.energy.round() as i64).max(0)
    }

    pub fn shown_energy_max(&self) -> i64 {
        (self.energy_max.unwrap_or(DEFAULT_ENERGY_MAX).round() as i64).max(1)
    }

    pub fn is_low_energy(&self) -> bool {
        (self.shown_energy() as f64 / self.shown_energy_max() as f64) <= LOW_ENERGY_RATIO
    }

    pub fn tint(&self) -> &'static str {
        team_color(self.team)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoodVisual {
    pub x: f64,
    pub y: f64,
}

/// Everything a surface needs to draw one instant of a day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayScene<'a> {
    pub day:       DayNumber,
    pub progress:  f64,
    pub i0:        usize,
    pub i1:        usize,
    pub weight:    f64,
    pub creatures: Vec<CreatureVisual>,
    pub foods:     Vec<FoodVisual>,
    pub bases:     &'a [BaseMarker],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticKind {
    Waiting,
    Paused,
    Finished,
}

impl StaticKind {
    pub fn caption(&self) -> &'static str {
        match self {
            StaticKind::Waiting  => "Waiting / not started.",
            StaticKind::Paused   => "Pause: buy upgrades.",
            StaticKind::Finished => "Match finished.",
        }
    }
}

/// A non-animated view drawn by the poller.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticView<'a> {
    pub kind:   StaticKind,
    pub bases:  &'a [BaseMarker],
    /// Only set for `Finished`, and only once a winner has been latched.
    pub winner: Option<&'a Winner>,
}

/// Per-poll status shown next to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct HudState {
    pub status:       LobbyStatus,
    pub phase:        Phase,
    pub day:          DayNumber,
    pub max_days:     DayNumber,
    pub food_per_day: u32,
    pub seconds_left: Option<i64>,
    pub can_purchase: bool,
    pub shop:         Option<ShopPrices>,
    pub roster:       Vec<SlotInfo>,
    pub my_slot:      Option<TeamId>,
}

impl HudState {
    pub fn from_snapshot(snapshot: &ServerSnapshot) -> Self {
        Self {
            status:       snapshot.status,
            phase:        snapshot.phase,
            day:          snapshot.day,
            max_days:     snapshot.max_days,
            food_per_day: snapshot.food_per_day,
            seconds_left: snapshot.seconds_left(),
            // Finished matches never allow purchases, whatever the phase says.
            can_purchase: snapshot.can_purchase(),
            shop:         snapshot.shop,
            roster:       snapshot.slots.clone(),
            my_slot:      snapshot.my_slot,
        }
    }

    pub fn headline(&self) -> String {
        match (self.seconds_left, self.phase) {
            (Some(left), Phase::Pause) => format!("Pause: buy upgrades - next day in {left}s"),
            (Some(left), _)            => format!("Day in progress - ends in {left}s"),
            (None, phase)              => format!("Phase: {phase:?}"),
        }
    }
}

pub trait RenderSurface {
    /// Draw one interpolated instant of the playing day.
    fn draw_day(&mut self, scene: &DayScene<'_>);

    /// Draw a waiting, paused or finished view.
    fn draw_static(&mut self, view: &StaticView<'_>);

    /// Status line, roster and purchase availability. Called once per poll.
    fn update_hud(&mut self, _hud: &HudState) {}
}
