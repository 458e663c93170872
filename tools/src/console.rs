//! Text render surface. Writes a line per state change to stdout.

use chrono::Local;
use spectator_core::{
    clock::local_now_ms,
    render::{DayScene, HudState, RenderSurface, StaticKind, StaticView},
    snapshot::{LobbyStatus, Phase},
    types::{DayNumber, Millis},
};

/// Minimum spacing between two day lines for the same day.
const DAY_LINE_EVERY_MS: Millis = 1000;

pub struct ConsoleSurface {
    throttle_ms: Millis,
    last_day:    Option<(DayNumber, Millis)>,
    last_static: Option<(StaticKind, bool)>,
    last_hud:    Option<(LobbyStatus, Phase, DayNumber)>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self {
            throttle_ms: DAY_LINE_EVERY_MS,
            last_day:    None,
            last_static: None,
            last_hud:    None,
        }
    }

    /// Prints every scene it is given.
    pub fn unthrottled() -> Self {
        Self { throttle_ms: 0, ..Self::new() }
    }

    pub fn notice(&mut self, message: &str) {
        println!("{} {message}", stamp());
    }
}

fn stamp() -> String {
    Local::now().format("[%H:%M:%S]").to_string()
}

impl RenderSurface for ConsoleSurface {
    fn draw_day(&mut self, scene: &DayScene<'_>) {
        let now = local_now_ms();
        if let Some((day, at)) = self.last_day {
            if day == scene.day && now - at < self.throttle_ms {
                return;
            }
        }
        self.last_day = Some((scene.day, now));
        self.last_static = None;

        let low = scene.creatures.iter().filter(|c| c.is_low_energy()).count();
        let carrying = scene.creatures.iter().filter(|c| c.carried_food > 0).count();
        println!(
            "{} day {:>3} {:>5.1}%  frames {}->{} w={:.2}  creatures {:>3} (low {low}, carrying {carrying})  food {}",
            stamp(),
            scene.day,
            scene.progress * 100.0,
            scene.i0,
            scene.i1,
            scene.weight,
            scene.creatures.len(),
            scene.foods.len(),
        );
    }

    fn draw_static(&mut self, view: &StaticView<'_>) {
        let key = (view.kind, view.winner.is_some());
        if self.last_static == Some(key) {
            return;
        }
        self.last_static = Some(key);
        self.last_day = None;

        println!("{} {}", stamp(), view.kind.caption());
        for base in view.bases {
            println!("    base {} {:<16} ({:.0}, {:.0}) {}", base.team, base.name, base.x, base.y, base.color);
        }
        if let Some(winner) = view.winner {
            let team = winner.slot.map_or_else(|| "?".to_string(), |s| s.to_string());
            println!(
                "    Winner: {} (team {team}) with {} alive",
                winner.name.as_deref().unwrap_or("unknown"),
                winner.alive
            );
        }
    }

    fn update_hud(&mut self, hud: &HudState) {
        let key = (hud.status, hud.phase, hud.day);
        if self.last_hud == Some(key) {
            return;
        }
        self.last_hud = Some(key);

        println!(
            "{} {:?} | day {}/{} | food/day {} | {}",
            stamp(),
            hud.status,
            hud.day,
            hud.max_days,
            hud.food_per_day,
            hud.headline()
        );
        for slot in &hud.roster {
            let me = if hud.my_slot == Some(slot.slot_index) { " (you)" } else { "" };
            println!(
                "    slot {} {:<16}{me} coins {:>4} alive {:>3} size {:.2} speed {:.2}",
                slot.slot_index, slot.display_name, slot.coins, slot.alive, slot.avg_size, slot.avg_speed
            );
        }
        if hud.can_purchase {
            if let Some(shop) = &hud.shop {
                println!("    {} | {}", shop.energy_label(), shop.vision_label());
            }
        }
    }
}
