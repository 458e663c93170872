//! Day playback: maps synchronized server time onto a day's frames.
//!
//! LIFECYCLE:
//!   - A `PlaybackSession` is created RUNNING and ends IDLE. It never restarts;
//!     a new day gets a new session.
//!   - `PlaybackDriver` owns at most one session and the single armed
//!     continuation token. `start()` stops the previous session and disarms
//!     its token before arming the new one, so a stale continuation can
//!     never draw.
//!   - Each tick re-arms the next only while the session keeps running.
//!
//! TIMING: the clock anchor is captured once at session start and reused
//! for every tick. Polls landing mid-day do not shift an already-running
//! playback; the next day's session re-anchors.

use crate::{
    clock::ClockAnchor,
    frame_index::{DayIndex, IndexedFrame},
    payload::CreatureState,
    render::{BaseMarker, CreatureVisual, DayScene, FoodVisual, RenderSurface},
    types::{CreatureId, DayNumber, Millis},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Weight at or above which foods are taken from the later frame.
pub const FOOD_SNAP_WEIGHT: f64 = 0.5;

/// Fraction of the day elapsed at `approx_server_now`, in `[0, 1]`.
/// Durations of 1 ms or less count as already complete.
pub fn playback_progress(approx_server_now: Millis, phase_start_ms: Millis, duration_ms: Millis) -> f64 {
    if duration_ms <= 1 {
        return 1.0;
    }
    let elapsed = (approx_server_now - phase_start_ms).clamp(0, duration_ms);
    elapsed as f64 / duration_ms as f64
}

/// Saturate `i` into `[0, frame_count - 1]`.
fn clamp_index(i: i64, frame_count: usize) -> usize {
    if frame_count == 0 || i <= 0 {
        return 0;
    }
    (i as usize).min(frame_count - 1)
}

pub fn lerp(a: f64, b: f64, weight: f64) -> f64 {
    a + (b - a) * weight
}

/// The two bracketing frames and the blend weight between them.
/// `i0 == i1` whenever `weight` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameCursor {
    pub i0:     usize,
    pub i1:     usize,
    pub weight: f64,
}

impl FrameCursor {
    pub fn at(progress: f64, frame_count: usize) -> Self {
        let progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
        if frame_count <= 1 {
            return Self { i0: 0, i1: 0, weight: 0.0 };
        }
        let idx = progress * (frame_count - 1) as f64;
        let i0 = clamp_index(idx.floor() as i64, frame_count);
        let weight = idx - i0 as f64;
        // Landing exactly on a frame brackets that frame alone.
        let i1 = if weight > 0.0 { clamp_index(i0 as i64 + 1, frame_count) } else { i0 };
        Self { i0, i1, weight }
    }
}

fn blend(id: CreatureId, c0: &CreatureState, c1: &CreatureState, weight: f64) -> CreatureVisual {
    let x0 = c0.x.unwrap_or(0.0);
    let y0 = c0.y.unwrap_or(0.0);
    let e0 = c0.energy.unwrap_or(0.0);
    let x1 = c1.x.unwrap_or(x0);
    let y1 = c1.y.unwrap_or(y0);
    let e1 = c1.energy.unwrap_or(e0);

    CreatureVisual {
        id,
        x:            lerp(x0, x1, weight),
        y:            lerp(y0, y1, weight),
        energy:       lerp(e0, e1, weight),
        size:         c0.size,
        energy_max:   c0.energy_max,
        team:         c0.owner,
        carried_food: c0.carried_food,
    }
}

/// Blend every creature visible in either bracketing frame.
///
/// A creature present on one side only is drawn from that side alone.
/// A creature dead (or without an alive flag) in both sampled states is
/// skipped.
pub fn interpolate_creatures(f0: &IndexedFrame, f1: &IndexedFrame, weight: f64) -> Vec<CreatureVisual> {
    let mut out = Vec::with_capacity(f0.creature_count().max(f1.creature_count()));

    for (id, c0) in f0.creatures() {
        let c1 = f1.creature(id).unwrap_or(c0);
        if !c0.alive && !c1.alive {
            continue;
        }
        out.push(blend(id, c0, c1, weight));
    }

    for (id, c1) in f1.creatures() {
        if f0.contains(id) || !c1.alive {
            continue;
        }
        out.push(blend(id, c1, c1, weight));
    }

    out
}

/// Foods snap to the nearer bracketing frame; they are never blended.
pub fn select_foods(f0: &IndexedFrame, f1: &IndexedFrame, weight: f64) -> Vec<FoodVisual> {
    let source = if weight < FOOD_SNAP_WEIGHT { f0 } else { f1 };
    source
        .foods()
        .iter()
        .filter(|f| f.active)
        .map(|f| FoodVisual { x: f.x, y: f.y })
        .collect()
}

/// Build the scene for `progress` through `index`. `None` when a
/// bracketing frame does not exist (empty day).
pub fn compose_scene<'a>(index: &DayIndex, progress: f64, bases: &'a [BaseMarker]) -> Option<DayScene<'a>> {
    let cursor = FrameCursor::at(progress, index.frame_count());
    let f0 = index.frame(cursor.i0)?;
    let f1 = index.frame(cursor.i1)?;
    Some(DayScene {
        day:       index.day,
        progress,
        i0:        cursor.i0,
        i1:        cursor.i1,
        weight:    cursor.weight,
        creatures: interpolate_creatures(f0, f1, cursor.weight),
        foods:     select_foods(f0, f1, cursor.weight),
        bases,
    })
}

/// Identifies one session's scheduled continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// A frame was drawn and the next tick is armed.
    Rendered,
    /// Nothing was drawn; no further tick is armed for this session.
    Halted,
}

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    token:          SessionToken,
    index:          Arc<DayIndex>,
    anchor:         ClockAnchor,
    phase_start_ms: Millis,
    bases:          Vec<BaseMarker>,
    state:          SessionState,
    ticks:          u64,
}

impl PlaybackSession {
    pub fn new(
        token: SessionToken,
        index: Arc<DayIndex>,
        anchor: ClockAnchor,
        phase_start_ms: Millis,
        bases: Vec<BaseMarker>,
    ) -> Self {
        Self {
            token,
            index,
            anchor,
            phase_start_ms,
            bases,
            state: SessionState::Running,
            ticks: 0,
        }
    }

    pub fn progress_at(&self, local_now: Millis) -> f64 {
        let approx_server_now = self.anchor.estimate(local_now);
        playback_progress(approx_server_now, self.phase_start_ms, self.index.duration_ms)
    }

    pub fn cursor_at(&self, local_now: Millis) -> FrameCursor {
        FrameCursor::at(self.progress_at(local_now), self.index.frame_count())
    }

    pub fn scene_at(&self, local_now: Millis) -> Option<DayScene<'_>> {
        compose_scene(&self.index, self.progress_at(local_now), &self.bases)
    }

    /// Draw the instant `local_now` maps to. A session whose bracketing
    /// frames are missing stops itself.
    pub fn tick<S: RenderSurface + ?Sized>(&mut self, local_now: Millis, surface: &mut S) -> TickOutcome {
        if self.state != SessionState::Running {
            return TickOutcome::Halted;
        }
        let drawn = match self.scene_at(local_now) {
            Some(scene) => {
                surface.draw_day(&scene);
                true
            }
            None => false,
        };
        if drawn {
            self.ticks += 1;
            TickOutcome::Rendered
        } else {
            log::warn!("Day {} has no frame to draw; stopping playback", self.day());
            self.stop();
            TickOutcome::Halted
        }
    }

    pub fn stop(&mut self) {
        self.state = SessionState::Idle;
    }

    pub fn token(&self) -> SessionToken { self.token }
    pub fn day(&self) -> DayNumber { self.index.day }
    pub fn state(&self) -> SessionState { self.state }
    pub fn ticks(&self) -> u64 { self.ticks }
    pub fn anchor(&self) -> ClockAnchor { self.anchor }
    pub fn index(&self) -> &DayIndex { &self.index }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }
}

#[derive(Debug, Default)]
pub struct PlaybackDriver {
    issued:  u64,
    session: Option<PlaybackSession>,
    armed:   Option<SessionToken>,
}

impl PlaybackDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop whatever is playing, then start `index` and arm its first tick.
    pub fn start(
        &mut self,
        index: Arc<DayIndex>,
        anchor: ClockAnchor,
        phase_start_ms: Millis,
        bases: Vec<BaseMarker>,
    ) -> SessionToken {
        self.stop();
        self.issued += 1;
        let token = SessionToken(self.issued);
        log::debug!("Starting playback of day {} as session {}", index.day, token.0);
        self.session = Some(PlaybackSession::new(token, index, anchor, phase_start_ms, bases));
        self.armed = Some(token);
        token
    }

    /// Disarm the pending continuation and idle the session. Returns the
    /// day that was playing, or `None` if nothing was running.
    pub fn stop(&mut self) -> Option<DayNumber> {
        self.armed = None;
        match self.session.as_mut() {
            Some(session) if session.is_running() => {
                session.stop();
                log::debug!("Stopped playback of day {}", session.day());
                Some(session.day())
            }
            _ => None,
        }
    }

    /// The continuation currently scheduled, if any.
    pub fn armed(&self) -> Option<SessionToken> {
        self.armed
    }

    /// Run the continuation identified by `token`. A token that is not the
    /// armed one (superseded or stopped) does nothing.
    pub fn run_tick<S: RenderSurface + ?Sized>(
        &mut self,
        token: SessionToken,
        local_now: Millis,
        surface: &mut S,
    ) -> TickOutcome {
        if self.armed != Some(token) {
            return TickOutcome::Halted;
        }
        self.armed = None;
        let Some(session) = self.session.as_mut().filter(|s| s.token() == token) else {
            return TickOutcome::Halted;
        };
        let outcome = session.tick(local_now, surface);
        if outcome == TickOutcome::Rendered {
            self.armed = Some(token);
        }
        outcome
    }

    /// Run the armed continuation, if there is one.
    pub fn tick_armed<S: RenderSurface + ?Sized>(&mut self, local_now: Millis, surface: &mut S) -> Option<TickOutcome> {
        let token = self.armed?;
        Some(self.run_tick(token, local_now, surface))
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Day of the running session.
    pub fn active_day(&self) -> Option<DayNumber> {
        self.session
            .as_ref()
            .filter(|s| s.is_running())
            .map(PlaybackSession::day)
    }

    pub fn is_running(&self) -> bool {
        self.active_day().is_some()
    }
}
