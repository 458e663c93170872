//! The snapshot poller, the spectator's context object.
//!
//! Owns everything that outlives a single poll: the clock anchor, the
//! payload cache, the playback driver and the latched winner. The event
//! loop feeds it three kinds of input and it never performs I/O itself:
//!
//!   1. `on_snapshot()`  → a poll landed. May ask for a payload fetch.
//!   2. `on_payload()`   → a requested payload fetch finished.
//!   3. `render_frame()` → the display is ready for the next frame.
//!
//! DECISION ORDER per snapshot (fixed):
//!   - FINISHED             → stop playback, latch winner, finished view.
//!   - RUNNING + DAY + d>0  → if day d is not already playing: stop,
//!                            fetch or reuse d, start a session anchored
//!                            at this poll.
//!   - anything else        → stop playback, waiting/paused view.
//!
//! RESET POINT: `reset_for_new_match()` clears the cache and the latched
//! winner. Polls and payload fetches issued before a reset are discarded
//! on arrival.

use crate::{
    cache::{CacheLookup, PayloadCache},
    clock::{ClockAnchor, ClockSync},
    error::{SpectatorError, SpectatorResult},
    event::SpectatorEvent,
    frame_index::DayIndex,
    payload::DayPayload,
    playback::{PlaybackDriver, TickOutcome},
    render::{base_markers, BaseMarker, HudState, RenderSurface, StaticKind, StaticView},
    snapshot::{LobbyStatus, Phase, ServerSnapshot, StateResponse, Winner},
    types::{DayNumber, Millis},
};
use std::sync::Arc;

/// A payload fetch the event loop must perform and report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadRequest {
    pub day:   DayNumber,
    /// Match epoch the request belongs to.
    pub epoch: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollOutcome {
    pub events: Vec<SpectatorEvent>,
    pub fetch:  Option<PayloadRequest>,
}

/// A day waiting for its payload before it can start.
#[derive(Debug, Clone)]
struct PendingStart {
    day:            DayNumber,
    anchor:         ClockAnchor,
    phase_start_ms: Millis,
    bases:          Vec<BaseMarker>,
}

pub struct SnapshotPoller {
    clock:          ClockSync,
    cache:          PayloadCache,
    playback:       PlaybackDriver,
    winner:         Option<Winner>,
    playing_day:    Option<DayNumber>,
    pending:        Option<PendingStart>,
    last:           Option<ServerSnapshot>,
    epoch:          u64,
    finished_shown: bool,
    poll_failures:  u32,
}

impl SnapshotPoller {
    pub fn new(local_now: Millis) -> Self {
        Self {
            clock:          ClockSync::new(local_now),
            cache:          PayloadCache::new(),
            playback:       PlaybackDriver::new(),
            winner:         None,
            playing_day:    None,
            pending:        None,
            last:           None,
            epoch:          0,
            finished_shown: false,
            poll_failures:  0,
        }
    }

    /// Apply one poll received at `local_now`.
    pub fn on_snapshot<S: RenderSurface + ?Sized>(
        &mut self,
        response: StateResponse,
        local_now: Millis,
        surface: &mut S,
    ) -> PollOutcome {
        if self.poll_failures > 0 {
            log::info!("Polling recovered after {} failed attempt(s)", self.poll_failures);
            self.poll_failures = 0;
        }

        let snapshot = ServerSnapshot::from_response(response, &mut self.clock, local_now);
        let mut out = PollOutcome::default();
        out.events.push(SpectatorEvent::SnapshotApplied {
            server_now_ms: snapshot.server_now_ms,
            status:        snapshot.status,
            phase:         snapshot.phase,
            payload_day:   snapshot.current_payload_day,
        });

        surface.update_hud(&HudState::from_snapshot(&snapshot));
        let bases = base_markers(&snapshot.slots);

        if snapshot.status == LobbyStatus::Finished {
            let newly_latched = self.latch_winner(snapshot.winner.as_ref(), &mut out.events);
            self.halt(&mut out.events);
            if !self.finished_shown || newly_latched {
                surface.draw_static(&StaticView {
                    kind:   StaticKind::Finished,
                    bases:  &bases,
                    winner: self.winner.as_ref(),
                });
                self.finished_shown = true;
            }
        } else if snapshot.wants_playback() {
            self.finished_shown = false;
            self.advance_day(&snapshot, bases, &mut out);
        } else {
            self.finished_shown = false;
            self.halt(&mut out.events);
            let kind = if snapshot.phase == Phase::Pause {
                StaticKind::Paused
            } else {
                StaticKind::Waiting
            };
            surface.draw_static(&StaticView { kind, bases: &bases, winner: None });
        }

        self.last = Some(snapshot);
        out
    }

    /// Apply a poll that was issued during match `epoch`. Polls issued
    /// before the last reset are dropped unseen.
    pub fn on_snapshot_from<S: RenderSurface + ?Sized>(
        &mut self,
        epoch: u64,
        response: StateResponse,
        local_now: Millis,
        surface: &mut S,
    ) -> PollOutcome {
        if epoch != self.epoch {
            log::debug!("Dropping poll from match epoch {epoch} (now {})", self.epoch);
            return PollOutcome::default();
        }
        self.on_snapshot(response, local_now, surface)
    }

    /// Record a failed poll. Nothing changes; the next interval retries.
    pub fn on_poll_failed(&mut self, err: &SpectatorError) {
        self.poll_failures += 1;
        log::warn!("Snapshot poll failed (attempt {}): {err}", self.poll_failures);
    }

    /// Deliver the result of a fetch requested by `on_snapshot`.
    pub fn on_payload(
        &mut self,
        request: PayloadRequest,
        result: SpectatorResult<Option<DayPayload>>,
    ) -> Vec<SpectatorEvent> {
        let mut events = Vec::new();
        let day = request.day;

        if request.epoch != self.epoch {
            log::debug!("Dropping payload for day {day} from a previous match");
            return events;
        }

        let waiting_for_it = self.pending.as_ref().is_some_and(|p| p.day == day);

        match result {
            Ok(payload) => {
                let index = self.cache.complete(day, payload);
                events.push(SpectatorEvent::PayloadCached {
                    day,
                    frames: index.as_ref().map_or(0, |i| i.frame_count()),
                });
                if waiting_for_it {
                    if let Some(pending) = self.pending.take() {
                        self.launch(pending, index, &mut events);
                    }
                }
            }
            Err(e) => {
                log::warn!("Payload fetch for day {day} failed: {e}");
                self.cache.abandon(day);
                events.push(SpectatorEvent::PayloadFailed { day, reason: e.to_string() });
                if waiting_for_it {
                    // Forget the day so the next poll asks again.
                    self.pending = None;
                    self.playing_day = None;
                }
            }
        }
        events
    }

    /// Run the armed playback tick, if any.
    pub fn render_frame<S: RenderSurface + ?Sized>(&mut self, local_now: Millis, surface: &mut S) -> Option<TickOutcome> {
        self.playback.tick_armed(local_now, surface)
    }

    /// A new match started: forget cached days and the latched winner.
    pub fn reset_for_new_match(&mut self) -> Vec<SpectatorEvent> {
        let mut events = Vec::new();
        self.halt(&mut events);
        self.cache.clear();
        self.winner = None;
        self.finished_shown = false;
        self.epoch += 1;
        log::info!("Match reset; payload cache and winner cleared");
        events.push(SpectatorEvent::MatchReset);
        events
    }

    fn latch_winner(&mut self, reported: Option<&Winner>, events: &mut Vec<SpectatorEvent>) -> bool {
        if self.winner.is_some() {
            return false;
        }
        let Some(winner) = reported else { return false };
        log::info!(
            "Winner latched: {} (team {:?}, {} alive)",
            winner.name.as_deref().unwrap_or("?"),
            winner.slot,
            winner.alive
        );
        self.winner = Some(winner.clone());
        events.push(SpectatorEvent::WinnerLatched { winner: winner.clone() });
        true
    }

    /// Stop playback and forget any day waiting to start.
    fn halt(&mut self, events: &mut Vec<SpectatorEvent>) {
        self.pending = None;
        self.playing_day = None;
        if let Some(day) = self.playback.stop() {
            events.push(SpectatorEvent::SessionStopped { day });
        }
    }

    fn advance_day(&mut self, snapshot: &ServerSnapshot, bases: Vec<BaseMarker>, out: &mut PollOutcome) {
        let day = snapshot.current_payload_day;
        if self.playing_day == Some(day) {
            return;
        }
        let Some(phase_start_ms) = snapshot.phase_start_ms else {
            log::debug!("Day {day} has no phase start yet; waiting for the next poll");
            return;
        };

        self.halt(&mut out.events);
        self.playing_day = Some(day);
        let pending = PendingStart {
            day,
            anchor: self.clock.anchor(),
            phase_start_ms,
            bases,
        };

        match self.cache.claim(day) {
            CacheLookup::Ready(index) => self.launch(pending, index, &mut out.events),
            CacheLookup::InFlight => self.pending = Some(pending),
            CacheLookup::Miss => {
                self.pending = Some(pending);
                out.fetch = Some(PayloadRequest { day, epoch: self.epoch });
                out.events.push(SpectatorEvent::PayloadRequested { day });
            }
        }
    }

    fn launch(&mut self, pending: PendingStart, index: Option<Arc<DayIndex>>, events: &mut Vec<SpectatorEvent>) {
        let day = pending.day;
        let Some(index) = index else {
            log::info!("No payload for day {day}; nothing to play");
            return;
        };
        if !index.is_playable() {
            log::warn!("Day {day} payload has no frames; nothing to play");
            return;
        }
        if let Some(summary) = &index.summary {
            log::info!(
                "Day {day}: {} births, {} deaths{}",
                summary.births,
                summary.deaths,
                if summary.finished { ", final day" } else { "" }
            );
        }
        let frames = index.frame_count();
        let duration_ms = index.duration_ms;
        self.playback.start(index, pending.anchor, pending.phase_start_ms, pending.bases);
        events.push(SpectatorEvent::SessionStarted { day, frames, duration_ms });
    }

    // ── Queries ────────────────────────────────────

    /// Purchases are open only during a running match's pause.
    pub fn can_purchase(&self) -> bool {
        self.last.as_ref().is_some_and(ServerSnapshot::can_purchase)
    }

    pub fn latched_winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    /// Day chosen for playback, whether or not its session has started.
    pub fn playing_day(&self) -> Option<DayNumber> {
        self.playing_day
    }

    /// Day whose payload is still being fetched.
    pub fn pending_day(&self) -> Option<DayNumber> {
        self.pending.as_ref().map(|p| p.day)
    }

    pub fn playback(&self) -> &PlaybackDriver {
        &self.playback
    }

    pub fn cache(&self) -> &PayloadCache {
        &self.cache
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn last_snapshot(&self) -> Option<&ServerSnapshot> {
        self.last.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
