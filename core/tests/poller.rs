//! Integration tests: the snapshot poller driving payload fetches and playback.

mod common;

use common::{day_state, init_logging, finished_state, payload, state, walking_day, RecordingSurface, T0_MS};
use spectator_core::{
    cache::CacheLookup,
    error::SpectatorError,
    event::SpectatorEvent,
    playback::TickOutcome,
    poller::{PayloadRequest, SnapshotPoller},
    render::StaticKind,
    snapshot::Winner,
};

const LOCAL: i64 = 10_000;

fn winner(name: &str, slot: u32) -> Winner {
    Winner { slot: Some(slot), name: Some(name.into()), alive: 6 }
}

fn has(events: &[SpectatorEvent], name: &str) -> bool {
    events.iter().any(|e| e.name() == name)
}

/// Poll into day 1 and deliver its payload. Returns the request that was issued.
fn start_day_one(poller: &mut SnapshotPoller, surface: &mut RecordingSurface) -> PayloadRequest {
    let outcome = poller.on_snapshot(day_state(1, 500, 0), LOCAL, surface);
    let request = outcome.fetch.expect("day 1 requested");
    let events = poller.on_payload(request, Ok(Some(walking_day())));
    assert!(has(&events, "session_started"), "events: {events:?}");
    request
}

// ── Day playback ───────────────────────────────────

#[test]
fn running_day_fetches_then_plays() {
    init_logging();
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let outcome = poller.on_snapshot(day_state(1, 500, 0), LOCAL, &mut surface);
    assert_eq!(outcome.fetch, Some(PayloadRequest { day: 1, epoch: 0 }));
    assert!(has(&outcome.events, "payload_requested"));
    assert_eq!(poller.pending_day(), Some(1));
    assert!(poller.render_frame(LOCAL, &mut surface).is_none());

    let events = poller.on_payload(outcome.fetch.unwrap(), Ok(Some(walking_day())));
    assert_eq!(events[0], SpectatorEvent::PayloadCached { day: 1, frames: 3 });
    assert_eq!(events[1], SpectatorEvent::SessionStarted { day: 1, frames: 3, duration_ms: 1000 });
    assert_eq!(poller.playback().active_day(), Some(1));

    // Server said T0+500 at local 10_000; phase began at T0 and lasts 1000 ms.
    assert_eq!(poller.render_frame(LOCAL, &mut surface), Some(TickOutcome::Rendered));
    let drawn = surface.last_day();
    assert_eq!((drawn.i0, drawn.i1, drawn.weight), (1, 1, 0.0));
    assert_eq!(drawn.creatures[0].x, 10.0);
    assert_eq!(drawn.bases, 2);
}

/// Time spent waiting for the payload still counts: the anchor is the poll's.
#[test]
fn late_payload_joins_the_day_in_progress() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let outcome = poller.on_snapshot(day_state(1, 500, 0), LOCAL, &mut surface);
    poller.on_payload(outcome.fetch.unwrap(), Ok(Some(walking_day())));

    poller.render_frame(LOCAL + 250, &mut surface);
    let drawn = surface.last_day();
    assert_eq!((drawn.i0, drawn.i1), (1, 2));
    assert_eq!(drawn.creatures[0].x, 15.0);
}

/// Re-polling the day already playing changes nothing.
#[test]
fn same_day_is_not_restarted() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    start_day_one(&mut poller, &mut surface);
    let token = poller.playback().armed();

    let outcome = poller.on_snapshot(day_state(1, 800, 0), LOCAL + 300, &mut surface);
    assert!(outcome.fetch.is_none());
    assert!(!has(&outcome.events, "session_started"));
    assert!(!has(&outcome.events, "session_stopped"));
    assert_eq!(poller.playback().armed(), token);
    assert_eq!(poller.cache().fetch_count(), 1);
}

/// Day 2 replaces day 1: one session, for day 2.
#[test]
fn next_day_replaces_current_playback() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    start_day_one(&mut poller, &mut surface);

    let outcome = poller.on_snapshot(day_state(2, 31_000, 30_000), LOCAL + 30_500, &mut surface);
    assert!(outcome.events.contains(&SpectatorEvent::SessionStopped { day: 1 }));
    assert_eq!(poller.playback().active_day(), None);
    assert_eq!(poller.playing_day(), Some(2));

    poller.on_payload(outcome.fetch.unwrap(), Ok(Some(walking_day())));
    assert_eq!(poller.playback().active_day(), Some(2));
    poller.render_frame(LOCAL + 30_500, &mut surface);
    assert_eq!(surface.last_day().day, 2);
}

/// Without a phase start the day is skipped and asked for again next poll.
#[test]
fn missing_phase_start_waits_for_next_poll() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let outcome = poller.on_snapshot(state("RUNNING", "DAY", 1, 500, None), LOCAL, &mut surface);
    assert!(outcome.fetch.is_none());
    assert_eq!(poller.playing_day(), None);

    let outcome = poller.on_snapshot(day_state(1, 1_500, 0), LOCAL + 1_000, &mut surface);
    assert_eq!(outcome.fetch.map(|r| r.day), Some(1));
}

/// Day 0 means nothing has been simulated yet.
#[test]
fn day_zero_is_not_played() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    let outcome = poller.on_snapshot(day_state(0, 500, 0), LOCAL, &mut surface);
    assert!(outcome.fetch.is_none());
    assert_eq!(surface.statics.last().map(|s| s.0), Some(StaticKind::Waiting));
}

// ── Payload outcomes ───────────────────────────────

/// A failed fetch is forgotten and the next poll asks again.
#[test]
fn failed_payload_is_requested_again() {
    init_logging();
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let first = poller.on_snapshot(day_state(1, 500, 0), LOCAL, &mut surface).fetch.unwrap();
    let events = poller.on_payload(first, Err(SpectatorError::Data("truncated".into())));
    assert!(has(&events, "payload_failed"));
    assert_eq!(poller.playing_day(), None);
    assert_eq!(poller.cache().lookup(1), CacheLookup::Miss);

    let retry = poller.on_snapshot(day_state(1, 1_500, 0), LOCAL + 1_000, &mut surface);
    assert_eq!(retry.fetch, Some(first));
    assert_eq!(poller.cache().fetch_count(), 2);
}

/// "No payload" is cached: returning to the day does not fetch it again.
#[test]
fn missing_payload_is_not_refetched() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let request = poller.on_snapshot(day_state(1, 500, 0), LOCAL, &mut surface).fetch.unwrap();
    let events = poller.on_payload(request, Ok(None));
    assert_eq!(events, vec![SpectatorEvent::PayloadCached { day: 1, frames: 0 }]);
    assert!(!poller.playback().is_running());

    poller.on_snapshot(state("RUNNING", "PAUSE", 1, 2_000, Some(1_500)), LOCAL + 1_500, &mut surface);
    let again = poller.on_snapshot(day_state(1, 2_500, 0), LOCAL + 2_000, &mut surface);
    assert!(again.fetch.is_none());
    assert_eq!(poller.cache().fetch_count(), 1);
}

/// A payload with zero frames is cached but never played.
#[test]
fn frameless_payload_is_not_played() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let request = poller.on_snapshot(day_state(1, 500, 0), LOCAL, &mut surface).fetch.unwrap();
    let events = poller.on_payload(request, Ok(Some(payload(1000.0, vec![]))));
    assert!(!has(&events, "session_started"));
    assert!(poller.render_frame(LOCAL, &mut surface).is_none());
    assert!(matches!(poller.cache().lookup(1), CacheLookup::Ready(Some(_))));
}

/// A payload arriving after the phase moved on is cached, not played.
#[test]
fn payload_after_pause_is_only_cached() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let request = poller.on_snapshot(day_state(1, 500, 0), LOCAL, &mut surface).fetch.unwrap();
    poller.on_snapshot(state("RUNNING", "PAUSE", 1, 1_500, Some(1_000)), LOCAL + 1_000, &mut surface);
    let events = poller.on_payload(request, Ok(Some(walking_day())));

    assert!(has(&events, "payload_cached"));
    assert!(!has(&events, "session_started"));
    assert!(!poller.playback().is_running());
}

// ── Static views ───────────────────────────────────

#[test]
fn pause_stops_playback_and_opens_the_shop() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    start_day_one(&mut poller, &mut surface);

    let outcome = poller.on_snapshot(state("RUNNING", "PAUSE", 1, 1_500, Some(1_000)), LOCAL + 1_000, &mut surface);
    assert!(outcome.events.contains(&SpectatorEvent::SessionStopped { day: 1 }));
    assert!(poller.render_frame(LOCAL + 1_016, &mut surface).is_none());
    assert_eq!(surface.statics.last(), Some(&(StaticKind::Paused, None)));
    assert!(poller.can_purchase());
    assert!(surface.huds.last().unwrap().can_purchase);
}

/// Unknown phases and a lobby that has not started show the waiting view.
#[test]
fn waiting_views() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    poller.on_snapshot(state("WAITING", "LUNCH", 0, 0, None), LOCAL, &mut surface);
    poller.on_snapshot(state("PENDING", "DAY", 1, 0, Some(0)), LOCAL, &mut surface);

    assert_eq!(surface.statics.len(), 2);
    assert!(surface.statics.iter().all(|s| s.0 == StaticKind::Waiting));
    assert!(!poller.can_purchase());
    assert_eq!(surface.huds.len(), 2);
}

// ── Finished matches ───────────────────────────────

/// The first reported winner is latched; later polls cannot clear or change it.
#[test]
fn winner_is_latched() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    start_day_one(&mut poller, &mut surface);

    let outcome = poller.on_snapshot(finished_state(2_000, Some(winner("Ada", 1))), LOCAL + 1_500, &mut surface);
    assert!(outcome.events.contains(&SpectatorEvent::SessionStopped { day: 1 }));
    assert!(has(&outcome.events, "winner_latched"));
    assert_eq!(surface.statics.last(), Some(&(StaticKind::Finished, Some(winner("Ada", 1)))));

    let outcome = poller.on_snapshot(finished_state(3_000, None), LOCAL + 2_500, &mut surface);
    assert!(!has(&outcome.events, "winner_latched"));
    assert_eq!(poller.latched_winner(), Some(&winner("Ada", 1)));

    poller.on_snapshot(finished_state(4_000, Some(winner("Bot 2", 2))), LOCAL + 3_500, &mut surface);
    assert_eq!(poller.latched_winner(), Some(&winner("Ada", 1)));

    // The finished view is drawn once and not on every poll.
    let finished = surface.statics.iter().filter(|s| s.0 == StaticKind::Finished).count();
    assert_eq!(finished, 1);
    assert!(!poller.can_purchase());
}

/// A winner reported after the match already looked finished is still latched and shown.
#[test]
fn late_winner_redraws_finished_view() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    poller.on_snapshot(finished_state(0, None), LOCAL, &mut surface);
    poller.on_snapshot(finished_state(1_000, Some(winner("Ada", 1))), LOCAL + 1_000, &mut surface);

    assert_eq!(
        surface.statics,
        vec![(StaticKind::Finished, None), (StaticKind::Finished, Some(winner("Ada", 1)))]
    );
}

// ── New match ──────────────────────────────────────

#[test]
fn new_match_forgets_days_and_winner() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    start_day_one(&mut poller, &mut surface);
    poller.on_snapshot(finished_state(2_000, Some(winner("Ada", 1))), LOCAL + 1_000, &mut surface);

    let events = poller.reset_for_new_match();
    assert_eq!(events.last(), Some(&SpectatorEvent::MatchReset));
    assert!(poller.latched_winner().is_none());
    assert_eq!(poller.cache().lookup(1), CacheLookup::Miss);
    assert_eq!(poller.epoch(), 1);

    let outcome = poller.on_snapshot(day_state(1, 60_500, 60_000), LOCAL + 60_000, &mut surface);
    assert_eq!(outcome.fetch, Some(PayloadRequest { day: 1, epoch: 1 }));
}

/// A fetch issued before a reset is discarded when it lands afterwards.
#[test]
fn payload_from_previous_match_is_dropped() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();

    let stale = poller.on_snapshot(day_state(1, 500, 0), LOCAL, &mut surface).fetch.unwrap();
    poller.reset_for_new_match();
    let fresh = poller.on_snapshot(day_state(1, 10_500, 10_000), LOCAL + 10_000, &mut surface).fetch.unwrap();

    assert!(poller.on_payload(stale, Ok(Some(payload(1000.0, vec![])))).is_empty());
    assert_eq!(poller.cache().lookup(1), CacheLookup::InFlight);

    let events = poller.on_payload(fresh, Ok(Some(walking_day())));
    assert!(has(&events, "session_started"));
}

/// A poll issued before a reset cannot latch the old match's winner into the new one.
#[test]
fn poll_from_previous_match_is_dropped() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    poller.on_snapshot_from(0, finished_state(1_000, Some(winner("Old", 1))), LOCAL, &mut surface);
    assert_eq!(poller.latched_winner(), Some(&winner("Old", 1)));

    poller.reset_for_new_match();
    let drawn = surface.statics.len();
    let stale = poller.on_snapshot_from(0, finished_state(2_000, Some(winner("Old", 1))), LOCAL + 1_000, &mut surface);
    assert!(stale.events.is_empty() && stale.fetch.is_none());
    assert!(poller.latched_winner().is_none());
    assert_eq!(surface.statics.len(), drawn);

    let outcome = poller.on_snapshot_from(1, day_state(1, 3_500, 3_000), LOCAL + 2_000, &mut surface);
    assert_eq!(outcome.fetch, Some(PayloadRequest { day: 1, epoch: 1 }));
    poller.on_snapshot_from(1, finished_state(9_000, Some(winner("New", 2))), LOCAL + 8_000, &mut surface);
    assert_eq!(poller.latched_winner(), Some(&winner("New", 2)));
}

// ── Clock ──────────────────────────────────────────

#[test]
fn each_poll_reanchors_the_clock() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    poller.on_snapshot(state("WAITING", "WAITING", 0, 2_000, None), LOCAL, &mut surface);
    assert_eq!(poller.clock().estimate(LOCAL + 100), T0_MS + 2_100);
    assert_eq!(poller.last_snapshot().unwrap().server_now_ms, T0_MS + 2_000);
}

/// Poll failures change nothing.
#[test]
fn poll_failure_keeps_playing() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    start_day_one(&mut poller, &mut surface);

    poller.on_poll_failed(&SpectatorError::Protocol { status: 502, message: "Bad Gateway".into() });
    assert_eq!(poller.playback().active_day(), Some(1));
    assert_eq!(poller.render_frame(LOCAL + 100, &mut surface), Some(TickOutcome::Rendered));
}

/// A re-poll of the playing day moves the clock but not the running session.
#[test]
fn repoll_keeps_session_anchor() {
    let mut poller = SnapshotPoller::new(0);
    let mut surface = RecordingSurface::default();
    start_day_one(&mut poller, &mut surface);
    let offset = poller.clock().offset_ms();

    poller.render_frame(LOCAL + 100, &mut surface);
    let before = surface.last_day().clone();
    assert_eq!((before.i0, before.i1), (1, 2));

    let outcome = poller.on_snapshot(day_state(1, 5_000, 0), LOCAL + 100, &mut surface);
    assert!(outcome.fetch.is_none());
    assert!(!has(&outcome.events, "session_started"));
    assert_ne!(poller.clock().offset_ms(), offset);

    poller.render_frame(LOCAL + 100, &mut surface);
    let after = surface.last_day();
    assert_eq!((after.i0, after.i1, after.weight), (before.i0, before.i1, before.weight));
    assert_eq!(after.creatures, before.creatures);
}
