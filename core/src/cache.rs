//! Per-day payload cache.
//!
//! RULE: a day is fetched at most once per match. Whatever the fetch
//! returned, including "no payload", is stored and served from then on.
//! Only `clear()` (new match) forgets days.
//!
//! Two ways in:
//!   - `get()` for sequential callers that can await the fetch in place.
//!   - `claim()` / `complete()` / `abandon()` for the event loop, which
//!     runs the fetch elsewhere and hands the result back later.

use crate::{
    error::SpectatorResult,
    frame_index::DayIndex,
    payload::DayPayload,
    types::DayNumber,
};
use std::{collections::HashMap, future::Future, sync::Arc};

#[derive(Debug, Clone)]
enum Entry {
    InFlight,
    Ready(Option<Arc<DayIndex>>),
}

/// Result of looking a day up.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Cached. `None` means the server had no usable payload for the day.
    Ready(Option<Arc<DayIndex>>),
    /// A fetch has been claimed and not yet completed.
    InFlight,
    /// Nothing known about this day.
    Miss,
}

#[derive(Debug, Default)]
pub struct PayloadCache {
    entries: HashMap<DayNumber, Entry>,
    fetches: u64,
}

impl PayloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, day: DayNumber) -> CacheLookup {
        match self.entries.get(&day) {
            Some(Entry::Ready(index)) => CacheLookup::Ready(index.clone()),
            Some(Entry::InFlight)     => CacheLookup::InFlight,
            None                      => CacheLookup::Miss,
        }
    }

    /// Like `lookup`, but a miss marks the day in flight. The caller that
    /// receives `Miss` owns the fetch and must `complete` or `abandon` it.
    pub fn claim(&mut self, day: DayNumber) -> CacheLookup {
        let lookup = self.lookup(day);
        if lookup == CacheLookup::Miss {
            self.entries.insert(day, Entry::InFlight);
            self.fetches += 1;
            log::debug!("Payload for day {day} claimed for fetch");
        }
        lookup
    }

    /// Store a fetched payload. A day that is already cached keeps its
    /// existing value.
    pub fn complete(&mut self, day: DayNumber, payload: Option<DayPayload>) -> Option<Arc<DayIndex>> {
        if let Some(Entry::Ready(existing)) = self.entries.get(&day) {
            log::debug!("Payload for day {day} already cached; ignoring duplicate");
            return existing.clone();
        }
        let index = payload.map(|p| Arc::new(DayIndex::build(day, p)));
        match &index {
            Some(idx) => log::info!(
                "Cached day {day}: {} frames over {} ms",
                idx.frame_count(),
                idx.duration_ms
            ),
            None => log::info!("Cached day {day}: no payload"),
        }
        self.entries.insert(day, Entry::Ready(index.clone()));
        index
    }

    /// Release a claim after a failed fetch so a later claim can retry.
    pub fn abandon(&mut self, day: DayNumber) {
        if matches!(self.entries.get(&day), Some(Entry::InFlight)) {
            self.entries.remove(&day);
        }
    }

    /// Return the cached day, fetching it through `fetch` on a miss.
    /// A failed fetch is not cached. Answers `Ready` (with `None` for a
    /// day that has no payload) or `InFlight` when the day is claimed
    /// elsewhere; never `Miss`.
    pub async fn get<F, Fut>(&mut self, day: DayNumber, fetch: F) -> SpectatorResult<CacheLookup>
    where
        F: FnOnce(DayNumber) -> Fut,
        Fut: Future<Output = SpectatorResult<Option<DayPayload>>>,
    {
        match self.claim(day) {
            CacheLookup::Miss => match fetch(day).await {
                Ok(payload) => Ok(CacheLookup::Ready(self.complete(day, payload))),
                Err(e) => {
                    self.abandon(day);
                    Err(e)
                }
            },
            CacheLookup::InFlight => {
                log::debug!("Payload for day {day} already in flight");
                Ok(CacheLookup::InFlight)
            }
            ready => Ok(ready),
        }
    }

    /// Forget every day. Called when a new match starts.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of fetches claimed since construction.
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// Days with a stored result (in-flight claims excluded).
    pub fn cached_days(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, Entry::Ready(_)))
            .count()
    }
}
