//! Random-access view over a day's frames.
//!
//! Built once per fetched payload and shared by every tick of that day's
//! playback. Creature lookups by id are O(1); iteration follows first-seen
//! order so rendering is deterministic.

use crate::{
    payload::{CreatureState, DayPayload, DaySummary, FoodState, Frame},
    types::{CreatureId, DayNumber, Millis},
};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedFrame {
    creatures: HashMap<CreatureId, CreatureState>,
    order:     Vec<CreatureId>,
    foods:     Vec<FoodState>,
}

impl IndexedFrame {
    /// Creatures without an id are skipped. A duplicate id replaces the
    /// earlier entry but keeps its position in iteration order.
    pub fn from_frame(frame: Frame) -> Self {
        let mut creatures = HashMap::with_capacity(frame.creatures.len());
        let mut order = Vec::with_capacity(frame.creatures.len());
        for creature in frame.creatures {
            let Some(id) = creature.id else { continue };
            if creatures.insert(id, creature).is_none() {
                order.push(id);
            }
        }
        Self { creatures, order, foods: frame.foods }
    }

    pub fn creature(&self, id: CreatureId) -> Option<&CreatureState> {
        self.creatures.get(&id)
    }

    pub fn contains(&self, id: CreatureId) -> bool {
        self.creatures.contains_key(&id)
    }

    /// `(id, state)` pairs in first-seen order.
    pub fn creatures(&self) -> impl Iterator<Item = (CreatureId, &CreatureState)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.creatures.get(id).map(|c| (*id, c)))
    }

    pub fn creature_count(&self) -> usize {
        self.order.len()
    }

    pub fn foods(&self) -> &[FoodState] {
        &self.foods
    }
}

/// Index a raw frame list, aligned 1:1 with the input.
pub fn build_frames(frames: Vec<Frame>) -> Vec<IndexedFrame> {
    frames.into_iter().map(IndexedFrame::from_frame).collect()
}

/// A fully indexed day, ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct DayIndex {
    pub day:         DayNumber,
    pub duration_ms: Millis,
    pub frame_ms:    Option<f64>,
    pub summary:     Option<DaySummary>,
    frames:          Vec<IndexedFrame>,
}

impl DayIndex {
    pub fn build(day: DayNumber, payload: DayPayload) -> Self {
        let duration_ms = payload.normalized_duration_ms();
        Self {
            day,
            duration_ms,
            frame_ms: payload.frame_ms,
            summary: payload.summary,
            frames: build_frames(payload.frames),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, i: usize) -> Option<&IndexedFrame> {
        self.frames.get(i)
    }

    /// A day with no frames is cached but never played.
    pub fn is_playable(&self) -> bool {
        !self.frames.is_empty()
    }
}
