//! Per-entity bitmask of busy 15-minute slots with O(1) range queries and
//! bookings.
//!
//! The source this engine is modeled on keeps an arbitrary-precision
//! integer per entity. A 9-hour, 15-minute-slot operating window is only
//! 36 bits wide, so a single `u64` holds it with room to spare; this
//! removes the heap allocation arbitrary-precision integers would need on
//! every query. [`mask_range`] clears any bit at or past `num_slots` so a
//! caller can never accidentally query past the window.

use std::collections::HashMap;

use chrono::NaiveDate;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::models::{Callout, EntityKind, ScheduleEntry};
use crate::time::slot_of;

/// Builds the bitmask for the half-open slot range `[start, end)`.
pub fn mask_range(config: &EngineConfig, start: u32, end: u32) -> u64 {
    if start >= end {
        return 0;
    }
    let s = slot_of(config, start);
    let num_slots = config.num_slots();
    if s >= num_slots {
        return 0;
    }
    let len = slot_of(config, end).saturating_sub(s).max(1).min(num_slots - s);
    let full: u64 = if num_slots >= 64 { u64::MAX } else { (1u64 << num_slots) - 1 };
    (((1u64 << len) - 1) << s) & full
}

#[derive(Debug, Clone, Copy)]
struct BookedEntry {
    therapist_id: Uuid,
    client_id: Option<Uuid>,
    start: u32,
    end: u32,
}

/// Tracks busy slots per therapist and per client so the constraint kernel
/// and the constructive seeder can answer "is this entity free for this
/// range" in O(1) rather than scanning the whole schedule.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    therapist_masks: HashMap<Uuid, u64>,
    client_masks: HashMap<Uuid, u64>,
    entries_by_id: HashMap<Uuid, BookedEntry>,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all masks and replays the schedule and the day's callouts.
    pub fn rebuild(
        &mut self,
        config: &EngineConfig,
        schedule: &[ScheduleEntry],
        callouts: &[Callout],
        date: NaiveDate,
    ) {
        self.therapist_masks.clear();
        self.client_masks.clear();
        self.entries_by_id.clear();

        for callout in callouts {
            if !callout.covers_date(date) {
                continue;
            }
            let mask = mask_range(config, callout.window_start, callout.window_end);
            match callout.entity_kind {
                EntityKind::Therapist => {
                    *self.therapist_masks.entry(callout.entity_id).or_insert(0) |= mask;
                }
                EntityKind::Client => {
                    *self.client_masks.entry(callout.entity_id).or_insert(0) |= mask;
                }
            }
        }

        for entry in schedule {
            self.book(config, entry.therapist_id, entry.client_id, entry.start, entry.end);
            self.entries_by_id.insert(
                entry.id,
                BookedEntry {
                    therapist_id: entry.therapist_id,
                    client_id: entry.client_id,
                    start: entry.start,
                    end: entry.end,
                },
            );
        }
    }

    /// ORs the booking into the therapist's mask and, if present, the
    /// client's.
    pub fn book(
        &mut self,
        config: &EngineConfig,
        therapist_id: Uuid,
        client_id: Option<Uuid>,
        start: u32,
        end: u32,
    ) {
        let mask = mask_range(config, start, end);
        *self.therapist_masks.entry(therapist_id).or_insert(0) |= mask;
        if let Some(client_id) = client_id {
            *self.client_masks.entry(client_id).or_insert(0) |= mask;
        }
    }

    /// True when the entity is free across `[start, end)`, optionally
    /// pretending `ignore` (an existing booked entry id) was never booked —
    /// used when re-checking an edit to an entry already on the schedule.
    pub fn available(
        &self,
        config: &EngineConfig,
        kind: EntityKind,
        id: Uuid,
        start: u32,
        end: u32,
        ignore: Option<Uuid>,
    ) -> bool {
        let query = mask_range(config, start, end);
        let mut mask = match kind {
            EntityKind::Therapist => self.therapist_masks.get(&id).copied().unwrap_or(0),
            EntityKind::Client => self.client_masks.get(&id).copied().unwrap_or(0),
        };
        if let Some(ignore_id) = ignore {
            if let Some(booked) = self.entries_by_id.get(&ignore_id) {
                let matches = match kind {
                    EntityKind::Therapist => booked.therapist_id == id,
                    EntityKind::Client => booked.client_id == Some(id),
                };
                if matches {
                    mask &= !mask_range(config, booked.start, booked.end);
                }
            }
        }
        (mask & query) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionKind;
    use chrono::Weekday;

    fn cfg() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn mask_range_is_exactly_the_queried_slots() {
        let config = cfg();
        let mask = mask_range(&config, config.op_start, config.op_start + 45);
        assert_eq!(mask.count_ones(), 3);
    }

    #[test]
    fn book_then_available_reports_busy() {
        let config = cfg();
        let mut tracker = AvailabilityTracker::new();
        let therapist = Uuid::new_v4();
        tracker.book(&config, therapist, None, 540, 600);
        assert!(!tracker.available(&config, EntityKind::Therapist, therapist, 550, 560, None));
        assert!(tracker.available(&config, EntityKind::Therapist, therapist, 600, 660, None));
    }

    #[test]
    fn ignore_frees_up_the_entrys_own_slot() {
        let config = cfg();
        let mut tracker = AvailabilityTracker::new();
        let therapist = Uuid::new_v4();
        let entry = ScheduleEntry::new(None, therapist, Weekday::Mon, 540, 600, SessionKind::AdminTime);
        tracker.rebuild(&config, std::slice::from_ref(&entry), &[], chrono::NaiveDate::from_ymd_opt(2026, 7, 27).unwrap());
        assert!(!tracker.available(&config, EntityKind::Therapist, therapist, 540, 600, None));
        assert!(tracker.available(&config, EntityKind::Therapist, therapist, 540, 600, Some(entry.id)));
    }
}
