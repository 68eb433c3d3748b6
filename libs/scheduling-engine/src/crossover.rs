//! Therapist-partition crossover with conflict-dropping reinsert (§4.8).
//!
//! Resolution of the open question in `DESIGN.md` #1: offspring entries
//! are replayed BCBA-first, then by ascending start time, because that
//! order preserves elite-quality placements made by the most senior
//! therapists first.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::availability::AvailabilityTracker;
use crate::models::{Callout, EntityKind, Role, ScheduleEntry, Therapist};

fn role_rank(therapists: &HashMap<Uuid, Role>, therapist_id: Uuid) -> u8 {
    therapists.get(&therapist_id).copied().unwrap_or(Role::Other).rank()
}

/// Produces one offspring from two parents. Therapists are split into two
/// disjoint halves; the offspring takes `parent_a`'s entries for the first
/// half and `parent_b`'s for the second, then replays the union into an
/// empty availability tracker in BCBA-first, ascending-start order,
/// dropping any entry whose therapist or client slot is already booked.
pub fn crossover(
    config: &EngineConfig,
    parent_a: &[ScheduleEntry],
    parent_b: &[ScheduleEntry],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    rng: &mut impl Rng,
) -> Vec<ScheduleEntry> {
    if !rng.gen_bool(config.crossover_rate) {
        return parent_a.to_vec();
    }

    let mut ids: Vec<Uuid> = therapists.iter().map(|t| t.id).collect();
    ids.shuffle(rng);
    let half = ids.len() / 2;
    let first_half: HashSet<Uuid> = ids[..half].iter().copied().collect();

    let role_by_id: HashMap<Uuid, Role> = therapists.iter().map(|t| (t.id, t.role)).collect();

    let mut combined: Vec<ScheduleEntry> = parent_a
        .iter()
        .filter(|e| first_half.contains(&e.therapist_id))
        .cloned()
        .chain(
            parent_b
                .iter()
                .filter(|e| !first_half.contains(&e.therapist_id))
                .cloned(),
        )
        .collect();

    combined.sort_by(|a, b| {
        role_rank(&role_by_id, a.therapist_id)
            .cmp(&role_rank(&role_by_id, b.therapist_id))
            .then(a.start.cmp(&b.start))
    });

    let mut tracker = AvailabilityTracker::new();
    tracker.rebuild(config, &[], callouts, date);

    let mut offspring = Vec::with_capacity(combined.len());
    for mut entry in combined {
        let therapist_free = tracker.available(config, EntityKind::Therapist, entry.therapist_id, entry.start, entry.end, None);
        let client_free = entry
            .client_id
            .map(|cid| tracker.available(config, EntityKind::Client, cid, entry.start, entry.end, None))
            .unwrap_or(true);
        if !therapist_free || !client_free {
            continue;
        }
        entry.id = Uuid::new_v4();
        tracker.book(config, entry.therapist_id, entry.client_id, entry.start, entry.end);
        offspring.push(entry);
    }

    offspring
}
