//! Repair pipeline (§4.9): eight stages, applied in fixed order after
//! every mutation or crossover, each using the kernel for acceptance so
//! none of them introduces a fresh conflict.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::availability::AvailabilityTracker;
use crate::constraints::is_valid_addition;
use crate::coverage::coverage_gaps;
use crate::models::{Callout, Client, EntityKind, ScheduleEntry, SessionKind, Therapist};

const CLEANUP_MERGE_MAX_PASSES: usize = 50;

/// Stage 1 — merges adjacent same-therapist, same-client ABA entries
/// whose combined duration fits in the ABA bound, iterated to a fixpoint.
pub fn cleanup_merge(config: &EngineConfig, schedule: &mut Vec<ScheduleEntry>) {
    for _ in 0..CLEANUP_MERGE_MAX_PASSES {
        let mut merged_any = false;
        let mut by_therapist: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (i, e) in schedule.iter().enumerate() {
            by_therapist.entry(e.therapist_id).or_default().push(i);
        }

        'outer: for (_, mut idxs) in by_therapist {
            idxs.sort_by_key(|&i| schedule[i].start);
            for w in 0..idxs.len().saturating_sub(1) {
                let (i, j) = (idxs[w], idxs[w + 1]);
                let (a, b) = (schedule[i].clone(), schedule[j].clone());
                if a.kind == SessionKind::Aba
                    && b.kind == SessionKind::Aba
                    && a.client_id == b.client_id
                    && a.end == b.start
                    && (b.end - a.start) <= config.max_aba_duration
                {
                    let merged = ScheduleEntry {
                        end: b.end,
                        ..a.clone()
                    };
                    let (lo, hi) = (i.min(j), i.max(j));
                    schedule.remove(hi);
                    schedule.remove(lo);
                    schedule.push(merged);
                    merged_any = true;
                    break 'outer;
                }
            }
        }

        if !merged_any {
            break;
        }
    }
}

/// Stage 2 — clamps ABA entries to `[min_aba_duration, max_aba_duration]`.
pub fn duration_clamp(config: &EngineConfig, schedule: &mut [ScheduleEntry]) {
    for entry in schedule.iter_mut() {
        if entry.kind != SessionKind::Aba {
            continue;
        }
        if entry.duration() > config.max_aba_duration {
            entry.end = entry.start + config.max_aba_duration;
        } else if entry.duration() < config.min_aba_duration {
            entry.end = entry.start + config.min_aba_duration;
        }
    }
}

/// Stage 3 — for each entry whose therapist fails the client's
/// requirements, tries every other qualified therapist in random order
/// and commits the first that passes the kernel.
pub fn credential_swap(
    config: &EngineConfig,
    schedule: &mut [ScheduleEntry],
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    rng: &mut impl Rng,
) {
    let client_by_id: HashMap<Uuid, &Client> = clients.iter().map(|c| (c.id, c)).collect();

    for i in 0..schedule.len() {
        let Some(client_id) = schedule[i].client_id else { continue };
        let Some(client) = client_by_id.get(&client_id).copied() else { continue };
        let therapist_id = schedule[i].therapist_id;
        let fails = therapists
            .iter()
            .find(|t| t.id == therapist_id)
            .map(|t| !t.satisfies(&client.insurance_requirements))
            .unwrap_or(true);
        if !fails {
            continue;
        }

        let mut candidates: Vec<&Therapist> = therapists
            .iter()
            .filter(|t| t.id != therapist_id && t.satisfies(&client.insurance_requirements))
            .collect();
        candidates.shuffle(rng);

        let rest: Vec<ScheduleEntry> = schedule
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, e)| e.clone())
            .collect();

        for candidate in candidates {
            let mut trial = schedule[i].clone();
            trial.therapist_id = candidate.id;
            if is_valid_addition(config, &trial, &rest, callouts, date, Some(client), candidate, None) {
                schedule[i].therapist_id = candidate.id;
                break;
            }
        }
    }
}

/// Stage 4 — keeps the first three distinct therapists for each
/// MD_MEDICAID client (by earliest start); tries to swap every other
/// entry onto one of those three, and drops it if none fit.
pub fn medicaid_cap(
    config: &EngineConfig,
    schedule: &mut Vec<ScheduleEntry>,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
) {
    let therapist_by_id: HashMap<Uuid, &Therapist> = therapists.iter().map(|t| (t.id, t)).collect();

    for client in clients.iter().filter(|c| c.is_medicaid()) {
        let mut idxs: Vec<usize> = schedule
            .iter()
            .enumerate()
            .filter(|(_, e)| e.client_id == Some(client.id))
            .map(|(i, _)| i)
            .collect();
        idxs.sort_by_key(|&i| schedule[i].start);

        let mut kept: Vec<Uuid> = Vec::new();
        for &i in &idxs {
            let tid = schedule[i].therapist_id;
            if !kept.contains(&tid) {
                if kept.len() < 3 {
                    kept.push(tid);
                }
            }
        }

        let mut to_drop = Vec::new();
        for &i in &idxs {
            if kept.contains(&schedule[i].therapist_id) {
                continue;
            }
            let rest: Vec<ScheduleEntry> = schedule
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, e)| e.clone())
                .collect();
            let mut swapped = false;
            for &allowed_id in &kept {
                let Some(allowed) = therapist_by_id.get(&allowed_id).copied() else { continue };
                let mut trial = schedule[i].clone();
                trial.therapist_id = allowed_id;
                if is_valid_addition(config, &trial, &rest, callouts, date, Some(client), allowed, None) {
                    schedule[i].therapist_id = allowed_id;
                    swapped = true;
                    break;
                }
            }
            if !swapped {
                to_drop.push(i);
            }
        }

        to_drop.sort_unstable_by(|a, b| b.cmp(a));
        for i in to_drop {
            schedule.remove(i);
        }
    }
}

/// Stage 5 — where adjacent same-therapist, same-client entries touch,
/// tries shifting the later one forward 15 minutes, then the earlier one
/// back 15 minutes, otherwise drops the later entry.
pub fn back_to_back_shift(
    config: &EngineConfig,
    schedule: &mut Vec<ScheduleEntry>,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
) {
    let client_by_id: HashMap<Uuid, &Client> = clients.iter().map(|c| (c.id, c)).collect();
    let therapist_by_id: HashMap<Uuid, &Therapist> = therapists.iter().map(|t| (t.id, t)).collect();

    let mut by_therapist: HashMap<Uuid, Vec<usize>> = HashMap::new();
    for (i, e) in schedule.iter().enumerate() {
        by_therapist.entry(e.therapist_id).or_default().push(i);
    }

    let mut to_drop: Vec<usize> = Vec::new();
    for (_, mut idxs) in by_therapist {
        idxs.sort_by_key(|&i| schedule[i].start);
        for w in 0..idxs.len().saturating_sub(1) {
            let (i, j) = (idxs[w], idxs[w + 1]);
            if to_drop.contains(&i) || to_drop.contains(&j) {
                continue;
            }
            let (a, b) = (schedule[i].clone(), schedule[j].clone());
            if a.client_id.is_none() || a.client_id != b.client_id || a.end != b.start {
                continue;
            }

            let client = a.client_id.and_then(|id| client_by_id.get(&id).copied());
            let Some(therapist) = therapist_by_id.get(&a.therapist_id).copied() else { continue };

            let rest_without_b: Vec<ScheduleEntry> = schedule
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != j)
                .map(|(_, e)| e.clone())
                .collect();
            let mut later = b.clone();
            later.start += config.slot_minutes;
            later.end += config.slot_minutes;
            if is_valid_addition(config, &later, &rest_without_b, callouts, date, client, therapist, Some(b.id)) {
                schedule[j] = later;
                continue;
            }

            let rest_without_a: Vec<ScheduleEntry> = schedule
                .iter()
                .enumerate()
                .filter(|(k, _)| *k != i)
                .map(|(_, e)| e.clone())
                .collect();
            let mut earlier = a.clone();
            earlier.start -= config.slot_minutes.min(earlier.start);
            earlier.end -= config.slot_minutes.min(earlier.end);
            if earlier.start < earlier.end
                && is_valid_addition(config, &earlier, &rest_without_a, callouts, date, client, therapist, Some(a.id))
            {
                schedule[i] = earlier;
                continue;
            }

            to_drop.push(j);
        }
    }

    to_drop.sort_unstable_by(|a, b| b.cmp(a));
    to_drop.dedup();
    for i in to_drop {
        schedule.remove(i);
    }
}

/// Stage 6 — for every residual gap of at least an hour, tries
/// progressively shorter ABA placements (180 down to 60 in 15-minute
/// steps) with a qualified, free therapist.
pub fn coverage_gap_fill(
    config: &EngineConfig,
    schedule: &mut Vec<ScheduleEntry>,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
) {
    let weekday = date.weekday();
    for client in clients {
        let gaps = coverage_gaps(config, client, schedule, callouts, date);
        for gap in gaps {
            if gap.duration() < config.min_aba_duration {
                continue;
            }
            let mut length = gap.duration().min(config.max_aba_duration);
            while length >= config.min_aba_duration {
                let start = gap.start;
                let end = start + length;
                let mut committed = false;
                for therapist in therapists.iter().filter(|t| t.satisfies(&client.insurance_requirements)) {
                    let entry = ScheduleEntry::new(Some(client.id), therapist.id, weekday, start, end, SessionKind::Aba);
                    if is_valid_addition(config, &entry, schedule, callouts, date, Some(client), therapist, None) {
                        schedule.push(entry);
                        committed = true;
                        break;
                    }
                }
                if committed {
                    break;
                }
                if length <= config.min_aba_duration {
                    break;
                }
                length -= config.slot_minutes;
            }
        }
    }
}

struct LunchCandidate {
    start: u32,
    score: f64,
}

/// Stage 7 — scores every free 30-minute lunch window for each
/// under-lunched therapist (midpoint proximity, a natural pre/post gap,
/// client-coverage redundancy from other therapists, AM/PM workload
/// balance, team stagger, and in-window bonus) and commits the best of
/// the top five; falls back to splitting a long ABA session to open a
/// hole if none fit.
pub fn lunch_placement(
    config: &EngineConfig,
    schedule: &mut Vec<ScheduleEntry>,
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
) {
    let weekday = date.weekday();
    let workday_midpoint = (config.op_start + config.op_end) / 2;

    for therapist in therapists {
        let billable_minutes: u32 = schedule
            .iter()
            .filter(|e| e.therapist_id == therapist.id && e.kind.is_billable())
            .map(|e| e.duration())
            .sum();
        let has_lunch = schedule
            .iter()
            .any(|e| e.therapist_id == therapist.id && e.kind == SessionKind::IndirectTime);
        if billable_minutes < 300 || has_lunch {
            continue;
        }

        let mut tracker = AvailabilityTracker::new();
        tracker.rebuild(config, schedule, callouts, date);

        let teammates: Vec<Uuid> = therapists
            .iter()
            .filter(|t| t.id != therapist.id && t.team_id.is_some() && t.team_id == therapist.team_id)
            .map(|t| t.id)
            .collect();

        let own_clients: HashSet<Uuid> = schedule
            .iter()
            .filter(|e| e.therapist_id == therapist.id)
            .filter_map(|e| e.client_id)
            .collect();

        let billable_minutes = billable_minutes as f64;

        let latest_start = config.lunch_end.saturating_sub(config.lunch_duration);
        let mut candidates = Vec::new();
        let mut start = config.lunch_start;
        while start <= latest_start {
            let end = start + config.lunch_duration;
            if tracker.available(config, EntityKind::Therapist, therapist.id, start, end, None) {
                let mut score = 0.0;
                let distance = (start as i64 - workday_midpoint as i64).unsigned_abs() as f64;
                score += (100.0 - distance / 10.0).max(0.0);

                let has_pre_gap = schedule
                    .iter()
                    .filter(|e| e.therapist_id == therapist.id && e.end <= start)
                    .map(|e| start - e.end)
                    .min()
                    .map(|gap| gap >= 30)
                    .unwrap_or(false);
                let has_post_gap = schedule
                    .iter()
                    .filter(|e| e.therapist_id == therapist.id && e.start >= end)
                    .map(|e| e.start - end)
                    .min()
                    .map(|gap| gap >= 30)
                    .unwrap_or(false);
                if has_pre_gap || has_post_gap {
                    score += 50.0;
                }

                if !own_clients.is_empty() {
                    let covered_by_others = own_clients
                        .iter()
                        .filter(|&&client_id| {
                            schedule.iter().any(|e| {
                                e.therapist_id != therapist.id
                                    && e.client_id == Some(client_id)
                                    && e.kind.is_billable()
                                    && e.overlaps(start, end)
                            })
                        })
                        .count();
                    score += 30.0 * (covered_by_others as f64 / own_clients.len() as f64);
                }

                if billable_minutes > 0.0 {
                    let before: u32 = schedule
                        .iter()
                        .filter(|e| e.therapist_id == therapist.id && e.kind.is_billable() && e.end <= start)
                        .map(|e| e.duration())
                        .sum();
                    let after: u32 = schedule
                        .iter()
                        .filter(|e| e.therapist_id == therapist.id && e.kind.is_billable() && e.start >= end)
                        .map(|e| e.duration())
                        .sum();
                    let imbalance = (before as f64 - after as f64).abs() / billable_minutes;
                    score += 40.0 * (1.0 - imbalance.min(1.0));
                }

                let staggered = teammates
                    .iter()
                    .filter(|&&mate_id| {
                        schedule.iter().any(|e| {
                            e.therapist_id == mate_id
                                && e.kind == SessionKind::IndirectTime
                                && (e.start as i64 - start as i64).abs() < 30
                        })
                    })
                    .count();
                if !teammates.is_empty() && staggered as f64 / teammates.len() as f64 >= 0.5 {
                    score -= 30.0;
                }

                if start >= config.lunch_start && end <= config.lunch_end {
                    score += 20.0;
                }

                candidates.push(LunchCandidate { start, score });
            }
            start += config.slot_minutes;
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let mut placed = false;
        for candidate in candidates.into_iter().take(5) {
            let end = candidate.start + config.lunch_duration;
            schedule.push(ScheduleEntry::new(None, therapist.id, weekday, candidate.start, end, SessionKind::IndirectTime));
            placed = true;
            break;
        }

        if !placed {
            // A split must leave every surviving ABA remainder at or above
            // min_aba_duration. A midline split needs room for two such
            // remainders plus the lunch hole; anything shorter can only
            // afford an edge split, carving the hole off one end and
            // keeping a single remainder.
            let edge_split_floor = config.min_aba_duration + config.lunch_duration;
            let mid_split_floor = 2 * config.min_aba_duration + config.lunch_duration;

            if let Some(idx) = schedule
                .iter()
                .position(|e| e.therapist_id == therapist.id && e.kind == SessionKind::Aba && e.duration() >= edge_split_floor)
            {
                let original = schedule[idx].clone();
                if original.duration() >= mid_split_floor {
                    let raw_start = original.start + (original.duration() - config.lunch_duration) / 2;
                    let raw_start = raw_start - raw_start % config.slot_minutes;
                    let min_hole_start = original.start + config.min_aba_duration;
                    let max_hole_start = original.end - config.lunch_duration - config.min_aba_duration;
                    let hole_start = raw_start.clamp(min_hole_start, max_hole_start);
                    let hole_end = hole_start + config.lunch_duration;
                    schedule[idx] = ScheduleEntry { end: hole_start, ..original.clone() };
                    schedule.push(ScheduleEntry::new(
                        original.client_id,
                        original.therapist_id,
                        weekday,
                        hole_end,
                        original.end,
                        SessionKind::Aba,
                    ));
                    schedule.push(ScheduleEntry::new(None, therapist.id, weekday, hole_start, hole_end, SessionKind::IndirectTime));
                } else {
                    let hole_end = original.end;
                    let hole_start = hole_end - config.lunch_duration;
                    schedule[idx] = ScheduleEntry { end: hole_start, ..original.clone() };
                    schedule.push(ScheduleEntry::new(None, therapist.id, weekday, hole_start, hole_end, SessionKind::IndirectTime));
                }
            }
        }
    }
}

/// Stage 8 — for every entry whose client's team differs from the
/// therapist's, tries swapping onto a same-team qualified therapist.
pub fn team_realignment(
    config: &EngineConfig,
    schedule: &mut [ScheduleEntry],
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
) {
    let client_by_id: HashMap<Uuid, &Client> = clients.iter().map(|c| (c.id, c)).collect();

    for i in 0..schedule.len() {
        let Some(client_id) = schedule[i].client_id else { continue };
        let Some(client) = client_by_id.get(&client_id).copied() else { continue };
        let Some(client_team) = client.team_id else { continue };
        let current_team = therapists.iter().find(|t| t.id == schedule[i].therapist_id).and_then(|t| t.team_id);
        if current_team == Some(client_team) {
            continue;
        }

        let rest: Vec<ScheduleEntry> = schedule
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, e)| e.clone())
            .collect();

        for candidate in therapists
            .iter()
            .filter(|t| t.team_id == Some(client_team) && t.satisfies(&client.insurance_requirements))
        {
            let mut trial = schedule[i].clone();
            trial.therapist_id = candidate.id;
            if is_valid_addition(config, &trial, &rest, callouts, date, Some(client), candidate, None) {
                schedule[i].therapist_id = candidate.id;
                break;
            }
        }
    }
}

/// Runs all eight repair stages, in order, against one schedule.
pub fn repair(
    config: &EngineConfig,
    schedule: &mut Vec<ScheduleEntry>,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    rng: &mut impl Rng,
) {
    cleanup_merge(config, schedule);
    duration_clamp(config, schedule);
    credential_swap(config, schedule, clients, therapists, callouts, date, rng);
    medicaid_cap(config, schedule, clients, therapists, callouts, date);
    back_to_back_shift(config, schedule, clients, therapists, callouts, date);
    coverage_gap_fill(config, schedule, clients, therapists, callouts, date);
    lunch_placement(config, schedule, therapists, callouts, date);
    team_realignment(config, schedule, clients, therapists, callouts, date);
}
