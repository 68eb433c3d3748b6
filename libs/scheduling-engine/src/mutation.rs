//! Slide/resize mutation operators (§4.7).

use chrono::NaiveDate;
use rand::Rng;
use shared_config::EngineConfig;

use crate::constraints::is_valid_addition;
use crate::models::{Callout, Client, ScheduleEntry, SessionKind, Therapist};

/// Mutation rate applied per individual.
pub const MUTATION_RATE: f64 = 0.95;
/// Fraction of entries perturbed within a mutated individual.
pub const ENTRY_PERTURBATION_RATE: f64 = 0.10;

#[derive(Debug, Clone, Copy)]
enum Operator {
    Slide,
    Resize,
}

fn find_client<'a>(clients: &'a [Client], id: Option<uuid::Uuid>) -> Option<&'a Client> {
    id.and_then(|id| clients.iter().find(|c| c.id == id))
}

fn find_therapist<'a>(therapists: &'a [Therapist], id: uuid::Uuid) -> Option<&'a Therapist> {
    therapists.iter().find(|t| t.id == id)
}

/// Attempts one mutation on `entry` in place, against the rest of
/// `schedule` (which must not itself contain `entry`). Returns the mutated
/// entry, or `None` if no variant of the chosen operator passed the
/// kernel.
fn mutate_entry(
    config: &EngineConfig,
    entry: &ScheduleEntry,
    clients: &[Client],
    therapists: &[Therapist],
    schedule: &[ScheduleEntry],
    callouts: &[Callout],
    date: NaiveDate,
    rng: &mut impl Rng,
) -> Option<ScheduleEntry> {
    let operator = if entry.kind == SessionKind::Aba && rng.gen_bool(0.5) {
        Operator::Resize
    } else {
        Operator::Slide
    };

    let client = find_client(clients, entry.client_id);
    let therapist = find_therapist(therapists, entry.therapist_id)?;

    let candidate = match operator {
        Operator::Slide => {
            let delta: i64 = if rng.gen_bool(0.5) { config.slot_minutes as i64 } else { -(config.slot_minutes as i64) };
            let start = (entry.start as i64 + delta).max(0) as u32;
            let end = (entry.end as i64 + delta).max(0) as u32;
            if start >= end {
                return None;
            }
            ScheduleEntry { start, end, ..entry.clone() }
        }
        Operator::Resize => {
            let delta: i64 = if rng.gen_bool(0.5) { config.slot_minutes as i64 } else { -(config.slot_minutes as i64) };
            let new_end = (entry.end as i64 + delta).max(0) as u32;
            if new_end <= entry.start {
                return None;
            }
            let duration = new_end - entry.start;
            if duration < config.min_aba_duration || duration > config.max_aba_duration {
                return None;
            }
            ScheduleEntry { end: new_end, ..entry.clone() }
        }
    };

    if is_valid_addition(config, &candidate, schedule, callouts, date, client, therapist, Some(entry.id)) {
        Some(candidate)
    } else {
        None
    }
}

/// Mutates a fraction of `schedule`'s entries in place, dropping an
/// attempted mutation (keeping the original entry) whenever the candidate
/// fails the kernel.
pub fn mutate(
    config: &EngineConfig,
    schedule: &mut Vec<ScheduleEntry>,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    rng: &mut impl Rng,
) {
    let indices: Vec<usize> = (0..schedule.len())
        .filter(|_| rng.gen_bool(ENTRY_PERTURBATION_RATE))
        .collect();

    for idx in indices {
        let entry = schedule[idx].clone();
        let rest: Vec<ScheduleEntry> = schedule
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, e)| e.clone())
            .collect();
        if let Some(mutated) = mutate_entry(config, &entry, clients, therapists, &rest, callouts, date, rng) {
            schedule[idx] = mutated;
        }
    }
}
