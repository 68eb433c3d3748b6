//! Constructive seeder (§4.6): priority-sorted task list → greedy
//! placement, producing one feasible-leaning schedule for a weekday.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::seq::SliceRandom;
use rand::Rng;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::availability::AvailabilityTracker;
use crate::constraints::is_valid_addition;
use crate::models::{
    certificate_for, is_weekend, AlliedHealthKind, BaseSchedule, Callout, Client, EntityKind,
    ScheduleEntry, SessionKind, Therapist,
};

#[derive(Debug, Clone, Copy)]
enum TaskKind {
    Aba,
    AlliedHealth(AlliedHealthKind),
}

#[derive(Debug, Clone)]
struct Task {
    client_id: Uuid,
    kind: TaskKind,
    priority: f64,
    min_duration: u32,
    max_duration: u32,
    preferred_window: Option<(u32, u32)>,
}

fn qualified_therapist_count(client: &Client, task_kind: TaskKind, therapists: &[Therapist]) -> usize {
    therapists
        .iter()
        .filter(|t| match task_kind {
            TaskKind::Aba => t.satisfies(&client.insurance_requirements),
            TaskKind::AlliedHealth(kind) => {
                t.satisfies(&client.insurance_requirements)
                    && t.can_deliver(kind, &certificate_for(kind).to_string())
            }
        })
        .count()
}

fn build_task_list(clients: &[Client], therapists: &[Therapist], weekday: Weekday) -> Vec<Task> {
    let mut tasks = Vec::new();
    for client in clients {
        for need in &client.allied_health_needs {
            if let Some(permitted) = &need.permitted_weekdays {
                if !permitted.contains(&weekday) {
                    continue;
                }
            }
            let qualified = qualified_therapist_count(client, TaskKind::AlliedHealth(need.kind), therapists);
            tasks.push(Task {
                client_id: client.id,
                kind: TaskKind::AlliedHealth(need.kind),
                priority: 1000.0 - 10.0 * qualified as f64 + need.duration_minutes as f64,
                min_duration: need.duration_minutes,
                max_duration: need.duration_minutes,
                preferred_window: need.preferred_window,
            });
        }

        let qualified = qualified_therapist_count(client, TaskKind::Aba, therapists);
        tasks.push(Task {
            client_id: client.id,
            kind: TaskKind::Aba,
            priority: 500.0 - 10.0 * qualified as f64 + 180.0,
            min_duration: 60,
            max_duration: 180,
            preferred_window: None,
        });
    }
    tasks
}

fn eligible_therapists(client: &Client, kind: TaskKind, therapists: &[Therapist]) -> Vec<Uuid> {
    therapists
        .iter()
        .filter(|t| match kind {
            TaskKind::Aba => t.satisfies(&client.insurance_requirements),
            TaskKind::AlliedHealth(ah) => {
                t.satisfies(&client.insurance_requirements) && t.can_deliver(ah, &certificate_for(ah).to_string())
            }
        })
        .map(|t| t.id)
        .collect()
}

fn session_kind_for(kind: TaskKind) -> SessionKind {
    match kind {
        TaskKind::Aba => SessionKind::Aba,
        TaskKind::AlliedHealth(AlliedHealthKind::Ot) => SessionKind::AhOt,
        TaskKind::AlliedHealth(AlliedHealthKind::Slp) => SessionKind::AhSlp,
    }
}

/// Places one task by walking candidate therapists and start slots,
/// extending each accepted placement as far as feasible. Returns the
/// committed entry, if any.
fn place_task(
    config: &EngineConfig,
    task: &Task,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    weekday: Weekday,
    schedule: &mut Vec<ScheduleEntry>,
    tracker: &mut AvailabilityTracker,
    rng: &mut impl Rng,
) -> Option<ScheduleEntry> {
    let client = clients.iter().find(|c| c.id == task.client_id)?;
    let mut candidates = eligible_therapists(client, task.kind, therapists);
    candidates.shuffle(rng);

    let (window_start, window_end) = task
        .preferred_window
        .unwrap_or((config.op_start, config.op_end.saturating_sub(task.min_duration)));
    let last_start = window_end.saturating_sub(task.min_duration).max(window_start);

    for therapist_id in candidates {
        let therapist = therapists.iter().find(|t| t.id == therapist_id)?;
        let mut start = window_start;
        while start <= last_start {
            let minimal_end = start + task.min_duration;
            let therapist_free = tracker.available(config, EntityKind::Therapist, therapist_id, start, minimal_end, None);
            let client_free = tracker.available(config, EntityKind::Client, client.id, start, minimal_end, None);
            if therapist_free && client_free {
                let mut end = minimal_end;
                while end + config.slot_minutes <= window_end.max(minimal_end) && end - start < task.max_duration {
                    let next_end = end + config.slot_minutes;
                    let still_free = tracker.available(config, EntityKind::Therapist, therapist_id, end, next_end, None)
                        && tracker.available(config, EntityKind::Client, client.id, end, next_end, None);
                    if !still_free {
                        break;
                    }
                    end = next_end;
                }

                if let (Some(client_team), Some(therapist_team)) = (client.team_id, therapist.team_id) {
                    if client_team != therapist_team && rng.gen_bool(0.7) {
                        start += config.slot_minutes;
                        continue;
                    }
                }

                let entry = ScheduleEntry::new(
                    Some(client.id),
                    therapist_id,
                    weekday,
                    start,
                    end,
                    session_kind_for(task.kind),
                );
                if is_valid_addition(config, &entry, schedule, callouts, date, Some(client), therapist, None) {
                    tracker.book(config, therapist_id, Some(client.id), start, end);
                    schedule.push(entry.clone());
                    return Some(entry);
                }
            }
            start += config.slot_minutes;
        }
    }
    None
}

/// Places a 30-minute lunch for `therapist`, preferring `preferred` if it's
/// free, else scanning `[lunch_start, lunch_end - lunch_duration]`.
fn place_lunch(
    config: &EngineConfig,
    therapist: &Therapist,
    weekday: Weekday,
    preferred: Option<(u32, u32)>,
    schedule: &mut Vec<ScheduleEntry>,
    tracker: &mut AvailabilityTracker,
) -> Option<ScheduleEntry> {
    let latest_start = config.lunch_end.saturating_sub(config.lunch_duration);

    if let Some((pref_start, _)) = preferred {
        let pref_end = pref_start + config.lunch_duration;
        if pref_start >= config.lunch_start
            && pref_start <= latest_start
            && tracker.available(config, EntityKind::Therapist, therapist.id, pref_start, pref_end, None)
        {
            let entry = ScheduleEntry::new(None, therapist.id, weekday, pref_start, pref_end, SessionKind::IndirectTime);
            tracker.book(config, therapist.id, None, pref_start, pref_end);
            schedule.push(entry.clone());
            return Some(entry);
        }
    }

    let mut start = config.lunch_start;
    while start <= latest_start {
        let end = start + config.lunch_duration;
        if tracker.available(config, EntityKind::Therapist, therapist.id, start, end, None) {
            let entry = ScheduleEntry::new(None, therapist.id, weekday, start, end, SessionKind::IndirectTime);
            tracker.book(config, therapist.id, None, start, end);
            schedule.push(entry.clone());
            return Some(entry);
        }
        start += config.slot_minutes;
    }
    None
}

/// Grafts in every `base`-schedule entry for `weekday` that doesn't overlap
/// a callout on `date`, assigning each a fresh id. Used both as the first
/// step of [`seed`] and directly by the evolutionary loop's population
/// init (§4.11(b), "repair-mutate the base schedule for D").
pub fn graft_base_schedule(
    config: &EngineConfig,
    base: &BaseSchedule,
    callouts: &[Callout],
    date: NaiveDate,
    weekday: Weekday,
) -> Vec<ScheduleEntry> {
    let mut grafted = Vec::new();
    if !base.weekdays.contains(&weekday) {
        return grafted;
    }
    for template in &base.entries {
        if template.weekday != weekday {
            continue;
        }
        let overlaps_callout = callouts.iter().any(|c| {
            c.covers_date(date)
                && c.overlaps_window(template.start, template.end)
                && ((c.entity_kind == EntityKind::Therapist && c.entity_id == template.therapist_id)
                    || (c.entity_kind == EntityKind::Client && Some(c.entity_id) == template.client_id))
        });
        if overlaps_callout {
            continue;
        }
        let mut entry = template.clone();
        entry.id = Uuid::new_v4();
        grafted.push(entry);
    }
    let _ = config;
    grafted
}

/// Produces one feasible-leaning schedule for `date`. `base_schedule` and
/// `lunch_preferences` are optional collaborator seeds (§6); an engine
/// invoked with neither behaves identically apart from the seed-mining
/// optimization.
pub fn seed(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    callouts: &[Callout],
    date: NaiveDate,
    base_schedule: Option<&BaseSchedule>,
    lunch_preferences: &std::collections::HashMap<Uuid, (u32, u32)>,
    rng: &mut impl Rng,
) -> Vec<ScheduleEntry> {
    let weekday = date.weekday();
    let mut schedule = Vec::new();
    let mut tracker = AvailabilityTracker::new();
    tracker.rebuild(config, &schedule, callouts, date);

    if let Some(base) = base_schedule {
        for entry in graft_base_schedule(config, base, callouts, date, weekday) {
            tracker.book(config, entry.therapist_id, entry.client_id, entry.start, entry.end);
            schedule.push(entry);
        }
    }

    if is_weekend(date) {
        // No ABA or AH placement happens on weekends; only a grafted base
        // schedule (if any) and lunches for whoever it left working.
    } else {
        let mut tasks = build_task_list(clients, therapists, weekday);
        tasks.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));

        for task in &tasks {
            place_task(config, task, clients, therapists, callouts, date, weekday, &mut schedule, &mut tracker, rng);
        }
    }

    for therapist in therapists {
        let billable_minutes: u32 = schedule
            .iter()
            .filter(|e| e.therapist_id == therapist.id && e.kind.is_billable())
            .map(|e| e.duration())
            .sum();
        let has_lunch = schedule
            .iter()
            .any(|e| e.therapist_id == therapist.id && e.kind == SessionKind::IndirectTime);
        if billable_minutes >= 300 && !has_lunch {
            let preferred = lunch_preferences.get(&therapist.id).copied();
            place_lunch(config, therapist, weekday, preferred, &mut schedule, &mut tracker);
        }
    }

    schedule
}
