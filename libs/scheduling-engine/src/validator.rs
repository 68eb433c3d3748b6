//! Full-schedule validator (§4.3): runs the kernel on every entry, then
//! aggregate checks that only make sense across the whole schedule.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::constraints::{
    ah_qualification_missing, callout_conflict, credential_mismatch, duration_invalid,
    outside_operating_hours,
};
use crate::coverage::coverage_gaps;
use crate::errors::{RuleId, Violation};
use crate::models::{is_weekend, Callout, Client, Role, ScheduleEntry, SessionKind, Therapist};

/// Runs every check in §4.3 and returns a deduplicated violation list.
pub fn validate(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    schedule: &[ScheduleEntry],
    callouts: &[Callout],
    date: NaiveDate,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let client_by_id: HashMap<Uuid, &Client> = clients.iter().map(|c| (c.id, c)).collect();
    let therapist_by_id: HashMap<Uuid, &Therapist> = therapists.iter().map(|t| (t.id, t)).collect();

    // Pairwise conflict checks — each unordered pair reported once.
    let mut seen_pairs: HashSet<(Uuid, Uuid, &'static str)> = HashSet::new();
    for (i, entry) in schedule.iter().enumerate() {
        for other in &schedule[i + 1..] {
            if entry.weekday != other.weekday {
                continue;
            }
            if entry.therapist_id == other.therapist_id && entry.overlaps(other.start, other.end) {
                let key = (entry.id.min(other.id), entry.id.max(other.id), "therapist");
                if seen_pairs.insert(key) {
                    violations.push(
                        Violation::new(RuleId::TherapistConflict, "therapist is double-booked")
                            .with_entry(entry.id),
                    );
                }
            }
            if let (Some(a), Some(b)) = (entry.client_id, other.client_id) {
                if a == b && entry.overlaps(other.start, other.end) {
                    let key = (entry.id.min(other.id), entry.id.max(other.id), "client");
                    if seen_pairs.insert(key) {
                        violations.push(
                            Violation::new(RuleId::ClientConflict, "client is double-booked")
                                .with_entry(entry.id),
                        );
                    }
                }
                if a == b
                    && entry.therapist_id == other.therapist_id
                    && (entry.end == other.start || other.end == entry.start)
                {
                    let key = (entry.id.min(other.id), entry.id.max(other.id), "b2b");
                    if seen_pairs.insert(key) {
                        violations.push(
                            Violation::new(RuleId::SameClientBackToBack, "same client scheduled back to back")
                                .with_entry(entry.id),
                        );
                    }
                }
            }
        }
    }

    // Per-entry kernel checks that don't need a pairing partner.
    for entry in schedule {
        let client = entry.client_id.and_then(|id| client_by_id.get(&id)).copied();
        let Some(therapist) = therapist_by_id.get(&entry.therapist_id).copied() else {
            violations.push(
                Violation::new(RuleId::UnknownEntity, "entry references an unknown therapist")
                    .with_entry(entry.id),
            );
            continue;
        };

        if callout_conflict(entry, callouts, date) {
            violations.push(
                Violation::new(RuleId::CalloutOverlap, "entry overlaps a callout").with_entry(entry.id),
            );
        }
        if entry.client_id.is_some() && credential_mismatch(entry, client, therapist) {
            violations.push(
                Violation::new(RuleId::CredentialMismatch, "therapist lacks a required qualification")
                    .with_entry(entry.id),
            );
        }
        if entry.kind.is_allied_health() && ah_qualification_missing(entry, therapist) {
            violations.push(
                Violation::new(RuleId::AhQualificationMissing, "therapist lacks the AH certificate")
                    .with_entry(entry.id),
            );
        }
        if duration_invalid(config, entry) {
            violations.push(
                Violation::new(RuleId::DurationInvalid, "entry duration is invalid").with_entry(entry.id),
            );
        }
        if outside_operating_hours(config, entry) {
            violations.push(
                Violation::new(RuleId::OutsideOperatingHours, "entry falls outside operating hours")
                    .with_entry(entry.id),
            );
        }
        if entry.kind == SessionKind::Aba && is_weekend(date) {
            violations.push(Violation::new(RuleId::AbaOnWeekend, "ABA entry on a weekend").with_entry(entry.id));
        }
    }

    // Medicaid cap per client.
    for client in clients {
        if !client.is_medicaid() {
            continue;
        }
        let mut distinct: HashSet<Uuid> = HashSet::new();
        for entry in schedule.iter().filter(|e| e.client_id == Some(client.id)) {
            distinct.insert(entry.therapist_id);
        }
        if distinct.len() > 3 {
            violations.push(
                Violation::new(
                    RuleId::MedicaidCapViolated,
                    format!("client has {} distinct therapists, cap is 3", distinct.len()),
                )
                .with_detail(client.id.to_string()),
            );
        }
    }

    // Lunch bookkeeping per therapist.
    for therapist in therapists {
        let billable_minutes: u32 = schedule
            .iter()
            .filter(|e| e.therapist_id == therapist.id && e.kind.is_billable())
            .map(|e| e.duration())
            .sum();
        let lunches: Vec<&ScheduleEntry> = schedule
            .iter()
            .filter(|e| e.therapist_id == therapist.id && e.kind == SessionKind::IndirectTime)
            .collect();

        if billable_minutes > 0 {
            if lunches.is_empty() {
                violations.push(
                    Violation::new(RuleId::MissingLunch, "working therapist has no lunch")
                        .with_detail(therapist.id.to_string()),
                );
            } else if lunches.len() > 1 {
                violations.push(
                    Violation::new(RuleId::MultipleLunch, "working therapist has more than one lunch")
                        .with_detail(therapist.id.to_string()),
                );
            }
            for lunch in &lunches {
                let latest_start = config.lunch_end.saturating_sub(config.lunch_duration);
                if lunch.start < config.lunch_start || lunch.start > latest_start {
                    violations.push(
                        Violation::new(RuleId::LunchOutsideWindow, "lunch starts outside the lunch window")
                            .with_entry(lunch.id),
                    );
                }
            }
        }

        let billable_sessions = schedule
            .iter()
            .filter(|e| e.therapist_id == therapist.id && e.kind.is_billable())
            .count();
        if billable_sessions > 4 {
            violations.push(
                Violation::new(
                    RuleId::TooManyBillableSessions,
                    format!("therapist carries {billable_sessions} billable sessions"),
                )
                .with_detail(therapist.id.to_string()),
            );
        }

        if therapist.role == Role::Bcba {
            let has_direct_time = schedule
                .iter()
                .any(|e| e.therapist_id == therapist.id && e.client_id.is_some());
            if !has_direct_time && billable_minutes == 0 && !is_weekend(date) {
                violations.push(
                    Violation::new(RuleId::BcbaNoDirectClientTime, "BCBA has no direct client time today")
                        .with_detail(therapist.id.to_string()),
                );
            }
        }
    }

    // Coverage-gap scan (§4.4).
    for client in clients {
        for gap in coverage_gaps(config, client, schedule, callouts, date) {
            violations.push(
                Violation::new(
                    RuleId::CoverageGap,
                    format!("uncovered interval [{}, {})", gap.start, gap.end),
                )
                .with_detail(client.id.to_string()),
            );
        }
    }

    violations
}
