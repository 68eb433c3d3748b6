//! Pure predicates over an entry and a partial schedule (§4.2).
//!
//! Every predicate here is a function of its explicit arguments only — no
//! predicate consults global state, so the aggregate [`can_add`] can be
//! called as often as the evolutionary loop needs without worrying about
//! staleness.

use chrono::NaiveDate;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::errors::{RuleId, Violation};
use crate::models::{certificate_for, Callout, Client, ScheduleEntry, SessionKind, Therapist};
use crate::time::within_operating_hours;

/// Any other entry on the same weekday with the same therapist whose
/// `[start, end)` overlaps `entry`'s.
pub fn therapist_conflict(entry: &ScheduleEntry, schedule: &[ScheduleEntry], ignore: Option<Uuid>) -> bool {
    schedule.iter().any(|other| {
        other.id != entry.id
            && Some(other.id) != ignore
            && other.therapist_id == entry.therapist_id
            && other.weekday == entry.weekday
            && other.overlaps(entry.start, entry.end)
    })
}

/// Same, matched by client. A null client never conflicts with anything.
pub fn client_conflict(entry: &ScheduleEntry, schedule: &[ScheduleEntry], ignore: Option<Uuid>) -> bool {
    let Some(client_id) = entry.client_id else {
        return false;
    };
    schedule.iter().any(|other| {
        other.id != entry.id
            && Some(other.id) != ignore
            && other.client_id == Some(client_id)
            && other.weekday == entry.weekday
            && other.overlaps(entry.start, entry.end)
    })
}

/// Any callout that covers `date`, targets `entry`'s therapist or client,
/// and whose intra-day window overlaps `entry`'s.
pub fn callout_conflict(entry: &ScheduleEntry, callouts: &[Callout], date: NaiveDate) -> bool {
    callouts.iter().any(|callout| {
        if !callout.covers_date(date) || !callout.overlaps_window(entry.start, entry.end) {
            return false;
        }
        match callout.entity_kind {
            crate::models::EntityKind::Therapist => callout.entity_id == entry.therapist_id,
            crate::models::EntityKind::Client => Some(callout.entity_id) == entry.client_id,
        }
    })
}

/// Client's insurance requirements are not all a subset of the therapist's
/// qualifications.
pub fn credential_mismatch(entry: &ScheduleEntry, client: Option<&Client>, therapist: &Therapist) -> bool {
    let Some(client) = client else {
        return false;
    };
    !therapist.satisfies(&client.insurance_requirements) && entry.client_id == Some(client.id)
}

/// An AH entry whose therapist lacks the kind capability or the
/// corresponding certificate qualification.
pub fn ah_qualification_missing(entry: &ScheduleEntry, therapist: &Therapist) -> bool {
    let kind = match entry.kind {
        SessionKind::AhOt => crate::models::AlliedHealthKind::Ot,
        SessionKind::AhSlp => crate::models::AlliedHealthKind::Slp,
        _ => return false,
    };
    !therapist.can_deliver(kind, &certificate_for(kind).to_string())
}

/// Violates invariants 3–5: ABA duration bounds, lunch exactly 30 minutes,
/// AH duration must be positive (the caller is responsible for checking it
/// matches the originating need's duration, which the kernel alone cannot
/// see).
pub fn duration_invalid(config: &EngineConfig, entry: &ScheduleEntry) -> bool {
    match entry.kind {
        SessionKind::Aba => {
            let d = entry.duration();
            d < config.min_aba_duration || d > config.max_aba_duration
        }
        SessionKind::IndirectTime => entry.duration() != config.lunch_duration,
        SessionKind::AhOt | SessionKind::AhSlp => entry.duration() == 0,
        SessionKind::AdminTime => false,
    }
}

/// Violates invariant 1 for non-lunch kinds.
pub fn outside_operating_hours(config: &EngineConfig, entry: &ScheduleEntry) -> bool {
    if entry.kind == SessionKind::IndirectTime {
        return false;
    }
    !within_operating_hours(config, entry.start, entry.end)
}

/// Another entry with identical (therapist, client, weekday) whose end
/// equals `entry`'s start or whose start equals `entry`'s end.
pub fn same_client_back_to_back(entry: &ScheduleEntry, schedule: &[ScheduleEntry], ignore: Option<Uuid>) -> bool {
    let Some(client_id) = entry.client_id else {
        return false;
    };
    schedule.iter().any(|other| {
        other.id != entry.id
            && Some(other.id) != ignore
            && other.client_id == Some(client_id)
            && other.therapist_id == entry.therapist_id
            && other.weekday == entry.weekday
            && (other.end == entry.start || other.start == entry.end)
    })
}

/// Aggregate check over every kernel predicate for one entry against a
/// schedule. Returns every violation found, hard and soft alike — an empty
/// vec means the entry may be committed as-is.
#[allow(clippy::too_many_arguments)]
pub fn can_add(
    config: &EngineConfig,
    entry: &ScheduleEntry,
    schedule: &[ScheduleEntry],
    callouts: &[Callout],
    date: NaiveDate,
    client: Option<&Client>,
    therapist: &Therapist,
    ignore: Option<Uuid>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if therapist_conflict(entry, schedule, ignore) {
        violations.push(
            Violation::new(RuleId::TherapistConflict, "therapist is double-booked").with_entry(entry.id),
        );
    }
    if client_conflict(entry, schedule, ignore) {
        violations.push(
            Violation::new(RuleId::ClientConflict, "client is double-booked").with_entry(entry.id),
        );
    }
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
        violations.push(Violation::new(RuleId::DurationInvalid, "entry duration is invalid").with_entry(entry.id));
    }
    if outside_operating_hours(config, entry) {
        violations.push(
            Violation::new(RuleId::OutsideOperatingHours, "entry falls outside operating hours")
                .with_entry(entry.id),
        );
    }
    if same_client_back_to_back(entry, schedule, ignore) {
        violations.push(
            Violation::new(RuleId::SameClientBackToBack, "same client scheduled back to back")
                .with_entry(entry.id),
        );
    }

    violations
}

/// `true` when [`can_add`] would return no violations.
#[allow(clippy::too_many_arguments)]
pub fn is_valid_addition(
    config: &EngineConfig,
    entry: &ScheduleEntry,
    schedule: &[ScheduleEntry],
    callouts: &[Callout],
    date: NaiveDate,
    client: Option<&Client>,
    therapist: &Therapist,
    ignore: Option<Uuid>,
) -> bool {
    can_add(config, entry, schedule, callouts, date, client, therapist, ignore).is_empty()
}
