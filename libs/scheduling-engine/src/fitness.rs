//! Adaptive weighted-sum fitness function (§4.10).
//!
//! Lower is better; 0 means a feasible, fair schedule. The scale factor σ
//! grows with problem size so that a 200-client clinic's fitness numbers
//! stay comparable in shape to a 2-client clinic's, rather than the
//! hard-violation weights swamping everything once there's enough entries
//! to rack up counts.

use std::collections::HashMap;

use chrono::NaiveDate;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::coverage::coverage_gaps;
use crate::errors::{RuleId, Violation};
use crate::models::{Callout, Client, ScheduleEntry, SessionKind, Therapist};

/// σ = max(1, log2(|clients| · |therapists|)).
pub fn scale_factor(num_clients: usize, num_therapists: usize) -> f64 {
    let product = (num_clients.max(1) * num_therapists.max(1)) as f64;
    product.log2().max(1.0)
}

fn capped_count(violations: &[Violation], rule: RuleId, cap: usize) -> f64 {
    violations.iter().filter(|v| v.rule_id == rule).count().min(cap) as f64
}

fn count(violations: &[Violation], rule: RuleId) -> f64 {
    violations.iter().filter(|v| v.rule_id == rule).count() as f64
}

fn credential_and_ah_mismatch_count(violations: &[Violation], cap: usize) -> f64 {
    violations
        .iter()
        .filter(|v| matches!(v.rule_id, RuleId::CredentialMismatch | RuleId::AhQualificationMissing))
        .count()
        .min(cap) as f64
}

/// Minutes of idle time between a therapist's non-lunch entries on the
/// day, excluding the 30-minute hole immediately adjacent to their lunch.
fn fragmentation_minutes(therapists: &[Therapist], schedule: &[ScheduleEntry], config: &EngineConfig) -> u32 {
    let mut total = 0u32;
    for therapist in therapists {
        let mut entries: Vec<&ScheduleEntry> = schedule
            .iter()
            .filter(|e| e.therapist_id == therapist.id && e.kind != SessionKind::IndirectTime)
            .collect();
        entries.sort_by_key(|e| e.start);
        let lunch = schedule
            .iter()
            .find(|e| e.therapist_id == therapist.id && e.kind == SessionKind::IndirectTime);

        for pair in entries.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.start <= a.end {
                continue;
            }
            let gap = b.start - a.end;
            let adjacent_to_lunch = lunch
                .map(|l| l.start == a.end || l.end == b.start)
                .unwrap_or(false);
            if gap == config.lunch_duration && adjacent_to_lunch {
                continue;
            }
            total += gap;
        }
    }
    total
}

/// Count of distinct (therapist, 30-minute window) lunch pairs among
/// teammates lunching within 30 minutes of each other.
fn lunch_stagger_pairs(therapists: &[Therapist], schedule: &[ScheduleEntry]) -> u32 {
    let mut team_of: HashMap<Uuid, Option<Uuid>> = HashMap::new();
    for t in therapists {
        team_of.insert(t.id, t.team_id);
    }
    let lunches: Vec<&ScheduleEntry> = schedule
        .iter()
        .filter(|e| e.kind == SessionKind::IndirectTime)
        .collect();

    let mut pairs = 0u32;
    for i in 0..lunches.len() {
        for j in (i + 1)..lunches.len() {
            let (a, b) = (lunches[i], lunches[j]);
            let same_team = team_of.get(&a.therapist_id).copied().flatten().is_some()
                && team_of.get(&a.therapist_id) == team_of.get(&b.therapist_id);
            if same_team && (a.start as i64 - b.start as i64).abs() < 30 {
                pairs += 1;
            }
        }
    }
    pairs
}

fn team_alignment_mismatches(clients: &[Client], therapists: &[Therapist], schedule: &[ScheduleEntry]) -> u32 {
    let client_team: HashMap<Uuid, Option<Uuid>> = clients.iter().map(|c| (c.id, c.team_id)).collect();
    let therapist_team: HashMap<Uuid, Option<Uuid>> = therapists.iter().map(|t| (t.id, t.team_id)).collect();

    schedule
        .iter()
        .filter(|e| {
            let Some(client_id) = e.client_id else { return false };
            let (Some(ct), Some(tt)) = (client_team.get(&client_id), therapist_team.get(&e.therapist_id))
            else {
                return false;
            };
            ct.is_some() && tt.is_some() && ct != tt
        })
        .count() as u32
}

/// Computes the scalar fitness for one candidate schedule. `violations`
/// should come from [`crate::validator::validate`] run against the same
/// inputs, so hard-violation counts aren't recomputed here.
pub fn fitness(
    config: &EngineConfig,
    clients: &[Client],
    therapists: &[Therapist],
    schedule: &[ScheduleEntry],
    callouts: &[Callout],
    date: NaiveDate,
    violations: &[Violation],
) -> f64 {
    let sigma = scale_factor(clients.len(), therapists.len());
    let mut total = 0.0;

    total += capped_count(violations, RuleId::TherapistConflict, 5) * 5000.0 * sigma;
    total += capped_count(violations, RuleId::ClientConflict, 5) * 5000.0 * sigma;
    total += count(violations, RuleId::SameClientBackToBack) * 6000.0 * sigma;
    total += credential_and_ah_mismatch_count(violations, 5) * 4000.0 * sigma;
    total += capped_count(violations, RuleId::CalloutOverlap, 5) * 4500.0 * sigma;
    total += capped_count(violations, RuleId::MissingLunch, therapists.len().max(1)) * 2500.0 * sigma;
    total += count(violations, RuleId::LunchOutsideWindow) * 200.0 * sigma;
    total += count(violations, RuleId::DurationInvalid) * 1000.0 * sigma;
    total += count(violations, RuleId::MedicaidCapViolated) * 2000.0 * sigma;

    let gap_entries = clients
        .iter()
        .map(|client| coverage_gaps(config, client, schedule, callouts, date).len() as f64)
        .sum::<f64>();
    let coverage_weight = 2000.0 * sigma * (clients.len() as f64 / 10.0);
    total += (gap_entries / 4.0).min(2.0 * clients.len() as f64) * coverage_weight;

    total += (lunch_stagger_pairs(therapists, schedule) as f64) * 800.0 * sigma;
    total += (team_alignment_mismatches(clients, therapists, schedule) as f64) * 100.0 * sigma;
    total += fragmentation_minutes(therapists, schedule, config) as f64 * 10.0;

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_schedule_has_zero_fitness() {
        let config = EngineConfig::default();
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let fitness = fitness(&config, &[], &[], &[], &[], date, &[]);
        assert_eq!(fitness, 0.0);
    }

    #[test]
    fn scale_factor_is_at_least_one() {
        assert_eq!(scale_factor(0, 0), 1.0);
        assert!(scale_factor(100, 100) > 1.0);
    }
}
