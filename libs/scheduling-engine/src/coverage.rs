//! Coverage-gap computation (§4.4).
//!
//! Per client per weekday: start with the single range `[op_start,
//! op_end]`, subtract every client-targeted callout window, then subtract
//! every scheduled entry for that client. The residual 15-minute-aligned
//! intervals are the gaps; a schedule is coverage-valid when every client's
//! residual is empty.

use chrono::NaiveDate;
use shared_config::EngineConfig;
use uuid::Uuid;

use crate::models::{is_weekend, Callout, Client, EntityKind, ScheduleEntry};

/// A maximal free interval `[start, end)` still uncovered for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub start: u32,
    pub end: u32,
}

impl Gap {
    pub fn duration(self) -> u32 {
        self.end - self.start
    }
}

/// Subtracts every interval in `cuts` from `[start, end)`, returning the
/// residual maximal intervals in ascending order. `cuts` need not be
/// sorted or merged beforehand.
fn subtract_intervals(start: u32, end: u32, cuts: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut sorted: Vec<(u32, u32)> = cuts
        .iter()
        .copied()
        .filter(|(s, e)| s < e && *s < end && *e > start)
        .map(|(s, e)| (s.max(start), e.min(end)))
        .collect();
    sorted.sort_unstable();

    let mut residual = Vec::new();
    let mut cursor = start;
    for (s, e) in sorted {
        if s > cursor {
            residual.push((cursor, s));
        }
        cursor = cursor.max(e);
    }
    if cursor < end {
        residual.push((cursor, end));
    }
    residual
}

/// Computes every residual gap for one client on `date`. Returns an empty
/// vec on weekends (the invariant is skipped) or if the client has no
/// entries and no callouts at all covering operating hours — in which case
/// the single full-day gap is still reported, since an uncovered client is
/// exactly what this computation exists to surface.
pub fn coverage_gaps(
    config: &EngineConfig,
    client: &Client,
    schedule: &[ScheduleEntry],
    callouts: &[Callout],
    date: NaiveDate,
) -> Vec<Gap> {
    if is_weekend(date) {
        return Vec::new();
    }

    let callout_windows: Vec<(u32, u32)> = callouts
        .iter()
        .filter(|c| c.entity_kind == EntityKind::Client && c.entity_id == client.id && c.covers_date(date))
        .map(|c| (c.window_start, c.window_end))
        .collect();

    let after_callouts = subtract_intervals(config.op_start, config.op_end, &callout_windows);

    let entry_windows: Vec<(u32, u32)> = schedule
        .iter()
        .filter(|e| e.client_id == Some(client.id))
        .map(|e| (e.start, e.end))
        .collect();

    let mut gaps = Vec::new();
    for (start, end) in after_callouts {
        for (gap_start, gap_end) in subtract_intervals(start, end, &entry_windows) {
            gaps.push(Gap { start: gap_start, end: gap_end });
        }
    }
    gaps
}

/// `true` when every client's residual is empty, i.e. the schedule is
/// coverage-valid.
pub fn is_coverage_valid(
    config: &EngineConfig,
    clients: &[Client],
    schedule: &[ScheduleEntry],
    callouts: &[Callout],
    date: NaiveDate,
) -> bool {
    clients
        .iter()
        .all(|client| coverage_gaps(config, client, schedule, callouts, date).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtract_intervals_handles_disjoint_and_overlapping_cuts() {
        let residual = subtract_intervals(480, 1020, &[(540, 600), (900, 1020)]);
        assert_eq!(residual, vec![(480, 540), (600, 900)]);
    }

    #[test]
    fn full_day_with_no_entries_is_one_big_gap() {
        let config = EngineConfig::default();
        let client = Client {
            id: Uuid::new_v4(),
            name: "C".into(),
            team_id: None,
            insurance_requirements: vec![],
            allied_health_needs: vec![],
        };
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap(); // Monday
        let gaps = coverage_gaps(&config, &client, &[], &[], date);
        assert_eq!(gaps, vec![Gap { start: config.op_start, end: config.op_end }]);
    }

    #[test]
    fn weekend_is_always_gap_free() {
        let config = EngineConfig::default();
        let client = Client {
            id: Uuid::new_v4(),
            name: "C".into(),
            team_id: None,
            insurance_requirements: vec![],
            allied_health_needs: vec![],
        };
        let saturday = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert!(coverage_gaps(&config, &client, &[], &[], saturday).is_empty());
    }
}
