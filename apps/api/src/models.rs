//! Wire-shaped request/response DTOs for the scheduling endpoint. These
//! mirror the engine's own types one-for-one (§3's entities are already
//! `serde`-derived) rather than inventing a parallel representation.

use chrono::NaiveDate;
use serde::Deserialize;

use scheduling_engine::{BaseSchedule, Callout, Client, ScheduleEntry, Team, Therapist};

/// The body of `POST /v1/schedules`: one day's inputs, snapshotted by the
/// caller (§5's snapshot-at-entry contract starts here, not inside the
/// engine — the host owns the read from whatever store it's wired to).
#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub date: NaiveDate,
    pub clients: Vec<Client>,
    pub therapists: Vec<Therapist>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub callouts: Vec<Callout>,
    #[serde(default)]
    pub base_schedules: Vec<BaseSchedule>,
    /// A caller-provided schedule to seed the population with, e.g. a
    /// prior response's `schedule` field, to exercise the "seed =
    /// previous_output" monotone-improvement property (§8).
    #[serde(default)]
    pub seed: Option<Vec<ScheduleEntry>>,
    /// Reproducible RNG seed; omit for system entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    /// How many prior schedules to mine from the learning service for
    /// this weekday (§4.11(c)); the engine caps this at 20% of the
    /// population regardless of what's requested here.
    #[serde(default = "default_mined_seed_count")]
    pub mined_seed_count: usize,
}

fn default_mined_seed_count() -> usize {
    10
}

/// Not strictly required (the engine's `RunOutcome` is already
/// `Serialize`) but keeping a thin type here leaves room for the host to
/// add response-only fields (pagination, request id) without touching the
/// engine crate.
pub type ScheduleResponse = scheduling_engine::RunOutcome;
