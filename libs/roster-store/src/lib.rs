//! The persistence and learning-service contracts §6 fixes for the
//! scheduling engine, plus in-memory reference implementations.
//!
//! Neither contract is implemented by the engine itself (§1's "out of
//! scope" list): the engine only ever consumes a [`RosterSnapshot`] taken
//! once at `run` entry, and treats a [`LearningService`] as a best-effort
//! oracle whose failures degrade seed quality but never abort a run. The
//! in-memory structs here exist so the host crate and the engine's own
//! integration tests have something concrete to depend on without pulling
//! in a real database client.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
use std::collections::HashMap;
use uuid::Uuid;

use scheduling_engine::{BaseSchedule, Callout, Client, ScheduleEntry, Team, Therapist};

pub use error::StoreError;

/// A read-through snapshot of everything the engine needs for one `run`
/// call, taken once at invocation time (§5's snapshot-at-entry contract).
#[derive(Debug, Clone, Default)]
pub struct RosterSnapshot {
    pub clients: Vec<Client>,
    pub therapists: Vec<Therapist>,
    pub teams: Vec<Team>,
    pub callouts: Vec<Callout>,
    pub base_schedules: Vec<BaseSchedule>,
    /// `settings.value` is an opaque JSON payload (§6); the one key the
    /// engine's host cares about is `insurance_qualifications`, which the
    /// host reads out of this map before constructing `EngineInputs`.
    pub settings: HashMap<String, serde_json::Value>,
}

impl RosterSnapshot {
    /// The named base schedule whose weekday set contains `date`'s
    /// weekday, if any. Multiple matches are possible in storage (e.g. a
    /// draft overriding a published preset); the first match wins, mirroring
    /// the store's row-insertion order rather than imposing the engine's
    /// own tie-break.
    pub fn base_schedule_for(&self, date: NaiveDate) -> Option<&BaseSchedule> {
        use chrono::Datelike;
        let weekday = date.weekday();
        self.base_schedules.iter().find(|b| b.weekdays.contains(&weekday))
    }
}

/// The persistence contract (§6): a read-through snapshot of the keyed
/// document collections the engine's caller needs. Bulk CRUD,
/// subscriptions, and realtime notification are the store's concern, not
/// the engine's — this trait exposes only what `run` consumes.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Reads every collection relevant to scheduling `date` in one shot.
    /// A store backed by a real database is free to issue several queries
    /// internally; the contract only promises the result is consistent as
    /// of one point in time, not that it is a single round trip.
    async fn snapshot(&self, date: NaiveDate) -> Result<RosterSnapshot, StoreError>;
}

/// The optional learning-service contract (§6). An engine invocation with
/// no learning service available must behave identically to one with an
/// always-empty implementation of this trait, apart from seed quality
/// (§7: "failures to read them degrade seed quality but never abort run").
#[async_trait]
pub trait LearningService: Send + Sync {
    /// Up to `k` prior schedules for `weekday`, most highly rated first.
    async fn top_schedules(&self, weekday: Weekday, k: usize) -> Vec<Vec<ScheduleEntry>>;

    /// Therapist-id → preferred (start, end) lunch window, mined from past
    /// accepted schedules.
    async fn lunch_preferences(&self) -> HashMap<Uuid, (u32, u32)>;

    /// Records a caller's rating of a produced schedule, alongside its
    /// residual violations, for future mining. Best-effort: a failure here
    /// must never propagate back to the caller of `run`.
    async fn record_feedback(&self, schedule: &[ScheduleEntry], rating: f64, violations: &[scheduling_engine::Violation]);
}
