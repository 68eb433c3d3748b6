//! In-memory reference implementations of [`RosterStore`] and
//! [`LearningService`]. These back the workspace's integration tests and
//! double as the simplest possible host wiring — a real deployment swaps
//! them for a database-backed and ML-backed implementation of the same
//! traits without the engine or its callers noticing.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
use uuid::Uuid;

use scheduling_engine::{BaseSchedule, Callout, Client, ScheduleEntry, Team, Therapist, Violation};

use crate::{LearningService, RosterSnapshot, RosterStore, StoreError};

/// A fixed-in-advance snapshot served for every date. Suitable for tests
/// and for a host that has already loaded its tables into memory at
/// startup; a store with per-date variation (e.g. callouts that differ by
/// day) should filter `callouts`/`base_schedules` itself before handing
/// them to the engine, same as any other `RosterStore` implementation.
pub struct InMemoryRosterStore {
    clients: Vec<Client>,
    therapists: Vec<Therapist>,
    teams: Vec<Team>,
    callouts: Vec<Callout>,
    base_schedules: Vec<BaseSchedule>,
    settings: HashMap<String, serde_json::Value>,
}

impl InMemoryRosterStore {
    pub fn new(
        clients: Vec<Client>,
        therapists: Vec<Therapist>,
        teams: Vec<Team>,
        callouts: Vec<Callout>,
        base_schedules: Vec<BaseSchedule>,
        settings: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            clients,
            therapists,
            teams,
            callouts,
            base_schedules,
            settings,
        }
    }
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn snapshot(&self, date: NaiveDate) -> Result<RosterSnapshot, StoreError> {
        let callouts = self
            .callouts
            .iter()
            .filter(|c| c.covers_date(date))
            .cloned()
            .collect();
        Ok(RosterSnapshot {
            clients: self.clients.clone(),
            therapists: self.therapists.clone(),
            teams: self.teams.clone(),
            callouts,
            base_schedules: self.base_schedules.clone(),
            settings: self.settings.clone(),
        })
    }
}

/// A learning service with nothing mined yet: `top_schedules` always
/// returns empty, `lunch_preferences` always returns empty,
/// `record_feedback` is a no-op. Engine behavior with this implementation
/// must be identical to having no learning service at all, per §6 and §7.
#[derive(Debug, Default)]
pub struct NullLearningService;

#[async_trait]
impl LearningService for NullLearningService {
    async fn top_schedules(&self, _weekday: Weekday, _k: usize) -> Vec<Vec<ScheduleEntry>> {
        Vec::new()
    }

    async fn lunch_preferences(&self) -> HashMap<Uuid, (u32, u32)> {
        HashMap::new()
    }

    async fn record_feedback(&self, _schedule: &[ScheduleEntry], _rating: f64, _violations: &[Violation]) {}
}

/// An in-memory learning service that actually accumulates feedback,
/// keyed by weekday, and returns the highest-rated schedules first. Tests
/// exercising the "mined seed" path in §4.11(c) use this rather than the
/// null stub.
#[derive(Default)]
pub struct InMemoryLearningService {
    rated: RwLock<HashMap<Weekday, Vec<(f64, Vec<ScheduleEntry>)>>>,
    lunch_preferences: RwLock<HashMap<Uuid, (u32, u32)>>,
}

impl InMemoryLearningService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lunch_preference(self, therapist_id: Uuid, window: (u32, u32)) -> Self {
        self.lunch_preferences.write().unwrap().insert(therapist_id, window);
        self
    }
}

#[async_trait]
impl LearningService for InMemoryLearningService {
    async fn top_schedules(&self, weekday: Weekday, k: usize) -> Vec<Vec<ScheduleEntry>> {
        let rated = self.rated.read().unwrap();
        let Some(entries) = rated.get(&weekday) else {
            return Vec::new();
        };
        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        sorted.into_iter().take(k).map(|(_, schedule)| schedule).collect()
    }

    async fn lunch_preferences(&self) -> HashMap<Uuid, (u32, u32)> {
        self.lunch_preferences.read().unwrap().clone()
    }

    async fn record_feedback(&self, schedule: &[ScheduleEntry], rating: f64, _violations: &[Violation]) {
        let Some(first) = schedule.first() else { return };
        let weekday = first.weekday;
        self.rated
            .write()
            .unwrap()
            .entry(weekday)
            .or_default()
            .push((rating, schedule.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_filters_callouts_by_date() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let other_date = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let therapist_id = Uuid::new_v4();
        let callout = Callout {
            id: Uuid::new_v4(),
            entity_kind: scheduling_engine::EntityKind::Therapist,
            entity_id: therapist_id,
            date_start: other_date,
            date_end: other_date,
            window_start: 0,
            window_end: 100,
            reason: None,
        };
        let store = InMemoryRosterStore::new(vec![], vec![], vec![], vec![callout], vec![], HashMap::new());
        let snapshot = store.snapshot(date).await.unwrap();
        assert!(snapshot.callouts.is_empty());
    }

    #[tokio::test]
    async fn null_learning_service_returns_nothing() {
        let service = NullLearningService;
        assert!(service.top_schedules(Weekday::Mon, 5).await.is_empty());
        assert!(service.lunch_preferences().await.is_empty());
    }

    #[tokio::test]
    async fn in_memory_learning_service_ranks_by_rating() {
        let service = InMemoryLearningService::new();
        let low = vec![ScheduleEntry::new(None, Uuid::new_v4(), Weekday::Mon, 480, 510, scheduling_engine::SessionKind::AdminTime)];
        let high = vec![ScheduleEntry::new(None, Uuid::new_v4(), Weekday::Mon, 480, 510, scheduling_engine::SessionKind::AdminTime)];
        service.record_feedback(&low, 0.2, &[]).await;
        service.record_feedback(&high, 0.9, &[]).await;

        let top = service.top_schedules(Weekday::Mon, 1).await;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0][0].therapist_id, high[0].therapist_id);
    }
}
