//! Fixture builders for scheduling-engine tests, in the same spirit as the
//! teacher's `TestConfig`/`TestUser` builders: small structs with sensible
//! defaults and a handful of `with_*` methods, used from `#[cfg(test)]`
//! modules and integration tests across the workspace rather than any
//! production path.

use chrono::{Datelike, Weekday};
use uuid::Uuid;

use scheduling_engine::models::certificate_for;
use scheduling_engine::{
    AlliedHealthKind, AlliedHealthNeed, Callout, Client, EntityKind, Qualification, Role,
    Therapist, MD_MEDICAID,
};

/// Builds a [`Client`] with sensible defaults: no team, no insurance
/// requirements, no allied-health needs.
pub struct TestClient {
    pub id: Uuid,
    pub name: String,
    pub team_id: Option<Uuid>,
    pub insurance_requirements: Vec<Qualification>,
    pub allied_health_needs: Vec<AlliedHealthNeed>,
}

impl Default for TestClient {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Test Client".to_string(),
            team_id: None,
            insurance_requirements: Vec::new(),
            allied_health_needs: Vec::new(),
        }
    }
}

impl TestClient {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn medicaid(mut self) -> Self {
        self.insurance_requirements.push(MD_MEDICAID.to_string());
        self
    }

    pub fn requiring(mut self, qualification: &str) -> Self {
        self.insurance_requirements.push(qualification.to_string());
        self
    }

    pub fn team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn needing_allied_health(mut self, need: AlliedHealthNeed) -> Self {
        self.allied_health_needs.push(need);
        self
    }

    pub fn build(self) -> Client {
        Client {
            id: self.id,
            name: self.name,
            team_id: self.team_id,
            insurance_requirements: self.insurance_requirements,
            allied_health_needs: self.allied_health_needs,
        }
    }
}

/// Builds a [`Therapist`]. Defaults to an RBT with no qualifications and
/// no allied-health capability — the loosest possible therapist, so tests
/// that need credentials have to ask for them explicitly.
pub struct TestTherapist {
    pub id: Uuid,
    pub name: String,
    pub team_id: Option<Uuid>,
    pub role: Role,
    pub qualifications: Vec<Qualification>,
    pub allied_health_capable: std::collections::BTreeSet<AlliedHealthKind>,
}

impl Default for TestTherapist {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Test Therapist".to_string(),
            team_id: None,
            role: Role::Rbt,
            qualifications: Vec::new(),
            allied_health_capable: std::collections::BTreeSet::new(),
        }
    }
}

impl TestTherapist {
    pub fn new(name: &str, role: Role) -> Self {
        Self {
            name: name.to_string(),
            role,
            ..Self::default()
        }
    }

    pub fn qualified(mut self, qualification: &str) -> Self {
        self.qualifications.push(qualification.to_string());
        self
    }

    pub fn medicaid_certified(self) -> Self {
        self.qualified(MD_MEDICAID)
    }

    pub fn allied_health(mut self, kind: AlliedHealthKind) -> Self {
        self.allied_health_capable.insert(kind);
        self.qualified(certificate_for(kind))
    }

    pub fn team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn build(self) -> Therapist {
        Therapist {
            id: self.id,
            name: self.name,
            team_id: self.team_id,
            role: self.role,
            qualifications: self.qualifications,
            allied_health_capable: self.allied_health_capable,
        }
    }
}

/// Builds a [`Callout`] covering a single date and a time window, targeting
/// one entity.
pub struct TestCallout {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub date: chrono::NaiveDate,
    pub window_start: u32,
    pub window_end: u32,
    pub reason: Option<String>,
}

impl TestCallout {
    pub fn for_therapist(entity_id: Uuid, date: chrono::NaiveDate, window_start: u32, window_end: u32) -> Self {
        Self {
            entity_kind: EntityKind::Therapist,
            entity_id,
            date,
            window_start,
            window_end,
            reason: None,
        }
    }

    pub fn for_client(entity_id: Uuid, date: chrono::NaiveDate, window_start: u32, window_end: u32) -> Self {
        Self {
            entity_kind: EntityKind::Client,
            entity_id,
            date,
            window_start,
            window_end,
            reason: None,
        }
    }

    pub fn build(self) -> Callout {
        Callout {
            id: Uuid::new_v4(),
            entity_kind: self.entity_kind,
            entity_id: self.entity_id,
            date_start: self.date,
            date_end: self.date,
            window_start: self.window_start,
            window_end: self.window_end,
            reason: self.reason,
        }
    }
}

/// A Monday, chosen so weekday-dependent fixtures across the workspace's
/// tests agree on "a normal business day" without each redefining it.
pub fn a_monday() -> chrono::NaiveDate {
    let date = chrono::NaiveDate::from_ymd_opt(2026, 7, 27).expect("valid calendar date");
    debug_assert_eq!(date.weekday(), Weekday::Mon);
    date
}

/// A Saturday, for weekend-behavior tests.
pub fn a_saturday() -> chrono::NaiveDate {
    let date = chrono::NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid calendar date");
    debug_assert_eq!(date.weekday(), Weekday::Sat);
    date
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder_defaults_are_unconstrained() {
        let client = TestClient::default().build();
        assert!(client.insurance_requirements.is_empty());
        assert!(client.allied_health_needs.is_empty());
    }

    #[test]
    fn test_client_medicaid_adds_the_marker() {
        let client = TestClient::new("Medicaid Client").medicaid().build();
        assert!(client.is_medicaid());
    }

    #[test]
    fn test_therapist_builder_defaults_to_rbt() {
        let therapist = TestTherapist::default().build();
        assert_eq!(therapist.role, Role::Rbt);
        assert!(therapist.qualifications.is_empty());
    }

    #[test]
    fn test_therapist_allied_health_grants_the_certificate() {
        let therapist = TestTherapist::new("OT Therapist", Role::Cf)
            .allied_health(AlliedHealthKind::Ot)
            .build();
        assert!(therapist.can_deliver(AlliedHealthKind::Ot, &"OT_CERTIFIED".to_string()));
    }

    #[test]
    fn test_callout_builder_covers_its_single_date() {
        let date = a_monday();
        let callout = TestCallout::for_therapist(Uuid::new_v4(), date, 720, 750).build();
        assert!(callout.covers_date(date));
        assert!(!callout.covers_date(date.succ_opt().unwrap()));
    }
}
