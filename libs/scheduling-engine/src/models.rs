use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A qualification tag is an opaque string: a credential ("BCBA", "RBT"),
/// an insurance marker ("MD_MEDICAID", "TRICARE"), or an allied-health
/// certificate ("OT Certified"). The engine never interprets the string
/// itself beyond a handful of well-known markers below.
pub type Qualification = String;

/// The insurance marker that activates the hard 3-therapist cap.
pub const MD_MEDICAID: &str = "MD_MEDICAID";

/// The certificate qualification an allied-health entry's therapist must
/// carry, keyed by kind.
pub fn certificate_for(kind: AlliedHealthKind) -> &'static str {
    match kind {
        AlliedHealthKind::Ot => "OT_CERTIFIED",
        AlliedHealthKind::Slp => "SLP_CERTIFIED",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

/// Coarse seniority tag, ordered BCBA (most senior) to Other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Bcba,
    Cf,
    Star3,
    Star2,
    Star1,
    Rbt,
    Bt,
    Other,
}

impl Role {
    /// Lower is more senior; used to order crossover's parent merge
    /// (BCBA-first) and validator's "BCBA with no direct client time" check.
    pub fn rank(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlliedHealthKind {
    Ot,
    Slp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlliedHealthNeed {
    pub kind: AlliedHealthKind,
    pub frequency_per_week: u32,
    pub duration_minutes: u32,
    pub preferred_window: Option<(u32, u32)>,
    pub permitted_weekdays: Option<BTreeSet<Weekday>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub team_id: Option<Uuid>,
    pub insurance_requirements: Vec<Qualification>,
    pub allied_health_needs: Vec<AlliedHealthNeed>,
}

impl Client {
    pub fn is_medicaid(&self) -> bool {
        self.insurance_requirements.iter().any(|q| q == MD_MEDICAID)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    pub name: String,
    pub team_id: Option<Uuid>,
    pub role: Role,
    pub qualifications: Vec<Qualification>,
    pub allied_health_capable: BTreeSet<AlliedHealthKind>,
}

impl Therapist {
    pub fn satisfies(&self, requirements: &[Qualification]) -> bool {
        requirements
            .iter()
            .all(|req| self.qualifications.iter().any(|q| q == req))
    }

    pub fn can_deliver(&self, kind: AlliedHealthKind, certificate: &Qualification) -> bool {
        self.allied_health_capable.contains(&kind)
            && self.qualifications.iter().any(|q| q == certificate)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Therapist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callout {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub window_start: u32,
    pub window_end: u32,
    pub reason: Option<String>,
}

impl Callout {
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    pub fn overlaps_window(&self, start: u32, end: u32) -> bool {
        self.window_start < end && start < self.window_end
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionKind {
    Aba,
    AhOt,
    AhSlp,
    /// Lunch; always carries a null client.
    IndirectTime,
    AdminTime,
}

impl SessionKind {
    pub fn is_billable(self) -> bool {
        matches!(self, SessionKind::Aba | SessionKind::AhOt | SessionKind::AhSlp)
    }

    pub fn is_allied_health(self) -> bool {
        matches!(self, SessionKind::AhOt | SessionKind::AhSlp)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub therapist_id: Uuid,
    pub weekday: Weekday,
    pub start: u32,
    pub end: u32,
    pub kind: SessionKind,
}

impl ScheduleEntry {
    pub fn duration(&self) -> u32 {
        self.end - self.start
    }

    pub fn overlaps(&self, other_start: u32, other_end: u32) -> bool {
        self.start < other_end && other_start < self.end
    }

    pub fn new(
        client_id: Option<Uuid>,
        therapist_id: Uuid,
        weekday: Weekday,
        start: u32,
        end: u32,
        kind: SessionKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_id,
            therapist_id,
            weekday,
            start,
            end,
            kind,
        }
    }
}

/// A named per-weekday preset used to seed the population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseSchedule {
    pub id: Uuid,
    pub name: String,
    pub weekdays: BTreeSet<Weekday>,
    pub entries: Vec<ScheduleEntry>,
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
