//! Violation taxonomy.
//!
//! The engine's errors fall into two taxonomies (§7): input errors, which
//! short-circuit `run` with an empty schedule, and residual violations,
//! which are produced alongside a real schedule and are informational
//! rather than fatal. Both are represented as [`Violation`] so a caller
//! handles them uniformly; [`RuleId::is_input_error`] distinguishes them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    Hard,
    Soft,
}

#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RuleId {
    // Input errors (§7) — no schedule is produced when one of these fires.
    #[error("MISSING_DATE")]
    MissingDate,
    #[error("MISSING_DATA")]
    MissingData,
    #[error("UNKNOWN_ENTITY")]
    UnknownEntity,

    // Kernel predicates (§4.2).
    #[error("THERAPIST_CONFLICT")]
    TherapistConflict,
    #[error("CLIENT_CONFLICT")]
    ClientConflict,
    #[error("CALLOUT_OVERLAP")]
    CalloutOverlap,
    #[error("CREDENTIAL_MISMATCH")]
    CredentialMismatch,
    #[error("AH_QUALIFICATION_MISSING")]
    AhQualificationMissing,
    #[error("DURATION_INVALID")]
    DurationInvalid,
    #[error("OUTSIDE_OPERATING_HOURS")]
    OutsideOperatingHours,
    #[error("SAME_CLIENT_BACK_TO_BACK")]
    SameClientBackToBack,

    // Aggregate checks (§4.3).
    #[error("MD_MEDICAID_LIMIT_VIOLATED")]
    MedicaidCapViolated,
    #[error("MISSING_LUNCH")]
    MissingLunch,
    #[error("MULTIPLE_LUNCH")]
    MultipleLunch,
    #[error("LUNCH_OUTSIDE_WINDOW")]
    LunchOutsideWindow,
    #[error("ABA_ON_WEEKEND")]
    AbaOnWeekend,
    #[error("BCBA_NO_DIRECT_CLIENT_TIME")]
    BcbaNoDirectClientTime,
    #[error("TOO_MANY_BILLABLE_SESSIONS")]
    TooManyBillableSessions,
    #[error("COVERAGE_GAP")]
    CoverageGap,

    // Soft structural terms (§4.10).
    #[error("LUNCH_STAGGER")]
    LunchStagger,
    #[error("TEAM_ALIGNMENT_MISMATCH")]
    TeamAlignmentMismatch,
    #[error("FRAGMENTATION")]
    Fragmentation,
}

impl RuleId {
    pub fn severity(self) -> Severity {
        use RuleId::*;
        match self {
            MissingDate | MissingData | UnknownEntity | TherapistConflict | ClientConflict
            | CalloutOverlap | CredentialMismatch | AhQualificationMissing | DurationInvalid
            | OutsideOperatingHours | SameClientBackToBack | MedicaidCapViolated
            | MissingLunch | MultipleLunch | LunchOutsideWindow | AbaOnWeekend => Severity::Hard,
            BcbaNoDirectClientTime | TooManyBillableSessions | CoverageGap | LunchStagger
            | TeamAlignmentMismatch | Fragmentation => Severity::Soft,
        }
    }

    pub fn is_input_error(self) -> bool {
        matches!(self, RuleId::MissingDate | RuleId::MissingData | RuleId::UnknownEntity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: RuleId,
    pub message: String,
    pub severity: Severity,
    pub entry_id: Option<Uuid>,
    pub detail: Option<String>,
}

impl Violation {
    pub fn new(rule_id: RuleId, message: impl Into<String>) -> Self {
        Self {
            severity: rule_id.severity(),
            rule_id,
            message: message.into(),
            entry_id: None,
            detail: None,
        }
    }

    pub fn with_entry(mut self, entry_id: Uuid) -> Self {
        self.entry_id = Some(entry_id);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
