//! The ABA clinic roster engine: a constructive + evolutionary optimizer
//! that assigns each client a day of therapy sessions, interleaved with
//! mandatory lunch breaks, subject to the constraints in [`constraints`]
//! and [`validator`].
//!
//! [`run`] is the single entrypoint (§6): it snapshots its inputs,
//! initializes a population, iterates selection → crossover → repair →
//! mutate → evaluate, polishes the best individual with local search, and
//! returns a [`RunOutcome`]. Everything else in this crate is a building
//! block `run` composes; callers who only need a piece of the model (the
//! validator, the coverage-gap scan) are free to depend on these modules
//! directly without going through the evolutionary loop.
//!
//! This crate never installs a `tracing` subscriber — logging is an
//! ambient, host-installed concern (see `apps/api::main`), not something a
//! pure-compute library configures for itself.

pub mod availability;
pub mod constraints;
pub mod coverage;
pub mod crossover;
pub mod engine;
pub mod errors;
pub mod fitness;
pub mod models;
pub mod mutation;
pub mod repair;
pub mod seeder;
pub mod time;
pub mod validator;

pub use engine::{run, EngineInputs, RunOptions, RunOutcome};
pub use errors::{RuleId, Severity, Violation};
pub use models::{
    AlliedHealthKind, AlliedHealthNeed, BaseSchedule, Callout, Client, EntityKind, Qualification,
    Role, ScheduleEntry, SessionKind, Team, Therapist, MD_MEDICAID,
};
