use std::sync::Arc;

use roster_store::LearningService;
use shared_config::EngineConfig;

/// Shared state for every handler.
///
/// `learning` is a trait object (§6's learning-service contract): it's
/// long-lived so feedback recorded by one request can seed another's
/// population later. The persistence-store side of §6 is request-scoped
/// instead — each request already carries its own clients/therapists/
/// callouts in the body (this thin host has no database of its own to
/// read from), so the handler wraps that body in an ephemeral
/// `InMemoryRosterStore` and calls it through the `RosterStore` trait
/// rather than skipping the abstraction.
pub struct ApiState {
    pub config: EngineConfig,
    pub learning: Arc<dyn LearningService>,
}
