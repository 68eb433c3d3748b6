use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Datelike;
use serde_json::{json, Value};

use roster_store::memory::InMemoryRosterStore;
use roster_store::RosterStore;
use scheduling_engine::{EngineInputs, RunOptions};
use shared_models::AppError;

use crate::models::{ScheduleRequest, ScheduleResponse};
use crate::state::ApiState;

/// `POST /v1/schedules`: runs one day's constructive + evolutionary
/// optimization and returns the resulting schedule (§6's `run`
/// entrypoint, unwrapped over HTTP). Input errors (§7) come back as a
/// normal `200` with `success: false` and a populated `violations` list —
/// the engine's own error taxonomy, not an HTTP failure — since a caller
/// asking to schedule an empty roster isn't malformed, just trivial.
pub async fn create_schedule(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let store = InMemoryRosterStore::new(
        request.clients,
        request.therapists,
        request.teams,
        request.callouts,
        request.base_schedules,
        HashMap::new(),
    );

    let snapshot = store
        .snapshot(request.date)
        .await
        .map_err(|err| AppError::Collaborator(err.to_string()))?;

    let weekday = request.date.weekday();
    let prior_schedules = state.learning.top_schedules(weekday, request.mined_seed_count).await;
    let lunch_preferences = state.learning.lunch_preferences().await;

    let config = state.config.clone();
    let date = request.date;
    let seed = request.seed;
    let rng_seed = request.rng_seed;

    // The evolutionary loop is CPU-bound and can run for up to 150
    // generations; it belongs on a blocking thread so it never stalls the
    // async runtime's other connections.
    let outcome = tokio::task::spawn_blocking(move || {
        let base_schedule = snapshot.base_schedule_for(date);
        let inputs = EngineInputs {
            clients: &snapshot.clients,
            therapists: &snapshot.therapists,
            date,
            callouts: &snapshot.callouts,
            seed: seed.as_deref(),
            base_schedule,
            prior_schedules: &prior_schedules,
            lunch_preferences: &lunch_preferences,
        };
        scheduling_engine::run(&config, inputs, RunOptions { rng_seed, cancel: None })
    })
    .await
    .map_err(|err| AppError::Internal(format!("scheduling task panicked: {err}")))?;

    Ok(Json(outcome))
}

/// `GET /healthz`: liveness probe. The engine does no I/O of its own, so
/// there's no dependency to check — this just confirms the process is up
/// and its configuration loaded sanely.
pub async fn healthz(State(state): State<Arc<ApiState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "config_sane": state.config.is_sane(),
    }))
}
