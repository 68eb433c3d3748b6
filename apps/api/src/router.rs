use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{create_schedule, healthz};
use crate::state::ApiState;

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ABA roster scheduling engine" }))
        .route("/healthz", get(healthz))
        .route("/v1/schedules", post(create_schedule))
        .with_state(state)
}
