use axum::{extract::State, Json};
use contracts::system::health::HealthResponse;

use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.service_name.clone()))
}
