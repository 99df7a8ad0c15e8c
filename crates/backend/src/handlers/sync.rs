use axum::{extract::State, http::StatusCode, Json};
use contracts::usecases::u501_sync_products::{SyncResponse, SyncStatusResponse, SyncTrigger};
use std::sync::Arc;

use crate::state::AppState;
use crate::usecases::u501_sync_products::SyncOutcome;

/// GET /sync
///
/// Ждет окончания прогона. Прогон идет в отдельной задаче и доводится
/// до конца, даже если клиент отключился.
pub async fn trigger(State(state): State<AppState>) -> (StatusCode, Json<SyncResponse>) {
    let executor = Arc::clone(&state.executor);
    let handle = tokio::spawn(async move { executor.run(SyncTrigger::Manual).await });

    match handle.await {
        Ok(Ok(SyncOutcome::Completed(report))) => {
            (StatusCode::OK, Json(SyncResponse::completed(report)))
        }
        Ok(Ok(SyncOutcome::NothingToLoad(report))) => (
            StatusCode::OK,
            Json(SyncResponse::skipped("nothing_to_load", Some(report))),
        ),
        Ok(Ok(SyncOutcome::SkippedAlreadyRunning)) => (
            StatusCode::OK,
            Json(SyncResponse::skipped("already_running", None)),
        ),
        Ok(Err(e)) => {
            tracing::error!("Manual sync failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncResponse::failed(e.to_string())),
            )
        }
        Err(e) => {
            tracing::error!("Manual sync task aborted: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncResponse::failed(format!("Sync task aborted: {}", e))),
            )
        }
    }
}

/// GET /sync/status
pub async fn status(State(state): State<AppState>) -> Json<SyncStatusResponse> {
    Json(SyncStatusResponse {
        state: state.executor.state(),
        last_run: state.executor.last_run(),
    })
}
