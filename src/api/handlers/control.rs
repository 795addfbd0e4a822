use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::ApiResponse;
use crate::errors::AppError;
use crate::models::{NetworkScanOutcome, RunStatus};
use crate::AppState;

/// POST /api/blockchain/scrape: Start a full run in the background.
pub async fn trigger_run(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<RunStatus>>), AppError> {
    let status = state.orchestrator.start_run().await?;
    tracing::info!("Scrape run triggered via API");
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok(status).with_message("Blockchain scrapers started")),
    ))
}

/// POST /api/blockchain/scrape/:network_id: Scan one network and wait for it.
pub async fn trigger_network_run(
    State(state): State<AppState>,
    Path(network_id): Path<Uuid>,
) -> Result<Json<ApiResponse<NetworkScanOutcome>>, AppError> {
    let outcome = state.orchestrator.run_network_scrapers(network_id).await?;
    let message = format!(
        "Scraped {}: {} new transactions",
        outcome.network_name,
        outcome.new_transactions()
    );
    Ok(Json(ApiResponse::ok(outcome).with_message(message)))
}

/// GET /api/blockchain/status: Snapshot of the current or last run.
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<RunStatus>> {
    Json(ApiResponse::ok(state.orchestrator.status().await))
}
