use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.store.ping().await.is_ok();
    let scanner = match state.scanner.check_environment().await {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    };

    if db_ok {
        (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "db": "connected", "scanner": scanner })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "db": "disconnected", "scanner": scanner })),
        )
    }
}
