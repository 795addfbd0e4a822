use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::aggregation::AggregationError;
use crate::db::StoreError;
use crate::models::RunStatus;
use crate::services::orchestrator::RunError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A scrape run is already in flight; carries its status.
    #[error("Scrapers are already running. Please wait for completion.")]
    Conflict(Box<RunStatus>),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<RunStatus>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, message, data) = match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, message, None),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, message, None),
            AppError::Conflict(status) => (StatusCode::CONFLICT, message, Some(*status)),
            AppError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, message, None),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into(), None)
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
                data,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<RunError> for AppError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::AlreadyRunning(status) => AppError::Conflict(status),
            RunError::NetworkNotFound(id) => {
                AppError::NotFound(format!("Network {id} not found or inactive"))
            }
            RunError::ScannerUnavailable(msg) => AppError::Unavailable(msg),
            RunError::Store(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<AggregationError> for AppError {
    fn from(e: AggregationError) -> Self {
        match e {
            AggregationError::NetworkNotFound(id) => {
                AppError::NotFound(format!("Network {id} not found or inactive"))
            }
            AggregationError::Window(e) => AppError::BadRequest(e.to_string()),
            AggregationError::Store(e) => AppError::Internal(e.into()),
        }
    }
}
