use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::{parse_date_param, ApiResponse};
use crate::aggregation::{ManagerQuery, WindowQuery};
use crate::errors::AppError;
use crate::models::{ManagerTotals, NetworkSummary, OverallSummary};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub days: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl From<SummaryParams> for WindowQuery {
    fn from(p: SummaryParams) -> Self {
        WindowQuery {
            days: p.days,
            month: p.month,
            year: p.year,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ManagerParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
}

impl ManagerParams {
    fn into_query(self) -> Result<ManagerQuery, AppError> {
        let start = self
            .start_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date_param("start_date", s, false))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date_param("end_date", s, true))
            .transpose()?;
        Ok(ManagerQuery {
            month: self.month,
            year: self.year,
            start,
            end,
        })
    }
}

/// GET /api/blockchain/summary: Totals across every active network.
pub async fn overall(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<ApiResponse<OverallSummary>>, AppError> {
    let summary = state.aggregation.overall_summary(params.into()).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// GET /api/blockchain/networks/:network_id/summary
pub async fn network(
    State(state): State<AppState>,
    Path(network_id): Path<Uuid>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<ApiResponse<NetworkSummary>>, AppError> {
    let summary = state
        .aggregation
        .network_summary(network_id, params.into())
        .await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// GET /api/blockchain/managers/:manager_id/total-value
pub async fn manager_total_value(
    State(state): State<AppState>,
    Path(manager_id): Path<Uuid>,
    Query(params): Query<ManagerParams>,
) -> Result<Json<ApiResponse<ManagerTotals>>, AppError> {
    let totals = state
        .aggregation
        .manager_total_value(manager_id, params.into_query()?)
        .await?;
    Ok(Json(ApiResponse::ok(totals)))
}
