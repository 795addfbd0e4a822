use axum::extract::{Path, Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_date_param, ApiResponse};
use crate::db::{SortOrder, TransactionFilter};
use crate::errors::AppError;
use crate::models::{Chain, Direction, Transaction};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;
const DEFAULT_RECENT: i64 = 20;
const MAX_RECENT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// `incoming`, `outgoing` or `all`.
    pub transfer_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub blockchain: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub search_hash: Option<String>,
    /// `asc` or `desc` by timestamp.
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}

impl TransactionParams {
    fn page(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }

    /// Rows to skip for the requested page. Saturates for very large pages.
    fn offset(&self) -> i64 {
        let (page, limit) = self.page();
        (page - 1).saturating_mul(limit)
    }

    fn to_filter(&self, network_id: Uuid) -> Result<TransactionFilter, AppError> {
        let mut filter = TransactionFilter::for_networks([network_id]);

        filter.direction = match self.transfer_type.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                Direction::from_db_str(raw)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown transferType {raw:?}")))?,
            ),
        };
        filter.chain = match self.blockchain.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                Chain::from_db_str(raw)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown blockchain {raw:?}")))?,
            ),
        };
        filter.from = non_blank(&self.start_date)
            .map(|s| parse_date_param("startDate", s, false))
            .transpose()?;
        filter.to = non_blank(&self.end_date)
            .map(|s| parse_date_param("endDate", s, true))
            .transpose()?;
        filter.min_amount = self.min_amount;
        filter.max_amount = self.max_amount;
        filter.hash_contains = non_blank(&self.search_hash).map(|s| s.trim().to_string());
        filter.order = match self.sort.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::BadRequest("startDate is after endDate".into()));
            }
        }
        Ok(filter)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// GET /api/blockchain/networks/:network_id/transactions: Filtered, paginated.
pub async fn list_for_network(
    State(state): State<AppState>,
    Path(network_id): Path<Uuid>,
    Query(params): Query<TransactionParams>,
) -> Result<Json<ApiResponse<TransactionPage>>, AppError> {
    if state.networks.active_network(network_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Network {network_id} not found or inactive"
        )));
    }

    let (page, limit) = params.page();
    let offset = params.offset();
    let mut filter = params.to_filter(network_id)?;
    let total = state.store.count(&filter).await?;

    let transactions = if offset >= total {
        Vec::new()
    } else {
        filter.limit = Some(limit);
        filter.offset = Some(offset);
        state.store.query(&filter).await?
    };

    Ok(Json(ApiResponse::ok(TransactionPage {
        transactions,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        },
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<i64>,
}

/// GET /api/blockchain/transactions: Most recent incoming transfers.
pub async fn recent(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    let filter = TransactionFilter {
        limit: Some(params.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT)),
        ..Default::default()
    }
    .incoming();
    let transactions = state.store.query(&filter).await?;
    Ok(Json(ApiResponse::ok(transactions)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamps() {
        assert_eq!(TransactionParams::default().page(), (1, DEFAULT_PAGE_SIZE));
        let params = TransactionParams {
            page: Some(0),
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(params.page(), (1, MAX_PAGE_SIZE));
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        let params = TransactionParams {
            page: Some(3),
            limit: Some(20),
            ..Default::default()
        };
        assert_eq!(params.offset(), 40);

        let params = TransactionParams {
            page: Some(i64::MAX),
            limit: Some(MAX_PAGE_SIZE),
            ..Default::default()
        };
        assert_eq!(params.page(), (i64::MAX, MAX_PAGE_SIZE));
        assert_eq!(params.offset(), i64::MAX);
    }

    #[test]
    fn test_filter_from_params() {
        let id = Uuid::new_v4();
        let params = TransactionParams {
            transfer_type: Some("incoming".into()),
            blockchain: Some("eth".into()),
            start_date: Some("2024-03-01".into()),
            search_hash: Some(" 0xAB ".into()),
            sort: Some("ASC".into()),
            ..Default::default()
        };
        let filter = params.to_filter(id).unwrap();
        assert_eq!(filter.network_ids, vec![id]);
        assert_eq!(filter.direction, Some(Direction::Incoming));
        assert_eq!(filter.chain, Some(Chain::Ethereum));
        assert!(filter.from.is_some());
        assert!(filter.to.is_none());
        assert_eq!(filter.hash_contains.as_deref(), Some("0xAB"));
        assert_eq!(filter.order, SortOrder::Asc);
    }

    #[test]
    fn test_filter_all_means_unfiltered() {
        let params = TransactionParams {
            transfer_type: Some("all".into()),
            blockchain: Some("all".into()),
            ..Default::default()
        };
        let filter = params.to_filter(Uuid::new_v4()).unwrap();
        assert!(filter.direction.is_none());
        assert!(filter.chain.is_none());
    }

    #[test]
    fn test_filter_rejects_bad_values() {
        let params = TransactionParams {
            blockchain: Some("dogecoin".into()),
            ..Default::default()
        };
        assert!(params.to_filter(Uuid::new_v4()).is_err());

        let params = TransactionParams {
            start_date: Some("2024-03-10".into()),
            end_date: Some("2024-03-01".into()),
            ..Default::default()
        };
        assert!(params.to_filter(Uuid::new_v4()).is_err());
    }
}
