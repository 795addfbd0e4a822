use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Chain, Direction, TxStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    pub decimals: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeProvenance {
    pub data_source: String,
    pub scraped_at: DateTime<Utc>,
    pub scraper_version: String,
}

/// Canonical transfer record as produced by the normalizer, before it has
/// been assigned a storage id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub network_id: Uuid,
    pub network_name: String,
    pub chain: Chain,
    pub wallet_address: String,
    /// Globally unique; the dedup key.
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
    /// Amount exactly as the scanner reported it.
    pub amount_raw: String,
    pub token: TokenInfo,
    pub usd_value: Option<Decimal>,
    pub block_number: Option<i64>,
    pub timestamp: DateTime<Utc>,
    /// `YYYY-MM-DD` in the clock the scanner reported.
    pub date: String,
    pub direction: Direction,
    pub status: TxStatus,
    pub provenance: ScrapeProvenance,
}

impl NewTransaction {
    pub fn usd_or_zero(&self) -> Decimal {
        self.usd_value.unwrap_or(Decimal::ZERO)
    }
}

/// A stored transaction. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    #[serde(flatten)]
    pub data: NewTransaction,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn usd_or_zero(&self) -> Decimal {
        self.data.usd_or_zero()
    }
}
