use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::{PerChain, Transaction};

/// The time window a summary was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub days: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub is_month_filter: bool,
    pub month_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Network level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStats {
    pub address: String,
    pub count: usize,
    pub total_usd_value: Decimal,
    pub recent_transactions: Vec<Transaction>,
}

/// Transactions stored against a network whose wallet address is not one of
/// the network's configured wallets. Reported, never totalled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedStats {
    pub count: usize,
    pub usd_value: Decimal,
}

impl UnmatchedStats {
    pub fn add(&mut self, other: &UnmatchedStats) {
        self.count += other.count;
        self.usd_value += other.usd_value;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    /// Matched transactions only.
    pub count: usize,
    /// Sum of `wallets[].total_usd_value`.
    pub total_usd_value: Decimal,
    pub wallets: Vec<WalletStats>,
    pub unmatched: UnmatchedStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub total_wallets: usize,
    pub bitcoin: usize,
    pub ethereum: usize,
    pub tron: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub network_id: Uuid,
    pub network_name: String,
    pub period: Period,
    pub total_transactions: usize,
    pub total_usd_value: Decimal,
    pub breakdown: PerChain<ChainStats>,
    pub wallet_summary: WalletSummary,
    pub unmatched: UnmatchedStats,
    pub recent_transactions: Vec<Transaction>,
}

// ---------------------------------------------------------------------------
// System-wide
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallChainStats {
    pub count: usize,
    pub total_usd_value: Decimal,
    pub networks_with_wallets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDetail {
    pub network_id: Uuid,
    pub network_name: String,
    pub total_usd_value: Decimal,
    pub total_transactions: usize,
    pub wallet_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallSummary {
    pub total_networks: usize,
    pub active_networks_with_wallets: usize,
    pub total_transactions: usize,
    pub total_usd_value: Decimal,
    pub breakdown: PerChain<OverallChainStats>,
    pub unmatched: UnmatchedStats,
    pub network_details: Vec<NetworkDetail>,
    pub recent_transactions: Vec<Transaction>,
    pub period: Period,
}

// ---------------------------------------------------------------------------
// Manager level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerChainStats {
    pub count: usize,
    pub total_usd_value: Decimal,
    pub wallet_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerNetworkDetail {
    pub network_id: Uuid,
    pub network_name: String,
    pub total_usd_value: Decimal,
    pub transaction_count: usize,
    pub breakdown: PerChain<ManagerChainStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerTotals {
    pub manager_id: Uuid,
    pub total_usd_value: Decimal,
    pub networks_count: usize,
    pub total_transactions: usize,
    pub breakdown: PerChain<ManagerChainStats>,
    pub network_details: Vec<ManagerNetworkDetail>,
    pub period: Period,
}
