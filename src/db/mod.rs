pub mod memory;
pub mod network_repo;
pub mod pg;
pub mod transaction_repo;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Chain, Direction, Network, NewTransaction, Transaction};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row that no longer maps onto the domain types.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

// ---------------------------------------------------------------------------
// Query filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter over stored transactions. Unset fields match everything; an empty
/// `network_ids` means any network.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub network_ids: Vec<Uuid>,
    pub chain: Option<Chain>,
    pub wallet_address: Option<String>,
    pub direction: Option<Direction>,
    /// Inclusive lower bound on the transaction timestamp.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the transaction timestamp.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the transaction hash.
    pub hash_contains: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub order: SortOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionFilter {
    pub fn for_networks(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            network_ids: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn incoming(mut self) -> Self {
        self.direction = Some(Direction::Incoming);
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Whether `tx` passes every predicate. Ignores ordering and paging.
    pub fn matches(&self, tx: &Transaction) -> bool {
        let t = &tx.data;
        if !self.network_ids.is_empty() && !self.network_ids.contains(&t.network_id) {
            return false;
        }
        if self.chain.is_some_and(|c| c != t.chain) {
            return false;
        }
        if self
            .wallet_address
            .as_deref()
            .is_some_and(|w| w != t.wallet_address)
        {
            return false;
        }
        if self.direction.is_some_and(|d| d != t.direction) {
            return false;
        }
        if self.from.is_some_and(|from| t.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| t.timestamp > to) {
            return false;
        }
        if let Some(needle) = &self.hash_contains {
            if !t.tx_hash.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.min_amount.is_some_and(|min| t.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| t.amount > max) {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert unless a transaction with the same hash exists. Returns whether
    /// a row was written. Atomic with respect to concurrent callers.
    async fn upsert_if_absent(&self, tx: &NewTransaction) -> Result<bool, StoreError>;

    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError>;

    /// Number of matches, ignoring `limit` and `offset`.
    async fn count(&self, filter: &TransactionFilter) -> Result<i64, StoreError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Read-only view of configured networks.
#[async_trait]
pub trait NetworkDirectory: Send + Sync {
    async fn active_networks(&self) -> Result<Vec<Network>, StoreError>;

    async fn active_network(&self, id: Uuid) -> Result<Option<Network>, StoreError>;

    /// Active networks assigned to a manager.
    async fn networks_for_manager(&self, manager_id: Uuid) -> Result<Vec<Network>, StoreError>;
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
