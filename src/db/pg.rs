use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{network_repo, transaction_repo, NetworkDirectory, StoreError, TransactionFilter, TransactionStore};
use crate::models::{Network, NewTransaction, Transaction};

/// Postgres-backed store for both transactions and the network directory.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn upsert_if_absent(&self, tx: &NewTransaction) -> Result<bool, StoreError> {
        transaction_repo::insert_if_absent(&self.pool, tx).await
    }

    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        transaction_repo::query_transactions(&self.pool, filter).await
    }

    async fn count(&self, filter: &TransactionFilter) -> Result<i64, StoreError> {
        transaction_repo::count_transactions(&self.pool, filter).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl NetworkDirectory for PgStore {
    async fn active_networks(&self) -> Result<Vec<Network>, StoreError> {
        network_repo::get_active_networks(&self.pool).await
    }

    async fn active_network(&self, id: Uuid) -> Result<Option<Network>, StoreError> {
        network_repo::get_active_network(&self.pool, id).await
    }

    async fn networks_for_manager(&self, manager_id: Uuid) -> Result<Vec<Network>, StoreError> {
        network_repo::get_networks_for_manager(&self.pool, manager_id).await
    }
}
