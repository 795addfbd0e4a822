use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NetworkDirectory, SortOrder, StoreError, TransactionFilter, TransactionStore};
use crate::models::{Network, NewTransaction, Transaction};

#[derive(Default)]
struct Inner {
    transactions: Vec<Transaction>,
    hashes: HashSet<String>,
    networks: Vec<Network>,
}

/// In-process store with the same contract as the Postgres one. The hash
/// check and the insert happen under one write lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_networks(networks: impl IntoIterator<Item = Network>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                networks: networks.into_iter().collect(),
                ..Default::default()
            }),
        }
    }

    /// Add or replace a network by id.
    pub async fn insert_network(&self, network: Network) {
        let mut inner = self.inner.write().await;
        match inner.networks.iter().position(|n| n.id == network.id) {
            Some(idx) => inner.networks[idx] = network,
            None => inner.networks.push(network),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.transactions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn upsert_if_absent(&self, tx: &NewTransaction) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.hashes.insert(tx.tx_hash.clone()) {
            return Ok(false);
        }
        inner.transactions.push(Transaction {
            id: Uuid::new_v4(),
            data: tx.clone(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn query(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<Transaction> = inner
            .transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        out.sort_by(|a, b| {
            let by_time = a.data.timestamp.cmp(&b.data.timestamp);
            let by_time = match filter.order {
                SortOrder::Asc => by_time,
                SortOrder::Desc => by_time.reverse(),
            };
            by_time.then_with(|| a.data.tx_hash.cmp(&b.data.tx_hash))
        });

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &TransactionFilter) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.transactions.iter().filter(|t| filter.matches(t)).count() as i64)
    }
}

#[async_trait]
impl NetworkDirectory for MemoryStore {
    async fn active_networks(&self) -> Result<Vec<Network>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<Network> = inner.networks.iter().filter(|n| n.is_active).cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn active_network(&self, id: Uuid) -> Result<Option<Network>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.networks.iter().find(|n| n.id == id && n.is_active).cloned())
    }

    async fn networks_for_manager(&self, manager_id: Uuid) -> Result<Vec<Network>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<Network> = inner
            .networks
            .iter()
            .filter(|n| n.is_active && n.assigned_manager == Some(manager_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
