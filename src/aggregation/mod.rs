pub mod window;

pub use window::{resolve, resolve_range, TimeWindow, WindowError, WindowQuery};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{NetworkDirectory, StoreError, TransactionFilter, TransactionStore};
use crate::models::{
    Chain, ChainStats, ManagerChainStats, ManagerNetworkDetail, ManagerTotals, Network,
    NetworkDetail, NetworkSummary, OverallSummary, PerChain, Period, Transaction, UnmatchedStats,
    WalletStats, WalletSummary,
};

const WALLET_RECENT: usize = 5;
const NETWORK_RECENT: usize = 10;
const OVERALL_RECENT: usize = 10;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("network {0} not found or inactive")]
    NetworkNotFound(Uuid),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Window options for a manager's total. Month + year wins over the explicit
/// range; with neither the total covers all time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Read-side totals over stored transactions. All figures cover incoming
/// transfers only; a missing USD value counts as zero.
pub struct AggregationEngine {
    store: Arc<dyn TransactionStore>,
    networks: Arc<dyn NetworkDirectory>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn TransactionStore>, networks: Arc<dyn NetworkDirectory>) -> Self {
        Self { store, networks }
    }

    pub async fn network_summary(
        &self,
        network_id: Uuid,
        query: WindowQuery,
    ) -> Result<NetworkSummary, AggregationError> {
        let network = self
            .networks
            .active_network(network_id)
            .await?
            .ok_or(AggregationError::NetworkNotFound(network_id))?;
        let window = resolve(query, Utc::now())?;
        self.summarize(&network, &window).await
    }

    pub async fn overall_summary(&self, query: WindowQuery) -> Result<OverallSummary, AggregationError> {
        let window = resolve(query, Utc::now())?;
        let networks = self.networks.active_networks().await?;

        let mut summaries = Vec::with_capacity(networks.len());
        for network in &networks {
            match self.summarize(network, &window).await {
                Ok(summary) => summaries.push((network, summary)),
                Err(e) => {
                    tracing::warn!(
                        network = %network.name,
                        error = %e,
                        "Aggregation: skipping network in overall summary"
                    );
                }
            }
        }

        Ok(combine_overall(networks.len(), summaries, window.period))
    }

    pub async fn manager_total_value(
        &self,
        manager_id: Uuid,
        query: ManagerQuery,
    ) -> Result<ManagerTotals, AggregationError> {
        let window = match (query.month, query.year) {
            (Some(month), Some(year)) => resolve(
                WindowQuery { days: None, month: Some(month), year: Some(year) },
                Utc::now(),
            )?,
            _ => resolve_range(query.start, query.end)?,
        };

        let networks = self.networks.networks_for_manager(manager_id).await?;
        if networks.is_empty() {
            return Ok(manager_totals(manager_id, &networks, &[], window.period));
        }

        let filter = TransactionFilter::for_networks(networks.iter().map(|n| n.id))
            .incoming()
            .between(window.from, window.to);
        let transactions = self.store.query(&filter).await?;

        Ok(manager_totals(manager_id, &networks, &transactions, window.period))
    }

    async fn summarize(
        &self,
        network: &Network,
        window: &TimeWindow,
    ) -> Result<NetworkSummary, AggregationError> {
        let filter = TransactionFilter::for_networks([network.id])
            .incoming()
            .between(window.from, window.to);
        let transactions = self.store.query(&filter).await?;
        Ok(summarize_network(network, window.period.clone(), &transactions))
    }
}

// ---------------------------------------------------------------------------
// Pure roll-ups
// ---------------------------------------------------------------------------

/// Roll a network's in-window transactions (newest first) up to wallet,
/// chain and network totals.
///
/// Only transactions whose wallet address is one of the network's configured
/// wallets are totalled; the rest are reported under `unmatched`. The network
/// total is the sum of chain totals, each of which is the sum of its wallets.
pub fn summarize_network(network: &Network, period: Period, transactions: &[Transaction]) -> NetworkSummary {
    let mut breakdown: PerChain<ChainStats> = PerChain::default();
    let mut unmatched_total = UnmatchedStats::default();

    for chain in Chain::ALL {
        let wallets = network.wallets_for(chain);
        let on_chain: Vec<&Transaction> = transactions.iter().filter(|t| t.data.chain == chain).collect();
        let stats = breakdown.get_mut(chain);

        for address in &wallets {
            let wallet_txs: Vec<&Transaction> = on_chain
                .iter()
                .copied()
                .filter(|t| t.data.wallet_address.trim() == *address)
                .collect();
            let total: Decimal = wallet_txs.iter().map(|t| t.usd_or_zero()).sum();

            stats.count += wallet_txs.len();
            stats.total_usd_value += total;
            stats.wallets.push(WalletStats {
                address: (*address).to_string(),
                count: wallet_txs.len(),
                total_usd_value: total,
                recent_transactions: wallet_txs.iter().take(WALLET_RECENT).map(|t| (*t).clone()).collect(),
            });
        }

        for t in on_chain {
            if !wallets.contains(&t.data.wallet_address.trim()) {
                stats.unmatched.count += 1;
                stats.unmatched.usd_value += t.usd_or_zero();
            }
        }
        unmatched_total.add(&stats.unmatched);

        stats
            .wallets
            .sort_by(|a, b| b.total_usd_value.cmp(&a.total_usd_value));
    }

    let wallet_summary = WalletSummary {
        total_wallets: network.wallet_count(),
        bitcoin: network.wallets_for(Chain::Bitcoin).len(),
        ethereum: network.wallets_for(Chain::Ethereum).len(),
        tron: network.wallets_for(Chain::Tron).len(),
    };

    NetworkSummary {
        network_id: network.id,
        network_name: network.name.clone(),
        period,
        total_transactions: breakdown.iter().map(|(_, s)| s.count).sum(),
        total_usd_value: breakdown.iter().map(|(_, s)| s.total_usd_value).sum(),
        breakdown,
        wallet_summary,
        unmatched: unmatched_total,
        recent_transactions: transactions.iter().take(NETWORK_RECENT).cloned().collect(),
    }
}

fn combine_overall(
    total_networks: usize,
    summaries: Vec<(&Network, NetworkSummary)>,
    period: Period,
) -> OverallSummary {
    let mut out = OverallSummary {
        total_networks,
        active_networks_with_wallets: 0,
        total_transactions: 0,
        total_usd_value: Decimal::ZERO,
        breakdown: PerChain::default(),
        unmatched: UnmatchedStats::default(),
        network_details: Vec::with_capacity(summaries.len()),
        recent_transactions: Vec::new(),
        period,
    };

    let mut recent: Vec<Transaction> = Vec::new();
    for (network, summary) in summaries {
        if network.has_wallets() {
            out.active_networks_with_wallets += 1;
        }
        out.total_transactions += summary.total_transactions;
        out.total_usd_value += summary.total_usd_value;
        out.unmatched.add(&summary.unmatched);

        for (chain, stats) in summary.breakdown.iter() {
            let agg = out.breakdown.get_mut(chain);
            agg.count += stats.count;
            agg.total_usd_value += stats.total_usd_value;
            if !network.wallets_for(chain).is_empty() {
                agg.networks_with_wallets += 1;
            }
        }

        out.network_details.push(NetworkDetail {
            network_id: summary.network_id,
            network_name: summary.network_name,
            total_usd_value: summary.total_usd_value,
            total_transactions: summary.total_transactions,
            wallet_count: summary.wallet_summary.total_wallets,
        });
        recent.extend(summary.recent_transactions);
    }

    out.network_details
        .sort_by(|a, b| b.total_usd_value.cmp(&a.total_usd_value));

    recent.sort_by(|a, b| b.data.timestamp.cmp(&a.data.timestamp));
    recent.truncate(OVERALL_RECENT);
    out.recent_transactions = recent;
    out
}

/// Raw per-network sums for a manager. Unlike network summaries this is not
/// restricted to configured wallets: every incoming transaction stored against
/// one of the manager's networks counts.
fn manager_totals(
    manager_id: Uuid,
    networks: &[Network],
    transactions: &[Transaction],
    period: Period,
) -> ManagerTotals {
    let mut breakdown: PerChain<ManagerChainStats> = PerChain::default();
    let mut details = Vec::with_capacity(networks.len());

    for network in networks {
        let mut detail = ManagerNetworkDetail {
            network_id: network.id,
            network_name: network.name.clone(),
            total_usd_value: Decimal::ZERO,
            transaction_count: 0,
            breakdown: PerChain::default(),
        };
        for chain in Chain::ALL {
            detail.breakdown.get_mut(chain).wallet_addresses =
                network.wallets_for(chain).into_iter().map(str::to_string).collect();
        }

        for t in transactions.iter().filter(|t| t.data.network_id == network.id) {
            let value = t.usd_or_zero();
            detail.total_usd_value += value;
            detail.transaction_count += 1;

            let per_net = detail.breakdown.get_mut(t.data.chain);
            per_net.count += 1;
            per_net.total_usd_value += value;

            let overall = breakdown.get_mut(t.data.chain);
            overall.count += 1;
            overall.total_usd_value += value;
        }
        details.push(detail);
    }

    ManagerTotals {
        manager_id,
        total_usd_value: details.iter().map(|d| d.total_usd_value).sum(),
        networks_count: networks.len(),
        total_transactions: details.iter().map(|d| d.transaction_count).sum(),
        breakdown,
        network_details: details,
        period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CryptoWallets, Direction, NewTransaction, ScrapeProvenance, TokenInfo, TxStatus};
    use chrono::TimeZone;

    fn network(eth: &[&str], tron: &[&str]) -> Network {
        Network {
            id: Uuid::new_v4(),
            name: "Alpha".into(),
            is_active: true,
            assigned_manager: None,
            wallets: CryptoWallets {
                bitcoin: vec![],
                ethereum: eth.iter().map(|s| s.to_string()).collect(),
                tron: tron.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    fn tx(net: &Network, chain: Chain, wallet: &str, hash: &str, usd: Option<i64>, day: u32) -> Transaction {
        let ts = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        Transaction {
            id: Uuid::new_v4(),
            created_at: ts,
            data: NewTransaction {
                network_id: net.id,
                network_name: net.name.clone(),
                chain,
                wallet_address: wallet.into(),
                tx_hash: hash.into(),
                from_address: "sender".into(),
                to_address: wallet.into(),
                amount: Decimal::from(usd.unwrap_or(1)),
                amount_raw: "1".into(),
                token: TokenInfo { symbol: "USDT".into(), name: "Tether".into(), decimals: 6 },
                usd_value: usd.map(Decimal::from),
                block_number: None,
                timestamp: ts,
                date: ts.format("%Y-%m-%d").to_string(),
                direction: Direction::Incoming,
                status: TxStatus::Confirmed,
                provenance: ScrapeProvenance {
                    data_source: "test".into(),
                    scraped_at: ts,
                    scraper_version: "test".into(),
                },
            },
        }
    }

    fn period() -> Period {
        resolve(WindowQuery::default(), Utc::now()).unwrap().period
    }

    #[test]
    fn test_summary_reconciles_wallet_chain_network() {
        let net = network(&["0xA", "0xB"], &["TA"]);
        let txs = vec![
            tx(&net, Chain::Ethereum, "0xA", "h1", Some(100), 10),
            tx(&net, Chain::Ethereum, "0xB", "h2", Some(250), 9),
            tx(&net, Chain::Ethereum, "0xA", "h3", None, 8),
            tx(&net, Chain::Tron, "TA", "h4", Some(40), 7),
        ];

        let s = summarize_network(&net, period(), &txs);

        let eth = &s.breakdown.ethereum;
        assert_eq!(eth.count, 3);
        assert_eq!(eth.total_usd_value, Decimal::from(350));
        assert_eq!(eth.wallets.iter().map(|w| w.total_usd_value).sum::<Decimal>(), eth.total_usd_value);
        // Sorted by value, largest first.
        assert_eq!(eth.wallets[0].address, "0xB");
        assert_eq!(eth.wallets[1].count, 2);

        assert_eq!(s.total_usd_value, Decimal::from(390));
        assert_eq!(
            s.total_usd_value,
            s.breakdown.iter().map(|(_, c)| c.total_usd_value).sum::<Decimal>()
        );
        assert_eq!(s.total_transactions, 4);
        assert_eq!(s.wallet_summary.total_wallets, 3);
        assert_eq!(s.wallet_summary.ethereum, 2);
    }

    #[test]
    fn test_unmatched_transactions_are_excluded_from_totals() {
        let net = network(&["0xA"], &[]);
        let txs = vec![
            tx(&net, Chain::Ethereum, "0xA", "h1", Some(100), 10),
            tx(&net, Chain::Ethereum, "0xOLD", "h2", Some(900), 9),
            tx(&net, Chain::Tron, "TOLD", "h3", Some(5), 9),
        ];

        let s = summarize_network(&net, period(), &txs);

        assert_eq!(s.total_usd_value, Decimal::from(100));
        assert_eq!(s.total_transactions, 1);
        assert_eq!(s.breakdown.ethereum.unmatched.count, 1);
        assert_eq!(s.breakdown.ethereum.unmatched.usd_value, Decimal::from(900));
        assert_eq!(s.unmatched.count, 2);
        assert_eq!(s.unmatched.usd_value, Decimal::from(905));
    }

    #[test]
    fn test_wallet_recent_transactions_capped() {
        let net = network(&["0xA"], &[]);
        let txs: Vec<Transaction> = (1..=8)
            .rev()
            .map(|d| tx(&net, Chain::Ethereum, "0xA", &format!("h{d}"), Some(1), d))
            .collect();

        let s = summarize_network(&net, period(), &txs);
        let wallet = &s.breakdown.ethereum.wallets[0];
        assert_eq!(wallet.count, 8);
        assert_eq!(wallet.recent_transactions.len(), 5);
        assert_eq!(wallet.recent_transactions[0].data.tx_hash, "h8");
    }

    #[test]
    fn test_overall_is_sum_of_networks() {
        let a = network(&["0xA"], &[]);
        let mut b = network(&[], &["TB"]);
        b.name = "Beta".into();
        let sa = summarize_network(&a, period(), &[tx(&a, Chain::Ethereum, "0xA", "h1", Some(10), 3)]);
        let sb = summarize_network(&b, period(), &[tx(&b, Chain::Tron, "TB", "h2", Some(30), 4)]);

        let overall = combine_overall(3, vec![(&a, sa), (&b, sb)], period());

        assert_eq!(overall.total_networks, 3);
        assert_eq!(overall.active_networks_with_wallets, 2);
        assert_eq!(overall.total_usd_value, Decimal::from(40));
        assert_eq!(overall.breakdown.tron.networks_with_wallets, 1);
        assert_eq!(overall.breakdown.ethereum.total_usd_value, Decimal::from(10));
        assert_eq!(overall.network_details[0].network_name, "Beta");
        assert_eq!(overall.recent_transactions[0].data.tx_hash, "h2");
    }

    #[test]
    fn test_manager_totals_sum_per_network() {
        let a = network(&["0xA"], &[]);
        let b = network(&[], &["TB"]);
        let txs = vec![
            tx(&a, Chain::Ethereum, "0xA", "h1", Some(10), 3),
            tx(&a, Chain::Ethereum, "0xUNLISTED", "h2", Some(5), 3),
            tx(&b, Chain::Tron, "TB", "h3", None, 4),
        ];
        let m = Uuid::new_v4();

        let totals = manager_totals(m, &[a.clone(), b.clone()], &txs, period());

        assert_eq!(totals.networks_count, 2);
        assert_eq!(totals.total_usd_value, Decimal::from(15));
        assert_eq!(totals.total_transactions, 3);
        assert_eq!(totals.breakdown.ethereum.count, 2);
        assert_eq!(totals.breakdown.tron.count, 1);
        assert_eq!(totals.network_details[0].breakdown.ethereum.wallet_addresses, vec!["0xA"]);
        assert_eq!(totals.network_details[1].total_usd_value, Decimal::ZERO);
    }
}
