use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Chain, PerChain};

// ---------------------------------------------------------------------------
// RunStatus: the one process-wide status value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub state: RunState,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_networks: usize,
    pub networks_processed: usize,
    pub current_network: Option<String>,
    /// 0..=100
    pub progress: u8,
    pub error: Option<String>,
    pub last_results: Option<RunResults>,
}

impl RunStatus {
    pub fn idle() -> Self {
        Self {
            state: RunState::Idle,
            start_time: None,
            end_time: None,
            total_networks: 0,
            networks_processed: 0,
            current_network: None,
            progress: 0,
            error: None,
            last_results: None,
        }
    }

    /// Fresh status for a run that starts now.
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            state: RunState::Running,
            start_time: Some(now),
            ..Self::idle()
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Mark one more network done and recompute the percentage.
    pub fn advance(&mut self) {
        self.networks_processed += 1;
        self.progress = progress_percent(self.networks_processed, self.total_networks);
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::idle()
    }
}

pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

// ---------------------------------------------------------------------------
// Scan outcomes
// ---------------------------------------------------------------------------

/// What happened on one chain of one network during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainScanOutcome {
    pub wallets_scanned: usize,
    pub transactions_found: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub persistence_errors: usize,
    /// USD value of the newly inserted incoming transactions.
    pub usd_value: Decimal,
    /// One entry per failed wallet, `"Address <addr>: <reason>"`.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkScanOutcome {
    pub network_id: Uuid,
    pub network_name: String,
    pub chains: PerChain<ChainScanOutcome>,
}

impl NetworkScanOutcome {
    pub fn new(network_id: Uuid, network_name: impl Into<String>) -> Self {
        Self {
            network_id,
            network_name: network_name.into(),
            chains: PerChain::default(),
        }
    }

    pub fn new_transactions(&self) -> usize {
        self.chains.iter().map(|(_, c)| c.inserted).sum()
    }

    pub fn usd_value(&self) -> Decimal {
        self.chains.iter().map(|(_, c)| c.usd_value).sum()
    }

    pub fn error_count(&self) -> usize {
        self.chains.iter().map(|(_, c)| c.errors.len()).sum()
    }

    pub fn errors_for(&self, chain: Chain) -> &[String] {
        &self.chains.get(chain).errors
    }
}

/// Per-chain roll-up across a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTally {
    pub count: usize,
    pub total_usd_value: Decimal,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub networks_scraped: usize,
    pub total_transactions: usize,
    pub new_transactions: usize,
    pub duplicate_transactions: usize,
    pub skipped_transfers: usize,
    pub total_usd_value: Decimal,
    pub wallet_errors: usize,
    pub breakdown: PerChain<ChainTally>,
    pub networks: Vec<NetworkScanOutcome>,
}

impl RunResults {
    pub fn record(&mut self, outcome: NetworkScanOutcome) {
        self.networks_scraped += 1;
        for (chain, c) in outcome.chains.iter() {
            self.total_transactions += c.inserted + c.duplicates;
            self.new_transactions += c.inserted;
            self.duplicate_transactions += c.duplicates;
            self.skipped_transfers += c.skipped;
            self.total_usd_value += c.usd_value;
            self.wallet_errors += c.errors.len();

            let tally = self.breakdown.get_mut(chain);
            tally.count += c.inserted;
            tally.total_usd_value += c.usd_value;
            tally.errors += c.errors.len();
        }
        self.networks.push(outcome);
    }
}
