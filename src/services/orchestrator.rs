use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, gauge};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::{NetworkDirectory, StoreError, TransactionStore};
use crate::ingestion::{normalize, ScanContext};
use crate::models::{
    Chain, ChainScanOutcome, Direction, Network, NetworkScanOutcome, RunResults, RunState,
    RunStatus,
};
use crate::scanner::ChainScanner;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Scrapers are already running")]
    AlreadyRunning(Box<RunStatus>),

    #[error("network {0} not found or inactive")]
    NetworkNotFound(Uuid),

    #[error("scanner unavailable: {0}")]
    ScannerUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    /// Passed to the Ethereum scanner as its extra argument.
    pub etherscan_api_key: Option<String>,
}

/// Owns the process-wide [`RunStatus`] and drives scans.
///
/// Share it behind an `Arc`; [`ScraperOrchestrator::start_run`] needs one to
/// move into the background task.
pub struct ScraperOrchestrator {
    scanner: Arc<dyn ChainScanner>,
    networks: Arc<dyn NetworkDirectory>,
    store: Arc<dyn TransactionStore>,
    settings: OrchestratorSettings,
    status: Mutex<RunStatus>,
}

impl ScraperOrchestrator {
    pub fn new(
        scanner: Arc<dyn ChainScanner>,
        networks: Arc<dyn NetworkDirectory>,
        store: Arc<dyn TransactionStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            scanner,
            networks,
            store,
            settings,
            status: Mutex::new(RunStatus::idle()),
        }
    }

    pub async fn status(&self) -> RunStatus {
        self.status.lock().await.clone()
    }

    /// Start a full run in the background and return the fresh status.
    ///
    /// The running check and the transition to `running` happen under one
    /// lock, so concurrent callers see exactly one success.
    pub async fn start_run(self: &Arc<Self>) -> Result<RunStatus, RunError> {
        let snapshot = {
            let mut status = self.status.lock().await;
            if status.is_running() {
                return Err(RunError::AlreadyRunning(Box::new(status.clone())));
            }
            *status = RunStatus::started(Utc::now());
            status.clone()
        };

        tracing::info!("Orchestrator: run started");
        gauge!("scrape_run_progress").set(0.0);

        let this = Arc::clone(self);
        let run = tokio::spawn(async move { this.execute_run().await });

        let watcher = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = run.await {
                watcher.fail_run(format!("run task aborted: {e}")).await;
            }
        });

        Ok(snapshot)
    }

    /// Scan one network now and return its breakdown. Independent of the
    /// background run guard.
    pub async fn run_network_scrapers(&self, network_id: Uuid) -> Result<NetworkScanOutcome, RunError> {
        let network = self
            .networks
            .active_network(network_id)
            .await?
            .ok_or(RunError::NetworkNotFound(network_id))?;

        self.scanner
            .check_environment()
            .await
            .map_err(|e| RunError::ScannerUnavailable(e.to_string()))?;

        tracing::info!(network = %network.name, "Orchestrator: targeted scan started");
        let outcome = self.scan_network(&network).await;
        tracing::info!(
            network = %network.name,
            new_transactions = outcome.new_transactions(),
            errors = outcome.error_count(),
            "Orchestrator: targeted scan finished"
        );
        Ok(outcome)
    }

    async fn execute_run(&self) {
        let networks = match self.networks.active_networks().await {
            Ok(all) => all.into_iter().filter(Network::has_wallets).collect::<Vec<_>>(),
            Err(e) => {
                self.fail_run(format!("failed to load networks: {e}")).await;
                return;
            }
        };

        self.status.lock().await.total_networks = networks.len();
        tracing::info!(networks = networks.len(), "Orchestrator: scanning networks");

        let mut results = RunResults::default();
        for network in &networks {
            self.status.lock().await.current_network = Some(network.name.clone());

            let outcome = self.scan_network(network).await;
            tracing::info!(
                network = %network.name,
                new_transactions = outcome.new_transactions(),
                usd_value = %outcome.usd_value(),
                errors = outcome.error_count(),
                "Orchestrator: network done"
            );
            results.record(outcome);

            let mut status = self.status.lock().await;
            status.advance();
            gauge!("scrape_run_progress").set(f64::from(status.progress));
        }

        tracing::info!(
            networks = results.networks_scraped,
            new_transactions = results.new_transactions,
            duplicates = results.duplicate_transactions,
            wallet_errors = results.wallet_errors,
            usd_value = %results.total_usd_value,
            "Orchestrator: run completed"
        );

        let mut status = self.status.lock().await;
        status.state = RunState::Completed;
        status.end_time = Some(Utc::now());
        status.current_network = None;
        status.progress = 100;
        status.last_results = Some(results);
        gauge!("scrape_run_progress").set(100.0);
        counter!("scrape_runs_total", "outcome" => "completed").increment(1);
    }

    async fn fail_run(&self, message: String) {
        tracing::error!(error = %message, "Orchestrator: run failed");
        let mut status = self.status.lock().await;
        status.state = RunState::Failed;
        status.end_time = Some(Utc::now());
        status.current_network = None;
        status.error = Some(message);
        counter!("scrape_runs_total", "outcome" => "failed").increment(1);
    }

    async fn scan_network(&self, network: &Network) -> NetworkScanOutcome {
        let mut outcome = NetworkScanOutcome::new(network.id, network.name.clone());
        for chain in Chain::ALL {
            let wallets = network.wallets_for(chain);
            if wallets.is_empty() {
                continue;
            }
            let chain_outcome = outcome.chains.get_mut(chain);
            for address in wallets {
                self.scan_wallet(network, chain, address, chain_outcome).await;
            }
        }
        outcome
    }

    /// Scan, normalize and persist one wallet. Every failure is recorded on
    /// `out` and never propagated.
    async fn scan_wallet(&self, network: &Network, chain: Chain, address: &str, out: &mut ChainScanOutcome) {
        out.wallets_scanned += 1;
        counter!("scanner_invocations_total", "chain" => chain.as_str()).increment(1);

        let raw = match self.scanner.scan(chain, address, &self.extra_args(chain)).await {
            Ok(raw) => raw,
            Err(e) => {
                counter!("scanner_failures_total", "chain" => chain.as_str(), "kind" => e.kind())
                    .increment(1);
                tracing::error!(
                    network = %network.name,
                    chain = %chain,
                    address,
                    error = %e,
                    "Orchestrator: wallet scan failed"
                );
                out.errors.push(format!("Address {address}: {e}"));
                return;
            }
        };

        let ctx = ScanContext {
            network,
            chain,
            wallet_address: address,
            scraped_at: Utc::now(),
        };
        let batch = match normalize(&ctx, &raw) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(
                    network = %network.name,
                    chain = %chain,
                    address,
                    error = %e,
                    "Orchestrator: unreadable scan result"
                );
                out.errors.push(format!("Address {address}: {e}"));
                return;
            }
        };

        out.transactions_found += batch.transactions.len();
        out.skipped += batch.skipped.len();
        counter!("transfers_skipped_total", "chain" => chain.as_str()).increment(batch.skipped.len() as u64);

        let mut inserted = 0u64;
        for tx in &batch.transactions {
            match self.store.upsert_if_absent(tx).await {
                Ok(true) => {
                    inserted += 1;
                    out.inserted += 1;
                    if tx.direction == Direction::Incoming {
                        out.usd_value += tx.usd_or_zero();
                    }
                }
                Ok(false) => out.duplicates += 1,
                Err(e) => {
                    out.persistence_errors += 1;
                    tracing::warn!(
                        network = %network.name,
                        chain = %chain,
                        tx_hash = %tx.tx_hash,
                        error = %e,
                        "Orchestrator: failed to store transaction"
                    );
                }
            }
        }
        counter!("transactions_inserted_total", "chain" => chain.as_str()).increment(inserted);

        tracing::debug!(
            network = %network.name,
            chain = %chain,
            address,
            found = batch.transactions.len(),
            inserted,
            skipped = batch.skipped.len(),
            "Orchestrator: wallet scanned"
        );
    }

    fn extra_args(&self, chain: Chain) -> Vec<String> {
        match (chain, &self.settings.etherscan_api_key) {
            (Chain::Ethereum, Some(key)) if !key.trim().is_empty() => vec![key.trim().to_string()],
            _ => Vec::new(),
        }
    }
}
