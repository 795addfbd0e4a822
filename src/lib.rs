pub mod aggregation;
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod scanner;
pub mod services;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::aggregation::AggregationEngine;
use crate::db::{NetworkDirectory, TransactionStore};
use crate::scanner::ChainScanner;
use crate::services::ScraperOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub networks: Arc<dyn NetworkDirectory>,
    pub scanner: Arc<dyn ChainScanner>,
    pub orchestrator: Arc<ScraperOrchestrator>,
    pub aggregation: Arc<AggregationEngine>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the orchestrator and aggregation engine over shared ports.
    pub fn new(
        store: Arc<dyn TransactionStore>,
        networks: Arc<dyn NetworkDirectory>,
        scanner: Arc<dyn ChainScanner>,
        settings: services::OrchestratorSettings,
    ) -> Self {
        let orchestrator = Arc::new(ScraperOrchestrator::new(
            Arc::clone(&scanner),
            Arc::clone(&networks),
            Arc::clone(&store),
            settings,
        ));
        let aggregation = Arc::new(AggregationEngine::new(Arc::clone(&store), Arc::clone(&networks)));
        Self {
            store,
            networks,
            scanner,
            orchestrator,
            aggregation,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
