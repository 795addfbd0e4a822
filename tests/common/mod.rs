#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use chainledger::db::MemoryStore;
use chainledger::models::{Chain, CryptoWallets, Network, RunStatus};
use chainledger::scanner::{ChainScanner, ScanError};
use chainledger::services::{OrchestratorSettings, ScraperOrchestrator};
use chainledger::AppState;

// ---------------------------------------------------------------------------
// Scripted scanner
// ---------------------------------------------------------------------------

/// Scanner that answers from a per-address script. Unscripted addresses get
/// an empty successful document.
#[derive(Default)]
pub struct FakeScanner {
    responses: Mutex<HashMap<String, Result<Value, String>>>,
    delay: Duration,
    environment_error: Option<String>,
    calls: AtomicUsize,
    seen_args: Mutex<Vec<(Chain, String, Vec<String>)>>,
}

impl FakeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn without_environment(mut self, reason: &str) -> Self {
        self.environment_error = Some(reason.into());
        self
    }

    pub fn respond(self, address: &str, doc: Value) -> Self {
        self.responses.lock().unwrap().insert(address.into(), Ok(doc));
        self
    }

    pub fn fail(self, address: &str, stderr: &str) -> Self {
        self.responses.lock().unwrap().insert(address.into(), Err(stderr.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_args(&self) -> Vec<(Chain, String, Vec<String>)> {
        self.seen_args.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainScanner for FakeScanner {
    async fn scan(&self, chain: Chain, address: &str, extra_args: &[String]) -> Result<Value, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_args
            .lock()
            .unwrap()
            .push((chain, address.to_string(), extra_args.to_vec()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.responses.lock().unwrap().get(address).cloned();
        match scripted {
            Some(Ok(doc)) => Ok(doc),
            Some(Err(stderr)) => Err(ScanError::Exit { code: Some(1), stderr }),
            None => Ok(json!({ "success": true, "address": address, "transfers": [] })),
        }
    }

    async fn check_environment(&self) -> Result<(), ScanError> {
        match &self.environment_error {
            Some(reason) => Err(ScanError::Launch(reason.clone())),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn network(name: &str, ethereum: &[&str], tron: &[&str], bitcoin: &[&str]) -> Network {
    let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    Network {
        id: Uuid::new_v4(),
        name: name.into(),
        is_active: true,
        assigned_manager: None,
        wallets: CryptoWallets {
            bitcoin: owned(bitcoin),
            ethereum: owned(ethereum),
            tron: owned(tron),
        },
    }
}

/// One Ethereum explorer row in the helper's column naming.
pub fn eth_transfer(hash: &str, from: &str, to: &str, token: &str, amount: &str, date: &str) -> Value {
    json!({
        "Transaction Hash": hash,
        "Date": date,
        "Token": token,
        "Amount": amount,
        "From": from,
        "To": to,
        "Block Number": "19000000",
        "Status": "Success"
    })
}

pub fn eth_doc(address: &str, transfers: Vec<Value>) -> Value {
    json!({ "success": true, "address": address, "transfers": transfers })
}

pub fn tron_transfer(hash: &str, from: &str, to: &str, amount: &str, date: &str) -> Value {
    json!({
        "transaction_id": hash,
        "date": date,
        "from_address": from,
        "to_address": to,
        "token_symbol": "USDT",
        "token_name": "Tether USD",
        "amount": amount,
        "status": "SUCCESS"
    })
}

pub fn tron_doc(address: &str, transfers: Vec<Value>) -> Value {
    json!({ "success": true, "address": address, "transfers": transfers })
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub scanner: Arc<FakeScanner>,
    pub state: AppState,
}

impl TestApp {
    pub fn orchestrator(&self) -> &Arc<ScraperOrchestrator> {
        &self.state.orchestrator
    }
}

pub fn build_app(networks: Vec<Network>, scanner: FakeScanner) -> TestApp {
    build_app_with_settings(networks, scanner, OrchestratorSettings::default())
}

pub fn build_app_with_settings(
    networks: Vec<Network>,
    scanner: FakeScanner,
    settings: OrchestratorSettings,
) -> TestApp {
    let store = Arc::new(MemoryStore::with_networks(networks));
    let scanner = Arc::new(scanner);
    let state = AppState::new(store.clone(), store.clone(), scanner.clone(), settings);
    TestApp { store, scanner, state }
}

/// Poll until the orchestrator leaves `running`, or panic after `limit`.
pub async fn wait_for_idle(orchestrator: &ScraperOrchestrator, limit: Duration) -> RunStatus {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let status = orchestrator.status().await;
        if !status.is_running() {
            return status;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "run still in progress after {limit:?}: {status:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Connect to the test database and run all migrations. Returns `None` when
/// `TEST_DATABASE_URL` is unset so Postgres tests skip on machines without one.
/// Tests share the database, so each one works on its own fresh ids.
pub async fn setup_test_db() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}
