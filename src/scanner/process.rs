use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use super::{ensure_success, ChainScanner, ScanError};
use crate::models::{Chain, PerChain};

const INTERPRETER_CANDIDATES: &[&str] = &["python3", "python"];
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const STDERR_LIMIT: usize = 2_000;
const RAW_OUTPUT_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct ProcessScannerConfig {
    /// Directory holding the per-chain helper programs. Also the working
    /// directory they run in.
    pub scanner_dir: PathBuf,
    /// Interpreter used to launch helpers. Detected when unset.
    pub interpreter: Option<String>,
    pub scripts: PerChain<String>,
    pub timeout: Duration,
}

impl ProcessScannerConfig {
    pub fn new(scanner_dir: impl Into<PathBuf>, interpreter: Option<String>, timeout: Duration) -> Self {
        Self {
            scanner_dir: scanner_dir.into(),
            interpreter,
            scripts: PerChain {
                bitcoin: "btc_scraper.py".into(),
                ethereum: "eth_scraper.py".into(),
                tron: "tron_scraper.py".into(),
            },
            timeout,
        }
    }
}

/// Runs one external helper program per scan and reads a single JSON
/// document from its stdout.
///
/// The child is spawned with `kill_on_drop`, so when the timeout elapses the
/// in-flight wait is dropped and the process is killed.
pub struct ProcessScanner {
    config: ProcessScannerConfig,
    interpreter: OnceCell<String>,
}

impl ProcessScanner {
    pub fn new(config: ProcessScannerConfig) -> Self {
        Self {
            config,
            interpreter: OnceCell::new(),
        }
    }

    pub fn script_path(&self, chain: Chain) -> PathBuf {
        self.config.scanner_dir.join(self.config.scripts.get(chain))
    }

    async fn interpreter(&self) -> Result<&str, ScanError> {
        self.interpreter
            .get_or_try_init(|| self.detect_interpreter())
            .await
            .map(String::as_str)
    }

    async fn detect_interpreter(&self) -> Result<String, ScanError> {
        if let Some(cmd) = &self.config.interpreter {
            return Ok(cmd.clone());
        }

        for candidate in INTERPRETER_CANDIDATES {
            if probe(candidate).await {
                tracing::info!(interpreter = candidate, "Scanner: using interpreter");
                return Ok((*candidate).to_string());
            }
            tracing::debug!(interpreter = candidate, "Scanner: interpreter not available");
        }

        Err(ScanError::Launch(format!(
            "no interpreter found (tried {})",
            INTERPRETER_CANDIDATES.join(", ")
        )))
    }
}

#[async_trait]
impl ChainScanner for ProcessScanner {
    async fn scan(
        &self,
        chain: Chain,
        address: &str,
        extra_args: &[String],
    ) -> Result<Value, ScanError> {
        let interpreter = self.interpreter().await?.to_string();
        let script = self.script_path(chain);
        if !script.is_file() {
            return Err(ScanError::Launch(format!(
                "scanner script not found: {}",
                script.display()
            )));
        }

        tracing::debug!(
            chain = %chain,
            address,
            script = %script.display(),
            "Scanner: launching"
        );

        let started = Instant::now();
        let child = Command::new(&interpreter)
            .arg(self.config.scripts.get(chain))
            .arg(address)
            .args(extra_args)
            .current_dir(&self.config.scanner_dir)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::Launch(format!("{interpreter}: {e}")))?;

        let output = match timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ScanError::Launch(format!("failed waiting on scanner: {e}")));
            }
            Err(_) => {
                tracing::warn!(
                    chain = %chain,
                    address,
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    "Scanner: timed out, process killed"
                );
                return Err(ScanError::Timeout(self.config.timeout));
            }
        };

        histogram!("scanner_duration_seconds", "chain" => chain.as_str())
            .record(started.elapsed().as_secs_f64());

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(chain = %chain, address, stderr = %truncate(stderr.trim(), STDERR_LIMIT), "Scanner: stderr");
        }

        if !output.status.success() {
            return Err(ScanError::Exit {
                code: output.status.code(),
                stderr: truncate(stderr.trim(), STDERR_LIMIT),
            });
        }

        parse_output(&output.stdout)
    }

    async fn check_environment(&self) -> Result<(), ScanError> {
        self.interpreter().await.map(|_| ())
    }
}

async fn probe(cmd: &str) -> bool {
    let status = Command::new(cmd)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    matches!(timeout(PROBE_TIMEOUT, status).await, Ok(Ok(s)) if s.success())
}

/// Parse scanner stdout as exactly one JSON document.
pub fn parse_output(stdout: &[u8]) -> Result<Value, ScanError> {
    let text = String::from_utf8_lossy(stdout);
    let doc: Value = serde_json::from_str(text.trim()).map_err(|e| {
        ScanError::Output(format!(
            "{e}; raw output: {}",
            truncate(text.trim(), RAW_OUTPUT_LIMIT)
        ))
    })?;
    ensure_success(&doc)?;
    Ok(doc)
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
