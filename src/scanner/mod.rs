pub mod process;
pub mod types;

pub use process::{ProcessScanner, ProcessScannerConfig};

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::Chain;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to launch scanner: {0}")]
    Launch(String),

    #[error("scanner exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("scanner timed out after {0:?}")]
    Timeout(Duration),

    #[error("scanner output is not valid JSON: {0}")]
    Output(String),

    #[error("scanner reported failure: {0}")]
    Reported(String),
}

impl ScanError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Launch(_) => "launch",
            ScanError::Exit { .. } => "exit",
            ScanError::Timeout(_) => "timeout",
            ScanError::Output(_) => "output",
            ScanError::Reported(_) => "reported",
        }
    }
}

/// Address-scanning capability for one chain. Implementations return the
/// scanner's JSON document untouched; shape handling lives in the normalizer.
#[async_trait]
pub trait ChainScanner: Send + Sync {
    async fn scan(
        &self,
        chain: Chain,
        address: &str,
        extra_args: &[String],
    ) -> Result<Value, ScanError>;

    /// Whether scans can run at all (interpreter present, etc).
    async fn check_environment(&self) -> Result<(), ScanError> {
        Ok(())
    }
}

/// Turn a `{"success": false, "error": ..}` document into an error.
pub fn ensure_success(doc: &Value) -> Result<(), ScanError> {
    match doc.get("success").and_then(Value::as_bool) {
        Some(false) => {
            let reason = doc
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            Err(ScanError::Reported(reason))
        }
        _ => Ok(()),
    }
}
