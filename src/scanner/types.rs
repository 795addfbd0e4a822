//! Transfer shapes emitted by the per-chain helper programs.
//!
//! Every field is optional and loosely typed: helpers print numbers as JSON
//! numbers or as strings depending on the upstream explorer, and a transfer
//! with a missing field is skipped by the normalizer rather than failing the
//! whole document.

use serde::Deserialize;
use serde_json::Value;

/// Top-level document. Only the lists relevant to the chain are populated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanDocument {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub transfers: Vec<Value>,
    #[serde(default)]
    pub token_transfers: Vec<Value>,
    #[serde(default)]
    pub bitcoin_transfers: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Bitcoin
// ---------------------------------------------------------------------------

/// Omni-layer token transfer on Bitcoin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BtcTokenTransfer {
    pub transaction_id: Option<String>,
    pub date: Option<Value>,
    pub token_symbol: Option<String>,
    pub token_name: Option<String>,
    pub amount: Option<Value>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub status: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Plain BTC movement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BtcNativeTransfer {
    pub transaction_id: Option<String>,
    pub date: Option<Value>,
    pub amount_btc: Option<Value>,
    pub amount_usd: Option<Value>,
    pub amount_satoshi: Option<Value>,
    #[serde(default)]
    pub from_addresses: Vec<String>,
    pub block_number: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

// ---------------------------------------------------------------------------
// Ethereum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EthTransfer {
    #[serde(rename = "Transaction Hash")]
    pub hash: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<Value>,
    #[serde(rename = "Token")]
    pub token: Option<String>,
    #[serde(rename = "Token Name")]
    pub token_name: Option<String>,
    #[serde(rename = "Amount")]
    pub amount: Option<Value>,
    #[serde(rename = "USD Value", alias = "amount_usd")]
    pub amount_usd: Option<Value>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "Block Number")]
    pub block_number: Option<Value>,
    #[serde(rename = "Status")]
    pub status: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

// ---------------------------------------------------------------------------
// Tron
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TronTransfer {
    pub transaction_id: Option<String>,
    pub date: Option<Value>,
    /// Epoch milliseconds.
    pub timestamp: Option<Value>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub token_symbol: Option<String>,
    pub token_name: Option<String>,
    pub amount: Option<Value>,
    pub raw_amount: Option<Value>,
    pub token_decimals: Option<Value>,
    #[serde(alias = "usd_value")]
    pub amount_usd: Option<Value>,
    pub status: Option<Value>,
    /// Contract execution result, e.g. `SUCCESS` or `REVERT`.
    #[serde(rename = "contractRet", alias = "contract_ret")]
    pub contract_ret: Option<String>,
    #[serde(rename = "finalResult", alias = "final_result")]
    pub final_result: Option<String>,
    pub block_number: Option<Value>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
