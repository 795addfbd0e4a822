pub mod network;
pub mod status;
pub mod summary;
pub mod transaction;

pub use network::{CryptoWallets, Network};
pub use status::{ChainScanOutcome, ChainTally, NetworkScanOutcome, RunResults, RunState, RunStatus};
pub use summary::{
    ChainStats, ManagerChainStats, ManagerNetworkDetail, ManagerTotals, NetworkDetail,
    NetworkSummary, OverallChainStats, OverallSummary, Period, UnmatchedStats, WalletStats,
    WalletSummary,
};
pub use transaction::{NewTransaction, ScrapeProvenance, TokenInfo, Transaction};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Bitcoin,
    Ethereum,
    Tron,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Bitcoin, Chain::Ethereum, Chain::Tron];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Ethereum => "ethereum",
            Chain::Tron => "tron",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bitcoin" | "btc" => Some(Chain::Bitcoin),
            "ethereum" | "eth" => Some(Chain::Ethereum),
            "tron" | "trx" => Some(Chain::Tron),
            _ => None,
        }
    }

    /// Symbol of the chain's own coin. Anything else is a token.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::Ethereum => "ETH",
            Chain::Tron => "TRX",
        }
    }

    pub fn default_decimals(&self) -> i32 {
        match self {
            Chain::Bitcoin => 8,
            Chain::Ethereum => 18,
            Chain::Tron => 6,
        }
    }

    /// Upstream explorer the chain's scanner reads from.
    pub fn data_source(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "blockchain.info",
            Chain::Ethereum => "etherscan",
            Chain::Tron => "tronscan",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Direction / status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "incoming" | "in" => Some(Direction::Incoming),
            "outgoing" | "out" => Some(Direction::Outgoing),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(TxStatus::Pending),
            "confirmed" => Some(TxStatus::Confirmed),
            "failed" => Some(TxStatus::Failed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PerChain: one value per supported chain
// ---------------------------------------------------------------------------

/// Fixed-shape map keyed by [`Chain`]. Serializes as
/// `{"bitcoin": .., "ethereum": .., "tron": ..}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerChain<T> {
    pub bitcoin: T,
    pub ethereum: T,
    pub tron: T,
}

impl<T> PerChain<T> {
    pub fn get(&self, chain: Chain) -> &T {
        match chain {
            Chain::Bitcoin => &self.bitcoin,
            Chain::Ethereum => &self.ethereum,
            Chain::Tron => &self.tron,
        }
    }

    pub fn get_mut(&mut self, chain: Chain) -> &mut T {
        match chain {
            Chain::Bitcoin => &mut self.bitcoin,
            Chain::Ethereum => &mut self.ethereum,
            Chain::Tron => &mut self.tron,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Chain, &T)> {
        Chain::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}
