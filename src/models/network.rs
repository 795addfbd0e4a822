use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Chain, PerChain};

/// Wallet addresses a network has configured, per chain.
pub type CryptoWallets = PerChain<Vec<String>>;

/// A configured network. Owned by the CRUD layer; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub assigned_manager: Option<Uuid>,
    pub wallets: CryptoWallets,
}

impl Network {
    /// Configured addresses for `chain`, trimmed, without blanks or repeats,
    /// in configuration order.
    pub fn wallets_for(&self, chain: Chain) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for addr in self.wallets.get(chain) {
            let addr = addr.trim();
            if !addr.is_empty() && !out.contains(&addr) {
                out.push(addr);
            }
        }
        out
    }

    pub fn has_wallets(&self) -> bool {
        Chain::ALL.iter().any(|c| !self.wallets_for(*c).is_empty())
    }

    pub fn wallet_count(&self) -> usize {
        Chain::ALL.iter().map(|c| self.wallets_for(*c).len()).sum()
    }
}
