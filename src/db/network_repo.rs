use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::StoreError;
use crate::models::{CryptoWallets, Network};

#[derive(Debug, FromRow)]
struct NetworkRow {
    id: Uuid,
    name: String,
    is_active: bool,
    assigned_manager: Option<Uuid>,
    bitcoin_wallets: Vec<String>,
    ethereum_wallets: Vec<String>,
    tron_wallets: Vec<String>,
}

impl From<NetworkRow> for Network {
    fn from(r: NetworkRow) -> Self {
        Network {
            id: r.id,
            name: r.name,
            is_active: r.is_active,
            assigned_manager: r.assigned_manager,
            wallets: CryptoWallets {
                bitcoin: r.bitcoin_wallets,
                ethereum: r.ethereum_wallets,
                tron: r.tron_wallets,
            },
        }
    }
}

const SELECT_NETWORK: &str = r#"
    SELECT id, name, is_active, assigned_manager,
           bitcoin_wallets, ethereum_wallets, tron_wallets
    FROM networks
"#;

/// All active networks, by name.
pub async fn get_active_networks(pool: &PgPool) -> Result<Vec<Network>, StoreError> {
    let rows = sqlx::query_as::<_, NetworkRow>(&format!(
        "{SELECT_NETWORK} WHERE is_active = TRUE ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Network::from).collect())
}

pub async fn get_active_network(pool: &PgPool, id: Uuid) -> Result<Option<Network>, StoreError> {
    let row = sqlx::query_as::<_, NetworkRow>(&format!(
        "{SELECT_NETWORK} WHERE id = $1 AND is_active = TRUE"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Network::from))
}

pub async fn get_networks_for_manager(
    pool: &PgPool,
    manager_id: Uuid,
) -> Result<Vec<Network>, StoreError> {
    let rows = sqlx::query_as::<_, NetworkRow>(&format!(
        "{SELECT_NETWORK} WHERE assigned_manager = $1 AND is_active = TRUE ORDER BY name"
    ))
    .bind(manager_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Network::from).collect())
}

/// Create or replace a network row. Used by tooling and tests; the
/// service itself never writes networks.
pub async fn upsert_network(pool: &PgPool, network: &Network) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO networks (id, name, is_active, assigned_manager,
                              bitcoin_wallets, ethereum_wallets, tron_wallets)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            name = $2, is_active = $3, assigned_manager = $4,
            bitcoin_wallets = $5, ethereum_wallets = $6, tron_wallets = $7,
            updated_at = NOW()
        "#,
    )
    .bind(network.id)
    .bind(&network.name)
    .bind(network.is_active)
    .bind(network.assigned_manager)
    .bind(&network.wallets.bitcoin)
    .bind(&network.wallets.ethereum)
    .bind(&network.wallets.tron)
    .execute(pool)
    .await?;

    Ok(())
}
