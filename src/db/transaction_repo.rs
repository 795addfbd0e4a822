use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{SortOrder, StoreError, TransactionFilter};
use crate::models::{
    Chain, Direction, NewTransaction, ScrapeProvenance, TokenInfo, Transaction, TxStatus,
};

const SELECT_COLUMNS: &str = r#"
    SELECT id, network_id, network_name, chain, wallet_address, tx_hash,
           from_address, to_address, amount, amount_raw, token_symbol, token_name,
           token_decimals, usd_value, block_number, occurred_at, tx_date, direction,
           status, data_source, scraped_at, scraper_version, created_at
    FROM blockchain_transactions
"#;

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    network_id: Uuid,
    network_name: String,
    chain: String,
    wallet_address: String,
    tx_hash: String,
    from_address: String,
    to_address: String,
    amount: Decimal,
    amount_raw: String,
    token_symbol: String,
    token_name: String,
    token_decimals: i32,
    usd_value: Option<Decimal>,
    block_number: Option<i64>,
    occurred_at: DateTime<Utc>,
    tx_date: String,
    direction: String,
    status: String,
    data_source: String,
    scraped_at: DateTime<Utc>,
    scraper_version: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(r: TransactionRow) -> Result<Self, Self::Error> {
        let chain = Chain::from_db_str(&r.chain)
            .ok_or_else(|| StoreError::Corrupt(format!("{}: unknown chain {:?}", r.tx_hash, r.chain)))?;
        let direction = Direction::from_db_str(&r.direction).ok_or_else(|| {
            StoreError::Corrupt(format!("{}: unknown direction {:?}", r.tx_hash, r.direction))
        })?;
        let status = TxStatus::from_db_str(&r.status)
            .ok_or_else(|| StoreError::Corrupt(format!("{}: unknown status {:?}", r.tx_hash, r.status)))?;

        Ok(Transaction {
            id: r.id,
            data: NewTransaction {
                network_id: r.network_id,
                network_name: r.network_name,
                chain,
                wallet_address: r.wallet_address,
                tx_hash: r.tx_hash,
                from_address: r.from_address,
                to_address: r.to_address,
                amount: r.amount,
                amount_raw: r.amount_raw,
                token: TokenInfo {
                    symbol: r.token_symbol,
                    name: r.token_name,
                    decimals: r.token_decimals,
                },
                usd_value: r.usd_value,
                block_number: r.block_number,
                timestamp: r.occurred_at,
                date: r.tx_date,
                direction,
                status,
                provenance: ScrapeProvenance {
                    data_source: r.data_source,
                    scraped_at: r.scraped_at,
                    scraper_version: r.scraper_version,
                },
            },
            created_at: r.created_at,
        })
    }
}

/// Insert a transaction unless its hash is already stored.
/// Returns true when a new row was written.
pub async fn insert_if_absent(pool: &PgPool, tx: &NewTransaction) -> Result<bool, StoreError> {
    let inserted: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO blockchain_transactions (
            id, network_id, network_name, chain, wallet_address, tx_hash,
            from_address, to_address, amount, amount_raw, token_symbol, token_name,
            token_decimals, usd_value, block_number, occurred_at, tx_date, direction,
            status, data_source, scraped_at, scraper_version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
        ON CONFLICT (tx_hash) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tx.network_id)
    .bind(&tx.network_name)
    .bind(tx.chain.as_str())
    .bind(&tx.wallet_address)
    .bind(&tx.tx_hash)
    .bind(&tx.from_address)
    .bind(&tx.to_address)
    .bind(tx.amount)
    .bind(&tx.amount_raw)
    .bind(&tx.token.symbol)
    .bind(&tx.token.name)
    .bind(tx.token.decimals)
    .bind(tx.usd_value)
    .bind(tx.block_number)
    .bind(tx.timestamp)
    .bind(&tx.date)
    .bind(tx.direction.as_str())
    .bind(tx.status.as_str())
    .bind(&tx.provenance.data_source)
    .bind(tx.provenance.scraped_at)
    .bind(&tx.provenance.scraper_version)
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}

/// Fetch transactions matching `filter`, ordered by timestamp.
pub async fn query_transactions(
    pool: &PgPool,
    filter: &TransactionFilter,
) -> Result<Vec<Transaction>, StoreError> {
    let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
    push_filters(&mut qb, filter);

    qb.push(match filter.order {
        SortOrder::Asc => " ORDER BY occurred_at ASC, tx_hash ASC",
        SortOrder::Desc => " ORDER BY occurred_at DESC, tx_hash ASC",
    });
    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = filter.offset {
        qb.push(" OFFSET ").push_bind(offset);
    }

    let rows = qb.build_query_as::<TransactionRow>().fetch_all(pool).await?;
    rows.into_iter().map(Transaction::try_from).collect()
}

pub async fn count_transactions(pool: &PgPool, filter: &TransactionFilter) -> Result<i64, StoreError> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM blockchain_transactions");
    push_filters(&mut qb, filter);

    let count = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(count)
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &TransactionFilter) {
    qb.push(" WHERE TRUE");

    if !f.network_ids.is_empty() {
        qb.push(" AND network_id = ANY(")
            .push_bind(f.network_ids.clone())
            .push(")");
    }
    if let Some(chain) = f.chain {
        qb.push(" AND chain = ").push_bind(chain.as_str());
    }
    if let Some(wallet) = &f.wallet_address {
        qb.push(" AND wallet_address = ").push_bind(wallet.clone());
    }
    if let Some(direction) = f.direction {
        qb.push(" AND direction = ").push_bind(direction.as_str());
    }
    if let Some(from) = f.from {
        qb.push(" AND occurred_at >= ").push_bind(from);
    }
    if let Some(to) = f.to {
        qb.push(" AND occurred_at <= ").push_bind(to);
    }
    if let Some(needle) = &f.hash_contains {
        qb.push(" AND tx_hash ILIKE ")
            .push_bind(format!("%{}%", escape_like(needle)));
    }
    if let Some(min) = f.min_amount {
        qb.push(" AND amount >= ").push_bind(min);
    }
    if let Some(max) = f.max_amount {
        qb.push(" AND amount <= ").push_bind(max);
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
