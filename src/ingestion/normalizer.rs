use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    Chain, Direction, Network, NewTransaction, ScrapeProvenance, TokenInfo, TxStatus,
};
use crate::scanner::types::{
    BtcNativeTransfer, BtcTokenTransfer, EthTransfer, ScanDocument, TronTransfer,
};

pub const SCRAPER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("scan document has an unexpected shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("scanner reported failure: {0}")]
    Reported(String),
}

/// Where a batch of transfers came from.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    pub network: &'a Network,
    pub chain: Chain,
    pub wallet_address: &'a str,
    pub scraped_at: DateTime<Utc>,
}

/// A transfer that could not be turned into a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTransfer {
    pub list: &'static str,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub transactions: Vec<NewTransaction>,
    pub skipped: Vec<SkippedTransfer>,
}

impl NormalizedBatch {
    fn skip(&mut self, ctx: &ScanContext<'_>, list: &'static str, index: usize, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(
            network = %ctx.network.name,
            chain = %ctx.chain,
            address = %ctx.wallet_address,
            list,
            index,
            reason = %reason,
            "Normalizer: skipping transfer"
        );
        self.skipped.push(SkippedTransfer { list, index, reason });
    }
}

/// Convert one scanner document into canonical transactions.
///
/// Only a document that is not an object (or whose lists are not arrays)
/// fails as a whole; individual malformed transfers are skipped.
pub fn normalize(ctx: &ScanContext<'_>, raw: &Value) -> Result<NormalizedBatch, NormalizeError> {
    let doc: ScanDocument = serde_json::from_value(raw.clone())?;
    if doc.success == Some(false) {
        return Err(NormalizeError::Reported(
            doc.error.unwrap_or_else(|| "unknown error".into()),
        ));
    }

    let mut batch = NormalizedBatch::default();
    match ctx.chain {
        Chain::Bitcoin => {
            each(ctx, &mut batch, "token_transfers", &doc.token_transfers, btc_token);
            each(ctx, &mut batch, "bitcoin_transfers", &doc.bitcoin_transfers, btc_native);
        }
        Chain::Ethereum => each(ctx, &mut batch, "transfers", &doc.transfers, eth_transfer),
        Chain::Tron => each(ctx, &mut batch, "transfers", &doc.transfers, tron_transfer),
    }
    Ok(batch)
}

fn each<T, F>(
    ctx: &ScanContext<'_>,
    batch: &mut NormalizedBatch,
    list: &'static str,
    items: &[Value],
    convert: F,
) where
    T: DeserializeOwned,
    F: Fn(&ScanContext<'_>, T) -> Result<NewTransaction, String>,
{
    for (index, item) in items.iter().enumerate() {
        let parsed = serde_json::from_value::<T>(item.clone())
            .map_err(|e| format!("malformed transfer: {e}"))
            .and_then(|t| convert(ctx, t));
        match parsed {
            Ok(tx) => batch.transactions.push(tx),
            Err(reason) => batch.skip(ctx, list, index, reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-shape conversion
// ---------------------------------------------------------------------------

/// Fields every shape resolves before the common record is assembled.
struct Draft {
    hash: String,
    from: String,
    to: String,
    amount: Decimal,
    amount_raw: String,
    token: TokenInfo,
    usd_value: Option<Decimal>,
    block_number: Option<i64>,
    when: Value,
    /// Calendar date reported alongside `when`, kept as the record's date.
    calendar_date: Option<String>,
    kind: Option<String>,
    status: TxStatus,
}

fn btc_token(ctx: &ScanContext<'_>, t: BtcTokenTransfer) -> Result<NewTransaction, String> {
    let (amount, amount_raw) = required_amount(t.amount.as_ref())?;
    let symbol = required_text(t.token_symbol, "token symbol")?;
    let name = t.token_name.unwrap_or_else(|| symbol.clone());
    let usd_value = usd_for(ctx.chain, &symbol, amount, None);

    finish(
        ctx,
        Draft {
            hash: required_text(t.transaction_id, "transaction hash")?,
            from: required_text(t.from_address, "counterparty")?,
            to: non_blank(t.to_address).unwrap_or_else(|| ctx.wallet_address.to_string()),
            amount,
            amount_raw,
            token: TokenInfo { symbol, name, decimals: ctx.chain.default_decimals() },
            usd_value,
            block_number: None,
            when: t.date.ok_or("missing timestamp")?,
            calendar_date: None,
            kind: t.kind,
            status: parse_status(t.status.as_ref(), true),
        },
    )
}

fn btc_native(ctx: &ScanContext<'_>, t: BtcNativeTransfer) -> Result<NewTransaction, String> {
    let (amount, btc_text) = required_amount(t.amount_btc.as_ref())?;
    let amount_raw = t
        .amount_satoshi
        .as_ref()
        .and_then(value_text)
        .unwrap_or(btc_text);
    let from = t
        .from_addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if from.is_empty() {
        return Err("missing counterparty".into());
    }
    let reported_usd = t.amount_usd.as_ref().and_then(parse_decimal);

    finish(
        ctx,
        Draft {
            hash: required_text(t.transaction_id, "transaction hash")?,
            from,
            to: ctx.wallet_address.to_string(),
            amount,
            amount_raw,
            token: TokenInfo {
                symbol: "BTC".into(),
                name: "Bitcoin".into(),
                decimals: ctx.chain.default_decimals(),
            },
            usd_value: usd_for(ctx.chain, "BTC", amount, reported_usd),
            block_number: t.block_number.as_ref().and_then(parse_block),
            when: t.date.ok_or("missing timestamp")?,
            calendar_date: None,
            kind: t.kind,
            status: TxStatus::Confirmed,
        },
    )
}

fn eth_transfer(ctx: &ScanContext<'_>, t: EthTransfer) -> Result<NewTransaction, String> {
    let (amount, amount_raw) = required_amount(t.amount.as_ref())?;
    let symbol = required_text(t.token, "token symbol")?;
    let name = t.token_name.unwrap_or_else(|| symbol.clone());
    let reported_usd = t.amount_usd.as_ref().and_then(parse_decimal);

    finish(
        ctx,
        Draft {
            hash: required_text(t.hash, "transaction hash")?,
            from: required_text(t.from, "counterparty")?,
            to: non_blank(t.to).unwrap_or_else(|| ctx.wallet_address.to_string()),
            amount,
            amount_raw,
            usd_value: usd_for(ctx.chain, &symbol, amount, reported_usd),
            token: TokenInfo { symbol, name, decimals: ctx.chain.default_decimals() },
            block_number: t.block_number.as_ref().and_then(parse_block),
            when: t.date.ok_or("missing timestamp")?,
            calendar_date: None,
            kind: t.kind,
            status: parse_status(t.status.as_ref(), false),
        },
    )
}

fn tron_transfer(ctx: &ScanContext<'_>, t: TronTransfer) -> Result<NewTransaction, String> {
    let (amount, amount_text) = required_amount(t.amount.as_ref())?;
    let amount_raw = t
        .raw_amount
        .as_ref()
        .and_then(value_text)
        .unwrap_or(amount_text);
    let symbol = required_text(t.token_symbol, "token symbol")?;
    let name = t.token_name.unwrap_or_else(|| symbol.clone());
    let decimals = t
        .token_decimals
        .as_ref()
        .and_then(parse_block)
        .and_then(|d| i32::try_from(d).ok())
        .unwrap_or_else(|| ctx.chain.default_decimals());
    let reported_usd = t.amount_usd.as_ref().and_then(parse_decimal);
    let calendar_date = t.date.as_ref().and_then(parse_timestamp).map(|(_, date)| date);
    let when = t
        .timestamp
        .filter(|ts| parse_timestamp(ts).is_some())
        .or(t.date)
        .ok_or("missing timestamp")?;

    finish(
        ctx,
        Draft {
            hash: required_text(t.transaction_id, "transaction hash")?,
            from: required_text(t.from_address, "counterparty")?,
            to: non_blank(t.to_address).unwrap_or_else(|| ctx.wallet_address.to_string()),
            amount,
            amount_raw,
            usd_value: usd_for(ctx.chain, &symbol, amount, reported_usd),
            token: TokenInfo { symbol, name, decimals },
            block_number: t.block_number.as_ref().and_then(parse_block),
            when,
            calendar_date,
            kind: t.kind,
            status: tron_status(
                t.contract_ret.as_deref(),
                t.final_result.as_deref(),
                t.status.as_ref(),
            ),
        },
    )
}

fn finish(ctx: &ScanContext<'_>, d: Draft) -> Result<NewTransaction, String> {
    let (timestamp, instant_date) =
        parse_timestamp(&d.when).ok_or_else(|| format!("unparsable timestamp: {}", d.when))?;
    let date = d.calendar_date.unwrap_or(instant_date);
    let direction = resolve_direction(d.kind.as_deref(), &d.from, &d.to, ctx.wallet_address);

    Ok(NewTransaction {
        network_id: ctx.network.id,
        network_name: ctx.network.name.clone(),
        chain: ctx.chain,
        wallet_address: ctx.wallet_address.to_string(),
        tx_hash: d.hash,
        from_address: d.from,
        to_address: d.to,
        amount: d.amount,
        amount_raw: d.amount_raw,
        token: d.token,
        usd_value: d.usd_value,
        block_number: d.block_number,
        timestamp,
        date,
        direction,
        status: d.status,
        provenance: ScrapeProvenance {
            data_source: ctx.chain.data_source().to_string(),
            scraped_at: ctx.scraped_at,
            scraper_version: SCRAPER_VERSION.to_string(),
        },
    })
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Stablecoins and other tokens are valued 1:1; a chain's own coin only has a
/// value when the scanner supplied one.
fn usd_for(chain: Chain, symbol: &str, amount: Decimal, reported: Option<Decimal>) -> Option<Decimal> {
    if symbol.eq_ignore_ascii_case(chain.native_symbol()) {
        reported
    } else {
        Some(amount)
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn required_text(s: Option<String>, what: &str) -> Result<String, String> {
    non_blank(s).ok_or_else(|| format!("missing {what}"))
}

fn required_amount(v: Option<&Value>) -> Result<(Decimal, String), String> {
    let v = v.ok_or("missing amount")?;
    let text = value_text(v).ok_or("missing amount")?;
    let amount = parse_decimal(v).ok_or_else(|| format!("unparsable amount: {text}"))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(format!("negative amount: {text}"));
    }
    Ok((amount, text))
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts JSON numbers and strings such as `"1,234.56"`, `"$10"` or `"1e-8"`.
pub fn parse_decimal(v: &Value) -> Option<Decimal> {
    let text = match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(Decimal::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Some(Decimal::from(u));
            }
            n.to_string()
        }
        Value::String(s) => s.chars().filter(|c| *c != ',' && *c != '$' && !c.is_whitespace()).collect(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .map(|d| d.normalize())
}

fn parse_block(v: &Value) -> Option<i64> {
    let n = match v {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n)
}

fn epoch_to_utc(n: i64) -> Option<DateTime<Utc>> {
    // Values past 1e12 are milliseconds.
    if n > 1_000_000_000_000 {
        DateTime::from_timestamp(n / 1000, ((n % 1000) * 1_000_000) as u32)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

/// Parse a scanner timestamp into an instant plus the `YYYY-MM-DD` date in the
/// clock the scanner reported it in.
pub fn parse_timestamp(v: &Value) -> Option<(DateTime<Utc>, String)> {
    let utc_date = |dt: DateTime<Utc>| (dt, dt.format("%Y-%m-%d").to_string());
    match v {
        Value::Number(n) => n.as_i64().and_then(epoch_to_utc).map(utc_date),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return epoch_to_utc(n).map(utc_date);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some((dt.with_timezone(&Utc), dt.format("%Y-%m-%d").to_string()));
            }
            for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(utc_date(naive.and_utc()));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| utc_date(naive.and_utc()))
        }
        _ => None,
    }
}

fn resolve_direction(kind: Option<&str>, from: &str, to: &str, wallet: &str) -> Direction {
    if let Some(d) = kind.and_then(Direction::from_db_str) {
        return d;
    }
    if to.trim().eq_ignore_ascii_case(wallet) {
        return Direction::Incoming;
    }
    if from
        .split(',')
        .any(|a| a.trim().eq_ignore_ascii_case(wallet))
    {
        return Direction::Outgoing;
    }
    Direction::Incoming
}

/// `zero_is_failure` is set for Omni token transfers, whose status is a
/// validity flag.
fn parse_status(v: Option<&Value>, zero_is_failure: bool) -> TxStatus {
    let Some(text) = v.and_then(value_text).or_else(|| match v {
        Some(Value::Bool(false)) => Some("failed".into()),
        _ => None,
    }) else {
        return TxStatus::Confirmed;
    };
    match text.trim().to_lowercase().as_str() {
        "0" if zero_is_failure => TxStatus::Failed,
        "failed" | "fail" | "invalid" => TxStatus::Failed,
        "pending" | "unconfirmed" => TxStatus::Pending,
        _ => TxStatus::Confirmed,
    }
}

/// Tron reports the contract result separately. Anything but `SUCCESS` there
/// is a failed transfer.
fn tron_status(
    contract_ret: Option<&str>,
    final_result: Option<&str>,
    status: Option<&Value>,
) -> TxStatus {
    let result = [contract_ret, final_result]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|r| !r.is_empty());
    match result {
        Some(r) if r.eq_ignore_ascii_case("success") => TxStatus::Confirmed,
        Some(_) => TxStatus::Failed,
        None => parse_status(status, false),
    }
}
