use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::services::scheduler::{parse_cron, ScheduleConfig, DEFAULT_CRON_SCHEDULE};

const DEFAULT_SCANNER_DIR: &str = "./scanners";
const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STARTUP_DELAY_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Scanner
    pub scanner_dir: PathBuf,
    pub scanner_interpreter: Option<String>,
    pub scan_timeout: Duration,
    pub etherscan_api_key: Option<String>,

    // Scheduling
    pub schedule: ScheduleConfig,

    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let cron_expression = env::var("BLOCKCHAIN_SCRAPER_CRON_SCHEDULE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CRON_SCHEDULE.into());
        parse_cron(&cron_expression)
            .with_context(|| format!("BLOCKCHAIN_SCRAPER_CRON_SCHEDULE is invalid: {cron_expression:?}"))?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a port number")?,

            scanner_dir: env::var("SCANNER_DIR")
                .unwrap_or_else(|_| DEFAULT_SCANNER_DIR.into())
                .into(),
            scanner_interpreter: non_empty_var("SCANNER_INTERPRETER"),
            scan_timeout: scan_timeout(secs_var("SCAN_TIMEOUT_SECS", DEFAULT_SCAN_TIMEOUT_SECS)?)?,
            etherscan_api_key: non_empty_var("ETHERSCAN_API_KEY"),

            schedule: ScheduleConfig {
                cron_expression,
                // Anything but an explicit "false" leaves these on.
                auto_enabled: flag_var("BLOCKCHAIN_AUTO_SCRAPE_ENABLED"),
                run_on_startup: flag_var("BLOCKCHAIN_SCRAPE_ON_STARTUP"),
                startup_delay: Duration::from_secs(secs_var(
                    "BLOCKCHAIN_STARTUP_DELAY_SECS",
                    DEFAULT_STARTUP_DELAY_SECS,
                )?),
            },

            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn flag_var(name: &str) -> bool {
    parse_flag(env::var(name).ok().as_deref())
}

fn parse_flag(value: Option<&str>) -> bool {
    !matches!(value.map(str::trim), Some(v) if v.eq_ignore_ascii_case("false"))
}

fn secs_var(name: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a whole number of seconds, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// A zero timeout would fail every scan before the helper starts.
fn scan_timeout(secs: u64) -> anyhow::Result<Duration> {
    if secs == 0 {
        anyhow::bail!("SCAN_TIMEOUT_SECS must be at least 1");
    }
    Ok(Duration::from_secs(secs))
}
