use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::orchestrator::{RunError, ScraperOrchestrator};

pub const DEFAULT_CRON_SCHEDULE: &str = "0 3 * * *";
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Standard 5-field cron, or the 6/7-field form with seconds. UTC.
    pub cron_expression: String,
    pub auto_enabled: bool,
    pub run_on_startup: bool,
    pub startup_delay: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_CRON_SCHEDULE.into(),
            auto_enabled: true,
            run_on_startup: true,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }
}

/// Parse a cron expression. Five-field input gets a leading seconds field.
pub fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {expr}"))
    } else {
        Schedule::from_str(expr)
    }
}

/// Fires [`ScraperOrchestrator::start_run`] on a cron schedule and once after
/// startup. Overlap is left to the orchestrator's run guard.
pub struct Scheduler {
    orchestrator: Arc<ScraperOrchestrator>,
    config: ScheduleConfig,
    schedule: Schedule,
    initialized: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<ScraperOrchestrator>, config: ScheduleConfig) -> anyhow::Result<Self> {
        let schedule = parse_cron(&config.cron_expression)
            .with_context(|| format!("invalid cron expression {:?}", config.cron_expression))?;
        Ok(Self {
            orchestrator,
            config,
            schedule,
            initialized: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Install the recurring and startup triggers. Returns false when
    /// scheduling is disabled or already installed.
    pub fn initialize(&self) -> bool {
        if !self.config.auto_enabled {
            tracing::info!("Scheduler: auto-scan disabled");
            return false;
        }
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Scheduler: already initialized, skipping");
            return false;
        }

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.push(tokio::spawn(run_cron_loop(
            Arc::clone(&self.orchestrator),
            self.schedule.clone(),
        )));

        if self.config.run_on_startup {
            let orchestrator = Arc::clone(&self.orchestrator);
            let delay = self.config.startup_delay;
            tracing::info!(delay_secs = delay.as_secs(), "Scheduler: startup scan queued");
            tasks.push(tokio::spawn(async move {
                sleep(delay).await;
                trigger(&orchestrator, "startup").await;
            }));
        }

        tracing::info!(
            cron = %self.config.cron_expression,
            next_run = ?self.next_run(),
            "Scheduler: initialized"
        );
        true
    }

    /// Cancel installed triggers. A later `initialize` installs them again.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
        if self.initialized.swap(false, Ordering::SeqCst) {
            tracing::info!("Scheduler: stopped");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }
}

async fn run_cron_loop(orchestrator: Arc<ScraperOrchestrator>, schedule: Schedule) {
    let mut after = Utc::now();
    loop {
        let Some(next) = schedule.after(&after).next() else {
            tracing::warn!("Scheduler: cron expression has no future occurrences");
            return;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        sleep(wait).await;

        trigger(&orchestrator, "cron").await;
        after = next;
    }
}

async fn trigger(orchestrator: &Arc<ScraperOrchestrator>, source: &'static str) {
    match orchestrator.start_run().await {
        Ok(_) => tracing::info!(source, "Scheduler: scan triggered"),
        Err(RunError::AlreadyRunning(_)) => {
            tracing::info!(source, "Scheduler: scan already running, trigger skipped")
        }
        Err(e) => tracing::error!(source, error = %e, "Scheduler: failed to trigger scan"),
    }
}
