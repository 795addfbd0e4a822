mod common;

use std::sync::Arc;
use std::time::Duration;

use chainledger::models::RunState;
use chainledger::services::{ScheduleConfig, Scheduler};

use common::{build_app, network, wait_for_idle, FakeScanner, TestApp};

fn app() -> TestApp {
    build_app(vec![network("alpha", &["0xW"], &[], &[])], FakeScanner::new())
}

fn config(startup_delay: Duration) -> ScheduleConfig {
    ScheduleConfig {
        startup_delay,
        ..ScheduleConfig::default()
    }
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let app = app();
    let scheduler = Scheduler::new(Arc::clone(app.orchestrator()), config(Duration::from_secs(3600))).unwrap();

    assert!(scheduler.initialize());
    assert!(scheduler.is_initialized());
    assert!(!scheduler.initialize());
    assert!(scheduler.is_initialized());

    scheduler.stop();
    assert!(!scheduler.is_initialized());
    assert!(scheduler.initialize());
    scheduler.stop();
}

#[tokio::test]
async fn test_disabled_scheduler_installs_nothing() {
    let app = app();
    let scheduler = Scheduler::new(
        Arc::clone(app.orchestrator()),
        ScheduleConfig {
            auto_enabled: false,
            startup_delay: Duration::from_millis(10),
            ..ScheduleConfig::default()
        },
    )
    .unwrap();

    assert!(!scheduler.initialize());
    assert!(!scheduler.is_initialized());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.scanner.calls(), 0);
}

#[tokio::test]
async fn test_startup_run_fires_after_delay() {
    let app = app();
    let scheduler = Scheduler::new(Arc::clone(app.orchestrator()), config(Duration::from_millis(50))).unwrap();
    assert!(scheduler.initialize());

    assert_eq!(app.orchestrator().status().await.state, RunState::Idle);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while app.scanner.calls() == 0 {
        assert!(tokio::time::Instant::now() < deadline, "startup run never fired");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let status = wait_for_idle(app.orchestrator(), Duration::from_secs(5)).await;
    assert_eq!(status.state, RunState::Completed);

    scheduler.stop();
}

#[tokio::test]
async fn test_startup_run_can_be_turned_off() {
    let app = app();
    let scheduler = Scheduler::new(
        Arc::clone(app.orchestrator()),
        ScheduleConfig {
            run_on_startup: false,
            startup_delay: Duration::from_millis(10),
            ..ScheduleConfig::default()
        },
    )
    .unwrap();
    assert!(scheduler.initialize());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.scanner.calls(), 0);
    scheduler.stop();
}

#[tokio::test]
async fn test_stop_cancels_pending_startup_run() {
    let app = app();
    let scheduler = Scheduler::new(Arc::clone(app.orchestrator()), config(Duration::from_millis(100))).unwrap();
    assert!(scheduler.initialize());
    scheduler.stop();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(app.scanner.calls(), 0);
}

#[tokio::test]
async fn test_invalid_cron_expression_is_rejected() {
    let app = app();
    let result = Scheduler::new(
        Arc::clone(app.orchestrator()),
        ScheduleConfig {
            cron_expression: "every day at three".into(),
            ..ScheduleConfig::default()
        },
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_next_run_is_three_am_utc() {
    let app = app();
    let scheduler = Scheduler::new(Arc::clone(app.orchestrator()), ScheduleConfig::default()).unwrap();

    let next = scheduler.next_run().unwrap();
    assert_eq!(next.format("%H:%M:%S").to_string(), "03:00:00");
}
