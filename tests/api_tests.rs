mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use chainledger::api::router::create_router;

use common::{build_app, eth_doc, eth_transfer, network, wait_for_idle, FakeScanner, TestApp};

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

fn seeded_app(scanner: FakeScanner) -> (TestApp, Uuid) {
    let net = network("alpha", &["0xW"], &[], &[]);
    let id = net.id;
    (build_app(vec![net], scanner), id)
}

fn usdt_scanner() -> FakeScanner {
    FakeScanner::new().respond(
        "0xW",
        eth_doc(
            "0xW",
            vec![
                eth_transfer("0xaaa1", "0xF", "0xW", "USDT", "100", "2024-03-15 10:00:00"),
                eth_transfer("0xbbb2", "0xW", "0xT", "USDT", "40", "2024-03-16 10:00:00"),
            ],
        ),
    )
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = seeded_app(FakeScanner::new());
    let router = create_router(app.state.clone());

    let (status, json) = send(&router, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["scanner"], "ok");
}

#[tokio::test]
async fn test_health_reports_scanner_problem() {
    let (app, _) = seeded_app(FakeScanner::new().without_environment("no interpreter"));
    let router = create_router(app.state.clone());

    let (status, json) = send(&router, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["scanner"].as_str().unwrap().contains("no interpreter"));
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let (app, _) = seeded_app(FakeScanner::new());
    let router = create_router(app.state.clone());

    let (status, _) = send(&router, "GET", "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trigger_returns_accepted_then_conflict() {
    let (app, _) = seeded_app(FakeScanner::new().with_delay(Duration::from_millis(200)));
    let router = create_router(app.state.clone());

    let (status, json) = send(&router, "POST", "/api/blockchain/scrape").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["state"], "running");

    let (status, json) = send(&router, "POST", "/api/blockchain/scrape").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["state"], "running");

    wait_for_idle(app.orchestrator(), Duration::from_secs(5)).await;

    let (status, json) = send(&router, "GET", "/api/blockchain/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["state"], "completed");
    assert_eq!(json["data"]["progress"], 100);
    assert!(json["data"]["lastResults"].is_object());
}

#[tokio::test]
async fn test_network_scrape_statuses() {
    let (app, id) = seeded_app(usdt_scanner());
    let router = create_router(app.state.clone());

    let (status, json) = send(&router, "POST", &format!("/api/blockchain/scrape/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["networkName"], "alpha");
    assert_eq!(json["data"]["chains"]["ethereum"]["inserted"], 2);

    let (status, json) = send(&router, "POST", &format!("/api/blockchain/scrape/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);

    let (status, _) = send(&router, "POST", "/api/blockchain/scrape/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (app, id) = seeded_app(FakeScanner::new().without_environment("no interpreter"));
    let router = create_router(app.state.clone());
    let (status, _) = send(&router, "POST", &format!("/api/blockchain/scrape/{id}")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_summaries_after_scan() {
    let (app, id) = seeded_app(usdt_scanner());
    app.orchestrator().run_network_scrapers(id).await.unwrap();
    let router = create_router(app.state.clone());

    let (status, json) = send(&router, "GET", &format!("/api/blockchain/networks/{id}/summary")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["totalTransactions"], 1);
    assert_eq!(json["data"]["totalUsdValue"], "100");

    let (status, json) = send(&router, "GET", "/api/blockchain/summary?month=3&year=2024").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["totalUsdValue"], "100");
    assert_eq!(json["data"]["period"]["monthName"], "March");

    let (status, json) = send(&router, "GET", "/api/blockchain/summary?month=4&year=2024").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["totalUsdValue"], "0");
}

#[tokio::test]
async fn test_summary_errors() {
    let (app, _) = seeded_app(FakeScanner::new());
    let router = create_router(app.state.clone());

    let (status, _) = send(&router, "GET", &format!("/api/blockchain/networks/{}/summary", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&router, "GET", "/api/blockchain/summary?month=13&year=2024").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let uri = format!(
        "/api/blockchain/managers/{}/total-value?start_date=2024-04-01&end_date=2024-03-01",
        Uuid::new_v4()
    );
    let (status, _) = send(&router, "GET", &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_network_transactions_filter_and_paginate() {
    let (app, id) = seeded_app(usdt_scanner());
    app.orchestrator().run_network_scrapers(id).await.unwrap();
    let router = create_router(app.state.clone());

    let (status, json) = send(&router, "GET", &format!("/api/blockchain/networks/{id}/transactions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["pagination"]["total"], 2);
    let txs = json["data"]["transactions"].as_array().unwrap();
    assert_eq!(txs[0]["txHash"], "0xbbb2");

    let uri = format!("/api/blockchain/networks/{id}/transactions?transferType=incoming");
    let (_, json) = send(&router, "GET", &uri).await;
    assert_eq!(json["data"]["pagination"]["total"], 1);
    assert_eq!(json["data"]["transactions"][0]["direction"], "incoming");

    let uri = format!("/api/blockchain/networks/{id}/transactions?searchHash=BBB");
    let (_, json) = send(&router, "GET", &uri).await;
    assert_eq!(json["data"]["pagination"]["total"], 1);

    let uri = format!("/api/blockchain/networks/{id}/transactions?limit=1&page=2");
    let (_, json) = send(&router, "GET", &uri).await;
    assert_eq!(json["data"]["pagination"]["pages"], 2);
    assert_eq!(json["data"]["transactions"][0]["txHash"], "0xaaa1");

    let uri = format!("/api/blockchain/networks/{id}/transactions?limit=500&page={}", i64::MAX);
    let (status, json) = send(&router, "GET", &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["pagination"]["total"], 2);
    assert!(json["data"]["transactions"].as_array().unwrap().is_empty());

    let uri = format!("/api/blockchain/networks/{id}/transactions?blockchain=dogecoin");
    let (status, _) = send(&router, "GET", &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = send(&router, "GET", "/api/blockchain/transactions?limit=5").await;
    let recent = json["data"].as_array().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["txHash"], "0xaaa1");
}
