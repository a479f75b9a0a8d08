mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::*;
use sea_orm::ConnectionTrait;
use serde_json::json;
use shared::domain::Plan;

#[tokio::test]
async fn health_reports_database() {
    let app = spawn().await;

    let reply = app.get("/api/v1/health/", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["db"], true);
    assert!(reply.body["version"].as_str().unwrap().starts_with(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn metrics_require_the_configured_token() {
    let mut config = test_config();
    config.metrics_secret = Some("scrape-me".to_string());
    let app = spawn_with(config).await;
    app.vendor("ada@example.com", Plan::Trial).await;

    let denied = app.get("/api/v1/metrics/", None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["detail"], "Forbidden");

    let by_query = app.get("/api/v1/metrics/?token=scrape-me", None).await;
    assert_eq!(by_query.status, StatusCode::OK);
    assert_eq!(by_query.body["vendors_total"], 1);

    let request = Request::builder()
        .uri("/api/v1/metrics/")
        .header("x-metrics-token", "scrape-me")
        .body(Body::empty())
        .unwrap();
    let by_header = app.send(request).await;
    assert_eq!(by_header.status, StatusCode::OK);
    assert_eq!(by_header.body["counters"]["throttle_429_total"], 0);
}

#[tokio::test]
async fn anonymous_clients_are_throttled() {
    let mut config = test_config();
    config.throttle.anon = 2;
    let app = spawn_with(config).await;

    for _ in 0..2 {
        let reply = app.get("/api/v1/accounts/vendors/me/", None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }
    let reply = app.get("/api/v1/accounts/vendors/me/", None).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.body["code"], "throttled");
    assert_eq!(reply.headers["retry-after"], "60");
    assert_eq!(app.state.metrics.throttled_total(), 1);

    // Health checks are never throttled
    let reply = app.get("/api/v1/health/", None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn order_writes_have_their_own_allowance() {
    let mut config = test_config();
    config.throttle.order_write = 1;
    let app = spawn_with(config).await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    let token = app.token(&v);
    let body = json!({ "asset": "USDT", "type": "buy", "amount": "5", "rate": "1500" });

    let first = app.post("/api/v1/orders/", Some(&token), body.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.text);
    let second = app.post("/api/v1/orders/", Some(&token), body).await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);

    // Reads still go through
    let list = app.get("/api/v1/orders/", Some(&token)).await;
    assert_eq!(list.status, StatusCode::OK);
}

fn webhook(body: &str, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/telegram/webhook/")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-telegram-bot-api-secret-token", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn webhook_checks_secret_and_routes_updates() {
    let mut config = test_config();
    config.telegram_webhook_secret = Some("hook-secret".to_string());
    let app = spawn_with(config).await;
    let v = app.vendor("ada@example.com", Plan::Trial).await;
    let update = json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "chat": { "id": 4242, "type": "private" },
            "from": { "id": 4242, "first_name": "Bola", "is_bot": false },
            "text": format!("/start vendor_{}", v.id),
        }
    })
    .to_string();

    let forbidden = app.send(webhook(&update, Some("wrong"))).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["status"], "forbidden");

    let bad = app.send(webhook("{not json", Some("hook-secret"))).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let ok = app.send(webhook(&update, Some("hook-secret"))).await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.text);
    assert_eq!(ok.body["status"], "ok");
    let sent = app.telegram.sent_to(4242);
    assert!(!sent.is_empty());
    assert!(sent[0].text.starts_with("Welcome to Vendora"), "{}", sent[0].text);

    let session = app.services().sessions.find(4242).await.unwrap().unwrap();
    assert_eq!(session.vendor_id, Some(v.id));
}

#[tokio::test]
async fn webhook_failures_do_not_leak_details() {
    let app = spawn().await;
    app.services()
        .db()
        .execute_unprepared("DROP TABLE bot_users")
        .await
        .unwrap();
    let update = json!({
        "update_id": 2,
        "message": {
            "message_id": 11,
            "chat": { "id": 5151, "type": "private" },
            "from": { "id": 5151, "first_name": "Bola", "is_bot": false },
            "text": "/help",
        }
    })
    .to_string();

    let reply = app.send(webhook(&update, None)).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, json!({ "status": "error" }));
    assert!(!reply.text.contains("bot_users"), "{}", reply.text);
}

#[tokio::test]
async fn set_webhook_needs_a_url() {
    let app = spawn().await;

    let reply = app.post("/api/v1/telegram/webhook/set/", None, json!({})).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stream_sends_initial_snapshot() {
    let mut config = test_config();
    config.sse_window_seconds = 0;
    let app = spawn_with(config).await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    app.post(
        "/api/v1/orders/",
        Some(&app.token(&v)),
        json!({ "asset": "USDT", "type": "buy", "amount": "5", "rate": "1500" }),
    )
    .await;

    let unauthenticated = app.get("/api/v1/stream/", None).await;
    assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);

    let reply = app
        .get(&format!("/api/v1/stream/?token={}", app.token(&v)), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers["content-type"], "text/event-stream");
    assert!(reply.text.contains("event: snapshot"), "{}", reply.text);
    assert!(reply.text.contains("orders_updated_at"));
}
