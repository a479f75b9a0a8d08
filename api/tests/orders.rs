mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use common::*;
use sea_orm::Set;
use serde_json::json;
use shared::domain::Plan;

#[tokio::test]
async fn create_uses_configured_rate() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    app.rate(v.id, "USDT", 1500, 1450).await;
    let token = app.token(&v);

    let reply = app
        .post(
            "/api/v1/orders/",
            Some(&token),
            json!({ "asset": "usdt", "type": "buy", "amount": "100", "customer_chat_id": 777 }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text);
    assert_eq!(reply.body["asset"], "USDT");
    assert_eq!(reply.body["type"], "buy");
    assert_eq!(reply.body["status"], "pending");
    assert!(reply.body["order_code"].as_str().unwrap().starts_with("ORD-"));
    assert!(reply.body["auto_expire_at"].is_string());

    let list = app.get("/api/v1/orders/?status=pending", Some(&token)).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["count"], 1);
    assert_eq!(list.body["results"][0]["id"], reply.body["id"]);
}

#[tokio::test]
async fn create_without_rate_is_not_found() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;

    let reply = app
        .post(
            "/api/v1/orders/",
            Some(&app.token(&v)),
            json!({ "asset": "BTC", "type": "sell", "amount": "0.5" }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["detail"], "No rate configured for BTC.");
}

#[tokio::test]
async fn expired_trial_cannot_create_orders() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Trial).await;
    let v = app
        .update_vendor(v, |a| a.trial_expires_at = Set(Some(Utc::now() - chrono::Duration::hours(1))))
        .await;

    let reply = app
        .post(
            "/api/v1/orders/",
            Some(&app.token(&v)),
            json!({ "asset": "USDT", "type": "buy", "amount": "10", "rate": "1500" }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["code"], "plan_restricted");
    assert!(reply.body["detail"].as_str().unwrap().contains("free trial has expired"));
}

#[tokio::test]
async fn accept_opens_transaction_and_notifies_customer() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    app.rate(v.id, "USDT", 1500, 1450).await;
    let token = app.token(&v);
    let order = app
        .post(
            "/api/v1/orders/",
            Some(&token),
            json!({ "asset": "USDT", "type": "buy", "amount": "100", "customer_chat_id": 777 }),
        )
        .await;
    let id = order.body["id"].as_i64().unwrap();

    let reply = app
        .post(&format!("/api/v1/orders/{}/accept/", id), Some(&token), json!({}))
        .await;

    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    assert_eq!(reply.body["status"], "accepted");
    assert_eq!(reply.body["transaction"]["status"], "uncompleted");
    assert_eq!(reply.body["pay_instructions"], "GTBank 0123456789");
    let sent = app.telegram.sent_to(777);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains(order.body["order_code"].as_str().unwrap()));

    // A second accept is an invalid transition
    let again = app
        .post(&format!("/api/v1/orders/{}/accept/", id), Some(&token), json!({}))
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["code"], "invalid_transition");
}

#[tokio::test]
async fn free_plan_quota_blocks_accept() {
    let mut config = test_config();
    config.free_plan_daily_order_limit = 1;
    let app = spawn_with(config).await;
    let v = app.vendor("ada@example.com", Plan::Perpetual).await;
    app.rate(v.id, "USDT", 1500, 1450).await;
    let token = app.token(&v);
    let mut ids = Vec::new();
    for _ in 0..2 {
        let order = app
            .post("/api/v1/orders/", Some(&token), json!({ "asset": "USDT", "type": "buy", "amount": "5" }))
            .await;
        ids.push(order.body["id"].as_i64().unwrap());
    }
    app.services().vendors.set_plan(v.id, Plan::None, None).await.unwrap();

    let first = app
        .post(&format!("/api/v1/orders/{}/accept/", ids[0]), Some(&token), json!({}))
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.text);

    let second = app
        .post(&format!("/api/v1/orders/{}/accept/", ids[1]), Some(&token), json!({}))
        .await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);
    assert_eq!(second.body["code"], "plan_restricted");
    assert!(second.body["detail"].as_str().unwrap().contains("can't take any more orders"));
}

#[tokio::test]
async fn decline_needs_a_reason_and_locks_the_transaction() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    let token = app.token(&v);
    let order = app
        .post(
            "/api/v1/orders/",
            Some(&token),
            json!({ "asset": "USDT", "type": "sell", "amount": "20", "rate": "1450" }),
        )
        .await;
    let id = order.body["id"].as_i64().unwrap();

    let missing = app.post(&format!("/api/v1/orders/{}/decline/", id), Some(&token), json!({})).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["detail"], "Rejection reason is required");

    let declined = app
        .post(
            &format!("/api/v1/orders/{}/decline/", id),
            Some(&token),
            json!({ "rejection_reason": "Out of stock" }),
        )
        .await;
    assert_eq!(declined.status, StatusCode::OK, "{}", declined.text);
    assert_eq!(declined.body["status"], "declined");
    let txn_id = declined.body["transaction"]["id"].as_i64().unwrap();
    assert_eq!(declined.body["transaction"]["status"], "declined");

    let (content_type, body) = multipart(&[("status", "completed")]);
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/transactions/{}/complete/", txn_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", content_type)
        .body(body)
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", reply.text);
}

#[tokio::test]
async fn complete_finishes_order() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    let token = app.token(&v);
    let order = app
        .post(
            "/api/v1/orders/",
            Some(&token),
            json!({ "asset": "USDT", "type": "buy", "amount": "20", "rate": "1500" }),
        )
        .await;
    let id = order.body["id"].as_i64().unwrap();
    let accepted = app
        .post(
            &format!("/api/v1/orders/{}/accept/", id),
            Some(&token),
            json!({ "pay_instructions": "Pay to Kuda 111" }),
        )
        .await;
    let txn_id = accepted.body["transaction"]["id"].as_i64().unwrap();

    let (content_type, body) = multipart(&[("status", "completed")]);
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/transactions/{}/complete/", txn_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", content_type)
        .body(body)
        .unwrap();
    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    assert_eq!(reply.body["status"], "completed");

    let detail = app.get(&format!("/api/v1/orders/{}/", id), Some(&token)).await;
    assert_eq!(detail.body["status"], "completed");
    assert_eq!(detail.body["transaction"]["status"], "completed");
}

#[tokio::test]
async fn other_vendors_orders_are_hidden() {
    let app = spawn().await;
    let ada = app.vendor("ada@example.com", Plan::Monthly).await;
    let kemi = app.vendor("kemi@example.com", Plan::Monthly).await;
    let order = app
        .post(
            "/api/v1/orders/",
            Some(&app.token(&ada)),
            json!({ "asset": "USDT", "type": "buy", "amount": "20", "rate": "1500" }),
        )
        .await;
    let id = order.body["id"].as_i64().unwrap();

    let reply = app.get(&format!("/api/v1/orders/{}/", id), Some(&app.token(&kemi))).await;
    assert!(
        reply.status == StatusCode::NOT_FOUND || reply.status == StatusCode::FORBIDDEN,
        "{}",
        reply.status
    );
    let list = app.get("/api/v1/orders/", Some(&app.token(&kemi))).await;
    assert_eq!(list.body["count"], 0);
}

#[tokio::test]
async fn duplicate_rate_is_a_conflict() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    let token = app.token(&v);
    let body = json!({ "asset": "USDT", "buy_rate": "1500", "sell_rate": "1450" });

    let first = app.post("/api/v1/rates/", Some(&token), body.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.text);
    let second = app.post("/api/v1/rates/", Some(&token), body).await;
    assert_eq!(second.status, StatusCode::CONFLICT);

    let id = first.body["id"].as_i64().unwrap();
    let patched = app
        .call(
            Method::PATCH,
            &format!("/api/v1/rates/{}/", id),
            Some(&token),
            Some(json!({ "sell_rate": "1460" })),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK, "{}", patched.text);
    assert_eq!(patched.body["asset"], "USDT");

    let deleted = app
        .send(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/rates/{}/", id))
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
}
