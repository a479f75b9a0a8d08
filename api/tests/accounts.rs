mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;
use shared::domain::Plan;

#[tokio::test]
async fn signup_starts_a_trial() {
    let app = spawn().await;

    let reply = app
        .post(
            "/api/v1/accounts/signup/",
            None,
            json!({ "email": "Ada@Example.com", "name": "Ada", "password": "password123" }),
        )
        .await;

    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.text);
    assert_eq!(reply.body["message"], "Account created successfully!");
    assert_eq!(reply.body["user"]["email"], "ada@example.com");
    assert_eq!(reply.body["user"]["is_trial"], true);
    assert!(reply.body["user"]["trial_expires_at"].is_string());
}

#[tokio::test]
async fn signup_rejects_short_password_and_duplicates() {
    let app = spawn().await;

    let reply = app
        .post(
            "/api/v1/accounts/signup/",
            None,
            json!({ "email": "ada@example.com", "name": "Ada", "password": "short" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "invalid");
    assert!(reply.body["errors"]["password"].is_array(), "{}", reply.text);

    app.vendor("ada@example.com", Plan::Trial).await;
    let reply = app
        .post(
            "/api/v1/accounts/signup/",
            None,
            json!({ "email": "ada@example.com", "name": "Ada", "password": "password123" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn token_pair_and_refresh() {
    let app = spawn().await;
    app.vendor("ada@example.com", Plan::Trial).await;

    let bad = app
        .post(
            "/api/v1/accounts/token/",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad.body["detail"], "No active account found with the given credentials");

    let pair = app
        .post(
            "/api/v1/accounts/token/",
            None,
            json!({ "email": "ada@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(pair.status, StatusCode::OK, "{}", pair.text);
    let access = pair.body["access"].as_str().unwrap().to_string();
    let refresh = pair.body["refresh"].as_str().unwrap().to_string();

    let me = app.get("/api/v1/accounts/vendors/me/", Some(&access)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "ada@example.com");
    assert!(me.body.get("password_hash").is_none());
    assert_eq!(me.body["subscription"]["plan"], "trial");

    let renewed = app
        .post("/api/v1/accounts/token/refresh/", None, json!({ "refresh": refresh }))
        .await;
    assert_eq!(renewed.status, StatusCode::OK);
    assert!(renewed.body["access"].is_string());

    // An access token is not accepted as a refresh token
    let wrong_kind = app
        .post("/api/v1/accounts/token/refresh/", None, json!({ "refresh": access }))
        .await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = spawn().await;

    let reply = app.get("/api/v1/accounts/vendors/me/", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "not_authenticated");

    let reply = app.get("/api/v1/orders/", Some("not-a-jwt")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_and_plan_upgrade() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Trial).await;
    let token = app.token(&v);

    let reply = app
        .call(
            Method::PATCH,
            "/api/v1/accounts/vendors/me/",
            Some(&token),
            Some(json!({ "telegram_username": "@ada_trades", "auto_expire_minutes": 15 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    assert_eq!(reply.body["telegram_username"], "ada_trades");
    assert_eq!(reply.body["auto_expire_minutes"], 15);

    let reply = app
        .post("/api/v1/accounts/plan/upgrade/", Some(&token), json!({ "plan": "perpetual" }))
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);
    assert_eq!(reply.body["plan"], "perpetual");
    assert_eq!(reply.body["is_trial"], false);
    assert!(reply.body["plan_expires_at"].is_null());

    let reply = app.post("/api/v1/accounts/plan/upgrade/", Some(&token), json!({})).await;
    assert_eq!(reply.body["plan"], "monthly");
    assert!(reply.body["plan_expires_at"].is_string());

    let reply = app
        .post("/api/v1/accounts/plan/upgrade/", Some(&token), json!({ "plan": "trial" }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bank_details_default_switches() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Monthly).await;
    let token = app.token(&v);

    let first = app
        .post(
            "/api/v1/accounts/bank-details/",
            Some(&token),
            json!({ "bank_name": "GTBank", "account_number": "0123456789", "account_name": "Ada Trades" }),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.text);
    let second = app
        .post(
            "/api/v1/accounts/bank-details/",
            Some(&token),
            json!({ "bank_name": "Kuda", "account_number": "9876543210", "account_name": "Ada Trades" }),
        )
        .await;
    let second_id = second.body["id"].as_i64().unwrap();

    let reply = app
        .post(
            &format!("/api/v1/accounts/bank-details/{}/set-default/", second_id),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.text);

    let list = app.get("/api/v1/accounts/bank-details/", Some(&token)).await;
    let defaults: Vec<i64> = list
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter(|d| d["is_default"] == true)
        .map(|d| d["id"].as_i64().unwrap())
        .collect();
    assert_eq!(defaults, vec![second_id]);

    let reply = app
        .call(
            Method::DELETE,
            &format!("/api/v1/accounts/bank-details/{}/", second_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn staff_approves_payment_request() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Trial).await;
    let staff = app.vendor("ops@example.com", Plan::Perpetual).await;
    let staff = app
        .update_vendor(staff, |a| a.is_staff = sea_orm::Set(true))
        .await;

    let (content_type, body) = multipart(&[("note", "Paid for a month")]);
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/accounts/payment-requests/")
        .header("authorization", format!("Bearer {}", app.token(&v)))
        .header("content-type", content_type)
        .body(body)
        .unwrap();
    let created = app.send(request).await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    let id = created.body["id"].as_i64().unwrap();

    // Only staff may approve
    let denied = app
        .post(
            &format!("/api/v1/accounts/payment-requests/{}/approve/", id),
            Some(&app.token(&v)),
            json!({}),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let approved = app
        .post(
            &format!("/api/v1/accounts/payment-requests/{}/approve/", id),
            Some(&app.token(&staff)),
            json!({ "duration_days": 30 }),
        )
        .await;
    assert_eq!(approved.status, StatusCode::OK, "{}", approved.text);

    let vendor = app.services().vendors.get(v.id).await.unwrap();
    assert_eq!(vendor.plan, "monthly");
    assert!(vendor.plan_expires_at.is_some());
}

#[tokio::test]
async fn broadcasts_are_drafted_and_sent_to_subscribers() {
    let app = spawn().await;
    let v = app.vendor("ada@example.com", Plan::Trial).await;
    let token = app.token(&v);
    let user = app.services().sessions.get_or_create(9001).await.unwrap();
    app.services().sessions.link_vendor(user, Some(v.id), true).await.unwrap();

    let anonymous = app.get("/api/v1/accounts/broadcasts/", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let created = app
        .post(
            "/api/v1/accounts/broadcasts/",
            Some(&token),
            json!({ "message_type": "asset_added", "title": "New BTC Rate", "content": "BTC now available" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    assert_eq!(created.body["is_sent"], false);
    let id = created.body["id"].as_i64().unwrap();

    let list = app.get("/api/v1/accounts/broadcasts/", Some(&token)).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["results"][0]["title"], "New BTC Rate");

    let sent = app
        .post(&format!("/api/v1/accounts/broadcasts/{}/send-to-bot/", id), Some(&token), json!({}))
        .await;
    assert_eq!(sent.status, StatusCode::OK, "{}", sent.text);
    assert_eq!(sent.body["broadcast"]["is_sent"], true);
    assert_eq!(sent.body["delivered"], 1);
    assert_eq!(app.telegram.sent_to(9001)[0].text, "New BTC Rate\n\nBTC now available");

    let again = app
        .post(&format!("/api/v1/accounts/broadcasts/{}/send-to-bot/", id), Some(&token), json!({}))
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let other = app.vendor("bob@example.com", Plan::Trial).await;
    let hidden = app
        .call(
            Method::DELETE,
            &format!("/api/v1/accounts/broadcasts/{}/", id),
            Some(&app.token(&other)),
            None,
        )
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
}
