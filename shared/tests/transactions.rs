mod common;

use common::*;
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use shared::domain::{OrderStatus, OrderType, Plan, TransactionStatus};
use shared::entity::orders;
use shared::models::{AcceptOrder, NewOrder, Upload};
use shared::telegram::ButtonKind;
use shared::VendoraError;

async fn accepted_order(env: &TestEnv, chat_id: i64) -> (shared::entity::vendors::Model, orders::Model, i32) {
    let v = vendor(env, "ada@example.com", Plan::Perpetual).await;
    rate(env, v.id, "USDT", 1500, 1450).await;
    let order = env
        .services
        .orders
        .create(
            &v,
            NewOrder {
                asset: "USDT".to_string(),
                order_type: OrderType::Buy,
                amount: Decimal::from(100),
                rate: None,
                customer_chat_id: Some(chat_id),
                customer_name: None,
            },
        )
        .await
        .unwrap();
    let (order, txn) = env
        .services
        .orders
        .accept(&v, order.id, AcceptOrder::default())
        .await
        .unwrap();
    env.telegram.clear();
    (v, order, txn.id)
}

#[tokio::test]
async fn completing_stamps_times_and_closes_order() {
    let env = setup().await;
    let (v, order, txn_id) = accepted_order(&env, 55).await;

    let txn = env
        .services
        .transactions
        .complete(
            &v,
            txn_id,
            "completed",
            Some(Upload {
                file_name: "receipt.png".to_string(),
                bytes: b"png".to_vec(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(txn.status(), TransactionStatus::Completed);
    assert!(txn.completed_at.is_some());
    assert!(txn.vendor_completed_at.is_some());
    let proof = txn.vendor_proof.clone().unwrap();
    assert!(proof.starts_with("vendor_proofs/"));
    assert!(proof.ends_with(".png"));

    let order = orders::Entity::find_by_id(order.id).one(env.services.db()).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);

    let sent = env.telegram.sent_to(55);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with(&format!("🎉 Order {} completed!", order.order_code)));
    assert!(sent[0].document.is_some());
    let repeat = sent[0]
        .keyboard
        .iter()
        .flatten()
        .flatten()
        .find_map(|b| match &b.kind {
            ButtonKind::Callback(data) if data.starts_with("repeat_") => Some(data.clone()),
            _ => None,
        });
    assert_eq!(repeat.as_deref(), Some("repeat_USDT_buy_100"));
}

#[tokio::test]
async fn only_completed_or_declined_are_valid_outcomes() {
    let env = setup().await;
    let (v, _, txn_id) = accepted_order(&env, 56).await;

    let err = env
        .services
        .transactions
        .complete(&v, txn_id, "uncompleted", None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid status");
    assert!(env.telegram.sent().is_empty());
}

#[tokio::test]
async fn locked_transactions_cannot_be_completed() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", Plan::Trial).await;
    rate(&env, v.id, "USDT", 1500, 1450).await;
    let order = env
        .services
        .orders
        .create(
            &v,
            NewOrder {
                asset: "USDT".to_string(),
                order_type: OrderType::Sell,
                amount: Decimal::from(2),
                rate: None,
                customer_chat_id: None,
                customer_name: None,
            },
        )
        .await
        .unwrap();
    let (_, txn) = env
        .services
        .orders
        .decline(&v, order.id, Some("Rate changed".to_string()))
        .await
        .unwrap();

    for outcome in ["completed", "declined"] {
        let err = env
            .services
            .transactions
            .complete(&v, txn.id, outcome, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VendoraError::Validation(_)), "{} should be refused", outcome);
    }
    let unchanged = env.services.transactions.for_order(order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status(), TransactionStatus::Declined);
    assert!(unchanged.completed_at.is_none());
}

#[tokio::test]
async fn other_vendors_cannot_see_transactions() {
    let env = setup().await;
    let (_, _, txn_id) = accepted_order(&env, 57).await;
    let stranger = vendor(&env, "eve@example.com", Plan::Trial).await;

    let err = env
        .services
        .transactions
        .complete(&stranger, txn_id, "completed", None)
        .await
        .unwrap_err();
    assert!(matches!(err, VendoraError::NotFound(_)));
    assert!(env.services.transactions.list(&stranger, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn customer_proof_requires_acceptance() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", Plan::Trial).await;
    rate(&env, v.id, "USDT", 1500, 1450).await;
    let pending = env
        .services
        .orders
        .create(
            &v,
            NewOrder {
                asset: "USDT".to_string(),
                order_type: OrderType::Buy,
                amount: Decimal::from(5),
                rate: None,
                customer_chat_id: Some(8),
                customer_name: None,
            },
        )
        .await
        .unwrap();

    let err = env
        .services
        .transactions
        .attach_proof(&pending, "proofs/a.jpg")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("hasn't accepted your order yet"));

    let (accepted, _) = env
        .services
        .orders
        .accept(&v, pending.id, AcceptOrder::default())
        .await
        .unwrap();
    let txn = env
        .services
        .transactions
        .attach_proof(&accepted, "proofs/a.jpg")
        .await
        .unwrap();
    assert_eq!(txn.proof.as_deref(), Some("proofs/a.jpg"));
    assert!(txn.proof_uploaded_at.is_some());
    assert!(env.services.transactions.mark_vendor_notified(txn.id).await.unwrap());
    assert!(!env.services.transactions.mark_vendor_notified(txn.id).await.unwrap());
}
