mod common;

use chrono::{Duration, Utc};
use common::*;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use shared::domain::{PaymentRequestStatus, Plan, QueryStatus};
use shared::services::query_service::QueryPatch;
use shared::services::session_service::SessionRecord;
use shared::VendoraError;

#[tokio::test]
async fn vendor_reply_reaches_the_customer() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", Plan::Trial).await;
    let other = vendor(&env, "bob@example.com", Plan::Trial).await;
    let query = env
        .services
        .queries
        .create_from_bot(Some(v.id), None, 4242, "Is the rate negotiable?")
        .await
        .unwrap();
    env.services
        .queries
        .set_contact(query.id, "@bola", 4242)
        .await
        .unwrap();
    let unread = env.services.notifications.list(v.id, true).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].title, "New customer query");

    let err = env.services.queries.get(other.id, query.id).await.unwrap_err();
    assert!(matches!(err, VendoraError::NotFound(_)));

    let updated = env
        .services
        .queries
        .update(
            v.id,
            query.id,
            QueryPatch {
                reply: Some("Yes, for large volumes.".to_string()),
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, QueryStatus::Replied.as_str());
    assert!(updated.notified_at.is_some());
    let sent = env.telegram.sent_to(4242);
    assert_eq!(sent[0].text, "💬 Reply from the vendor:\n\nYes, for large volumes.");

    assert_eq!(env.services.notifications.mark_read(v.id, None).await.unwrap(), 1);
    assert!(env.services.notifications.list(v.id, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn sessions_persist_and_expire() {
    let env = setup().await;
    let user = env.services.sessions.get_or_create(77).await.unwrap();
    let same = env.services.sessions.get_or_create(77).await.unwrap();
    assert_eq!(user.id, same.id);

    let record = SessionRecord {
        state: Some("awaiting_amount".to_string()),
        temp_type: Some("buy".to_string()),
        temp_asset: Some("USDT".to_string()),
        temp_amount: Some(Decimal::from(5)),
        ..Default::default()
    };
    let saved = env.services.sessions.save(user, record.clone()).await.unwrap();
    assert_eq!(SessionRecord::from_model(&saved), record);
    assert!(!env.services.sessions.is_stale(&saved, Utc::now()));
    assert!(env.services.sessions.is_stale(&saved, Utc::now() + Duration::minutes(61)));

    let mut active = saved.into_active_model();
    active.state_updated_at = Set(Some(Utc::now() - Duration::hours(2)));
    active.update(env.services.db()).await.unwrap();
    assert_eq!(env.services.sessions.reset_stale(Utc::now()).await.unwrap(), 1);
    let cleared = env.services.sessions.find(77).await.unwrap().unwrap();
    assert!(cleared.state.is_none());
    assert!(cleared.temp_asset.is_none());
}

#[tokio::test]
async fn unchanged_session_is_still_touched() {
    let env = setup().await;
    let user = env.services.sessions.get_or_create(78).await.unwrap();
    let record = SessionRecord {
        state: Some("awaiting_amount".to_string()),
        temp_asset: Some("USDT".to_string()),
        ..Default::default()
    };
    let saved = env.services.sessions.save(user, record.clone()).await.unwrap();
    let mut active = saved.into_active_model();
    active.state_updated_at = Set(Some(Utc::now() - Duration::hours(2)));
    let idle = active.update(env.services.db()).await.unwrap();
    assert!(env.services.sessions.is_stale(&idle, Utc::now()));

    // Same state again, e.g. the customer retyped an invalid amount
    let touched = env.services.sessions.save(idle, record).await.unwrap();
    assert!(!env.services.sessions.is_stale(&touched, Utc::now()));
    assert_eq!(env.services.sessions.reset_stale(Utc::now()).await.unwrap(), 0);
}

#[tokio::test]
async fn staff_approval_activates_plan() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", Plan::None).await;
    let admin = staff(vendor(&env, "ops@example.com", Plan::Perpetual).await);
    let request = env
        .services
        .payments
        .create(v.id, Some("Paid via transfer".to_string()), None)
        .await
        .unwrap();
    assert_eq!(request.status, PaymentRequestStatus::Pending.as_str());

    let err = env.services.payments.approve(&v, request.id, None).await.unwrap_err();
    assert!(matches!(err, VendoraError::Forbidden));

    let (request, upgraded) = env.services.payments.approve(&admin, request.id, Some(30)).await.unwrap();
    assert_eq!(request.status, "approved");
    assert_eq!(request.processed_by, Some(admin.id));
    assert_eq!(upgraded.plan(), Plan::Monthly);
    assert!(upgraded.is_service_active);

    let err = env.services.payments.reject(&admin, request.id).await.unwrap_err();
    assert!(matches!(err, VendoraError::InvalidTransition(_)));
    assert_eq!(env.services.payments.list(&v).await.unwrap().len(), 1);
    assert_eq!(env.services.payments.list(&admin).await.unwrap().len(), 1);
}
