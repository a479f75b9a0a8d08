mod common;

use common::*;
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, Set};
use shared::entity::{orders, transactions};
use shared::models::AcceptOrder;

async fn only_order(env: &BotEnv) -> orders::Model {
    let mut all = orders::Entity::find().all(env.services.db()).await.unwrap();
    assert_eq!(all.len(), 1);
    all.remove(0)
}

#[tokio::test]
async fn buy_flow_places_a_pending_order() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    rate(&env, v.id, "USDT", 1500, 1450).await;
    link(&env, &v).await;

    let menu = press(&env, "buy").await;
    assert_eq!(menu.text, "What would you like to buy from Ada? Select an asset:");
    assert!(callbacks(&menu).contains(&"asset_buy_USDT".to_string()));

    let view = press(&env, "asset_buy_USDT").await;
    assert!(view.text.contains("Buy Rate: ₦1,500.00 per USDT"), "{}", view.text);
    assert!(view.text.contains("Bank Details:\nZenith 0123456789"));
    assert!(callbacks(&view).contains(&"cont_USDT_buy".to_string()));

    let prompt = press(&env, "cont_USDT_buy").await;
    assert_eq!(prompt.text, "Please enter the amount you want to buy for USDT.");
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_amount"));

    let retry = say(&env, "lots").await;
    assert_eq!(retry.text, "❌ Invalid amount. Please try again.");
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_amount"));

    let preview = say(&env, "100").await;
    assert!(preview.text.contains("Total: ₦150,000.00"), "{}", preview.text);
    let confirm = format!("confirm_USDT_buy_100_{}", v.id);
    assert!(callbacks(&preview).contains(&confirm));
    let user = session(&env).await;
    assert_eq!(user.state, None);
    assert_eq!(user.temp_amount, Some(Decimal::from(100)));

    let done = press(&env, &confirm).await;
    let order = only_order(&env).await;
    assert_eq!(
        done.text,
        format!(
            "Thanks! Your order with Order ID: {} has been created and is pending acceptance from the vendor. You'll be notified when it's accepted.",
            order.order_code
        )
    );
    assert_eq!(order.status, "pending");
    assert_eq!(order.customer_chat_id, Some(CHAT));
    assert_eq!(order.customer_name.as_deref(), Some("Bola"));
    assert_eq!(session(&env).await.temp_order_id, Some(order.id));
}

#[tokio::test]
async fn auto_accept_vendor_sends_customer_to_proof() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    let v = update_vendor(&env, v, |a| a.auto_accept = Set(true)).await;
    rate(&env, v.id, "USDT", 1500, 1450).await;

    let reply = press(&env, &format!("confirm_USDT_sell_20_{}", v.id)).await;

    assert!(reply.text.contains("accepted automatically"), "{}", reply.text);
    let order = only_order(&env).await;
    assert_eq!(order.status, "accepted");
    let user = session(&env).await;
    assert_eq!(user.state.as_deref(), Some("awaiting_proof"));
    assert_eq!(user.temp_order_id, Some(order.id));
    assert_eq!(user.vendor_id, Some(v.id));
}

#[tokio::test]
async fn unavailable_vendor_takes_no_orders() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    let v = update_vendor(&env, v, |a| {
        a.is_available = Set(false);
        a.unavailable_message = Set(Some("Back at 6pm".to_string()));
    })
    .await;
    rate(&env, v.id, "USDT", 1500, 1450).await;

    let reply = press(&env, &format!("confirm_USDT_buy_100_{}", v.id)).await;

    assert_eq!(reply.text, "Back at 6pm");
    assert!(orders::Entity::find().all(env.services.db()).await.unwrap().is_empty());
}

#[tokio::test]
async fn proof_receiving_details_and_note_reach_the_transaction() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    rate(&env, v.id, "USDT", 1500, 1450).await;
    link(&env, &v).await;
    press(&env, &format!("confirm_USDT_buy_100_{}", v.id)).await;
    let order = only_order(&env).await;

    let early = press(&env, &format!("cont_upload_{}", order.id)).await;
    assert!(early.text.contains("hasn't accepted your order yet"));
    assert_eq!(session(&env).await.state, None);

    env.services.orders.accept(&v, order.id, AcceptOrder::default()).await.unwrap();

    let prompt = press(&env, &format!("cont_upload_{}", order.id)).await;
    assert!(prompt.text.starts_with("Ada has accepted your order."), "{}", prompt.text);
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_proof"));

    let stored = upload(&env, "file-1", "receipt.png").await;
    assert!(stored.text.starts_with(&format!("✅ Proof received for Order ID: {}.", order.order_code)));
    assert_eq!(env.telegram.downloads(), vec!["file-1".to_string()]);

    let asked = say(&env, "GTBank 0123456789").await;
    assert!(asked.text.starts_with("Got it."));
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_note"));

    let thanks = say(&env, "skip").await;
    assert!(thanks.text.starts_with("✅ Thanks! Your transaction details have been sent"));

    let txn = transactions::Entity::find().one(env.services.db()).await.unwrap().unwrap();
    assert!(txn.proof.as_deref().is_some_and(|p| p.starts_with("proofs/") && p.ends_with(".png")));
    assert_eq!(txn.customer_receiving_details.as_deref(), Some("GTBank 0123456789"));
    assert_eq!(txn.customer_note, None);
    assert!(!txn.vendor_notified);
    let user = session(&env).await;
    assert_eq!(user.state, None);
    assert_eq!(user.temp_order_id, None);
}

#[tokio::test]
async fn auto_accept_vendor_hears_about_finished_details_once() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    let v = update_vendor(&env, v, |a| a.auto_accept = Set(true)).await;
    rate(&env, v.id, "USDT", 1500, 1450).await;
    press(&env, &format!("confirm_USDT_buy_50_{}", v.id)).await;
    upload(&env, "file-2", "proof.jpg").await;

    say(&env, "0xCustomerWallet").await;
    say(&env, "Please send fast").await;

    let txn = transactions::Entity::find().one(env.services.db()).await.unwrap().unwrap();
    assert!(txn.vendor_notified);
    assert_eq!(txn.customer_note.as_deref(), Some("Please send fast"));
    let notices = env.services.notifications.list(v.id, false).await.unwrap();
    assert_eq!(notices.iter().filter(|n| n.title == "Uncompleted transaction").count(), 1);
}

#[tokio::test]
async fn cancelling_amount_entry_returns_to_menu() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    link(&env, &v).await;
    press(&env, "cont_BTC_sell").await;

    let reply = press(&env, "cancel_amount").await;

    assert!(callbacks(&reply).contains(&"buy".to_string()));
    let user = session(&env).await;
    assert_eq!(user.state, None);
    assert_eq!(user.temp_asset, None);
}
