mod common;

use common::*;
use rust_decimal::Decimal;
use shared::domain::OrderType;
use shared::models::NewOrder;

#[tokio::test]
async fn order_status_is_found_by_code() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    rate(&env, v.id, "USDT", 1500, 1450).await;
    link(&env, &v).await;
    let order = env
        .services
        .orders
        .create(
            &v,
            NewOrder {
                asset: "USDT".to_string(),
                order_type: OrderType::Buy,
                amount: Decimal::from(10),
                rate: None,
                customer_chat_id: Some(CHAT),
                customer_name: None,
            },
        )
        .await
        .unwrap();

    let prompt = press(&env, "check_order").await;
    assert!(prompt.text.starts_with("Please enter your Order ID or Code"));
    let status = say(&env, &order.order_code.to_lowercase()).await;

    assert!(status.text.starts_with(&format!("📦 Order: {}", order.order_code)), "{}", status.text);
    assert!(status.text.contains("Status: pending"));
    assert!(status.text.contains("Total: ₦15,000.00"));
    assert_eq!(session(&env).await.state, None);

    press(&env, "check_order").await;
    let missing = say(&env, "ORD-01-01012020-99-001").await;
    assert_eq!(missing.text, "Order not found. Please check the ID/Code and try again.");
}

#[tokio::test]
async fn question_and_contact_reach_the_vendor() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    link(&env, &v).await;

    press(&env, "general_question").await;
    let ask = say(&env, "Do you sell BTC?").await;
    assert!(ask.text.starts_with("Thanks! Please share your contact"));
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_contact"));

    let done = say(&env, "@bola").await;
    assert!(done.text.starts_with("✅ Got it!"));

    let queries = env.services.queries.list(v.id, None).await.unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].message, "Do you sell BTC?");
    assert_eq!(queries[0].contact.as_deref(), Some("@bola"));
    assert_eq!(queries[0].customer_chat_id, Some(CHAT));
    let notices = env.services.notifications.list(v.id, false).await.unwrap();
    assert!(notices.iter().any(|n| n.title == "New customer query"));
    let user = session(&env).await;
    assert_eq!(user.state, None);
    assert_eq!(user.temp_query_id, None);
}

#[tokio::test]
async fn query_command_with_text_skips_the_question_prompt() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    link(&env, &v).await;

    let reply = say(&env, "/query When do you open?").await;

    assert!(reply.text.starts_with("Thanks! Please share your contact"));
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_contact"));
}

#[tokio::test]
async fn rate_and_assets_commands() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    rate(&env, v.id, "USDT", 1500, 1450).await;
    rate(&env, v.id, "BTC", 90_000_000, 89_000_000).await;

    assert_eq!(say(&env, "/rate").await.text, "Usage: /rate ASSET_SYMBOL");
    assert_eq!(say(&env, "/rate doge").await.text, "No rate found for DOGE.");
    assert_eq!(
        say(&env, "/rate usdt").await.text,
        "USDT rates:\nAda: Buy ₦1,500.00 | Sell ₦1,450.00"
    );
    assert_eq!(say(&env, "/assets").await.text, "Available assets:\nBTC\nUSDT");
    assert_eq!(say(&env, "/status").await.text, "Bot is running and connected to Vendora PWA!");
}

#[tokio::test]
async fn cancel_clears_the_conversation() {
    let env = setup().await;
    press(&env, "general_question").await;

    let reply = say(&env, "/cancel").await;

    assert!(reply.text.starts_with("Cancelled."));
    assert_eq!(session(&env).await.state, None);
}
