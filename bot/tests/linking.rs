mod common;

use chrono::{Duration, Utc};
use common::*;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

#[tokio::test]
async fn deep_link_links_chat_and_shows_menu() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;

    let reply = say(&env, &format!("/start vendor_{}", v.id)).await;

    assert!(reply.text.starts_with("Welcome to Vendora, your Ada's bot!"), "{}", reply.text);
    assert!(callbacks(&reply).contains(&"buy".to_string()));
    let user = session(&env).await;
    assert_eq!(user.vendor_id, Some(v.id));
    assert!(user.is_subscribed);
    assert_eq!(user.state, None);
}

#[tokio::test]
async fn start_without_vendor_asks_then_links_by_name() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;

    let reply = say(&env, "/start").await;
    assert!(reply.text.starts_with("Please send the vendor's username"));
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_vendor"));

    let reply = say(&env, "nobody").await;
    assert!(reply.text.starts_with("Couldn't find that vendor"));
    assert_eq!(session(&env).await.state.as_deref(), Some("awaiting_vendor"));

    let reply = say(&env, "Ada").await;
    assert_eq!(reply.text, "Linked to vendor successfully. Use /help to see available commands.");
    let user = session(&env).await;
    assert_eq!(user.vendor_id, Some(v.id));
    assert_eq!(user.state, None);
}

#[tokio::test]
async fn switch_vendor_relinks_the_chat() {
    let env = setup().await;
    let ada = vendor(&env, "ada@example.com", "Ada").await;
    let kemi = vendor(&env, "kemi@example.com", "Kemi").await;
    link(&env, &ada).await;

    say(&env, "/switch_vendor").await;
    say(&env, &kemi.id.to_string()).await;

    assert_eq!(session(&env).await.vendor_id, Some(kemi.id));
}

#[tokio::test]
async fn deep_link_to_expired_trial_is_refused() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    update_vendor(&env, v.clone(), |a| a.trial_expires_at = Set(Some(Utc::now() - Duration::hours(1)))).await;

    let reply = say(&env, &format!("/start vendor_{}", v.id)).await;

    assert_eq!(reply.text, "Vendor trial expired. Please contact the vendor.");
    assert_eq!(session(&env).await.vendor_id, None);
}

#[tokio::test]
async fn help_names_the_vendor_and_lists_commands() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    link(&env, &v).await;

    let reply = say(&env, "/help").await;

    assert!(reply.text.starts_with("You're chatting with Ada's Vendora bot."));
    assert!(reply.text.contains("/switch_vendor"));
    assert!(reply.text.contains("/rate"));
}

#[tokio::test]
async fn abandoned_sessions_start_over() {
    let env = setup().await;
    let v = vendor(&env, "ada@example.com", "Ada").await;
    link(&env, &v).await;
    press(&env, "cont_USDT_buy").await;

    let mut active = session(&env).await.into_active_model();
    active.state_updated_at = Set(Some(Utc::now() - Duration::hours(2)));
    active.update(env.services.db()).await.unwrap();

    let reply = say(&env, "100").await;

    assert_eq!(reply.text, "I received your message. Use /help to see commands.");
    let user = session(&env).await;
    assert_eq!(user.state, None);
    assert_eq!(user.temp_asset, None);
}

#[tokio::test]
async fn files_outside_the_proof_step_are_not_stored() {
    let env = setup().await;

    let reply = upload(&env, "file-9", "photo.jpg").await;

    assert!(reply.text.starts_with("Thanks for the file."));
    assert!(env.telegram.downloads().is_empty());
}

#[tokio::test]
async fn unknown_buttons_get_a_gentle_answer() {
    let env = setup().await;
    let reply = press(&env, "lang_select_vi").await;
    assert_eq!(reply.text, "Unknown action. Please try again.");
}
