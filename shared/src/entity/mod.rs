//! `SeaORM` Entity, @generated manually

pub mod prelude;

pub mod bank_details;
pub mod bot_users;
pub mod broadcast_messages;
pub mod notification_logs;
pub mod notifications;
pub mod orders;
pub mod payment_requests;
pub mod push_subscriptions;
pub mod queries;
pub mod rates;
pub mod transactions;
pub mod vendors;
