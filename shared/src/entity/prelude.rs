//! `SeaORM` Entity, @generated manually

pub use super::bank_details::Entity as BankDetails;
pub use super::bot_users::Entity as BotUsers;
pub use super::broadcast_messages::Entity as BroadcastMessages;
pub use super::notification_logs::Entity as NotificationLogs;
pub use super::notifications::Entity as Notifications;
pub use super::orders::Entity as Orders;
pub use super::payment_requests::Entity as PaymentRequests;
pub use super::push_subscriptions::Entity as PushSubscriptions;
pub use super::queries::Entity as Queries;
pub use super::rates::Entity as Rates;
pub use super::transactions::Entity as Transactions;
pub use super::vendors::Entity as Vendors;
