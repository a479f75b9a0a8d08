use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::redis::Cache;
use crate::telegram::TelegramClient;

pub mod broadcast_service;
pub mod notice_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod query_service;
pub mod rate_service;
pub mod session_service;
pub mod transaction_service;
pub mod vendor_service;

pub use broadcast_service::BroadcastService;
pub use notice_service::AccountNoticeService;
pub use notification_service::NotificationService;
pub use order_service::OrderService;
pub use payment_service::PaymentService;
pub use query_service::QueryService;
pub use rate_service::RateService;
pub use session_service::SessionService;
pub use transaction_service::TransactionService;
pub use vendor_service::VendorService;

/// Handles shared by every service.
#[derive(Clone)]
pub struct ServiceContext {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub telegram: Arc<dyn TelegramClient>,
    pub cache: Arc<Cache>,
}

#[derive(Clone)]
pub struct Services {
    pub ctx: ServiceContext,
    pub vendors: Arc<VendorService>,
    pub rates: Arc<RateService>,
    pub orders: Arc<OrderService>,
    pub transactions: Arc<TransactionService>,
    pub sessions: Arc<SessionService>,
    pub queries: Arc<QueryService>,
    pub notifications: Arc<NotificationService>,
    pub payments: Arc<PaymentService>,
    pub notices: Arc<AccountNoticeService>,
    pub broadcasts: Arc<BroadcastService>,
}

impl Services {
    pub fn new(ctx: ServiceContext) -> Self {
        let notifications = Arc::new(NotificationService::new(ctx.clone()));
        let vendors = Arc::new(VendorService::new(ctx.clone()));
        let transactions = Arc::new(TransactionService::new(ctx.clone(), notifications.clone()));
        let orders = Arc::new(OrderService::new(
            ctx.clone(),
            vendors.clone(),
            transactions.clone(),
            notifications.clone(),
        ));
        Self {
            rates: Arc::new(RateService::new(ctx.clone())),
            sessions: Arc::new(SessionService::new(ctx.clone())),
            queries: Arc::new(QueryService::new(ctx.clone(), notifications.clone())),
            payments: Arc::new(PaymentService::new(ctx.clone(), vendors.clone(), notifications.clone())),
            notices: Arc::new(AccountNoticeService::new(ctx.clone(), notifications.clone())),
            broadcasts: Arc::new(BroadcastService::new(ctx.clone())),
            vendors,
            transactions,
            orders,
            notifications,
            ctx,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.ctx.db.as_ref()
    }

    pub fn config(&self) -> &Config {
        self.ctx.config.as_ref()
    }

    pub fn telegram(&self) -> &dyn TelegramClient {
        self.ctx.telegram.as_ref()
    }
}
