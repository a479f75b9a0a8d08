use axum::Router;

use crate::state::AppState;

pub mod accounts;
pub mod notifications;
pub mod orders;
pub mod queries;
pub mod rates;
pub mod stream;
pub mod system;
pub mod telegram;
pub mod transactions;
pub mod ws;

/// Every `/api/v1` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(accounts::routes())
        .merge(orders::routes())
        .merge(transactions::routes())
        .merge(rates::routes())
        .merge(queries::routes())
        .merge(notifications::routes())
        .merge(stream::routes())
        .merge(ws::routes())
        .merge(telegram::routes())
        .merge(system::routes())
}
