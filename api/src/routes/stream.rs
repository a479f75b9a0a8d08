//! Server-sent change markers for the vendor dashboard.
//!
//! The stream emits a `snapshot` event with the latest order/transaction
//! modification times, then polls and re-emits only when they move. It
//! closes after `SSE_WINDOW_SECONDS` and the browser reconnects.

use axum::extract::State;
use axum::http::header::{HeaderName, CACHE_CONTROL};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::time::Instant;

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/stream/", get(stream_changes))
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub orders_updated_at: Option<DateTime<Utc>>,
    pub transactions_updated_at: Option<DateTime<Utc>>,
}

async fn snapshot(state: &AppState, vendor_id: i32) -> ApiResult<Snapshot> {
    let (orders_updated_at, transactions_updated_at) = state.services.orders.change_markers(vendor_id).await?;
    Ok(Snapshot {
        orders_updated_at,
        transactions_updated_at,
    })
}

fn snapshot_event(snapshot: &Snapshot) -> Event {
    Event::default()
        .event("snapshot")
        .id(Utc::now().timestamp().to_string())
        .data(serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string()))
}

struct Cursor {
    state: AppState,
    vendor_id: i32,
    last: Snapshot,
    unsent: bool,
    deadline: Instant,
    poll: Duration,
}

fn changes(cursor: Cursor) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(cursor, |mut cursor| async move {
        if cursor.unsent {
            cursor.unsent = false;
            let event = snapshot_event(&cursor.last);
            return Some((Ok(event), cursor));
        }
        loop {
            if Instant::now() >= cursor.deadline {
                tracing::debug!(vendor_id = cursor.vendor_id, "change stream window closed");
                return None;
            }
            tokio::time::sleep(cursor.poll).await;
            match snapshot(&cursor.state, cursor.vendor_id).await {
                Ok(current) if current != cursor.last => {
                    let event = snapshot_event(&current);
                    cursor.last = current;
                    return Some((Ok(event), cursor));
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(vendor_id = cursor.vendor_id, "change stream poll failed: {}", e);
                    return None;
                }
            }
        }
    })
}

async fn stream_changes(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<StreamParams>,
) -> ApiResult<impl IntoResponse> {
    let token = params.token.ok_or_else(ApiError::unauthorized)?;
    let vendor = auth::authenticate(&state, &token).await?;
    let initial = snapshot(&state, vendor.id).await?;

    let poll = Duration::from_secs(state.config().sse_poll_interval.max(1));
    let window = Duration::from_secs(state.config().sse_window_seconds);
    let cursor = Cursor {
        vendor_id: vendor.id,
        last: initial,
        unsent: true,
        deadline: Instant::now() + window,
        poll,
        state,
    };
    let headers = [
        (CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(changes(cursor)).keep_alive(KeepAlive::new().interval(poll))))
}
