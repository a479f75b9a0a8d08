//! Application state shared across handlers

use axum::extract::FromRef;
use shared::entity::payment_requests;
use shared::{Config, Services};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

const PAYMENT_EVENT_BUFFER: usize = 64;

/// Payment request status change pushed to websocket subscribers.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub kind: &'static str,
    pub request: payment_requests::Model,
}

/// In-process fan-out of payment request events.
#[derive(Clone)]
pub struct PaymentEvents {
    sender: broadcast::Sender<PaymentEvent>,
}

impl PaymentEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PAYMENT_EVENT_BUFFER);
        Self { sender }
    }

    pub fn publish(&self, kind: &'static str, request: payment_requests::Model) {
        // No subscribers is fine
        let _ = self.sender.send(PaymentEvent { kind, request });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
        self.sender.subscribe()
    }
}

impl Default for PaymentEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-local counters for the metrics endpoint.
pub struct Metrics {
    started_at: Instant,
    throttled: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            throttled: AtomicU64::new(0),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn record_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn throttled_total(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub bot: bot::Router,
    pub events: PaymentEvents,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(services: Services, bot_username: Option<String>) -> Self {
        let bot_state = bot::AppState::new(services.clone()).with_username(bot_username);
        Self {
            bot: bot::Router::new(Arc::new(bot_state)),
            services,
            events: PaymentEvents::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn config(&self) -> &Config {
        self.services.config()
    }
}

impl FromRef<AppState> for Services {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.services.clone()
    }
}

impl FromRef<AppState> for PaymentEvents {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.events.clone()
    }
}
