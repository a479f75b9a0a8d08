use anyhow::Result;
use api::{app, worker, AppState};
use bot::TeloxideClient;
use shared::{get_db_connection, Cache, Config, LoggingTelegram, ServiceContext, Services, TelegramClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .init();

    info!("Starting Vendora API server {}...", api::routes::system::version());

    let config = Config::from_env()?;
    let db = get_db_connection(&config.database_url).await?;
    info!("Connected to database");

    let telegram: Arc<dyn TelegramClient> = match config.bot_token.clone() {
        Some(token) => Arc::new(TeloxideClient::new(Bot::new(token))),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN is not set, customer messages will be dropped");
            Arc::new(LoggingTelegram)
        }
    };
    let username = match config.bot_username.clone() {
        Some(username) => Some(username),
        None => telegram.bot_username().await.unwrap_or_else(|e| {
            tracing::warn!("could not look up the bot username: {}", e);
            None
        }),
    };

    let bind = config.api_bind.clone();
    let sweep_every = Duration::from_secs(config.expiry_sweep_seconds.max(1));
    let cache = Cache::from_url(config.redis_url.as_deref())?;
    let ctx = ServiceContext {
        db: Arc::new(db),
        config: Arc::new(config),
        telegram,
        cache: Arc::new(cache),
    };
    let services = Services::new(ctx);
    let state = AppState::new(services.clone(), username);

    let _expiry = worker::start_expiry_worker(services, sweep_every);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("API server listening on http://{}", bind);

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
