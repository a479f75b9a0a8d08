use anyhow::Result;
use bot::{AppState, Inbound, Router, TeloxideClient};
use shared::{get_db_connection, Cache, Config, ServiceContext, Services, TelegramClient};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

async fn handle_update(update: Update, router: Router) -> Result<()> {
    let Some(inbound) = Inbound::from_update(&update) else {
        tracing::debug!("ignoring unsupported update");
        return Ok(());
    };
    if let Err(e) = router.handle(inbound).await {
        tracing::error!("failed to handle update: {:#}", e);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting Vendora bot...");

    let config = Config::from_env()?;
    let token = config
        .bot_token
        .clone()
        .ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN is not set"))?;

    let bot = Bot::new(token);
    let client = Arc::new(TeloxideClient::new(bot.clone()));
    let username = match client.bot_username().await {
        Ok(username) => username,
        Err(e) => {
            tracing::warn!("could not look up the bot username: {}", e);
            None
        }
    };

    let db = get_db_connection(&config.database_url).await?;
    let cache = Cache::from_url(config.redis_url.as_deref())?;
    let ctx = ServiceContext {
        db: Arc::new(db),
        config: Arc::new(config),
        telegram: client,
        cache: Arc::new(cache),
    };
    let state = Arc::new(AppState::new(Services::new(ctx)).with_username(username));
    let router = Router::new(state);
    tracing::info!("AppState initialized");

    // Long polling; deployments that use the API's webhook endpoint do not run this binary
    let mut dispatcher = Dispatcher::builder(bot, dptree::entry().endpoint(handle_update))
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build();

    tracing::info!("Bot is running and waiting for updates...");
    dispatcher.dispatch().await;

    Ok(())
}
