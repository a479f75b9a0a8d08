//! Operator tasks that run outside the API process, usually from cron.

use anyhow::Result;
use bot::TeloxideClient;
use chrono::Utc;
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use shared::{get_db_connection, Cache, Config, LoggingTelegram, ServiceContext, Services, TelegramClient};
use std::sync::Arc;
use teloxide::Bot;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vendora-tasks", version, about = "Vendora maintenance tasks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Expire pending orders past their auto-expire time
    ExpireOrders {
        /// Only sweep this vendor's orders
        #[arg(long)]
        vendor: Option<i32>,
    },
    /// Move vendors whose paid plan has lapsed back to the free plan
    ExpirePlans,
    /// Switch off service for lapsed trials and paid plans
    ExpireLicenses,
    /// Send trial and subscription reminders
    SendAccountNotices,
    /// Give every vendor without an external id a fresh one
    BackfillVendorIds {
        #[arg(long)]
        dry_run: bool,
    },
    /// Reset bot conversations that have been idle too long
    ResetStaleSessions,
    /// Print the bot identity and webhook state
    TelegramDiag,
}

async fn services(config: Config) -> Result<Services> {
    let db = get_db_connection(&config.database_url).await?;
    let telegram: Arc<dyn TelegramClient> = match config.bot_token.clone() {
        Some(token) => Arc::new(TeloxideClient::new(Bot::new(token))),
        None => Arc::new(LoggingTelegram),
    };
    let cache = Cache::from_url(config.redis_url.as_deref())?;
    Ok(Services::new(ServiceContext {
        db: Arc::new(db),
        config: Arc::new(config),
        telegram,
        cache: Arc::new(cache),
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Migrate => {
            let db = get_db_connection(&config.database_url).await?;
            Migrator::up(&db, None).await?;
            println!("Migrations applied");
        }
        Command::ExpireOrders { vendor } => {
            let services = services(config).await?;
            let report = services.orders.expire_overdue(vendor, Utc::now()).await?;
            println!("Expired {} orders, notified {} customers", report.expired, report.notified);
        }
        Command::ExpirePlans => {
            let services = services(config).await?;
            let n = services.vendors.expire_plans(Utc::now()).await?;
            println!("Moved {} vendors to the free plan", n);
        }
        Command::ExpireLicenses => {
            let services = services(config).await?;
            let now = Utc::now();
            let trials = services.vendors.expire_trials(now).await?;
            let subs = services.vendors.expire_plans(now).await?;
            println!("Expired: trials={}, subs={}", trials, subs);
        }
        Command::SendAccountNotices => {
            let services = services(config).await?;
            let n = services.notices.send_account_notices(Utc::now()).await?;
            println!("Sent {} account notices", n);
        }
        Command::BackfillVendorIds { dry_run } => {
            let services = services(config).await?;
            let assigned = services.vendors.backfill_external_ids(dry_run).await?;
            for (id, external_id) in &assigned {
                println!("  vendor {:<8} {}", id, external_id);
            }
            if dry_run {
                println!("Would assign {} external ids (dry run)", assigned.len());
            } else {
                println!("Assigned {} external ids", assigned.len());
            }
        }
        Command::ResetStaleSessions => {
            let services = services(config).await?;
            let n = services.sessions.reset_stale(Utc::now()).await?;
            println!("Reset {} stale bot sessions", n);
        }
        Command::TelegramDiag => {
            if config.bot_token.is_none() {
                anyhow::bail!("TELEGRAM_BOT_TOKEN is not set");
            }
            let services = services(config).await?;
            let telegram = services.telegram();
            let username = telegram.bot_username().await?;
            println!("Bot: @{}", username.as_deref().unwrap_or("<unknown>"));
            let info = telegram.webhook_info().await?;
            println!("Webhook url: {}", info.url.as_deref().unwrap_or("<not set>"));
            println!("Pending updates: {}", info.pending_update_count);
            if let Some(error) = info.last_error_message {
                println!("Last error: {}", error);
            }
        }
    }

    Ok(())
}
