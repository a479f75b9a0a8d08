use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

pub async fn get_db_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database via Sea-ORM at: {}", redact(database_url));
    let mut opts = ConnectOptions::new(database_url.to_string());
    opts.connect_timeout(Duration::from_secs(10)).sqlx_logging(false);
    // SQLite stays on the driver's single connection so in-memory databases are shared
    if !database_url.starts_with("sqlite") {
        opts.max_connections(20);
    }
    let db = Database::connect(opts).await?;
    Ok(db)
}

/// Hides the password part of a connection URL for logging.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let creds = &url[scheme + 3..at];
            match creds.find(':') {
                Some(colon) => format!("{}{}:***{}", &url[..scheme + 3], &creds[..colon], &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
