//! Outbound Telegram seam.
//!
//! Services talk to Telegram only through [`TelegramClient`]; the bot crate
//! provides the teloxide-backed implementation.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKind {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub kind: ButtonKind,
}

impl Button {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ButtonKind::Callback(data.into()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ButtonKind::Url(url.into()),
        }
    }
}

/// Inline keyboard as rows of buttons.
pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub document: Option<PathBuf>,
}

impl OutboundMessage {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
            document: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        if !keyboard.is_empty() {
            self.keyboard = Some(keyboard);
        }
        self
    }

    pub fn with_document(mut self, path: PathBuf) -> Self {
        self.document = Some(path);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct WebhookStatus {
    pub url: Option<String>,
    pub pending_update_count: u32,
    pub last_error_message: Option<String>,
}

#[async_trait]
pub trait TelegramClient: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;

    /// Downloads a file by its Telegram file id into `dest`.
    async fn download(&self, file_id: &str, dest: &std::path::Path) -> anyhow::Result<()>;

    async fn answer_callback(&self, _callback_id: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn set_webhook(&self, url: &str, secret: Option<&str>) -> anyhow::Result<()>;

    async fn webhook_info(&self) -> anyhow::Result<WebhookStatus>;

    async fn bot_username(&self) -> anyhow::Result<Option<String>>;
}

/// Sends a notification, logging and swallowing any failure.
pub async fn send_best_effort(client: &dyn TelegramClient, message: OutboundMessage) -> bool {
    let chat_id = message.chat_id;
    match client.send(message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(chat_id, "telegram notification failed: {}", e);
            false
        }
    }
}

/// Logs outbound messages and drops them. Used when no bot token is
/// configured; nothing is retained.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTelegram;

#[async_trait]
impl TelegramClient for LoggingTelegram {
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        tracing::info!(chat_id = message.chat_id, "telegram disabled, dropping message");
        Ok(())
    }

    async fn download(&self, file_id: &str, _dest: &std::path::Path) -> anyhow::Result<()> {
        anyhow::bail!("telegram disabled, cannot download {}", file_id)
    }

    async fn set_webhook(&self, url: &str, _secret: Option<&str>) -> anyhow::Result<()> {
        tracing::info!("webhook not set (no bot token): {}", url);
        Ok(())
    }

    async fn webhook_info(&self) -> anyhow::Result<WebhookStatus> {
        Ok(WebhookStatus::default())
    }

    async fn bot_username(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Keeps outbound messages in memory instead of sending them, for tests.
#[derive(Default)]
pub struct RecordingTelegram {
    sent: Mutex<Vec<OutboundMessage>>,
    downloads: Mutex<Vec<String>>,
}

impl RecordingTelegram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutboundMessage> {
        self.sent().into_iter().filter(|m| m.chat_id == chat_id).collect()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl TelegramClient for RecordingTelegram {
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        tracing::debug!(chat_id = message.chat_id, "telegram message recorded");
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }

    async fn download(&self, file_id: &str, dest: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, file_id.as_bytes()).await?;
        if let Ok(mut downloads) = self.downloads.lock() {
            downloads.push(file_id.to_string());
        }
        Ok(())
    }

    async fn set_webhook(&self, url: &str, _secret: Option<&str>) -> anyhow::Result<()> {
        tracing::info!("webhook not set (no bot token): {}", url);
        Ok(())
    }

    async fn webhook_info(&self) -> anyhow::Result<WebhookStatus> {
        Ok(WebhookStatus::default())
    }

    async fn bot_username(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
