//! teloxide-backed [`TelegramClient`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::telegram::WebhookStatus;
use shared::{ButtonKind, Keyboard, OutboundMessage, TelegramClient};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use tracing::warn;
use url::Url;

const SEND_ATTEMPTS: u64 = 3;
const RETRY_BACKOFF_MS: u64 = 1500;

#[derive(Clone)]
pub struct TeloxideClient {
    bot: Bot,
}

fn markup(keyboard: &Keyboard) -> Result<InlineKeyboardMarkup> {
    let mut rows = Vec::with_capacity(keyboard.len());
    for row in keyboard {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            buttons.push(match &button.kind {
                ButtonKind::Callback(data) => InlineKeyboardButton::callback(button.text.clone(), data.clone()),
                ButtonKind::Url(url) => InlineKeyboardButton::url(button.text.clone(), Url::parse(url)?),
            });
        }
        rows.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

impl TeloxideClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    async fn send_text(&self, message: &OutboundMessage) -> Result<()> {
        let mut request = self.bot.send_message(ChatId(message.chat_id), message.text.clone());
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(markup(keyboard)?);
        }
        request.await?;
        Ok(())
    }
}

/// Runs `op` up to `attempts` times, sleeping `backoff * attempt` between
/// failures. Returns the last error when every attempt fails.
async fn with_retries<T, F, Fut>(chat_id: i64, attempts: u64, backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;
    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(chat_id, attempt = attempt + 1, "telegram send failed: {}", e);
                last_error = Some(e);
                if attempt + 1 < attempts {
                    tokio::time::sleep(backoff * (attempt as u32 + 1)).await;
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("telegram send failed")))
}

#[async_trait]
impl TelegramClient for TeloxideClient {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let backoff = Duration::from_millis(RETRY_BACKOFF_MS);
        // A failed attachment upload never resends the text.
        with_retries(message.chat_id, SEND_ATTEMPTS, backoff, || self.send_text(&message)).await?;

        if let Some(path) = &message.document {
            if !path.exists() {
                warn!(chat_id = message.chat_id, "attachment {} is missing", path.display());
                return Ok(());
            }
            let chat = ChatId(message.chat_id);
            with_retries(message.chat_id, SEND_ATTEMPTS, backoff, || {
                let bot = self.bot.clone();
                let file = InputFile::file(path.clone());
                async move {
                    bot.send_document(chat, file).await?;
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await?;
        }
        Ok(())
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<()> {
        let file = self.bot.get_file(FileId(file_id.to_string())).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut out = tokio::fs::File::create(dest).await?;
        self.bot.download_file(&file.path, &mut out).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await?;
        Ok(())
    }

    async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let mut request = self.bot.set_webhook(Url::parse(url)?);
        if let Some(secret) = secret {
            request = request.secret_token(secret.to_string());
        }
        request.await?;
        Ok(())
    }

    async fn webhook_info(&self) -> Result<WebhookStatus> {
        let info = self.bot.get_webhook_info().await?;
        Ok(WebhookStatus {
            url: info.url.map(|u| u.to_string()),
            pending_update_count: info.pending_update_count,
            last_error_message: info.last_error_message,
        })
    }

    async fn bot_username(&self) -> Result<Option<String>> {
        let me = self.bot.get_me().await?;
        Ok(me.user.username.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Button;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn invalid_url_buttons_are_rejected() {
        let keyboard = vec![vec![Button::url("Bad", "not a url")]];
        assert!(markup(&keyboard).is_err());
        let keyboard = vec![vec![Button::callback("Buy", "buy"), Button::url("Chat", "https://t.me/ada")]];
        assert_eq!(markup(&keyboard).unwrap().inline_keyboard[0].len(), 2);
    }

    #[tokio::test]
    async fn retries_stop_at_first_success() {
        let counter = AtomicU64::new(0);
        let calls = &counter;
        let value = with_retries(1, SEND_ATTEMPTS, Duration::ZERO, || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow!("timed out"))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_give_up_with_last_error() {
        let counter = AtomicU64::new(0);
        let calls = &counter;
        let err = with_retries(1, SEND_ATTEMPTS, Duration::ZERO, || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(anyhow!("attempt {}", n + 1))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "attempt 3");
        assert_eq!(calls.load(Ordering::SeqCst), SEND_ATTEMPTS);
    }
}
