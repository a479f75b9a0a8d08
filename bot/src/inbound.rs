use serde_json::Value;

/// A Telegram update reduced to what the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: i64,
    pub from_name: Option<String>,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    File { file_id: String, file_name: Option<String> },
    Callback { id: String, data: String },
}

fn as_chat_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn sender_name(from: Option<&Value>) -> Option<String> {
    let from = from?;
    from.get("username")
        .and_then(Value::as_str)
        .map(|u| format!("@{}", u))
        .or_else(|| {
            let first = from.get("first_name").and_then(Value::as_str)?;
            match from.get("last_name").and_then(Value::as_str) {
                Some(last) => Some(format!("{} {}", first, last)),
                None => Some(first.to_string()),
            }
        })
}

impl Inbound {
    /// Parses a raw Bot API update. Updates the bot does not handle
    /// (edited messages, stickers, channel posts...) yield `None`.
    pub fn from_json(update: &Value) -> Option<Inbound> {
        if let Some(query) = update.get("callback_query") {
            let chat_id = query
                .get("message")
                .and_then(|m| m.get("chat"))
                .and_then(|c| c.get("id"))
                .and_then(as_chat_id)
                .or_else(|| query.get("from").and_then(|f| f.get("id")).and_then(as_chat_id))?;
            let data = query.get("data").and_then(Value::as_str)?.to_string();
            let id = match query.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return Some(Inbound {
                chat_id,
                from_name: sender_name(query.get("from")),
                kind: InboundKind::Callback { id, data },
            });
        }

        let message = update.get("message")?;
        let chat_id = message.get("chat").and_then(|c| c.get("id")).and_then(as_chat_id)?;
        let from_name = sender_name(message.get("from"));

        // Telegram sends every size of a photo; the last one is the largest.
        let photo = message
            .get("photo")
            .and_then(Value::as_array)
            .and_then(|sizes| sizes.last())
            .and_then(|p| p.get("file_id"))
            .and_then(Value::as_str)
            .map(|id| (id.to_string(), None));
        let document = message.get("document").and_then(|d| {
            let id = d.get("file_id").and_then(Value::as_str)?;
            let name = d.get("file_name").and_then(Value::as_str).map(str::to_string);
            Some((id.to_string(), name))
        });
        if let Some((file_id, file_name)) = photo.or(document) {
            return Some(Inbound {
                chat_id,
                from_name,
                kind: InboundKind::File { file_id, file_name },
            });
        }

        let text = message.get("text").and_then(Value::as_str)?.trim().to_string();
        Some(Inbound {
            chat_id,
            from_name,
            kind: InboundKind::Text(text),
        })
    }

    /// Converts a teloxide update received by long polling. Goes through
    /// the Bot API JSON so both entry points share one parser.
    pub fn from_update(update: &teloxide::types::Update) -> Option<Inbound> {
        match serde_json::to_value(update) {
            Ok(value) => Self::from_json(&value),
            Err(e) => {
                tracing::warn!("could not serialise update: {}", e);
                None
            }
        }
    }
}
