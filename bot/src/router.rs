use anyhow::Result;
use chrono::Utc;
use shared::telegram::send_best_effort;
use std::time::Instant;
use tracing::{error, info};

use crate::commands::{self, Reply};
use crate::inbound::{Inbound, InboundKind};
use crate::state::{Session, SharedState};

/// Runs one update through the conversation: loads the chat's session,
/// handles the update, persists the session and sends the reply.
///
/// Both long polling and the API's webhook endpoint feed this.
#[derive(Clone)]
pub struct Router {
    state: SharedState,
}

impl Router {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub async fn handle(&self, inbound: Inbound) -> Result<()> {
        let start_time = Instant::now();
        let app = self.state.as_ref();
        let services = &app.services;
        let chat_id = inbound.chat_id;

        let user = services.sessions.get_or_create(chat_id).await?;
        let stale = services.sessions.is_stale(&user, Utc::now());
        let mut session = Session::load(user);
        if stale {
            info!(chat_id, "session expired in state {:?}", session.state);
            session.clear();
        }

        let outcome = match &inbound.kind {
            InboundKind::Text(text) => commands::handle_text(app, &mut session, text).await,
            InboundKind::File { file_id, file_name } => {
                commands::handle_file(app, &mut session, file_id, file_name.as_deref()).await
            }
            InboundKind::Callback { id, data } => {
                if let Err(e) = services.telegram().answer_callback(id).await {
                    tracing::debug!(chat_id, "answering callback failed: {}", e);
                }
                commands::handle_callback(app, &mut session, data, inbound.from_name.as_deref()).await
            }
        };
        let reply = outcome.unwrap_or_else(|e| {
            error!(chat_id, "update handling failed: {:#}", e);
            Reply::text("An error occurred while processing your request. Please try again.")
        });

        let record = session.to_record();
        services.sessions.save(session.user, record).await?;
        send_best_effort(services.telegram(), reply.into_message(chat_id)).await;

        tracing::debug!(chat_id, "update handled in {:?}", start_time.elapsed());
        Ok(())
    }
}
