//! One coaching turn: persist, build context, ask, persist

use chrono::NaiveDate;
use tracing::{info, warn};

use super::anthropic::CoachClient;
use super::context::build_context;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Message, NewMessage};

/// The coaching assistant bound to a chat client
#[derive(Debug, Clone)]
pub struct Coach {
    client: CoachClient,
}

impl Coach {
    pub fn new(client: CoachClient) -> Self {
        Self { client }
    }

    /// `None` when no API key is configured
    pub fn from_env() -> Option<Self> {
        CoachClient::from_env().map(Self::new)
    }

    pub fn client(&self) -> &CoachClient {
        &self.client
    }

    /// Store the user turn and load the history that precedes it
    async fn begin_turn(
        &self,
        db: &Database,
        conversation_id: i64,
        text: &str,
    ) -> Result<Vec<Message>> {
        let history = {
            let text = text.to_string();
            db.blocking(move |db| {
                let conversation = db
                    .get_conversation(conversation_id)?
                    .ok_or_else(|| Error::NotFound(format!("conversation {}", conversation_id)))?;
                db.add_message(conversation_id, &NewMessage::user(text))?;
                Ok(conversation.messages)
            })
            .await?
        };
        Ok(history)
    }

    async fn finish_turn(&self, db: &Database, conversation_id: i64, reply: String) -> Result<Message> {
        let message = db
            .blocking(move |db| db.add_message(conversation_id, &NewMessage::assistant(reply)))
            .await?;
        info!(conversation_id, chars = message.content.len(), "Coach replied");
        Ok(message)
    }

    /// Run one chat turn and return the stored assistant message.
    ///
    /// The user message is kept even when the model call fails.
    pub async fn ask(
        &self,
        db: &Database,
        conversation_id: i64,
        text: &str,
        today: NaiveDate,
    ) -> Result<Message> {
        let history = self.begin_turn(db, conversation_id, text).await?;
        let system = build_context(db, today).await?.system_prompt(today);

        let reply = self
            .client
            .send_message(&system, &history, text)
            .await
            .inspect_err(|e| warn!(conversation_id, error = %e, "Coach request failed"))?;

        self.finish_turn(db, conversation_id, reply).await
    }

    /// Streaming variant of [`ask`](Self::ask); chunks go to `on_chunk`
    pub async fn ask_streaming<F>(
        &self,
        db: &Database,
        conversation_id: i64,
        text: &str,
        today: NaiveDate,
        on_chunk: F,
    ) -> Result<Message>
    where
        F: FnMut(&str),
    {
        let history = self.begin_turn(db, conversation_id, text).await?;
        let system = build_context(db, today).await?.system_prompt(today);

        let reply = self
            .client
            .stream_message(&system, &history, text, on_chunk)
            .await
            .inspect_err(|e| warn!(conversation_id, error = %e, "Coach stream failed"))?;

        self.finish_turn(db, conversation_id, reply).await
    }
}
