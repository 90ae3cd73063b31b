//! Coaching conversation transcripts

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{format_datetime, now, parse_datetime, Database, WriteOutcome};
use crate::error::{Error, Result};
use crate::models::{Conversation, Message, MessageMetadata, MessageRole, NewMessage};

impl Database {
    /// Start a conversation. Without a title it is named after today's date.
    pub fn create_conversation(&self, title: Option<&str>) -> Result<Conversation> {
        let ts = now();
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Chat {}", ts.format("%-m/%-d/%Y")),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO conversations (title, created_at, updated_at) VALUES (?, ?, ?)",
            params![title, format_datetime(&ts), format_datetime(&ts)],
        )?;

        Ok(Conversation {
            id: conn.last_insert_rowid(),
            title,
            messages: Vec::new(),
            created_at: ts,
            updated_at: ts,
        })
    }

    /// Get a conversation with its messages in order
    pub fn get_conversation(&self, id: i64) -> Result<Option<Conversation>> {
        let conn = self.conn()?;
        let header = conn
            .query_row(
                "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?",
                params![id],
                Self::row_to_conversation,
            )
            .optional()?;

        match header {
            Some(mut conversation) => {
                conversation.messages = self.list_messages(id)?;
                Ok(Some(conversation))
            }
            None => Ok(None),
        }
    }

    /// All conversations, most recently updated first
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let ids: Vec<i64> = {
            let conn = self.conn()?;
            let mut stmt = conn
                .prepare("SELECT id FROM conversations ORDER BY updated_at DESC, id DESC")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut conversations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(c) = self.get_conversation(id)? {
                conversations.push(c);
            }
        }
        Ok(conversations)
    }

    pub fn most_recent_conversation(&self) -> Result<Option<Conversation>> {
        let id: Option<i64> = {
            let conn = self.conn()?;
            let id = conn
                .query_row(
                    "SELECT id FROM conversations ORDER BY updated_at DESC, id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            id
        };
        match id {
            Some(id) => self.get_conversation(id),
            None => Ok(None),
        }
    }

    /// Append a message. Fails with `NotFound` when the conversation is unknown.
    pub fn add_message(&self, conversation_id: i64, message: &NewMessage) -> Result<Message> {
        let ts = now();
        let metadata = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let touched = db_tx.execute(
            "UPDATE conversations SET updated_at = ? WHERE id = ?",
            params![format_datetime(&ts), conversation_id],
        )?;
        if touched == 0 {
            return Err(Error::NotFound(format!(
                "Conversation {} not found",
                conversation_id
            )));
        }

        db_tx.execute(
            "INSERT INTO messages (conversation_id, role, content, metadata, timestamp) VALUES (?, ?, ?, ?, ?)",
            params![
                conversation_id,
                message.role.as_str(),
                message.content,
                metadata,
                format_datetime(&ts),
            ],
        )?;
        let id = db_tx.last_insert_rowid();
        db_tx.commit()?;

        debug!(conversation_id, message_id = id, role = message.role.as_str(), "Added message");

        Ok(Message {
            id,
            role: message.role,
            content: message.content.clone(),
            timestamp: ts,
            metadata: message.metadata.clone(),
        })
    }

    pub fn update_conversation_title(&self, id: i64, title: &str) -> Result<WriteOutcome<()>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE conversations SET title = ?, updated_at = ? WHERE id = ?",
            params![title, format_datetime(&now()), id],
        )?;
        Ok(if changed == 0 {
            WriteOutcome::NotFound
        } else {
            WriteOutcome::Applied(())
        })
    }

    pub fn delete_conversation(&self, id: i64) -> Result<WriteOutcome<()>> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM conversations WHERE id = ?", params![id])?;
        Ok(if changed == 0 {
            WriteOutcome::NotFound
        } else {
            WriteOutcome::Applied(())
        })
    }

    /// Drop every message but keep the conversation
    pub fn clear_conversation(&self, id: i64) -> Result<WriteOutcome<()>> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        let changed = db_tx.execute(
            "UPDATE conversations SET updated_at = ? WHERE id = ?",
            params![format_datetime(&now()), id],
        )?;
        if changed == 0 {
            return Ok(WriteOutcome::NotFound);
        }
        db_tx.execute("DELETE FROM messages WHERE conversation_id = ?", params![id])?;
        db_tx.commit()?;
        Ok(WriteOutcome::Applied(()))
    }

    /// Reuse the most recent conversation if it was started on `today`,
    /// otherwise start a new one
    pub fn get_or_create_current_conversation(&self, today: NaiveDate) -> Result<Conversation> {
        if let Some(recent) = self.most_recent_conversation()? {
            if recent.created_at.date_naive() == today {
                return Ok(recent);
            }
        }
        self.create_conversation(None)
    }

    fn list_messages(&self, conversation_id: i64) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, role, content, metadata, timestamp FROM messages WHERE conversation_id = ? ORDER BY id",
        )?;
        let messages = stmt
            .query_map(params![conversation_id], |row| {
                let role_str: String = row.get(1)?;
                let metadata_str: Option<String> = row.get(3)?;
                let timestamp_str: String = row.get(4)?;
                Ok(Message {
                    id: row.get(0)?,
                    role: role_str.parse().unwrap_or(MessageRole::User),
                    content: row.get(2)?,
                    metadata: metadata_str
                        .and_then(|s| serde_json::from_str::<MessageMetadata>(&s).ok()),
                    timestamp: parse_datetime(4, &timestamp_str)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    pub(crate) fn restore_conversation(
        conn: &rusqlite::Connection,
        conversation: &Conversation,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)",
            params![
                conversation.id,
                conversation.title,
                format_datetime(&conversation.created_at),
                format_datetime(&conversation.updated_at),
            ],
        )?;
        for message in &conversation.messages {
            let metadata = message
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            conn.execute(
                "INSERT INTO messages (id, conversation_id, role, content, metadata, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    message.id,
                    conversation.id,
                    message.role.as_str(),
                    message.content,
                    metadata,
                    format_datetime(&message.timestamp),
                ],
            )?;
        }
        Ok(())
    }

    fn row_to_conversation(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
        let created_at_str: String = row.get(2)?;
        let updated_at_str: String = row.get(3)?;
        Ok(Conversation {
            id: row.get(0)?,
            title: row.get(1)?,
            messages: Vec::new(),
            created_at: parse_datetime(2, &created_at_str)?,
            updated_at: parse_datetime(3, &updated_at_str)?,
        })
    }
}
