//! Persistent store of aggregator items linked through the proxy

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{format_datetime, now, parse_datetime, Database, WriteOutcome};
use crate::error::Result;
use crate::models::LinkedItem;

impl Database {
    /// Store (or replace) the access token for an item
    pub fn save_linked_item(
        &self,
        item_id: &str,
        access_token: &str,
        institution: &serde_json::Value,
    ) -> Result<LinkedItem> {
        let ts = now();
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO linked_items (item_id, access_token, institution, connected_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                access_token = excluded.access_token,
                institution = excluded.institution
            "#,
            params![
                item_id,
                access_token,
                serde_json::to_string(institution)?,
                format_datetime(&ts),
            ],
        )?;
        info!(item_id, "Linked bank item");

        self.get_linked_item(item_id)?
            .ok_or_else(|| crate::Error::NotFound(format!("Linked item {}", item_id)))
    }

    pub fn get_linked_item(&self, item_id: &str) -> Result<Option<LinkedItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                "SELECT item_id, access_token, institution, connected_at FROM linked_items WHERE item_id = ?",
                params![item_id],
                Self::row_to_linked_item,
            )
            .optional()?;
        Ok(item)
    }

    /// All linked items in the order they were connected
    pub fn list_linked_items(&self) -> Result<Vec<LinkedItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT item_id, access_token, institution, connected_at FROM linked_items ORDER BY connected_at, item_id",
        )?;
        let items = stmt
            .query_map([], Self::row_to_linked_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn remove_linked_item(&self, item_id: &str) -> Result<WriteOutcome<()>> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM linked_items WHERE item_id = ?", params![item_id])?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            info!(item_id, "Removed linked bank item");
            Ok(WriteOutcome::Applied(()))
        }
    }

    fn row_to_linked_item(row: &rusqlite::Row) -> rusqlite::Result<LinkedItem> {
        let institution_str: String = row.get(2)?;
        let connected_at_str: String = row.get(3)?;
        Ok(LinkedItem {
            item_id: row.get(0)?,
            access_token: row.get(1)?,
            institution: serde_json::from_str(&institution_str)
                .unwrap_or(serde_json::Value::Null),
            connected_at: parse_datetime(3, &connected_at_str)?,
        })
    }
}
