//! Export and import of the local store
//!
//! Supports:
//! - Full JSON snapshot of transactions, budgets, goals and conversations
//! - Replace-all import of such a snapshot
//! - Transaction CSV export with the usual list filters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::categories;
use crate::db::{Database, TransactionFilter};
use crate::error::{Error, Result};
use crate::models::{Budget, Conversation, Goal, Transaction};

/// Snapshot format version written by this build
pub const EXPORT_VERSION: u32 = 1;

/// Full snapshot of the user's data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    /// Conversations carry their messages inline
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

/// Row counts written by an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub transactions: usize,
    pub budgets: usize,
    pub goals: usize,
    pub conversations: usize,
    pub messages: usize,
}

impl ImportStats {
    pub fn total(&self) -> usize {
        self.transactions + self.budgets + self.goals + self.conversations + self.messages
    }
}

impl Database {
    /// Snapshot every user-owned record
    pub fn export_data(&self) -> Result<DataExport> {
        let transactions = self.list_transactions(&TransactionFilter::new())?;
        let budgets = self.list_budgets()?;
        let goals = self.list_goals()?;
        let conversations = self.list_conversations()?;

        Ok(DataExport {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            transactions,
            budgets,
            goals,
            conversations,
        })
    }

    /// Snapshot as pretty-printed JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_data()?)?)
    }

    /// Replace all user data with the snapshot's contents.
    ///
    /// Runs in a single SQLite transaction: on any failure the existing data
    /// is left untouched. Linked bank items are not affected.
    pub fn import_data(&self, data: &DataExport) -> Result<ImportStats> {
        if data.version > EXPORT_VERSION {
            return Err(Error::InvalidData(format!(
                "Unsupported export version {} (expected {} or lower)",
                data.version, EXPORT_VERSION
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            r#"
            DELETE FROM messages;
            DELETE FROM conversations;
            DELETE FROM goals;
            DELETE FROM budgets;
            DELETE FROM transactions;
            "#,
        )?;

        let mut stats = ImportStats::default();

        for transaction in &data.transactions {
            Database::restore_transaction(&tx, transaction)?;
            stats.transactions += 1;
        }
        for budget in &data.budgets {
            Database::restore_budget(&tx, budget)?;
            stats.budgets += 1;
        }
        for goal in &data.goals {
            Database::restore_goal(&tx, goal)?;
            stats.goals += 1;
        }
        for conversation in &data.conversations {
            Database::restore_conversation(&tx, conversation)?;
            stats.conversations += 1;
            stats.messages += conversation.messages.len();
        }

        tx.commit()?;

        info!(
            transactions = stats.transactions,
            budgets = stats.budgets,
            goals = stats.goals,
            conversations = stats.conversations,
            "Data imported"
        );
        Ok(stats)
    }

    /// Parse and import a JSON snapshot
    pub fn import_json(&self, json: &str) -> Result<ImportStats> {
        let data: DataExport = serde_json::from_str(json)
            .map_err(|e| Error::InvalidData(format!("Invalid export file: {}", e)))?;
        self.import_data(&data)
    }

    /// Export matching transactions as CSV, newest first
    pub fn export_transactions_csv(&self, filter: &TransactionFilter) -> Result<String> {
        let transactions = self.list_transactions(filter)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "date",
            "type",
            "amount",
            "category",
            "subcategory",
            "merchant",
            "description",
            "payment_method",
            "tags",
            "notes",
        ])?;

        for tx in &transactions {
            writer.write_record([
                tx.date.to_string(),
                tx.transaction_type.as_str().to_string(),
                format!("{:.2}", tx.amount),
                categories::display_name(&tx.category).to_string(),
                tx.subcategory.clone().unwrap_or_default(),
                tx.merchant.clone(),
                tx.description.clone(),
                tx.payment_method
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default(),
                tx.tags.join(";"),
                tx.notes.clone().unwrap_or_default(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| Error::InvalidData(e.to_string()))
    }
}
