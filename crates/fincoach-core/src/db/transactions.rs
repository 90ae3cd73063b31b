//! Transaction operations

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::transaction_filter::TransactionFilter;
use super::{
    format_datetime, is_constraint_violation, now, parse_date, parse_datetime, parse_string_list,
    Database, WriteOutcome,
};
use crate::error::Result;
use crate::models::{
    validate_transaction_fields, CategorySpending, DateRange, NewTransaction, Transaction,
    TransactionStats, TransactionType, TransactionUpdate,
};

pub(crate) const TRANSACTION_COLUMNS: &str = "t.id, t.amount, t.transaction_type, t.category, \
     t.subcategory, t.merchant, t.description, t.date, t.payment_method, t.tags, t.notes, \
     t.external_id, t.created_at, t.updated_at";

/// Result of inserting an imported transaction
#[derive(Debug, Clone)]
pub enum TransactionInsertResult {
    /// Transaction was inserted
    Inserted(Transaction),
    /// A transaction with the same external id already exists, contains its id
    Duplicate(i64),
}

impl Database {
    /// Create a transaction. Tags and description default to empty.
    pub fn create_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        tx.validate()?;
        let conn = self.conn()?;
        let ts = now();

        conn.execute(
            r#"
            INSERT INTO transactions (amount, transaction_type, category, subcategory, merchant,
                description, date, payment_method, tags, notes, external_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.amount,
                tx.transaction_type.as_str(),
                tx.category,
                tx.subcategory,
                tx.merchant.trim(),
                tx.description,
                tx.date.to_string(),
                tx.payment_method.map(|p| p.as_str()),
                serde_json::to_string(&tx.tags)?,
                tx.notes,
                tx.external_id,
                format_datetime(&ts),
                format_datetime(&ts),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, amount = tx.amount, category = %tx.category, "Created transaction");

        Ok(Transaction {
            id,
            amount: tx.amount,
            transaction_type: tx.transaction_type,
            category: tx.category.clone(),
            subcategory: tx.subcategory.clone(),
            merchant: tx.merchant.trim().to_string(),
            description: tx.description.clone(),
            date: tx.date,
            payment_method: tx.payment_method,
            tags: tx.tags.clone(),
            notes: tx.notes.clone(),
            external_id: tx.external_id.clone(),
            created_at: ts,
            updated_at: ts,
        })
    }

    /// Insert an imported transaction unless its external id is already stored.
    ///
    /// The UNIQUE index on `external_id` makes a repeat import a no-op even if
    /// two syncs interleave.
    pub fn insert_imported_transaction(
        &self,
        tx: &NewTransaction,
    ) -> Result<TransactionInsertResult> {
        if let Some(ref external_id) = tx.external_id {
            if let Some(existing) = self.get_transaction_by_external_id(external_id)? {
                return Ok(TransactionInsertResult::Duplicate(existing.id));
            }
        }

        match self.create_transaction(tx) {
            Ok(created) => Ok(TransactionInsertResult::Inserted(created)),
            Err(crate::Error::Database(ref e)) if is_constraint_violation(e) => {
                let existing = match tx.external_id {
                    Some(ref external_id) => self.get_transaction_by_external_id(external_id)?,
                    None => None,
                };
                Ok(TransactionInsertResult::Duplicate(
                    existing.map(|t| t.id).unwrap_or_default(),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions t WHERE t.id = ?", TRANSACTION_COLUMNS),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Find the transaction imported with the given aggregator id
    pub fn get_transaction_by_external_id(&self, external_id: &str) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions t WHERE t.external_id = ?",
                    TRANSACTION_COLUMNS
                ),
                params![external_id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Merge `update` into the stored transaction and bump `updated_at`
    pub fn update_transaction(
        &self,
        id: i64,
        update: &TransactionUpdate,
    ) -> Result<WriteOutcome<Transaction>> {
        let Some(mut tx) = self.get_transaction(id)? else {
            return Ok(WriteOutcome::NotFound);
        };

        update.apply_to(&mut tx);
        validate_transaction_fields(
            tx.amount,
            &tx.merchant,
            &tx.description,
            tx.notes.as_deref(),
            &tx.category,
        )?;
        tx.updated_at = now();

        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE transactions SET amount = ?, transaction_type = ?, category = ?,
                subcategory = ?, merchant = ?, description = ?, date = ?, payment_method = ?,
                tags = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                tx.amount,
                tx.transaction_type.as_str(),
                tx.category,
                tx.subcategory,
                tx.merchant,
                tx.description,
                tx.date.to_string(),
                tx.payment_method.map(|p| p.as_str()),
                serde_json::to_string(&tx.tags)?,
                tx.notes,
                format_datetime(&tx.updated_at),
                id,
            ],
        )?;

        if changed == 0 {
            return Ok(WriteOutcome::NotFound);
        }
        Ok(WriteOutcome::Applied(tx))
    }

    pub fn delete_transaction(&self, id: i64) -> Result<WriteOutcome<()>> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            Ok(WriteOutcome::Applied(()))
        }
    }

    /// List transactions matching every present criterion, newest first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let built = filter.build();
        let sql = format!(
            "SELECT {} FROM transactions t {} {} {}",
            TRANSACTION_COLUMNS, built.where_clause, built.order_clause, built.limit_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(built.params_refs().as_slice(), Self::row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// The `limit` most recent transactions
    pub fn recent_transactions(&self, limit: i64) -> Result<Vec<Transaction>> {
        self.list_transactions(&TransactionFilter::new().limit(limit))
    }

    /// Count total transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Totals over an inclusive date range
    pub fn transaction_stats(&self, range: DateRange) -> Result<TransactionStats> {
        let transactions = self.list_transactions(&TransactionFilter::new().date_range(range))?;
        Ok(compute_stats(&transactions))
    }

    /// Expense totals per category, largest first
    pub fn spending_by_category(&self, range: DateRange) -> Result<Vec<CategorySpending>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT category, SUM(amount) AS total, COUNT(*)
            FROM transactions
            WHERE transaction_type = 'expense' AND date >= ? AND date <= ?
            GROUP BY category
            ORDER BY total DESC, category ASC
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![range.start.to_string(), range.end.to_string()],
                |row| {
                    Ok(CategorySpending {
                        category: row.get(0)?,
                        amount: row.get(1)?,
                        count: row.get(2)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Expense total for one category in the month containing `today`
    pub fn category_spending(&self, category: &str, today: chrono::NaiveDate) -> Result<f64> {
        let range = DateRange::month_of(today);
        self.category_spending_in(category, range)
    }

    pub(crate) fn category_spending_in(&self, category: &str, range: DateRange) -> Result<f64> {
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM transactions
            WHERE transaction_type = 'expense' AND category = ? AND date >= ? AND date <= ?
            "#,
            params![category, range.start.to_string(), range.end.to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Distinct merchant names, sorted
    pub fn merchants(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT merchant FROM transactions ORDER BY merchant")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
    }

    /// Insert a transaction with its original id and timestamps (restore path)
    pub(crate) fn restore_transaction(
        conn: &rusqlite::Connection,
        tx: &Transaction,
    ) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO transactions (id, amount, transaction_type, category, subcategory,
                merchant, description, date, payment_method, tags, notes, external_id,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.id,
                tx.amount,
                tx.transaction_type.as_str(),
                tx.category,
                tx.subcategory,
                tx.merchant,
                tx.description,
                tx.date.to_string(),
                tx.payment_method.map(|p| p.as_str()),
                serde_json::to_string(&tx.tags)?,
                tx.notes,
                tx.external_id,
                format_datetime(&tx.created_at),
                format_datetime(&tx.updated_at),
            ],
        )?;
        Ok(())
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let type_str: String = row.get(2)?;
        let date_str: String = row.get(7)?;
        let payment_method_str: Option<String> = row.get(8)?;
        let tags_str: String = row.get(9)?;
        let created_at_str: String = row.get(12)?;
        let updated_at_str: String = row.get(13)?;
        Ok(Transaction {
            id: row.get(0)?,
            amount: row.get(1)?,
            transaction_type: type_str.parse().unwrap_or(TransactionType::Expense),
            category: row.get(3)?,
            subcategory: row.get(4)?,
            merchant: row.get(5)?,
            description: row.get(6)?,
            date: parse_date(7, &date_str)?,
            payment_method: payment_method_str.and_then(|s| s.parse().ok()),
            tags: parse_string_list(&tags_str),
            notes: row.get(10)?,
            external_id: row.get(11)?,
            created_at: parse_datetime(12, &created_at_str)?,
            updated_at: parse_datetime(13, &updated_at_str)?,
        })
    }
}

/// Fold a date-descending transaction list into totals.
///
/// The largest expense is the first one encountered with the maximal amount.
pub(crate) fn compute_stats(transactions: &[Transaction]) -> TransactionStats {
    let mut total_income = 0.0;
    let mut total_expenses = 0.0;
    let mut expense_count = 0i64;
    let mut largest: Option<&Transaction> = None;

    for tx in transactions {
        match tx.transaction_type {
            TransactionType::Income => total_income += tx.amount,
            TransactionType::Expense => {
                total_expenses += tx.amount;
                expense_count += 1;
                if largest.map(|l| tx.amount > l.amount).unwrap_or(true) {
                    largest = Some(tx);
                }
            }
        }
    }

    TransactionStats {
        total_income,
        total_expenses,
        net_amount: total_income - total_expenses,
        transaction_count: transactions.len() as i64,
        average_expense: if expense_count > 0 {
            total_expenses / expense_count as f64
        } else {
            0.0
        },
        largest_expense: largest.cloned(),
    }
}

