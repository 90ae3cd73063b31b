//! Transaction command implementations

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use fincoach_core::categories;
use fincoach_core::db::{Database, TransactionFilter, WriteOutcome};
use fincoach_core::models::{NewTransaction, TransactionType};

use super::truncate;

/// Arguments of `fincoach transactions add`
pub struct NewEntry<'a> {
    pub amount: f64,
    pub category: &'a str,
    pub merchant: &'a str,
    pub income: bool,
    pub date: Option<NaiveDate>,
    pub description: Option<&'a str>,
    pub tags: Option<&'a str>,
}

impl NewEntry<'_> {
    fn to_transaction(&self, today: NaiveDate) -> NewTransaction {
        let date = self.date.unwrap_or(today);
        let mut tx = if self.income {
            NewTransaction::income(self.amount, self.category, self.merchant, date)
        } else {
            NewTransaction::expense(self.amount, self.category, self.merchant, date)
        };
        tx.description = self.description.unwrap_or_default().to_string();
        tx.tags = self
            .tags
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        tx
    }
}

pub fn cmd_transactions_list(db: &Database, limit: i64, category: Option<&str>) -> Result<()> {
    let mut filter = TransactionFilter::new().limit(limit);
    if let Some(category) = category {
        filter = filter.category(category);
    }
    let transactions = db.list_transactions(&filter)?;

    if transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  fincoach transactions add 12.50 --category food_dining --merchant Deli");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = match tx.transaction_type {
            TransactionType::Expense => format!("\x1b[31m-${:.2}\x1b[0m", tx.amount), // Red for expenses
            TransactionType::Income => format!("\x1b[32m+${:.2}\x1b[0m", tx.amount), // Green for income
        };

        println!(
            "   [{}] {} │ {:>10} │ {:<18} │ {}",
            tx.id,
            tx.date,
            amount_str,
            truncate(categories::display_name(&tx.category), 18),
            truncate(&tx.merchant, 30)
        );
    }

    Ok(())
}

pub fn cmd_transactions_add(db: &Database, entry: NewEntry<'_>) -> Result<()> {
    let today = Utc::now().date_naive();
    let created = db
        .create_transaction(&entry.to_transaction(today))
        .context("Failed to record transaction")?;

    let sign = match created.transaction_type {
        TransactionType::Expense => "-",
        TransactionType::Income => "+",
    };
    println!(
        "✅ Recorded transaction {}: {} │ {}${:.2} │ {} │ {}",
        created.id,
        created.date,
        sign,
        created.amount,
        categories::display_name(&created.category),
        created.merchant
    );

    Ok(())
}

pub fn cmd_transactions_delete(db: &Database, id: i64) -> Result<()> {
    match db.delete_transaction(id)? {
        WriteOutcome::Applied(()) => {
            println!("✅ Deleted transaction {}", id);
            Ok(())
        }
        WriteOutcome::NotFound => anyhow::bail!("Transaction {} not found", id),
    }
}
