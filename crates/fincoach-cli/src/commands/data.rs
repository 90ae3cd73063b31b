//! Export and import commands

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fincoach_core::db::{Database, TransactionFilter};

use super::confirm;

/// Write a full JSON backup
pub fn cmd_export_json(db: &Database, output: &Path) -> Result<()> {
    let export = db.export_data().context("Failed to export data")?;
    let json = serde_json::to_string_pretty(&export)?;
    fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✅ Exported to {}", output.display());
    println!(
        "   {} transactions, {} budgets, {} goals, {} conversations",
        export.transactions.len(),
        export.budgets.len(),
        export.goals.len(),
        export.conversations.len()
    );

    Ok(())
}

/// Write every transaction as CSV
pub fn cmd_export_csv(db: &Database, output: &Path) -> Result<()> {
    let csv = db
        .export_transactions_csv(&TransactionFilter::new())
        .context("Failed to export transactions")?;
    fs::write(output, csv).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✅ Exported transactions to {}", output.display());
    Ok(())
}

pub fn cmd_import(db: &Database, file: &Path, yes: bool) -> Result<()> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if !yes {
        println!("⚠️  Importing replaces all transactions, budgets, goals and conversations.");
        println!();
        if !confirm("Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let stats = db.import_json(&json).context("Import failed")?;

    println!("✅ Imported {} records from {}", stats.total(), file.display());
    println!(
        "   {} transactions, {} budgets, {} goals, {} conversations ({} messages)",
        stats.transactions, stats.budgets, stats.goals, stats.conversations, stats.messages
    );

    Ok(())
}
