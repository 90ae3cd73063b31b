//! Bank commands, talking to a running proxy over HTTP

use anyhow::{Context, Result};
use fincoach_core::bank::{self, BankDataSource, SyncResult};
use fincoach_core::db::Database;

pub async fn cmd_bank_institutions(source: &dyn BankDataSource) -> Result<()> {
    let institutions = source
        .institutions()
        .await
        .context("Failed to list linked banks (is `fincoach serve` running?)")?;

    if institutions.is_empty() {
        println!("No linked banks. Link one from the web UI.");
        return Ok(());
    }

    println!();
    println!("🏦 Linked Banks");
    println!("   ─────────────────────────────────────────────────────────────");
    for inst in &institutions {
        println!(
            "   {:<30} {}  (linked {})",
            inst.name().unwrap_or("Unknown institution"),
            inst.item_id,
            inst.connected_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

fn print_result(result: &SyncResult) {
    println!(
        "   {}: {} fetched, {} imported, {} skipped",
        result.item_id, result.fetched, result.imported, result.skipped
    );
}

pub async fn cmd_bank_sync(
    db: &Database,
    source: &dyn BankDataSource,
    item_id: Option<&str>,
) -> Result<()> {
    println!("🔄 Syncing bank transactions...");

    if let Some(item_id) = item_id {
        let result = bank::sync_institution(db, source, item_id)
            .await
            .with_context(|| format!("Failed to sync {}", item_id))?;
        print_result(&result);
        println!("✅ Imported {} new transaction(s)", result.imported);
        return Ok(());
    }

    let summary = bank::sync_all(db, source)
        .await
        .context("Failed to sync (is `fincoach serve` running?)")?;

    for result in &summary.results {
        print_result(result);
    }
    for failure in &summary.failures {
        println!("   ⚠️  {}: {}", failure.item_id, failure.error);
    }
    println!(
        "✅ Imported {} new transaction(s), skipped {}",
        summary.imported, summary.skipped
    );

    Ok(())
}
