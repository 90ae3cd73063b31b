//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_reset` - Delete all user data

use std::path::Path;

use anyhow::{Context, Result};
use fincoach_core::db::{Database, DB_KEY_ENV};

use super::confirm;

/// Open the database, encrypted when FINCOACH_DB_KEY is set unless --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if std::env::var(DB_KEY_ENV).is_ok() {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   🔓 Encryption: not configured (set {} to enable)", DB_KEY_ENV);
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Set a budget: fincoach budgets add food_dining 400");
    println!("  2. Record spending: fincoach transactions add 12.50 -c food_dining -m Deli");
    println!("  3. Start web UI: fincoach serve");

    Ok(())
}

pub fn cmd_reset(db: &Database, yes: bool) -> Result<()> {
    if !yes {
        println!("⚠️  This will delete all transactions, budgets, goals and conversations.");
        println!("   Linked banks are kept.");
        println!();
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    db.clear_all().context("Failed to reset database")?;
    println!("✅ All data deleted.");

    Ok(())
}
