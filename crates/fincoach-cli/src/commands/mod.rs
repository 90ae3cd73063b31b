//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `bank` - Linked banks through the proxy (institutions, sync)
//! - `budgets` - Budget commands (list, add, delete)
//! - `chat` - Ask the coach
//! - `core` - Core commands (init, reset) and shared utilities (open_db)
//! - `data` - Export/import commands (JSON backup, transaction CSV)
//! - `goals` - Goal commands (list, add, contribute)
//! - `reports` - Report generation commands
//! - `serve` - Web server command
//! - `transactions` - Transaction commands (list, add, delete)

pub mod bank;
pub mod budgets;
pub mod chat;
pub mod core;
pub mod data;
pub mod goals;
pub mod reports;
pub mod serve;
pub mod transactions;

// Re-export command functions for main.rs
pub use bank::*;
pub use budgets::*;
pub use chat::*;
pub use core::*;
pub use data::*;
pub use goals::*;
pub use reports::*;
pub use serve::*;
pub use transactions::*;

use std::io::{self, Write};

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a bar of `width` cells filled to `percentage`
pub fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Ask a yes/no question on stdin; anything but `y` declines
pub fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
