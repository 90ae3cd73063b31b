//! Coaching chat command

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Utc;
use fincoach_core::ai::Coach;
use fincoach_core::db::Database;

pub async fn cmd_chat(db: &Database, message: &str) -> Result<()> {
    let Some(coach) = Coach::from_env() else {
        anyhow::bail!(fincoach_core::Error::AiNotConfigured);
    };
    if message.trim().is_empty() {
        anyhow::bail!("Message is required");
    }

    let today = Utc::now().date_naive();
    let conversation = db.get_or_create_current_conversation(today)?;

    println!();
    print!("🤖 ");
    io::stdout().flush()?;

    coach
        .ask_streaming(db, conversation.id, message, today, |chunk| {
            print!("{}", chunk);
            let _ = io::stdout().flush();
        })
        .await
        .context("Coach request failed")?;

    println!();
    Ok(())
}
