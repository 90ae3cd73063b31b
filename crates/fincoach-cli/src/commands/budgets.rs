//! Budget command implementations

use anyhow::{Context, Result};
use chrono::Utc;
use fincoach_core::categories;
use fincoach_core::db::{Database, WriteOutcome};
use fincoach_core::models::{BudgetStatus, NewBudget};

use super::progress_bar;

pub fn cmd_budgets_list(db: &Database) -> Result<()> {
    let today = Utc::now().date_naive();
    let progress = db.all_budget_progress(today)?;

    if progress.is_empty() {
        println!("No budgets yet. Create one with:");
        println!("  fincoach budgets add food_dining 400");
        return Ok(());
    }

    println!();
    println!("💰 Budgets ({})", today.format("%B %Y"));
    println!("   ─────────────────────────────────────────────────────────────");

    for p in &progress {
        let icon = match p.status {
            BudgetStatus::Under => "🟢",
            BudgetStatus::Warning => "🟡",
            BudgetStatus::Over => "🔴",
        };
        println!(
            "   {} [{}] {:<20} {} {:>5.1}%  ${:.2} of ${:.2}",
            icon,
            p.budget.id,
            categories::display_name(&p.budget.category),
            progress_bar(p.percentage, 20),
            p.percentage,
            p.spent,
            p.budget.monthly_limit
        );
    }

    let summary = db.budget_summary(today)?;
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Total: ${:.2} of ${:.2} ({:.1}%), {} days left in the month",
        summary.total_spent,
        summary.total_budgeted,
        summary.overall_percentage,
        progress.first().map(|p| p.days_remaining).unwrap_or(0)
    );
    if summary.budgets_over_budget > 0 {
        println!("   ⚠️  {} budget(s) over the limit", summary.budgets_over_budget);
    }

    Ok(())
}

pub fn cmd_budgets_add(db: &Database, category: &str, limit: f64, threshold: f64) -> Result<()> {
    let budget = NewBudget {
        alert_threshold: threshold,
        ..NewBudget::new(category, limit)
    };
    let created = db.create_budget(&budget).context("Failed to create budget")?;

    println!(
        "✅ Created budget {}: {} at ${:.2}/month (warn at {:.0}%)",
        created.id,
        categories::display_name(&created.category),
        created.monthly_limit,
        created.alert_threshold
    );

    Ok(())
}

pub fn cmd_budgets_delete(db: &Database, id: i64) -> Result<()> {
    match db.delete_budget(id)? {
        WriteOutcome::Applied(()) => {
            println!("✅ Deleted budget {}", id);
            Ok(())
        }
        WriteOutcome::NotFound => anyhow::bail!("Budget {} not found", id),
    }
}
