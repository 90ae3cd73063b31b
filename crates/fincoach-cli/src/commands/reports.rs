//! Report command implementations

use anyhow::Result;
use chrono::Utc;
use fincoach_core::analytics;
use fincoach_core::categories;
use fincoach_core::db::Database;

use super::{progress_bar, truncate};

pub async fn cmd_report_dashboard(db: &Database) -> Result<()> {
    let today = Utc::now().date_naive();
    let dashboard = analytics::dashboard(db, today).await?;
    let totals = &dashboard.totals;

    println!();
    println!(
        "📊 Dashboard ({} to {})",
        dashboard.period.start, dashboard.period.end
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Spent:   ${:>10.2}", totals.total_spent);
    println!("   Income:  ${:>10.2}", totals.total_income);
    println!("   Net:     ${:>10.2}", totals.net_amount);
    println!(
        "   {} transactions, ${:.2} average expense",
        totals.transaction_count, totals.average_expense
    );

    if !dashboard.category_breakdown.is_empty() {
        println!();
        println!("   By category:");
        for c in dashboard.category_breakdown.iter().take(5) {
            println!(
                "   {:<20} ${:>9.2} {:>5.1}%",
                truncate(categories::display_name(&c.category), 20),
                c.amount,
                c.percentage
            );
        }
    }

    let budgets = &dashboard.budget_summary;
    if budgets.total_budgeted > 0.0 {
        println!();
        println!(
            "   Budgets this month: ${:.2} of ${:.2} ({} on track, {} at risk, {} over)",
            budgets.total_spent,
            budgets.total_budgeted,
            budgets.budgets_on_track,
            budgets.budgets_at_risk,
            budgets.budgets_over_budget
        );
    }

    Ok(())
}

pub fn cmd_report_monthly(db: &Database, months: u32) -> Result<()> {
    let today = Utc::now().date_naive();
    let rows = analytics::monthly_comparison(db, months.clamp(1, 36), today)?;

    println!();
    println!("📅 Monthly Comparison");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:<10} {:>12} {:>12} {:>12} {:>6}",
        "Month", "Spent", "Income", "Net", "Count"
    );

    for row in &rows {
        println!(
            "   {:<10} {:>12.2} {:>12.2} {:>12.2} {:>6}",
            row.month, row.total_spent, row.total_income, row.net_amount, row.transaction_count
        );
    }

    Ok(())
}

pub fn cmd_report_merchants(db: &Database, limit: usize) -> Result<()> {
    let merchants = analytics::top_merchants(db, limit, None)?;

    if merchants.is_empty() {
        println!("No spending recorded yet.");
        return Ok(());
    }

    println!();
    println!("🏪 Top Merchants");
    println!("   ─────────────────────────────────────────────────────────────");

    for (rank, m) in merchants.iter().enumerate() {
        println!(
            "   {:>2}. {:<30} ${:>10.2}  ({} transactions)",
            rank + 1,
            truncate(&m.merchant, 30),
            m.amount,
            m.count
        );
    }

    Ok(())
}

pub fn cmd_report_weekday(db: &Database) -> Result<()> {
    let days = analytics::spending_by_day_of_week(db)?;
    let max = days.iter().map(|d| d.total).fold(0.0_f64, f64::max);

    println!();
    println!("📆 Spending by Day of Week");
    println!("   ─────────────────────────────────────────────────────────────");

    for day in &days {
        let share = if max > 0.0 { day.total / max * 100.0 } else { 0.0 };
        println!(
            "   {:<9} {} ${:>9.2}  avg ${:.2}",
            day.day,
            progress_bar(share, 20),
            day.total,
            day.average
        );
    }

    Ok(())
}
