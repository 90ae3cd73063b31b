//! Goal command implementations

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use fincoach_core::db::{Database, WriteOutcome};
use fincoach_core::models::{GoalStatus, NewGoal};

use super::{progress_bar, truncate};

pub fn cmd_goals_list(db: &Database) -> Result<()> {
    let today = Utc::now().date_naive();
    let goals = db.all_goal_progress(today)?;

    if goals.is_empty() {
        println!("No goals yet. Create one with:");
        println!("  fincoach goals add \"Emergency fund\" 5000 --deadline 2027-06-30");
        return Ok(());
    }

    println!();
    println!("🎯 Savings Goals");
    println!("   ─────────────────────────────────────────────────────────────");

    for p in &goals {
        let goal = &p.goal;
        println!(
            "   [{}] {:<24} {} {:>5.1}%  ${:.2} of ${:.2}",
            goal.id,
            truncate(&goal.name, 24),
            progress_bar(p.percentage, 20),
            p.percentage,
            goal.current_amount,
            goal.target_amount
        );

        match goal.status {
            GoalStatus::Completed => println!("        ✅ Completed"),
            GoalStatus::Paused => println!("        ⏸  Paused"),
            GoalStatus::Cancelled => println!("        ✖  Cancelled"),
            GoalStatus::Active if p.days_remaining < 0 => {
                println!("        ⚠️  Deadline passed on {}", goal.deadline)
            }
            GoalStatus::Active => println!(
                "        Save ${:.2}/month to reach it by {}{}",
                p.monthly_required,
                goal.deadline,
                if p.on_track { "" } else { " (behind)" }
            ),
        }
    }

    let summary = db.goals_summary()?;
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Saved ${:.2} of ${:.2} across {} active goal(s)",
        summary.total_saved, summary.total_target, summary.active_goals
    );

    Ok(())
}

pub fn cmd_goals_add(db: &Database, name: &str, target: f64, deadline: NaiveDate) -> Result<()> {
    let created = db
        .create_goal(&NewGoal::new(name, target, deadline))
        .context("Failed to create goal")?;

    println!(
        "✅ Created goal {}: {} (${:.2} by {})",
        created.id, created.name, created.target_amount, created.deadline
    );

    Ok(())
}

pub fn cmd_goals_contribute(db: &Database, id: i64, amount: f64) -> Result<()> {
    let goal = match db.contribute_to_goal(id, amount)? {
        WriteOutcome::Applied(goal) => goal,
        WriteOutcome::NotFound => anyhow::bail!("Goal {} not found", id),
    };

    println!(
        "✅ Added ${:.2} to {}: ${:.2} of ${:.2}",
        amount, goal.name, goal.current_amount, goal.target_amount
    );
    if goal.status == GoalStatus::Completed {
        println!("   🎉 Goal reached!");
    }

    Ok(())
}
