//! Financial context for the coaching assistant
//!
//! Gathers the user's current-month picture and renders it into the system
//! prompt. Rendering is deterministic: the same context and date always
//! produce the same prompt.

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analytics::{with_percentages, CategoryBreakdown};
use crate::db::Database;
use crate::error::Result;
use crate::models::{BudgetProgress, DateRange, Goal, GoalStatus, Transaction, TransactionStats};

/// Transactions fetched for the context
pub const RECENT_TRANSACTIONS: i64 = 10;

/// Lines rendered per list section
const PROMPT_LIST_LIMIT: usize = 5;

const FINANCIAL_KNOWLEDGE: &str = "intermediate";

/// Snapshot of the user's finances handed to the model
#[derive(Debug, Clone, Serialize)]
pub struct CoachContext {
    pub month: DateRange,
    pub stats: TransactionStats,
    pub top_categories: Vec<CategoryBreakdown>,
    pub recent_transactions: Vec<Transaction>,
    pub budgets: Vec<BudgetProgress>,
    pub active_goals: Vec<Goal>,
}

/// Gather the context for `today`. The five reads run concurrently.
pub async fn build_context(db: &Database, today: NaiveDate) -> Result<CoachContext> {
    let month = DateRange::month_of(today);

    let (stats, categories, recent_transactions, budgets, active_goals) = tokio::try_join!(
        db.blocking(move |db| db.transaction_stats(month)),
        db.blocking(move |db| db.spending_by_category(month)),
        db.blocking(|db| db.recent_transactions(RECENT_TRANSACTIONS)),
        db.blocking(move |db| db.all_budget_progress(today)),
        db.blocking(|db| db.goals_by_status(GoalStatus::Active)),
    )?;

    Ok(CoachContext {
        month,
        stats,
        top_categories: with_percentages(categories),
        recent_transactions,
        budgets,
        active_goals,
    })
}

/// US-dollar amount with thousands separators, e.g. `-$1,234.50`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

fn section<I>(lines: I, empty: &str) -> String
where
    I: IntoIterator<Item = String>,
{
    let body: Vec<String> = lines.into_iter().map(|l| format!("  - {}", l)).collect();
    if body.is_empty() {
        format!("  {}", empty)
    } else {
        body.join("\n")
    }
}

impl CoachContext {
    fn budget_lines(&self) -> String {
        section(
            self.budgets.iter().map(|p| {
                format!(
                    "{}: {} of {} ({:.0}%)",
                    p.budget.category,
                    format_currency(p.spent),
                    format_currency(p.budget.monthly_limit),
                    p.percentage
                )
            }),
            "No budgets set",
        )
    }

    fn category_lines(&self) -> String {
        section(
            self.top_categories.iter().take(PROMPT_LIST_LIMIT).map(|c| {
                format!(
                    "{}: {} ({:.1}%)",
                    c.category,
                    format_currency(c.amount),
                    c.percentage
                )
            }),
            "No spending data",
        )
    }

    fn transaction_lines(&self) -> String {
        section(
            self.recent_transactions
                .iter()
                .take(PROMPT_LIST_LIMIT)
                .map(|t| {
                    format!(
                        "{}: {} ({}) on {}",
                        t.merchant,
                        format_currency(t.amount),
                        t.category,
                        t.date.format("%b %-d")
                    )
                }),
            "No recent transactions",
        )
    }

    fn goal_lines(&self) -> String {
        section(
            self.active_goals.iter().map(|g| {
                format!(
                    "{}: {} of {} (due {})",
                    g.name,
                    format_currency(g.current_amount),
                    format_currency(g.target_amount),
                    g.deadline.format("%b %-d, %Y")
                )
            }),
            "No active goals",
        )
    }

    /// Render the full system prompt
    pub fn system_prompt(&self, today: NaiveDate) -> String {
        let mut prompt = String::new();

        prompt.push_str(
            "You are FinCoach, an AI-powered financial wellness coach designed to help users \
             improve their spending habits, achieve financial goals, and build financial literacy.\n\n",
        );

        prompt.push_str("PERSONALITY & TONE:\n");
        prompt.push_str("- Friendly, encouraging, and non-judgmental\n");
        prompt.push_str("- Enthusiastic about wins, constructive about setbacks\n");
        prompt.push_str("- Educational but not condescending\n");
        prompt.push_str("- Use occasional emojis sparingly for warmth (1-2 per message max)\n");
        let _ = writeln!(
            prompt,
            "- Adapt complexity to user's financial knowledge level: {}\n",
            FINANCIAL_KNOWLEDGE
        );

        prompt.push_str("CORE CAPABILITIES:\n");
        prompt.push_str("1. Spending Analysis: Analyze transactions, identify patterns, spot anomalies\n");
        prompt.push_str("2. Budget Coaching: Help set realistic budgets, track progress, suggest adjustments\n");
        prompt.push_str("3. Goal Support: Break down financial goals, create action plans, celebrate milestones\n");
        prompt.push_str("4. Financial Education: Teach concepts in context, provide explanations\n");
        prompt.push_str("5. Behavioral Insights: Identify spending triggers, suggest habit changes\n\n");

        prompt.push_str("RESPONSE GUIDELINES:\n");
        prompt.push_str("- Keep responses concise (2-4 paragraphs unless detailed analysis requested)\n");
        prompt.push_str("- Always base insights on the actual user data provided below\n");
        prompt.push_str("- Provide specific, actionable recommendations with numbers when possible\n");
        prompt.push_str("- Ask clarifying questions when needed\n");
        prompt.push_str("- Celebrate progress and achievements\n");
        prompt.push_str("- Offer to dive deeper into any topic\n\n");

        let _ = writeln!(
            prompt,
            "CURRENT USER CONTEXT ({}):\n",
            today.format("%B %Y")
        );

        prompt.push_str("Monthly Summary:\n");
        let _ = writeln!(prompt, "- Total Spent: {}", format_currency(self.stats.total_expenses));
        let _ = writeln!(prompt, "- Total Income: {}", format_currency(self.stats.total_income));
        let _ = writeln!(
            prompt,
            "- Net: {}\n",
            format_currency(self.stats.total_income - self.stats.total_expenses)
        );

        let _ = writeln!(prompt, "Budget Status:\n{}\n", self.budget_lines());
        let _ = writeln!(prompt, "Top Spending Categories:\n{}\n", self.category_lines());
        let _ = writeln!(prompt, "Recent Transactions:\n{}\n", self.transaction_lines());
        let _ = writeln!(prompt, "Active Goals:\n{}\n", self.goal_lines());

        prompt.push_str("IMPORTANT LIMITATIONS:\n");
        prompt.push_str("- You're a coach, not a licensed financial advisor\n");
        prompt.push_str("- Don't provide specific investment advice, tax guidance, or legal counsel\n");
        prompt.push_str("- For complex financial planning, recommend consulting a certified financial planner\n");
        prompt.push_str("- Never make up data - only reference the actual numbers provided above\n");
        prompt.push_str("- If asked about data you don't have, acknowledge the limitation");

        prompt
    }
}
