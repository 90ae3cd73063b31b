//! Budget operations and monthly progress

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{format_datetime, is_constraint_violation, now, parse_datetime, Database, WriteOutcome};
use crate::error::{Error, Result};
use crate::models::{
    validate_budget_fields, Budget, BudgetProgress, BudgetStatus, BudgetSummary, BudgetUpdate,
    DateRange, NewBudget,
};
use crate::period;

const BUDGET_COLUMNS: &str =
    "id, category, monthly_limit, alert_threshold, rollover, created_at, updated_at";

impl Database {
    /// Create a budget. At most one budget may exist per category; the insert
    /// is conditional on the UNIQUE index so concurrent creators cannot both win.
    pub fn create_budget(&self, budget: &NewBudget) -> Result<Budget> {
        budget.validate()?;
        let conn = self.conn()?;
        let ts = now();

        let inserted = conn.execute(
            r#"
            INSERT INTO budgets (category, monthly_limit, alert_threshold, rollover, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(category) DO NOTHING
            "#,
            params![
                budget.category,
                budget.monthly_limit,
                budget.alert_threshold,
                budget.rollover,
                format_datetime(&ts),
                format_datetime(&ts),
            ],
        )?;

        if inserted == 0 {
            return Err(Error::DuplicateBudget(budget.category.clone()));
        }

        let id = conn.last_insert_rowid();
        info!(id, category = %budget.category, limit = budget.monthly_limit, "Created budget");

        Ok(Budget {
            id,
            category: budget.category.clone(),
            monthly_limit: budget.monthly_limit,
            alert_threshold: budget.alert_threshold,
            rollover: budget.rollover,
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn get_budget(&self, id: i64) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                &format!("SELECT {} FROM budgets WHERE id = ?", BUDGET_COLUMNS),
                params![id],
                Self::row_to_budget,
            )
            .optional()?;
        Ok(budget)
    }

    pub fn get_budget_by_category(&self, category: &str) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                &format!("SELECT {} FROM budgets WHERE category = ?", BUDGET_COLUMNS),
                params![category],
                Self::row_to_budget,
            )
            .optional()?;
        Ok(budget)
    }

    /// All budgets, oldest first
    pub fn list_budgets(&self) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM budgets ORDER BY id", BUDGET_COLUMNS))?;
        let budgets = stmt
            .query_map([], Self::row_to_budget)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(budgets)
    }

    /// Merge `update` into the stored budget. Moving a budget onto a category
    /// that already has one yields `DuplicateBudget`.
    pub fn update_budget(&self, id: i64, update: &BudgetUpdate) -> Result<WriteOutcome<Budget>> {
        let Some(mut budget) = self.get_budget(id)? else {
            return Ok(WriteOutcome::NotFound);
        };

        if let Some(ref c) = update.category {
            budget.category = c.clone();
        }
        if let Some(limit) = update.monthly_limit {
            budget.monthly_limit = limit;
        }
        if let Some(t) = update.alert_threshold {
            budget.alert_threshold = t;
        }
        if let Some(r) = update.rollover {
            budget.rollover = r;
        }
        validate_budget_fields(&budget.category, budget.monthly_limit, budget.alert_threshold)?;
        budget.updated_at = now();

        let conn = self.conn()?;
        let result = conn.execute(
            r#"
            UPDATE budgets SET category = ?, monthly_limit = ?, alert_threshold = ?,
                rollover = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                budget.category,
                budget.monthly_limit,
                budget.alert_threshold,
                budget.rollover,
                format_datetime(&budget.updated_at),
                id,
            ],
        );

        match result {
            Ok(0) => Ok(WriteOutcome::NotFound),
            Ok(_) => Ok(WriteOutcome::Applied(budget)),
            Err(ref e) if is_constraint_violation(e) => {
                Err(Error::DuplicateBudget(budget.category))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_budget(&self, id: i64) -> Result<WriteOutcome<()>> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM budgets WHERE id = ?", params![id])?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            Ok(WriteOutcome::Applied(()))
        }
    }

    /// Progress of one budget through the month containing `today`
    pub fn budget_progress(&self, budget: &Budget, today: NaiveDate) -> Result<BudgetProgress> {
        let spent = self.category_spending(&budget.category, today)?;
        Ok(compute_budget_progress(budget, spent, today))
    }

    /// Progress for every budget
    pub fn all_budget_progress(&self, today: NaiveDate) -> Result<Vec<BudgetProgress>> {
        let month = DateRange::month_of(today);
        self.list_budgets()?
            .iter()
            .map(|b| {
                let spent = self.category_spending_in(&b.category, month)?;
                Ok(compute_budget_progress(b, spent, today))
            })
            .collect()
    }

    /// Totals across all budgets. Percentages are not clamped.
    pub fn budget_summary(&self, today: NaiveDate) -> Result<BudgetSummary> {
        let progress = self.all_budget_progress(today)?;
        Ok(summarize_budgets(&progress))
    }

    /// Budgets in the warning or over state
    pub fn budget_alerts(&self, today: NaiveDate) -> Result<Vec<BudgetProgress>> {
        Ok(self
            .all_budget_progress(today)?
            .into_iter()
            .filter(|p| p.status != BudgetStatus::Under)
            .collect())
    }

    /// How much can still be spent per day for the rest of the month
    pub fn daily_spending_recommendation(&self, budget: &Budget, today: NaiveDate) -> Result<f64> {
        let progress = self.budget_progress(budget, today)?;
        Ok(daily_allowance(&progress))
    }

    pub(crate) fn restore_budget(conn: &rusqlite::Connection, budget: &Budget) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO budgets (id, category, monthly_limit, alert_threshold, rollover, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                budget.id,
                budget.category,
                budget.monthly_limit,
                budget.alert_threshold,
                budget.rollover,
                format_datetime(&budget.created_at),
                format_datetime(&budget.updated_at),
            ],
        )?;
        Ok(())
    }

    fn row_to_budget(row: &rusqlite::Row) -> rusqlite::Result<Budget> {
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;
        Ok(Budget {
            id: row.get(0)?,
            category: row.get(1)?,
            monthly_limit: row.get(2)?,
            alert_threshold: row.get(3)?,
            rollover: row.get(4)?,
            created_at: parse_datetime(5, &created_at_str)?,
            updated_at: parse_datetime(6, &updated_at_str)?,
        })
    }
}

/// Budget progress from the month-to-date spend.
///
/// Today counts as an elapsed day, so the run-rate divisor is never zero.
pub fn compute_budget_progress(budget: &Budget, spent: f64, today: NaiveDate) -> BudgetProgress {
    let limit = budget.monthly_limit;
    let percentage = if limit > 0.0 { spent / limit * 100.0 } else { 0.0 };

    let status = if percentage >= 100.0 {
        BudgetStatus::Over
    } else if percentage >= budget.alert_threshold {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Under
    };

    let days_remaining = period::days_between(today, period::month_end(today)) + 1;
    let days_elapsed = period::days_between(period::month_start(today), today) + 1;
    let projected_total = spent / days_elapsed as f64 * period::days_in_month(today) as f64;

    debug!(category = %budget.category, spent, percentage, %status, "Budget progress");

    BudgetProgress {
        budget: budget.clone(),
        spent,
        remaining: (limit - spent).max(0.0),
        percentage,
        status,
        days_remaining,
        projected_total,
    }
}

pub(crate) fn summarize_budgets(progress: &[BudgetProgress]) -> BudgetSummary {
    let total_budgeted: f64 = progress.iter().map(|p| p.budget.monthly_limit).sum();
    let total_spent: f64 = progress.iter().map(|p| p.spent).sum();
    let count = |status: BudgetStatus| progress.iter().filter(|p| p.status == status).count() as i64;

    BudgetSummary {
        total_budgeted,
        total_spent,
        total_remaining: total_budgeted - total_spent,
        overall_percentage: if total_budgeted > 0.0 {
            total_spent / total_budgeted * 100.0
        } else {
            0.0
        },
        budgets_on_track: count(BudgetStatus::Under),
        budgets_at_risk: count(BudgetStatus::Warning),
        budgets_over_budget: count(BudgetStatus::Over),
    }
}

pub(crate) fn daily_allowance(progress: &BudgetProgress) -> f64 {
    if progress.days_remaining <= 0 {
        return 0.0;
    }
    progress.remaining / progress.days_remaining as f64
}
