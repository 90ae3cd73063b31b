//! Savings goal operations and pacing

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{format_datetime, now, parse_date, parse_datetime, parse_string_list, Database, WriteOutcome};
use crate::error::{Error, Result};
use crate::models::{
    validate_goal_fields, Goal, GoalProgress, GoalStatus, GoalUpdate, GoalsSummary, NewGoal,
};
use crate::period;

const GOAL_COLUMNS: &str = "id, name, description, target_amount, current_amount, deadline, \
     priority, category, status, motivations, created_at, updated_at";

/// Actual progress may trail the time-based expectation by this factor and
/// still count as on track
const ON_TRACK_TOLERANCE: f64 = 0.85;

impl Database {
    /// Create a goal. The saved amount defaults to 0 and the goal starts active.
    pub fn create_goal(&self, goal: &NewGoal) -> Result<Goal> {
        goal.validate()?;
        let ts = now();
        let mut created = Goal {
            id: 0,
            name: goal.name.trim().to_string(),
            description: goal.description.clone(),
            target_amount: goal.target_amount,
            current_amount: goal.current_amount.unwrap_or(0.0),
            deadline: goal.deadline,
            priority: goal.priority,
            category: goal.category.clone(),
            status: GoalStatus::Active,
            motivations: goal.motivations.clone(),
            created_at: ts,
            updated_at: ts,
        };
        created.apply_auto_completion();

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO goals (name, description, target_amount, current_amount, deadline,
                priority, category, status, motivations, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                created.name,
                created.description,
                created.target_amount,
                created.current_amount,
                created.deadline.to_string(),
                created.priority.as_str(),
                created.category,
                created.status.as_str(),
                serde_json::to_string(&created.motivations)?,
                format_datetime(&ts),
                format_datetime(&ts),
            ],
        )?;
        created.id = conn.last_insert_rowid();

        info!(id = created.id, name = %created.name, target = created.target_amount, "Created goal");
        Ok(created)
    }

    pub fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let goal = conn
            .query_row(
                &format!("SELECT {} FROM goals WHERE id = ?", GOAL_COLUMNS),
                params![id],
                Self::row_to_goal,
            )
            .optional()?;
        Ok(goal)
    }

    /// All goals, oldest first
    pub fn list_goals(&self) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM goals ORDER BY id", GOAL_COLUMNS))?;
        let goals = stmt
            .query_map([], Self::row_to_goal)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(goals)
    }

    pub fn goals_by_status(&self, status: GoalStatus) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM goals WHERE status = ? ORDER BY id",
            GOAL_COLUMNS
        ))?;
        let goals = stmt
            .query_map(params![status.as_str()], Self::row_to_goal)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(goals)
    }

    /// Merge `update` into the stored goal.
    ///
    /// An active goal whose saved amount reaches the target becomes completed.
    /// The reverse never happens automatically.
    pub fn update_goal(&self, id: i64, update: &GoalUpdate) -> Result<WriteOutcome<Goal>> {
        let Some(mut goal) = self.get_goal(id)? else {
            return Ok(WriteOutcome::NotFound);
        };

        let before = goal.status;
        update.apply_to(&mut goal);
        validate_goal_fields(&goal.name, goal.target_amount, goal.current_amount)?;
        goal.apply_auto_completion();
        goal.updated_at = now();

        if before != GoalStatus::Completed && goal.status == GoalStatus::Completed {
            info!(id, name = %goal.name, "Goal completed");
        }

        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE goals SET name = ?, description = ?, target_amount = ?, current_amount = ?,
                deadline = ?, priority = ?, category = ?, status = ?, motivations = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                goal.name,
                goal.description,
                goal.target_amount,
                goal.current_amount,
                goal.deadline.to_string(),
                goal.priority.as_str(),
                goal.category,
                goal.status.as_str(),
                serde_json::to_string(&goal.motivations)?,
                format_datetime(&goal.updated_at),
                id,
            ],
        )?;

        if changed == 0 {
            return Ok(WriteOutcome::NotFound);
        }
        Ok(WriteOutcome::Applied(goal))
    }

    pub fn delete_goal(&self, id: i64) -> Result<WriteOutcome<()>> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM goals WHERE id = ?", params![id])?;
        if changed == 0 {
            Ok(WriteOutcome::NotFound)
        } else {
            Ok(WriteOutcome::Applied(()))
        }
    }

    /// Add `amount` to the saved total; same as an update of `current_amount`.
    /// The amount must be positive and finite.
    pub fn contribute_to_goal(&self, id: i64, amount: f64) -> Result<WriteOutcome<Goal>> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(Error::InvalidData(
                "Contribution must be greater than 0".to_string(),
            ));
        }
        let Some(goal) = self.get_goal(id)? else {
            return Ok(WriteOutcome::NotFound);
        };
        debug!(id, amount, "Goal contribution");
        self.update_goal(
            id,
            &GoalUpdate {
                current_amount: Some(goal.current_amount + amount),
                ..Default::default()
            },
        )
    }

    /// Pacing for every active goal
    pub fn all_goal_progress(&self, today: NaiveDate) -> Result<Vec<GoalProgress>> {
        Ok(self
            .goals_by_status(GoalStatus::Active)?
            .iter()
            .map(|g| compute_goal_progress(g, today))
            .collect())
    }

    /// Counts of active/completed goals and saved-vs-target totals across all goals
    pub fn goals_summary(&self) -> Result<GoalsSummary> {
        let goals = self.list_goals()?;
        let active: Vec<&Goal> = goals
            .iter()
            .filter(|g| g.status == GoalStatus::Active)
            .collect();
        let completed = goals
            .iter()
            .filter(|g| g.status == GoalStatus::Completed)
            .count();

        let total_saved: f64 = goals.iter().map(|g| g.current_amount).sum();
        let total_target: f64 = goals.iter().map(|g| g.target_amount).sum();

        Ok(GoalsSummary {
            active_goals: active.len() as i64,
            completed_goals: completed as i64,
            total_saved,
            total_target,
            overall_percentage: if total_target > 0.0 {
                total_saved / total_target * 100.0
            } else {
                0.0
            },
        })
    }

    pub(crate) fn restore_goal(conn: &rusqlite::Connection, goal: &Goal) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO goals (id, name, description, target_amount, current_amount, deadline,
                priority, category, status, motivations, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                goal.id,
                goal.name,
                goal.description,
                goal.target_amount,
                goal.current_amount,
                goal.deadline.to_string(),
                goal.priority.as_str(),
                goal.category,
                goal.status.as_str(),
                serde_json::to_string(&goal.motivations)?,
                format_datetime(&goal.created_at),
                format_datetime(&goal.updated_at),
            ],
        )?;
        Ok(())
    }

    fn row_to_goal(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
        let deadline_str: String = row.get(5)?;
        let priority_str: String = row.get(6)?;
        let status_str: String = row.get(8)?;
        let motivations_str: String = row.get(9)?;
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;
        Ok(Goal {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            target_amount: row.get(3)?,
            current_amount: row.get(4)?,
            deadline: parse_date(5, &deadline_str)?,
            priority: priority_str.parse().unwrap_or(crate::models::GoalPriority::Medium),
            category: row.get(7)?,
            status: status_str.parse().unwrap_or(GoalStatus::Active),
            motivations: parse_string_list(&motivations_str),
            created_at: parse_datetime(10, &created_at_str)?,
            updated_at: parse_datetime(11, &updated_at_str)?,
        })
    }
}

/// Pacing for one goal as of `today`. Pure: reads only the goal's fields.
///
/// Period counts are calendar differences truncated toward zero. When a count
/// is zero or negative the full remaining amount is required in that period.
pub fn compute_goal_progress(goal: &Goal, today: NaiveDate) -> GoalProgress {
    let amount_remaining = (goal.target_amount - goal.current_amount).max(0.0);
    let percentage = if goal.target_amount > 0.0 {
        (goal.current_amount / goal.target_amount * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let days_remaining = period::days_between(today, goal.deadline);
    let weeks_remaining = days_remaining / 7;
    let months_remaining = period::months_between(today, goal.deadline);

    let per_period = |periods: i64| {
        if periods > 0 {
            amount_remaining / periods as f64
        } else {
            amount_remaining
        }
    };

    let total_days = period::days_between(goal.created_at.date_naive(), goal.deadline);
    let elapsed_days = total_days - days_remaining;
    let expected_progress = if total_days > 0 {
        elapsed_days as f64 / total_days as f64 * 100.0
    } else {
        100.0
    };
    let on_track = goal.status == GoalStatus::Completed
        || percentage >= expected_progress * ON_TRACK_TOLERANCE;

    GoalProgress {
        goal: goal.clone(),
        amount_remaining,
        percentage,
        days_remaining,
        weeks_remaining,
        months_remaining,
        monthly_required: per_period(months_remaining),
        weekly_required: per_period(weeks_remaining),
        on_track,
    }
}
