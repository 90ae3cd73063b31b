//! Spending analytics and the dashboard rollup
//!
//! Everything here is read-only and derived from the transaction and budget
//! tables. Expenses only, unless a report says otherwise.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{Database, TransactionFilter};
use crate::error::Result;
use crate::models::{
    BudgetProgress, BudgetSummary, DateRange, Transaction, TransactionStats, TransactionType,
};
use crate::period;

/// Days covered by the dashboard window (today minus this, through today)
pub const DASHBOARD_WINDOW_DAYS: i64 = 30;

/// Number of transactions shown on the dashboard
pub const DASHBOARD_RECENT_LIMIT: i64 = 10;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySpending {
    pub date: NaiveDate,
    pub amount: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyComparison {
    /// Short month label, e.g. "Oct 2026"
    pub month: String,
    pub total_spent: f64,
    pub total_income: f64,
    pub net_amount: f64,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOfWeekSpending {
    pub day: String,
    pub total: f64,
    pub count: i64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantSpending {
    pub merchant: String,
    pub amount: f64,
    pub count: i64,
}

/// A category's share of total expense spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub amount: f64,
    pub count: i64,
    pub percentage: f64,
}

/// Headline totals for the dashboard window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub total_spent: f64,
    pub total_income: f64,
    pub net_amount: f64,
    pub transaction_count: i64,
    pub average_expense: f64,
}

impl From<&TransactionStats> for PeriodTotals {
    fn from(stats: &TransactionStats) -> Self {
        Self {
            total_spent: stats.total_expenses,
            total_income: stats.total_income,
            net_amount: stats.net_amount,
            transaction_count: stats.transaction_count,
            average_expense: stats.average_expense,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub period: DateRange,
    pub totals: PeriodTotals,
    pub budget_summary: BudgetSummary,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub recent_transactions: Vec<Transaction>,
    pub daily_spending: Vec<DailySpending>,
    pub budget_progress: Vec<BudgetProgress>,
}

fn expenses_in(range: Option<DateRange>) -> TransactionFilter {
    let filter = TransactionFilter::new().transaction_type(TransactionType::Expense);
    match range {
        Some(range) => filter.date_range(range),
        None => filter,
    }
}

/// Expense totals for every day in `range`, ascending, zero-filled
pub fn daily_spending(db: &Database, range: DateRange) -> Result<Vec<DailySpending>> {
    let transactions = db.list_transactions(&expenses_in(Some(range)))?;

    let mut buckets: Vec<DailySpending> = range
        .days()
        .map(|date| DailySpending {
            date,
            amount: 0.0,
            count: 0,
        })
        .collect();

    for tx in &transactions {
        let offset = period::days_between(range.start, tx.date);
        if let Some(bucket) = usize::try_from(offset).ok().and_then(|i| buckets.get_mut(i)) {
            bucket.amount += tx.amount;
            bucket.count += 1;
        }
    }

    Ok(buckets)
}

/// Daily series from the first of the month through `today`
pub fn current_month_daily_spending(db: &Database, today: NaiveDate) -> Result<Vec<DailySpending>> {
    daily_spending(db, DateRange::new(period::month_start(today), today))
}

/// Totals for each of the last `months` calendar months, oldest first.
/// The month containing `today` is the last entry.
pub fn monthly_comparison(
    db: &Database,
    months: u32,
    today: NaiveDate,
) -> Result<Vec<MonthlyComparison>> {
    let mut results = Vec::with_capacity(months as usize);

    for back in (0..months).rev() {
        let month_date = period::add_months(today, -(back as i32));
        let stats = db.transaction_stats(DateRange::month_of(month_date))?;
        results.push(MonthlyComparison {
            month: month_date.format("%b %Y").to_string(),
            total_spent: stats.total_expenses,
            total_income: stats.total_income,
            net_amount: stats.net_amount,
            transaction_count: stats.transaction_count,
        });
    }

    Ok(results)
}

/// All-time expense totals bucketed by weekday, Sunday first
pub fn spending_by_day_of_week(db: &Database) -> Result<Vec<DayOfWeekSpending>> {
    let transactions = db.list_transactions(&expenses_in(None))?;

    let mut totals = [(0.0_f64, 0_i64); 7];
    for tx in &transactions {
        let idx = tx.date.weekday().num_days_from_sunday() as usize;
        totals[idx].0 += tx.amount;
        totals[idx].1 += 1;
    }

    Ok(DAY_NAMES
        .iter()
        .zip(totals)
        .map(|(day, (total, count))| DayOfWeekSpending {
            day: day.to_string(),
            total,
            count,
            average: if count > 0 { total / count as f64 } else { 0.0 },
        })
        .collect())
}

/// Merchants ranked by expense spend, largest first
pub fn top_merchants(
    db: &Database,
    limit: usize,
    range: Option<DateRange>,
) -> Result<Vec<MerchantSpending>> {
    let transactions = db.list_transactions(&expenses_in(range))?;

    let mut by_merchant: HashMap<&str, (f64, i64)> = HashMap::new();
    for tx in &transactions {
        let entry = by_merchant.entry(tx.merchant.as_str()).or_default();
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let mut ranked: Vec<MerchantSpending> = by_merchant
        .into_iter()
        .map(|(merchant, (amount, count))| MerchantSpending {
            merchant: merchant.to_string(),
            amount,
            count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.merchant.cmp(&b.merchant))
    });
    ranked.truncate(limit);

    Ok(ranked)
}

/// Attach percentage-of-total to a category rollup
pub fn with_percentages(spending: Vec<crate::models::CategorySpending>) -> Vec<CategoryBreakdown> {
    let total: f64 = spending.iter().map(|c| c.amount).sum();
    spending
        .into_iter()
        .map(|c| CategoryBreakdown {
            percentage: if total > 0.0 {
                c.amount / total * 100.0
            } else {
                0.0
            },
            category: c.category,
            amount: c.amount,
            count: c.count,
        })
        .collect()
}

/// Everything the dashboard shows. The six reads run concurrently.
pub async fn dashboard(db: &Database, today: NaiveDate) -> Result<DashboardData> {
    let window = DateRange::trailing_days(today, DASHBOARD_WINDOW_DAYS);

    let (stats, budget_summary, categories, recent_transactions, daily, budget_progress) = tokio::try_join!(
        db.blocking(move |db| db.transaction_stats(window)),
        db.blocking(move |db| db.budget_summary(today)),
        db.blocking(move |db| db.spending_by_category(window)),
        db.blocking(|db| db.recent_transactions(DASHBOARD_RECENT_LIMIT)),
        db.blocking(move |db| daily_spending(db, window)),
        db.blocking(move |db| db.all_budget_progress(today)),
    )?;

    debug!(
        transactions = stats.transaction_count,
        budgets = budget_progress.len(),
        "Dashboard assembled"
    );

    Ok(DashboardData {
        period: window,
        totals: PeriodTotals::from(&stats),
        budget_summary,
        category_breakdown: with_percentages(categories),
        recent_transactions,
        daily_spending: daily,
        budget_progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBudget, NewTransaction};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn spend(db: &Database, amount: f64, category: &str, merchant: &str, date: NaiveDate) {
        db.create_transaction(&NewTransaction::expense(amount, category, merchant, date))
            .unwrap();
    }

    #[test]
    fn test_daily_spending_zero_filled() {
        let db = Database::in_memory().unwrap();
        spend(&db, 10.0, "other", "A", d(2026, 10, 2));
        spend(&db, 5.0, "other", "B", d(2026, 10, 2));
        spend(&db, 7.0, "other", "C", d(2026, 10, 4));
        db.create_transaction(&NewTransaction::income(99.0, "salary", "Job", d(2026, 10, 3)))
            .unwrap();

        let series = daily_spending(&db, DateRange::new(d(2026, 10, 1), d(2026, 10, 5))).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0].date, d(2026, 10, 1));
        assert_eq!(series[0].amount, 0.0);
        assert_eq!(series[1].amount, 15.0);
        assert_eq!(series[1].count, 2);
        assert_eq!(series[2].count, 0);
        assert_eq!(series[3].amount, 7.0);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_current_month_daily_spending_ends_today() {
        let db = Database::in_memory().unwrap();
        let series = current_month_daily_spending(&db, d(2026, 10, 16)).unwrap();
        assert_eq!(series.len(), 16);
        assert_eq!(series.last().unwrap().date, d(2026, 10, 16));
    }

    #[test]
    fn test_monthly_comparison_oldest_first() {
        let db = Database::in_memory().unwrap();
        spend(&db, 100.0, "other", "A", d(2026, 8, 15));
        spend(&db, 40.0, "other", "B", d(2026, 10, 1));
        db.create_transaction(&NewTransaction::income(500.0, "salary", "Job", d(2026, 10, 1)))
            .unwrap();

        let months = monthly_comparison(&db, 3, d(2026, 10, 16)).unwrap();
        let labels: Vec<_> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["Aug 2026", "Sep 2026", "Oct 2026"]);
        assert_eq!(months[0].total_spent, 100.0);
        assert_eq!(months[1].transaction_count, 0);
        assert_eq!(months[2].net_amount, 460.0);
    }

    #[test]
    fn test_monthly_comparison_across_year_boundary() {
        let db = Database::in_memory().unwrap();
        let months = monthly_comparison(&db, 2, d(2027, 1, 31)).unwrap();
        assert_eq!(months[0].month, "Dec 2026");
        assert_eq!(months[1].month, "Jan 2027");
    }

    #[test]
    fn test_spending_by_day_of_week() {
        let db = Database::in_memory().unwrap();
        // 2026-10-18 is a Sunday
        spend(&db, 10.0, "other", "A", d(2026, 10, 18));
        spend(&db, 30.0, "other", "B", d(2026, 10, 25));
        spend(&db, 8.0, "other", "C", d(2026, 10, 20));

        let days = spending_by_day_of_week(&db).unwrap();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].day, "Sunday");
        assert_eq!(days[0].total, 40.0);
        assert_eq!(days[0].average, 20.0);
        assert_eq!(days[2].day, "Tuesday");
        assert_eq!(days[2].count, 1);
        assert_eq!(days[6].average, 0.0);
    }

    #[test]
    fn test_top_merchants() {
        let db = Database::in_memory().unwrap();
        spend(&db, 10.0, "other", "Cafe", d(2026, 10, 1));
        spend(&db, 15.0, "other", "Cafe", d(2026, 10, 2));
        spend(&db, 60.0, "other", "Grocer", d(2026, 10, 3));
        spend(&db, 5.0, "other", "Kiosk", d(2026, 10, 4));
        spend(&db, 500.0, "other", "Old", d(2025, 1, 1));

        let top = top_merchants(&db, 2, Some(DateRange::month_of(d(2026, 10, 1)))).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].merchant, "Grocer");
        assert_eq!(top[1].merchant, "Cafe");
        assert_eq!(top[1].amount, 25.0);
        assert_eq!(top[1].count, 2);

        let all_time = top_merchants(&db, 1, None).unwrap();
        assert_eq!(all_time[0].merchant, "Old");
    }

    #[test]
    fn test_with_percentages() {
        let breakdown = with_percentages(vec![
            crate::models::CategorySpending {
                category: "housing".into(),
                amount: 75.0,
                count: 1,
            },
            crate::models::CategorySpending {
                category: "other".into(),
                amount: 25.0,
                count: 3,
            },
        ]);
        assert_eq!(breakdown[0].percentage, 75.0);
        assert_eq!(breakdown[1].percentage, 25.0);
        assert!(with_percentages(vec![]).is_empty());
    }

    #[tokio::test]
    async fn test_dashboard() {
        let db = Database::in_memory().unwrap();
        let today = d(2026, 10, 16);
        spend(&db, 30.0, "food_dining", "Cafe", d(2026, 10, 10));
        spend(&db, 70.0, "housing", "Landlord", d(2026, 9, 20));
        // Outside the 30-day window
        spend(&db, 999.0, "housing", "Landlord", d(2026, 9, 15));
        db.create_budget(&NewBudget::new("food_dining", 100.0)).unwrap();

        let dashboard = dashboard(&db, today).await.unwrap();

        assert_eq!(dashboard.period.start, d(2026, 9, 16));
        assert_eq!(dashboard.totals.total_spent, 100.0);
        assert_eq!(dashboard.totals.transaction_count, 2);
        assert_eq!(dashboard.daily_spending.len(), 31);
        assert_eq!(dashboard.recent_transactions.len(), 3);
        assert_eq!(dashboard.category_breakdown[0].category, "housing");
        assert_eq!(dashboard.category_breakdown[0].percentage, 70.0);
        assert_eq!(dashboard.budget_progress.len(), 1);
        assert_eq!(dashboard.budget_summary.total_spent, 30.0);
    }
}
