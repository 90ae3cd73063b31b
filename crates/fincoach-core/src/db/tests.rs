//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn expense(db: &Database, amount: f64, category: &str, merchant: &str, date: NaiveDate) -> Transaction {
        db.create_transaction(&NewTransaction::expense(amount, category, merchant, date))
            .unwrap()
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.count_transactions().unwrap(), 0);
        assert!(db.list_budgets().unwrap().is_empty());
        assert!(db.list_goals().unwrap().is_empty());
        assert!(db.list_conversations().unwrap().is_empty());
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fincoach.db");
        let path = path.to_str().unwrap();

        let db = Database::new_unencrypted(path).unwrap();
        expense(&db, 10.0, "other", "Shop", d(2026, 10, 1));
        drop(db);

        let reopened = Database::new_unencrypted(path).unwrap();
        assert_eq!(reopened.count_transactions().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_stored_dates_are_errors() {
        let db = Database::in_memory().unwrap();
        let tx = expense(&db, 10.0, "other", "Shop", d(2026, 10, 1));
        let goal = db
            .create_goal(&NewGoal::new("Trip", 900.0, d(2027, 6, 1)))
            .unwrap();

        let conn = db.conn().unwrap();
        conn.execute(
            "UPDATE transactions SET date = 'someday' WHERE id = ?",
            rusqlite::params![tx.id],
        )
        .unwrap();
        conn.execute(
            "UPDATE goals SET created_at = '16/10/2026' WHERE id = ?",
            rusqlite::params![goal.id],
        )
        .unwrap();
        drop(conn);

        assert!(db.get_transaction(tx.id).is_err());
        assert!(db.list_transactions(&TransactionFilter::new()).is_err());
        assert!(db.get_goal(goal.id).is_err());
    }

    // ========== Transaction Tests ==========

    #[test]
    fn test_create_transaction_defaults() {
        let db = Database::in_memory().unwrap();
        let tx = expense(&db, 12.5, "food_dining", "Corner Cafe", d(2026, 10, 3));

        assert!(tx.id > 0);
        assert!(tx.tags.is_empty());
        assert_eq!(tx.description, "");
        assert_eq!(tx.created_at, tx.updated_at);

        let fetched = db.get_transaction(tx.id).unwrap().unwrap();
        assert_eq!(fetched, tx);
    }

    #[test]
    fn test_create_transaction_rejects_invalid_amount() {
        let db = Database::in_memory().unwrap();
        let result = db.create_transaction(&NewTransaction::expense(0.0, "other", "X", d(2026, 1, 1)));
        assert!(matches!(result, Err(crate::Error::InvalidData(_))));

        let result =
            db.create_transaction(&NewTransaction::expense(2e9, "other", "X", d(2026, 1, 1)));
        assert!(matches!(result, Err(crate::Error::InvalidData(_))));
    }

    #[test]
    fn test_update_transaction_merges_fields() {
        let db = Database::in_memory().unwrap();
        let mut new_tx = NewTransaction::expense(40.0, "shopping", "Store", d(2026, 10, 2));
        new_tx.notes = Some("gift".into());
        let tx = db.create_transaction(&new_tx).unwrap();

        let updated = db
            .update_transaction(
                tx.id,
                &TransactionUpdate {
                    amount: Some(45.0),
                    tags: Some(vec!["birthday".into()]),
                    notes: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap()
            .applied()
            .unwrap();

        assert_eq!(updated.amount, 45.0);
        assert_eq!(updated.merchant, "Store");
        assert_eq!(updated.tags, vec!["birthday".to_string()]);
        assert_eq!(updated.notes, None);

        let fetched = db.get_transaction(tx.id).unwrap().unwrap();
        assert_eq!(fetched, updated);
    }

    #[test]
    fn test_update_and_delete_missing_transaction_is_not_found() {
        let db = Database::in_memory().unwrap();
        let outcome = db
            .update_transaction(999, &TransactionUpdate::default())
            .unwrap();
        assert!(outcome.is_not_found());
        assert!(db.delete_transaction(999).unwrap().is_not_found());
    }

    #[test]
    fn test_delete_transaction() {
        let db = Database::in_memory().unwrap();
        let tx = expense(&db, 5.0, "other", "Kiosk", d(2026, 10, 1));
        assert!(db.delete_transaction(tx.id).unwrap().is_applied());
        assert!(db.get_transaction(tx.id).unwrap().is_none());
    }

    #[test]
    fn test_list_sorted_by_date_descending() {
        let db = Database::in_memory().unwrap();
        expense(&db, 1.0, "other", "A", d(2026, 10, 1));
        expense(&db, 2.0, "other", "B", d(2026, 10, 9));
        expense(&db, 3.0, "other", "C", d(2026, 10, 5));

        let all = db.list_transactions(&TransactionFilter::new()).unwrap();
        let merchants: Vec<_> = all.iter().map(|t| t.merchant.as_str()).collect();
        assert_eq!(merchants, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_filter_criteria_combine_with_and() {
        let db = Database::in_memory().unwrap();
        expense(&db, 20.0, "food_dining", "Green Market", d(2026, 10, 1));
        expense(&db, 80.0, "food_dining", "Green Market", d(2026, 10, 2));
        expense(&db, 25.0, "shopping", "Green Market", d(2026, 10, 3));
        db.create_transaction(&NewTransaction::income(30.0, "food_dining", "Green Market", d(2026, 10, 4)))
            .unwrap();

        let filter = TransactionFilter::new()
            .category("food_dining")
            .transaction_type(TransactionType::Expense)
            .merchant("green")
            .amount_range(None, Some(50.0));
        let results = db.list_transactions(&filter).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].amount, 20.0);
    }

    #[test]
    fn test_filter_date_range_inclusive() {
        let db = Database::in_memory().unwrap();
        expense(&db, 1.0, "other", "A", d(2026, 9, 30));
        expense(&db, 2.0, "other", "B", d(2026, 10, 1));
        expense(&db, 3.0, "other", "C", d(2026, 10, 31));
        expense(&db, 4.0, "other", "D", d(2026, 11, 1));

        let filter = TransactionFilter::new().date_range(DateRange::month_of(d(2026, 10, 15)));
        let results = db.list_transactions(&filter).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_filter_search_covers_notes_and_category() {
        let db = Database::in_memory().unwrap();
        let mut with_notes = NewTransaction::expense(9.0, "other", "Hardware", d(2026, 10, 1));
        with_notes.notes = Some("Replacement DRILL bits".into());
        db.create_transaction(&with_notes).unwrap();
        expense(&db, 15.0, "entertainment", "Cinema", d(2026, 10, 2));
        expense(&db, 3.0, "other", "Bakery", d(2026, 10, 3));

        let by_notes = db
            .list_transactions(&TransactionFilter::new().search(Some("drill")))
            .unwrap();
        assert_eq!(by_notes.len(), 1);
        assert_eq!(by_notes[0].merchant, "Hardware");

        let by_category = db
            .list_transactions(&TransactionFilter::new().search(Some("entertain")))
            .unwrap();
        assert_eq!(by_category.len(), 1);
    }

    #[test]
    fn test_merchant_filter_is_any_of() {
        let db = Database::in_memory().unwrap();
        expense(&db, 1.0, "other", "Blue Bottle", d(2026, 10, 1));
        expense(&db, 2.0, "other", "Trader Joe's", d(2026, 10, 2));
        expense(&db, 3.0, "other", "Shell", d(2026, 10, 3));

        let results = db
            .list_transactions(&TransactionFilter::new().merchant("bottle").merchant("TRADER"))
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_text_filters_fold_non_ascii_case() {
        let db = Database::in_memory().unwrap();
        expense(&db, 4.5, "food_dining", "Café Olé", d(2026, 10, 1));
        expense(&db, 2.0, "food_dining", "Cafe Plain", d(2026, 10, 2));

        let by_search = db
            .list_transactions(&TransactionFilter::new().search(Some("CAFÉ")))
            .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].merchant, "Café Olé");

        let by_merchant = db
            .list_transactions(&TransactionFilter::new().merchant("CAFÉ OLÉ"))
            .unwrap();
        assert_eq!(by_merchant.len(), 1);
    }

    #[test]
    fn test_transaction_stats() {
        let db = Database::in_memory().unwrap();
        expense(&db, 50.0, "food_dining", "A", d(2026, 10, 1));
        expense(&db, 50.0, "shopping", "B", d(2026, 10, 5));
        expense(&db, 20.0, "shopping", "C", d(2026, 10, 3));
        db.create_transaction(&NewTransaction::income(1000.0, "salary", "Employer", d(2026, 10, 1)))
            .unwrap();

        let stats = db
            .transaction_stats(DateRange::month_of(d(2026, 10, 1)))
            .unwrap();
        assert_eq!(stats.total_income, 1000.0);
        assert_eq!(stats.total_expenses, 120.0);
        assert_eq!(stats.net_amount, 880.0);
        assert_eq!(stats.transaction_count, 4);
        assert_eq!(stats.average_expense, 40.0);
        // Tie on 50: first encountered in date-descending order wins
        assert_eq!(stats.largest_expense.unwrap().merchant, "B");
    }

    #[test]
    fn test_stats_empty_range() {
        let db = Database::in_memory().unwrap();
        let stats = db
            .transaction_stats(DateRange::month_of(d(2026, 10, 1)))
            .unwrap();
        assert_eq!(stats.transaction_count, 0);
        assert_eq!(stats.average_expense, 0.0);
        assert!(stats.largest_expense.is_none());
    }

    #[test]
    fn test_spending_by_category_sorted_and_sums_match() {
        let db = Database::in_memory().unwrap();
        expense(&db, 10.0, "food_dining", "A", d(2026, 10, 1));
        expense(&db, 15.0, "food_dining", "A", d(2026, 10, 2));
        expense(&db, 40.0, "housing", "Landlord", d(2026, 10, 1));
        expense(&db, 5.0, "other", "Misc", d(2026, 10, 4));
        db.create_transaction(&NewTransaction::income(500.0, "salary", "Job", d(2026, 10, 1)))
            .unwrap();

        let range = DateRange::month_of(d(2026, 10, 1));
        let breakdown = db.spending_by_category(range).unwrap();
        let categories: Vec<_> = breakdown.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["housing", "food_dining", "other"]);
        assert_eq!(breakdown[1].count, 2);

        let total: f64 = breakdown.iter().map(|c| c.amount).sum();
        assert_eq!(total, db.transaction_stats(range).unwrap().total_expenses);
    }

    #[test]
    fn test_merchants_distinct_sorted() {
        let db = Database::in_memory().unwrap();
        expense(&db, 1.0, "other", "Zed", d(2026, 10, 1));
        expense(&db, 1.0, "other", "Alpha", d(2026, 10, 1));
        expense(&db, 1.0, "other", "Zed", d(2026, 10, 2));
        assert_eq!(db.merchants().unwrap(), vec!["Alpha", "Zed"]);
    }

    #[test]
    fn test_imported_transaction_dedup() {
        let db = Database::in_memory().unwrap();
        let mut tx = NewTransaction::expense(42.5, "food_dining", "Cafe", d(2026, 10, 1));
        tx.external_id = Some("plaid-tx-1".into());

        let first = db.insert_imported_transaction(&tx).unwrap();
        let TransactionInsertResult::Inserted(created) = first else {
            panic!("expected insert");
        };
        let second = db.insert_imported_transaction(&tx).unwrap();
        assert!(matches!(second, TransactionInsertResult::Duplicate(id) if id == created.id));
        assert_eq!(db.count_transactions().unwrap(), 1);
    }

    // ========== Budget Tests ==========

    #[test]
    fn test_duplicate_budget_category_rejected() {
        let db = Database::in_memory().unwrap();
        db.create_budget(&NewBudget::new("food_dining", 300.0)).unwrap();
        let result = db.create_budget(&NewBudget::new("food_dining", 500.0));
        assert!(matches!(result, Err(crate::Error::DuplicateBudget(ref c)) if c == "food_dining"));
        assert_eq!(db.list_budgets().unwrap().len(), 1);
    }

    #[test]
    fn test_budget_update_onto_existing_category_rejected() {
        let db = Database::in_memory().unwrap();
        db.create_budget(&NewBudget::new("food_dining", 300.0)).unwrap();
        let other = db.create_budget(&NewBudget::new("travel", 200.0)).unwrap();

        let result = db.update_budget(
            other.id,
            &BudgetUpdate {
                category: Some("food_dining".into()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(crate::Error::DuplicateBudget(_))));
    }

    #[test]
    fn test_budget_threshold_validation() {
        let db = Database::in_memory().unwrap();
        let mut budget = NewBudget::new("travel", 100.0);
        budget.alert_threshold = 120.0;
        assert!(matches!(
            db.create_budget(&budget),
            Err(crate::Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_budget_progress_over_at_exactly_limit() {
        let db = Database::in_memory().unwrap();
        let today = d(2026, 10, 16);
        expense(&db, 20.0, "food_dining", "A", d(2026, 10, 1));
        expense(&db, 30.0, "food_dining", "B", d(2026, 10, 8));
        expense(&db, 50.0, "food_dining", "C", today);
        // Outside the month; must not count
        expense(&db, 75.0, "food_dining", "D", d(2026, 9, 30));

        let budget = db.create_budget(&NewBudget::new("food_dining", 100.0)).unwrap();
        let progress = db.budget_progress(&budget, today).unwrap();

        assert_eq!(progress.spent, 100.0);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(progress.status, BudgetStatus::Over);
        assert_eq!(progress.remaining, 0.0);
        assert_eq!(progress.days_remaining, 16);
        // 100 over 16 elapsed days, extrapolated to 31
        assert!((progress.projected_total - 193.75).abs() < 1e-9);
    }

    #[test]
    fn test_budget_status_thresholds() {
        let budget = Budget {
            id: 1,
            category: "travel".into(),
            monthly_limit: 200.0,
            alert_threshold: 75.0,
            rollover: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let today = d(2026, 10, 1);

        assert_eq!(compute_budget_progress(&budget, 149.99, today).status, BudgetStatus::Under);
        assert_eq!(compute_budget_progress(&budget, 150.0, today).status, BudgetStatus::Warning);
        assert_eq!(compute_budget_progress(&budget, 199.99, today).status, BudgetStatus::Warning);
        assert_eq!(compute_budget_progress(&budget, 200.0, today).status, BudgetStatus::Over);

        let over = compute_budget_progress(&budget, 300.0, today);
        assert_eq!(over.percentage, 150.0);
        assert_eq!(over.remaining, 0.0);
        // First of the month: one elapsed day
        assert_eq!(over.days_remaining, 31);
        assert_eq!(over.projected_total, 300.0 * 31.0);
    }

    #[test]
    fn test_budget_summary_unclamped() {
        let db = Database::in_memory().unwrap();
        let today = d(2026, 10, 16);
        db.create_budget(&NewBudget::new("food_dining", 100.0)).unwrap();
        db.create_budget(&NewBudget::new("travel", 100.0)).unwrap();
        db.create_budget(&NewBudget::new("shopping", 100.0)).unwrap();
        expense(&db, 250.0, "food_dining", "A", today);
        expense(&db, 80.0, "travel", "B", today);

        let summary = db.budget_summary(today).unwrap();
        assert_eq!(summary.total_budgeted, 300.0);
        assert_eq!(summary.total_spent, 330.0);
        assert_eq!(summary.total_remaining, -30.0);
        assert!((summary.overall_percentage - 110.0).abs() < 1e-9);
        assert_eq!(summary.budgets_on_track, 1);
        assert_eq!(summary.budgets_at_risk, 1);
        assert_eq!(summary.budgets_over_budget, 1);

        let alerts = db.budget_alerts(today).unwrap();
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn test_daily_spending_recommendation() {
        let db = Database::in_memory().unwrap();
        let today = d(2026, 10, 22);
        let budget = db.create_budget(&NewBudget::new("food_dining", 300.0)).unwrap();
        expense(&db, 120.0, "food_dining", "A", d(2026, 10, 2));

        // 180 left over 10 days (22nd..31st)
        let per_day = db.daily_spending_recommendation(&budget, today).unwrap();
        assert!((per_day - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_delete_missing_budget_is_not_found() {
        let db = Database::in_memory().unwrap();
        assert!(db.delete_budget(42).unwrap().is_not_found());
        assert!(db
            .update_budget(42, &BudgetUpdate::default())
            .unwrap()
            .is_not_found());
    }

    // ========== Goal Tests ==========

    #[test]
    fn test_create_goal_defaults() {
        let db = Database::in_memory().unwrap();
        let goal = db
            .create_goal(&NewGoal::new("Emergency fund", 1000.0, d(2027, 6, 1)))
            .unwrap();
        assert_eq!(goal.current_amount, 0.0);
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(db.get_goal(goal.id).unwrap().unwrap(), goal);
    }

    #[test]
    fn test_contribution_completes_goal() {
        let db = Database::in_memory().unwrap();
        let goal = db
            .create_goal(&NewGoal::new("Bike", 500.0, d(2027, 1, 1)))
            .unwrap();

        let after = db.contribute_to_goal(goal.id, 499.0).unwrap().applied().unwrap();
        assert_eq!(after.status, GoalStatus::Active);

        let done = db.contribute_to_goal(goal.id, 1.0).unwrap().applied().unwrap();
        assert_eq!(done.current_amount, 500.0);
        assert_eq!(done.status, GoalStatus::Completed);
    }

    #[test]
    fn test_completed_goal_never_auto_reverts() {
        let db = Database::in_memory().unwrap();
        let goal = db
            .create_goal(&NewGoal::new("Laptop", 100.0, d(2027, 1, 1)))
            .unwrap();
        db.contribute_to_goal(goal.id, 100.0).unwrap();

        let lowered = db
            .update_goal(
                goal.id,
                &GoalUpdate {
                    current_amount: Some(10.0),
                    ..Default::default()
                },
            )
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(lowered.status, GoalStatus::Completed);

        let reopened = db
            .update_goal(
                goal.id,
                &GoalUpdate {
                    status: Some(GoalStatus::Active),
                    ..Default::default()
                },
            )
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(reopened.status, GoalStatus::Active);
    }

    #[test]
    fn test_paused_goal_not_auto_completed() {
        let db = Database::in_memory().unwrap();
        let goal = db
            .create_goal(&NewGoal::new("Trip", 100.0, d(2027, 1, 1)))
            .unwrap();
        db.update_goal(
            goal.id,
            &GoalUpdate {
                status: Some(GoalStatus::Paused),
                ..Default::default()
            },
        )
        .unwrap();
        let paused = db.contribute_to_goal(goal.id, 150.0).unwrap().applied().unwrap();
        assert_eq!(paused.status, GoalStatus::Paused);
    }

    #[test]
    fn test_contributions_associative() {
        let db = Database::in_memory().unwrap();
        let a = db.create_goal(&NewGoal::new("A", 1000.0, d(2027, 1, 1))).unwrap();
        let b = db.create_goal(&NewGoal::new("B", 1000.0, d(2027, 1, 1))).unwrap();

        db.contribute_to_goal(a.id, 125.0).unwrap();
        db.contribute_to_goal(a.id, 75.0).unwrap();
        db.contribute_to_goal(b.id, 200.0).unwrap();

        let a = db.get_goal(a.id).unwrap().unwrap();
        let b = db.get_goal(b.id).unwrap().unwrap();
        assert_eq!(a.current_amount, b.current_amount);
    }

    #[test]
    fn test_contribute_missing_goal() {
        let db = Database::in_memory().unwrap();
        assert!(db.contribute_to_goal(7, 10.0).unwrap().is_not_found());
        assert!(db.delete_goal(7).unwrap().is_not_found());
    }

    #[test]
    fn test_contribution_must_be_positive_and_finite() {
        let db = Database::in_memory().unwrap();
        let goal = db
            .create_goal(&NewGoal::new("Camera", 800.0, d(2027, 3, 1)))
            .unwrap();
        db.contribute_to_goal(goal.id, 50.0).unwrap();

        for amount in [-20.0, 0.0, f64::NAN, f64::INFINITY] {
            let result = db.contribute_to_goal(goal.id, amount);
            assert!(matches!(result, Err(crate::Error::InvalidData(_))), "{amount}");
        }

        let stored = db.get_goal(goal.id).unwrap().unwrap();
        assert_eq!(stored.current_amount, 50.0);
        assert_eq!(stored.status, GoalStatus::Active);
    }

    #[test]
    fn test_goal_progress_pacing() {
        let today = d(2026, 10, 16);
        let goal = Goal {
            id: 1,
            name: "Vacation".into(),
            description: None,
            target_amount: 1200.0,
            current_amount: 0.0,
            deadline: today + Duration::days(365),
            priority: GoalPriority::High,
            category: "travel".into(),
            status: GoalStatus::Active,
            motivations: vec![],
            created_at: today.and_hms_opt(9, 0, 0).unwrap().and_utc(),
            updated_at: today.and_hms_opt(9, 0, 0).unwrap().and_utc(),
        };

        let progress = compute_goal_progress(&goal, today);
        assert_eq!(progress.days_remaining, 365);
        assert_eq!(progress.weeks_remaining, 52);
        assert_eq!(progress.months_remaining, 12);
        assert!((progress.monthly_required - 100.0).abs() < 1e-9);
        assert!(progress.on_track);

        let contributed = Goal {
            current_amount: 100.0,
            ..goal
        };
        let progress = compute_goal_progress(&contributed, today);
        assert!((progress.percentage - 100.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_goal_progress_overdue_requires_everything_now() {
        let today = d(2026, 10, 16);
        let goal = Goal {
            id: 1,
            name: "Late".into(),
            description: None,
            target_amount: 500.0,
            current_amount: 200.0,
            deadline: d(2026, 10, 1),
            priority: GoalPriority::Low,
            category: "other".into(),
            status: GoalStatus::Active,
            motivations: vec![],
            created_at: d(2026, 1, 1).and_hms_opt(0, 0, 0).unwrap().and_utc(),
            updated_at: d(2026, 1, 1).and_hms_opt(0, 0, 0).unwrap().and_utc(),
        };

        let progress = compute_goal_progress(&goal, today);
        assert_eq!(progress.days_remaining, -15);
        assert_eq!(progress.monthly_required, 300.0);
        assert_eq!(progress.weekly_required, 300.0);
        assert!(!progress.on_track);
    }

    #[test]
    fn test_goals_summary() {
        let db = Database::in_memory().unwrap();
        let a = db.create_goal(&NewGoal::new("A", 100.0, d(2027, 1, 1))).unwrap();
        db.create_goal(&NewGoal::new("B", 300.0, d(2027, 1, 1))).unwrap();
        db.contribute_to_goal(a.id, 100.0).unwrap();

        let summary = db.goals_summary().unwrap();
        assert_eq!(summary.active_goals, 1);
        assert_eq!(summary.completed_goals, 1);
        assert_eq!(summary.total_saved, 100.0);
        assert_eq!(summary.total_target, 400.0);
        assert_eq!(summary.overall_percentage, 25.0);

        let active = db.all_goal_progress(d(2026, 10, 16)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].goal.name, "B");
    }

    // ========== Conversation Tests ==========

    #[test]
    fn test_conversation_messages_in_order() {
        let db = Database::in_memory().unwrap();
        let conv = db.create_conversation(Some("Budget help")).unwrap();

        db.add_message(conv.id, &NewMessage::user("How am I doing?")).unwrap();
        db.add_message(conv.id, &NewMessage::assistant("Pretty well.")).unwrap();

        let loaded = db.get_conversation(conv.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Budget help");
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[0].role, MessageRole::User);
        assert_eq!(loaded.messages[1].content, "Pretty well.");
    }

    #[test]
    fn test_default_conversation_title() {
        let db = Database::in_memory().unwrap();
        let conv = db.create_conversation(None).unwrap();
        assert!(conv.title.starts_with("Chat "));
    }

    #[test]
    fn test_add_message_to_missing_conversation() {
        let db = Database::in_memory().unwrap();
        let result = db.add_message(404, &NewMessage::user("hello"));
        assert!(matches!(result, Err(crate::Error::NotFound(_))));
    }

    #[test]
    fn test_delete_conversation_cascades_messages() {
        let db = Database::in_memory().unwrap();
        let conv = db.create_conversation(None).unwrap();
        db.add_message(conv.id, &NewMessage::user("hi")).unwrap();

        assert!(db.delete_conversation(conv.id).unwrap().is_applied());
        let conn = db.conn().unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_clear_and_rename_conversation() {
        let db = Database::in_memory().unwrap();
        let conv = db.create_conversation(None).unwrap();
        db.add_message(conv.id, &NewMessage::user("hi")).unwrap();

        assert!(db.clear_conversation(conv.id).unwrap().is_applied());
        assert!(db
            .update_conversation_title(conv.id, "Renamed")
            .unwrap()
            .is_applied());

        let loaded = db.get_conversation(conv.id).unwrap().unwrap();
        assert!(loaded.messages.is_empty());
        assert_eq!(loaded.title, "Renamed");
        assert!(db.clear_conversation(999).unwrap().is_not_found());
    }

    #[test]
    fn test_get_or_create_current_conversation() {
        let db = Database::in_memory().unwrap();
        let today = chrono::Utc::now().date_naive();

        let first = db.get_or_create_current_conversation(today).unwrap();
        let again = db.get_or_create_current_conversation(today).unwrap();
        assert_eq!(first.id, again.id);

        let tomorrow = today + Duration::days(1);
        let fresh = db.get_or_create_current_conversation(tomorrow).unwrap();
        assert_ne!(fresh.id, first.id);
    }

    // ========== Linked Item Tests ==========

    #[test]
    fn test_linked_items_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.db");
        let path = path.to_str().unwrap();

        let db = Database::new_unencrypted(path).unwrap();
        let institution = serde_json::json!({"name": "First Platypus Bank"});
        db.save_linked_item("item-1", "access-sandbox-1", &institution)
            .unwrap();
        drop(db);

        let reopened = Database::new_unencrypted(path).unwrap();
        let item = reopened.get_linked_item("item-1").unwrap().unwrap();
        assert_eq!(item.access_token, "access-sandbox-1");
        assert_eq!(item.institution["name"], "First Platypus Bank");

        assert!(reopened.remove_linked_item("item-1").unwrap().is_applied());
        assert!(reopened.remove_linked_item("item-1").unwrap().is_not_found());
    }

    #[test]
    fn test_clear_all_keeps_linked_items() {
        let db = Database::in_memory().unwrap();
        expense(&db, 1.0, "other", "A", d(2026, 10, 1));
        db.create_budget(&NewBudget::new("other", 10.0)).unwrap();
        db.create_goal(&NewGoal::new("G", 10.0, d(2027, 1, 1))).unwrap();
        let conv = db.create_conversation(None).unwrap();
        db.add_message(conv.id, &NewMessage::user("hi")).unwrap();
        db.save_linked_item("item-1", "tok", &serde_json::Value::Null)
            .unwrap();

        db.clear_all().unwrap();

        assert_eq!(db.count_transactions().unwrap(), 0);
        assert!(db.list_budgets().unwrap().is_empty());
        assert!(db.list_goals().unwrap().is_empty());
        assert!(db.list_conversations().unwrap().is_empty());
        assert_eq!(db.list_linked_items().unwrap().len(), 1);
    }
}
