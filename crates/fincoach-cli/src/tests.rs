//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::{NaiveDate, Utc};
use clap::Parser;
use fincoach_core::db::{Database, TransactionFilter};
use fincoach_core::models::{GoalStatus, NewBudget, NewGoal, NewTransaction, TransactionType};
use fincoach_core::plaid::{PlaidClient, PlaidProxy};
use fincoach_core::test_utils::MockPlaidServer;

use crate::cli::{BankAction, Cli, Commands, ReportType, TransactionsAction};
use crate::commands::{self, progress_bar, truncate, NewEntry};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn entry<'a>(amount: f64, category: &'a str, merchant: &'a str) -> NewEntry<'a> {
    NewEntry {
        amount,
        category,
        merchant,
        income: false,
        date: None,
        description: None,
        tags: None,
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_defaults() {
    let cli = Cli::try_parse_from(["fincoach", "serve"]).unwrap();
    assert_eq!(cli.db.to_str(), Some("fincoach.db"));
    assert!(!cli.verbose);
    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            assert_eq!(port, 3001);
            assert_eq!(host, "127.0.0.1");
            assert!(static_dir.is_none());
        }
        _ => panic!("expected serve"),
    }
}

#[test]
fn test_parse_transaction_add() {
    let cli = Cli::try_parse_from([
        "fincoach",
        "--db",
        "test.db",
        "transactions",
        "add",
        "42.5",
        "--category",
        "salary",
        "--merchant",
        "Acme",
        "--income",
        "--date",
        "2026-10-01",
    ])
    .unwrap();

    assert_eq!(cli.db.to_str(), Some("test.db"));
    match cli.command {
        Commands::Transactions {
            action:
                Some(TransactionsAction::Add {
                    amount,
                    income,
                    date,
                    ..
                }),
        } => {
            assert_eq!(amount, 42.5);
            assert!(income);
            assert_eq!(date, Some(d(2026, 10, 1)));
        }
        _ => panic!("expected transactions add"),
    }
}

#[test]
fn test_parse_rejects_bad_date() {
    let result = Cli::try_parse_from([
        "fincoach", "goals", "add", "Trip", "900", "--deadline", "next-june",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_chat_joins_words() {
    let cli = Cli::try_parse_from(["fincoach", "chat", "how", "am", "I", "doing?"]).unwrap();
    match cli.command {
        Commands::Chat { message } => assert_eq!(message.join(" "), "how am I doing?"),
        _ => panic!("expected chat"),
    }
}

#[test]
fn test_parse_report_and_bank() {
    let cli = Cli::try_parse_from(["fincoach", "report", "monthly", "--months", "3"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Report {
            report_type: ReportType::Monthly { months: 3 }
        }
    ));

    let cli = Cli::try_parse_from(["fincoach", "bank", "sync", "--item", "item-1"]).unwrap();
    match cli.command {
        Commands::Bank {
            action: BankAction::Sync { item },
        } => assert_eq!(item.as_deref(), Some("item-1")),
        _ => panic!("expected bank sync"),
    }
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer merchant name", 10), "a much ...");
    assert_eq!(truncate("Café Crème Brûlée", 8), "Café ...");
}

#[test]
fn test_progress_bar() {
    assert_eq!(progress_bar(0.0, 4), "░░░░");
    assert_eq!(progress_bar(50.0, 4), "██░░");
    // Overspending never overflows the bar
    assert_eq!(progress_bar(180.0, 4), "████");
}

// ========== Transaction Command Tests ==========

#[test]
fn test_cmd_transactions_list_empty() {
    let db = setup_test_db();
    assert!(commands::cmd_transactions_list(&db, 20, None).is_ok());
}

#[test]
fn test_cmd_transactions_add_defaults_to_today() {
    let db = setup_test_db();
    let mut new = entry(12.5, "food_dining", "Deli");
    new.tags = Some("lunch, work ,");

    commands::cmd_transactions_add(&db, new).unwrap();

    let all = db.list_transactions(&TransactionFilter::new()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].date, Utc::now().date_naive());
    assert_eq!(all[0].transaction_type, TransactionType::Expense);
    assert_eq!(all[0].tags, vec!["lunch".to_string(), "work".to_string()]);
}

#[test]
fn test_cmd_transactions_add_income() {
    let db = setup_test_db();
    let mut new = entry(3000.0, "salary", "Acme");
    new.income = true;
    new.date = Some(d(2026, 10, 1));

    commands::cmd_transactions_add(&db, new).unwrap();

    let income = db
        .list_transactions(&TransactionFilter::new().transaction_type(TransactionType::Income))
        .unwrap();
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].amount, 3000.0);
}

#[test]
fn test_cmd_transactions_add_invalid() {
    let db = setup_test_db();
    let result = commands::cmd_transactions_add(&db, entry(0.0, "food_dining", "Deli"));
    assert!(result.is_err());
    assert_eq!(db.count_transactions().unwrap(), 0);
}

#[test]
fn test_cmd_transactions_delete() {
    let db = setup_test_db();
    let tx = db
        .create_transaction(&NewTransaction::expense(5.0, "other", "Kiosk", d(2026, 10, 2)))
        .unwrap();

    commands::cmd_transactions_delete(&db, tx.id).unwrap();
    assert!(db.get_transaction(tx.id).unwrap().is_none());

    let result = commands::cmd_transactions_delete(&db, tx.id);
    assert!(result.unwrap_err().to_string().contains("not found"));
}

// ========== Budget Command Tests ==========

#[test]
fn test_cmd_budgets_add_and_list() {
    let db = setup_test_db();
    commands::cmd_budgets_add(&db, "food_dining", 400.0, 90.0).unwrap();

    let budget = db.get_budget_by_category("food_dining").unwrap().unwrap();
    assert_eq!(budget.alert_threshold, 90.0);
    assert!(commands::cmd_budgets_list(&db).is_ok());
}

#[test]
fn test_cmd_budgets_add_duplicate() {
    let db = setup_test_db();
    db.create_budget(&NewBudget::new("shopping", 100.0)).unwrap();

    let result = commands::cmd_budgets_add(&db, "shopping", 200.0, 80.0);
    assert!(result.is_err());
}

#[test]
fn test_cmd_budgets_delete_missing() {
    let db = setup_test_db();
    assert!(commands::cmd_budgets_delete(&db, 7).is_err());
}

// ========== Goal Command Tests ==========

#[test]
fn test_cmd_goals_contribute_completes() {
    let db = setup_test_db();
    let goal = db
        .create_goal(&NewGoal::new("Bike", 300.0, d(2027, 4, 1)))
        .unwrap();

    commands::cmd_goals_contribute(&db, goal.id, 300.0).unwrap();

    let goal = db.get_goal(goal.id).unwrap().unwrap();
    assert_eq!(goal.status, GoalStatus::Completed);
    assert!(commands::cmd_goals_list(&db).is_ok());
}

#[test]
fn test_cmd_goals_contribute_rejects_non_positive() {
    let db = setup_test_db();
    let goal = db
        .create_goal(&NewGoal::new("Bike", 300.0, d(2027, 4, 1)))
        .unwrap();

    assert!(commands::cmd_goals_contribute(&db, goal.id, 0.0).is_err());
    assert!(commands::cmd_goals_contribute(&db, goal.id, f64::NAN).is_err());
    assert_eq!(db.get_goal(goal.id).unwrap().unwrap().current_amount, 0.0);
}

// ========== Report Command Tests ==========

#[tokio::test]
async fn test_cmd_reports_with_data() {
    let db = setup_test_db();
    let today = Utc::now().date_naive();
    db.create_transaction(&NewTransaction::expense(30.0, "food_dining", "Market", today))
        .unwrap();
    db.create_budget(&NewBudget::new("food_dining", 100.0)).unwrap();

    assert!(commands::cmd_report_dashboard(&db).await.is_ok());
    assert!(commands::cmd_report_monthly(&db, 6).is_ok());
    assert!(commands::cmd_report_merchants(&db, 5).is_ok());
    assert!(commands::cmd_report_weekday(&db).is_ok());
}

// ========== Data Command Tests ==========

#[test]
fn test_cmd_export_import_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let backup = dir.path().join("backup.json");

    let source = setup_test_db();
    source
        .create_transaction(&NewTransaction::expense(8.0, "entertainment", "Arcade", d(2026, 10, 4)))
        .unwrap();
    commands::cmd_export_json(&source, &backup).unwrap();

    let target = setup_test_db();
    target
        .create_transaction(&NewTransaction::expense(99.0, "shopping", "Old", d(2026, 9, 1)))
        .unwrap();
    commands::cmd_import(&target, &backup, true).unwrap();

    let all = target.list_transactions(&TransactionFilter::new()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].merchant, "Arcade");
}

#[test]
fn test_cmd_import_missing_file() {
    let db = setup_test_db();
    let result = commands::cmd_import(&db, std::path::Path::new("/nonexistent/backup.json"), true);
    assert!(result.unwrap_err().to_string().contains("Failed to read"));
}

#[test]
fn test_cmd_export_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transactions.csv");
    let db = setup_test_db();
    db.create_transaction(&NewTransaction::expense(3.5, "food_dining", "Bakery", d(2026, 10, 9)))
        .unwrap();

    commands::cmd_export_csv(&db, &path).unwrap();

    let csv = std::fs::read_to_string(&path).unwrap();
    assert!(csv.lines().next().unwrap().starts_with("date,type,amount"));
    assert!(csv.contains("2026-10-09,expense,3.50"));
}

#[test]
fn test_cmd_reset_with_yes() {
    let db = setup_test_db();
    db.create_transaction(&NewTransaction::expense(3.5, "food_dining", "Bakery", d(2026, 10, 9)))
        .unwrap();

    commands::cmd_reset(&db, true).unwrap();
    assert_eq!(db.count_transactions().unwrap(), 0);
}

// ========== Bank Command Tests ==========

#[tokio::test]
async fn test_cmd_bank_sync_and_institutions() {
    let server = MockPlaidServer::start().await;
    let db = setup_test_db();
    db.save_linked_item(
        MockPlaidServer::ITEM_ID,
        MockPlaidServer::ACCESS_TOKEN,
        &serde_json::json!({ "name": "First Platypus Bank" }),
    )
    .unwrap();
    let proxy = PlaidProxy::new(PlaidClient::new(&server.url(), "client", "secret"), db.clone());

    commands::cmd_bank_institutions(&proxy).await.unwrap();
    commands::cmd_bank_sync(&db, &proxy, None).await.unwrap();
    assert_eq!(db.count_transactions().unwrap(), 3);

    commands::cmd_bank_sync(&db, &proxy, Some(MockPlaidServer::ITEM_ID))
        .await
        .unwrap();
    assert_eq!(db.count_transactions().unwrap(), 3);

    assert!(commands::cmd_bank_sync(&db, &proxy, Some("item-unknown"))
        .await
        .is_err());
}
