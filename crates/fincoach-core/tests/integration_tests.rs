//! Integration tests for fincoach-core
//!
//! These tests exercise the bank sync → budget → dashboard → export workflow
//! through the public API only.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fincoach_core::{
    analytics,
    bank::{self, BankDataSource},
    db::{Database, TransactionFilter},
    models::{BudgetStatus, GoalStatus, NewBudget, NewGoal, NewTransaction, TransactionType},
    plaid::{
        AccountsResponse, ConnectedInstitution, ExchangeTokenResponse, LinkTokenResponse,
        PlaidTransaction, SyncResponse, TransactionsResponse,
    },
    Error, Result,
};
use serde_json::json;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bank_row(id: &str, amount: f64, date: NaiveDate, name: &str, category: &[&str]) -> PlaidTransaction {
    PlaidTransaction {
        transaction_id: id.to_string(),
        account_id: "acc-1".to_string(),
        amount,
        date,
        name: name.to_string(),
        merchant_name: Some(name.to_string()),
        category: Some(category.iter().map(|c| c.to_string()).collect()),
        pending: false,
    }
}

/// Bank with one healthy item and one that always fails
struct FixtureBank {
    rows: Vec<PlaidTransaction>,
}

impl FixtureBank {
    const GOOD_ITEM: &'static str = "item-good";
    const BROKEN_ITEM: &'static str = "item-broken";

    fn october() -> Self {
        Self {
            rows: vec![
                bank_row("tx-1", 120.0, d(2026, 10, 2), "Trader Joe's", &["Shops", "Supermarkets and Groceries"]),
                bank_row("tx-2", 64.5, d(2026, 10, 5), "Chez Panisse", &["Food and Drink", "Restaurants"]),
                bank_row("tx-3", 45.0, d(2026, 10, 6), "Shell", &["Transportation", "Gas Stations"]),
                bank_row("tx-4", -3200.0, d(2026, 10, 1), "Acme Payroll", &["Transfer", "Payroll"]),
                bank_row("tx-5", 0.0, d(2026, 10, 7), "Card Verification", &["Bank Fees"]),
            ],
        }
    }
}

#[async_trait]
impl BankDataSource for FixtureBank {
    async fn create_link_token(&self) -> Result<LinkTokenResponse> {
        Ok(LinkTokenResponse {
            link_token: "link-fixture".to_string(),
        })
    }

    async fn exchange_token(
        &self,
        _public_token: &str,
        institution: serde_json::Value,
    ) -> Result<ExchangeTokenResponse> {
        Ok(ExchangeTokenResponse {
            item_id: Self::GOOD_ITEM.to_string(),
            institution,
        })
    }

    async fn accounts(&self, item_id: &str) -> Result<AccountsResponse> {
        Err(Error::UnknownItem(item_id.to_string()))
    }

    async fn transactions(
        &self,
        item_id: &str,
        _start: Option<NaiveDate>,
        _end: Option<NaiveDate>,
    ) -> Result<TransactionsResponse> {
        if item_id == Self::BROKEN_ITEM {
            return Err(Error::Aggregator("ITEM_LOGIN_REQUIRED".to_string()));
        }
        Ok(TransactionsResponse {
            transactions: self.rows.clone(),
            accounts: vec![],
            total_transactions: self.rows.len() as i64,
        })
    }

    async fn sync(&self, item_id: &str, _cursor: Option<&str>) -> Result<SyncResponse> {
        Err(Error::UnknownItem(item_id.to_string()))
    }

    async fn institutions(&self) -> Result<Vec<ConnectedInstitution>> {
        Ok([Self::GOOD_ITEM, Self::BROKEN_ITEM]
            .iter()
            .map(|id| ConnectedInstitution {
                item_id: id.to_string(),
                institution: json!({ "name": id }),
                connected_at: Utc::now(),
            })
            .collect())
    }

    async fn remove_item(&self, _item_id: &str) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Workflow Tests
// =============================================================================

#[tokio::test]
async fn test_sync_all_then_budget_progress() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let bank = FixtureBank::october();
    let today = d(2026, 10, 16);

    db.create_budget(&NewBudget::new("food_dining", 200.0))
        .expect("Failed to create budget");

    let summary = bank::sync_all(&db, &bank).await.expect("Sync failed");

    // Zero-amount row is skipped; the broken item is recorded, not fatal
    assert_eq!(summary.imported, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].item_id, FixtureBank::BROKEN_ITEM);

    let progress = db.all_budget_progress(today).unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].spent, 184.5);
    assert_eq!(progress[0].status, BudgetStatus::Warning);

    // Second sync imports nothing new
    let again = bank::sync_all(&db, &bank).await.unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(db.count_transactions().unwrap(), 4);
}

#[tokio::test]
async fn test_imported_rows_are_tagged_and_typed() {
    let db = Database::in_memory().unwrap();
    let bank = FixtureBank::october();

    bank::sync_institution(&db, &bank, FixtureBank::GOOD_ITEM)
        .await
        .unwrap();

    let income = db
        .list_transactions(&TransactionFilter::new().transaction_type(TransactionType::Income))
        .unwrap();
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].amount, 3200.0);
    assert_eq!(income[0].external_id.as_deref(), Some("tx-4"));
    assert!(income[0].tags.contains(&bank::BANK_IMPORT_TAG.to_string()));

    let gas = db.get_transaction_by_external_id("tx-3").unwrap().unwrap();
    assert_eq!(gas.category, "transportation");
    assert_eq!(
        gas.notes.as_deref(),
        Some("Imported from bank - Transportation > Gas Stations")
    );
}

#[tokio::test]
async fn test_dashboard_after_manual_entries() {
    let db = Database::in_memory().unwrap();
    let today = d(2026, 10, 16);

    db.create_transaction(&NewTransaction::expense(60.0, "food_dining", "Market", d(2026, 10, 10)))
        .unwrap();
    db.create_transaction(&NewTransaction::expense(40.0, "entertainment", "Cinema", d(2026, 10, 12)))
        .unwrap();
    db.create_transaction(&NewTransaction::income(1000.0, "freelance", "Client", d(2026, 10, 1)))
        .unwrap();
    // Outside the trailing window
    db.create_transaction(&NewTransaction::expense(500.0, "shopping", "Store", d(2026, 8, 1)))
        .unwrap();
    db.create_budget(&NewBudget::new("food_dining", 300.0)).unwrap();

    let dashboard = analytics::dashboard(&db, today).await.unwrap();

    assert_eq!(dashboard.totals.total_spent, 100.0);
    assert_eq!(dashboard.totals.total_income, 1000.0);
    assert_eq!(dashboard.category_breakdown[0].category, "food_dining");
    assert_eq!(dashboard.category_breakdown[0].percentage, 60.0);
    assert_eq!(dashboard.recent_transactions.len(), 4);
    assert_eq!(dashboard.budget_progress.len(), 1);
    assert_eq!(dashboard.budget_summary.total_spent, 60.0);
}

#[test]
fn test_goal_lifecycle() {
    let db = Database::in_memory().unwrap();

    let goal = db
        .create_goal(&NewGoal::new("Vacation", 1500.0, d(2027, 3, 1)))
        .unwrap();
    assert_eq!(goal.status, GoalStatus::Active);

    db.contribute_to_goal(goal.id, 1000.0).unwrap();
    let done = db.contribute_to_goal(goal.id, 500.0).unwrap().applied().unwrap();
    assert_eq!(done.status, GoalStatus::Completed);

    let summary = db.goals_summary().unwrap();
    assert_eq!(summary.completed_goals, 1);
    assert_eq!(summary.active_goals, 0);
}

#[test]
fn test_export_to_file_and_restore_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let source = Database::new_unencrypted(dir.path().join("source.db").to_str().unwrap()).unwrap();

    source
        .create_transaction(&NewTransaction::expense(12.0, "food_dining", "Deli", d(2026, 10, 3)))
        .unwrap();
    source.create_budget(&NewBudget::new("food_dining", 250.0)).unwrap();
    let conversation = source.create_conversation(None).unwrap();
    source
        .add_message(conversation.id, &fincoach_core::models::NewMessage::user("hi"))
        .unwrap();

    let export_path = dir.path().join("fincoach-export.json");
    std::fs::write(&export_path, source.export_json().unwrap()).unwrap();

    let target = Database::new_unencrypted(dir.path().join("target.db").to_str().unwrap()).unwrap();
    let json = std::fs::read_to_string(&export_path).unwrap();
    let stats = target.import_json(&json).unwrap();

    assert_eq!(stats.transactions, 1);
    assert_eq!(stats.budgets, 1);
    assert_eq!(stats.messages, 1);
    assert_eq!(
        target.list_conversations().unwrap(),
        source.list_conversations().unwrap()
    );
}

#[test]
fn test_encrypted_database_reopens_with_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secure.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new_with_key(path, Some("correct horse")).unwrap();
        db.create_transaction(&NewTransaction::expense(9.0, "other", "Kiosk", d(2026, 10, 1)))
            .unwrap();
    }

    let reopened = Database::new_with_key(path, Some("correct horse")).unwrap();
    assert_eq!(reopened.count_transactions().unwrap(), 1);

    assert!(Database::new_with_key(path, Some("wrong")).is_err());
}
