//! Bank sync: pull aggregator transactions into the local store
//!
//! The aggregator is reached through a [`BankDataSource`]: either the
//! in-process [`PlaidProxy`](crate::plaid::PlaidProxy) or a [`ProxyClient`]
//! talking to a running FinCoach server. Imports are deduplicated by the
//! aggregator's transaction id.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::{Database, TransactionInsertResult};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionType};
use crate::plaid::{
    AccountsResponse, ConnectedInstitution, ExchangeTokenRequest, ExchangeTokenResponse,
    InstitutionsResponse, LinkTokenResponse, PlaidTransaction, SyncRequest, SyncResponse,
    TransactionsResponse,
};

/// Default proxy address for [`ProxyClient::from_env`]
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Tag attached to every imported transaction
pub const BANK_IMPORT_TAG: &str = "bank-import";

/// Access to linked bank items through the proxy operations
#[async_trait]
pub trait BankDataSource: Send + Sync {
    /// Start a Link session
    async fn create_link_token(&self) -> Result<LinkTokenResponse>;

    /// Trade a Link public token for a stored item
    async fn exchange_token(
        &self,
        public_token: &str,
        institution: serde_json::Value,
    ) -> Result<ExchangeTokenResponse>;

    async fn accounts(&self, item_id: &str) -> Result<AccountsResponse>;

    /// Transactions in `[start, end]`; defaults to the trailing 30 days
    async fn transactions(
        &self,
        item_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TransactionsResponse>;

    async fn sync(&self, item_id: &str, cursor: Option<&str>) -> Result<SyncResponse>;

    /// Every linked item
    async fn institutions(&self) -> Result<Vec<ConnectedInstitution>>;

    async fn remove_item(&self, item_id: &str) -> Result<()>;
}

/// Aggregator category keys, checked in order. First substring match wins.
const CATEGORY_MAP: &[(&str, &str)] = &[
    ("food and drink", "food_dining"),
    ("restaurants", "food_dining"),
    ("coffee shop", "food_dining"),
    ("fast food", "food_dining"),
    ("groceries", "food_dining"),
    ("supermarkets and groceries", "food_dining"),
    ("transportation", "transportation"),
    ("gas stations", "transportation"),
    ("taxi", "transportation"),
    ("ride share", "transportation"),
    ("public transportation", "transportation"),
    ("shops", "shopping"),
    ("clothing", "shopping"),
    ("electronics", "shopping"),
    ("entertainment", "entertainment"),
    ("recreation", "entertainment"),
    ("gyms and fitness centers", "health"),
    ("travel", "travel"),
    ("healthcare", "health"),
    ("pharmacies", "health"),
    ("medical", "health"),
    ("rent", "housing"),
    ("mortgage", "housing"),
    ("utilities", "utilities"),
    ("telecommunication services", "utilities"),
    ("internet", "utilities"),
    ("payment", "other"),
    ("transfer", "other"),
    ("bank fees", "other"),
];

/// Map the aggregator's category path onto an app category id.
///
/// Only the first two levels are considered, case-insensitively.
pub fn map_external_category(categories: &[String]) -> &'static str {
    let primary = categories.first().map(|c| c.to_lowercase()).unwrap_or_default();
    let secondary = categories.get(1).map(|c| c.to_lowercase()).unwrap_or_default();

    CATEGORY_MAP
        .iter()
        .find(|(key, _)| primary.contains(key) || secondary.contains(key))
        .map(|(_, category)| *category)
        .unwrap_or("other")
}

/// Turn posted aggregator transactions into new local transactions.
///
/// Pending rows are dropped. Positive amounts (money out) become expenses.
/// A blank merchant name falls back to the raw description.
pub fn convert_external_transactions(transactions: &[PlaidTransaction]) -> Vec<NewTransaction> {
    transactions
        .iter()
        .filter(|t| !t.pending)
        .map(|t| {
            let categories = t.category.as_deref().unwrap_or_default();
            let notes = match &t.category {
                Some(path) => format!("Imported from bank - {}", path.join(" > ")),
                None => "Imported from bank".to_string(),
            };
            NewTransaction {
                amount: t.amount.abs(),
                transaction_type: if t.amount > 0.0 {
                    TransactionType::Expense
                } else {
                    TransactionType::Income
                },
                category: map_external_category(categories).to_string(),
                subcategory: None,
                merchant: t
                    .merchant_name
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(&t.name)
                    .to_string(),
                description: t.name.clone(),
                date: t.date,
                payment_method: None,
                tags: vec![BANK_IMPORT_TAG.to_string()],
                notes: Some(notes),
                external_id: Some(t.transaction_id.clone()),
            }
        })
        .collect()
}

/// Outcome of syncing one linked item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResult {
    pub item_id: String,
    /// Rows returned by the aggregator, pending included
    pub fetched: usize,
    pub imported: usize,
    /// Already-imported or unusable rows
    pub skipped: usize,
    /// Newly created transactions
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFailure {
    pub item_id: String,
    pub error: String,
}

/// Accumulated outcome of syncing every linked item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub results: Vec<SyncResult>,
    pub failures: Vec<SyncFailure>,
    pub imported: usize,
    pub skipped: usize,
}

/// Import the item's recent transactions, skipping ones already stored
pub async fn sync_institution(
    db: &Database,
    source: &dyn BankDataSource,
    item_id: &str,
) -> Result<SyncResult> {
    let response = source.transactions(item_id, None, None).await?;
    let converted = convert_external_transactions(&response.transactions);

    let mut result = SyncResult {
        item_id: item_id.to_string(),
        fetched: response.transactions.len(),
        ..Default::default()
    };

    for tx in &converted {
        match db.insert_imported_transaction(tx) {
            Ok(TransactionInsertResult::Inserted(created)) => {
                result.imported += 1;
                result.transactions.push(created);
            }
            Ok(TransactionInsertResult::Duplicate(_)) => result.skipped += 1,
            Err(Error::InvalidData(reason)) => {
                debug!(external_id = ?tx.external_id, %reason, "Skipping unusable bank row");
                result.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        item_id,
        fetched = result.fetched,
        imported = result.imported,
        skipped = result.skipped,
        "Bank sync finished"
    );
    Ok(result)
}

/// Sync every linked item in turn. A failing item is recorded, not fatal.
pub async fn sync_all(db: &Database, source: &dyn BankDataSource) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();

    for institution in source.institutions().await? {
        match sync_institution(db, source, &institution.item_id).await {
            Ok(result) => {
                summary.imported += result.imported;
                summary.skipped += result.skipped;
                summary.results.push(result);
            }
            Err(e) => {
                warn!(item_id = %institution.item_id, error = %e, "Bank sync failed");
                summary.failures.push(SyncFailure {
                    item_id: institution.item_id,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

/// HTTP client of a running proxy's `/api/plaid/*` endpoints
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http_client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ProxyErrorBody {
    error: String,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Uses `FINCOACH_API_URL`, falling back to the local default
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("FINCOACH_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/plaid{}", self.base_url, path)
    }

    async fn decode<R: DeserializeOwned>(
        response: reqwest::Response,
        item_id: Option<&str>,
    ) -> Result<R> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ProxyErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);

        match (status, item_id) {
            (StatusCode::NOT_FOUND, Some(item_id)) => Err(Error::UnknownItem(item_id.to_string())),
            (StatusCode::SERVICE_UNAVAILABLE, _) => Err(Error::AggregatorNotConfigured),
            _ => Err(Error::Aggregator(format!("{} ({})", message, status))),
        }
    }
}

#[async_trait]
impl BankDataSource for ProxyClient {
    async fn create_link_token(&self) -> Result<LinkTokenResponse> {
        let response = self
            .http_client
            .post(self.url("/create-link-token"))
            .send()
            .await?;
        Self::decode(response, None).await
    }

    async fn exchange_token(
        &self,
        public_token: &str,
        institution: serde_json::Value,
    ) -> Result<ExchangeTokenResponse> {
        let response = self
            .http_client
            .post(self.url("/exchange-token"))
            .json(&ExchangeTokenRequest {
                public_token: public_token.to_string(),
                institution,
            })
            .send()
            .await?;
        Self::decode(response, None).await
    }

    async fn accounts(&self, item_id: &str) -> Result<AccountsResponse> {
        let response = self
            .http_client
            .get(self.url(&format!("/accounts/{}", item_id)))
            .send()
            .await?;
        Self::decode(response, Some(item_id)).await
    }

    async fn transactions(
        &self,
        item_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TransactionsResponse> {
        let mut query = Vec::new();
        if let Some(start) = start {
            query.push(("startDate", start.to_string()));
        }
        if let Some(end) = end {
            query.push(("endDate", end.to_string()));
        }

        let response = self
            .http_client
            .get(self.url(&format!("/transactions/{}", item_id)))
            .query(&query)
            .send()
            .await?;
        Self::decode(response, Some(item_id)).await
    }

    async fn sync(&self, item_id: &str, cursor: Option<&str>) -> Result<SyncResponse> {
        let response = self
            .http_client
            .post(self.url(&format!("/transactions/sync/{}", item_id)))
            .json(&SyncRequest {
                cursor: cursor.map(String::from),
            })
            .send()
            .await?;
        Self::decode(response, Some(item_id)).await
    }

    async fn institutions(&self) -> Result<Vec<ConnectedInstitution>> {
        let response = self
            .http_client
            .get(self.url("/institutions"))
            .send()
            .await?;
        let listed: InstitutionsResponse = Self::decode(response, None).await?;
        Ok(listed.institutions)
    }

    async fn remove_item(&self, item_id: &str) -> Result<()> {
        let response = self
            .http_client
            .delete(self.url(&format!("/item/{}", item_id)))
            .send()
            .await?;
        let _: serde_json::Value = Self::decode(response, Some(item_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plaid::{PlaidClient, PlaidProxy};
    use crate::test_utils::MockPlaidServer;

    fn plaid_tx(id: &str, amount: f64, category: Option<&[&str]>, pending: bool) -> PlaidTransaction {
        PlaidTransaction {
            transaction_id: id.into(),
            account_id: "acc-1".into(),
            amount,
            date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            name: "SQ *BLUE BOTTLE".into(),
            merchant_name: Some("Blue Bottle".into()),
            category: category.map(|c| c.iter().map(|s| s.to_string()).collect()),
            pending,
        }
    }

    fn cats(path: &[&str]) -> Vec<String> {
        path.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_map_external_category() {
        assert_eq!(map_external_category(&cats(&["Food and Drink", "Restaurants"])), "food_dining");
        assert_eq!(map_external_category(&cats(&["Travel", "Taxi"])), "transportation");
        assert_eq!(map_external_category(&cats(&["Travel", "Airlines"])), "travel");
        assert_eq!(map_external_category(&cats(&["Service", "Utilities"])), "utilities");
        assert_eq!(map_external_category(&cats(&["Payment", "Rent"])), "housing");
        assert_eq!(map_external_category(&cats(&["Transfer", "Debit"])), "other");
        assert_eq!(map_external_category(&cats(&["Something", "Unmapped"])), "other");
        assert_eq!(map_external_category(&[]), "other");
    }

    #[test]
    fn test_first_match_in_table_order_wins() {
        // "shops" precedes "clothing"; "travel" precedes "healthcare"
        assert_eq!(map_external_category(&cats(&["Shops", "Clothing"])), "shopping");
        assert_eq!(map_external_category(&cats(&["Healthcare", "Travel"])), "travel");
    }

    #[test]
    fn test_convert_external_transactions() {
        let converted = convert_external_transactions(&[
            plaid_tx("t1", 4.33, Some(&["Food and Drink", "Coffee Shop"]), false),
            plaid_tx("t2", -1500.0, None, false),
            plaid_tx("t3", 20.0, None, true),
        ]);

        assert_eq!(converted.len(), 2);

        let coffee = &converted[0];
        assert_eq!(coffee.amount, 4.33);
        assert_eq!(coffee.transaction_type, TransactionType::Expense);
        assert_eq!(coffee.category, "food_dining");
        assert_eq!(coffee.merchant, "Blue Bottle");
        assert_eq!(coffee.description, "SQ *BLUE BOTTLE");
        assert_eq!(
            coffee.notes.as_deref(),
            Some("Imported from bank - Food and Drink > Coffee Shop")
        );
        assert_eq!(coffee.tags, vec!["bank-import".to_string()]);
        assert_eq!(coffee.external_id.as_deref(), Some("t1"));

        let deposit = &converted[1];
        assert_eq!(deposit.amount, 1500.0);
        assert_eq!(deposit.transaction_type, TransactionType::Income);
        assert_eq!(deposit.notes.as_deref(), Some("Imported from bank"));
    }

    #[test]
    fn test_merchant_falls_back_to_name() {
        let mut tx = plaid_tx("t1", 10.0, None, false);
        tx.merchant_name = None;
        let converted = convert_external_transactions(&[tx]);
        assert_eq!(converted[0].merchant, "SQ *BLUE BOTTLE");
    }

    #[test]
    fn test_blank_merchant_falls_back_to_name() {
        let mut empty = plaid_tx("t1", 10.0, None, false);
        empty.merchant_name = Some(String::new());
        let mut spaces = plaid_tx("t2", 10.0, None, false);
        spaces.merchant_name = Some("   ".into());

        let converted = convert_external_transactions(&[empty, spaces]);
        assert_eq!(converted[0].merchant, "SQ *BLUE BOTTLE");
        assert_eq!(converted[1].merchant, "SQ *BLUE BOTTLE");
        assert!(converted.iter().all(|t| t.validate().is_ok()));
    }

    async fn linked(server: &MockPlaidServer, db: &Database) -> (PlaidProxy, String) {
        let proxy = PlaidProxy::new(PlaidClient::new(&server.url(), "id", "secret"), db.clone());
        let item = proxy
            .exchange_token(MockPlaidServer::PUBLIC_TOKEN, serde_json::json!({"name": "Bank"}))
            .await
            .unwrap();
        (proxy, item.item_id)
    }

    #[tokio::test]
    async fn test_repeat_sync_imports_nothing_new() {
        let server = MockPlaidServer::start().await;
        let db = Database::in_memory().unwrap();
        let (proxy, item_id) = linked(&server, &db).await;

        let first = sync_institution(&db, &proxy, &item_id).await.unwrap();
        assert!(first.imported > 0);
        assert_eq!(first.transactions.len(), first.imported);
        let stored = db.count_transactions().unwrap();
        assert_eq!(stored, first.imported as i64);

        let second = sync_institution(&db, &proxy, &item_id).await.unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, first.imported + first.skipped);
        assert_eq!(db.count_transactions().unwrap(), stored);
    }

    #[tokio::test]
    async fn test_sync_all_accumulates() {
        let server = MockPlaidServer::start().await;
        let db = Database::in_memory().unwrap();
        let (proxy, _) = linked(&server, &db).await;

        let summary = sync_all(&db, &proxy).await.unwrap();
        assert_eq!(summary.results.len(), 1);
        assert!(summary.failures.is_empty());
        assert_eq!(summary.imported, summary.results[0].imported);
    }

    #[tokio::test]
    async fn test_sync_unknown_item() {
        let server = MockPlaidServer::start().await;
        let db = Database::in_memory().unwrap();
        let (proxy, _) = linked(&server, &db).await;

        let result = sync_institution(&db, &proxy, "nope").await;
        assert!(matches!(result, Err(Error::UnknownItem(_))));
    }
}
