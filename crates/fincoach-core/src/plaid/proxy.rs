//! In-process aggregator proxy
//!
//! Holds access tokens server-side in the `linked_items` table and exposes
//! item-id based operations. Access tokens never leave this type.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::info;

use super::client::PlaidClient;
use super::types::{
    AccountsResponse, ConnectedInstitution, ExchangeTokenResponse, LinkTokenResponse,
    SyncResponse, TransactionsResponse,
};
use crate::bank::BankDataSource;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{DateRange, LinkedItem};

/// Window used when a transactions request has no start date
pub const DEFAULT_TRANSACTION_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct PlaidProxy {
    client: PlaidClient,
    db: Database,
}

impl PlaidProxy {
    pub fn new(client: PlaidClient, db: Database) -> Self {
        Self { client, db }
    }

    /// `None` when Plaid credentials are not configured
    pub fn from_env(db: Database) -> Option<Self> {
        PlaidClient::from_env().map(|client| Self::new(client, db))
    }

    pub fn client(&self) -> &PlaidClient {
        &self.client
    }

    fn linked_item(&self, item_id: &str) -> Result<LinkedItem> {
        self.db
            .get_linked_item(item_id)?
            .ok_or_else(|| Error::UnknownItem(item_id.to_string()))
    }
}

/// Resolve optional request dates; the default window ends today
pub fn transaction_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> DateRange {
    let end = end.unwrap_or(today);
    let start = start.unwrap_or_else(|| DateRange::trailing_days(today, DEFAULT_TRANSACTION_WINDOW_DAYS).start);
    DateRange::new(start, end)
}

#[async_trait]
impl BankDataSource for PlaidProxy {
    async fn create_link_token(&self) -> Result<LinkTokenResponse> {
        let client_user_id = format!("user-{}", Utc::now().timestamp_millis());
        let link_token = self.client.create_link_token(&client_user_id).await?;
        Ok(LinkTokenResponse { link_token })
    }

    async fn exchange_token(
        &self,
        public_token: &str,
        institution: serde_json::Value,
    ) -> Result<ExchangeTokenResponse> {
        let exchange = self.client.exchange_public_token(public_token).await?;
        self.db
            .save_linked_item(&exchange.item_id, &exchange.access_token, &institution)?;

        info!(item_id = %exchange.item_id, "Bank item linked");
        Ok(ExchangeTokenResponse {
            item_id: exchange.item_id,
            institution,
        })
    }

    async fn accounts(&self, item_id: &str) -> Result<AccountsResponse> {
        let item = self.linked_item(item_id)?;
        let accounts = self.client.get_accounts(&item.access_token).await?;
        Ok(AccountsResponse {
            accounts,
            institution: item.institution,
        })
    }

    async fn transactions(
        &self,
        item_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<TransactionsResponse> {
        let item = self.linked_item(item_id)?;
        let window = transaction_window(start, end, Utc::now().date_naive());
        self.client
            .get_transactions(&item.access_token, window.start, window.end)
            .await
    }

    async fn sync(&self, item_id: &str, cursor: Option<&str>) -> Result<SyncResponse> {
        let item = self.linked_item(item_id)?;
        self.client
            .sync_transactions(&item.access_token, cursor)
            .await
    }

    async fn institutions(&self) -> Result<Vec<ConnectedInstitution>> {
        Ok(self
            .db
            .list_linked_items()?
            .into_iter()
            .map(ConnectedInstitution::from)
            .collect())
    }

    async fn remove_item(&self, item_id: &str) -> Result<()> {
        let item = self.linked_item(item_id)?;
        self.client.remove_item(&item.access_token).await?;
        self.db.remove_linked_item(item_id)?;

        info!(item_id, "Bank item removed");
        Ok(())
    }
}
