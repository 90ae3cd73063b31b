//! Plaid API client
//!
//! # Configuration
//!
//! Environment variables:
//! - `PLAID_CLIENT_ID`, `PLAID_SECRET`: credentials (both required)
//! - `PLAID_ENV`: `sandbox` (default), `development` or `production`
//! - `PLAID_BASE_URL`: overrides the environment's host

use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::types::{PlaidAccount, SyncResponse, TransactionsResponse};
use crate::error::{Error, Result};

/// Maximum transactions requested per `/transactions/get` call
pub const TRANSACTIONS_PAGE_SIZE: u32 = 500;

/// Plaid deployment environments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl std::str::FromStr for PlaidEnvironment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            _ => Err(format!("Unknown Plaid environment: {}", s)),
        }
    }
}

/// Access token and item id returned by a public-token exchange
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenExchange {
    pub access_token: String,
    pub item_id: String,
}

/// Error body returned by Plaid on failure
#[derive(Debug, Deserialize)]
struct PlaidErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

#[derive(Clone)]
pub struct PlaidClient {
    http_client: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl std::fmt::Debug for PlaidClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaidClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PlaidClient {
    pub fn new(base_url: &str, client_id: &str, secret: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Create from environment; `None` when credentials are missing
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("PLAID_CLIENT_ID").ok()?;
        let secret = std::env::var("PLAID_SECRET").ok()?;

        let env = match std::env::var("PLAID_ENV") {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                warn!("{}, falling back to sandbox", e);
                PlaidEnvironment::Sandbox
            }),
            Err(_) => PlaidEnvironment::default(),
        };
        let base_url =
            std::env::var("PLAID_BASE_URL").unwrap_or_else(|_| env.base_url().to_string());

        debug!(env = env.as_str(), %base_url, "Plaid client configured");
        Some(Self::new(&base_url, &client_id, &secret))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize, R: DeserializeOwned>(&self, path: &str, body: &T) -> Result<R> {
        debug!(path, "Plaid request");

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .header("PLAID-CLIENT-ID", &self.client_id)
            .header("PLAID-SECRET", &self.secret)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<PlaidErrorBody>(&body) {
                Ok(err) => format!("{}: {}", err.error_code, err.error_message),
                Err(_) => body,
            };
            warn!(path, %status, %detail, "Plaid API error");
            return Err(Error::Aggregator(format!("{} ({}): {}", path, status, detail)));
        }

        Ok(response.json().await?)
    }

    /// Start a Link session for `client_user_id`
    pub async fn create_link_token(&self, client_user_id: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct LinkTokenCreated {
            link_token: String,
        }

        let created: LinkTokenCreated = self
            .post(
                "/link/token/create",
                &json!({
                    "user": { "client_user_id": client_user_id },
                    "client_name": "FinCoach",
                    "products": ["transactions"],
                    "country_codes": ["US"],
                    "language": "en",
                }),
            )
            .await?;
        Ok(created.link_token)
    }

    pub async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange> {
        self.post(
            "/item/public_token/exchange",
            &json!({ "public_token": public_token }),
        )
        .await
    }

    pub async fn get_accounts(&self, access_token: &str) -> Result<Vec<PlaidAccount>> {
        #[derive(Deserialize)]
        struct AccountsGot {
            accounts: Vec<PlaidAccount>,
        }

        let got: AccountsGot = self
            .post("/accounts/get", &json!({ "access_token": access_token }))
            .await?;
        Ok(got.accounts)
    }

    /// First page of posted and pending transactions in `[start, end]`
    pub async fn get_transactions(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TransactionsResponse> {
        self.post(
            "/transactions/get",
            &json!({
                "access_token": access_token,
                "start_date": start.to_string(),
                "end_date": end.to_string(),
                "options": { "count": TRANSACTIONS_PAGE_SIZE, "offset": 0 },
            }),
        )
        .await
    }

    /// Incremental changes since `cursor` (from the beginning when `None`)
    pub async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncResponse> {
        let mut body = json!({ "access_token": access_token });
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            body["cursor"] = json!(cursor);
        }
        self.post("/transactions/sync", &body).await
    }

    pub async fn remove_item(&self, access_token: &str) -> Result<()> {
        let _: serde_json::Value = self
            .post("/item/remove", &json!({ "access_token": access_token }))
            .await?;
        Ok(())
    }
}
