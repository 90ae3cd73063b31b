//! Aggregator wire types and proxy payloads

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::LinkedItem;

/// Institution metadata passed in by Link and echoed back unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaidInstitution {
    #[serde(default)]
    pub institution_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub available: Option<f64>,
    pub current: Option<f64>,
    pub limit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaidAccount {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub balances: AccountBalances,
}

/// A transaction as reported by the aggregator.
///
/// Positive amounts are money leaving the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaidTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedTransaction {
    pub transaction_id: String,
}

// ========== Proxy payloads ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    pub link_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeTokenRequest {
    pub public_token: String,
    #[serde(default)]
    pub institution: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeTokenResponse {
    pub item_id: String,
    pub institution: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountsResponse {
    pub accounts: Vec<PlaidAccount>,
    pub institution: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<PlaidTransaction>,
    #[serde(default)]
    pub accounts: Vec<PlaidAccount>,
    pub total_transactions: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub added: Vec<PlaidTransaction>,
    #[serde(default)]
    pub modified: Vec<PlaidTransaction>,
    #[serde(default)]
    pub removed: Vec<RemovedTransaction>,
    pub next_cursor: String,
    pub has_more: bool,
}

/// One linked bank as listed by the proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedInstitution {
    pub item_id: String,
    pub institution: serde_json::Value,
    pub connected_at: DateTime<Utc>,
}

impl ConnectedInstitution {
    /// Institution display name, if Link supplied one
    pub fn name(&self) -> Option<&str> {
        self.institution.get("name").and_then(|v| v.as_str())
    }
}

impl From<LinkedItem> for ConnectedInstitution {
    fn from(item: LinkedItem) -> Self {
        Self {
            item_id: item.item_id,
            institution: item.institution,
            connected_at: item.connected_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionsResponse {
    pub institutions: Vec<ConnectedInstitution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveItemResponse {
    pub success: bool,
}

/// Query parameters for the transactions endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
