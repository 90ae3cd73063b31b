//! Bank aggregator (Plaid) integration
//!
//! - `client` - Thin HTTP client of the Plaid API
//! - `proxy` - Item-id based operations with server-held access tokens
//! - `types` - Wire types shared by the proxy, its HTTP surface and the sync client

mod client;
mod proxy;
mod types;

pub use client::{PlaidClient, PlaidEnvironment, TokenExchange, TRANSACTIONS_PAGE_SIZE};
pub use proxy::{transaction_window, PlaidProxy, DEFAULT_TRANSACTION_WINDOW_DAYS};
pub use types::*;
