//! FinCoach Core Library
//!
//! Shared functionality for the FinCoach personal finance tracker:
//! - Local store for transactions, budgets, goals and chat transcripts
//! - Budget and goal progress, spending analytics and the dashboard
//! - AI coaching context and the Anthropic chat client
//! - Bank aggregator (Plaid) proxy and the transaction sync client
//! - JSON export/import and transaction CSV export

pub mod ai;
pub mod analytics;
pub mod bank;
pub mod categories;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod period;
pub mod plaid;

/// Test utilities including mock Plaid and Anthropic servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{Coach, CoachClient, CoachContext};
pub use analytics::DashboardData;
pub use bank::{BankDataSource, ProxyClient, SyncResult, SyncSummary};
pub use db::{Database, TransactionFilter, WriteOutcome};
pub use error::{Error, Result};
pub use export::{DataExport, ImportStats};
pub use plaid::{PlaidClient, PlaidProxy};
