//! Error types for FinCoach

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A budget for category '{0}' already exists")]
    DuplicateBudget(String),

    #[error("AI coach is not configured. Set ANTHROPIC_API_KEY to enable chat.")]
    AiNotConfigured,

    #[error("Invalid API key. Please check your Anthropic API key.")]
    AiInvalidKey,

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    AiRateLimited,

    #[error("Failed to get response from AI. Please try again.")]
    AiFailed(String),

    #[error("Bank aggregator is not configured. Set PLAID_CLIENT_ID and PLAID_SECRET.")]
    AggregatorNotConfigured,

    #[error("Bank aggregator error: {0}")]
    Aggregator(String),

    #[error("Item not found: {0}")]
    UnknownItem(String),
}

pub type Result<T> = std::result::Result<T, Error>;
