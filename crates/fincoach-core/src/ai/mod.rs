//! AI coaching
//!
//! - `anthropic` - Messages API client (plain and streamed replies)
//! - `context` - Financial snapshot and system prompt rendering
//! - `coach` - A full chat turn against the conversation store

mod anthropic;
mod coach;
mod context;

pub use anthropic::{
    build_transcript, classify_failure, CoachClient, DEFAULT_BASE_URL, DEFAULT_MODEL, MAX_TOKENS,
};
pub use coach::Coach;
pub use context::{build_context, format_currency, CoachContext};
