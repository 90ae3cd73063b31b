//! Transaction filter builder for constructing dynamic SQL queries
//!
//! Every criterion that is present narrows the result (logical AND across
//! criteria). Empty lists and `None` mean "no constraint". Results are always
//! ordered newest first. Text matching folds case for all of Unicode through
//! the connection's `unicode_lower()` function.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{DateRange, TransactionType};

/// Filter criteria for listing transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionFilter {
    /// Inclusive lower bound on the transaction date
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the transaction date
    pub end_date: Option<NaiveDate>,
    /// Category id must be one of these
    pub categories: Vec<String>,
    /// Type must be one of these
    pub types: Vec<TransactionType>,
    /// Merchant must contain at least one of these (case-insensitive)
    pub merchants: Vec<String>,
    /// Inclusive lower bound on the amount
    pub min_amount: Option<f64>,
    /// Inclusive upper bound on the amount
    pub max_amount: Option<f64>,
    /// Substring matched against merchant, description, category and notes
    pub search: Option<String>,
    /// Cap on the number of rows returned
    pub limit: Option<i64>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// ORDER BY clause including "ORDER BY" keyword
    pub order_clause: String,
    /// LIMIT clause (empty if unlimited)
    pub limit_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl TransactionFilter {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to an inclusive date range
    pub fn date_range(mut self, range: DateRange) -> Self {
        self.start_date = Some(range.start);
        self.end_date = Some(range.end);
        self
    }

    pub fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = date;
        self
    }

    pub fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = date;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.categories.push(category.to_string());
        self
    }

    pub fn transaction_type(mut self, t: TransactionType) -> Self {
        self.types.push(t);
        self
    }

    pub fn merchant(mut self, merchant: &str) -> Self {
        self.merchants.push(merchant.to_string());
        self
    }

    pub fn amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn search(mut self, query: Option<&str>) -> Self {
        self.search = query.map(String::from);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the filter components
    pub fn build(&self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(start) = self.start_date {
            conditions.push("t.date >= ?".to_string());
            params.push(Box::new(start.to_string()));
        }

        if let Some(end) = self.end_date {
            conditions.push("t.date <= ?".to_string());
            params.push(Box::new(end.to_string()));
        }

        if !self.categories.is_empty() {
            conditions.push(format!("t.category IN ({})", placeholders(self.categories.len())));
            for c in &self.categories {
                params.push(Box::new(c.clone()));
            }
        }

        if !self.types.is_empty() {
            conditions.push(format!(
                "t.transaction_type IN ({})",
                placeholders(self.types.len())
            ));
            for t in &self.types {
                params.push(Box::new(t.as_str()));
            }
        }

        // Any-of merchant substring match
        let merchants: Vec<&str> = self
            .merchants
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();
        if !merchants.is_empty() {
            let ors: Vec<&str> = merchants
                .iter()
                .map(|_| "unicode_lower(t.merchant) LIKE ? ESCAPE '\\'")
                .collect();
            conditions.push(format!("({})", ors.join(" OR ")));
            for m in merchants {
                params.push(Box::new(like_pattern(m)));
            }
        }

        if let Some(min) = self.min_amount {
            conditions.push("t.amount >= ?".to_string());
            params.push(Box::new(min));
        }

        if let Some(max) = self.max_amount {
            conditions.push("t.amount <= ?".to_string());
            params.push(Box::new(max));
        }

        if let Some(q) = self.search.as_deref() {
            if !q.trim().is_empty() {
                conditions.push(
                    "(unicode_lower(t.merchant) LIKE ? ESCAPE '\\' \
                     OR unicode_lower(t.description) LIKE ? ESCAPE '\\' \
                     OR unicode_lower(t.category) LIKE ? ESCAPE '\\' \
                     OR unicode_lower(COALESCE(t.notes, '')) LIKE ? ESCAPE '\\')"
                        .to_string(),
                );
                let pattern = like_pattern(q.trim());
                for _ in 0..4 {
                    params.push(Box::new(pattern.clone()));
                }
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit_clause = match self.limit {
            Some(n) => format!("LIMIT {}", n.max(0)),
            None => String::new(),
        };

        FilterResult {
            where_clause,
            order_clause: "ORDER BY t.date DESC, t.id DESC".to_string(),
            limit_clause,
            params,
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Lowercased `%term%` with LIKE wildcards in the term escaped
fn like_pattern(term: &str) -> String {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl FilterResult {
    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}
