//! Domain models for FinCoach

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound accepted for any single amount (transactions, limits, targets)
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// Direction of a transaction. Amounts are always positive; the sign lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment method used for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    MobilePayment,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::BankTransfer => "bank_transfer",
            Self::MobilePayment => "mobile_payment",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "credit_card" | "credit" => Ok(Self::CreditCard),
            "debit_card" | "debit" => Ok(Self::DebitCard),
            "bank_transfer" | "transfer" => Ok(Self::BankTransfer),
            "mobile_payment" | "mobile" => Ok(Self::MobilePayment),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown payment method: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single income or expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Always positive; direction is carried by `transaction_type`
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Key into the static category table
    pub category: String,
    pub subcategory: Option<String>,
    pub merchant: String,
    pub description: String,
    pub date: NaiveDate,
    pub payment_method: Option<PaymentMethod>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    /// Aggregator transaction id, set for bank imports
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub merchant: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl NewTransaction {
    /// Minimal expense entry; other fields take their defaults
    pub fn expense(amount: f64, category: &str, merchant: &str, date: NaiveDate) -> Self {
        Self {
            amount,
            transaction_type: TransactionType::Expense,
            category: category.to_string(),
            subcategory: None,
            merchant: merchant.to_string(),
            description: String::new(),
            date,
            payment_method: None,
            tags: Vec::new(),
            notes: None,
            external_id: None,
        }
    }

    /// Minimal income entry
    pub fn income(amount: f64, category: &str, merchant: &str, date: NaiveDate) -> Self {
        Self {
            transaction_type: TransactionType::Income,
            ..Self::expense(amount, category, merchant, date)
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_transaction_fields(
            self.amount,
            &self.merchant,
            &self.description,
            self.notes.as_deref(),
            &self.category,
        )
    }
}

/// Partial update for a transaction. `None` leaves a field unchanged; for the
/// optional text fields an empty string clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionUpdate {
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl TransactionUpdate {
    /// Merge this update over an existing transaction
    pub fn apply_to(&self, tx: &mut Transaction) {
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(t) = self.transaction_type {
            tx.transaction_type = t;
        }
        if let Some(ref c) = self.category {
            tx.category = c.clone();
        }
        if let Some(ref s) = self.subcategory {
            tx.subcategory = non_empty(s);
        }
        if let Some(ref m) = self.merchant {
            tx.merchant = m.clone();
        }
        if let Some(ref d) = self.description {
            tx.description = d.clone();
        }
        if let Some(date) = self.date {
            tx.date = date;
        }
        if let Some(pm) = self.payment_method {
            tx.payment_method = Some(pm);
        }
        if let Some(ref tags) = self.tags {
            tx.tags = tags.clone();
        }
        if let Some(ref n) = self.notes {
            tx.notes = non_empty(n);
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

pub(crate) fn validate_transaction_fields(
    amount: f64,
    merchant: &str,
    description: &str,
    notes: Option<&str>,
    category: &str,
) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidData("Amount must be greater than 0".into()));
    }
    if amount > MAX_AMOUNT {
        return Err(Error::InvalidData("Amount is too large".into()));
    }
    let merchant_len = merchant.trim().chars().count();
    if merchant_len == 0 {
        return Err(Error::InvalidData("Merchant is required".into()));
    }
    if merchant_len > 200 {
        return Err(Error::InvalidData(
            "Merchant name must be 200 characters or less".into(),
        ));
    }
    if description.chars().count() > 500 {
        return Err(Error::InvalidData(
            "Description must be 500 characters or less".into(),
        ));
    }
    if notes.map(|n| n.chars().count() > 1000).unwrap_or(false) {
        return Err(Error::InvalidData(
            "Notes must be 1000 characters or less".into(),
        ));
    }
    if category.trim().is_empty() {
        return Err(Error::InvalidData("Category is required".into()));
    }
    Ok(())
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Aggregate totals over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_amount: f64,
    pub transaction_count: i64,
    pub average_expense: f64,
    pub largest_expense: Option<Transaction>,
}

/// Expense total for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    pub amount: f64,
    pub count: i64,
}

/// Monthly spending limit for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category: String,
    pub monthly_limit: f64,
    /// Percentage (0-100) at which the budget enters the warning state
    pub alert_threshold: f64,
    /// Stored only; no computation consults it
    pub rollover: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_ALERT_THRESHOLD: f64 = 75.0;

fn default_alert_threshold() -> f64 {
    DEFAULT_ALERT_THRESHOLD
}

/// Input for creating a budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub category: String,
    pub monthly_limit: f64,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    #[serde(default)]
    pub rollover: bool,
}

impl NewBudget {
    pub fn new(category: &str, monthly_limit: f64) -> Self {
        Self {
            category: category.to_string(),
            monthly_limit,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            rollover: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_budget_fields(&self.category, self.monthly_limit, self.alert_threshold)
    }
}

/// Partial update for a budget
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetUpdate {
    pub category: Option<String>,
    pub monthly_limit: Option<f64>,
    pub alert_threshold: Option<f64>,
    pub rollover: Option<bool>,
}

pub(crate) fn validate_budget_fields(category: &str, limit: f64, threshold: f64) -> Result<()> {
    if category.trim().is_empty() {
        return Err(Error::InvalidData("Category is required".into()));
    }
    if !limit.is_finite() || limit <= 0.0 {
        return Err(Error::InvalidData("Budget must be greater than 0".into()));
    }
    if limit > MAX_AMOUNT {
        return Err(Error::InvalidData("Budget is too large".into()));
    }
    if !(0.0..=100.0).contains(&threshold) {
        return Err(Error::InvalidData(
            "Alert threshold must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

/// Budget state derived from the current month's spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Under,
    Warning,
    Over,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Under => "under",
            Self::Warning => "warning",
            Self::Over => "over",
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProgress {
    pub budget: Budget,
    pub spent: f64,
    pub remaining: f64,
    /// Unbounded above 100
    pub percentage: f64,
    pub status: BudgetStatus,
    /// Days left in the month, today included
    pub days_remaining: i64,
    /// Month-end spend extrapolated from the run rate so far
    pub projected_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub total_budgeted: f64,
    pub total_spent: f64,
    /// Budgeted minus spent; negative when over
    pub total_remaining: f64,
    pub overall_percentage: f64,
    pub budgets_on_track: i64,
    pub budgets_at_risk: i64,
    pub budgets_over_budget: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    High,
    Medium,
    Low,
}

impl GoalPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::str::FromStr for GoalPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Unknown goal priority: {}", s)),
        }
    }
}

impl std::fmt::Display for GoalPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "paused" => Ok(Self::Paused),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown goal status: {}", s)),
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A savings goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: NaiveDate,
    pub priority: GoalPriority,
    /// Free text (e.g. "emergency", "vacation")
    pub category: String,
    pub status: GoalStatus,
    pub motivations: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Active goals complete as soon as the saved amount reaches the target.
    /// Never moves a goal back to active.
    pub(crate) fn apply_auto_completion(&mut self) {
        if self.status == GoalStatus::Active && self.current_amount >= self.target_amount {
            self.status = GoalStatus::Completed;
        }
    }
}

fn default_priority() -> GoalPriority {
    GoalPriority::Medium
}

/// Input for creating a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: Option<f64>,
    pub deadline: NaiveDate,
    #[serde(default = "default_priority")]
    pub priority: GoalPriority,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub motivations: Vec<String>,
}

impl NewGoal {
    pub fn new(name: &str, target_amount: f64, deadline: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            target_amount,
            current_amount: None,
            deadline,
            priority: GoalPriority::Medium,
            category: "savings".to_string(),
            motivations: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_goal_fields(
            &self.name,
            self.target_amount,
            self.current_amount.unwrap_or(0.0),
        )
    }
}

/// Partial update for a goal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<f64>,
    pub current_amount: Option<f64>,
    pub deadline: Option<NaiveDate>,
    pub priority: Option<GoalPriority>,
    pub category: Option<String>,
    pub status: Option<GoalStatus>,
    pub motivations: Option<Vec<String>>,
}

impl GoalUpdate {
    pub fn apply_to(&self, goal: &mut Goal) {
        if let Some(ref n) = self.name {
            goal.name = n.clone();
        }
        if let Some(ref d) = self.description {
            goal.description = non_empty(d);
        }
        if let Some(t) = self.target_amount {
            goal.target_amount = t;
        }
        if let Some(c) = self.current_amount {
            goal.current_amount = c;
        }
        if let Some(d) = self.deadline {
            goal.deadline = d;
        }
        if let Some(p) = self.priority {
            goal.priority = p;
        }
        if let Some(ref c) = self.category {
            goal.category = c.clone();
        }
        if let Some(s) = self.status {
            goal.status = s;
        }
        if let Some(ref m) = self.motivations {
            goal.motivations = m.clone();
        }
    }
}

pub(crate) fn validate_goal_fields(name: &str, target: f64, current: f64) -> Result<()> {
    let name_len = name.trim().chars().count();
    if name_len == 0 {
        return Err(Error::InvalidData("Goal name is required".into()));
    }
    if name_len > 100 {
        return Err(Error::InvalidData(
            "Goal name must be 100 characters or less".into(),
        ));
    }
    if !target.is_finite() || target <= 0.0 {
        return Err(Error::InvalidData("Target must be greater than 0".into()));
    }
    if target > MAX_AMOUNT {
        return Err(Error::InvalidData("Target is too large".into()));
    }
    if !current.is_finite() || current < 0.0 {
        return Err(Error::InvalidData(
            "Current amount cannot be negative".into(),
        ));
    }
    Ok(())
}

/// Pacing information for one goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal: Goal,
    pub amount_remaining: f64,
    /// Clamped to [0, 100]
    pub percentage: f64,
    /// Negative once the deadline has passed
    pub days_remaining: i64,
    pub weeks_remaining: i64,
    pub months_remaining: i64,
    pub monthly_required: f64,
    pub weekly_required: f64,
    pub on_track: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsSummary {
    pub active_goals: i64,
    pub completed_goals: i64,
    pub total_saved: f64,
    pub total_target: f64,
    pub overall_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// Optional annotations attached to a chat message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transaction_ids: Vec<i64>,
    #[serde(default)]
    pub insight_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
}

/// One chat turn; immutable once stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            metadata: None,
        }
    }
}

/// A coaching chat transcript, messages in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bank connection held by the proxy: aggregator item id to access token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedItem {
    pub item_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub institution: serde_json::Value,
    pub connected_at: DateTime<Utc>,
}
