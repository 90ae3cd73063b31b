//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// FinCoach - Track spending, budgets and savings goals
#[derive(Parser)]
#[command(name = "fincoach")]
#[command(about = "Personal finance tracker with an AI coach", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "fincoach.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Open the database without encryption even if FINCOACH_DB_KEY is set
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server and aggregator proxy
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage transactions (list, add, delete)
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Manage monthly budgets (list, add, delete)
    Budgets {
        #[command(subcommand)]
        action: Option<BudgetsAction>,
    },

    /// Manage savings goals (list, add, contribute)
    Goals {
        #[command(subcommand)]
        action: Option<GoalsAction>,
    },

    /// Generate reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },

    /// Ask the coach a question (continues today's conversation)
    Chat {
        /// Your question
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Linked banks through a running proxy (FINCOACH_API_URL)
    Bank {
        #[command(subcommand)]
        action: BankAction,
    },

    /// Export data to a file
    Export {
        /// Output file
        #[arg(short, long)]
        file: PathBuf,

        /// Write transactions as CSV instead of a full JSON backup
        #[arg(long)]
        csv: bool,
    },

    /// Replace all data with a JSON backup
    Import {
        /// Backup file produced by `fincoach export`
        #[arg(short, long)]
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all transactions, budgets, goals and conversations
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Only this category id
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Record a transaction
    Add {
        /// Amount (always positive)
        amount: f64,

        /// Category id (e.g. food_dining, salary)
        #[arg(short, long)]
        category: String,

        /// Merchant or payer
        #[arg(short, long)]
        merchant: String,

        /// Record as income rather than an expense
        #[arg(long)]
        income: bool,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Free-text description
        #[arg(long)]
        description: Option<String>,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum BudgetsAction {
    /// Show this month's progress for every budget
    List,

    /// Create a budget for a category
    Add {
        /// Category id
        category: String,

        /// Monthly limit
        limit: f64,

        /// Percentage of the limit that triggers a warning
        #[arg(long, default_value = "80")]
        threshold: f64,
    },

    /// Delete a budget
    Delete {
        /// Budget ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum GoalsAction {
    /// List goals with progress
    List,

    /// Create a savings goal
    Add {
        /// Goal name
        name: String,

        /// Target amount
        target: f64,

        /// Deadline (YYYY-MM-DD)
        #[arg(short, long)]
        deadline: NaiveDate,
    },

    /// Add money to a goal
    Contribute {
        /// Goal ID
        id: i64,

        /// Amount to add
        amount: f64,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Last 30 days at a glance
    Dashboard,

    /// Month-over-month totals
    Monthly {
        /// Number of months
        #[arg(short, long, default_value = "6")]
        months: u32,
    },

    /// Top merchants by spending
    Merchants {
        /// Number of merchants to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Spending by day of the week
    Weekday,
}

#[derive(Subcommand)]
pub enum BankAction {
    /// List linked institutions
    Institutions,

    /// Import new transactions from linked banks
    Sync {
        /// Only this item (defaults to every linked bank)
        #[arg(long)]
        item: Option<String>,
    },
}
