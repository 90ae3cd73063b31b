//! FinCoach CLI - Personal finance tracker with an AI coach
//!
//! Usage:
//!   fincoach init                          Initialize database
//!   fincoach transactions add 12.50 -c food_dining -m Deli
//!   fincoach report dashboard              Last 30 days at a glance
//!   fincoach chat "How am I doing?"        Ask the coach
//!   fincoach serve --port 3001             Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt, static_dir.as_deref()).await
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_transactions_list(&db, 20, None),
                Some(TransactionsAction::List { limit, category }) => {
                    commands::cmd_transactions_list(&db, limit, category.as_deref())
                }
                Some(TransactionsAction::Add {
                    amount,
                    category,
                    merchant,
                    income,
                    date,
                    description,
                    tags,
                }) => commands::cmd_transactions_add(
                    &db,
                    commands::NewEntry {
                        amount,
                        category: &category,
                        merchant: &merchant,
                        income,
                        date,
                        description: description.as_deref(),
                        tags: tags.as_deref(),
                    },
                ),
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, id)
                }
            }
        }
        Commands::Budgets { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(BudgetsAction::List) => commands::cmd_budgets_list(&db),
                Some(BudgetsAction::Add {
                    category,
                    limit,
                    threshold,
                }) => commands::cmd_budgets_add(&db, &category, limit, threshold),
                Some(BudgetsAction::Delete { id }) => commands::cmd_budgets_delete(&db, id),
            }
        }
        Commands::Goals { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(GoalsAction::List) => commands::cmd_goals_list(&db),
                Some(GoalsAction::Add {
                    name,
                    target,
                    deadline,
                }) => commands::cmd_goals_add(&db, &name, target, deadline),
                Some(GoalsAction::Contribute { id, amount }) => {
                    commands::cmd_goals_contribute(&db, id, amount)
                }
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match report_type {
                ReportType::Dashboard => commands::cmd_report_dashboard(&db).await,
                ReportType::Monthly { months } => commands::cmd_report_monthly(&db, months),
                ReportType::Merchants { limit } => commands::cmd_report_merchants(&db, limit),
                ReportType::Weekday => commands::cmd_report_weekday(&db),
            }
        }
        Commands::Chat { message } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_chat(&db, &message.join(" ")).await
        }
        Commands::Bank { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let proxy = fincoach_core::ProxyClient::from_env();
            match action {
                BankAction::Institutions => commands::cmd_bank_institutions(&proxy).await,
                BankAction::Sync { item } => {
                    commands::cmd_bank_sync(&db, &proxy, item.as_deref()).await
                }
            }
        }
        Commands::Export { file, csv } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            if csv {
                commands::cmd_export_csv(&db, &file)
            } else {
                commands::cmd_export_json(&db, &file)
            }
        }
        Commands::Import { file, yes } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file, yes)
        }
        Commands::Reset { yes } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_reset(&db, yes)
        }
    }
}
