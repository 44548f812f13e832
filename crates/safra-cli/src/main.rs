//! Safra CLI - Farm cost per field
//!
//! Usage:
//!   safra init                         Initialize database
//!   safra import snapshot.json         Import fields, ledgers, stock and debts
//!   safra report cost --safra 2024/2025
//!   safra serve --port 3000            Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

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

    let account = cli.account.as_str();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve { port, host } => {
            commands::cmd_serve(&cli.db, &host, port, account, cli.no_encrypt).await
        }
        command => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            run(&db, account, command)
        }
    }
}

/// Dispatch commands that work on an open database
fn run(db: &safra_core::Database, account: &str, command: Commands) -> Result<()> {
    match command {
        Commands::Init | Commands::Serve { .. } => Ok(()),
        Commands::Import { file, clear, yes } => commands::cmd_import(db, account, &file, clear, yes),
        Commands::Export { export_type } => match export_type {
            ExportType::Costs {
                output,
                format,
                filter,
            } => commands::cmd_export_costs(db, account, output, &format, &filter),
            ExportType::Details {
                field,
                output,
                format,
                filter,
            } => commands::cmd_export_details(db, account, &field, output, &format, &filter),
            ExportType::Snapshot { output } => commands::cmd_export_snapshot(db, account, &output),
        },
        Commands::Properties => commands::cmd_properties(db, account),
        Commands::Safras => commands::cmd_safras(db, account),
        Commands::Overview => commands::cmd_overview(db, account),
        Commands::Fields { action } => match action {
            None => commands::cmd_fields_list(db, account, None, None, false),
            Some(FieldsAction::List {
                property,
                crop,
                active,
            }) => commands::cmd_fields_list(db, account, property.as_deref(), crop.as_deref(), active),
            Some(FieldsAction::Toggle { id }) => commands::cmd_fields_toggle(db, account, &id),
        },
        Commands::Report { report_type } => match report_type {
            ReportType::Cost { filter } => commands::cmd_report_cost(db, account, &filter),
            ReportType::Details { field, filter } => {
                commands::cmd_report_details(db, account, &field, &filter)
            }
            ReportType::Insumos { from, to } => {
                commands::cmd_report_insumos(db, account, from.as_deref(), to.as_deref())
            }
            ReportType::Indicators { filter } => commands::cmd_report_indicators(db, account, &filter),
            ReportType::Snapshot { date } => commands::cmd_report_snapshot(db, account, date.as_deref()),
        },
        Commands::Stock { action } => match action {
            StockAction::Groups => commands::cmd_stock_groups(db, account),
        },
        Commands::Debts { action } => match action {
            None => commands::cmd_debts_list(db, account, None, None),
            Some(DebtsAction::List { status, kind }) => {
                commands::cmd_debts_list(db, account, status.as_deref(), kind.as_deref())
            }
            Some(DebtsAction::Show { id }) => commands::cmd_debts_show(db, account, id),
            Some(DebtsAction::Add {
                name,
                creditor,
                kind,
                date,
                amount,
                rate,
                notes,
            }) => commands::cmd_debts_add(
                db,
                account,
                &name,
                &creditor,
                &kind,
                &date,
                amount,
                rate.as_deref(),
                notes.as_deref(),
            ),
            Some(DebtsAction::Settle { id }) => commands::cmd_debts_settle(db, account, id),
            Some(DebtsAction::Renegotiate { id }) => commands::cmd_debts_renegotiate(db, account, id),
            Some(DebtsAction::Delete { id }) => commands::cmd_debts_delete(db, account, id),
            Some(DebtsAction::Totals) => commands::cmd_debts_totals(db, account),
        },
        Commands::Allocations { action } => match action {
            AllocationsAction::Show { transaction } => {
                commands::cmd_allocations_show(db, account, &transaction)
            }
            AllocationsAction::Set {
                transaction,
                entries,
            } => commands::cmd_allocations_set(db, account, &transaction, &entries),
            AllocationsAction::Clear { transaction } => {
                commands::cmd_allocations_clear(db, account, &transaction)
            }
        },
        Commands::Audit { limit } => commands::cmd_audit(db, account, limit),
    }
}
