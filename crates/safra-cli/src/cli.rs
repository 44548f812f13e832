//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Safra - Farm cost per field
#[derive(Parser)]
#[command(name = "safra")]
#[command(about = "Cost-per-field allocation for farm ledgers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "safra.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SAFRA_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Account whose records are read and written
    #[arg(long, env = "SAFRA_ACCOUNT", default_value = "local", global = true)]
    pub account: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a JSON snapshot of fields, ledgers, stock and debts
    Import {
        /// Snapshot file (JSON)
        file: PathBuf,

        /// Delete the account's existing records first
        #[arg(long)]
        clear: bool,

        /// Skip confirmation prompt for --clear
        #[arg(short, long)]
        yes: bool,
    },

    /// Export reports or a full snapshot
    Export {
        #[command(subcommand)]
        export_type: ExportType,
    },

    /// List properties (farms)
    Properties,

    /// List harvest seasons recorded on fields
    Safras,

    /// Show farm area and field counts
    Overview,

    /// Manage fields (list, toggle)
    Fields {
        #[command(subcommand)]
        action: Option<FieldsAction>,
    },

    /// Generate cost reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },

    /// Stock views
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },

    /// Manage debts and financing
    Debts {
        #[command(subcommand)]
        action: Option<DebtsAction>,
    },

    /// Manage manual per-field allocations of a transaction
    Allocations {
        #[command(subcommand)]
        action: AllocationsAction,
    },

    /// Show the audit log
    Audit {
        /// Maximum entries to show
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

/// Report filters shared by the cost-per-field reports
#[derive(Args, Clone, Default)]
pub struct FilterArgs {
    /// Harvest season, e.g. 2024/2025 (defaults to the current season)
    #[arg(long)]
    pub safra: Option<String>,

    /// Month, e.g. 2025-03 (overrides --safra)
    #[arg(long)]
    pub month: Option<String>,

    /// Field ids or names to keep (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Property id
    #[arg(long)]
    pub property: Option<String>,

    /// Macro-group: insumos, operacional, servicosLogistica, administrativos, outros
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Subcommand)]
pub enum ExportType {
    /// Export the cost-per-field report
    Costs {
        /// Output file (stdout if not specified)
        output: Option<PathBuf>,

        /// Output format: csv or json
        #[arg(long, default_value = "csv")]
        format: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Export the line items of one field
    Details {
        /// Field id
        field: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: csv or json
        #[arg(long, default_value = "csv")]
        format: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Export every record of the account as a JSON snapshot
    Snapshot {
        /// Output file
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum FieldsAction {
    /// List fields
    List {
        /// Only fields of this property
        #[arg(long)]
        property: Option<String>,

        /// Only fields with this crop
        #[arg(long)]
        crop: Option<String>,

        /// Only active fields
        #[arg(long)]
        active: bool,
    },

    /// Flip a field's active flag
    Toggle {
        /// Field id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Cost per field by macro-group
    Cost {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Line items behind one field's costs
    Details {
        /// Field id
        field: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Input costs per field
    Insumos {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Total cost, cost per hectare and group distribution
    Indicators {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Per-field totals including revenue, up to a date
    Snapshot {
        /// Cut-off date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum StockAction {
    /// Registered products grouped by similar name
    Groups,
}

#[derive(Subcommand)]
pub enum DebtsAction {
    /// List debts
    List {
        /// Status filter: Ativa, Liquidada, Renegociada
        #[arg(long)]
        status: Option<String>,

        /// Contract type filter, e.g. Custeio
        #[arg(long)]
        kind: Option<String>,
    },

    /// Show one debt
    Show {
        /// Debt ID
        id: i64,
    },

    /// Register a debt
    Add {
        /// Debt name
        #[arg(long)]
        name: String,

        /// Creditor (bank, cooperative, supplier)
        #[arg(long)]
        creditor: String,

        /// Contract type
        #[arg(long, default_value = "Custeio")]
        kind: String,

        /// Contract date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Contracted amount
        #[arg(long)]
        amount: f64,

        /// Interest rate, free text
        #[arg(long)]
        rate: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Mark a debt as paid off
    Settle {
        /// Debt ID
        id: i64,
    },

    /// Mark a debt as renegotiated
    Renegotiate {
        /// Debt ID
        id: i64,
    },

    /// Delete a debt
    Delete {
        /// Debt ID
        id: i64,
    },

    /// Contracted amounts per status
    Totals,
}

#[derive(Subcommand)]
pub enum AllocationsAction {
    /// Show a transaction's allocations
    Show {
        /// Transaction ID
        transaction: String,
    },

    /// Replace a transaction's allocations
    Set {
        /// Transaction ID
        transaction: String,

        /// Entries as field=percentage, e.g. a=30 b=70
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Remove a transaction's allocations
    Clear {
        /// Transaction ID
        transaction: String,
    },
}
