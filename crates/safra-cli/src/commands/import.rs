//! Import/export command implementations

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use safra_core::{export_costs, export_details, CostAllocator, Database, ExportFormat, Snapshot};

use super::{build_filter, load_classifier};
use crate::cli::FilterArgs;

pub fn cmd_import(
    db: &Database,
    account: &str,
    input: &Path,
    clear: bool,
    yes: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Snapshot file not found: {}", input.display());
    }

    let mut file = File::open(input)
        .with_context(|| format!("Failed to open snapshot file: {}", input.display()))?;
    let mut json = String::new();
    file.read_to_string(&mut json)
        .with_context(|| "Failed to read snapshot file")?;
    tracing::debug!(bytes = json.len(), "Read snapshot file");

    let snapshot =
        Snapshot::from_json(&json).with_context(|| "Failed to parse snapshot file as JSON")?;

    println!("📦 Importing snapshot from: {}", input.display());
    println!("   Account: {}", account);
    println!();

    if clear {
        if !yes {
            println!("⚠️  This will DELETE all records of account '{}' before importing.", account);
            print!("\nAre you sure? [y/N] ");
            io::stdout().flush()?;

            let mut input_str = String::new();
            io::stdin().read_line(&mut input_str)?;
            if !input_str.trim().eq_ignore_ascii_case("y") {
                println!("Cancelled.");
                return Ok(());
            }
        }
        db.clear_account(account)
            .context("Failed to clear account before import")?;
    }

    let stats = db.import_snapshot(account, &snapshot)?;

    db.log_audit(
        account,
        "import",
        Some("snapshot"),
        None,
        Some(&format!("file={}, records={}", input.display(), stats.total())),
    )?;

    println!("✅ Import complete!");
    println!("   Properties: {}", stats.properties);
    println!("   Fields: {}", stats.fields);
    println!("   Transactions: {}", stats.transactions);
    println!("   Activities: {}", stats.activities);
    println!("   Product lines: {}", stats.product_usages);
    println!("   Activity links: {}", stats.activity_fields);
    println!("   Stock movements: {}", stats.stock_movements);
    println!("   Stock products: {}", stats.stock_products);
    println!("   Debts: {}", stats.debts);

    Ok(())
}

/// Write to a file, or stdout when no path is given
fn write_output(output: Option<&Path>, content: &str, what: &str) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            file.write_all(content.as_bytes())?;
            println!("✅ Exported {} to {}", what, path.display());
        }
        None => {
            io::stdout().write_all(content.as_bytes())?;
        }
    }
    Ok(())
}

fn parse_format(format: &str) -> Result<ExportFormat> {
    format.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub fn cmd_export_costs(
    db: &Database,
    account: &str,
    output: Option<PathBuf>,
    format: &str,
    filter: &FilterArgs,
) -> Result<()> {
    let format = parse_format(format)?;
    let filter = build_filter(filter)?;
    let classifier = load_classifier()?;

    let report = CostAllocator::new(db, &classifier).cost_per_field(
        account,
        &filter,
        safra_core::period::today(),
    )?;
    let content = export_costs(&report, format)?;

    write_output(
        output.as_deref(),
        &content,
        &format!("{} field rows", report.rows.len()),
    )
}

pub fn cmd_export_details(
    db: &Database,
    account: &str,
    field_id: &str,
    output: Option<PathBuf>,
    format: &str,
    filter: &FilterArgs,
) -> Result<()> {
    let format = parse_format(format)?;
    let filter = build_filter(filter)?;
    let classifier = load_classifier()?;

    let details = CostAllocator::new(db, &classifier).field_details(
        account,
        field_id,
        &filter,
        safra_core::period::today(),
    )?;
    let content = export_details(&details, format)?;

    write_output(
        output.as_deref(),
        &content,
        &format!("{} line items", details.len()),
    )
}

pub fn cmd_export_snapshot(db: &Database, account: &str, output: &Path) -> Result<()> {
    let snapshot = db.export_snapshot(account)?;
    let json = serde_json::to_string_pretty(&snapshot)?;

    write_output(
        Some(output),
        &json,
        &format!(
            "{} fields, {} transactions, {} activities",
            snapshot.fields.len(),
            snapshot.transactions.len(),
            snapshot.activities.len()
        ),
    )
}
