//! Manual field allocation commands

use anyhow::{Context, Result};
use safra_core::models::AllocationInput;
use safra_core::Database;

/// Parse `field=percentage` entries
pub fn parse_allocation_entries(entries: &[String]) -> Result<Vec<AllocationInput>> {
    entries
        .iter()
        .map(|entry| {
            let (field, pct) = entry
                .split_once('=')
                .with_context(|| format!("Invalid allocation '{}' (use field=percentage)", entry))?;
            let field = field.trim();
            if field.is_empty() {
                anyhow::bail!("Invalid allocation '{}': missing field", entry);
            }
            let percentage: f64 = pct
                .trim()
                .trim_end_matches('%')
                .replace(',', ".")
                .parse()
                .with_context(|| format!("Invalid percentage in '{}'", entry))?;
            Ok(AllocationInput {
                field_id: field.to_string(),
                percentage,
            })
        })
        .collect()
}

fn ensure_transaction(db: &Database, account: &str, transaction_id: &str) -> Result<()> {
    if db.get_transaction(account, transaction_id)?.is_none() {
        anyhow::bail!("Transaction not found: {}", transaction_id);
    }
    Ok(())
}

pub fn cmd_allocations_show(db: &Database, account: &str, transaction_id: &str) -> Result<()> {
    ensure_transaction(db, account, transaction_id)?;
    let allocations = db.list_allocations(transaction_id)?;

    if allocations.is_empty() {
        println!("Transaction {} has no manual allocations.", transaction_id);
        return Ok(());
    }

    println!("📌 Allocations for transaction {}:", transaction_id);
    for allocation in &allocations {
        println!(
            "   {:24} {:>6.2}%",
            allocation
                .field_name
                .as_deref()
                .unwrap_or(allocation.field_id.as_str()),
            allocation.percentage
        );
    }

    Ok(())
}

pub fn cmd_allocations_set(
    db: &Database,
    account: &str,
    transaction_id: &str,
    entries: &[String],
) -> Result<()> {
    ensure_transaction(db, account, transaction_id)?;
    let inputs = parse_allocation_entries(entries)?;

    db.replace_allocations(transaction_id, &inputs)?;

    db.log_audit(
        account,
        "update",
        Some("allocation"),
        Some(transaction_id),
        Some(&entries.join(", ")),
    )?;

    println!(
        "✅ Saved {} allocations for transaction {}",
        inputs.len(),
        transaction_id
    );

    Ok(())
}

pub fn cmd_allocations_clear(db: &Database, account: &str, transaction_id: &str) -> Result<()> {
    ensure_transaction(db, account, transaction_id)?;
    let removed = db.delete_allocations(transaction_id)?;

    db.log_audit(
        account,
        "delete",
        Some("allocation"),
        Some(transaction_id),
        Some(&format!("removed={}", removed)),
    )?;

    println!("✅ Removed {} allocations from transaction {}", removed, transaction_id);

    Ok(())
}
