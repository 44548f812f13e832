//! Debt command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use safra_core::currency::format_brl;
use safra_core::models::{Debt, DebtStatus, NewDebt};
use safra_core::Database;

use super::truncate;

fn find_debt(db: &Database, account: &str, id: i64) -> Result<Debt> {
    db.get_debt(account, id)?
        .with_context(|| format!("Debt not found: {}", id))
}

pub fn cmd_debts_list(
    db: &Database,
    account: &str,
    status: Option<&str>,
    kind: Option<&str>,
) -> Result<()> {
    let status = status
        .map(|s| s.parse::<DebtStatus>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()?;
    let debts = db.list_debts(account, status, kind)?;

    if debts.is_empty() {
        println!("No debts found.");
        return Ok(());
    }

    println!();
    println!(
        "   {:>4} │ {:24} │ {:18} │ {:12} │ {:10} │ {:>16} │ {}",
        "ID", "Name", "Creditor", "Type", "Date", "Amount", "Status"
    );
    println!("   {}", "─".repeat(112));

    for debt in &debts {
        println!(
            "   {:>4} │ {:24} │ {:18} │ {:12} │ {:10} │ {:>16} │ {}",
            debt.id,
            truncate(&debt.terms.name, 24),
            truncate(&debt.terms.creditor, 18),
            truncate(&debt.terms.kind, 12),
            debt.terms.contract_date.format("%d/%m/%Y"),
            format_brl(debt.terms.contracted_amount),
            debt.terms.status
        );
    }

    println!();
    println!("Total: {} debts", debts.len());

    Ok(())
}

pub fn cmd_debts_show(db: &Database, account: &str, id: i64) -> Result<()> {
    let debt = find_debt(db, account, id)?;
    let terms = &debt.terms;

    println!();
    println!("💳 {} (#{})", terms.name, debt.id);
    println!("   Creditor:  {}", terms.creditor);
    println!("   Type:      {}", terms.kind);
    println!("   Date:      {}", terms.contract_date.format("%d/%m/%Y"));
    println!("   Amount:    {}", format_brl(terms.contracted_amount));
    println!("   Status:    {}", terms.status);
    if let Some(rate) = &terms.rate {
        println!("   Rate:      {}", rate);
    }
    if let Some(grace) = &terms.grace_period {
        println!("   Grace:     {}", grace);
    }
    if let Some(collateral) = &terms.collateral {
        println!("   Collateral: {}", collateral);
    }
    if let Some(plan) = &terms.payment_plan {
        println!("   Plan:      {}", serde_json::to_string(plan)?);
    }
    if let Some(notes) = &terms.notes {
        println!("   Notes:     {}", notes);
    }
    println!();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_debts_add(
    db: &Database,
    account: &str,
    name: &str,
    creditor: &str,
    kind: &str,
    date: &str,
    amount: f64,
    rate: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    let contract_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .context("Invalid --date format (use YYYY-MM-DD)")?;

    let debt = NewDebt {
        name: name.to_string(),
        creditor: creditor.to_string(),
        kind: kind.to_string(),
        contract_date,
        contracted_amount: amount,
        rate: rate.map(String::from),
        grace_period: None,
        collateral: None,
        responsible: None,
        notes: notes.map(String::from),
        payment_method: None,
        status: DebtStatus::Active,
        payment_plan: None,
    };

    let id = db.create_debt(account, &debt)?;

    db.log_audit(
        account,
        "create",
        Some("debt"),
        Some(&id.to_string()),
        Some(&format!("name={}, creditor={}, amount={}", name, creditor, amount)),
    )?;

    println!("✅ Registered debt '{}' (id: {})", name, id);

    Ok(())
}

pub fn cmd_debts_settle(db: &Database, account: &str, id: i64) -> Result<()> {
    let debt = find_debt(db, account, id)?;
    db.settle_debt(account, id)?;
    db.log_audit(account, "settle", Some("debt"), Some(&id.to_string()), None)?;

    println!("✅ Debt '{}' marked as {}", debt.terms.name, DebtStatus::Settled);

    Ok(())
}

pub fn cmd_debts_renegotiate(db: &Database, account: &str, id: i64) -> Result<()> {
    let debt = find_debt(db, account, id)?;
    db.renegotiate_debt(account, id)?;
    db.log_audit(account, "renegotiate", Some("debt"), Some(&id.to_string()), None)?;

    println!("✅ Debt '{}' marked as {}", debt.terms.name, DebtStatus::Renegotiated);

    Ok(())
}

pub fn cmd_debts_delete(db: &Database, account: &str, id: i64) -> Result<()> {
    let debt = find_debt(db, account, id)?;
    db.delete_debt(account, id)?;
    db.log_audit(
        account,
        "delete",
        Some("debt"),
        Some(&id.to_string()),
        Some(&format!("name={}", debt.terms.name)),
    )?;

    println!("🗑️  Deleted debt '{}'", debt.terms.name);

    Ok(())
}

pub fn cmd_debts_totals(db: &Database, account: &str) -> Result<()> {
    let totals = db.debt_totals(account)?;

    println!();
    println!("💰 Debt totals");
    println!("   {:14} {:>16}", DebtStatus::Active.as_str(), format_brl(totals.active));
    println!("   {:14} {:>16}", DebtStatus::Settled.as_str(), format_brl(totals.settled));
    println!(
        "   {:14} {:>16}",
        DebtStatus::Renegotiated.as_str(),
        format_brl(totals.renegotiated)
    );
    println!();

    Ok(())
}
