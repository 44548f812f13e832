//! Report command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use safra_core::currency::format_brl;
use safra_core::models::{CostReport, MacroGroup};
use safra_core::period::today;
use safra_core::{CostAllocator, CostFilter, Database, DateWindow};

use super::{load_classifier, truncate};
use crate::cli::FilterArgs;

/// Turn command-line filters into a report filter
pub fn build_filter(args: &FilterArgs) -> Result<CostFilter> {
    let macro_group = args
        .group
        .as_deref()
        .map(|g| MacroGroup::parse_filter(g).map_err(|e| anyhow::anyhow!(e)))
        .transpose()?
        .flatten();

    Ok(CostFilter {
        month: args.month.clone(),
        safra: args.safra.clone(),
        fields: args
            .fields
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
        property_id: args.property.clone(),
        macro_group,
    })
}

/// Parse an optional YYYY-MM-DD flag
pub fn parse_date(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Invalid --{} date format (use YYYY-MM-DD)", flag))
        })
        .transpose()
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("   ⚠️  {}", warning);
    }
}

fn print_cost_table(report: &CostReport) {
    println!(
        "   {:20} │ {:>9} │ {:>14} │ {:>14} │ {:>14} │ {:>14} │ {:>14} │ {:>14} │ {:>12}",
        "Field",
        "Area ha",
        MacroGroup::Insumos.label(),
        MacroGroup::Operacional.label(),
        MacroGroup::ServicosLogistica.label(),
        MacroGroup::Administrativos.label(),
        MacroGroup::Outros.label(),
        "Total",
        "R$/ha"
    );
    println!("   {}", "─".repeat(160));

    for row in &report.rows {
        println!(
            "   {:20} │ {:>9.2} │ {:>14} │ {:>14} │ {:>14} │ {:>14} │ {:>14} │ {:>14} │ {:>12}",
            truncate(&row.field_name, 20),
            row.area_ha,
            format_brl(row.groups.get(MacroGroup::Insumos)),
            format_brl(row.groups.get(MacroGroup::Operacional)),
            format_brl(row.groups.get(MacroGroup::ServicosLogistica)),
            format_brl(row.groups.get(MacroGroup::Administrativos)),
            format_brl(row.groups.get(MacroGroup::Outros)),
            format_brl(row.total),
            format_brl(row.cost_per_ha)
        );
    }
}

pub fn cmd_report_cost(db: &Database, account: &str, filter: &FilterArgs) -> Result<()> {
    let filter = build_filter(filter)?;
    let classifier = load_classifier()?;
    tracing::debug!(?filter, "Running cost-per-field report");

    let report = CostAllocator::new(db, &classifier).cost_per_field(account, &filter, today())?;

    println!();
    println!("📊 Cost per Field");
    println!("   Period: {} to {}", report.period.from, report.period.to);
    print_warnings(&report.warnings);
    println!();

    if report.rows.is_empty() {
        println!("   No eligible fields for these filters.");
        return Ok(());
    }

    print_cost_table(&report);

    let indicators = report.indicators();
    println!();
    println!("   Total costs: {}", format_brl(indicators.total_costs));
    println!("   Average per hectare: {}", format_brl(indicators.average_cost_per_ha));

    db.log_audit(
        account,
        "report",
        Some("cost_per_field"),
        None,
        Some(&format!("period={}..{}, fields={}", report.period.from, report.period.to, report.rows.len())),
    )?;

    Ok(())
}

pub fn cmd_report_details(
    db: &Database,
    account: &str,
    field_id: &str,
    filter: &FilterArgs,
) -> Result<()> {
    let filter = build_filter(filter)?;
    let classifier = load_classifier()?;

    let details = CostAllocator::new(db, &classifier).field_details(account, field_id, &filter, today())?;

    println!();
    println!("🧾 Cost details for field {}", field_id);
    println!();

    if details.is_empty() {
        println!("   No costs charged to this field in the period.");
        return Ok(());
    }

    println!(
        "   {:10} │ {:18} │ {:30} │ {:12} │ {:>14}",
        "Date", "Group", "Description", "Origin", "Amount"
    );
    println!("   {}", "─".repeat(98));

    for line in &details {
        println!(
            "   {:10} │ {:18} │ {:30} │ {:12} │ {:>14}",
            line.display_date(),
            line.macro_group.label(),
            truncate(&line.description, 30),
            line.origin.as_str(),
            format_brl(line.amount)
        );
    }

    let total: f64 = details.iter().map(|d| d.amount).sum();
    println!();
    println!("   {} lines, total {}", details.len(), format_brl(total));

    Ok(())
}

pub fn cmd_report_insumos(
    db: &Database,
    account: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let window = match (parse_date(from, "from")?, parse_date(to, "to")?) {
        (Some(start), Some(end)) => DateWindow::between(start, end),
        (Some(start), None) => DateWindow::between(start, today()),
        (None, Some(end)) => DateWindow::up_to(end),
        (None, None) => DateWindow::unbounded(),
    };
    let classifier = load_classifier()?;

    let breakdown = CostAllocator::new(db, &classifier).insumos_by_field(account, &window);

    println!();
    println!("🧪 Input costs per field");
    print_warnings(&breakdown.warnings);
    println!();

    if breakdown.per_field.is_empty() {
        println!("   No input costs in this window.");
        return Ok(());
    }

    let fields = db.list_fields(account, &safra_core::models::FieldQuery::default())?;
    let mut per_field: Vec<(&String, &f64)> = breakdown.per_field.iter().collect();
    per_field.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (field_id, amount) in per_field {
        let name = fields
            .iter()
            .find(|f| &f.id == field_id)
            .map(|f| f.name.as_str())
            .unwrap_or(field_id.as_str());
        println!("   {:24} {:>14}", truncate(name, 24), format_brl(*amount));
    }

    println!();
    println!("   Linked to fields:    {:>14}", format_brl(breakdown.linked_total));
    println!("   Spread by area:      {:>14}", format_brl(breakdown.unlinked_total));
    println!("   Stock outflows:      {:>14}", format_brl(breakdown.stock_outflow_total));
    println!("   Total:               {:>14}", format_brl(breakdown.total()));

    Ok(())
}

pub fn cmd_report_indicators(db: &Database, account: &str, filter: &FilterArgs) -> Result<()> {
    let filter = build_filter(filter)?;
    let classifier = load_classifier()?;

    let indicators = CostAllocator::new(db, &classifier).indicators(account, &filter, today())?;

    println!();
    println!("📈 Indicators");
    println!("   ─────────────────────────────────────────");
    println!("   Total costs:        {:>14}", format_brl(indicators.total_costs));
    println!("   Total area:         {:>11.2} ha", indicators.total_area_ha);
    println!("   Cost per hectare:   {:>14}", format_brl(indicators.average_cost_per_ha));
    println!();

    for share in &indicators.distribution {
        println!(
            "   {:20} {:>14} {:>6.1}%",
            share.label,
            format_brl(share.amount),
            share.percentage
        );
    }
    println!();

    Ok(())
}

pub fn cmd_report_snapshot(db: &Database, account: &str, date: Option<&str>) -> Result<()> {
    let up_to = parse_date(date, "date")?.unwrap_or_else(today);
    let classifier = load_classifier()?;

    let snapshot = CostAllocator::new(db, &classifier).snapshot(account, up_to)?;

    println!();
    println!("📸 Field snapshot up to {}", up_to.format("%d/%m/%Y"));
    println!();

    if snapshot.is_empty() {
        println!("   No eligible fields.");
        return Ok(());
    }

    for field in &snapshot {
        println!("   {} ({:.2} ha)", field.field_name, field.area_ha);
        for group in MacroGroup::ALL {
            let amount = field.groups.get(group);
            if amount != 0.0 {
                println!("      {:20} {:>14}", group.label(), format_brl(amount));
            }
        }
    }
    println!();

    Ok(())
}
