//! Property and field command implementations

use anyhow::Result;
use safra_core::models::FieldQuery;
use safra_core::Database;

use super::truncate;

pub fn cmd_properties(db: &Database, account: &str) -> Result<()> {
    let properties = db.list_properties(account)?;

    if properties.is_empty() {
        println!("No properties found. Import a snapshot first.");
        return Ok(());
    }

    println!();
    println!("🏡 Properties");
    println!("   ─────────────────────────────────────────");
    for property in &properties {
        println!("   {:12} {}", truncate(&property.id, 12), property.name);
    }
    println!();

    Ok(())
}

pub fn cmd_safras(db: &Database, account: &str) -> Result<()> {
    let safras = db.list_safras(account)?;

    if safras.is_empty() {
        println!("No harvest seasons recorded on fields.");
        return Ok(());
    }

    println!("🌾 Harvest seasons:");
    for safra in &safras {
        println!("   {}", safra);
    }

    Ok(())
}

pub fn cmd_overview(db: &Database, account: &str) -> Result<()> {
    let overview = db.farm_overview(account)?;

    println!();
    println!("📐 Farm Overview");
    println!("   ─────────────────────────────────────────");
    println!("   Total area:       {:>10.2} ha", overview.total_area_ha);
    println!("   Cultivated area:  {:>10.2} ha", overview.cultivated_area_ha);
    println!(
        "   Fields:           {:>10} ({} active)",
        overview.field_count, overview.active_count
    );
    println!();

    Ok(())
}

pub fn cmd_fields_list(
    db: &Database,
    account: &str,
    property: Option<&str>,
    crop: Option<&str>,
    only_active: bool,
) -> Result<()> {
    let query = FieldQuery {
        only_active,
        non_default_only: false,
        crop: crop.map(String::from),
        property_id: property.map(String::from),
    };
    let fields = db.list_fields(account, &query)?;

    if fields.is_empty() {
        println!("No fields found.");
        return Ok(());
    }

    println!();
    println!(
        "   {:10} {:24} {:>10} {:12} {:10} {}",
        "ID", "Name", "Area (ha)", "Crop", "Safra", "Status"
    );
    println!("   {}", "─".repeat(78));

    for field in &fields {
        let status = if field.is_default {
            "default"
        } else if field.active {
            "active"
        } else {
            "inactive"
        };
        println!(
            "   {:10} {:24} {:>10.2} {:12} {:10} {}",
            truncate(&field.id, 10),
            truncate(&field.name, 24),
            field.area_ha,
            truncate(field.crop.as_deref().unwrap_or("-"), 12),
            field.safra.as_deref().unwrap_or("-"),
            status
        );
    }

    println!();
    println!("Total: {} fields", fields.len());

    Ok(())
}

pub fn cmd_fields_toggle(db: &Database, account: &str, id: &str) -> Result<()> {
    let active = db.toggle_field_active(account, id)?;

    db.log_audit(
        account,
        "toggle",
        Some("field"),
        Some(id),
        Some(&format!("active={}", active)),
    )?;

    if active {
        println!("✅ Field {} is now active", id);
    } else {
        println!("⏸️  Field {} is now inactive (left out of cost allocation)", id);
    }

    Ok(())
}
