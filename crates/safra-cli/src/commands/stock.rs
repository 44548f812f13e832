//! Stock command implementations

use anyhow::Result;
use safra_core::currency::format_brl;
use safra_core::Database;

use super::truncate;

pub fn cmd_stock_groups(db: &Database, account: &str) -> Result<()> {
    let groups = db.stock_groups(account)?;

    if groups.is_empty() {
        println!("No stock products registered.");
        return Ok(());
    }

    println!();
    println!("📦 Stock by product");
    println!(
        "   {:28} │ {:>14} │ {:>16} │ {}",
        "Product", "Avg price", "On hand", "Suppliers"
    );
    println!("   {}", "─".repeat(86));

    for group in &groups {
        let suppliers: Vec<&str> = group.suppliers.iter().map(|s| s.supplier.as_str()).collect();
        println!(
            "   {:28} │ {:>14} │ {:>16} │ {}",
            truncate(&group.name, 28),
            format!("{}/{}", format_brl(group.average_price), group.reference_unit),
            format!("{:.2} {}", group.display_stock, group.display_unit),
            suppliers.join(", ")
        );
    }

    println!();
    println!("Total: {} product groups", groups.len());

    Ok(())
}
