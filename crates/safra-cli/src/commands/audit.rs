//! Audit log command

use anyhow::Result;
use safra_core::Database;

pub fn cmd_audit(db: &Database, account: &str, limit: i64) -> Result<()> {
    let entries = db.list_audit_log(account, limit.max(1))?;

    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }

    println!();
    println!("📜 Audit log (latest {})", entries.len());
    for entry in &entries {
        let target = match (&entry.entity_type, &entry.entity_id) {
            (Some(kind), Some(id)) => format!("{} {}", kind, id),
            (Some(kind), None) => kind.clone(),
            _ => String::new(),
        };
        println!(
            "   {}  {:8} {:20} {}",
            entry.timestamp,
            entry.action,
            target,
            entry.details.as_deref().unwrap_or("")
        );
    }
    println!();

    Ok(())
}
