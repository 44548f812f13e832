//! Manual allocation of a transaction across fields by percentage

use rusqlite::params;
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AllocationInput, FieldAllocation};

/// Allowed distance of the percentage sum from 100
const SUM_TOLERANCE: f64 = 0.01;

/// Check that entries form a complete split of one transaction
pub fn validate_allocations(entries: &[AllocationInput]) -> Result<()> {
    if entries.is_empty() {
        return Err(Error::InvalidData(
            "At least one field allocation is required".to_string(),
        ));
    }

    for entry in entries {
        if !(0.0..=100.0).contains(&entry.percentage) {
            return Err(Error::InvalidData(format!(
                "Percentage for field {} must be between 0 and 100, got {}",
                entry.field_id, entry.percentage
            )));
        }
    }

    let sum: f64 = entries.iter().map(|e| e.percentage).sum();
    if (sum - 100.0).abs() > SUM_TOLERANCE {
        return Err(Error::InvalidData(format!(
            "Allocations must add up to 100%, got {:.2}%",
            sum
        )));
    }

    Ok(())
}

const ALLOCATION_SELECT: &str = r#"
    SELECT a.id, a.transaction_id, a.field_id, f.name, a.percentage, a.created_at
    FROM field_allocations a
    LEFT JOIN fields f ON f.id = a.field_id
"#;

impl Database {
    /// Store a validated split for a transaction
    pub fn save_allocations(&self, transaction_id: &str, entries: &[AllocationInput]) -> Result<()> {
        validate_allocations(entries)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for entry in entries {
            tx.execute(
                "INSERT INTO field_allocations (transaction_id, field_id, percentage) VALUES (?, ?, ?)",
                params![transaction_id, entry.field_id, entry.percentage],
            )?;
        }
        tx.commit()?;

        info!(transaction = transaction_id, fields = entries.len(), "Saved field allocations");
        Ok(())
    }

    /// Swap a transaction's split for a new one in a single transaction
    pub fn replace_allocations(
        &self,
        transaction_id: &str,
        entries: &[AllocationInput],
    ) -> Result<()> {
        validate_allocations(entries)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM field_allocations WHERE transaction_id = ?",
            params![transaction_id],
        )?;
        for entry in entries {
            tx.execute(
                "INSERT INTO field_allocations (transaction_id, field_id, percentage) VALUES (?, ?, ?)",
                params![transaction_id, entry.field_id, entry.percentage],
            )?;
        }
        tx.commit()?;

        info!(transaction = transaction_id, fields = entries.len(), "Replaced field allocations");
        Ok(())
    }

    /// A transaction's split, with field names
    pub fn list_allocations(&self, transaction_id: &str) -> Result<Vec<FieldAllocation>> {
        self.query_allocations("a.transaction_id", transaction_id)
    }

    /// Every split entry that points at a field
    pub fn list_field_allocations(&self, field_id: &str) -> Result<Vec<FieldAllocation>> {
        self.query_allocations("a.field_id", field_id)
    }

    /// Remove a transaction's split; returns the number of entries removed
    pub fn delete_allocations(&self, transaction_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM field_allocations WHERE transaction_id = ?",
            params![transaction_id],
        )?;
        Ok(deleted)
    }

    fn query_allocations(&self, column: &str, value: &str) -> Result<Vec<FieldAllocation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE {} = ? ORDER BY a.id",
            ALLOCATION_SELECT, column
        ))?;

        let rows = stmt
            .query_map(params![value], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, transaction_id, field_id, field_name, percentage, created_at)| {
                    Ok(FieldAllocation {
                        id,
                        transaction_id,
                        field_id,
                        field_name,
                        percentage,
                        created_at: parse_datetime(&created_at)?,
                    })
                },
            )
            .collect()
    }
}
