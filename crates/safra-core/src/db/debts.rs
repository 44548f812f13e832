//! Debts and financing contracts

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{date_to_sql, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Debt, DebtStatus, DebtTotals, NewDebt};

const DEBT_COLUMNS: &str = "id, account_id, name, creditor, kind, contract_date, \
    contracted_amount, rate, grace_period, collateral, responsible, notes, payment_method, \
    status, payment_plan, created_at, updated_at";

/// Debt row as stored
struct DebtRow {
    id: i64,
    account_id: String,
    name: String,
    creditor: String,
    kind: String,
    contract_date: String,
    contracted_amount: Option<f64>,
    rate: Option<String>,
    grace_period: Option<String>,
    collateral: Option<String>,
    responsible: Option<String>,
    notes: Option<String>,
    payment_method: Option<String>,
    status: String,
    payment_plan: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DebtRow {
    fn into_model(self) -> Result<Debt> {
        let payment_plan = match self.payment_plan.as_deref() {
            Some(json) if !json.trim().is_empty() => Some(serde_json::from_str(json)?),
            _ => None,
        };

        Ok(Debt {
            id: self.id,
            account_id: self.account_id,
            terms: NewDebt {
                name: self.name,
                creditor: self.creditor,
                kind: self.kind,
                contract_date: parse_date(&self.contract_date)?,
                contracted_amount: self.contracted_amount.unwrap_or(0.0),
                rate: self.rate,
                grace_period: self.grace_period,
                collateral: self.collateral,
                responsible: self.responsible,
                notes: self.notes,
                payment_method: self.payment_method,
                status: self.status.parse().map_err(Error::InvalidData)?,
                payment_plan,
            },
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn debt_row(row: &rusqlite::Row) -> rusqlite::Result<DebtRow> {
    Ok(DebtRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        creditor: row.get(3)?,
        kind: row.get(4)?,
        contract_date: row.get(5)?,
        contracted_amount: row.get(6)?,
        rate: row.get(7)?,
        grace_period: row.get(8)?,
        collateral: row.get(9)?,
        responsible: row.get(10)?,
        notes: row.get(11)?,
        payment_method: row.get(12)?,
        status: row.get(13)?,
        payment_plan: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn validate(debt: &NewDebt) -> Result<()> {
    if debt.name.trim().is_empty() {
        return Err(Error::InvalidData("Debt name is required".to_string()));
    }
    if debt.creditor.trim().is_empty() {
        return Err(Error::InvalidData("Creditor is required".to_string()));
    }
    if !debt.contracted_amount.is_finite() || debt.contracted_amount < 0.0 {
        return Err(Error::InvalidData(format!(
            "Invalid contracted amount: {}",
            debt.contracted_amount
        )));
    }
    Ok(())
}

impl Database {
    /// Create a debt
    pub fn create_debt(&self, account: &str, debt: &NewDebt) -> Result<i64> {
        validate(debt)?;
        let plan = debt
            .payment_plan
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO debts
                (account_id, name, creditor, kind, contract_date, contracted_amount, rate,
                 grace_period, collateral, responsible, notes, payment_method, status, payment_plan)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                account,
                debt.name,
                debt.creditor,
                debt.kind,
                date_to_sql(debt.contract_date),
                debt.contracted_amount,
                debt.rate,
                debt.grace_period,
                debt.collateral,
                debt.responsible,
                debt.notes,
                debt.payment_method,
                debt.status.as_str(),
                plan,
            ],
        )?;

        let id = conn.last_insert_rowid();
        info!(account, debt = id, creditor = %debt.creditor, "Created debt");
        Ok(id)
    }

    /// Get a debt by id
    pub fn get_debt(&self, account: &str, id: i64) -> Result<Option<Debt>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM debts WHERE account_id = ? AND id = ?",
                    DEBT_COLUMNS
                ),
                params![account, id],
                debt_row,
            )
            .optional()?;
        row.map(DebtRow::into_model).transpose()
    }

    /// List debts, newest contract first, optionally narrowed by status or kind
    pub fn list_debts(
        &self,
        account: &str,
        status: Option<DebtStatus>,
        kind: Option<&str>,
    ) -> Result<Vec<Debt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM debts
            WHERE account_id = ?1
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR kind = ?3)
            ORDER BY contract_date DESC, id DESC
            "#,
            DEBT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![account, status.map(|s| s.as_str()), kind],
                debt_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(DebtRow::into_model).collect()
    }

    /// Replace a debt's terms
    pub fn update_debt(&self, account: &str, id: i64, debt: &NewDebt) -> Result<()> {
        validate(debt)?;
        let plan = debt
            .payment_plan
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE debts SET
                name = ?, creditor = ?, kind = ?, contract_date = ?, contracted_amount = ?,
                rate = ?, grace_period = ?, collateral = ?, responsible = ?, notes = ?,
                payment_method = ?, status = ?, payment_plan = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE account_id = ? AND id = ?
            "#,
            params![
                debt.name,
                debt.creditor,
                debt.kind,
                date_to_sql(debt.contract_date),
                debt.contracted_amount,
                debt.rate,
                debt.grace_period,
                debt.collateral,
                debt.responsible,
                debt.notes,
                debt.payment_method,
                debt.status.as_str(),
                plan,
                account,
                id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("Debt {}", id)));
        }
        Ok(())
    }

    /// Change only the status
    pub fn set_debt_status(&self, account: &str, id: i64, status: DebtStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE debts SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE account_id = ? AND id = ?",
            params![status.as_str(), account, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Debt {}", id)));
        }
        info!(account, debt = id, status = %status, "Debt status changed");
        Ok(())
    }

    /// Mark a debt as paid off
    pub fn settle_debt(&self, account: &str, id: i64) -> Result<()> {
        self.set_debt_status(account, id, DebtStatus::Settled)
    }

    pub fn renegotiate_debt(&self, account: &str, id: i64) -> Result<()> {
        self.set_debt_status(account, id, DebtStatus::Renegotiated)
    }

    /// Delete a debt
    pub fn delete_debt(&self, account: &str, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM debts WHERE account_id = ? AND id = ?",
            params![account, id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Debt {}", id)));
        }
        Ok(())
    }

    /// Contracted amounts summed per status
    pub fn debt_totals(&self, account: &str) -> Result<DebtTotals> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT status, COALESCE(SUM(contracted_amount), 0.0)
            FROM debts
            WHERE account_id = ?
            GROUP BY status
            "#,
        )?;

        let rows = stmt
            .query_map(params![account], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut totals = DebtTotals::default();
        for (status, amount) in rows {
            match status.parse::<DebtStatus>().map_err(Error::InvalidData)? {
                DebtStatus::Active => totals.active += amount,
                DebtStatus::Settled => totals.settled += amount,
                DebtStatus::Renegotiated => totals.renegotiated += amount,
            }
        }
        Ok(totals)
    }
}
