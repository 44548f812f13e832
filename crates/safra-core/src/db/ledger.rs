//! Financial transactions, agricultural activities and the ledger reads
//! the allocation pipeline runs on

use rusqlite::{params, params_from_iter, OptionalExtension};

use super::{date_to_sql, parse_date, Database};
use crate::error::{Error, Result};
use crate::models::{
    Activity, ActivityField, Field, FieldQuery, FinancialTransaction, MovementKind, ProductUsage,
    StockMovement,
};
use crate::period::DateWindow;
use crate::source::{LedgerSource, TransactionQuery};

/// Transaction row as stored; kind and status are checked on conversion
struct TransactionRow {
    id: String,
    account_id: String,
    amount: Option<f64>,
    category: Option<String>,
    description: Option<String>,
    linked_area: Option<String>,
    scheduled_date: String,
    kind: String,
    status: String,
}

impl TransactionRow {
    fn into_model(self) -> Result<FinancialTransaction> {
        Ok(FinancialTransaction {
            kind: self.kind.parse().map_err(Error::InvalidData)?,
            status: self.status.parse().map_err(Error::InvalidData)?,
            scheduled_date: parse_date(&self.scheduled_date)?,
            id: self.id,
            account_id: self.account_id,
            amount: self.amount.unwrap_or(0.0),
            category: self.category.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            linked_area: self.linked_area.unwrap_or_default(),
        })
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, account_id, amount, category, description, linked_area, scheduled_date, kind, status";

fn transaction_row(row: &rusqlite::Row) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        linked_area: row.get(5)?,
        scheduled_date: row.get(6)?,
        kind: row.get(7)?,
        status: row.get(8)?,
    })
}

/// `?, ?, ?` for an IN clause
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl Database {
    /// Insert or replace a ledger transaction
    pub fn upsert_transaction(&self, tx: &FinancialTransaction) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO transactions
                (id, account_id, amount, category, description, linked_area, scheduled_date, kind, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                amount = excluded.amount,
                category = excluded.category,
                description = excluded.description,
                linked_area = excluded.linked_area,
                scheduled_date = excluded.scheduled_date,
                kind = excluded.kind,
                status = excluded.status
            "#,
            params![
                tx.id,
                tx.account_id,
                tx.amount,
                tx.category,
                tx.description,
                tx.linked_area,
                date_to_sql(tx.scheduled_date),
                tx.kind.as_str(),
                tx.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Get a transaction by id
    pub fn get_transaction(&self, account: &str, id: &str) -> Result<Option<FinancialTransaction>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE account_id = ? AND id = ?",
                    TRANSACTION_COLUMNS
                ),
                params![account, id],
                transaction_row,
            )
            .optional()?;
        row.map(TransactionRow::into_model).transpose()
    }

    /// List transactions matching kind, status and an inclusive date window
    pub fn list_transactions(
        &self,
        account: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<FinancialTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE account_id = ?1
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR status = ?3)
              AND (?4 IS NULL OR scheduled_date >= ?4)
              AND (?5 IS NULL OR scheduled_date <= ?5)
            ORDER BY scheduled_date, id
            "#,
            TRANSACTION_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![
                    account,
                    query.kind.map(|k| k.as_str()),
                    query.status.map(|s| s.as_str()),
                    query.window.start.map(date_to_sql),
                    query.window.end.map(date_to_sql),
                ],
                transaction_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(TransactionRow::into_model).collect()
    }

    /// Insert or replace an activity
    pub fn upsert_activity(&self, activity: &Activity) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO activities (id, account_id, name, date) VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                name = excluded.name,
                date = excluded.date
            "#,
            params![
                activity.id,
                activity.account_id,
                activity.name,
                date_to_sql(activity.date),
            ],
        )?;
        Ok(())
    }

    /// Add a product line to an activity
    pub fn add_product_usage(&self, usage: &ProductUsage) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO activity_products
                (activity_id, product_id, product_name, quantity, unit, line_cost_raw)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                usage.activity_id,
                usage.product_id,
                usage.product_name,
                usage.quantity,
                usage.unit,
                usage.line_cost_raw,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Record that an activity touched a field
    pub fn link_activity_field(&self, activity_id: &str, field_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO activity_fields (activity_id, field_id) VALUES (?, ?)",
            params![activity_id, field_id],
        )?;
        Ok(())
    }

    /// Activities dated inside `window`
    pub fn list_activities(&self, account: &str, window: &DateWindow) -> Result<Vec<Activity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, account_id, name, date
            FROM activities
            WHERE account_id = ?1
              AND (?2 IS NULL OR date >= ?2)
              AND (?3 IS NULL OR date <= ?3)
            ORDER BY date, id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    account,
                    window.start.map(date_to_sql),
                    window.end.map(date_to_sql),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, account_id, name, date)| {
                Ok(Activity {
                    id,
                    account_id,
                    name,
                    date: parse_date(&date)?,
                })
            })
            .collect()
    }

    /// Product lines of the given activities that reference a product
    pub fn list_product_usages(&self, activity_ids: &[String]) -> Result<Vec<ProductUsage>> {
        if activity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT activity_id, product_id, product_name, quantity, unit, line_cost_raw
            FROM activity_products
            WHERE product_id IS NOT NULL AND activity_id IN ({})
            ORDER BY id
            "#,
            placeholders(activity_ids.len())
        ))?;

        let usages = stmt
            .query_map(params_from_iter(activity_ids.iter()), |row| {
                Ok(ProductUsage {
                    activity_id: row.get(0)?,
                    product_id: row.get(1)?,
                    product_name: row.get(2)?,
                    quantity: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    unit: row.get(4)?,
                    line_cost_raw: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(usages)
    }

    /// Field links of the given activities
    pub fn list_activity_fields(&self, activity_ids: &[String]) -> Result<Vec<ActivityField>> {
        if activity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT activity_id, field_id
            FROM activity_fields
            WHERE activity_id IN ({})
            ORDER BY rowid
            "#,
            placeholders(activity_ids.len())
        ))?;

        let links = stmt
            .query_map(params_from_iter(activity_ids.iter()), |row| {
                Ok(ActivityField {
                    activity_id: row.get(0)?,
                    field_id: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(links)
    }
}

impl LedgerSource for Database {
    fn fields(&self, account: &str, query: &FieldQuery) -> Result<Vec<Field>> {
        self.list_fields(account, query)
    }

    fn transactions(
        &self,
        account: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<FinancialTransaction>> {
        self.list_transactions(account, query)
    }

    fn activities(&self, account: &str, window: &DateWindow) -> Result<Vec<Activity>> {
        self.list_activities(account, window)
    }

    fn product_usages(&self, activity_ids: &[String]) -> Result<Vec<ProductUsage>> {
        self.list_product_usages(activity_ids)
    }

    fn activity_fields(&self, activity_ids: &[String]) -> Result<Vec<ActivityField>> {
        self.list_activity_fields(activity_ids)
    }

    fn stock_movements(
        &self,
        account: &str,
        kind: MovementKind,
        window: &DateWindow,
    ) -> Result<Vec<StockMovement>> {
        self.list_stock_movements(account, kind, window)
    }
}
