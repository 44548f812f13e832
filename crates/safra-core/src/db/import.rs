//! JSON snapshot import
//!
//! A snapshot carries every record kind the store knows. Records are written
//! under the target account regardless of the account id they carry, and the
//! whole snapshot lands in one SQL transaction: a bad record leaves the
//! store untouched.

use std::collections::BTreeSet;

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{date_to_sql, datetime_to_sql, Database};
use crate::error::Result;
use crate::models::{
    Activity, ActivityField, Field, FinancialTransaction, NewDebt, ProductUsage, Property,
    StockMovement, StockProduct,
};

/// Full export of one account's records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub properties: Vec<Property>,
    pub fields: Vec<Field>,
    pub transactions: Vec<FinancialTransaction>,
    pub activities: Vec<Activity>,
    pub product_usages: Vec<ProductUsage>,
    pub activity_fields: Vec<ActivityField>,
    pub stock_movements: Vec<StockMovement>,
    pub stock_products: Vec<StockProduct>,
    pub debts: Vec<NewDebt>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Records written by an import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportStats {
    pub properties: usize,
    pub fields: usize,
    pub transactions: usize,
    pub activities: usize,
    pub product_usages: usize,
    pub activity_fields: usize,
    pub stock_movements: usize,
    pub stock_products: usize,
    pub debts: usize,
}

impl ImportStats {
    pub fn total(&self) -> usize {
        self.properties
            + self.fields
            + self.transactions
            + self.activities
            + self.product_usages
            + self.activity_fields
            + self.stock_movements
            + self.stock_products
            + self.debts
    }
}

impl Database {
    /// Write a snapshot under `account`, all or nothing
    ///
    /// Keyed records are upserted, so manual allocations survive a re-import.
    /// Product lines of imported activities and any stock or debt section the
    /// snapshot carries replace what is stored, so importing twice is a no-op.
    pub fn import_snapshot(&self, account: &str, snapshot: &Snapshot) -> Result<ImportStats> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut stats = ImportStats::default();

        for p in &snapshot.properties {
            tx.execute(
                r#"
                INSERT INTO properties (id, account_id, name) VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET account_id = excluded.account_id, name = excluded.name
                "#,
                params![p.id, account, p.name],
            )?;
            stats.properties += 1;
        }

        for f in &snapshot.fields {
            tx.execute(
                r#"
                INSERT INTO fields
                    (id, account_id, name, area_ha, active, is_default, property_id, crop, safra)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    account_id = excluded.account_id,
                    name = excluded.name,
                    area_ha = excluded.area_ha,
                    active = excluded.active,
                    is_default = excluded.is_default,
                    property_id = excluded.property_id,
                    crop = excluded.crop,
                    safra = excluded.safra
                "#,
                params![
                    f.id,
                    account,
                    f.name,
                    f.area_ha,
                    f.active,
                    f.is_default,
                    f.property_id,
                    f.crop,
                    f.safra,
                ],
            )?;
            stats.fields += 1;
        }

        for t in &snapshot.transactions {
            tx.execute(
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
                    t.id,
                    account,
                    t.amount,
                    t.category,
                    t.description,
                    t.linked_area,
                    date_to_sql(t.scheduled_date),
                    t.kind.as_str(),
                    t.status.as_str(),
                ],
            )?;
            stats.transactions += 1;
        }

        for a in &snapshot.activities {
            tx.execute(
                r#"
                INSERT INTO activities (id, account_id, name, date) VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    account_id = excluded.account_id,
                    name = excluded.name,
                    date = excluded.date
                "#,
                params![a.id, account, a.name, date_to_sql(a.date)],
            )?;
            stats.activities += 1;
        }

        // product lines carry no natural key: an imported activity's lines are replaced
        let touched: BTreeSet<&str> = snapshot
            .activities
            .iter()
            .map(|a| a.id.as_str())
            .chain(snapshot.product_usages.iter().map(|u| u.activity_id.as_str()))
            .collect();
        for activity_id in touched {
            tx.execute(
                "DELETE FROM activity_products WHERE activity_id = ?",
                params![activity_id],
            )?;
        }

        for u in &snapshot.product_usages {
            tx.execute(
                r#"
                INSERT INTO activity_products
                    (activity_id, product_id, product_name, quantity, unit, line_cost_raw)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    u.activity_id,
                    u.product_id,
                    u.product_name,
                    u.quantity,
                    u.unit,
                    u.line_cost_raw,
                ],
            )?;
            stats.product_usages += 1;
        }

        for l in &snapshot.activity_fields {
            stats.activity_fields += tx.execute(
                "INSERT OR IGNORE INTO activity_fields (activity_id, field_id) VALUES (?, ?)",
                params![l.activity_id, l.field_id],
            )?;
        }

        // stock and debt sections replace the account's rows when present
        if !snapshot.stock_movements.is_empty() {
            tx.execute(
                "DELETE FROM stock_movements WHERE account_id = ?",
                params![account],
            )?;
        }
        if !snapshot.stock_products.is_empty() {
            tx.execute(
                "DELETE FROM stock_products WHERE account_id = ?",
                params![account],
            )?;
        }
        if !snapshot.debts.is_empty() {
            tx.execute("DELETE FROM debts WHERE account_id = ?", params![account])?;
        }

        for m in &snapshot.stock_movements {
            tx.execute(
                r#"
                INSERT INTO stock_movements (account_id, product_name, kind, total_value, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![
                    account,
                    m.product_name,
                    m.kind.as_str(),
                    m.total_value,
                    datetime_to_sql(m.created_at),
                ],
            )?;
            stats.stock_movements += 1;
        }

        for p in &snapshot.stock_products {
            tx.execute(
                r#"
                INSERT INTO stock_products
                    (account_id, name, brand, category, unit, quantity, initial_quantity,
                     unit_price, price_unit, supplier, lot, expires_on, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    account,
                    p.name,
                    p.brand,
                    p.category,
                    p.unit,
                    p.quantity,
                    p.initial_quantity,
                    p.unit_price,
                    p.price_unit,
                    p.supplier,
                    p.lot,
                    p.expires_on.map(date_to_sql),
                    datetime_to_sql(p.created_at),
                ],
            )?;
            stats.stock_products += 1;
        }

        for d in &snapshot.debts {
            let plan = d
                .payment_plan
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            tx.execute(
                r#"
                INSERT INTO debts
                    (account_id, name, creditor, kind, contract_date, contracted_amount, rate,
                     grace_period, collateral, responsible, notes, payment_method, status, payment_plan)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    account,
                    d.name,
                    d.creditor,
                    d.kind,
                    date_to_sql(d.contract_date),
                    d.contracted_amount,
                    d.rate,
                    d.grace_period,
                    d.collateral,
                    d.responsible,
                    d.notes,
                    d.payment_method,
                    d.status.as_str(),
                    plan,
                ],
            )?;
            stats.debts += 1;
        }

        tx.commit()?;

        info!(
            account,
            fields = stats.fields,
            transactions = stats.transactions,
            activities = stats.activities,
            stock_movements = stats.stock_movements,
            total = stats.total(),
            "Imported snapshot"
        );

        Ok(stats)
    }
}
