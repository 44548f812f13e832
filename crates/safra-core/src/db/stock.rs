//! Stock movements and registered stock products

use rusqlite::params;

use super::{date_to_sql, datetime_to_sql, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{MovementKind, StockMovement, StockProduct};
use crate::period::DateWindow;
use crate::stock::{group_products, ProductGroup};

impl Database {
    /// Record a stock movement
    pub fn add_stock_movement(&self, movement: &StockMovement) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO stock_movements (account_id, product_name, kind, total_value, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                movement.account_id,
                movement.product_name,
                movement.kind.as_str(),
                movement.total_value,
                datetime_to_sql(movement.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Movements of one kind whose day falls inside `window`
    pub fn list_stock_movements(
        &self,
        account: &str,
        kind: MovementKind,
        window: &DateWindow,
    ) -> Result<Vec<StockMovement>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, account_id, product_name, kind, total_value, created_at
            FROM stock_movements
            WHERE account_id = ?1
              AND kind = ?2
              AND (?3 IS NULL OR substr(created_at, 1, 10) >= ?3)
              AND (?4 IS NULL OR substr(created_at, 1, 10) <= ?4)
            ORDER BY created_at, id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    account,
                    kind.as_str(),
                    window.start.map(date_to_sql),
                    window.end.map(date_to_sql),
                ],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, account_id, product_name, kind, total_value, created_at)| {
                Ok(StockMovement {
                    id,
                    account_id,
                    product_name,
                    kind: kind.parse().map_err(Error::InvalidData)?,
                    total_value: total_value.unwrap_or(0.0),
                    created_at: parse_datetime(&created_at)?,
                })
            })
            .collect()
    }

    /// Register a stock entry
    pub fn add_stock_product(&self, product: &StockProduct) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO stock_products
                (account_id, name, brand, category, unit, quantity, initial_quantity,
                 unit_price, price_unit, supplier, lot, expires_on, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                product.account_id,
                product.name,
                product.brand,
                product.category,
                product.unit,
                product.quantity,
                product.initial_quantity,
                product.unit_price,
                product.price_unit,
                product.supplier,
                product.lot,
                product.expires_on.map(date_to_sql),
                datetime_to_sql(product.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Registered stock entries, oldest first
    pub fn list_stock_products(&self, account: &str) -> Result<Vec<StockProduct>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, account_id, name, brand, category, unit, quantity, initial_quantity,
                   unit_price, price_unit, supplier, lot, expires_on, created_at
            FROM stock_products
            WHERE account_id = ?
            ORDER BY created_at, id
            "#,
        )?;

        let rows = stmt
            .query_map(params![account], |row| {
                let expires_on: Option<String> = row.get(12)?;
                let created_at: String = row.get(13)?;
                Ok((
                    StockProduct {
                        id: row.get(0)?,
                        account_id: row.get(1)?,
                        name: row.get(2)?,
                        brand: row.get(3)?,
                        category: row.get(4)?,
                        unit: row.get(5)?,
                        quantity: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                        initial_quantity: row.get(7)?,
                        unit_price: row.get(8)?,
                        price_unit: row.get(9)?,
                        supplier: row.get(10)?,
                        lot: row.get(11)?,
                        expires_on: None,
                        created_at: Default::default(),
                    },
                    expires_on,
                    created_at,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut product, expires_on, created_at)| {
                product.expires_on = expires_on.as_deref().map(parse_date).transpose()?;
                product.created_at = parse_datetime(&created_at)?;
                Ok(product)
            })
            .collect()
    }

    /// Stock entries clustered by similar product names
    pub fn stock_groups(&self, account: &str) -> Result<Vec<ProductGroup>> {
        Ok(group_products(&self.list_stock_products(account)?))
    }
}
