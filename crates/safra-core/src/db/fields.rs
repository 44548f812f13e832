//! Properties, fields and the farm overview

use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{FarmOverview, Field, FieldQuery, Property};

const FIELD_COLUMNS: &str =
    "id, account_id, name, area_ha, active, is_default, property_id, crop, safra";

fn field_from_row(row: &Row) -> rusqlite::Result<Field> {
    Ok(Field {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        area_ha: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
        active: row.get(4)?,
        is_default: row.get(5)?,
        property_id: row.get(6)?,
        crop: row.get(7)?,
        safra: row.get(8)?,
    })
}

impl Database {
    /// Insert or replace a property
    pub fn upsert_property(&self, property: &Property) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO properties (id, account_id, name) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET account_id = excluded.account_id, name = excluded.name
            "#,
            params![property.id, property.account_id, property.name],
        )?;
        Ok(())
    }

    /// List an account's properties by name
    pub fn list_properties(&self, account: &str) -> Result<Vec<Property>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, name FROM properties WHERE account_id = ? ORDER BY name",
        )?;

        let properties = stmt
            .query_map(params![account], |row| {
                Ok(Property {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(properties)
    }

    /// Insert or replace a field
    pub fn upsert_field(&self, field: &Field) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO fields (id, account_id, name, area_ha, active, is_default, property_id, crop, safra)
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
                field.id,
                field.account_id,
                field.name,
                field.area_ha,
                field.active,
                field.is_default,
                field.property_id,
                field.crop,
                field.safra,
            ],
        )?;
        Ok(())
    }

    /// Get a field by id
    pub fn get_field(&self, account: &str, id: &str) -> Result<Option<Field>> {
        let conn = self.conn()?;
        let field = conn
            .query_row(
                &format!(
                    "SELECT {} FROM fields WHERE account_id = ? AND id = ?",
                    FIELD_COLUMNS
                ),
                params![account, id],
                field_from_row,
            )
            .optional()?;
        Ok(field)
    }

    /// List fields matching the registry filters, by name
    pub fn list_fields(&self, account: &str, query: &FieldQuery) -> Result<Vec<Field>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM fields
            WHERE account_id = ?1
              AND (?2 = 0 OR active = 1)
              AND (?3 = 0 OR is_default = 0)
              AND (?4 IS NULL OR crop = ?4)
              AND (?5 IS NULL OR property_id = ?5)
            ORDER BY name, id
            "#,
            FIELD_COLUMNS
        ))?;

        let fields = stmt
            .query_map(
                params![
                    account,
                    query.only_active,
                    query.non_default_only,
                    query.crop,
                    query.property_id,
                ],
                field_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(fields)
    }

    /// Distinct harvest-season labels recorded on fields, newest first
    pub fn list_safras(&self, account: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT safra FROM fields
            WHERE account_id = ? AND safra IS NOT NULL AND TRIM(safra) != ''
            ORDER BY safra DESC
            "#,
        )?;

        let safras = stmt
            .query_map(params![account], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(safras)
    }

    /// Area and field counts over non-default fields
    pub fn farm_overview(&self, account: &str) -> Result<FarmOverview> {
        let conn = self.conn()?;
        let overview = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(COALESCE(area_ha, 0.0)), 0.0),
                COALESCE(SUM(CASE WHEN active = 1 AND crop IS NOT NULL AND TRIM(crop) != ''
                                  THEN COALESCE(area_ha, 0.0) ELSE 0.0 END), 0.0),
                COUNT(*),
                COALESCE(SUM(CASE WHEN active = 1 THEN 1 ELSE 0 END), 0)
            FROM fields
            WHERE account_id = ? AND is_default = 0
            "#,
            params![account],
            |row| {
                Ok(FarmOverview {
                    total_area_ha: row.get(0)?,
                    cultivated_area_ha: row.get(1)?,
                    field_count: row.get::<_, i64>(2)? as usize,
                    active_count: row.get::<_, i64>(3)? as usize,
                })
            },
        )?;
        Ok(overview)
    }

    /// Flip a field's active flag and return the new state
    pub fn toggle_field_active(&self, account: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE fields SET active = NOT active WHERE account_id = ? AND id = ?",
            params![account, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Field {}", id)));
        }

        let active: bool = conn.query_row(
            "SELECT active FROM fields WHERE account_id = ? AND id = ?",
            params![account, id],
            |row| row.get(0),
        )?;

        info!(account, field = id, active, "Toggled field");
        Ok(active)
    }
}
