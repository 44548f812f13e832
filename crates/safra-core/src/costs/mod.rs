//! Cost-per-field allocation pipeline
//!
//! This module is organized by stage:
//! - `insumos` - input costs from activity product lines and stock outflows
//! - `report` - cost-per-field report over all macro-groups
//! - `details` - line items behind one field's figures
//! - `snapshot` - revenue-inclusive totals up to a date
//!
//! Every stage works on a fresh set of accumulators; nothing is cached
//! between runs. Amounts that cannot be pinned to a field are spread over
//! fields in proportion to area.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::error::Result;
use crate::models::{Field, FieldQuery, MacroGroup};
use crate::normalize::normalize_name;
use crate::period::{resolve_window, DateWindow};
use crate::source::LedgerSource;

mod details;
mod insumos;
mod report;
mod snapshot;

#[cfg(test)]
mod tests;

pub use insumos::{InsumosBreakdown, InsumosLine};

/// Divisor turning stored product line costs into currency
pub const LINE_COST_SCALE: f64 = 1_000_000_000.0;

/// Currency amount of a fixed-point product line cost
pub fn line_cost(raw: i64) -> f64 {
    raw as f64 / LINE_COST_SCALE
}

/// Report filters; `month` takes precedence over `safra`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostFilter {
    /// `YYYY-MM`
    pub month: Option<String>,
    /// `YYYY/YYYY+1`
    pub safra: Option<String>,
    /// Field ids or names to keep; empty keeps all
    #[serde(default)]
    pub fields: Vec<String>,
    pub property_id: Option<String>,
    pub macro_group: Option<MacroGroup>,
}

impl CostFilter {
    pub fn window(&self, today: NaiveDate) -> Result<DateWindow> {
        resolve_window(self.month.as_deref(), self.safra.as_deref(), today)
    }

    fn keeps_field(&self, field: &Field) -> bool {
        if self.fields.is_empty() {
            return true;
        }
        let name = normalize_name(&field.name);
        self.fields
            .iter()
            .any(|f| *f == field.id || normalize_name(f) == name)
    }

    fn admits(&self, group: MacroGroup) -> bool {
        self.macro_group.map_or(true, |g| g == group)
    }
}

/// Area weights of a field set
#[derive(Debug, Clone, Default)]
pub struct AreaShares {
    areas: Vec<(String, f64)>,
    total: f64,
}

impl AreaShares {
    pub fn new<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = &'a Field>,
    {
        let areas: Vec<(String, f64)> = fields
            .into_iter()
            .map(|f| (f.id.clone(), f.area_ha.max(0.0)))
            .collect();
        let total = areas.iter().map(|(_, a)| a).sum();
        Self { areas, total }
    }

    pub fn total_area(&self) -> f64 {
        self.total
    }

    /// Share of the total area, 0 for unknown fields or a zero total
    pub fn fraction(&self, field_id: &str) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        self.areas
            .iter()
            .find(|(id, _)| id == field_id)
            .map_or(0.0, |(_, area)| area / self.total)
    }

    /// Split `pool` by area; nothing is handed out when the total is zero
    pub fn distribute(&self, pool: f64) -> Vec<(&str, f64)> {
        if self.total <= 0.0 || pool == 0.0 {
            return Vec::new();
        }
        self.areas
            .iter()
            .map(|(id, area)| (id.as_str(), pool * area / self.total))
            .collect()
    }
}

/// Cost per hectare, 0 when the area is not positive
pub fn cost_per_ha(total: f64, area_ha: f64) -> f64 {
    if area_ha > 0.0 {
        total / area_ha
    } else {
        0.0
    }
}

/// Runs the allocation stages against a ledger
pub struct CostAllocator<'a, S: LedgerSource + ?Sized> {
    source: &'a S,
    classifier: &'a Classifier,
}

impl<'a, S: LedgerSource + ?Sized> CostAllocator<'a, S> {
    pub fn new(source: &'a S, classifier: &'a Classifier) -> Self {
        Self { source, classifier }
    }

    /// Today's date in local time, for the default season
    pub fn today() -> NaiveDate {
        crate::period::today()
    }

    /// Active, non-default fields with positive area
    fn eligible_fields(&self, account: &str, property_id: Option<&str>) -> Result<Vec<Field>> {
        let query = FieldQuery {
            property_id: property_id.map(str::to_string),
            ..FieldQuery::eligible()
        };
        Ok(self
            .source
            .fields(account, &query)?
            .into_iter()
            .filter(Field::is_eligible)
            .collect())
    }

    /// Eligible fields narrowed by the report filters
    fn report_fields(&self, account: &str, filter: &CostFilter) -> Result<Vec<Field>> {
        Ok(self
            .eligible_fields(account, filter.property_id.as_deref())?
            .into_iter()
            .filter(|f| filter.keeps_field(f))
            .collect())
    }
}

/// Eligible linked fields of each activity, deduplicated, link order kept
fn fields_by_activity<'f>(
    links: &[crate::models::ActivityField],
    eligible: &'f [Field],
) -> HashMap<String, Vec<&'f Field>> {
    let mut map: HashMap<String, Vec<&Field>> = HashMap::new();
    for link in links {
        let Some(field) = eligible.iter().find(|f| f.id == link.field_id) else {
            continue;
        };
        let entry = map.entry(link.activity_id.clone()).or_default();
        if !entry.iter().any(|f| f.id == field.id) {
            entry.push(field);
        }
    }
    map
}
