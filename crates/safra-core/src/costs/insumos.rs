//! Input costs ("insumos") per field
//!
//! Product lines of activities linked to eligible fields are split evenly
//! across those fields. Lines of unlinked activities and stock outflows form
//! a pool that is spread by area. Read failures never abort the dashboard:
//! they yield zero figures plus a warning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{fields_by_activity, line_cost, AreaShares, CostAllocator};
use crate::error::Result;
use crate::models::{Activity, ActivityField, MovementKind, ProductUsage};
use crate::period::DateWindow;
use crate::source::LedgerSource;

/// Share of one product line charged directly to a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsumosLine {
    pub field_id: String,
    pub activity_id: String,
    pub product_name: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub cost: f64,
}

/// Input costs for a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsumosBreakdown {
    pub per_field: HashMap<String, f64>,
    pub lines: Vec<InsumosLine>,
    /// Lines charged directly to linked fields
    pub linked_total: f64,
    /// Lines of activities without an eligible field
    pub unlinked_total: f64,
    pub stock_outflow_total: f64,
    pub warnings: Vec<String>,
}

impl InsumosBreakdown {
    pub fn for_field(&self, field_id: &str) -> f64 {
        self.per_field.get(field_id).copied().unwrap_or(0.0)
    }

    /// Everything that entered the breakdown
    pub fn total(&self) -> f64 {
        self.linked_total + self.unlinked_total + self.stock_outflow_total
    }

    fn failed(message: String) -> Self {
        Self {
            warnings: vec![message],
            ..Default::default()
        }
    }
}

/// Activity-side records of one window
pub(super) struct ActivityRecords {
    pub activities: Vec<Activity>,
    pub usages: Vec<ProductUsage>,
    pub links: Vec<ActivityField>,
}

impl<S: LedgerSource + ?Sized> CostAllocator<'_, S> {
    /// Input cost of every eligible field for `window`
    pub fn insumos_by_field(&self, account: &str, window: &DateWindow) -> InsumosBreakdown {
        let eligible = match self.eligible_fields(account, None) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(error = %e, "Failed to load fields for input costs");
                return InsumosBreakdown::failed(format!("Input costs unavailable: {}", e));
            }
        };

        let records = match self.activity_records(account, window) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Failed to load activities for input costs");
                return InsumosBreakdown::failed(format!("Input costs unavailable: {}", e));
            }
        };

        let mut breakdown = InsumosBreakdown::default();
        let linked = fields_by_activity(&records.links, &eligible);

        for usage in &records.usages {
            let cost = line_cost(usage.line_cost_raw);
            if cost <= 0.0 {
                continue;
            }

            match linked.get(&usage.activity_id) {
                Some(fields) if !fields.is_empty() => {
                    let count = fields.len() as f64;
                    for field in fields {
                        *breakdown.per_field.entry(field.id.clone()).or_insert(0.0) +=
                            cost / count;
                        breakdown.lines.push(InsumosLine {
                            field_id: field.id.clone(),
                            activity_id: usage.activity_id.clone(),
                            product_name: usage.product_name.clone(),
                            quantity: usage.quantity / count,
                            unit: usage.unit.clone(),
                            cost: cost / count,
                        });
                    }
                    breakdown.linked_total += cost;
                }
                _ => breakdown.unlinked_total += cost,
            }
        }

        match self
            .source
            .stock_movements(account, MovementKind::Outflow, window)
        {
            Ok(movements) => {
                breakdown.stock_outflow_total =
                    movements.iter().map(|m| m.total_value.abs()).sum();
            }
            Err(e) => {
                warn!(error = %e, "Failed to load stock outflows");
                breakdown
                    .warnings
                    .push(format!("Stock outflows unavailable: {}", e));
            }
        }

        let pool = breakdown.unlinked_total + breakdown.stock_outflow_total;
        let shares = AreaShares::new(&eligible);
        for (field_id, share) in shares.distribute(pool) {
            *breakdown.per_field.entry(field_id.to_string()).or_insert(0.0) += share;
        }

        for field in &eligible {
            breakdown.per_field.entry(field.id.clone()).or_insert(0.0);
        }

        info!(
            fields = eligible.len(),
            linked = breakdown.linked_total,
            unlinked = breakdown.unlinked_total,
            stock_outflows = breakdown.stock_outflow_total,
            "Computed input costs"
        );

        breakdown
    }

    /// Activities in `window` with their product lines and field links
    pub(super) fn activity_records(
        &self,
        account: &str,
        window: &DateWindow,
    ) -> Result<ActivityRecords> {
        let activities = self.source.activities(account, window)?;
        if activities.is_empty() {
            debug!("No activities in window");
            return Ok(ActivityRecords {
                activities,
                usages: Vec::new(),
                links: Vec::new(),
            });
        }

        let ids: Vec<String> = activities.iter().map(|a| a.id.clone()).collect();
        let usages = self.source.product_usages(&ids)?;
        let links = self.source.activity_fields(&ids)?;

        Ok(ActivityRecords {
            activities,
            usages,
            links,
        })
    }
}
