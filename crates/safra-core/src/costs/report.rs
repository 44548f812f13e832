//! Cost-per-field report

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::{cost_per_ha, AreaShares, CostAllocator, CostFilter};
use crate::error::Result;
use crate::models::{CostReport, FieldCost, GroupTotals, Indicators, MacroGroup};
use crate::resolver::FieldResolver;
use crate::source::{LedgerSource, TransactionQuery};

impl<S: LedgerSource + ?Sized> CostAllocator<'_, S> {
    /// Per-field, per-group costs for the filtered fields.
    ///
    /// Input costs come from [`Self::insumos_by_field`]; every other group
    /// comes from paid expenses, charged to the field named in the linked
    /// area or spread by area when no field matches.
    pub fn cost_per_field(
        &self,
        account: &str,
        filter: &CostFilter,
        today: NaiveDate,
    ) -> Result<CostReport> {
        let fields = self.report_fields(account, filter)?;
        let window = filter.window(today)?;

        let insumos = self.insumos_by_field(account, &window);
        let mut totals: HashMap<&str, GroupTotals> = fields
            .iter()
            .map(|f| {
                let mut groups = GroupTotals::default();
                groups.add(MacroGroup::Insumos, insumos.for_field(&f.id));
                (f.id.as_str(), groups)
            })
            .collect();

        let transactions = self
            .source
            .transactions(account, &TransactionQuery::paid_expenses(window))?;

        let resolver = FieldResolver::new(&fields);
        let mut unattributed = GroupTotals::default();
        let mut skipped = 0usize;

        for tx in &transactions {
            let Some(group) = self.classifier.classify(&tx.category, &tx.description) else {
                debug!(
                    transaction = %tx.id,
                    category = %tx.category,
                    description = %tx.description,
                    "Unclassified transaction skipped"
                );
                skipped += 1;
                continue;
            };
            if group == MacroGroup::Insumos || !filter.admits(group) {
                continue;
            }

            let amount = tx.amount.abs();
            match resolver.resolve(&tx.linked_area) {
                Some(field) => {
                    let candidates = resolver.candidates(&tx.linked_area);
                    if candidates.len() > 1 {
                        let names: Vec<&str> = candidates.iter().map(|f| f.name.as_str()).collect();
                        warn!(
                            transaction = %tx.id,
                            linked_area = %tx.linked_area,
                            chosen = %field.name,
                            candidates = ?names,
                            "Ambiguous field reference"
                        );
                    }
                    if let Some(groups) = totals.get_mut(field.id.as_str()) {
                        groups.add(group, amount);
                    }
                }
                None => unattributed.add(group, amount),
            }
        }

        let shares = AreaShares::new(&fields);
        for group in MacroGroup::COSTS {
            if group == MacroGroup::Insumos {
                continue;
            }
            for (field_id, share) in shares.distribute(unattributed.get(group)) {
                if let Some(groups) = totals.get_mut(field_id) {
                    groups.add(group, share);
                }
            }
        }

        let rows: Vec<FieldCost> = fields
            .iter()
            .map(|f| {
                let groups = totals.get(f.id.as_str()).copied().unwrap_or_default();
                let total = groups.cost_total();
                FieldCost {
                    field_id: f.id.clone(),
                    field_name: f.name.clone(),
                    area_ha: f.area_ha,
                    groups,
                    total,
                    cost_per_ha: cost_per_ha(total, f.area_ha),
                }
            })
            .collect();

        info!(
            account,
            fields = rows.len(),
            transactions = transactions.len(),
            unclassified = skipped,
            from = ?window.start,
            to = ?window.end,
            "Computed cost per field"
        );

        Ok(CostReport {
            period: window.to_period(),
            rows,
            warnings: insumos.warnings,
        })
    }

    /// Headline figures for the same filters
    pub fn indicators(
        &self,
        account: &str,
        filter: &CostFilter,
        today: NaiveDate,
    ) -> Result<Indicators> {
        Ok(self.cost_per_field(account, filter, today)?.indicators())
    }
}
