//! Revenue-inclusive totals up to a date

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;

use super::{AreaShares, CostAllocator};
use crate::error::Result;
use crate::models::{FieldSnapshot, GroupTotals, MacroGroup};
use crate::period::DateWindow;
use crate::resolver::FieldResolver;
use crate::source::{LedgerSource, TransactionQuery};

impl<S: LedgerSource + ?Sized> CostAllocator<'_, S> {
    /// Ledger totals per field for everything paid on or before `up_to`.
    ///
    /// Classifies against all six groups, revenue included, and does not
    /// look at activities or stock.
    pub fn snapshot(&self, account: &str, up_to: NaiveDate) -> Result<Vec<FieldSnapshot>> {
        let fields = self.eligible_fields(account, None)?;
        let transactions = self.source.transactions(
            account,
            &TransactionQuery::paid_expenses(DateWindow::up_to(up_to)),
        )?;

        let resolver = FieldResolver::new(&fields);
        let mut totals: HashMap<&str, GroupTotals> = fields
            .iter()
            .map(|f| (f.id.as_str(), GroupTotals::default()))
            .collect();
        let mut unattributed = GroupTotals::default();

        for tx in &transactions {
            let Some(group) = self
                .classifier
                .classify_with_revenue(&tx.category, &tx.description)
            else {
                continue;
            };
            let amount = tx.amount.abs();
            match resolver.resolve(&tx.linked_area) {
                Some(field) => {
                    if let Some(groups) = totals.get_mut(field.id.as_str()) {
                        groups.add(group, amount);
                    }
                }
                None => unattributed.add(group, amount),
            }
        }

        let shares = AreaShares::new(&fields);
        for group in MacroGroup::ALL {
            for (field_id, share) in shares.distribute(unattributed.get(group)) {
                if let Some(groups) = totals.get_mut(field_id) {
                    groups.add(group, share);
                }
            }
        }

        info!(
            account,
            %up_to,
            fields = fields.len(),
            transactions = transactions.len(),
            "Computed ledger snapshot"
        );

        Ok(fields
            .iter()
            .map(|f| FieldSnapshot {
                field_id: f.id.clone(),
                field_name: f.name.clone(),
                area_ha: f.area_ha,
                groups: totals.get(f.id.as_str()).copied().unwrap_or_default(),
            })
            .collect())
    }
}
