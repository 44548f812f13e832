//! Line items behind one field's figures
//!
//! Mirrors the report: direct charges appear in full, pooled amounts appear
//! as the field's area share with the percentage spelled out, so a field's
//! detail lines add up to its report row.

use chrono::NaiveDate;
use tracing::info;

use super::{fields_by_activity, line_cost, AreaShares, CostAllocator, CostFilter};
use crate::error::{Error, Result};
use crate::models::{CostDetail, DetailOrigin, MacroGroup, MovementKind};
use crate::resolver::FieldResolver;
use crate::source::{LedgerSource, TransactionQuery};

impl<S: LedgerSource + ?Sized> CostAllocator<'_, S> {
    /// Contributing line items for `field_id`, newest first
    pub fn field_details(
        &self,
        account: &str,
        field_id: &str,
        filter: &CostFilter,
        today: NaiveDate,
    ) -> Result<Vec<CostDetail>> {
        let report_fields = self.report_fields(account, filter)?;
        if !report_fields.iter().any(|f| f.id == field_id) {
            return Err(Error::NotFound(format!(
                "Field {} is not part of this report",
                field_id
            )));
        }

        let window = filter.window(today)?;
        let eligible = self.eligible_fields(account, None)?;
        let input_share = AreaShares::new(&eligible).fraction(field_id);
        let input_pct = input_share * 100.0;

        let mut details = Vec::new();

        // Input costs: activity product lines
        let records = self.activity_records(account, &window)?;
        let linked = fields_by_activity(&records.links, &eligible);

        for usage in &records.usages {
            let cost = line_cost(usage.line_cost_raw);
            if cost <= 0.0 {
                continue;
            }
            let Some(activity) = records.activities.iter().find(|a| a.id == usage.activity_id)
            else {
                continue;
            };

            let product = usage.product_name.as_deref().unwrap_or("Produto");
            let unit = usage.unit.as_deref().unwrap_or("un");

            match linked.get(&usage.activity_id) {
                Some(fields) if !fields.is_empty() => {
                    if !fields.iter().any(|f| f.id == field_id) {
                        continue;
                    }
                    let count = fields.len() as f64;
                    details.push(CostDetail {
                        date: activity.date,
                        category: MacroGroup::Insumos.label().to_string(),
                        description: format!(
                            "{} - {} ({} {})",
                            activity.name,
                            product,
                            usage.quantity / count,
                            unit
                        ),
                        origin: DetailOrigin::Activity,
                        amount: cost / count,
                        macro_group: MacroGroup::Insumos,
                    });
                }
                _ => {
                    if input_share <= 0.0 {
                        continue;
                    }
                    details.push(CostDetail {
                        date: activity.date,
                        category: MacroGroup::Insumos.label().to_string(),
                        description: format!(
                            "{} - {} ({} {}) - {:.2}% da área",
                            activity.name, product, usage.quantity, unit, input_pct
                        ),
                        origin: DetailOrigin::Activity,
                        amount: cost * input_share,
                        macro_group: MacroGroup::Insumos,
                    });
                }
            }
        }

        // Input costs: stock outflows
        if input_share > 0.0 {
            let movements = self
                .source
                .stock_movements(account, MovementKind::Outflow, &window)?;
            for movement in movements {
                let value = movement.total_value.abs();
                if value <= 0.0 {
                    continue;
                }
                details.push(CostDetail {
                    date: movement.created_at.date(),
                    category: MacroGroup::Insumos.label().to_string(),
                    description: format!(
                        "Saída de Estoque - {} ({:.2}% da área)",
                        movement.product_name.as_deref().unwrap_or("Produto"),
                        input_pct
                    ),
                    origin: DetailOrigin::Stock,
                    amount: value * input_share,
                    macro_group: MacroGroup::Insumos,
                });
            }
        }

        // Other groups: paid expenses
        let report_share = AreaShares::new(&report_fields).fraction(field_id);
        let report_pct = report_share * 100.0;
        let resolver = FieldResolver::new(&report_fields);
        let transactions = self
            .source
            .transactions(account, &TransactionQuery::paid_expenses(window))?;

        for tx in &transactions {
            let Some(group) = self.classifier.classify(&tx.category, &tx.description) else {
                continue;
            };
            if group == MacroGroup::Insumos || !filter.admits(group) {
                continue;
            }
            let amount = tx.amount.abs();
            if amount <= 0.0 {
                continue;
            }

            let label = if !tx.description.trim().is_empty() {
                tx.description.trim()
            } else if !tx.category.trim().is_empty() {
                tx.category.trim()
            } else {
                group.label()
            };

            match resolver.resolve(&tx.linked_area) {
                Some(field) if field.id == field_id => details.push(CostDetail {
                    date: tx.scheduled_date,
                    category: group.label().to_string(),
                    description: label.to_string(),
                    origin: DetailOrigin::Financial,
                    amount,
                    macro_group: group,
                }),
                Some(_) => {}
                None => {
                    if report_share <= 0.0 {
                        continue;
                    }
                    details.push(CostDetail {
                        date: tx.scheduled_date,
                        category: group.label().to_string(),
                        description: format!("{} - {:.2}% da área", label, report_pct),
                        origin: DetailOrigin::Financial,
                        amount: amount * report_share,
                        macro_group: group,
                    });
                }
            }
        }

        // stable: equal dates keep fetch order
        details.sort_by(|a, b| b.date.cmp(&a.date));

        info!(
            account,
            field = field_id,
            items = details.len(),
            "Expanded field cost details"
        );

        Ok(details)
    }
}
