//! Export of cost reports and account snapshots
//!
//! Supports:
//! - Cost-per-field rows and field detail lines as CSV or JSON
//! - Full JSON snapshot of an account, readable by [`Database::import_snapshot`]

use serde::Serialize;

use crate::db::{Database, Snapshot};
use crate::error::{Error, Result};
use crate::models::{CostDetail, CostReport, FieldQuery, MovementKind};
use crate::period::DateWindow;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// One CSV line of the cost report
#[derive(Debug, Serialize)]
struct CostRow<'a> {
    field_id: &'a str,
    field: &'a str,
    area_ha: String,
    insumos: String,
    operacional: String,
    servicos_logistica: String,
    administrativos: String,
    outros: String,
    total: String,
    cost_per_ha: String,
}

#[derive(Debug, Serialize)]
struct DetailRow<'a> {
    date: String,
    macro_group: &'a str,
    category: &'a str,
    description: &'a str,
    origin: &'a str,
    amount: String,
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(e.to_string()))
}

/// Cost report rows, one line per field
pub fn export_costs(report: &CostReport, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in &report.rows {
                writer.serialize(CostRow {
                    field_id: &row.field_id,
                    field: &row.field_name,
                    area_ha: format!("{:.4}", row.area_ha),
                    insumos: money(row.groups.insumos),
                    operacional: money(row.groups.operacional),
                    servicos_logistica: money(row.groups.servicos_logistica),
                    administrativos: money(row.groups.administrativos),
                    outros: money(row.groups.outros),
                    total: money(row.total),
                    cost_per_ha: money(row.cost_per_ha),
                })?;
            }
            into_string(writer)
        }
    }
}

/// Detail lines of one field
pub fn export_details(details: &[CostDetail], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(details)?),
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for d in details {
                writer.serialize(DetailRow {
                    date: d.display_date(),
                    macro_group: d.macro_group.as_str(),
                    category: &d.category,
                    description: &d.description,
                    origin: d.origin.as_str(),
                    amount: money(d.amount),
                })?;
            }
            into_string(writer)
        }
    }
}

impl Database {
    /// Every record of an account as an importable snapshot
    pub fn export_snapshot(&self, account: &str) -> Result<Snapshot> {
        let activities = self.list_activities(account, &DateWindow::unbounded())?;
        let ids: Vec<String> = activities.iter().map(|a| a.id.clone()).collect();

        let mut stock_movements = Vec::new();
        for kind in [MovementKind::Inflow, MovementKind::Outflow] {
            stock_movements.extend(self.list_stock_movements(
                account,
                kind,
                &DateWindow::unbounded(),
            )?);
        }

        Ok(Snapshot {
            properties: self.list_properties(account)?,
            fields: self.list_fields(account, &FieldQuery::default())?,
            transactions: self.list_transactions(account, &Default::default())?,
            product_usages: self.list_product_usages(&ids)?,
            activity_fields: self.list_activity_fields(&ids)?,
            activities,
            stock_movements,
            stock_products: self.list_stock_products(account)?,
            debts: self
                .list_debts(account, None, None)?
                .into_iter()
                .map(|d| d.terms)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldCost, GroupTotals, ReportPeriod};

    fn report() -> CostReport {
        CostReport {
            period: ReportPeriod {
                from: "2024-05-01".to_string(),
                to: "2025-04-30".to_string(),
            },
            rows: vec![FieldCost {
                field_id: "a".to_string(),
                field_name: "Talhão, Norte".to_string(),
                area_ha: 10.0,
                groups: GroupTotals {
                    operacional: 100.0,
                    administrativos: 25.5,
                    ..Default::default()
                },
                total: 125.5,
                cost_per_ha: 12.55,
            }],
            warnings: vec![],
        }
    }

    #[test]
    fn test_costs_csv() {
        let csv = export_costs(&report(), ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "field_id,field,area_ha,insumos,operacional,servicos_logistica,administrativos,outros,total,cost_per_ha"
        );
        assert_eq!(
            lines.next().unwrap(),
            "a,\"Talhão, Norte\",10.0000,0.00,100.00,0.00,25.50,0.00,125.50,12.55"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_costs_json() {
        let json = export_costs(&report(), ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows"][0]["groups"]["operacional"], 100.0);
        assert_eq!(value["period"]["from"], "2024-05-01");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
