//! Domain models for Safra

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A farm property that owns fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    pub name: String,
}

/// A field ("talhão") of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    pub name: String,
    /// Area in hectares
    pub area_ha: f64,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Synthetic catch-all field, never part of allocation
    #[serde(default)]
    pub is_default: bool,
    pub property_id: Option<String>,
    pub crop: Option<String>,
    /// Harvest-season label the field was planted for, e.g. "2024/2025"
    pub safra: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Field {
    /// Active, non-default, with a positive area
    pub fn is_eligible(&self) -> bool {
        self.active && !self.is_default && self.area_ha > 0.0
    }
}

/// Field registry filters
#[derive(Debug, Clone, Default)]
pub struct FieldQuery {
    pub only_active: bool,
    pub non_default_only: bool,
    pub crop: Option<String>,
    pub property_id: Option<String>,
}

impl FieldQuery {
    /// Filters used by every allocation run
    pub fn eligible() -> Self {
        Self {
            only_active: true,
            non_default_only: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, field: &Field) -> bool {
        if self.only_active && !field.active {
            return false;
        }
        if self.non_default_only && field.is_default {
            return false;
        }
        if let Some(crop) = &self.crop {
            if field.crop.as_deref() != Some(crop.as_str()) {
                return false;
            }
        }
        if let Some(property_id) = &self.property_id {
            if field.property_id.as_deref() != Some(property_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Area summary for the farm overview panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmOverview {
    pub total_area_ha: f64,
    /// Area of active fields that carry a crop
    pub cultivated_area_ha: f64,
    pub field_count: usize,
    pub active_count: usize,
}

/// Ledger transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "GASTO")]
    Expense,
    #[serde(rename = "RECEITA")]
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "GASTO",
            Self::Income => "RECEITA",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GASTO" => Ok(Self::Expense),
            "RECEITA" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger transaction payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[serde(rename = "Pago")]
    Paid,
    #[serde(rename = "Pendente")]
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "Pago",
            Self::Pending => "Pendente",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pago" | "paid" => Ok(Self::Paid),
            "pendente" | "pending" => Ok(Self::Pending),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A financial ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialTransaction {
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    /// Signed amount; cost math always uses the absolute value
    pub amount: f64,
    pub category: String,
    pub description: String,
    /// Free text naming a field, a property, or nothing
    pub linked_area: String,
    pub scheduled_date: NaiveDate,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
}

/// Agricultural activity (spraying, fertilizing, harvest...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    pub name: String,
    pub date: NaiveDate,
}

/// A product consumed by an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUsage {
    pub activity_id: String,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    /// Line cost in fixed-point units, see [`crate::costs::LINE_COST_SCALE`]
    pub line_cost_raw: i64,
}

/// Link between an activity and a field it touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityField {
    pub activity_id: String,
    pub field_id: String,
}

/// Stock movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    #[serde(rename = "entrada")]
    Inflow,
    #[serde(rename = "saida")]
    Outflow,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inflow => "entrada",
            Self::Outflow => "saida",
        }
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "entrada" | "inflow" => Ok(Self::Inflow),
            "saida" | "saída" | "outflow" => Ok(Self::Outflow),
            _ => Err(format!("Unknown movement kind: {}", s)),
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inventory movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub account_id: String,
    pub product_name: Option<String>,
    pub kind: MovementKind,
    pub total_value: f64,
    pub created_at: NaiveDateTime,
}

/// A stock entry as registered by the user
///
/// `initial_quantity` is stored in the base unit (mg or mL); `quantity` is
/// in `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockProduct {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub account_id: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub quantity: f64,
    pub initial_quantity: Option<f64>,
    /// Unit price in `price_unit` (falls back to `unit`)
    pub unit_price: Option<f64>,
    pub price_unit: Option<String>,
    pub supplier: Option<String>,
    pub lot: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

/// Spending macro-group
///
/// Declaration order is classification precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MacroGroup {
    Insumos,
    Operacional,
    ServicosLogistica,
    Administrativos,
    Outros,
    Receita,
}

impl MacroGroup {
    /// Cost groups of the main flow
    pub const COSTS: [MacroGroup; 5] = [
        Self::Insumos,
        Self::Operacional,
        Self::ServicosLogistica,
        Self::Administrativos,
        Self::Outros,
    ];

    /// Cost groups plus revenue, for the snapshot path
    pub const ALL: [MacroGroup; 6] = [
        Self::Insumos,
        Self::Operacional,
        Self::ServicosLogistica,
        Self::Administrativos,
        Self::Outros,
        Self::Receita,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insumos => "insumos",
            Self::Operacional => "operacional",
            Self::ServicosLogistica => "servicosLogistica",
            Self::Administrativos => "administrativos",
            Self::Outros => "outros",
            Self::Receita => "receita",
        }
    }

    /// Parse a report filter value; blank or "todos" selects every group
    pub fn parse_filter(s: &str) -> std::result::Result<Option<Self>, String> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("todos") {
            return Ok(None);
        }
        s.parse().map(Some)
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Insumos => "Insumos",
            Self::Operacional => "Operacional",
            Self::ServicosLogistica => "Serviços/Logística",
            Self::Administrativos => "Administrativos",
            Self::Outros => "Outros",
            Self::Receita => "Receita",
        }
    }
}

impl std::str::FromStr for MacroGroup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "insumos" => Ok(Self::Insumos),
            "operacional" => Ok(Self::Operacional),
            "servicoslogistica" | "servicos" => Ok(Self::ServicosLogistica),
            "administrativos" => Ok(Self::Administrativos),
            "outros" => Ok(Self::Outros),
            "receita" => Ok(Self::Receita),
            _ => Err(format!("Unknown macro-group: {}", s)),
        }
    }
}

impl std::fmt::Display for MacroGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-group subtotals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotals {
    pub insumos: f64,
    pub operacional: f64,
    pub servicos_logistica: f64,
    pub administrativos: f64,
    pub outros: f64,
    pub receita: f64,
}

impl GroupTotals {
    pub fn get(&self, group: MacroGroup) -> f64 {
        match group {
            MacroGroup::Insumos => self.insumos,
            MacroGroup::Operacional => self.operacional,
            MacroGroup::ServicosLogistica => self.servicos_logistica,
            MacroGroup::Administrativos => self.administrativos,
            MacroGroup::Outros => self.outros,
            MacroGroup::Receita => self.receita,
        }
    }

    pub fn add(&mut self, group: MacroGroup, amount: f64) {
        let slot = match group {
            MacroGroup::Insumos => &mut self.insumos,
            MacroGroup::Operacional => &mut self.operacional,
            MacroGroup::ServicosLogistica => &mut self.servicos_logistica,
            MacroGroup::Administrativos => &mut self.administrativos,
            MacroGroup::Outros => &mut self.outros,
            MacroGroup::Receita => &mut self.receita,
        };
        *slot += amount;
    }

    /// Sum of the five cost groups (revenue excluded)
    pub fn cost_total(&self) -> f64 {
        MacroGroup::COSTS.iter().map(|g| self.get(*g)).sum()
    }
}

/// Report period info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub from: String,
    pub to: String,
}

/// One row of the cost-per-field report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCost {
    pub field_id: String,
    pub field_name: String,
    pub area_ha: f64,
    pub groups: GroupTotals,
    pub total: f64,
    pub cost_per_ha: f64,
}

/// Cost-per-field report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub period: ReportPeriod,
    pub rows: Vec<FieldCost>,
    /// Data that could not be loaded; figures may be undercounted
    pub warnings: Vec<String>,
}

/// Share of one macro-group in the report total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupShare {
    pub group: MacroGroup,
    pub label: String,
    pub amount: f64,
    pub percentage: f64,
}

/// Headline figures derived from a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub total_costs: f64,
    pub total_area_ha: f64,
    pub average_cost_per_ha: f64,
    pub distribution: Vec<GroupShare>,
}

impl CostReport {
    pub fn indicators(&self) -> Indicators {
        let total_costs: f64 = self.rows.iter().map(|r| r.total).sum();
        let total_area_ha: f64 = self.rows.iter().map(|r| r.area_ha).sum();
        let average_cost_per_ha = if total_area_ha > 0.0 {
            total_costs / total_area_ha
        } else {
            0.0
        };

        let distribution = MacroGroup::COSTS
            .iter()
            .map(|group| {
                let amount: f64 = self.rows.iter().map(|r| r.groups.get(*group)).sum();
                let percentage = if total_costs > 0.0 {
                    amount / total_costs * 100.0
                } else {
                    0.0
                };
                GroupShare {
                    group: *group,
                    label: group.label().to_string(),
                    amount,
                    percentage,
                }
            })
            .collect();

        Indicators {
            total_costs,
            total_area_ha,
            average_cost_per_ha,
            distribution,
        }
    }
}

/// Where a detail line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailOrigin {
    #[serde(rename = "Atividade Agrícola")]
    Activity,
    #[serde(rename = "Financeiro")]
    Financial,
    #[serde(rename = "Estoque")]
    Stock,
}

impl DetailOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "Atividade Agrícola",
            Self::Financial => "Financeiro",
            Self::Stock => "Estoque",
        }
    }
}

impl std::fmt::Display for DetailOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line item contributing to one field's cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDetail {
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub origin: DetailOrigin,
    pub amount: f64,
    pub macro_group: MacroGroup,
}

impl CostDetail {
    /// Date as shown to users (dd/mm/yyyy)
    pub fn display_date(&self) -> String {
        self.date.format("%d/%m/%Y").to_string()
    }
}

/// Revenue-inclusive per-field totals up to a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub field_id: String,
    pub field_name: String,
    pub area_ha: f64,
    pub groups: GroupTotals,
}

/// Debt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtStatus {
    #[serde(rename = "Ativa")]
    Active,
    #[serde(rename = "Liquidada")]
    Settled,
    #[serde(rename = "Renegociada")]
    Renegotiated,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Ativa",
            Self::Settled => "Liquidada",
            Self::Renegotiated => "Renegociada",
        }
    }
}

impl std::str::FromStr for DebtStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ativa" | "active" => Ok(Self::Active),
            "liquidada" | "settled" => Ok(Self::Settled),
            "renegociada" | "renegotiated" => Ok(Self::Renegotiated),
            _ => Err(format!("Unknown debt status: {}", s)),
        }
    }
}

impl std::fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a debt is repaid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentPlan {
    Single {
        amount: f64,
        due_date: NaiveDate,
    },
    Installments {
        count: u32,
        installment_amount: f64,
        first_due_date: NaiveDate,
    },
    /// Paid in bags of produce
    Production {
        product: String,
        bags: f64,
        price_per_bag: f64,
        period: String,
    },
}

/// A debt or financing contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    #[serde(default)]
    pub account_id: String,
    #[serde(flatten)]
    pub terms: NewDebt,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Editable debt terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDebt {
    pub name: String,
    pub creditor: String,
    /// Contract type, e.g. "Custeio", "Investimento"
    pub kind: String,
    pub contract_date: NaiveDate,
    pub contracted_amount: f64,
    pub rate: Option<String>,
    pub grace_period: Option<String>,
    pub collateral: Option<String>,
    pub responsible: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub status: DebtStatus,
    pub payment_plan: Option<PaymentPlan>,
}

/// Debt amounts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DebtTotals {
    pub active: f64,
    pub settled: f64,
    pub renegotiated: f64,
}

/// Manual allocation of a transaction to a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAllocation {
    pub id: i64,
    pub transaction_id: String,
    pub field_id: String,
    pub field_name: Option<String>,
    pub percentage: f64,
    pub created_at: NaiveDateTime,
}

/// Allocation entry before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationInput {
    pub field_id: String,
    pub percentage: f64,
}
