//! Test utilities for safra-core
//!
//! In-memory ledgers for exercising the allocation pipeline without SQLite,
//! plus a wrapper that fails selected reads.

use std::cell::RefCell;
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::models::{
    Activity, ActivityField, Field, FieldQuery, FinancialTransaction, MovementKind, ProductUsage,
    StockMovement, TransactionKind, TransactionStatus,
};
use crate::period::DateWindow;
use crate::source::{LedgerSource, TransactionQuery};

pub const ACCOUNT: &str = "acct-1";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn field(id: &str, name: &str, area_ha: f64) -> Field {
    Field {
        id: id.to_string(),
        account_id: ACCOUNT.to_string(),
        name: name.to_string(),
        area_ha,
        active: true,
        is_default: false,
        property_id: None,
        crop: Some("Café".to_string()),
        safra: None,
    }
}

pub fn expense(
    id: &str,
    amount: f64,
    category: &str,
    description: &str,
    linked_area: &str,
    scheduled_date: NaiveDate,
) -> FinancialTransaction {
    FinancialTransaction {
        id: id.to_string(),
        account_id: ACCOUNT.to_string(),
        amount,
        category: category.to_string(),
        description: description.to_string(),
        linked_area: linked_area.to_string(),
        scheduled_date,
        kind: TransactionKind::Expense,
        status: TransactionStatus::Paid,
    }
}

pub fn activity(id: &str, name: &str, date: NaiveDate) -> Activity {
    Activity {
        id: id.to_string(),
        account_id: ACCOUNT.to_string(),
        name: name.to_string(),
        date,
    }
}

pub fn usage(activity_id: &str, product: &str, quantity: f64, unit: &str, raw: i64) -> ProductUsage {
    ProductUsage {
        activity_id: activity_id.to_string(),
        product_id: Some(1),
        product_name: Some(product.to_string()),
        quantity,
        unit: Some(unit.to_string()),
        line_cost_raw: raw,
    }
}

pub fn link(activity_id: &str, field_id: &str) -> ActivityField {
    ActivityField {
        activity_id: activity_id.to_string(),
        field_id: field_id.to_string(),
    }
}

pub fn outflow(id: i64, product: &str, total_value: f64, on: NaiveDate) -> StockMovement {
    StockMovement {
        id,
        account_id: ACCOUNT.to_string(),
        product_name: Some(product.to_string()),
        kind: MovementKind::Outflow,
        total_value,
        created_at: on.and_hms_opt(10, 30, 0).unwrap(),
    }
}

/// Ledger held in vectors, filtered like the SQLite queries
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    pub fields: Vec<Field>,
    pub transactions: Vec<FinancialTransaction>,
    pub activities: Vec<Activity>,
    pub usages: Vec<ProductUsage>,
    pub links: Vec<ActivityField>,
    pub movements: Vec<StockMovement>,
}

impl LedgerSource for MemoryLedger {
    fn fields(&self, account: &str, query: &FieldQuery) -> Result<Vec<Field>> {
        Ok(self
            .fields
            .iter()
            .filter(|f| f.account_id == account && query.matches(f))
            .cloned()
            .collect())
    }

    fn transactions(
        &self,
        account: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<FinancialTransaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.account_id == account && query.matches(t))
            .cloned()
            .collect())
    }

    fn activities(&self, account: &str, window: &DateWindow) -> Result<Vec<Activity>> {
        Ok(self
            .activities
            .iter()
            .filter(|a| a.account_id == account && window.contains(a.date))
            .cloned()
            .collect())
    }

    fn product_usages(&self, activity_ids: &[String]) -> Result<Vec<ProductUsage>> {
        Ok(self
            .usages
            .iter()
            .filter(|u| u.product_id.is_some() && activity_ids.contains(&u.activity_id))
            .cloned()
            .collect())
    }

    fn activity_fields(&self, activity_ids: &[String]) -> Result<Vec<ActivityField>> {
        Ok(self
            .links
            .iter()
            .filter(|l| activity_ids.contains(&l.activity_id))
            .cloned()
            .collect())
    }

    fn stock_movements(
        &self,
        account: &str,
        kind: MovementKind,
        window: &DateWindow,
    ) -> Result<Vec<StockMovement>> {
        Ok(self
            .movements
            .iter()
            .filter(|m| {
                m.account_id == account && m.kind == kind && window.contains_datetime(m.created_at)
            })
            .cloned()
            .collect())
    }
}

/// Wraps a ledger and fails the named reads
pub struct FailingLedger {
    pub inner: MemoryLedger,
    failing: HashSet<&'static str>,
    pub calls: RefCell<Vec<&'static str>>,
}

impl FailingLedger {
    pub fn new(inner: MemoryLedger, failing: &[&'static str]) -> Self {
        Self {
            inner,
            failing: failing.iter().copied().collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn check(&self, read: &'static str) -> Result<()> {
        self.calls.borrow_mut().push(read);
        if self.failing.contains(read) {
            return Err(Error::Source(format!("{} unavailable", read)));
        }
        Ok(())
    }
}

impl LedgerSource for FailingLedger {
    fn fields(&self, account: &str, query: &FieldQuery) -> Result<Vec<Field>> {
        self.check("fields")?;
        self.inner.fields(account, query)
    }

    fn transactions(
        &self,
        account: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<FinancialTransaction>> {
        self.check("transactions")?;
        self.inner.transactions(account, query)
    }

    fn activities(&self, account: &str, window: &DateWindow) -> Result<Vec<Activity>> {
        self.check("activities")?;
        self.inner.activities(account, window)
    }

    fn product_usages(&self, activity_ids: &[String]) -> Result<Vec<ProductUsage>> {
        self.check("product_usages")?;
        self.inner.product_usages(activity_ids)
    }

    fn activity_fields(&self, activity_ids: &[String]) -> Result<Vec<ActivityField>> {
        self.check("activity_fields")?;
        self.inner.activity_fields(activity_ids)
    }

    fn stock_movements(
        &self,
        account: &str,
        kind: MovementKind,
        window: &DateWindow,
    ) -> Result<Vec<StockMovement>> {
        self.check("stock_movements")?;
        self.inner.stock_movements(account, kind, window)
    }
}
