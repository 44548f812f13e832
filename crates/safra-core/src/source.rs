//! Read interfaces the allocation pipeline consumes
//!
//! [`crate::Database`] implements [`LedgerSource`] over SQLite; tests plug in
//! in-memory and failing sources.

use crate::error::Result;
use crate::models::{
    Activity, ActivityField, Field, FieldQuery, FinancialTransaction, MovementKind, ProductUsage,
    StockMovement, TransactionKind, TransactionStatus,
};
use crate::period::DateWindow;

/// Transaction ledger filters
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub window: DateWindow,
}

impl TransactionQuery {
    /// Paid expenses scheduled inside `window`
    pub fn paid_expenses(window: DateWindow) -> Self {
        Self {
            kind: Some(TransactionKind::Expense),
            status: Some(TransactionStatus::Paid),
            window,
        }
    }

    pub fn matches(&self, tx: &FinancialTransaction) -> bool {
        self.kind.map_or(true, |k| k == tx.kind)
            && self.status.map_or(true, |s| s == tx.status)
            && self.window.contains(tx.scheduled_date)
    }
}

/// Records the pipeline reads, scoped by account
pub trait LedgerSource {
    /// Field registry
    fn fields(&self, account: &str, query: &FieldQuery) -> Result<Vec<Field>>;

    /// Financial ledger
    fn transactions(
        &self,
        account: &str,
        query: &TransactionQuery,
    ) -> Result<Vec<FinancialTransaction>>;

    /// Agricultural activities dated inside `window`
    fn activities(&self, account: &str, window: &DateWindow) -> Result<Vec<Activity>>;

    /// Product lines of the given activities that reference a product
    fn product_usages(&self, activity_ids: &[String]) -> Result<Vec<ProductUsage>>;

    /// Fields touched by the given activities
    fn activity_fields(&self, activity_ids: &[String]) -> Result<Vec<ActivityField>>;

    /// Inventory movements of one kind inside `window`
    fn stock_movements(
        &self,
        account: &str,
        kind: MovementKind,
        window: &DateWindow,
    ) -> Result<Vec<StockMovement>>;
}
