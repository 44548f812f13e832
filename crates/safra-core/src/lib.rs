//! Safra Core Library
//!
//! Shared functionality for the Safra farm cost tool:
//! - Database access and migrations (SQLite/SQLCipher)
//! - Name normalization and free-text field resolution
//! - Data-driven macro-group classification
//! - Harvest-season windows and unit conversion
//! - Cost-per-field allocation pipeline (input costs, report, details, snapshot)
//! - Stock product grouping, debts and manual field allocations
//! - CSV/JSON export and snapshot import

pub mod classify;
pub mod costs;
pub mod currency;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod normalize;
pub mod period;
pub mod resolver;
pub mod source;
pub mod stock;
pub mod units;

/// In-memory ledgers for tests
#[cfg(test)]
pub(crate) mod test_utils;

pub use classify::{Classifier, ClassifierConfig, GroupRule};
pub use costs::{CostAllocator, CostFilter, InsumosBreakdown, InsumosLine};
pub use db::{AuditEntry, Database, ImportStats, Snapshot};
pub use error::{Error, Result};
pub use export::{export_costs, export_details, ExportFormat};
pub use period::DateWindow;
pub use resolver::FieldResolver;
pub use source::{LedgerSource, TransactionQuery};
pub use stock::{group_products, ProductGroup, SupplierStock};
