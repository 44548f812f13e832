//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `allocations` - Manual per-field splits of a transaction
//! - `audit` - Audit log
//! - `core` - Init and shared utilities (open_db, load_classifier)
//! - `debts` - Debt and financing commands
//! - `fields` - Properties, safras, overview and field commands
//! - `import` - Snapshot import and report/snapshot export
//! - `reports` - Cost-per-field reports
//! - `serve` - Web server command
//! - `stock` - Stock views

pub mod allocations;
pub mod audit;
pub mod core;
pub mod debts;
pub mod fields;
pub mod import;
pub mod reports;
pub mod serve;
pub mod stock;

// Re-export command functions for main.rs
pub use allocations::*;
pub use audit::*;
pub use core::*;
pub use debts::*;
pub use fields::*;
pub use import::*;
pub use reports::*;
pub use serve::*;
pub use stock::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
