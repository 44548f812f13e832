//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_classifier` - Macro-group table, user override first
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use safra_core::classify::default_config_path;
use safra_core::{Classifier, Database};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the macro-group table
pub fn load_classifier() -> Result<Classifier> {
    Classifier::new().context("Failed to load macro-group table")
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            println!("   Macro-group table: {}", path.display());
        }
        Some(path) => {
            println!("   Macro-group table: built-in (override at {})", path.display());
        }
        None => println!("   Macro-group table: built-in"),
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import records: safra import snapshot.json");
    println!("  2. Cost per field: safra report cost --safra 2024/2025");
    println!("  3. Start web API: safra serve");

    Ok(())
}
