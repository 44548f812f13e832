//! SQLite store with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `fields` - Properties, fields, harvest seasons and farm overview
//! - `ledger` - Financial transactions and agricultural activities
//! - `stock` - Stock movements and registered stock products
//! - `debts` - Debts and financing contracts
//! - `allocations` - Manual per-field transaction allocations
//! - `audit` - Audit log
//! - `import` - JSON snapshot import
//!
//! Every record is scoped by an account id string.

use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod allocations;
mod audit;
mod debts;
mod fields;
mod import;
mod ledger;
mod stock;

pub use audit::AuditEntry;
pub use import::{ImportStats, Snapshot};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "SAFRA_DB_KEY";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"safra-salt-v1-fx";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Format a date for storage
pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format a timestamp for storage
pub(crate) fn datetime_to_sql(at: NaiveDateTime) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

/// Parse a stored date; accepts a trailing time part
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .map_err(|e| Error::InvalidData(format!("Invalid date '{}': {}", s, e)))
}

/// Parse a stored timestamp; a bare date means midnight
pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in [DATETIME_FORMAT, "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(at);
        }
    }
    if let Ok(at) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(at.naive_utc());
    }
    parse_date(s)?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::InvalidData(format!("Invalid timestamp '{}'", s)))
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open an encrypted database
    ///
    /// Requires the `SAFRA_DB_KEY` environment variable. The database is
    /// encrypted with SQLCipher using a key derived from the passphrase via
    /// Argon2. Use `new_unencrypted()` for a plain database.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for an unencrypted database.",
                DB_KEY_ENV
            ))),
        }
    }

    /// Open an unencrypted database
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database with an explicit passphrase
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Every new pooled connection needs the key
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            let manager = manager.with_init(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                Ok(())
            });
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Scratch database for tests
    ///
    /// Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "safra_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Whether SQLCipher encryption is active
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Delete every record of one account
    pub fn clear_account(&self, account: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            DELETE FROM field_allocations
            WHERE transaction_id IN (SELECT id FROM transactions WHERE account_id = ?1)
            "#,
            [account],
        )?;
        tx.execute(
            r#"
            DELETE FROM activity_fields
            WHERE activity_id IN (SELECT id FROM activities WHERE account_id = ?1)
            "#,
            [account],
        )?;
        tx.execute(
            r#"
            DELETE FROM activity_products
            WHERE activity_id IN (SELECT id FROM activities WHERE account_id = ?1)
            "#,
            [account],
        )?;
        for table in [
            "activities",
            "transactions",
            "stock_movements",
            "stock_products",
            "debts",
            "fields",
            "properties",
        ] {
            tx.execute(&format!("DELETE FROM {} WHERE account_id = ?1", table), [account])?;
        }

        tx.commit()?;
        info!(account, "Cleared account data");
        Ok(())
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Farm properties
            CREATE TABLE IF NOT EXISTS properties (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_properties_account ON properties(account_id);

            -- Fields ("talhões")
            CREATE TABLE IF NOT EXISTS fields (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                name TEXT NOT NULL,
                area_ha REAL,
                active BOOLEAN NOT NULL DEFAULT 1,
                is_default BOOLEAN NOT NULL DEFAULT 0,   -- synthetic catch-all field
                property_id TEXT REFERENCES properties(id),
                crop TEXT,
                safra TEXT,                              -- e.g. 2024/2025
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_fields_account ON fields(account_id);
            CREATE INDEX IF NOT EXISTS idx_fields_property ON fields(property_id);

            -- Financial ledger
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                amount REAL,
                category TEXT,
                description TEXT,
                linked_area TEXT,                        -- free-text field reference
                scheduled_date DATE NOT NULL,
                kind TEXT NOT NULL,                      -- GASTO, RECEITA
                status TEXT NOT NULL,                    -- Pago, Pendente
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions(account_id, scheduled_date);

            -- Agricultural activities
            CREATE TABLE IF NOT EXISTS activities (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                name TEXT NOT NULL,
                date DATE NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_activities_account_date ON activities(account_id, date);

            -- Product lines of an activity; line_cost_raw is fixed point (1e9 = 1.00)
            CREATE TABLE IF NOT EXISTS activity_products (
                id INTEGER PRIMARY KEY,
                activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                product_id INTEGER,
                product_name TEXT,
                quantity REAL,
                unit TEXT,
                line_cost_raw INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_activity_products_activity ON activity_products(activity_id);

            -- Fields an activity touched
            CREATE TABLE IF NOT EXISTS activity_fields (
                activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
                field_id TEXT NOT NULL,
                PRIMARY KEY (activity_id, field_id)
            );

            -- Inventory movements
            CREATE TABLE IF NOT EXISTS stock_movements (
                id INTEGER PRIMARY KEY,
                account_id TEXT NOT NULL,
                product_name TEXT,
                kind TEXT NOT NULL,                      -- entrada, saida
                total_value REAL,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stock_movements_account ON stock_movements(account_id, kind, created_at);

            -- Registered stock entries
            CREATE TABLE IF NOT EXISTS stock_products (
                id INTEGER PRIMARY KEY,
                account_id TEXT NOT NULL,
                name TEXT NOT NULL,
                brand TEXT,
                category TEXT,
                unit TEXT NOT NULL,
                quantity REAL,
                initial_quantity REAL,                   -- base unit (mg or mL)
                unit_price REAL,
                price_unit TEXT,
                supplier TEXT,
                lot TEXT,
                expires_on DATE,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stock_products_account ON stock_products(account_id);

            -- Debts and financing
            CREATE TABLE IF NOT EXISTS debts (
                id INTEGER PRIMARY KEY,
                account_id TEXT NOT NULL,
                name TEXT NOT NULL,
                creditor TEXT NOT NULL,
                kind TEXT NOT NULL,
                contract_date DATE NOT NULL,
                contracted_amount REAL NOT NULL,
                rate TEXT,
                grace_period TEXT,
                collateral TEXT,
                responsible TEXT,
                notes TEXT,
                payment_method TEXT,
                status TEXT NOT NULL DEFAULT 'Ativa',
                payment_plan TEXT,                       -- JSON
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_debts_account ON debts(account_id, status);

            -- Manual transaction-to-field allocations
            CREATE TABLE IF NOT EXISTS field_allocations (
                id INTEGER PRIMARY KEY,
                transaction_id TEXT NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
                field_id TEXT NOT NULL REFERENCES fields(id) ON DELETE CASCADE,
                percentage REAL NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_field_allocations_tx ON field_allocations(transaction_id);
            CREATE INDEX IF NOT EXISTS idx_field_allocations_field ON field_allocations(field_id);

            -- Audit log
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                account_id TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id TEXT,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_account ON audit_log(account_id, timestamp);
            "#,
        )?;

        info!(path = %self.db_path, "Database schema initialized");
        Ok(())
    }
}
