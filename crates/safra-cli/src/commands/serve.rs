//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::{load_classifier, open_db};

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    account: &str,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Safra web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!("   Default account: {}", account);

    let config = safra_server::ServerConfig::from_env(account);

    if config.auth_enabled() {
        println!(
            "   🔑 API keys: {} configured (SAFRA_API_KEYS)",
            config.api_keys.len()
        );
    } else {
        println!();
        println!("   ⚠️  Authentication DISABLED (set SAFRA_API_KEYS) - do not expose to network!");
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {} (SAFRA_CORS_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;
    let classifier = load_classifier()?;

    safra_server::serve_with_config(db, classifier, host, port, config).await?;

    Ok(())
}
