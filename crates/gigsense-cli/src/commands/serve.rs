//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting GigSense web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let mut config = gigsense_server::ServerConfig::from_env();
    config.require_auth = !no_auth;

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔐 Authentication: reverse-proxy identity header (X-GigSense-User)");
        if !config.api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (GIGSENSE_API_KEYS)",
                config.api_keys.len()
            );
        }
    }
    if config.report_secret.is_some() {
        println!("   📬 Weekly report job: enabled (GIGSENSE_REPORT_SECRET)");
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    gigsense_server::serve_with_config(db, host, port, config).await?;

    Ok(())
}
