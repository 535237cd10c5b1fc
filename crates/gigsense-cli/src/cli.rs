//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// GigSense - Know what your gig work actually pays
#[derive(Parser)]
#[command(name = "gigsense")]
#[command(about = "Self-hosted gig-income analytics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// User id to act as
    #[arg(long, default_value = "local", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set GIGSENSE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a bank statement CSV (Date, Description, Amount, Type)
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Pull the bank feed for all linked accounts
    Sync,

    /// Recompute the income snapshot and show the numbers
    Analyze,

    /// Show personalized earning tips
    Tips {
        /// Seed for the local tip draw (same seed, same tips)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage linked bank accounts (list, link, relink, unlink)
    Accounts {
        #[command(subcommand)]
        action: Option<AccountsAction>,
    },

    /// Show or update the user profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires the reverse-proxy identity header
        /// or an API key from GIGSENSE_API_KEYS.
        #[arg(long)]
        no_auth: bool,
    },

    /// Show database status (encryption, size, counts)
    Status,
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List linked accounts
    List,

    /// Link a bank account through the aggregator
    Link {
        /// Aggregator item id (webhooks are routed by this)
        #[arg(long)]
        item: String,

        /// Aggregator account id
        #[arg(long)]
        account: String,

        /// Institution name
        #[arg(long)]
        institution: Option<String>,

        /// Access token for the aggregator feed
        #[arg(long)]
        token: String,
    },

    /// Refresh an account's access token (resets the sync cursor)
    Relink {
        /// Account id from `gigsense accounts list`
        id: i64,

        /// New access token
        #[arg(long)]
        token: String,
    },

    /// Unlink an account (already-synced transactions are kept)
    Unlink {
        /// Account id from `gigsense accounts list`
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile
    Show,

    /// Update profile fields (only the flags you pass change)
    Set {
        /// Email address for the weekly report
        #[arg(long)]
        email: Option<String>,

        /// Home city for local benchmark tips (e.g. "Austin")
        #[arg(long)]
        city: Option<String>,

        /// Opt in or out of the weekly report email (true/false)
        #[arg(long)]
        weekly_report: Option<bool>,

        /// Whether tax documents are on file (true/false)
        #[arg(long)]
        tax_profile: Option<bool>,

        /// Whether enrolled in a benefits plan (true/false)
        #[arg(long)]
        benefits: Option<bool>,
    },
}
