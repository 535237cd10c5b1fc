//! GigSense CLI - Gig-income analytics for independent workers
//!
//! Usage:
//!   gigsense init                 Initialize database
//!   gigsense import --file CSV    Import a bank statement
//!   gigsense analyze              Compute the income snapshot
//!   gigsense serve --port 3000    Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db_path = commands::resolve_db_path(cli.db);

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, &cli.user, cli.no_encrypt),
        Commands::Import { file } => {
            commands::cmd_import(&db_path, &cli.user, &file, cli.no_encrypt)
        }
        Commands::Sync => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let feed = gigsense_core::feed::FeedClient::from_env();
            commands::cmd_sync(&db, &cli.user, feed).await
        }
        Commands::Analyze => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_analyze(&db, &cli.user)
        }
        Commands::Tips { seed } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_tips(&db, &cli.user, seed)
        }
        Commands::Accounts { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db, &cli.user),
                Some(AccountsAction::Link {
                    item,
                    account,
                    institution,
                    token,
                }) => commands::cmd_accounts_link(
                    &db,
                    &cli.user,
                    &item,
                    &account,
                    institution.as_deref(),
                    &token,
                ),
                Some(AccountsAction::Relink { id, token }) => {
                    commands::cmd_accounts_relink(&db, &cli.user, id, &token)
                }
                Some(AccountsAction::Unlink { id }) => {
                    commands::cmd_accounts_unlink(&db, &cli.user, id)
                }
            }
        }
        Commands::Profile { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None | Some(ProfileAction::Show) => commands::cmd_profile_show(&db, &cli.user),
                Some(ProfileAction::Set {
                    email,
                    city,
                    weekly_report,
                    tax_profile,
                    benefits,
                }) => commands::cmd_profile_set(
                    &db,
                    &cli.user,
                    email.as_deref(),
                    city.as_deref(),
                    weekly_report,
                    tax_profile,
                    benefits,
                ),
            }
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&db_path, &host, port, no_auth, cli.no_encrypt).await,
        Commands::Status => commands::cmd_status(&db_path, &cli.user, cli.no_encrypt),
    }
}
