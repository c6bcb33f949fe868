//! Souk CLI - Database migrations and shop management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! souk-cli migrate
//!
//! # Create the owner account (password from SOUK_ADMIN_PASSWORD or stdin)
//! souk-cli admin create --username owner
//!
//! # Inspect and lift lockouts
//! souk-cli lockout list
//! souk-cli lockout clear username owner
//! souk-cli lockout clear client_ip 198.51.100.7
//! souk-cli lockout prune
//!
//! # Recent security events
//! souk-cli security-log --limit 50
//! ```
//!
//! # Environment Variables
//!
//! - `SOUK_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "souk-cli")]
#[command(author, version, about = "Souk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the owner account
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect and lift lockouts
    Lockout {
        #[command(subcommand)]
        action: LockoutAction,
    },
    /// Show recent security log entries
    SecurityLog {
        /// Number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create the owner account
    Create {
        /// Owner username
        #[arg(short, long)]
        username: String,
    },
}

#[derive(Subcommand)]
enum LockoutAction {
    /// List locks still in force
    List,
    /// Lift a lock
    Clear {
        /// `username` or `client_ip`
        kind: String,
        /// The locked username or IP address
        key: String,
    },
    /// Delete stored locks that have expired
    Prune,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "souk_cli=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create { username } => {
                commands::admin::create_owner(&username).await?;
            }
        },
        Commands::Lockout { action } => match action {
            LockoutAction::List => commands::lockout::list().await?,
            LockoutAction::Clear { kind, key } => commands::lockout::clear(&kind, &key).await?,
            LockoutAction::Prune => commands::lockout::prune().await?,
        },
        Commands::SecurityLog { limit } => commands::security::recent(limit).await?,
    }
    Ok(())
}
