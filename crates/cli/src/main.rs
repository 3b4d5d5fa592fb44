//! TechNova CLI - database migrations and store management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! tn-cli migrate
//!
//! # Insert the default product categories
//! tn-cli seed categories
//!
//! # Create a staff account (or promote an existing one)
//! tn-cli staff create -u alice -e alice@technova.example -p 's3cret-Passw0rd'
//! ```
//!
//! Every command reads `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tn-cli")]
#[command(author, version, about = "TechNova CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Insert reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage staff accounts
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Default top-level product categories
    Categories,
}

#[derive(Subcommand)]
enum StaffAction {
    /// Create an active staff account, or promote the account with this email
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password; falls back to `TN_STAFF_PASSWORD`
        #[arg(short, long, env = "TN_STAFF_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Categories => commands::seed::categories().await?,
        },
        Commands::Staff { action } => match action {
            StaffAction::Create {
                username,
                email,
                password,
            } => commands::staff::create(&username, &email, &password).await?,
        },
    }
    Ok(())
}
