//! Atelier CLI - migrations, wallet ledger and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! atelier migrate
//!
//! # Credit a designer for an out-of-band sale
//! atelier ledger record-earning --designer <uuid> --amount 12.50 --description "Sale of DES-004"
//!
//! # Rewrite cached wallet balances from the ledger
//! atelier ledger reconcile
//! atelier ledger reconcile --designer <uuid>
//!
//! # Seed the catalog
//! atelier seed products catalog.yaml --owner <uuid>
//! ```
//!
//! # Environment Variables
//!
//! - `ATELIER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use atelier_core::ProfileId;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Atelier operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Designer wallet ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// Seed the database from YAML
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Append a completed earning for a designer
    RecordEarning {
        /// Designer profile id
        #[arg(short, long)]
        designer: ProfileId,

        /// Amount to credit, e.g. 12.50
        #[arg(short, long)]
        amount: Decimal,

        /// Shown to the designer in their transaction history
        #[arg(long)]
        description: Option<String>,
    },
    /// Recompute cached wallet balances from the ledger
    Reconcile {
        /// Only this designer (default: every designer)
        #[arg(short, long)]
        designer: Option<ProfileId>,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert catalog products from a YAML file
    Products {
        /// Path to the YAML file
        file: String,

        /// Profile that will own the products
        #[arg(short, long)]
        owner: ProfileId,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Ledger { action } => match action {
            LedgerAction::RecordEarning {
                designer,
                amount,
                description,
            } => {
                commands::ledger::record_earning(designer, amount, description).await?;
            }
            LedgerAction::Reconcile { designer } => {
                commands::ledger::reconcile(designer).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, owner } => {
                commands::seed::products(&file, owner).await?;
            }
        },
    }
    Ok(())
}
