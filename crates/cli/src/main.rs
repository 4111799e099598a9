//! FreshCart CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! fc-cli migrate
//!
//! # Create an admin account (password from FRESHCART_ADMIN_PASSWORD if omitted)
//! fc-cli admin create -e admin@example.com -f Ada -l Admin
//!
//! # Promote an existing account to admin
//! fc-cli admin promote -e shopper@example.com
//!
//! # Load sample categories and products into an empty catalog
//! fc-cli seed
//! ```
//!
//! # Environment Variables
//!
//! - `FRESHCART_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fc-cli")]
#[command(author, version, about = "FreshCart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Insert sample categories and products
    Seed {
        /// Seed even if products already exist
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long, default_value = "Admin")]
        first_name: String,

        /// Last name
        #[arg(short, long, default_value = "")]
        last_name: String,

        /// Password (falls back to `FRESHCART_ADMIN_PASSWORD`)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Give an existing account the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                first_name,
                last_name,
                password,
            } => {
                commands::admin::create_user(&email, &first_name, &last_name, password).await?;
            }
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
        Commands::Seed { force } => commands::seed::run(force).await?,
    }
    Ok(())
}
