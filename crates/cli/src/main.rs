//! Sareine CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! sareine migrate
//!
//! # Inspect or empty a signed-in user's cart
//! sareine cart show --user <uid>
//! sareine cart clear --user <uid>
//!
//! # Read or change site settings
//! sareine settings show
//! sareine settings set --preorder true
//!
//! # List preorders or record their progress
//! sareine preorders list [--status <status>]
//! sareine preorders set-status --id <id> <status>
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::settings::SettingsUpdate;

#[derive(Parser)]
#[command(name = "sareine")]
#[command(author, version, about = "Sareine storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect signed-in carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Read or change site settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List preorders and change their status
    Preorders {
        #[command(subcommand)]
        action: PreorderAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print a user's stored cart
    Show {
        /// User id
        #[arg(short, long)]
        user: String,
    },
    /// Replace a user's stored cart with an empty one
    Clear {
        /// User id
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change settings; omitted fields keep their value
    Set {
        /// Turn the preorder flow on or off
        #[arg(long)]
        preorder: Option<bool>,

        /// Announcement bar text (empty hides the bar)
        #[arg(long)]
        announcement: Option<String>,

        /// Sender name for customer emails
        #[arg(long)]
        sender_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum PreorderAction {
    /// Print preorders, newest first
    List {
        /// Only preorders in this status
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Move a preorder to another status
    SetStatus {
        /// Preorder record id
        #[arg(long)]
        id: i64,

        /// pending_confirmation, payment_link_sent, paid, dispatched,
        /// delivered or cancelled
        status: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

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
        Commands::Cart { action } => match action {
            CartAction::Show { user } => commands::cart::show(&user).await?,
            CartAction::Clear { user } => commands::cart::clear(&user).await?,
        },
        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::settings::show().await?,
            SettingsAction::Set {
                preorder,
                announcement,
                sender_name,
            } => {
                commands::settings::set(SettingsUpdate {
                    preorder_enabled: preorder,
                    announcement_text: announcement,
                    sender_name,
                })
                .await?;
            }
        },
        Commands::Preorders { action } => match action {
            PreorderAction::List { status } => {
                commands::preorders::list(status.as_deref()).await?;
            }
            PreorderAction::SetStatus { id, status } => {
                commands::preorders::set_status(id, &status).await?;
            }
        },
    }
    Ok(())
}
