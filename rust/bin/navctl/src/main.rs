//! `navctl`: inspect the portal's route tables.
//!
//! Answers "where does this URL go?" without a browser: legacy redirects,
//! landing pages, full guard evaluations and a dump of every route.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use portal_nav::{Role, ShellConfig};
use tracing::debug;

/// Portal navigation inspector.
#[derive(Parser, Debug)]
#[command(name = "navctl", about = "Inspect portal routes and redirects")]
struct Cli {
    /// Path to a shell config file (TOML).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply the legacy redirect rules to a path.
    Resolve {
        path: String,
        /// Effective role. Omit for a signed-out visitor.
        #[arg(long)]
        role: Option<Role>,
    },

    /// Show the landing page of a role.
    Landing {
        #[arg(long)]
        role: Role,
    },

    /// Run a full navigation through the guard.
    Route {
        path: String,
        /// Signed-in role. Omit for a signed-out visitor.
        #[arg(long)]
        role: Option<Role>,
    },

    /// List compiled routes.
    Tree {
        /// Only this role's subtree.
        #[arg(long)]
        role: Option<Role>,
    },

    /// Validate the tables and check that every redirect lands on a route.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            ShellConfig::load(path)?
        }
        None => ShellConfig::default(),
    };
    let json = cli.output == "json";

    match cli.command {
        Commands::Resolve { path, role } => commands::resolve(&config, &path, role, json)?,
        Commands::Landing { role } => commands::landing(role, json)?,
        Commands::Route { path, role } => commands::route(&config, &path, role, json).await?,
        Commands::Tree { role } => commands::tree(role, json)?,
        Commands::Check => commands::check(&config, json)?,
    }

    Ok(())
}
