//! aso-monitor - App Store keyword rank monitor
//!
//! Tracks search ranks for a bundle id across storefronts and posts
//! per-country reports to Telegram.

use anyhow::Result;
use aso_monitor::commands::{ChartsCommand, MonitorCommand, SuggestCommand};
use aso_monitor::config::{Config, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "aso-monitor",
    version,
    about = "App Store keyword rank monitor",
    long_about = "Monitors App Store search ranks for a bundle id across storefronts, \
                  keeps rank history, and posts per-country report tables to Telegram."
)]
struct Cli {
    /// Bundle id of the app to track
    #[arg(short, long, global = true, env = "BUNDLE_ID")]
    bundle_id: Option<String>,

    /// Storefront country for one-off lookups
    #[arg(long, global = true)]
    country: Option<String>,

    /// Search result window size
    #[arg(short, long, global = true)]
    limit: Option<u32>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format for one-off lookups
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor keyword ranks continuously
    #[command(alias = "m")]
    Monitor,

    /// Run a single monitoring pass and exit
    Check,

    /// Look up the app's chart positions
    Charts {
        /// Store category id for an additional category chart lookup
        #[arg(long)]
        category: Option<u32>,
    },

    /// Collect search suggestions across the configured markets
    Suggest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(bundle_id) = cli.bundle_id {
        config.bundle_id = bundle_id;
    }
    if let Some(country) = cli.country {
        config.country = country;
    }
    if let Some(limit) = cli.limit {
        config.limit = limit;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    match cli.command {
        Commands::Monitor => {
            let cmd = MonitorCommand::new(config);
            cmd.run(None).await?;
        }

        Commands::Check => {
            let cmd = MonitorCommand::new(config);
            cmd.run(Some(1)).await?;
        }

        Commands::Charts { category } => {
            let country = config.country.clone();
            let cmd = ChartsCommand::new(config);
            let output = cmd.execute(&country, category).await?;
            println!("{}", output);
        }

        Commands::Suggest => {
            let cmd = SuggestCommand::new(config);
            cmd.execute().await?;
        }
    }

    Ok(())
}
