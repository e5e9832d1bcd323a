use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use masothue::config::Config;

mod commands;

use commands::{BatchParams, CacheAction};

#[derive(Parser)]
#[command(
    name = "masothue",
    version,
    about = "Look up Vietnamese company records on masothue.com by tax ID or name",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search by tax ID or company name and list the hits
    Search {
        /// Tax ID or company name
        query: String,

        /// Print JSON instead of text
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Fetch a company page by URL or site path
    Detail {
        /// Detail page URL or path, e.g. /3604062974-cong-ty-abc
        reference: String,

        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Search and fetch the best match in one step
    Lookup {
        /// Tax ID or company name
        query: String,

        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Look up every line of a file, in order
    Batch {
        /// Input file, one query per line
        input: PathBuf,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop the run at the first CAPTCHA challenge
        #[arg(long, default_value = "false")]
        stop_on_captcha: bool,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    masothue::i18n::init_from_env();

    tracing::debug!(config = ?cli.config, "masothue starting");

    match cli.command {
        Commands::Search { query, json } => {
            tracing::info!(query = %query, "Starting search command");
            commands::search(&config, &query, json).await?;
        }

        Commands::Detail { reference, json } => {
            tracing::info!(reference = %reference, "Starting detail command");
            commands::detail(&config, &reference, json).await?;
        }

        Commands::Lookup { query, json } => {
            tracing::info!(query = %query, "Starting lookup command");
            commands::lookup(&config, &query, json).await?;
        }

        Commands::Batch {
            input,
            output,
            stop_on_captcha,
        } => {
            tracing::info!(
                input = %input.display(),
                output = ?output,
                stop_on_captcha = %stop_on_captcha,
                "Starting batch command"
            );
            commands::batch(
                &config,
                BatchParams {
                    input,
                    output,
                    stop_on_captcha,
                },
            )
            .await?;
        }

        Commands::Cache { action } => {
            commands::cache(&config, action).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("masothue=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("masothue={level},warn"))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("masothue=info,warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
