//! testkit CLI - Main Entry Point
//!
//! Command-line access to the testkit poller, auth sessions and test data
//! factories, for use from CI scripts and shells.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{session, token, user, wait};
use testkit_common::{init_logging, LoggingConfig, TestConfig};

/// testkit CLI - API test support tools
#[derive(Parser)]
#[command(name = "testkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// YAML config file; environment variables still take precedence
    #[arg(short, long, global = true, env = "TESTKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a URL until it returns the expected status (and JSON field)
    Wait(wait::WaitArgs),

    /// Run global setup: create session dir, optionally wait for the API
    Setup(session::SetupArgs),

    /// Run global teardown
    Teardown(session::TeardownArgs),

    /// Obtain an auth token, cached per environment and user
    Token(token::TokenArgs),

    /// Generate a test user
    User(user::UserArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig::verbose(cli.verbose))?;

    let config = TestConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Wait(args) => {
            if !wait::execute(args, &config).await? {
                std::process::exit(1);
            }
        }
        Commands::Setup(args) => session::setup(args, &config).await?,
        Commands::Teardown(args) => session::teardown(args, &config).await?,
        Commands::Token(args) => token::execute(args, &config).await?,
        Commands::User(args) => user::execute(args, &config, cli.format).await?,
        Commands::Version => {
            println!("testkit CLI v{}", testkit_common::VERSION);
            println!("Base URL: {}", config.base_url);
            println!("Environment: {}", config.environment);
        }
    }

    Ok(())
}
