//! Command-line client for the Verbatim comment analysis service.
//!
//! Commands:
//! - analyze: Upload a CSV file and fetch themes, sentiment and frequencies
//! - health: Show the server status and loaded models
//!
//! Configuration via environment:
//! - VERBATIM_URL: Base URL of the analysis server (default: http://localhost:3000)

mod commands;

use clap::{Parser, Subcommand};

use commands::{analyze::AnalyzeArgs, health::HealthArgs};

/// Verbatim CLI
///
/// Analyse free-text comments from the command line. Prints JSON by default
/// and formatted text with --human.
#[derive(Parser)]
#[command(name = "verbatim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output human-readable formatted text instead of JSON
    #[arg(long, global = true)]
    human: bool,

    /// Analysis server URL
    #[arg(
        long,
        env = "VERBATIM_URL",
        default_value = "http://localhost:3000",
        global = true
    )]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a CSV file of comments
    Analyze(AnalyzeArgs),

    /// Check the server and its models
    Health(HealthArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let client = match commands::build_client() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let url = cli.url.trim_end_matches('/');
    let result = match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(&client, url, cli.human, args).await,
        Commands::Health(args) => commands::health::execute(&client, url, cli.human, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
