//! HEALTH command - Show server status and loaded models.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::{HumanReadable, make_request, output};

/// Arguments for the health command.
#[derive(Args)]
pub struct HealthArgs {}

/// Response from `GET /health`.
#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub embedding_dimension: usize,
    pub embedding_backend: String,
    pub sentiment_backend: String,
}

impl HumanReadable for HealthResponse {
    fn print_human(&self) {
        let status = if self.status == "ok" {
            self.status.green().bold()
        } else {
            self.status.red().bold()
        };
        println!("{} {}", "Status:".cyan(), status);
        println!(
            "{} {} ({} dimensions)",
            "Embeddings:".cyan(),
            self.embedding_backend,
            self.embedding_dimension
        );
        println!("{} {}", "Sentiment:".cyan(), self.sentiment_backend);
    }
}

/// Execute the health command.
pub async fn execute(
    client: &reqwest::Client,
    base_url: &str,
    human: bool,
    _args: HealthArgs,
) -> Result<()> {
    let url = format!("{}/health", base_url);
    let response: HealthResponse = make_request(client.get(&url)).await?;
    output(&response, human)
}
