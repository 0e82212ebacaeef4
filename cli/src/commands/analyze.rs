//! ANALYZE command - Upload a CSV file and fetch its analysis.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{HumanReadable, make_request, make_text_request, output, truncate};

/// Entries shown per frequency table in human output.
const TOP_ENTRIES: usize = 10;

/// Output format requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Csv,
    Report,
}

impl Format {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Report => "report",
        }
    }
}

/// Token list searched for example comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Facet {
    Lemma,
    Hashtag,
    Emoji,
}

impl Facet {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Lemma => "lemma",
            Self::Hashtag => "hashtag",
            Self::Emoji => "emoji",
        }
    }
}

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// CSV file with one comment per row
    pub file: PathBuf,

    /// Column holding the comment text
    #[arg(short, long)]
    pub column: String,

    /// Column holding the comment date
    #[arg(long)]
    pub date_column: Option<String>,

    /// Number of themes
    #[arg(long)]
    pub themes: Option<usize>,

    /// Number of sub-themes per theme
    #[arg(long)]
    pub subthemes: Option<usize>,

    /// Result format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also list comments containing --value in this token list
    #[arg(long, value_enum, requires = "value")]
    pub facet: Option<Facet>,

    /// Lemma, hashtag or emoji to look up
    #[arg(long, requires = "facet")]
    pub value: Option<String>,

    /// Maximum number of example comments
    #[arg(long)]
    pub limit: Option<usize>,
}

impl AnalyzeArgs {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("text_column", self.column.clone()),
            ("format", self.format.as_str().to_string()),
        ];
        if let Some(date_column) = &self.date_column {
            query.push(("date_column", date_column.clone()));
        }
        if let Some(themes) = self.themes {
            query.push(("n_themes", themes.to_string()));
        }
        if let Some(subthemes) = self.subthemes {
            query.push(("n_subthemes", subthemes.to_string()));
        }
        if let (Some(facet), Some(value)) = (self.facet, &self.value) {
            query.push(("facet", facet.as_str().to_string()));
            query.push(("value", value.clone()));
            if let Some(limit) = self.limit {
                query.push(("limit", limit.to_string()));
            }
        }
        query
    }
}

/// A theme as reported by the server.
#[derive(Debug, Deserialize, Serialize)]
pub struct ThemeSummary {
    pub theme_id: usize,
    pub label: String,
    pub size: usize,
    pub fallback: bool,
}

/// One row of a frequency table.
#[derive(Debug, Deserialize, Serialize)]
pub struct Frequency {
    pub value: String,
    pub count: usize,
}

/// The parts of the aggregate report shown in human output.
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportSummary {
    pub total_records: usize,
    pub sentiment_counts: BTreeMap<String, usize>,
    #[serde(default)]
    pub lemma_frequencies: Vec<Frequency>,
    #[serde(default)]
    pub hashtag_frequencies: Vec<Frequency>,
    #[serde(default)]
    pub emoji_frequencies: Vec<Frequency>,
    #[serde(default)]
    pub unparsed_dates: usize,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// An example comment.
#[derive(Debug, Deserialize, Serialize)]
pub struct Example {
    pub id: u64,
    pub text: String,
}

/// Example comments for a lemma, hashtag or emoji.
#[derive(Debug, Deserialize, Serialize)]
pub struct Examples {
    pub facet: String,
    pub value: String,
    pub comments: Vec<Example>,
}

/// Response from the analysis endpoint. Fields not shown in human output
/// are kept as-is for JSON output.
#[derive(Debug, Deserialize, Serialize)]
pub struct AnalysisResponse {
    pub themes: Vec<ThemeSummary>,
    pub report: ReportSummary,
    #[serde(default)]
    pub dropped_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Examples>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

fn print_frequencies(title: &str, entries: &[Frequency]) {
    if entries.is_empty() {
        return;
    }
    println!("{}", title.green().bold());
    for entry in entries.iter().take(TOP_ENTRIES) {
        println!("  {:>6}  {}", entry.count, entry.value);
    }
    println!();
}

impl HumanReadable for AnalysisResponse {
    fn print_human(&self) {
        let report = &self.report;

        println!("{}", "Analysis".green().bold());
        println!("{}", "=".repeat(80));
        println!("  {} {}", "Comments:".cyan(), report.total_records);
        if self.dropped_rows > 0 {
            println!("  {} {}", "Skipped (no text):".cyan(), self.dropped_rows);
        }
        if report.unparsed_dates > 0 {
            println!("  {} {}", "Unreadable dates:".cyan(), report.unparsed_dates);
        }
        println!();

        println!("{}", "Sentiment".green().bold());
        for (label, count) in &report.sentiment_counts {
            let label = match label.as_str() {
                "POSITIVE" => label.green(),
                "NEGATIVE" => label.red(),
                _ => label.normal(),
            };
            println!("  {:>6}  {}", count, label);
        }
        println!();

        println!("{}", "Themes".green().bold());
        if self.themes.is_empty() {
            println!("  {}", "(No comments to cluster)".dimmed());
        }
        for theme in &self.themes {
            let note = if theme.fallback {
                " (single sub-theme)".dimmed()
            } else {
                "".normal()
            };
            println!("  {:>6}  {}{}", theme.size, theme.label.bold(), note);
        }
        println!();

        print_frequencies("Top lemmas", &report.lemma_frequencies);
        print_frequencies("Top hashtags", &report.hashtag_frequencies);
        print_frequencies("Top emojis", &report.emoji_frequencies);

        if let Some(examples) = &self.examples {
            println!(
                "{} {} = {}",
                "Examples:".green().bold(),
                examples.facet,
                examples.value.bold()
            );
            if examples.comments.is_empty() {
                println!("  {}", "(No matching comment)".dimmed());
            }
            for example in &examples.comments {
                println!(
                    "  {} {}",
                    format!("[{}]", example.id).dimmed(),
                    truncate(&example.text, 100)
                );
            }
        }
    }
}

/// Execute the analyze command.
pub async fn execute(
    client: &reqwest::Client,
    base_url: &str,
    human: bool,
    args: AnalyzeArgs,
) -> Result<()> {
    let body = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("cannot read {}", args.file.display()))?;

    let url = format!("{}/analyses/csv", base_url);
    let request = client
        .post(&url)
        .query(&args.query())
        .header(CONTENT_TYPE, "text/csv")
        .body(body);

    match args.format {
        Format::Json => {
            let response: AnalysisResponse = make_request(request).await?;
            match &args.output {
                Some(path) => write_output(path, serde_json::to_string_pretty(&response)?).await,
                None => output(&response, human),
            }
        }
        Format::Csv | Format::Report => {
            let text = make_text_request(request).await?;
            match &args.output {
                Some(path) => write_output(path, text).await,
                None => {
                    print!("{}", text);
                    Ok(())
                }
            }
        }
    }
}

async fn write_output(path: &Path, contents: String) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("cannot write {}", path.display()))?;
    eprintln!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: AnalyzeArgs,
    }

    #[test]
    fn test_query_carries_options() {
        let cli = TestCli::parse_from([
            "verbatim",
            "avis.csv",
            "--column",
            "commentaire",
            "--themes",
            "4",
            "--facet",
            "hashtag",
            "--value",
            "sav",
        ]);
        let query = cli.args.query();

        assert!(query.contains(&("text_column", "commentaire".to_string())));
        assert!(query.contains(&("n_themes", "4".to_string())));
        assert!(query.contains(&("facet", "hashtag".to_string())));
        assert!(query.contains(&("value", "sav".to_string())));
        assert!(!query.iter().any(|(key, _)| *key == "n_subthemes"));
    }

    #[test]
    fn test_facet_requires_value() {
        let parsed = TestCli::try_parse_from([
            "verbatim",
            "avis.csv",
            "--column",
            "commentaire",
            "--facet",
            "emoji",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_response_keeps_unknown_fields() {
        let json = serde_json::json!({
            "params": {"n_themes": 2, "n_subthemes": 1},
            "records": [],
            "themes": [{"theme_id": 0, "label": "Theme 0", "size": 3, "fallback": false}],
            "report": {
                "total_records": 3,
                "sentiment_counts": {"NEGATIVE": 1, "NEUTRAL": 0, "POSITIVE": 2},
                "temporal": []
            },
            "dropped_rows": 0
        });
        let response: AnalysisResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.themes[0].size, 3);
        assert_eq!(response.report.sentiment_counts["POSITIVE"], 2);

        let back = serde_json::to_value(&response).unwrap();
        assert!(back.get("records").is_some());
        assert!(back["report"].get("temporal").is_some());
    }
}
