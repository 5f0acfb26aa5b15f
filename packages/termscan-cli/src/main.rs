// Command-line entry point for termscan

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use termscan::{
    ConfidenceLevel, ContentExtractor, FileResultStore, HttpPageLoader, LocalPageHost,
    ResultStore, TriggerResponse, Verifier,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{key_status, Config};

#[derive(Parser)]
#[command(
    name = "termscan",
    version,
    about = "Summarize Terms & Conditions pages and cross-check the summary with a second model"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a page, summarize its legal text and print the result as JSON
    Summarize {
        url: String,

        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },
    /// Show what the extractor finds on a page
    Extract { url: String },
    /// Print the most recently stored result
    Last,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,termscan=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        gemini_key = %key_status(&config.gemini_api_key),
        gemini_proxy = ?config.gemini_proxy_url,
        openai_key = %key_status(&config.openai_api_key),
        store = %config.store_path.display(),
        "Configuration loaded"
    );

    match cli.command {
        Command::Summarize { url, pretty } => summarize(&config, &url, pretty).await,
        Command::Extract { url } => extract(&url).await,
        Command::Last => last(&config).await,
    }
}

async fn summarize(config: &Config, url: &str, pretty: bool) -> Result<()> {
    let response = summarize_response(config, url).await;
    print_status(&response);

    let json = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", json);

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one summarize request. Setup and load failures are reported the
/// same way as pipeline failures.
async fn summarize_response(config: &Config, url: &str) -> TriggerResponse {
    let primary = match config.primary() {
        Ok(primary) => primary,
        Err(e) => return TriggerResponse::failure(format!("{:#}", e)),
    };

    let snapshot = match HttpPageLoader::new().load(url).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(url, error = %e, "Page load failed");
            return TriggerResponse::failure(format!("Failed to load {}: {}", url, e));
        }
    };
    tracing::info!(url = %snapshot.url, frames = snapshot.frames.len(), "Page loaded");

    let host = LocalPageHost::new();
    host.open_tab(snapshot).await;

    let mut verifier = Verifier::new(host, FileResultStore::new(&config.store_path), primary);
    if let Some(secondary) = config.secondary() {
        verifier = verifier.with_secondary(secondary);
    } else {
        tracing::warn!("OPENAI_API_KEY not set; running without a cross-check");
    }
    if let Some(embedder) = config.embedder() {
        verifier = verifier.with_embedder(embedder);
    }

    verifier.trigger().await
}

async fn extract(url: &str) -> Result<()> {
    let snapshot = HttpPageLoader::new()
        .load(url)
        .await
        .with_context(|| format!("Failed to load {}", url))?;

    let content = ContentExtractor::default().extract(&snapshot).await;
    eprintln!(
        "{} {} ({} chars)",
        "reason:".bright_cyan().bold(),
        content.reason,
        content.char_count()
    );
    println!("{}", content.text);
    Ok(())
}

async fn last(config: &Config) -> Result<()> {
    let store = FileResultStore::new(&config.store_path);
    let result = store
        .get()
        .await
        .with_context(|| format!("Failed to read {}", config.store_path.display()))?;

    match result {
        Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        None => eprintln!("{}", "No stored result yet.".yellow()),
    }
    Ok(())
}

fn print_status(response: &TriggerResponse) {
    if !response.success {
        eprintln!(
            "{} {}",
            "✗".bright_red().bold(),
            response.error.as_deref().unwrap_or("unknown error")
        );
        return;
    }

    let label = match response.confidence_level {
        Some(ConfidenceLevel::High) => "high confidence".bright_green(),
        Some(ConfidenceLevel::Moderate) => "moderate confidence".yellow(),
        _ => "low confidence".bright_red(),
    };
    eprintln!(
        "{} summary ready, {} ({:.2})",
        "✓".bright_green().bold(),
        label,
        response.confidence
    );
}
