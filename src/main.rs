//! CLI entry point for the chapter extractor.

use std::sync::Arc;

use anyhow::{Context, Result};
use chapter_core::{
    BrowserExtractor, ChapterExtractor, ChromiumLauncher, DocumentCache, ExtractorConfig,
    StaticFetcher,
};
use clap::Parser;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries the JSON result only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let mut config = ExtractorConfig::from_env().context("invalid CHAPTER_* environment")?;
    args.apply_to(&mut config);
    config.validate()?;

    let extractor = build_extractor(&args, &config)?;
    let request = args.document_request();

    info!(url = %request.url, "Chapter extraction starting");
    let result = extractor.extract(&request).await?;

    if result.is_empty() {
        warn!(
            note = result.diagnostic_note.as_deref().unwrap_or_default(),
            "No chapter images found"
        );
    }

    let json = serde_json::to_string_pretty(&result)?;
    if let Some(path) = &args.out {
        std::fs::write(path, &json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        info!(path = %path.display(), "Result written");
    }
    println!("{json}");

    Ok(())
}

fn build_extractor(args: &Args, config: &ExtractorConfig) -> Result<ChapterExtractor> {
    let rules = config.classifier_rules()?;
    let fetcher = StaticFetcher::with_settings(config.connect_timeout, config.user_agent.as_deref())?;
    let cache = Arc::new(DocumentCache::new(config.cache_ttl));

    let mut extractor = ChapterExtractor::new(Arc::new(fetcher), cache)
        .with_rules(rules)
        .with_fetch_timeout(config.fetch_timeout)
        .with_settle_delay(config.settle_delay)
        .with_default_user_agent(config.user_agent.as_deref())
        .with_resource_blocking(config.conserve_resources, config.block_images);

    if args.no_browser {
        debug!("browser fallback disabled");
    } else {
        let launcher = match &config.chromium_path {
            Some(path) => ChromiumLauncher::with_executable(path),
            None => ChromiumLauncher::new(),
        };
        let browser = BrowserExtractor::with_settings(Arc::new(launcher), config.browser_settings());
        extractor = extractor.with_browser(Arc::new(browser));
    }

    Ok(extractor)
}
