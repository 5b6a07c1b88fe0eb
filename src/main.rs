use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

use queue_analyzer_rust::aggregation::TemporalAggregator;
use queue_analyzer_rust::config::Config;
use queue_analyzer_rust::extraction::QueueEstimator;
use queue_analyzer_rust::ingest::{merge_sorted, MessageFeed};
use queue_analyzer_rust::ingest::reddit::RedditDumpReader;
use queue_analyzer_rust::ingest::telegram::TelegramExportReader;
use queue_analyzer_rust::store::FeatureStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("queue_analyzer_rust=info,warn")
        .init();

    let matches = Command::new("Queue Analyzer (Rust)")
        .version("0.1.0")
        .about("Waiting-time estimation from crowd-sourced queue reports")
        .arg(
            Arg::new("export-dir")
                .short('e')
                .long("export-dir")
                .value_name("DIR")
                .help("Directory containing Telegram chat export HTML files"),
        )
        .arg(
            Arg::new("reddit-dump")
                .short('r')
                .long("reddit-dump")
                .value_name("FILE")
                .help("JSON dump of archived Reddit posts and comments"),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Output directory for aggregated estimates"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(dir) = matches.get_one::<String>("export-dir") {
        config.ingest.telegram_export_dir = PathBuf::from(dir);
    }
    if let Some(file) = matches.get_one::<String>("reddit-dump") {
        config.ingest.reddit_dump_file = Some(PathBuf::from(file));
    }
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config.output.data_dir = PathBuf::from(dir);
    }
    if matches.get_flag("verbose") {
        info!("Verbose logging enabled");
    }

    config.validate()?;
    info!("Queue Analyzer (Rust) starting...");
    info!("{}", config.summary());

    if !config.ingest.telegram_export_dir.exists() {
        error!(
            "Export directory does not exist: {}",
            config.ingest.telegram_export_dir.display()
        );
        return Err(anyhow::anyhow!("Export directory not found"));
    }

    let start_time = std::time::Instant::now();

    // Ingest every configured feed
    let telegram = TelegramExportReader::new(&config.ingest.telegram_export_dir);
    let mut messages = telegram.fetch().await?;
    info!("read {} Telegram messages", messages.len());

    if let Some(dump) = &config.ingest.reddit_dump_file {
        let reddit = RedditDumpReader::new(dump);
        let posts = reddit.fetch().await?;
        info!("read {} Reddit reports", posts.len());
        messages = merge_sorted(vec![messages, posts]);
    }

    // Extract and aggregate per event night
    let estimator = QueueEstimator::from_config(&config.extraction).await?;
    let aggregator = TemporalAggregator::new(estimator)
        .with_open_weekdays(config.aggregation.open_weekdays.clone())
        .with_max_waiting_time(config.aggregation.max_waiting_time);
    let estimates = aggregator.aggregate(&messages);
    info!("aggregated {} event nights", estimates.len());

    // Persist for the training and reporting stages
    let store = FeatureStore::new(&config.output.data_dir);
    store.initialize().await?;
    store.save_estimates("estimates", &estimates).await?;

    let duration = start_time.elapsed();
    info!("Processing completed in {:.2}s", duration.as_secs_f64());

    Ok(())
}
