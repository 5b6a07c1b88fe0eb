use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the queue analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Text extraction settings
    pub extraction: ExtractionConfig,

    /// Temporal aggregation settings
    pub aggregation: AggregationConfig,

    /// Ingest settings for the message feeds
    pub ingest: IngestConfig,

    /// Program archive and follower scraping settings
    pub roster: RosterConfig,

    /// Weather lookup settings
    pub weather: WeatherConfig,

    /// Output and storage settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Optional terms file overriding the built-in vocabulary
    pub terms_file: Option<PathBuf>,

    /// Hour candidates at or above this value are implausible
    pub implausible_hour_threshold: f64,

    /// Hours of walking time per metre of reported queue length
    pub distance_time_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Weekdays the club is open, Monday = 0
    pub open_weekdays: Vec<u32>,

    /// Upper clamp for intensity-scaled estimates, in hours
    pub max_waiting_time: f64,

    /// Timestamps before this hour belong to the previous night
    pub early_morning_cutoff: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding Telegram chat export HTML files
    pub telegram_export_dir: PathBuf,

    /// JSON dump of archived Reddit posts and comments
    pub reddit_dump_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Base URL of the monthly program archive
    pub archive_url: String,

    /// HTTP request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Directory for per-month roster caches
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Location query for the weather API
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for aggregated estimates, feature rows and the model
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_paths = [
            "queue-analyzer.toml",
            "config/queue-analyzer.toml",
            "/etc/queue-analyzer/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(export_dir) = std::env::var("QUEUE_ANALYZER_EXPORT_DIR") {
            config.ingest.telegram_export_dir = PathBuf::from(export_dir);
        }

        if let Ok(data_dir) = std::env::var("QUEUE_ANALYZER_DATA_DIR") {
            config.output.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(log_level) = std::env::var("QUEUE_ANALYZER_LOG_LEVEL") {
            config.output.log_level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.extraction.implausible_hour_threshold <= 0.0 {
            return Err(anyhow!("implausible_hour_threshold must be positive"));
        }

        if self.aggregation.max_waiting_time <= 0.0 {
            return Err(anyhow!("max_waiting_time must be positive"));
        }

        if self.aggregation.open_weekdays.iter().any(|&d| d > 6) {
            return Err(anyhow!("open_weekdays entries must be 0..=6, Monday = 0"));
        }

        if self.aggregation.early_morning_cutoff > 23 {
            return Err(anyhow!("early_morning_cutoff must be an hour of day"));
        }

        if self.roster.request_timeout_seconds == 0 {
            return Err(anyhow!("request_timeout_seconds must be greater than 0"));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Queue Analyzer Configuration:\n\
            - Telegram Export: {}\n\
            - Data Directory: {}\n\
            - Open Weekdays: {:?}\n\
            - Max Waiting Time: {}h\n\
            - Archive URL: {}\n\
            - Weather City: {}",
            self.ingest.telegram_export_dir.display(),
            self.output.data_dir.display(),
            self.aggregation.open_weekdays,
            self.aggregation.max_waiting_time,
            self.roster.archive_url,
            self.weather.city
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig {
                terms_file: None,
                implausible_hour_threshold: 8.0,
                distance_time_factor: 2.0 / 60.0,
            },
            aggregation: AggregationConfig {
                // Friday through Monday morning
                open_weekdays: vec![4, 5, 6, 0],
                max_waiting_time: 10.0,
                early_morning_cutoff: 5,
            },
            ingest: IngestConfig {
                telegram_export_dir: PathBuf::from("./data/telegram_export"),
                reddit_dump_file: None,
            },
            roster: RosterConfig {
                archive_url: "https://www.berghain.berlin/en/program/archive".to_string(),
                request_timeout_seconds: 30,
                cache_dir: PathBuf::from("./cache/roster"),
            },
            weather: WeatherConfig {
                city: "Berlin".to_string(),
            },
            output: OutputConfig {
                data_dir: PathBuf::from("./data"),
                log_level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.config.ingest.telegram_export_dir = dir;
        self
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.data_dir = dir;
        self
    }

    pub fn with_open_weekdays(mut self, weekdays: Vec<u32>) -> Self {
        self.config.aggregation.open_weekdays = weekdays;
        self
    }

    pub fn with_max_waiting_time(mut self, hours: f64) -> Self {
        self.config.aggregation.max_waiting_time = hours;
        self
    }

    pub fn with_archive_url(mut self, url: String) -> Self {
        self.config.roster.archive_url = url;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.aggregation.open_weekdays, vec![4, 5, 6, 0]);
        assert_eq!(config.aggregation.max_waiting_time, 10.0);
        assert_eq!(config.extraction.implausible_hour_threshold, 8.0);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_export_dir(PathBuf::from("/tmp/export"))
            .with_data_dir(PathBuf::from("/tmp/queue"))
            .with_max_waiting_time(12.0)
            .with_open_weekdays(vec![5, 6])
            .with_archive_url("https://club.example/program/archive".to_string())
            .build();

        assert_eq!(
            config.ingest.telegram_export_dir,
            PathBuf::from("/tmp/export")
        );
        assert_eq!(config.output.data_dir, PathBuf::from("/tmp/queue"));
        assert_eq!(config.aggregation.max_waiting_time, 12.0);
        assert_eq!(config.aggregation.open_weekdays, vec![5, 6]);
        assert_eq!(
            config.roster.archive_url,
            "https://club.example/program/archive"
        );
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let bad = ConfigBuilder::new().with_open_weekdays(vec![7]).build();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.weather.city, config.weather.city);
    }
}
