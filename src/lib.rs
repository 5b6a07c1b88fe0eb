/// Queue Analyzer - Rust Implementation
///
/// Estimates nightclub waiting times from crowd-sourced chat reports.
/// Extracts durations from free-text messages, aggregates them per event
/// night and joins them with line-up popularity and weather features.

pub mod aggregation;
pub mod config;
pub mod extraction;
pub mod ingest;
pub mod model;
pub mod publisher;
pub mod roster;
pub mod store;
pub mod weather;

// Re-export main types for easy access
pub use crate::aggregation::{AggregatedEstimate, ReferenceCurve, TemporalAggregator};
pub use crate::config::Config;
pub use crate::extraction::{QueueEstimator, Vocabulary};
pub use crate::ingest::{MessageFeed, MessageSource, RawMessage};
pub use crate::ingest::reddit::RedditDumpReader;
pub use crate::ingest::telegram::TelegramExportReader;
pub use crate::model::{LeastSquaresModel, Regressor};
pub use crate::publisher::{NightReport, TelegramPublisher};
pub use crate::roster::{ArtistRecord, RosterCacheManager, RosterScraper};
pub use crate::store::{FeatureRow, FeatureStore};
pub use crate::weather::{DailyWeather, WeatherClient};
