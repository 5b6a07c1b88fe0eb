use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregation::AggregatedEstimate;
use crate::roster::FollowersByDate;
use crate::weather::DailyWeather;

/// One assembled training/inference row: popularity and weather features
/// joined to the aggregated waiting-time target for one event night.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub followers: Option<u64>,
    pub min_temp_c: Option<f64>,
    pub precip_mm: Option<f64>,
    pub max_waiting_time: f64,
}

/// Join the aggregated estimates with the roster and weather series by
/// date. Estimates drive the row set; missing context stays `None` rather
/// than dropping the night.
pub fn assemble_features(
    estimates: &[AggregatedEstimate],
    followers: &[FollowersByDate],
    weather: &[DailyWeather],
) -> Vec<FeatureRow> {
    let followers_by_date: HashMap<NaiveDate, u64> =
        followers.iter().map(|f| (f.date, f.followers)).collect();
    let weather_by_date: HashMap<NaiveDate, &DailyWeather> =
        weather.iter().map(|w| (w.date, w)).collect();

    estimates
        .iter()
        .map(|estimate| {
            let day = weather_by_date.get(&estimate.date);
            FeatureRow {
                date: estimate.date,
                followers: followers_by_date.get(&estimate.date).copied(),
                min_temp_c: day.map(|d| d.min_temp_c),
                precip_mm: day.map(|d| d.precip_mm),
                max_waiting_time: estimate.max_waiting_time,
            }
        })
        .collect()
}

/// JSON flat-file store for the pipeline's durable outputs
///
/// One pretty-printed file per named dataset under the data directory;
/// read(key) / write(key, rows) is the whole contract the rest of the
/// system relies on.
pub struct FeatureStore {
    data_dir: PathBuf,
}

impl FeatureStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        debug!("feature store directory: {}", self.data_dir.display());
        Ok(())
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    pub async fn save_estimates(&self, name: &str, rows: &[AggregatedEstimate]) -> Result<()> {
        let path = self.path(name);
        tokio::fs::write(&path, serde_json::to_string_pretty(rows)?).await?;
        info!("saved {} aggregated estimates to {}", rows.len(), path.display());
        Ok(())
    }

    pub async fn load_estimates(&self, name: &str) -> Result<Vec<AggregatedEstimate>> {
        let content = tokio::fs::read_to_string(self.path(name)).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save_features(&self, name: &str, rows: &[FeatureRow]) -> Result<()> {
        let path = self.path(name);
        tokio::fs::write(&path, serde_json::to_string_pretty(rows)?).await?;
        info!("saved {} feature rows to {}", rows.len(), path.display());
        Ok(())
    }

    pub async fn load_features(&self, name: &str) -> Result<Vec<FeatureRow>> {
        let content = tokio::fs::read_to_string(self.path(name)).await?;
        Ok(serde_json::from_str(&content)?)
    }
}
