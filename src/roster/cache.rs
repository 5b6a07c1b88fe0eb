use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use super::scraper::{ArtistRecord, RosterScraper};

/// Cached roster for one archive month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterCache {
    /// Unix timestamp of the scrape
    pub timestamp: u64,
    pub year: i32,
    pub month: u32,
    pub records: Vec<ArtistRecord>,
}

/// Follower total per event night, the feature the model consumes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowersByDate {
    pub date: NaiveDate,
    pub followers: u64,
}

/// Per-month JSON cache of scraped rosters
///
/// Past archive months never change, so cached months are reused without
/// a TTL; only missing months hit the network.
#[derive(Clone)]
pub struct RosterCacheManager {
    cache_dir: PathBuf,
}

impl RosterCacheManager {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
        }
    }

    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        debug!("roster cache directory: {}", self.cache_dir.display());
        Ok(())
    }

    fn cache_path(&self, year: i32, month: u32) -> PathBuf {
        self.cache_dir.join(format!("{}_{:02}.json", year, month))
    }

    /// Load a cached month if present
    pub async fn load_month(&self, year: i32, month: u32) -> Option<RosterCache> {
        let path = self.cache_path(year, month);
        if !path.exists() {
            return None;
        }

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<RosterCache>(&content) {
                Ok(cache) => {
                    debug!(
                        "roster cache hit: {} records for {}-{:02}",
                        cache.records.len(),
                        year,
                        month
                    );
                    Some(cache)
                }
                Err(e) => {
                    warn!("failed to parse roster cache {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("failed to read roster cache {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn save_month(&self, year: i32, month: u32, records: Vec<ArtistRecord>) -> Result<RosterCache> {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let cache = RosterCache {
            timestamp,
            year,
            month,
            records,
        };

        let path = self.cache_path(year, month);
        tokio::fs::write(&path, serde_json::to_string_pretty(&cache)?).await?;
        info!(
            "saved {} roster records for {}-{:02}",
            cache.records.len(),
            year,
            month
        );
        Ok(cache)
    }

    /// Cached month if present, otherwise scrape and cache it
    pub async fn load_or_scrape(
        &self,
        scraper: &RosterScraper,
        year: i32,
        month: u32,
    ) -> Result<Vec<ArtistRecord>> {
        if let Some(cache) = self.load_month(year, month).await {
            return Ok(cache.records);
        }

        let records = scraper.scrape_month(year, month).await?;
        self.save_month(year, month, records.clone()).await?;
        Ok(records)
    }

    /// All cached records across every month
    pub async fn load_all(&self) -> Result<Vec<ArtistRecord>> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Ok(content) = tokio::fs::read_to_string(&path).await {
                    if let Ok(cache) = serde_json::from_str::<RosterCache>(&content) {
                        records.extend(cache.records);
                    }
                }
            }
        }

        Ok(records)
    }
}

/// Sum followers over all artists booked for the same event night
pub fn followers_by_date(records: &[ArtistRecord]) -> Vec<FollowersByDate> {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.date).or_insert(0) += record.followers;
    }

    totals
        .into_iter()
        .map(|(date, followers)| FollowersByDate { date, followers })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: (i32, u32, u32), name: &str, followers: u64) -> ArtistRecord {
        ArtistRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            name: name.to_string(),
            followers,
            location: "Berghain".to_string(),
            soundcloud_url: None,
        }
    }

    #[test]
    fn test_followers_by_date_sums_per_night() {
        let records = vec![
            record((2024, 3, 2), "a", 100),
            record((2024, 3, 2), "b", 250),
            record((2024, 3, 3), "c", 40),
        ];

        let totals = followers_by_date(&records);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].followers, 350);
        assert_eq!(totals[1].followers, 40);
        // sorted by date
        assert!(totals[0].date < totals[1].date);
    }

    #[tokio::test]
    async fn test_save_and_load_month() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RosterCacheManager::new(dir.path());
        manager.initialize().await.unwrap();

        let records = vec![record((2024, 3, 2), "a", 100)];
        manager.save_month(2024, 3, records.clone()).await.unwrap();

        let cache = manager.load_month(2024, 3).await.unwrap();
        assert_eq!(cache.records, records);
        assert_eq!(cache.year, 2024);

        assert!(manager.load_month(2024, 4).await.is_none());
    }

    #[tokio::test]
    async fn test_load_all_concatenates_months() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RosterCacheManager::new(dir.path());
        manager.initialize().await.unwrap();

        manager
            .save_month(2024, 3, vec![record((2024, 3, 2), "a", 100)])
            .await
            .unwrap();
        manager
            .save_month(2024, 4, vec![record((2024, 4, 6), "b", 200)])
            .await
            .unwrap();

        let all = manager.load_all().await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
