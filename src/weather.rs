use anyhow::Result;
use chrono::{Duration, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

/// The history endpoint caps ranges, so requests are chunked
const CHUNK_DAYS: i64 = 35;

/// Daily weather summary for the club's city
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyWeather {
    pub date: NaiveDate,
    /// Daily minimum, roughly the temperature people queue in
    pub min_temp_c: f64,
    pub precip_mm: f64,
    /// Rain probability in percent, when the API provides it
    pub chance_of_rain: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    forecast: Forecast,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    date: NaiveDate,
    day: DaySummary,
}

#[derive(Debug, Deserialize)]
struct DaySummary {
    mintemp_c: f64,
    totalprecip_mm: f64,
    daily_chance_of_rain: Option<f64>,
}

/// Weather-history API client
///
/// Missing credentials or upstream failures degrade to an empty series;
/// the pipeline treats weather as optional context, never a hard
/// dependency.
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: "http://api.weatherapi.com/v1/history.json".to_string(),
            api_key,
        }
    }

    /// Read the API key from `WEATHER_API_KEY`
    pub fn from_env() -> Self {
        Self::new(std::env::var("WEATHER_API_KEY").ok())
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Daily weather for the inclusive date range, fetched in chunks
    pub async fn history(
        &self,
        city: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyWeather>> {
        let Some(api_key) = &self.api_key else {
            warn!("no weather API key configured, returning empty series");
            return Ok(Vec::new());
        };

        let mut series = Vec::new();

        for (chunk_start, chunk_end) in chunk_ranges(start_date, end_date) {
            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("key", api_key.as_str()),
                    ("q", city),
                    ("dt", &chunk_start.format("%Y-%m-%d").to_string()),
                    ("end_dt", &chunk_end.format("%Y-%m-%d").to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                warn!(
                    "weather request for {}..{} failed with status {}",
                    chunk_start,
                    chunk_end,
                    response.status()
                );
                continue;
            }

            let history: HistoryResponse = response.json().await?;
            debug!(
                "fetched {} weather days for {}..{}",
                history.forecast.forecastday.len(),
                chunk_start,
                chunk_end
            );

            series.extend(history.forecast.forecastday.into_iter().map(|day| {
                DailyWeather {
                    date: day.date,
                    min_temp_c: day.day.mintemp_c,
                    precip_mm: day.day.totalprecip_mm,
                    chance_of_rain: day.day.daily_chance_of_rain,
                }
            }));
        }

        Ok(series)
    }
}

/// Split an inclusive date range into API-sized chunks
fn chunk_ranges(start_date: NaiveDate, end_date: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();
    let mut cursor = start_date;

    while cursor <= end_date {
        let chunk_end = (cursor + Duration::days(CHUNK_DAYS - 1)).min(end_date);
        chunks.push((cursor, chunk_end));
        cursor += Duration::days(CHUNK_DAYS);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_chunk_ranges_short_range() {
        let chunks = chunk_ranges(date(2024, 3, 1), date(2024, 3, 10));
        assert_eq!(chunks, vec![(date(2024, 3, 1), date(2024, 3, 10))]);
    }

    #[test]
    fn test_chunk_ranges_splits_long_range() {
        let chunks = chunk_ranges(date(2024, 1, 1), date(2024, 3, 15));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], (date(2024, 1, 1), date(2024, 2, 4)));
        assert_eq!(chunks[1].0, date(2024, 2, 5));
        assert_eq!(chunks[2].1, date(2024, 3, 15));
    }

    #[test]
    fn test_chunk_ranges_single_day() {
        let chunks = chunk_ranges(date(2024, 3, 2), date(2024, 3, 2));
        assert_eq!(chunks, vec![(date(2024, 3, 2), date(2024, 3, 2))]);
    }

    #[test]
    fn test_history_response_parsing() {
        let payload = r#"{
            "forecast": {
                "forecastday": [{
                    "date": "2024-03-02",
                    "day": {
                        "mintemp_c": 4.5,
                        "totalprecip_mm": 1.2,
                        "daily_chance_of_rain": 60
                    }
                }]
            }
        }"#;

        let parsed: HistoryResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.forecast.forecastday.len(), 1);
        assert_eq!(parsed.forecast.forecastday[0].day.mintemp_c, 4.5);
        assert_eq!(parsed.forecast.forecastday[0].day.daily_chance_of_rain, Some(60.0));
    }

    #[tokio::test]
    async fn test_missing_api_key_yields_empty_series() {
        let client = WeatherClient::new(None);
        let series = client
            .history("Berlin", date(2024, 3, 1), date(2024, 3, 2))
            .await
            .unwrap();
        assert!(series.is_empty());
    }
}
