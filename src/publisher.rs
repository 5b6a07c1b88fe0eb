use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::roster::ArtistRecord;
use crate::weather::DailyWeather;

/// Everything that goes into one nightly report
#[derive(Debug, Clone)]
pub struct NightReport {
    /// Predicted maximum waiting time in hours, `None` when there is no
    /// event or the features could not be assembled
    pub predicted_hours: Option<f64>,
    /// Tonight's line-up, highest follower count first
    pub artists: Vec<ArtistRecord>,
    pub weather: Option<DailyWeather>,
}

/// Render the nightly report as Telegram HTML
pub fn format_report(report: &NightReport) -> String {
    let Some(predicted_hours) = report.predicted_hours else {
        return "🚫 No predictions for tonight".to_string();
    };

    let mut reply = String::from("🎶 <b>Today:</b>\n\n");

    // Group the line-up by floor, keeping the follower ordering within
    let mut floors: BTreeMap<&str, Vec<&ArtistRecord>> = BTreeMap::new();
    for artist in &report.artists {
        floors.entry(artist.location.as_str()).or_default().push(artist);
    }

    for (floor, artists) in floors {
        reply.push_str(&format!("📍 <b>{}</b>:\n", floor));
        for artist in artists {
            match &artist.soundcloud_url {
                Some(url) => {
                    reply.push_str(&format!("{} <a href='{}'>{}</a>\n", artist.name, url, url))
                }
                None => reply.push_str(&format!("{} No link available\n", artist.name)),
            }
        }
        reply.push('\n');
    }

    let comment = if predicted_hours >= 5.0 {
        "higher than usual"
    } else {
        "lower than usual"
    };
    let waiting_time = if predicted_hours > 1.0 {
        format!("{:.2} h", predicted_hours)
    } else {
        "less than 1 hour".to_string()
    };
    reply.push_str(&format!(
        "⏳ Max estimated waiting time: {} ({})\n\n",
        waiting_time, comment
    ));

    match &report.weather {
        Some(weather) => {
            let temp_emoji = if weather.min_temp_c < 5.0 {
                "❄️"
            } else if weather.min_temp_c < 10.0 {
                "🌝"
            } else {
                "🔥"
            };

            let rain = weather.chance_of_rain.unwrap_or(0.0);
            let rain_emoji = if rain == 0.0 {
                "🌵"
            } else if rain < 30.0 {
                "🌤️"
            } else if rain < 70.0 {
                "🌦️"
            } else {
                "🌧️"
            };

            reply.push_str(&format!(
                "Temperature: {}°C {}\nPrecipitation: {}% {}\n",
                weather.min_temp_c, temp_emoji, rain, rain_emoji
            ));
        }
        None => {
            reply.push_str("Temperature: N/A\nPrecipitation: N/A\n");
        }
    }

    reply
}

/// Telegram Bot API publisher
pub struct TelegramPublisher {
    client: Client,
    token: String,
}

impl TelegramPublisher {
    pub fn new(token: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, token }
    }

    /// Read the bot token from `BOT_TOKEN`
    pub fn from_env() -> Result<Self> {
        let token =
            std::env::var("BOT_TOKEN").map_err(|_| anyhow!("BOT_TOKEN is not set"))?;
        Ok(Self::new(token))
    }

    /// Send one HTML-formatted message to a chat
    pub async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("sendMessage failed with {}: {}", status, body);
            return Err(anyhow!("telegram sendMessage failed: {}", status));
        }

        info!("published report to chat {}", chat_id);
        Ok(())
    }

    /// Format and publish a nightly report
    pub async fn publish(&self, chat_id: &str, report: &NightReport) -> Result<()> {
        self.send(chat_id, &format_report(report)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn artist(name: &str, location: &str, followers: u64) -> ArtistRecord {
        ArtistRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            name: name.to_string(),
            followers,
            location: location.to_string(),
            soundcloud_url: Some(format!("https://soundcloud.com/{}", name)),
        }
    }

    #[test]
    fn test_no_prediction_report() {
        let report = NightReport {
            predicted_hours: None,
            artists: Vec::new(),
            weather: None,
        };
        assert_eq!(format_report(&report), "🚫 No predictions for tonight");
    }

    #[test]
    fn test_report_groups_by_floor() {
        let report = NightReport {
            predicted_hours: Some(3.2),
            artists: vec![
                artist("dettmann", "Berghain", 400_000),
                artist("vril", "Panorama Bar", 90_000),
            ],
            weather: None,
        };

        let text = format_report(&report);
        assert!(text.contains("📍 <b>Berghain</b>:"));
        assert!(text.contains("📍 <b>Panorama Bar</b>:"));
        assert!(text.contains("https://soundcloud.com/dettmann"));
        assert!(text.contains("3.20 h"));
        assert!(text.contains("lower than usual"));
    }

    #[test]
    fn test_high_prediction_comment() {
        let report = NightReport {
            predicted_hours: Some(6.0),
            artists: Vec::new(),
            weather: None,
        };
        assert!(format_report(&report).contains("higher than usual"));
    }

    #[test]
    fn test_short_wait_wording() {
        let report = NightReport {
            predicted_hours: Some(0.7),
            artists: Vec::new(),
            weather: None,
        };
        assert!(format_report(&report).contains("less than 1 hour"));
    }

    #[test]
    fn test_weather_emojis() {
        let report = NightReport {
            predicted_hours: Some(2.0),
            artists: Vec::new(),
            weather: Some(DailyWeather {
                date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
                min_temp_c: 3.0,
                precip_mm: 4.0,
                chance_of_rain: Some(80.0),
            }),
        };

        let text = format_report(&report);
        assert!(text.contains("❄️"));
        assert!(text.contains("🌧️"));
    }
}
