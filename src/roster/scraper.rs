use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// One artist booked for one event night
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRecord {
    pub date: NaiveDate,
    pub name: String,
    pub followers: u64,
    /// Floor the artist plays on
    pub location: String,
    /// Resolved profile page, when the lookup found one
    pub soundcloud_url: Option<String>,
}

/// An event link parsed from the archive page, before follower lookup
#[derive(Debug, Clone, PartialEq)]
pub struct EventEntry {
    pub date: NaiveDate,
    pub location: String,
    pub artists: Vec<String>,
}

/// Scraper for the club's monthly program archive plus SoundCloud
/// follower lookups per artist.
#[derive(Clone)]
pub struct RosterScraper {
    client: Client,
    archive_url: Url,
    /// Known floors; archive links naming none of these are not events
    locations: Vec<String>,
}

impl RosterScraper {
    pub fn new(archive_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            archive_url: Url::parse(archive_url)?,
            locations: vec!["Berghain", "Panorama Bar", "Säule", "Italorama Bar"]
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }

    /// Scrape one archive month and resolve follower counts per artist
    pub async fn scrape_month(&self, year: i32, month: u32) -> Result<Vec<ArtistRecord>> {
        let url = self.month_url(year, month)?;
        info!("scraping program archive: {}", url);

        let html = self.client.get(url).send().await?.text().await?;
        let events = self.parse_archive_page(&html)?;
        debug!("found {} event entries for {}-{:02}", events.len(), year, month);

        let mut records = Vec::new();
        for event in events {
            for artist in &event.artists {
                let (followers, soundcloud_url) = match self.lookup_followers(artist).await {
                    Ok(found) => found,
                    Err(e) => {
                        warn!("follower lookup failed for {}: {}", artist, e);
                        (0, None)
                    }
                };

                records.push(ArtistRecord {
                    date: event.date,
                    name: artist.clone(),
                    followers,
                    location: event.location.clone(),
                    soundcloud_url,
                });
            }
        }

        Ok(records)
    }

    fn month_url(&self, year: i32, month: u32) -> Result<Url> {
        let path = format!("{}/{}/{:02}/", self.archive_url.path().trim_end_matches('/'), year, month);
        let mut url = self.archive_url.clone();
        url.set_path(&path);
        Ok(url)
    }

    /// Extract event entries from an archive page. Event links carry an
    /// `upcoming-event` marker, name one of the known floors, a
    /// `dd.mm.yyyy` date and the artist line-up.
    pub fn parse_archive_page(&self, html: &str) -> Result<Vec<EventEntry>> {
        let document = Html::parse_document(html);
        let link_sel = Selector::parse("a").map_err(|e| anyhow!("bad selector: {e}"))?;
        let date_re = Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})")?;

        let mut events = Vec::new();

        for link in document.select(&link_sel) {
            if !link.html().contains("upcoming-event") {
                continue;
            }

            let lines: Vec<String> = link
                .text()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();

            let Some(location) = self
                .locations
                .iter()
                .find(|loc| lines.iter().any(|line| line.contains(loc.as_str())))
                .cloned()
            else {
                continue;
            };

            let text = lines.join("\n");
            let Some(caps) = date_re.captures(&text) else {
                continue;
            };
            let date = NaiveDate::from_ymd_opt(
                caps[3].parse()?,
                caps[2].parse()?,
                caps[1].parse()?,
            )
            .ok_or_else(|| anyhow!("invalid archive date: {}", &caps[0]))?;

            // Whatever follows the date line is the line-up
            let date_line = lines
                .iter()
                .position(|line| date_re.is_match(line))
                .unwrap_or(0);
            let artist_str = lines
                .iter()
                .skip(date_line + 1)
                .filter(|line| !self.locations.iter().any(|loc| line.contains(loc.as_str())))
                .cloned()
                .collect::<Vec<_>>()
                .join(",");

            let artists = split_artists(&artist_str);
            if artists.is_empty() {
                continue;
            }

            events.push(EventEntry {
                date,
                location,
                artists,
            });
        }

        Ok(events)
    }

    /// Resolve an artist's SoundCloud follower count via the search page
    /// and the profile's `follower_count` meta tag. Any miss is 0, not an
    /// error worth failing the whole month for.
    pub async fn lookup_followers(&self, artist: &str) -> Result<(u64, Option<String>)> {
        let search_url = format!(
            "https://soundcloud.com/search?q={}",
            urlencoding::encode(artist)
        );
        let html = self.client.get(&search_url).send().await?.text().await?;

        let Some(tag) = first_profile_tag(&html)? else {
            return Ok((0, None));
        };

        let profile_url = format!("https://soundcloud.com/{}", tag);
        let profile_html = self.client.get(&profile_url).send().await?.text().await?;

        let followers = extract_follower_count(&profile_html).unwrap_or(0);
        Ok((followers, Some(profile_url)))
    }
}

/// Split a line-up string into artist names: B2B pairings become separate
/// entries, "Live" markers are stripped.
pub fn split_artists(artist_str: &str) -> Vec<String> {
    artist_str
        .replace(" B2B ", ",")
        .replace(" b2b ", ",")
        .replace("Live", "")
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// First profile path from a search result page
fn first_profile_tag(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let link_sel = Selector::parse("a").map_err(|e| anyhow!("bad selector: {e}"))?;

    let tag = document
        .select(&link_sel)
        .filter_map(|link| link.value().attr("href"))
        .find(|href| {
            href.starts_with('/')
                && !href.starts_with("//")
                && href.matches('/').count() == 1
                && !matches!(
                    *href,
                    "/" | "/discover" | "/search" | "/upload" | "/signin"
                )
        })
        .map(|href| href.trim_matches('/').to_string());

    Ok(tag)
}

/// Follower count from a profile page's meta content
fn extract_follower_count(html: &str) -> Option<u64> {
    let re = Regex::new(r#"follower_count"\s+content="(\d+)""#).ok()?;
    re.captures(html)?.get(1)?.as_str().parse().ok()
}
