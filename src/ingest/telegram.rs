use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{parse_export_timestamp, MessageFeed, MessageSource, RawMessage};

/// Reader for Telegram chat-export HTML files
///
/// The desktop client exports a chat as a series of `messagesN.html` files;
/// each message is a `div.message` with `from_name`, `text` and a `date`
/// div whose `title` attribute carries the full timestamp.
pub struct TelegramExportReader {
    export_dir: PathBuf,
}

impl TelegramExportReader {
    pub fn new<P: AsRef<Path>>(export_dir: P) -> Self {
        Self {
            export_dir: export_dir.as_ref().to_path_buf(),
        }
    }

    /// Parse one export file. Messages missing any of sender, text or
    /// timestamp (service messages, stickers) are skipped.
    pub fn parse_export(html: &str) -> Result<Vec<RawMessage>> {
        let document = Html::parse_document(html);

        let message_sel =
            Selector::parse("div.message").map_err(|e| anyhow!("bad selector: {e}"))?;
        let sender_sel =
            Selector::parse("div.from_name").map_err(|e| anyhow!("bad selector: {e}"))?;
        let text_sel = Selector::parse("div.text").map_err(|e| anyhow!("bad selector: {e}"))?;
        let date_sel = Selector::parse("div.date").map_err(|e| anyhow!("bad selector: {e}"))?;

        let mut messages = Vec::new();

        for message in document.select(&message_sel) {
            let sender = message.select(&sender_sel).next();
            let text = message.select(&text_sel).next();
            let date = message.select(&date_sel).next();

            let (Some(sender), Some(text), Some(date)) = (sender, text, date) else {
                continue;
            };
            let Some(raw_timestamp) = date.value().attr("title") else {
                continue;
            };

            let timestamp = match parse_export_timestamp(raw_timestamp) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("skipping message with bad timestamp: {}", e);
                    continue;
                }
            };

            messages.push(RawMessage {
                sender: normalize_whitespace(&sender.text().collect::<String>()),
                text: normalize_whitespace(&text.text().collect::<String>()),
                timestamp,
                source: MessageSource::Telegram,
            });
        }

        Ok(messages)
    }

    /// Read every export file in the directory, oldest file first, and
    /// return one timestamp-ordered stream.
    pub async fn read_all(&self) -> Result<Vec<RawMessage>> {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.export_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().map_or(false, |ext| ext == "html")
            })
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();

        let mut messages = Vec::new();
        for path in &paths {
            let html = tokio::fs::read_to_string(path).await?;
            let batch = Self::parse_export(&html)?;
            debug!("parsed {} messages from {}", batch.len(), path.display());
            messages.extend(batch);
        }

        messages.sort_by_key(|m| m.timestamp);
        info!(
            "read {} messages from {} export files in {}",
            messages.len(),
            paths.len(),
            self.export_dir.display()
        );
        Ok(messages)
    }
}

#[async_trait]
impl MessageFeed for TelegramExportReader {
    async fn fetch(&self) -> Result<Vec<RawMessage>> {
        self.read_all().await
    }
}

/// Collapse the export's embedded newlines and indentation runs
fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"
        <html><body>
        <div class="message" id="message1">
            <div class="date" title="22.01.2023 23:45:12 UTC+01:00">23:45</div>
            <div class="from_name">
                doorwatcher
            </div>
            <div class="text">
                queue is
                2 hours
            </div>
        </div>
        <div class="message service" id="message2">
            <div class="date" title="22.01.2023 23:50:00 UTC+01:00">23:50</div>
            <div class="text">pinned a message</div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_export() {
        let messages = TelegramExportReader::parse_export(EXPORT).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, "doorwatcher");
        assert_eq!(messages[0].text, "queue is 2 hours");
        assert_eq!(messages[0].source, MessageSource::Telegram);
        assert_eq!(
            messages[0].timestamp.to_rfc3339(),
            "2023-01-22T23:45:12+01:00"
        );
    }

    #[test]
    fn test_parse_export_empty_document() {
        let messages = TelegramExportReader::parse_export("<html></html>").unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_read_all_sorts_across_files() {
        let dir = tempfile::tempdir().unwrap();

        let later = EXPORT.replace("22.01.2023", "29.01.2023");
        tokio::fs::write(dir.path().join("messages2.html"), later)
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("messages.html"), EXPORT)
            .await
            .unwrap();

        let reader = TelegramExportReader::new(dir.path());
        let messages = reader.read_all().await.unwrap();

        assert_eq!(messages.len(), 2);
        assert!(messages[0].timestamp < messages[1].timestamp);
    }
}
