use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{parse_export_timestamp, MessageFeed, MessageSource, RawMessage};

/// One archived entry from a subreddit dump: either a submission title or
/// a comment beneath one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditEntry {
    pub body: String,
    pub datetime: String,
    #[serde(default)]
    pub ups: i64,
    #[serde(default)]
    pub downs: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Reader for archived subreddit threads (JSON dumps)
///
/// Keeps only queue-related submissions and drops the usual bot and
/// moderation noise; the live download path is out of scope, the dumps
/// are produced by an external downloader.
pub struct RedditDumpReader {
    path: PathBuf,
    /// Bodies containing any of these are discarded
    blacklist: Vec<String>,
}

impl RedditDumpReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            blacklist: vec![
                "I am a bot",
                "cancellato",
                "rimosso",
                "removed",
                "deleted",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    /// Convert dump entries into crowd reports. Titles must mention the
    /// queue; comments ride along with their thread.
    pub fn convert_entries(&self, entries: &[RedditEntry]) -> Vec<RawMessage> {
        let mut messages = Vec::new();

        for entry in entries {
            if entry.body.is_empty() {
                continue;
            }
            if self.blacklist.iter().any(|term| entry.body.contains(term)) {
                continue;
            }
            if entry.kind == "title" && !entry.body.to_lowercase().contains("queue") {
                continue;
            }

            let timestamp = match parse_export_timestamp(&entry.datetime) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("skipping reddit entry {}: {}", entry.id, e);
                    continue;
                }
            };

            messages.push(RawMessage {
                sender: entry.id.clone(),
                text: entry.body.clone(),
                timestamp,
                source: MessageSource::Reddit,
            });
        }

        messages
    }

    pub async fn read_all(&self) -> Result<Vec<RawMessage>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let entries: Vec<RedditEntry> = serde_json::from_str(&content)?;
        debug!("loaded {} dump entries", entries.len());

        let mut messages = self.convert_entries(&entries);
        messages.sort_by_key(|m| m.timestamp);
        info!(
            "read {} reddit messages from {}",
            messages.len(),
            self.path.display()
        );
        Ok(messages)
    }
}

#[async_trait]
impl MessageFeed for RedditDumpReader {
    async fn fetch(&self) -> Result<Vec<RawMessage>> {
        self.read_all().await
    }
}
