use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One article extracted from the delimited source text. Immutable once
/// parsed; `number` drives both image lookup and the backdated publish date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub number: u32,
    pub title: String,
    pub content: String,
}

/// A local image file belonging to one post, discovered by naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImageRef {
    pub path: PathBuf,
    pub post_number: u32,
    pub sequence: u32,
}

/// Target status for created posts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Publish,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Publish => "publish",
        }
    }
}

/// Outcome of processing one record. `Failed` is a clean rejection from the
/// publish API; `Error` is an unexpected failure caught at the record
/// boundary. The serde tag makes the ledger JSON carry a `status` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success { wp_id: u64 },
    Failed,
    Error { error: String },
}

/// One ledger entry. Every record that enters batch processing yields exactly
/// one of these, whatever happened along the way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishResult {
    pub post_number: u32,
    pub title: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_count: Option<usize>,
    pub processed_at: DateTime<Utc>,
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

/// Pacing parameters for a batch run. Mutable only before the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub post_delay: Duration,
    pub batch_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            post_delay: Duration::from_secs(5),
            batch_delay: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_entry_serializes_flat_status() {
        let entry = PublishResult {
            post_number: 3,
            title: "Hello".into(),
            outcome: Outcome::Success { wp_id: 42 },
            images_count: Some(2),
            processed_at: Utc::now(),
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["wp_id"], 42);
        assert_eq!(v["images_count"], 2);
        assert_eq!(v["post_number"], 3);
    }

    #[test]
    fn error_entry_carries_message_and_no_images_count() {
        let entry = PublishResult {
            post_number: 7,
            title: "Broken".into(),
            outcome: Outcome::Error {
                error: "boom".into(),
            },
            images_count: None,
            processed_at: Utc::now(),
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["error"], "boom");
        assert!(v.get("images_count").is_none());
        assert!(v.get("wp_id").is_none());
    }

    #[test]
    fn failed_entry_has_no_wp_id() {
        let entry = PublishResult {
            post_number: 1,
            title: "Nope".into(),
            outcome: Outcome::Failed,
            images_count: Some(0),
            processed_at: Utc::now(),
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["status"], "failed");
        assert!(v.get("wp_id").is_none());
    }

    #[test]
    fn status_strings() {
        assert_eq!(PostStatus::Draft.as_str(), "draft");
        assert_eq!(PostStatus::Publish.as_str(), "publish");
    }
}
