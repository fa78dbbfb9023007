//! Batch scheduler: drives image resolution, uploads, and post creation over
//! a filtered range of records in fixed-size paced groups, and aggregates a
//! per-record ledger.
use crate::images;
use crate::model::{BatchConfig, Outcome, PostRecord, PostStatus, PublishResult};
use crate::sftp::AssetStore;
use crate::wordpress::{PublishError, PublishService};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pacing capability, injectable so tests can run without real delays.
#[async_trait]
pub trait Waiter: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Production waiter backed by the tokio timer.
pub struct TokioWaiter;

#[async_trait]
impl Waiter for TokioWaiter {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct BatchRunner {
    publisher: Arc<dyn PublishService>,
    store: Arc<dyn AssetStore>,
    waiter: Arc<dyn Waiter>,
    image_folder: PathBuf,
    cfg: BatchConfig,
}

impl BatchRunner {
    /// `batch_size` is clamped to at least 1 so the grouping arithmetic is
    /// always well defined.
    pub fn new(
        publisher: Arc<dyn PublishService>,
        store: Arc<dyn AssetStore>,
        waiter: Arc<dyn Waiter>,
        image_folder: PathBuf,
        cfg: BatchConfig,
    ) -> Self {
        let cfg = BatchConfig {
            batch_size: cfg.batch_size.max(1),
            ..cfg
        };
        Self {
            publisher,
            store,
            waiter,
            image_folder,
            cfg,
        }
    }

    /// Process every record with `number` in `[start, end ?? max]`, in source
    /// order, in groups of `batch_size` separated by pauses. Every record
    /// that enters processing yields exactly one ledger entry; no per-record
    /// failure aborts the run.
    pub async fn run(
        &self,
        records: &[PostRecord],
        start: u32,
        end: Option<u32>,
        status: PostStatus,
    ) -> Vec<PublishResult> {
        let Some(end) = end.or_else(|| records.iter().map(|r| r.number).max()) else {
            return Vec::new();
        };
        let filtered: Vec<&PostRecord> = records
            .iter()
            .filter(|r| r.number >= start && r.number <= end)
            .collect();
        if filtered.is_empty() {
            info!("no posts to process");
            return Vec::new();
        }

        let total_batches = filtered.len().div_ceil(self.cfg.batch_size);
        info!(
            posts = filtered.len(),
            batch_size = self.cfg.batch_size,
            batches = total_batches,
            estimated_minutes = estimated_minutes(filtered.len(), &self.cfg),
            "starting batch run"
        );

        let mut ledger = Vec::with_capacity(filtered.len());
        for (batch_index, group) in filtered.chunks(self.cfg.batch_size).enumerate() {
            if batch_index > 0 {
                info!(
                    seconds = self.cfg.batch_delay.as_secs(),
                    "waiting before next batch"
                );
                self.waiter.wait(self.cfg.batch_delay).await;
            }
            info!(
                batch = batch_index + 1,
                total = total_batches,
                first = group.first().map(|r| r.number),
                last = group.last().map(|r| r.number),
                "processing batch"
            );

            for (record_index, record) in group.iter().enumerate() {
                if record_index > 0 {
                    self.waiter.wait(self.cfg.post_delay).await;
                }
                ledger.push(self.process_record(record, status).await);
            }
        }

        ledger
    }

    /// Record-boundary failure isolation: anything unexpected becomes an
    /// `error` entry, a clean API rejection becomes `failed`, and processing
    /// continues either way.
    async fn process_record(&self, record: &PostRecord, status: PostStatus) -> PublishResult {
        info!(post = record.number, title = %record.title, "processing post");
        let (outcome, images_count) = match self.try_publish(record, status).await {
            Ok((outcome, count)) => (outcome, Some(count)),
            Err(err) => {
                warn!(post = record.number, error = %format!("{err:#}"), "post processing error");
                (
                    Outcome::Error {
                        error: format!("{err:#}"),
                    },
                    None,
                )
            }
        };
        PublishResult {
            post_number: record.number,
            title: record.title.clone(),
            outcome,
            images_count,
            processed_at: Utc::now(),
        }
    }

    async fn try_publish(
        &self,
        record: &PostRecord,
        status: PostStatus,
    ) -> Result<(Outcome, usize)> {
        let local_images = images::images_for(record.number, &self.image_folder)?;

        let mut urls = Vec::new();
        for image in &local_images {
            info!(post = record.number, path = %image.path.display(), "uploading image");
            // A failed upload drops the image from the post, nothing more.
            if let Some(url) = self.store.upload(&image.path, record.number).await {
                urls.push(url);
            }
        }
        let uploaded = urls.len();

        match self.publisher.publish(record, &urls, status).await {
            Ok(created) => {
                info!(post = record.number, wp_id = created.id, "post created");
                Ok((Outcome::Success { wp_id: created.id }, uploaded))
            }
            Err(PublishError::Rejected { status, .. }) => {
                warn!(post = record.number, status, "post rejected");
                Ok((Outcome::Failed, uploaded))
            }
            Err(PublishError::Other(err)) => Err(err),
        }
    }
}

/// Rough duration estimate for the operator, assuming ~30s of work per post
/// plus the configured pauses.
pub fn estimated_minutes(total_posts: usize, cfg: &BatchConfig) -> f64 {
    let batches = total_posts.div_ceil(cfg.batch_size);
    let work = total_posts as u64 * 30;
    let post_delays = total_posts.saturating_sub(1) as u64 * cfg.post_delay.as_secs();
    let batch_delays = batches.saturating_sub(1) as u64 * cfg.batch_delay.as_secs();
    ((work + post_delays + batch_delays) as f64 / 60.0 * 10.0).round() / 10.0
}

/// Write the ledger as a timestamped pretty-printed JSON array and return the
/// file path.
pub fn write_ledger(ledger: &[PublishResult], out_dir: &Path) -> Result<PathBuf> {
    let filename = format!("batch_results_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
    let path = out_dir.join(filename);
    let json = serde_json::to_string_pretty(ledger).context("failed to serialize ledger")?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write ledger to {}", path.display()))?;
    Ok(path)
}

/// Aggregate counts over a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_ledger(ledger: &[PublishResult]) -> Self {
        let mut summary = Summary {
            total: ledger.len(),
            success: 0,
            failed: 0,
            error: 0,
        };
        for entry in ledger {
            match entry.outcome {
                Outcome::Success { .. } => summary.success += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Error { .. } => summary.error += 1,
            }
        }
        summary
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.success as f64 / self.total as f64 * 100.0
    }
}

/// Log the aggregate counts and enumerate every non-success entry.
pub fn log_summary(ledger: &[PublishResult]) {
    let summary = Summary::from_ledger(ledger);
    info!(
        total = summary.total,
        success = summary.success,
        failed = summary.failed,
        error = summary.error,
        success_rate = format!("{:.1}%", summary.success_rate()),
        "batch run complete"
    );
    for entry in ledger.iter().filter(|e| !e.is_success()) {
        warn!(
            post = entry.post_number,
            title = %entry.title,
            status = match &entry.outcome {
                Outcome::Failed => "failed",
                _ => "error",
            },
            "post did not succeed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(number: u32, outcome: Outcome) -> PublishResult {
        PublishResult {
            post_number: number,
            title: format!("Post {number}"),
            outcome,
            images_count: Some(0),
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn summary_counts_each_status_separately() {
        let ledger = vec![
            entry(1, Outcome::Success { wp_id: 10 }),
            entry(2, Outcome::Failed),
            entry(3, Outcome::Error { error: "x".into() }),
            entry(4, Outcome::Success { wp_id: 11 }),
        ];
        let summary = Summary::from_ledger(&ledger);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.error, 1);
        assert!((summary.success_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_summary_has_zero_rate() {
        let summary = Summary::from_ledger(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate(), 0.0);
    }

    #[test]
    fn estimate_accounts_for_pauses() {
        let cfg = BatchConfig {
            batch_size: 5,
            post_delay: Duration::from_secs(5),
            batch_delay: Duration::from_secs(30),
        };
        // 10 posts: 300s work + 45s post delays + 30s batch delay = 375s
        assert!((estimated_minutes(10, &cfg) - 6.3).abs() < 0.01);
        assert_eq!(estimated_minutes(0, &cfg), 0.0);
    }

    #[test]
    fn ledger_file_is_written_as_json_array() {
        let td = tempfile::tempdir().unwrap();
        let ledger = vec![entry(1, Outcome::Success { wp_id: 7 })];
        let path = write_ledger(&ledger, td.path()).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["status"], "success");
        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("batch_results_"));
    }
}
