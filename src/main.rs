use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use wp_autopost::batch::{self, BatchRunner, TokioWaiter};
use wp_autopost::config;
use wp_autopost::model::{BatchConfig, PostStatus};
use wp_autopost::parser;
use wp_autopost::sftp::SftpUploader;
use wp_autopost::wordpress::WpClient;

#[derive(Debug, Parser)]
#[command(author, version, about = "Publish delimited text posts to WordPress in paced batches")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "wp_config.yaml")]
    config: PathBuf,

    /// Delimited text file containing the posts
    #[arg(long, default_value = "post.txt")]
    txt_file: PathBuf,

    /// Folder holding images named `<post>-<seq>.<ext>`
    #[arg(long, default_value = "img")]
    img_folder: PathBuf,

    /// First post number to process
    #[arg(long, default_value_t = 1)]
    start: u32,

    /// Last post number to process (default: highest parsed number)
    #[arg(long)]
    end: Option<u32>,

    /// Status for created posts
    #[arg(long, value_enum, default_value_t = PostStatus::Draft)]
    status: PostStatus,

    /// Posts per batch
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Seconds to pause between batches
    #[arg(long, default_value_t = 30)]
    batch_delay: u64,

    /// Seconds to pause between posts within a batch
    #[arg(long, default_value_t = 5)]
    post_delay: u64,

    /// Directory the ledger file is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    // Configuration problems abort here, before any processing and before a
    // ledger exists.
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    let text = std::fs::read_to_string(&args.txt_file)
        .with_context(|| format!("failed to read {}", args.txt_file.display()))?;
    let records = parser::parse_posts(&text);
    info!(posts = records.len(), file = %args.txt_file.display(), "parsed source file");

    let publisher = Arc::new(WpClient::from_config(&cfg.wordpress)?);
    let store = Arc::new(SftpUploader::from_config(&cfg.sftp)?);
    let runner = BatchRunner::new(
        publisher,
        store,
        Arc::new(TokioWaiter),
        args.img_folder.clone(),
        BatchConfig {
            batch_size: args.batch_size.max(1),
            post_delay: Duration::from_secs(args.post_delay),
            batch_delay: Duration::from_secs(args.batch_delay),
        },
    );

    let ledger = runner
        .run(&records, args.start, args.end, args.status)
        .await;

    if !ledger.is_empty() {
        let path = batch::write_ledger(&ledger, &args.out_dir)?;
        info!(path = %path.display(), "ledger written");
    }
    batch::log_summary(&ledger);

    Ok(())
}
