//! Maintenance utility operating directly on the WordPress post store:
//! statistics, JSON backups, bulk status updates, and pattern deletion.
use anyhow::{bail, Context, Result};
use chrono::{NaiveDateTime, Utc};
use clap::Parser;
use serde::Serialize;
use sqlx::mysql::MySqlPool;
use std::path::PathBuf;
use tracing::{info, warn};

use wp_autopost::config;
use wp_autopost::model::PostStatus;

#[derive(Debug, Parser)]
#[command(author, version, about = "WordPress post store maintenance")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "wp_config.yaml")]
    config: PathBuf,

    /// Show counts by status and the most recent posts
    #[arg(long)]
    stats: bool,

    /// Back up all posts to a JSON file (optional path)
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    backup: Option<String>,

    /// Delete posts whose title contains this pattern (dry run without --yes)
    #[arg(long)]
    delete_pattern: Option<String>,

    /// List/delete auto-generated posts, i.e. titles starting with "<digits>."
    /// (dry run without --yes)
    #[arg(long)]
    clean: bool,

    /// Set the status of the posts given by --ids
    #[arg(long, value_enum)]
    set_status: Option<PostStatus>,

    /// Post IDs for --set-status
    #[arg(long, num_args = 1..)]
    ids: Vec<u64>,

    /// Actually perform destructive operations instead of listing them
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct PostRow {
    #[sqlx(rename = "ID")]
    id: u64,
    post_title: String,
    post_status: String,
    post_type: String,
    post_date: NaiveDateTime,
}

async fn show_stats(pool: &MySqlPool) -> Result<()> {
    let by_status: Vec<(String, i64)> = sqlx::query_as(
        "SELECT post_status, COUNT(*) FROM wp_posts WHERE post_type = 'post' GROUP BY post_status",
    )
    .fetch_all(pool)
    .await?;
    for (status, count) in &by_status {
        info!(status = %status, count, "posts by status");
    }

    let recent: Vec<(String, NaiveDateTime, String)> = sqlx::query_as(
        "SELECT post_title, post_date, post_status FROM wp_posts \
         WHERE post_type = 'post' ORDER BY post_date DESC LIMIT 10",
    )
    .fetch_all(pool)
    .await?;
    for (title, date, status) in &recent {
        info!(title = %title, date = %date, status = %status, "recent post");
    }
    Ok(())
}

async fn backup_posts(pool: &MySqlPool, filename: &str) -> Result<()> {
    let posts: Vec<PostRow> = sqlx::query_as(
        "SELECT ID, post_title, post_status, post_type, post_date FROM wp_posts \
         WHERE post_type = 'post' ORDER BY post_date DESC",
    )
    .fetch_all(pool)
    .await?;

    if posts.is_empty() {
        warn!("nothing to back up");
        return Ok(());
    }

    let filename = if filename.is_empty() {
        format!("wp_posts_backup_{}.json", Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        filename.to_string()
    };
    std::fs::write(&filename, serde_json::to_string_pretty(&posts)?)
        .with_context(|| format!("failed to write {filename}"))?;
    info!(posts = posts.len(), file = %filename, "backup written");
    Ok(())
}

async fn delete_by_pattern(pool: &MySqlPool, pattern: &str, yes: bool) -> Result<()> {
    let like = format!("%{pattern}%");
    let matches: Vec<(u64, String)> =
        sqlx::query_as("SELECT ID, post_title FROM wp_posts WHERE post_title LIKE ?")
            .bind(&like)
            .fetch_all(pool)
            .await?;

    if matches.is_empty() {
        info!(pattern = %pattern, "no posts match");
        return Ok(());
    }
    for (id, title) in &matches {
        info!(id, title = %title, "matched for deletion");
    }
    if !yes {
        warn!(matched = matches.len(), "dry run; pass --yes to delete");
        return Ok(());
    }

    let deleted = sqlx::query("DELETE FROM wp_posts WHERE post_title LIKE ?")
        .bind(&like)
        .execute(pool)
        .await?
        .rows_affected();
    info!(deleted, "posts deleted");
    Ok(())
}

/// Posts created by the pipeline keep their `"<digits>. "` title prefix, which
/// is what this matches on.
async fn clean_auto_posts(pool: &MySqlPool, yes: bool) -> Result<()> {
    let auto_posts: Vec<(u64, String, String, NaiveDateTime)> = sqlx::query_as(
        "SELECT ID, post_title, post_status, post_date FROM wp_posts \
         WHERE post_type = 'post' AND post_title REGEXP '^[0-9]+\\\\.' \
         ORDER BY post_date DESC",
    )
    .fetch_all(pool)
    .await?;

    if auto_posts.is_empty() {
        info!("no auto-generated posts found");
        return Ok(());
    }
    for (id, title, status, date) in &auto_posts {
        info!(id, title = %title, status = %status, date = %date, "auto-generated post");
    }
    if !yes {
        warn!(found = auto_posts.len(), "dry run; pass --yes to delete");
        return Ok(());
    }

    let mut deleted = 0u64;
    for (id, _, _, _) in &auto_posts {
        deleted += sqlx::query("DELETE FROM wp_posts WHERE ID = ?")
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
    }
    info!(deleted, "auto-generated posts deleted");
    Ok(())
}

async fn set_status(pool: &MySqlPool, ids: &[u64], status: PostStatus) -> Result<()> {
    if ids.is_empty() {
        bail!("--set-status requires --ids");
    }
    let mut updated = 0u64;
    for id in ids {
        updated += sqlx::query("UPDATE wp_posts SET post_status = ? WHERE ID = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
    }
    info!(updated, status = status.as_str(), "post status updated");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let Some(db) = cfg.database else {
        bail!("config has no database section");
    };

    let pool = MySqlPool::connect(&db.url())
        .await
        .context("failed to connect to the post store")?;

    let mut acted = false;
    if args.stats {
        show_stats(&pool).await?;
        acted = true;
    }
    if let Some(filename) = &args.backup {
        backup_posts(&pool, filename).await?;
        acted = true;
    }
    if let Some(pattern) = &args.delete_pattern {
        delete_by_pattern(&pool, pattern, args.yes).await?;
        acted = true;
    }
    if args.clean {
        clean_auto_posts(&pool, args.yes).await?;
        acted = true;
    }
    if let Some(status) = args.set_status {
        set_status(&pool, &args.ids, status).await?;
        acted = true;
    }

    if !acted {
        warn!("no action requested; see --help");
    }
    Ok(())
}
