//! WordPress REST client: content assembly, backdated publish dates, and
//! post creation via `/wp-json/wp/v2/posts`.
use crate::config::{Credential, Wordpress};
use crate::model::{PostRecord, PostStatus};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    /// Clean non-2xx rejection from the create-post endpoint. Recorded in the
    /// ledger as `failed`, never as `error`.
    #[error("wordpress rejected the post ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A created remote post, as far as the pipeline cares about it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatedPost {
    pub id: u64,
}

#[async_trait]
pub trait PublishService: Send + Sync {
    async fn publish(
        &self,
        record: &PostRecord,
        image_urls: &[String],
        status: PostStatus,
    ) -> Result<CreatedPost, PublishError>;
}

#[derive(Clone)]
pub struct WpClient {
    http: Client,
    base_url: Url,
    credential: Credential,
}

impl fmt::Debug for WpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WpClient {
    pub fn from_config(cfg: &Wordpress) -> anyhow::Result<Self> {
        let base_url = Url::parse(cfg.url.trim_end_matches('/'))
            .with_context(|| format!("invalid wordpress.url: {}", cfg.url))?;
        Ok(Self::with_base_url(base_url, cfg.credential()))
    }

    pub fn with_base_url(base_url: Url, credential: Credential) -> Self {
        let http = Client::builder()
            .user_agent("wp-autopost/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            credential,
        }
    }

    pub fn build_request(&self, body: &Value) -> anyhow::Result<reqwest::Request> {
        let mut endpoint = self.base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|()| anyhow!("wordpress.url cannot be a base"))?
            .pop_if_empty()
            .extend(["wp-json", "wp", "v2", "posts"]);
        self.http
            .post(endpoint)
            .basic_auth(self.credential.username(), Some(self.credential.secret()))
            .header("Content-Type", "application/json")
            .json(body)
            .build()
            .context("failed to build wordpress request")
    }

    async fn execute_create(&self, body: Value) -> Result<CreatedPost, PublishError> {
        let request = self.build_request(&body)?;
        info!(url = %request.url(), "creating wordpress post");

        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach wordpress")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(200).collect();
            warn!(status = %status, body = %truncated, "wordpress rejected post");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: truncated,
            });
        }

        let created: CreatedPost = res
            .json()
            .await
            .context("invalid wordpress response JSON")?;
        info!(wp_id = created.id, "created wordpress post");
        Ok(created)
    }
}

#[async_trait]
impl PublishService for WpClient {
    async fn publish(
        &self,
        record: &PostRecord,
        image_urls: &[String],
        status: PostStatus,
    ) -> Result<CreatedPost, PublishError> {
        let content = build_content(&record.title, &record.content, image_urls);
        let date = publish_date(record.number, Utc::now()).ok_or_else(|| {
            anyhow!("publish date out of range for post {}", record.number)
        })?;
        let body = json!({
            "title": record.title,
            "content": content,
            "status": status.as_str(),
            "format": "standard",
            "date": date.format("%Y-%m-%dT%H:%M:%S").to_string(),
        });
        self.execute_create(body).await
    }
}

/// Prepend one scaled image tag per URL before the body, separated by a blank
/// line. No images means the body passes through untouched.
pub fn build_content(title: &str, content: &str, image_urls: &[String]) -> String {
    if image_urls.is_empty() {
        return content.to_string();
    }
    let mut html = String::new();
    for url in image_urls {
        html.push_str(&format!(
            "<img src=\"{url}\" alt=\"{title}\" style=\"max-width: 100%; height: auto; margin: 10px 0;\" />\n"
        ));
    }
    html.push('\n');
    html.push_str(content);
    html
}

/// Post #1 is "today"; larger numbers recede one day per number, so a
/// naturally-ordered archive reads newest-first despite batch-upload order.
/// Returns `None` when the offset would leave the representable date range,
/// which absurdly large post numbers from the source file can reach.
pub fn publish_date(post_number: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::days(i64::from(post_number.saturating_sub(1))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client() -> WpClient {
        WpClient::with_base_url(
            Url::parse("https://blog.example.com").unwrap(),
            Credential::Basic {
                username: "admin".into(),
                password: "pw".into(),
            },
        )
    }

    #[test]
    fn build_content_without_images_is_unchanged() {
        assert_eq!(build_content("T", "plain body", &[]), "plain body");
    }

    #[test]
    fn build_content_prepends_one_tag_per_image() {
        let urls = vec![
            "https://cdn/post_1/1-1.jpg".to_string(),
            "https://cdn/post_1/1-2.jpg".to_string(),
        ];
        let html = build_content("My Title", "body", &urls);
        assert_eq!(html.matches("<img src=").count(), 2);
        assert!(html.starts_with("<img src=\"https://cdn/post_1/1-1.jpg\" alt=\"My Title\""));
        assert!(html.contains("max-width: 100%"));
        assert!(html.ends_with("\n\nbody"));
    }

    #[test]
    fn publish_date_recedes_one_day_per_number() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(publish_date(1, now), Some(now));
        assert_eq!(publish_date(2, now), Some(now - Duration::days(1)));
        assert_eq!(publish_date(31, now), Some(now - Duration::days(30)));
    }

    #[test]
    fn publish_date_out_of_range_is_none_not_a_panic() {
        // 100M days is far past chrono's minimum year.
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        assert_eq!(publish_date(100_000_000, now), None);
        assert_eq!(publish_date(u32::MAX, now), None);
    }

    #[tokio::test]
    async fn pathological_post_number_publishes_as_error_not_panic() {
        let record = PostRecord {
            number: 100_000_000,
            title: "Far past".into(),
            content: "body".into(),
        };
        let err = client()
            .publish(&record, &[], PostStatus::Draft)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Other(_)));
    }

    #[test]
    fn build_request_targets_posts_endpoint_with_basic_auth() {
        let request = client().build_request(&json!({ "sample": true })).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/wp-json/wp/v2/posts");
        let auth = request
            .headers()
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .unwrap();
        assert!(auth.starts_with("Basic "));
    }

    #[test]
    fn build_request_keeps_subdirectory_installs() {
        let client = WpClient::with_base_url(
            Url::parse("https://example.com/blog").unwrap(),
            Credential::Basic {
                username: "u".into(),
                password: "p".into(),
            },
        );
        let request = client.build_request(&json!({})).unwrap();
        assert_eq!(request.url().path(), "/blog/wp-json/wp/v2/posts");
    }
}
