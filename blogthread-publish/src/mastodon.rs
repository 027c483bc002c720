//! Posting services: the Mastodon REST API and a dry-run stand-in.
use crate::config::Visibility;
use crate::error::{PublishError, Result};
use crate::media::MediaFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How often to ask whether an asynchronously processed upload is ready.
const MEDIA_POLL_INTERVAL: Duration = Duration::from_millis(500);
const MEDIA_POLL_ATTEMPTS: usize = 20;

/// Something that can publish statuses and attach media to them
#[async_trait]
pub trait PostingService: Send + Sync {
    /// Publish a status, optionally as a reply, and return its id
    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
        media_ids: &[String],
        visibility: Visibility,
    ) -> Result<String>;

    /// Upload an attachment and return its media id
    async fn upload_media(&self, media: &MediaFile) -> Result<String>;

    /// Get the name of this service for logging
    fn service_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    status: &'a str,
    visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to_id: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    media_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

/// Client for a single Mastodon account.
pub struct MastodonClient {
    instance_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for MastodonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonClient")
            .field("instance_url", &self.instance_url)
            .finish_non_exhaustive()
    }
}

impl MastodonClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("blogthread/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.instance_url)
    }

    /// Turns a non-success response into [`PublishError::Api`] carrying its body.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Waits until the server has finished processing an upload.
    async fn wait_for_media(&self, id: &str) -> Result<()> {
        for _ in 0..MEDIA_POLL_ATTEMPTS {
            tokio::time::sleep(MEDIA_POLL_INTERVAL).await;

            let response = self
                .client
                .get(self.endpoint(&format!("/api/v1/media/{id}")))
                .bearer_auth(&self.access_token)
                .send()
                .await?;
            // 206 Partial Content: still processing
            if response.status() == reqwest::StatusCode::PARTIAL_CONTENT {
                continue;
            }
            let media: MediaResponse = Self::check(response).await?.json().await?;
            if media.url.is_some() {
                return Ok(());
            }
        }
        tracing::warn!("Media {id} still processing, attaching anyway");
        Ok(())
    }
}

#[async_trait]
impl PostingService for MastodonClient {
    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
        media_ids: &[String],
        visibility: Visibility,
    ) -> Result<String> {
        let request = StatusRequest {
            status: text,
            visibility,
            in_reply_to_id: reply_to,
            media_ids,
        };

        let response = self
            .client
            .post(self.endpoint("/api/v1/statuses"))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;
        let status: StatusResponse = Self::check(response).await?.json().await?;

        Ok(status.id)
    }

    async fn upload_media(&self, media: &MediaFile) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(media.bytes.clone())
            .file_name(media.filename.clone())
            .mime_str(&media.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("/api/v2/media"))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;
        let processing = response.status() == reqwest::StatusCode::ACCEPTED;
        let uploaded: MediaResponse = Self::check(response).await?.json().await?;

        if processing || uploaded.url.is_none() {
            self.wait_for_media(&uploaded.id).await?;
        }
        Ok(uploaded.id)
    }

    fn service_name(&self) -> &str {
        "mastodon"
    }
}

/// Prints what would be posted and hands out placeholder ids.
#[derive(Debug, Default)]
pub struct DryRunClient {
    posts: AtomicUsize,
    uploads: AtomicUsize,
}

impl DryRunClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostingService for DryRunClient {
    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
        media_ids: &[String],
        visibility: Visibility,
    ) -> Result<String> {
        let id = format!("dry-run-{}", self.posts.fetch_add(1, Ordering::SeqCst) + 1);
        match reply_to {
            Some(parent) => println!("  [DRY RUN] Reply to {parent} as {id} ({visibility}):"),
            None => println!("  [DRY RUN] Post {id} ({visibility}):"),
        }
        for line in text.lines() {
            println!("    | {line}");
        }
        if !media_ids.is_empty() {
            println!("    media: {}", media_ids.join(", "));
        }
        Ok(id)
    }

    async fn upload_media(&self, media: &MediaFile) -> Result<String> {
        let id = format!(
            "dry-run-media-{}",
            self.uploads.fetch_add(1, Ordering::SeqCst) + 1
        );
        println!(
            "  [DRY RUN] Upload {} ({}) as {id}",
            media.filename, media.content_type
        );
        Ok(id)
    }

    fn service_name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_request_shape() {
        let media = vec!["m1".to_string()];
        let request = StatusRequest {
            status: "Hello",
            visibility: Visibility::Unlisted,
            in_reply_to_id: Some("42"),
            media_ids: &media,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "Hello",
                "visibility": "unlisted",
                "in_reply_to_id": "42",
                "media_ids": ["m1"],
            })
        );
    }

    #[test]
    fn test_status_request_omits_empty_fields() {
        let request = StatusRequest {
            status: "Root",
            visibility: Visibility::Public,
            in_reply_to_id: None,
            media_ids: &[],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "Root", "visibility": "public" })
        );
    }

    #[test]
    fn test_media_response_tolerates_null_url() {
        let media: MediaResponse =
            serde_json::from_str(r#"{"id": "7", "type": "image", "url": null}"#).unwrap();
        assert_eq!(media.id, "7");
        assert!(media.url.is_none());
    }

    #[test]
    fn test_client_trims_instance_slash() {
        let client = MastodonClient::new("https://mastodon.example/", "token").unwrap();
        assert_eq!(
            client.endpoint("/api/v1/statuses"),
            "https://mastodon.example/api/v1/statuses"
        );
    }

    #[tokio::test]
    async fn test_dry_run_ids_are_sequential() {
        let client = DryRunClient::new();
        let first = client
            .create_post("a", None, &[], Visibility::Public)
            .await
            .unwrap();
        let second = client
            .create_post("b", Some(&first), &[], Visibility::Public)
            .await
            .unwrap();
        let media = client
            .upload_media(&MediaFile {
                bytes: Vec::new(),
                filename: "x.png".to_string(),
                content_type: "image/png".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(first, "dry-run-1");
        assert_eq!(second, "dry-run-2");
        assert_eq!(media, "dry-run-media-1");
        assert_eq!(client.service_name(), "dry-run");
    }
}
