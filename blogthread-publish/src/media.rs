//! Turning image references from articles into uploadable files.
//!
//! Hugo articles refer to images in three ways, tried in this order:
//!
//! 1.  Absolute `http(s)` URLs, which are downloaded.
//! 2.  Paths relative to the article (page bundles) or to the site's `static/`
//!     directory, which are read from disk.
//! 3.  Anything else is resolved against the article's public URL and downloaded.
//!
//! In offline mode (dry runs) nothing is downloaded; remote images resolve to an
//! empty placeholder so the would-be upload can still be reported.
use crate::error::{PublishError, Result};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Give up on an image host that does not answer within this time.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest image accepted for upload; Mastodon's default image limit.
pub const MAX_MEDIA_BYTES: u64 = 16 * 1024 * 1024;

/// Image bytes ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl MediaFile {
    /// Where the reference pointed, with bytes left empty.
    fn placeholder(location: &str) -> Self {
        let filename = file_name_of(location);
        Self {
            bytes: Vec::new(),
            content_type: content_type_for(&filename).to_string(),
            filename,
        }
    }
}

/// Guesses a MIME type from a file name's extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

fn file_name_of(location: &str) -> String {
    let path = strip_query(location).trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn strip_query(reference: &str) -> &str {
    reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference)
}

fn too_large() -> String {
    format!("larger than {MAX_MEDIA_BYTES} bytes")
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Finds the bytes behind image references.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    client: reqwest::Client,
    static_dir: PathBuf,
    offline: bool,
}

impl MediaResolver {
    /// Creates a resolver for a Hugo site rooted at `site_root`.
    pub fn new(site_root: &Path) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("blogthread/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            static_dir: site_root.join("static"),
            offline: false,
        })
    }

    /// Never touch the network (builder style)
    pub fn with_offline(self, offline: bool) -> Self {
        Self { offline, ..self }
    }

    /// Resolves `reference` found in the article at `article_dir`, published at
    /// `article_url`.
    pub async fn resolve(
        &self,
        reference: &str,
        article_dir: &Path,
        article_url: &str,
    ) -> Result<MediaFile> {
        if is_remote(reference) {
            return self.download(reference).await;
        }

        let local = self
            .local_candidates(reference, article_dir)
            .into_iter()
            .find(|p| p.is_file());
        if let Some(path) = local {
            let bytes = tokio::fs::read(&path).await?;
            let filename = file_name_of(&path.to_string_lossy());
            tracing::debug!("Resolved {reference} to {}", path.display());
            return Ok(MediaFile {
                content_type: content_type_for(&filename).to_string(),
                filename,
                bytes,
            });
        }

        let url = Url::parse(article_url)
            .and_then(|base| base.join(reference))
            .map_err(|e| PublishError::media(reference, e))?;
        self.download(url.as_str()).await
    }

    fn local_candidates(&self, reference: &str, article_dir: &Path) -> Vec<PathBuf> {
        let relative = strip_query(reference);
        match relative.strip_prefix('/') {
            Some(site_path) => vec![self.static_dir.join(site_path)],
            None => vec![article_dir.join(relative), self.static_dir.join(relative)],
        }
    }

    async fn download(&self, url: &str) -> Result<MediaFile> {
        if self.offline {
            return Ok(MediaFile::placeholder(url));
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::media(
                url,
                format!("download returned {status}"),
            ));
        }

        if response.content_length().is_some_and(|len| len > MAX_MEDIA_BYTES) {
            return Err(PublishError::media(url, too_large()));
        }

        let filename = file_name_of(url);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(&filename).to_string());
        let bytes = response.bytes().await?.to_vec();
        if bytes.len() as u64 > MAX_MEDIA_BYTES {
            return Err(PublishError::media(url, too_large()));
        }

        tracing::debug!("Downloaded {url} ({} bytes)", bytes.len());
        Ok(MediaFile {
            bytes,
            filename,
            content_type,
        })
    }
}
