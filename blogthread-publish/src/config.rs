//! Configuration for a publishing run

use crate::error::{PublishError, Result};
use crate::thread::ThreadLimits;
use blogthread_text::DEFAULT_MAX_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tracking file location used when none is configured, relative to the site root.
pub const DEFAULT_TRACKING_FILE: &str = ".github/mastodon-published.json";

/// Pause before every reply in a thread.
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_secs(1);

/// Who can see the posted statuses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to everyone and shown in public timelines
    #[default]
    Public,
    /// Visible to everyone but kept out of public timelines
    Unlisted,
    /// Followers only
    Private,
    /// Mentioned users only
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" | "followers" => Ok(Visibility::Private),
            "direct" => Ok(Visibility::Direct),
            _ => Err(format!(
                "Invalid visibility: '{s}'. Valid values are: public, unlisted, private, direct"
            )),
        }
    }
}

/// Everything a publishing run needs to know.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Mastodon instance, e.g. `https://mastodon.social`
    pub instance_url: Option<String>,
    /// Bearer token with `write:statuses` and `write:media`
    pub access_token: Option<String>,
    /// Public URL of the blog, used to build article links
    pub base_url: String,
    /// Hugo `content/` directory
    pub content_dir: PathBuf,
    /// Tracking file, relative to the site root unless absolute
    pub tracking_file: PathBuf,
    pub visibility: Visibility,
    /// Print instead of posting, and never write the tracking file
    pub dry_run: bool,
    /// Maximum segment length handed to the chunker
    pub max_length: usize,
    pub limits: ThreadLimits,
    pub reply_delay: Duration,
}

impl PublisherConfig {
    /// Create a configuration with defaults for everything but the blog location.
    pub fn new(base_url: impl Into<String>, content_dir: impl Into<PathBuf>) -> Self {
        Self {
            instance_url: None,
            access_token: None,
            base_url: base_url.into(),
            content_dir: content_dir.into(),
            tracking_file: PathBuf::from(DEFAULT_TRACKING_FILE),
            visibility: Visibility::default(),
            dry_run: false,
            max_length: DEFAULT_MAX_LENGTH,
            limits: ThreadLimits::default(),
            reply_delay: DEFAULT_REPLY_DELAY,
        }
    }

    /// Set the Mastodon instance and credentials (builder style)
    pub fn with_instance(
        self,
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: Some(instance_url.into()),
            access_token: Some(access_token.into()),
            ..self
        }
    }

    /// Set the tracking file location (builder style)
    pub fn with_tracking_file(self, tracking_file: impl Into<PathBuf>) -> Self {
        Self {
            tracking_file: tracking_file.into(),
            ..self
        }
    }

    /// Set the post visibility (builder style)
    pub fn with_visibility(self, visibility: Visibility) -> Self {
        Self { visibility, ..self }
    }

    /// Enable or disable dry-run mode (builder style)
    pub fn with_dry_run(self, dry_run: bool) -> Self {
        Self { dry_run, ..self }
    }

    /// Set the maximum segment length (builder style)
    pub fn with_max_length(self, max_length: usize) -> Self {
        Self { max_length, ..self }
    }

    /// Set the pause before each reply (builder style)
    pub fn with_reply_delay(self, reply_delay: Duration) -> Self {
        Self {
            reply_delay,
            ..self
        }
    }

    /// The Hugo site root, i.e. the parent of the content directory.
    pub fn site_root(&self) -> &Path {
        self.content_dir.parent().unwrap_or(Path::new(""))
    }

    /// Where the tracking file lives on disk.
    pub fn tracking_path(&self) -> PathBuf {
        self.site_root().join(&self.tracking_file)
    }

    /// Check settings needed for any run that reads content.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(PublishError::invalid_config("blog base URL is required"));
        }
        if !self.content_dir.is_dir() {
            return Err(PublishError::invalid_config(format!(
                "content directory {} does not exist",
                self.content_dir.display()
            )));
        }
        if self.max_length == 0 || self.max_length > self.limits.max_post_length {
            return Err(PublishError::invalid_config(format!(
                "max length must be between 1 and {}",
                self.limits.max_post_length
            )));
        }
        Ok(())
    }

    /// Check settings needed to actually post; dry runs need no credentials.
    pub fn validate_for_posting(&self) -> Result<()> {
        self.validate()?;
        if self.dry_run {
            return Ok(());
        }
        if self.instance_url.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(PublishError::invalid_config("Mastodon instance URL is required"));
        }
        if self.access_token.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(PublishError::invalid_config("Mastodon access token is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_visibility_from_str() {
        assert_eq!("public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!("Unlisted".parse::<Visibility>().unwrap(), Visibility::Unlisted);
        assert_eq!("followers".parse::<Visibility>().unwrap(), Visibility::Private);
        assert_eq!("direct".parse::<Visibility>().unwrap(), Visibility::Direct);
        assert!("everyone".parse::<Visibility>().is_err());
    }

    #[test]
    fn test_visibility_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Visibility::Unlisted).unwrap(), "\"unlisted\"");
        assert_eq!(Visibility::Private.to_string(), "private");
    }

    #[test]
    fn test_defaults() {
        let config = PublisherConfig::new("https://blog.example", "site/content");

        assert_eq!(config.visibility, Visibility::Public);
        assert_eq!(config.max_length, 480);
        assert_eq!(config.limits.max_post_length, 500);
        assert_eq!(config.limits.max_images, 4);
        assert!(!config.dry_run);
        assert_eq!(
            config.tracking_path(),
            PathBuf::from("site/.github/mastodon-published.json")
        );
    }

    #[test]
    fn test_tracking_path_for_bare_content_dir() {
        let config = PublisherConfig::new("https://blog.example", "content");
        assert_eq!(
            config.tracking_path(),
            PathBuf::from(".github/mastodon-published.json")
        );
    }

    #[test]
    fn test_validate_requires_credentials_unless_dry_run() {
        let temp_dir = tempdir().unwrap();
        let content_dir = temp_dir.path().join("content");
        std::fs::create_dir(&content_dir).unwrap();

        let config = PublisherConfig::new("https://blog.example", &content_dir);
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.validate_for_posting(),
            Err(PublishError::InvalidConfig { .. })
        ));

        let dry = config.clone().with_dry_run(true);
        assert!(dry.validate_for_posting().is_ok());

        let live = config.with_instance("https://mastodon.example", "token");
        assert!(live.validate_for_posting().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_content_dir() {
        let config = PublisherConfig::new("https://blog.example", "/definitely/not/here/content");
        assert!(matches!(
            config.validate(),
            Err(PublishError::InvalidConfig { .. })
        ));
    }
}
