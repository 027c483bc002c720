//! Error types for the publishing pipeline

use std::path::PathBuf;

/// Result type for publishing operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Error type for everything that can go wrong while publishing a blog.
///
/// The variants map onto how the run reacts to them:
///
/// - **Configuration errors** abort before any work is done.
/// - **Content parse errors** skip the offending article.
/// - **Media errors** drop the affected image from its post.
/// - **API and HTTP errors** on a post abort the run.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// A required setting is missing or invalid
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An article's source could not be parsed
    #[error("Could not parse {}: {message}", path.display())]
    ContentParse { path: PathBuf, message: String },

    /// An image reference could not be turned into uploadable bytes
    #[error("Could not resolve media {reference}: {message}")]
    MediaResolution { reference: String, message: String },

    /// The Mastodon API answered with a non-success status
    #[error("Mastodon API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level HTTP failures
    #[error("HTTP request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// IO errors reading content or writing the tracking file
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Malformed tracking file or API payload
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl PublishError {
    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a content parse error for the article at `path`.
    pub fn content_parse<P: Into<PathBuf>, S: ToString>(path: P, message: S) -> Self {
        Self::ContentParse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a media resolution error for an image reference.
    pub fn media<R: Into<String>, S: ToString>(reference: R, message: S) -> Self {
        Self::MediaResolution {
            reference: reference.into(),
            message: message.to_string(),
        }
    }
}
