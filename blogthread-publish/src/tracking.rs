//! The set of articles already posted, persisted between runs.
//!
//! The tracking file is a small JSON document:
//!
//! ```json
//! {
//!   "published": [
//!     "content/posts/first/index.md",
//!     "content/posts/second.md"
//!   ]
//! }
//! ```
//!
//! It is read once at startup. After every fully posted article the whole set is
//! written again through a temporary file and a rename, so a crash mid-write
//! leaves the previous version intact.
use crate::content::Article;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrackingFile {
    #[serde(default)]
    published: Vec<String>,
}

/// Identifiers of published articles, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedSet {
    ids: BTreeSet<String>,
}

impl PublishedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the set from `path`; a missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No tracking file at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let file: TrackingFile = serde_json::from_str(&data)?;
        Ok(Self {
            ids: file.published.into_iter().collect(),
        })
    }

    /// Atomically replaces the file at `path` with this set.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let file = TrackingFile {
            published: self.ids.iter().cloned().collect(),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, &file)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        tracing::debug!("Saved {} published ids to {}", self.ids.len(), path.display());
        Ok(())
    }

    /// Returns the set with `identifier` added.
    pub fn with(mut self, identifier: impl Into<String>) -> Self {
        self.ids.insert(identifier.into());
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.ids.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Keeps only the articles not yet published, preserving their order.
    pub fn unpublished(&self, articles: Vec<Article>) -> Vec<Article> {
        articles
            .into_iter()
            .filter(|article| !self.contains(&article.identifier))
            .collect()
    }
}
