//! Summaries of a publishing run.
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One article that was posted during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArticle {
    pub identifier: String,
    pub title: String,
    pub url: String,
    /// Ids of the posts in thread order; the first is the root
    pub post_ids: Vec<String>,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub published: Vec<PublishedArticle>,
    /// Images that could not be resolved or uploaded and were left out
    pub skipped_images: usize,
    pub dry_run: bool,
}

impl RunReport {
    pub fn published_count(&self) -> usize {
        self.published.len()
    }

    pub fn post_count(&self) -> usize {
        self.published.iter().map(|a| a.post_ids.len()).sum()
    }
}

/// Appends `name=value` to a GitHub Actions output file.
pub fn append_github_output(
    path: &Path,
    name: &str,
    value: impl std::fmt::Display,
) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{name}={value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_github_output_keeps_existing_lines() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("output");
        std::fs::write(&path, "other=1\n").unwrap();

        append_github_output(&path, "posts_published", 3).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "other=1\nposts_published=3\n"
        );
    }

    #[test]
    fn test_counts() {
        let report = RunReport {
            published: vec![
                PublishedArticle {
                    identifier: "content/a.md".to_string(),
                    title: "A".to_string(),
                    url: "https://b/a/".to_string(),
                    post_ids: vec!["1".to_string(), "2".to_string()],
                },
                PublishedArticle {
                    identifier: "content/b.md".to_string(),
                    title: "B".to_string(),
                    url: "https://b/b/".to_string(),
                    post_ids: vec!["3".to_string()],
                },
            ],
            skipped_images: 0,
            dry_run: false,
        };
        assert_eq!(report.published_count(), 2);
        assert_eq!(report.post_count(), 3);
    }
}
