//! Reading Hugo articles marked for Mastodon.
//!
//! Articles are Markdown files anywhere below the content directory with YAML
//! (`---`) or TOML (`+++`) front matter. Only articles whose front matter sets
//! `mastodon: true` are picked up. The front matter keys understood here are:
//!
//! | key               | meaning                                            |
//! |-------------------|----------------------------------------------------|
//! | `title`           | post title, `Untitled` when missing                |
//! | `mastodon`        | opt-in flag                                        |
//! | `mastodon_text`   | short teaser placed between title and link         |
//! | `mastodon_thread` | post the whole article as a thread (default true)  |
//! | `featured_image`  | image attached to the first post (`image` also ok) |
//! | `draft`           | drafts are never published                         |
//!
//! Each article is identified by its path relative to the site root, e.g.
//! `content/tech/post/index.md`. That identifier is what the tracking file
//! stores, so it must stay stable between runs.
use crate::error::{PublishError, Result};
use blogthread_text::{ImageRef, extract_image_refs};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

/// An article eligible for posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Site-root-relative path with `/` separators
    pub identifier: String,
    /// Where the Markdown file was read from
    pub source_path: PathBuf,
    pub title: String,
    /// Markdown body without front matter
    pub body: String,
    /// Images in the body, offsets measured against `body`
    pub images: Vec<ImageRef>,
    pub featured_image: Option<String>,
    pub short_text: Option<String>,
    pub full_thread: bool,
}

impl Article {
    /// Directory the article lives in; page-bundle images are relative to it.
    pub fn directory(&self) -> &Path {
        self.source_path.parent().unwrap_or(Path::new(""))
    }

    /// Public URL of the article below `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        blog_url(base_url, &self.identifier)
    }
}

/// Maps an article identifier to its public URL.
///
/// `content/tech/post/index.md` and `content/tech/post.md` both become
/// `{base_url}/tech/post/`.
pub fn blog_url(base_url: &str, identifier: &str) -> String {
    let path = identifier.strip_prefix("content/").unwrap_or(identifier);
    let (dir, file_name) = path.rsplit_once('/').unwrap_or(("", path));
    let path = match file_name {
        "index.md" | "_index.md" if dir.is_empty() => String::new(),
        "index.md" | "_index.md" => format!("{dir}/"),
        _ => match path.strip_suffix(".md") {
            Some(stem) => format!("{stem}/"),
            None => path.to_string(),
        },
    };
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn normalize_line_endings(source: &str) -> String {
    source.replace("\r\n", "\n").replace('\r', "\n")
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    #[serde(default)]
    mastodon: bool,
    mastodon_text: Option<String>,
    mastodon_thread: Option<bool>,
    featured_image: Option<String>,
    image: Option<String>,
    #[serde(default)]
    draft: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrontMatterFormat {
    Yaml,
    Toml,
}

impl FrontMatterFormat {
    fn from_delimiter(line: &str) -> Option<Self> {
        match line.trim_end() {
            "---" => Some(Self::Yaml),
            "+++" => Some(Self::Toml),
            _ => None,
        }
    }

    fn delimiter(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Splits a source file into front matter and body.
///
/// Returns `Ok(None)` when the file has no front matter at all.
fn split_front_matter(
    source: &str,
) -> std::result::Result<Option<(FrontMatterFormat, &str, &str)>, String> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut lines = source.split_inclusive('\n');

    let Some(format) = lines.next().and_then(FrontMatterFormat::from_delimiter) else {
        return Ok(None);
    };

    let matter_start = source.find('\n').map_or(source.len(), |i| i + 1);
    let mut position = matter_start;
    for line in lines {
        if line.trim_end() == format.delimiter() {
            let matter = &source[matter_start..position];
            let body = &source[position + line.len()..];
            return Ok(Some((format, matter, body)));
        }
        position += line.len();
    }

    Err(format!(
        "front matter opened with {} is never closed",
        format.delimiter()
    ))
}

fn parse_front_matter(
    format: FrontMatterFormat,
    matter: &str,
) -> std::result::Result<FrontMatter, String> {
    if matter.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    match format {
        FrontMatterFormat::Yaml => serde_yaml::from_str(matter).map_err(|e| e.to_string()),
        FrontMatterFormat::Toml => toml::from_str(matter).map_err(|e| e.to_string()),
    }
}

/// Finds articles in a Hugo content directory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    content_dir: PathBuf,
    site_root: PathBuf,
}

impl ContentStore {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        let content_dir = content_dir.into();
        let site_root = content_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            content_dir,
            site_root,
        }
    }

    /// Loads every article marked for Mastodon, ordered by identifier.
    ///
    /// Files that cannot be read or parsed are skipped with a warning so one
    /// broken article never blocks the others.
    pub fn find_articles(&self) -> Vec<Article> {
        let mut articles = Vec::new();

        for entry in ignore::Walk::new(&self.content_dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_some_and(|t| t.is_file())
                || path.extension().and_then(|ext| ext.to_str()) != Some("md")
            {
                continue;
            }

            match self.load_article(path) {
                Ok(Some(article)) => articles.push(article),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping article: {e}"),
            }
        }

        articles.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        tracing::debug!(
            "Found {} articles marked for Mastodon in {}",
            articles.len(),
            self.content_dir.display()
        );
        articles
    }

    /// Reads and parses one Markdown file.
    pub fn load_article(&self, path: &Path) -> Result<Option<Article>> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| PublishError::content_parse(path, e))?;
        self.parse_article(path, &source)
    }

    /// Parses article source; `Ok(None)` means the file is not marked for Mastodon.
    ///
    /// Line endings are normalized to `\n` first, so CRLF files split into
    /// paragraphs the same way as LF ones.
    pub fn parse_article(&self, path: &Path, source: &str) -> Result<Option<Article>> {
        let source = normalize_line_endings(source);
        let Some((format, matter, body)) =
            split_front_matter(&source).map_err(|e| PublishError::content_parse(path, e))?
        else {
            return Ok(None);
        };

        let front_matter =
            parse_front_matter(format, matter).map_err(|e| PublishError::content_parse(path, e))?;
        if !front_matter.mastodon {
            return Ok(None);
        }
        if front_matter.draft {
            tracing::debug!("Skipping draft {}", path.display());
            return Ok(None);
        }

        let body = body.to_string();
        Ok(Some(Article {
            identifier: self.identifier_for(path),
            source_path: path.to_path_buf(),
            title: front_matter
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            images: extract_image_refs(&body),
            body,
            featured_image: front_matter.featured_image.or(front_matter.image),
            short_text: front_matter.mastodon_text,
            full_thread: front_matter.mastodon_thread.unwrap_or(true),
        }))
    }

    fn identifier_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.site_root).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
