//! Markdown-to-plain-text normalization for status posts.
//!
//! Social network statuses are plain text, so article bodies written in Markdown
//! have their syntax stripped before they are chunked. Images are the one piece of
//! markup that carries meaning beyond the text: their positions are recorded
//! *before* stripping so the chunker can later hand each image to the segment
//! that contains it.
//!
//! The normalizer is regex based and deliberately forgiving. It is not a Markdown
//! parser; malformed markup passes through as-is.
//!
//! ```
//! use blogthread_text::markdown::{clean, normalize};
//!
//! let body = "# Hello\n\nSome **bold** text.\n\n![a cat](cat.png)";
//! let cleaned = clean(body);
//!
//! assert_eq!(cleaned.text, "Hello\n\nSome bold text.");
//! assert_eq!(cleaned.images.len(), 1);
//! assert_eq!(cleaned.images[0].url, "cat.png");
//! assert_eq!(cleaned.images[0].offset, 30);
//! assert_eq!(normalize("`code`"), "code");
//! ```
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[.*?\]\((.*?)\)").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static BOLD_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__([^_]+)__").unwrap());
static ITALIC_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+)_").unwrap());
static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```[\s\S]*?```").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>\s*").unwrap());
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[-*_]{3,}\s*$").unwrap());
static EXTRA_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// An image embedded in an article body.
///
/// `offset` is measured in characters against the *original* Markdown body, not
/// against the normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    /// Image target as written in the Markdown (relative or absolute).
    pub url: String,
    /// Character position of the `![` marker in the original body.
    pub offset: usize,
}

/// A normalized article body together with the images found in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedBody {
    pub text: String,
    pub images: Vec<ImageRef>,
}

/// Extracts image references then normalizes the body.
///
/// This is the safe way to use the two halves of this module: extraction must
/// run against the original body or the offsets are meaningless.
pub fn clean(body: &str) -> CleanedBody {
    let images = extract_image_refs(body);
    let text = normalize(body);
    CleanedBody { text, images }
}

/// Finds every `![alt](url)` in `body`, in order of appearance.
///
/// An optional Markdown title (`![alt](url "title")`) is dropped from the URL.
pub fn extract_image_refs(body: &str) -> Vec<ImageRef> {
    IMAGE
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let url = caps
                .get(1)
                .and_then(|m| m.as_str().split_whitespace().next())
                .unwrap_or_default();
            if url.is_empty() {
                return None;
            }
            Some(ImageRef {
                url: url.to_string(),
                offset: body[..whole.start()].chars().count(),
            })
        })
        .collect()
}

/// Strips Markdown and HTML syntax, leaving plain text.
///
/// Patterns are applied in a fixed order; later ones rely on earlier ones having
/// already removed their markup (images before links, bold before italic).
pub fn normalize(body: &str) -> String {
    let text = IMAGE.replace_all(body, "");
    let text = LINK.replace_all(&text, "${1}");
    let text = HTML_TAG.replace_all(&text, "");
    let text = BOLD.replace_all(&text, "${1}");
    let text = ITALIC.replace_all(&text, "${1}");
    let text = BOLD_UNDERSCORE.replace_all(&text, "${1}");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "${1}");
    let text = FENCED_CODE.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "${1}");
    let text = HEADING.replace_all(&text, "");
    let text = BLOCKQUOTE.replace_all(&text, "");
    let text = HORIZONTAL_RULE.replace_all(&text, "");
    let text = EXTRA_NEWLINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_inline_markup() {
        let body = "**bold** and `code` and ![alt](x.png) and [link](y)";
        assert_eq!(normalize(body), "bold and code and  and link");
    }

    #[test]
    fn test_normalize_emphasis_styles() {
        assert_eq!(normalize("*it* __strong__ _em_"), "it strong em");
    }

    #[test]
    fn test_normalize_removes_fenced_code_entirely() {
        let body = "Before\n\n```rust\nfn main() {}\n```\n\nAfter";
        assert_eq!(normalize(body), "Before\n\nAfter");
    }

    #[test]
    fn test_normalize_block_markers() {
        let body = "## Heading\n\n> quoted line\n\n---\n\nBody text";
        assert_eq!(normalize(body), "Heading\n\nquoted line\n\nBody text");
    }

    #[test]
    fn test_normalize_strips_html_and_collapses_newlines() {
        let body = "\n\n<div class=\"note\">Note</div>\n\n\n\n\nNext\n\n";
        assert_eq!(normalize(body), "Note\n\nNext");
    }

    #[test]
    fn test_normalize_leaves_malformed_markup() {
        assert_eq!(normalize("[unclosed link(nowhere"), "[unclosed link(nowhere");
    }

    #[test]
    fn test_extract_image_refs_in_order() {
        let body = "Intro ![one](a.png)\n\nMiddle\n\n![two](https://x.test/b.jpg \"Title\")";
        let images = extract_image_refs(body);

        assert_eq!(
            images,
            vec![
                ImageRef {
                    url: "a.png".to_string(),
                    offset: 6,
                },
                ImageRef {
                    url: "https://x.test/b.jpg".to_string(),
                    offset: 29,
                },
            ]
        );
    }

    #[test]
    fn test_extract_image_offsets_count_characters() {
        // "é" is two bytes but one character
        let images = extract_image_refs("é ![a](x.png)");
        assert_eq!(images[0].offset, 2);
    }

    #[test]
    fn test_extract_skips_empty_target() {
        assert!(extract_image_refs("![nothing]()").is_empty());
    }

    #[test]
    fn test_clean_captures_images_before_stripping() {
        let cleaned = clean("Text ![pic](p.png) more");
        assert_eq!(cleaned.text, "Text  more");
        assert_eq!(cleaned.images[0].offset, 5);
    }
}
