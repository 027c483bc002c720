//! Splits normalized article text into status-sized segments.
//!
//! Long articles cannot be posted as a single status, so their plain text is
//! broken into an ordered list of [`Segment`]s that each fit within a maximum
//! length. Splitting prefers the largest natural boundary that works:
//!
//! 1.  **Paragraphs** (blank-line separated) are packed greedily, joined with a
//!     blank line.
//! 2.  A paragraph that cannot fit in a segment on its own is re-split into
//!     **sentences** (after `.`, `!` or `?` followed by whitespace), joined with a
//!     single space.
//! 3.  A sentence that still does not fit is split into **words**.
//!
//! A word longer than the maximum is emitted as its own over-length segment so the
//! split always makes progress.
//!
//! # Images
//!
//! Each image is owned by the last paragraph starting at or before the image's
//! offset. Offsets are measured against the original Markdown, so on text that
//! lost a lot of markup this is an approximation; the image lands on the nearest
//! preceding paragraph boundary and is never dropped. When a paragraph has to be
//! split, all of its images go to the first segment produced from it.
//!
//! ```
//! use blogthread_text::chunk::{Chunker, Segment};
//! use blogthread_text::markdown::ImageRef;
//!
//! let chunker = Chunker::new(40);
//! let text = "A short opening paragraph.\n\nA second paragraph follows it.";
//! let images = vec![ImageRef { url: "cover.png".to_string(), offset: 30 }];
//!
//! let segments = chunker.chunk(text, &images);
//!
//! assert_eq!(
//!     segments,
//!     vec![
//!         Segment { text: "A short opening paragraph.".to_string(), images: vec![] },
//!         Segment {
//!             text: "A second paragraph follows it.".to_string(),
//!             images: vec!["cover.png".to_string()],
//!         },
//!     ]
//! );
//! ```
use crate::markdown::ImageRef;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Default segment length, leaving headroom below the usual 500 character
/// status limit.
pub const DEFAULT_MAX_LENGTH: usize = 480;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

static SENTENCE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// One status-sized piece of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Plain text of the segment, never empty.
    pub text: String,
    /// Image URLs that belong with this text, in article order.
    pub images: Vec<String>,
}

/// The boundary a piece of text is being split on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Paragraph,
    Sentence,
    Word,
}

impl Granularity {
    /// The string placed between two units packed into the same segment.
    pub fn separator(self) -> &'static str {
        match self {
            Granularity::Paragraph => PARAGRAPH_SEPARATOR,
            Granularity::Sentence | Granularity::Word => " ",
        }
    }

    /// The next boundary to fall back on when a unit is too long.
    pub fn finer(self) -> Option<Self> {
        match self {
            Granularity::Paragraph => Some(Granularity::Sentence),
            Granularity::Sentence => Some(Granularity::Word),
            Granularity::Word => None,
        }
    }

    /// Splits `text` into units of this granularity, in order.
    ///
    /// Units are not trimmed; paragraphs in particular keep their exact extent so
    /// offsets can be computed from them.
    pub fn split(self, text: &str) -> Vec<&str> {
        match self {
            Granularity::Paragraph => text.split(PARAGRAPH_SEPARATOR).collect(),
            Granularity::Sentence => split_sentences(text),
            Granularity::Word => text.split_whitespace().collect(),
        }
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for mat in SENTENCE_BREAK.find_iter(text) {
        // Keep the punctuation, drop the whitespace after it
        sentences.push(&text[start..mat.start() + 1]);
        start = mat.end();
    }
    sentences.push(&text[start..]);
    sentences
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits text into segments no longer than a configured maximum.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_length: usize,
}

impl Chunker {
    /// Creates a chunker producing segments of at most `max_length` characters.
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Creates a chunker with [`DEFAULT_MAX_LENGTH`].
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_LENGTH)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Splits normalized `text` into segments and distributes `images` over them.
    ///
    /// `images` must be ordered by offset. Every image ends up in exactly one
    /// segment as long as the text produces at least one segment.
    pub fn chunk(&self, text: &str, images: &[ImageRef]) -> Vec<Segment> {
        let paragraphs = Granularity::Paragraph.split(text);

        let mut starts = Vec::with_capacity(paragraphs.len());
        let mut offset = 0;
        for paragraph in &paragraphs {
            starts.push(offset);
            offset += char_len(paragraph) + PARAGRAPH_SEPARATOR.len();
        }

        let mut owned: Vec<Vec<String>> = vec![Vec::new(); paragraphs.len()];
        for image in images {
            let owner = starts
                .iter()
                .rposition(|&start| start <= image.offset)
                .unwrap_or(0);
            owned[owner].push(image.url.clone());
        }

        // Images owned by a blank paragraph move on to the next non-blank one
        let mut carried = Vec::new();
        let mut units = Vec::with_capacity(paragraphs.len());
        for (paragraph, paragraph_images) in paragraphs.into_iter().zip(owned) {
            carried.extend(paragraph_images);
            if paragraph.trim().is_empty() {
                continue;
            }
            units.push(Unit {
                text: paragraph,
                images: std::mem::take(&mut carried),
            });
        }

        let mut segments = pack(units, Granularity::Paragraph, self.max_length);

        if !carried.is_empty() {
            match segments.last_mut() {
                Some(last) => last.images.extend(carried),
                None => tracing::debug!(
                    "Dropping {} images from an article without text",
                    carried.len()
                ),
            }
        }

        tracing::debug!(
            "Chunked {} characters into {} segments (max length: {})",
            char_len(text),
            segments.len(),
            self.max_length
        );

        segments
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Splits `text` into segments of at most `max_length` characters.
///
/// Shorthand for `Chunker::new(max_length).chunk(text, images)`.
pub fn chunk(text: &str, images: &[ImageRef], max_length: usize) -> Vec<Segment> {
    Chunker::new(max_length).chunk(text, images)
}

/// A unit of text at some granularity, with the images that travel with it.
struct Unit<'a> {
    text: &'a str,
    images: Vec<String>,
}

/// Greedily packs `units` into segments, descending to a finer granularity for
/// any unit that cannot fit in a segment by itself.
///
/// The last segment produced from a split unit stays open, so following units
/// may still be appended to it.
fn pack(units: Vec<Unit<'_>>, granularity: Granularity, max_length: usize) -> Vec<Segment> {
    let separator = granularity.separator();
    let mut segments = Vec::new();
    let mut current = Segment::default();

    for unit in units {
        let text = unit.text.trim();
        if text.is_empty() {
            continue;
        }

        let len = char_len(text);
        let joined_len = if current.text.is_empty() {
            len
        } else {
            char_len(&current.text) + separator.len() + len
        };

        if joined_len <= max_length {
            if !current.text.is_empty() {
                current.text.push_str(separator);
            }
            current.text.push_str(text);
            current.images.extend(unit.images);
            continue;
        }

        flush(&mut segments, &mut current);

        match granularity.finer() {
            Some(finer) if len > max_length => {
                let mut pieces: Vec<Unit<'_>> = finer
                    .split(text)
                    .into_iter()
                    .filter(|piece| !piece.trim().is_empty())
                    .map(|piece| Unit {
                        text: piece,
                        images: Vec::new(),
                    })
                    .collect();
                if let Some(first) = pieces.first_mut() {
                    first.images = unit.images;
                }

                let mut sub_segments = pack(pieces, finer, max_length);
                if let Some(last) = sub_segments.pop() {
                    segments.extend(sub_segments);
                    current = last;
                }
            }
            // Fits alone, or is a single word too long to split any further
            _ => {
                current = Segment {
                    text: text.to_string(),
                    images: unit.images,
                };
            }
        }
    }

    flush(&mut segments, &mut current);
    segments
}

fn flush(segments: &mut Vec<Segment>, current: &mut Segment) {
    if !current.text.is_empty() {
        segments.push(std::mem::take(current));
    }
}
