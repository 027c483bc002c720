//! Turning article segments into a planned reply chain.
//!
//! A thread is a strict singly-linked chain: the root post announces the article
//! (title and link, optionally followed by the opening segment), and every later
//! segment becomes a reply to the post before it.
//!
//! Planning is pure; nothing here talks to the network. The plan is handed to the
//! [`Publisher`](crate::publisher::Publisher), which posts it in order.
//!
//! ```
//! use blogthread_publish::thread::{ThreadLimits, ThreadPlanner};
//! use blogthread_text::Segment;
//!
//! let planner = ThreadPlanner::new(ThreadLimits::default());
//! let header = planner.header("My post", None, "https://blog.example/my-post/");
//! let segments = vec![
//!     Segment { text: "Opening paragraph.".to_string(), images: vec![] },
//!     Segment { text: "Second part.".to_string(), images: vec![] },
//! ];
//!
//! let plan = planner.plan_thread(header, Some("cover.png"), segments);
//!
//! assert_eq!(plan.len(), 2);
//! assert_eq!(
//!     plan.root().text,
//!     "My post\n\nhttps://blog.example/my-post/\n\nOpening paragraph."
//! );
//! assert_eq!(plan.root().images, vec!["cover.png"]);
//! assert_eq!(plan.replies()[0].text, "Second part.");
//! ```
use blogthread_text::Segment;
use serde::Serialize;

const SEPARATOR: &str = "\n\n";

/// Allowance for the separator when merging the first segment into the root post.
const MERGE_OVERHEAD: usize = 4;

const ELLIPSIS: char = '…';

/// Hard limits a single post has to respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadLimits {
    /// Status character limit of the instance
    pub max_post_length: usize,
    /// Attachments allowed on one status
    pub max_images: usize,
}

impl Default for ThreadLimits {
    fn default() -> Self {
        Self {
            max_post_length: 500,
            max_images: 4,
        }
    }
}

/// One status waiting to be posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPost {
    pub text: String,
    /// Image references to upload and attach, already capped
    pub images: Vec<String>,
}

/// An ordered, non-empty list of posts; the first is the root of the thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadPlan {
    posts: Vec<PlannedPost>,
}

impl ThreadPlan {
    pub fn root(&self) -> &PlannedPost {
        &self.posts[0]
    }

    pub fn replies(&self) -> &[PlannedPost] {
        &self.posts[1..]
    }

    pub fn posts(&self) -> &[PlannedPost] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Total number of images across all posts.
    pub fn image_count(&self) -> usize {
        self.posts.iter().map(|p| p.images.len()).sum()
    }
}

/// Builds [`ThreadPlan`]s within a set of [`ThreadLimits`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPlanner {
    limits: ThreadLimits,
}

impl ThreadPlanner {
    pub fn new(limits: ThreadLimits) -> Self {
        Self { limits }
    }

    /// Builds the announcement text of the root post.
    ///
    /// The short text goes between title and link. If it would push the header
    /// over the post limit it is cut at a word boundary and ends in an ellipsis;
    /// if there is no room at all it is left out.
    pub fn header(&self, title: &str, short_text: Option<&str>, url: &str) -> String {
        let bare = format!("{title}{SEPARATOR}{url}");
        let Some(short_text) = short_text.map(str::trim).filter(|s| !s.is_empty()) else {
            return bare;
        };

        let full = format!("{title}{SEPARATOR}{short_text}{SEPARATOR}{url}");
        let full_len = char_len(&full);
        if full_len <= self.limits.max_post_length {
            return full;
        }

        let room = self
            .limits
            .max_post_length
            .saturating_sub(char_len(&bare) + SEPARATOR.len() + 1);
        match truncate_at_word(short_text, room) {
            Some(truncated) => {
                format!("{title}{SEPARATOR}{truncated}{ELLIPSIS}{SEPARATOR}{url}")
            }
            None => {
                tracing::debug!(
                    "Dropping short text: {full_len} characters exceeds the post limit"
                );
                bare
            }
        }
    }

    /// Plans a full thread: the header, merged with the first segment when it
    /// fits, followed by one reply per remaining segment.
    pub fn plan_thread(
        &self,
        header: String,
        featured_image: Option<&str>,
        segments: Vec<Segment>,
    ) -> ThreadPlan {
        let mut segments = segments.into_iter().peekable();

        let merge = segments.peek().is_some_and(|first| {
            char_len(&header) + char_len(&first.text) + MERGE_OVERHEAD
                <= self.limits.max_post_length
        });

        let mut root_text = header;
        let mut root_images: Vec<String> = featured_image.map(str::to_string).into_iter().collect();
        if merge {
            if let Some(first) = segments.next() {
                root_text.push_str(SEPARATOR);
                root_text.push_str(&first.text);
                root_images.extend(first.images);
            }
        }

        let mut posts = vec![self.post(root_text, root_images)];
        posts.extend(segments.map(|segment| self.post(segment.text, segment.images)));

        ThreadPlan { posts }
    }

    /// Plans a single announcement post carrying only the featured image.
    pub fn plan_single(&self, header: String, featured_image: Option<&str>) -> ThreadPlan {
        let images = featured_image.map(str::to_string).into_iter().collect();
        ThreadPlan {
            posts: vec![self.post(header, images)],
        }
    }

    fn post(&self, text: String, mut images: Vec<String>) -> PlannedPost {
        if images.len() > self.limits.max_images {
            tracing::debug!(
                "Dropping {} images over the per-post limit of {}",
                images.len() - self.limits.max_images,
                self.limits.max_images
            );
            images.truncate(self.limits.max_images);
        }
        PlannedPost { text, images }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cuts `text` to at most `max_chars` characters, ending on a word boundary.
///
/// Returns `None` when not even the first word fits.
fn truncate_at_word(text: &str, max_chars: usize) -> Option<String> {
    let mut truncated = String::new();
    let mut len = 0;
    for word in text.split_whitespace() {
        let extra = if truncated.is_empty() { 0 } else { 1 };
        let word_len = char_len(word);
        if len + extra + word_len > max_chars {
            break;
        }
        if extra == 1 {
            truncated.push(' ');
        }
        truncated.push_str(word);
        len += extra + word_len;
    }
    (!truncated.is_empty()).then_some(truncated)
}
