//! blogthread-publish: post Hugo articles to Mastodon as threads
//!
//! Articles opt in through their front matter (`mastodon: true`). Each new one
//! is turned into a reply chain: an announcement with the title and link,
//! followed by the article text in status-sized segments with its images.
//! Published articles are remembered in a JSON tracking file so every article
//! is posted once.
//!
//! ## Key Modules
//!
//! - **[`content`]**: Finding articles and parsing their front matter
//! - **[`thread`]**: Assembling segments into a planned thread
//! - **[`publisher`]**: The sequential posting run
//! - **[`mastodon`]**: The posting service trait, Mastodon client and dry-run client
//! - **[`media`]**: Resolving image references to uploadable bytes
//! - **[`tracking`]**: The persisted set of published articles
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blogthread_publish::{
//!     config::PublisherConfig, content::ContentStore, mastodon::DryRunClient,
//!     publisher::Publisher, tracking::PublishedSet,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PublisherConfig::new("https://blog.example", "site/content").with_dry_run(true);
//! config.validate_for_posting()?;
//!
//! let articles = ContentStore::new(&config.content_dir).find_articles();
//! let published = PublishedSet::load(&config.tracking_path())?;
//!
//! let publisher = Publisher::new(&config, Box::new(DryRunClient::new()))?;
//! let report = publisher.run(articles, published, &config.tracking_path()).await?;
//! println!("Published {} articles", report.published_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! content/*.md → ContentStore → normalize → chunk → ThreadPlanner
//!                                                        ↓
//!      tracking file ← PublishedSet ← Publisher → PostingService
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod mastodon;
pub mod media;
pub mod publisher;
pub mod report;
pub mod thread;
pub mod tracking;

pub use config::{PublisherConfig, Visibility};
pub use error::{PublishError, Result};
pub use publisher::Publisher;
