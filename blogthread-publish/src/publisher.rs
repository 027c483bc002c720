//! The publishing run: plan each article, post it as a thread, remember it.
//!
//! Articles are handled one at a time and every call is awaited in order. A
//! reply is only sent once its parent's id is known, and a fixed delay precedes
//! each reply to stay clear of rate limits.
//!
//! Failures are treated by kind:
//!
//! - an image that cannot be resolved or uploaded is logged and left out
//! - a status that cannot be posted aborts the run; the article is not marked
//!   published, articles finished earlier in the run stay marked
use crate::config::{PublisherConfig, Visibility};
use crate::content::Article;
use crate::error::Result;
use crate::mastodon::PostingService;
use crate::media::MediaResolver;
use crate::report::{PublishedArticle, RunReport};
use crate::thread::{PlannedPost, ThreadPlan, ThreadPlanner};
use crate::tracking::PublishedSet;
use blogthread_text::{Chunker, normalize};
use std::path::Path;
use std::time::Duration;

/// Posts articles through a [`PostingService`].
pub struct Publisher {
    service: Box<dyn PostingService>,
    resolver: MediaResolver,
    chunker: Chunker,
    planner: ThreadPlanner,
    base_url: String,
    visibility: Visibility,
    reply_delay: Duration,
    dry_run: bool,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("service", &self.service.service_name())
            .field("base_url", &self.base_url)
            .field("visibility", &self.visibility)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// Result of posting a single thread.
struct PostedThread {
    post_ids: Vec<String>,
    skipped_images: usize,
}

impl Publisher {
    pub fn new(config: &PublisherConfig, service: Box<dyn PostingService>) -> Result<Self> {
        let resolver = MediaResolver::new(config.site_root())?.with_offline(config.dry_run);
        Ok(Self {
            service,
            resolver,
            chunker: Chunker::new(config.max_length),
            planner: ThreadPlanner::new(config.limits),
            base_url: config.base_url.clone(),
            visibility: config.visibility,
            reply_delay: config.reply_delay,
            dry_run: config.dry_run,
        })
    }

    /// Works out the posts for `article` without sending anything.
    pub fn plan(&self, article: &Article) -> ThreadPlan {
        let url = article.url(&self.base_url);
        let header = self
            .planner
            .header(&article.title, article.short_text.as_deref(), &url);
        let featured_image = article.featured_image.as_deref();

        if !article.full_thread {
            return self.planner.plan_single(header, featured_image);
        }

        let text = normalize(&article.body);
        let segments = self.chunker.chunk(&text, &article.images);
        tracing::debug!(
            "{}: {} characters in {} segments of at most {}",
            article.identifier,
            text.chars().count(),
            segments.len(),
            self.chunker.max_length()
        );
        self.planner.plan_thread(header, featured_image, segments)
    }

    /// Plans and posts one article, returning what was posted.
    pub async fn publish_article(&self, article: &Article) -> Result<(PublishedArticle, usize)> {
        let plan = self.plan(article);
        let url = article.url(&self.base_url);
        println!("\nProcessing: {}", article.title);
        println!("  URL: {url}");
        println!("  Thread of {} posts", plan.len());

        let posted = self.post_thread(article, &plan).await?;
        Ok((
            PublishedArticle {
                identifier: article.identifier.clone(),
                title: article.title.clone(),
                url,
                post_ids: posted.post_ids,
            },
            posted.skipped_images,
        ))
    }

    async fn post_thread(&self, article: &Article, plan: &ThreadPlan) -> Result<PostedThread> {
        let mut post_ids: Vec<String> = Vec::with_capacity(plan.len());
        let mut skipped_images = 0;

        for (index, post) in plan.posts().iter().enumerate() {
            let reply_to = post_ids.last().cloned();
            if reply_to.is_some() && !self.reply_delay.is_zero() {
                tokio::time::sleep(self.reply_delay).await;
            }

            let (media_ids, skipped) = self.upload_images(article, post).await;
            skipped_images += skipped;

            println!(
                "  Posting {}/{} ({} chars)...",
                index + 1,
                plan.len(),
                post.text.chars().count()
            );
            let id = self
                .service
                .create_post(&post.text, reply_to.as_deref(), &media_ids, self.visibility)
                .await?;
            tracing::info!("Posted {id} via {}", self.service.service_name());
            post_ids.push(id);
        }

        Ok(PostedThread {
            post_ids,
            skipped_images,
        })
    }

    /// Uploads a post's images, leaving out any that fail.
    async fn upload_images(&self, article: &Article, post: &PlannedPost) -> (Vec<String>, usize) {
        let url = article.url(&self.base_url);
        let mut media_ids = Vec::with_capacity(post.images.len());
        let mut skipped = 0;

        for reference in &post.images {
            let uploaded = match self.resolver.resolve(reference, article.directory(), &url).await {
                Ok(media) => self.service.upload_media(&media).await,
                Err(e) => Err(e),
            };
            match uploaded {
                Ok(id) => media_ids.push(id),
                Err(e) => {
                    tracing::warn!("Leaving out image {reference}: {e}");
                    skipped += 1;
                }
            }
        }

        (media_ids, skipped)
    }

    /// Publishes every article not yet in `published`, in order.
    ///
    /// After each article the updated set is written to `tracking_path`, except
    /// in dry-run mode where nothing is written.
    pub async fn run(
        &self,
        articles: Vec<Article>,
        published: PublishedSet,
        tracking_path: &Path,
    ) -> Result<RunReport> {
        let pending = published.unpublished(articles);
        println!("Found {} new posts to publish", pending.len());

        let mut report = RunReport {
            dry_run: self.dry_run,
            ..RunReport::default()
        };
        let mut published = published;

        for article in &pending {
            let (posted, skipped_images) = self.publish_article(article).await?;
            report.skipped_images += skipped_images;

            published = published.with(article.identifier.clone());
            if !self.dry_run {
                published.save(tracking_path)?;
                println!("  Marked as published");
            }
            report.published.push(posted);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastodon::DryRunClient;
    use crate::media::MediaFile;
    use async_trait::async_trait;
    use blogthread_text::ImageRef;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;
    use tracing_test::traced_test;

    fn article(body: &str, full_thread: bool) -> Article {
        Article {
            identifier: "content/posts/hello/index.md".to_string(),
            source_path: PathBuf::from("site/content/posts/hello/index.md"),
            title: "Hello".to_string(),
            body: body.to_string(),
            images: Vec::new(),
            featured_image: Some("cover.png".to_string()),
            short_text: None,
            full_thread,
        }
    }

    fn publisher() -> Publisher {
        let config =
            PublisherConfig::new("https://blog.example", "site/content").with_dry_run(true);
        Publisher::new(&config, Box::new(DryRunClient::new())).unwrap()
    }

    #[test]
    fn test_plan_merges_short_article_into_root() {
        let plan = publisher().plan(&article("# Hi\n\nJust **one** line.", true));

        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.root().text,
            "Hello\n\nhttps://blog.example/posts/hello/\n\nHi\n\nJust one line."
        );
        assert_eq!(plan.root().images, vec!["cover.png"]);
    }

    #[test]
    fn test_plan_single_post_skips_body() {
        let plan = publisher().plan(&article(&"Long text. ".repeat(200), false));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.root().text, "Hello\n\nhttps://blog.example/posts/hello/");
    }

    #[test]
    fn test_plan_attaches_body_images() {
        let body = format!("{}\n\n![a](a.png)Second paragraph.", "x".repeat(470));
        let mut article = article(&body, true);
        article.images = blogthread_text::extract_image_refs(&body);
        assert_eq!(
            article.images,
            vec![ImageRef {
                url: "a.png".to_string(),
                offset: 472
            }]
        );

        let plan = publisher().plan(&article);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.root().images, vec!["cover.png"]);
        assert!(plan.replies()[0].images.is_empty());
        assert_eq!(plan.replies()[1].text, "Second paragraph.");
        assert_eq!(plan.replies()[1].images, vec!["a.png"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unresolvable_image_is_left_out() {
        // A relative base URL leaves nothing to resolve a missing image against
        let config = PublisherConfig::new("blog", "site/content")
            .with_dry_run(true)
            .with_reply_delay(Duration::ZERO);
        let publisher = Publisher::new(&config, Box::new(DryRunClient::new())).unwrap();
        let article = article("Tiny.", true);

        let (posted, skipped) = publisher.publish_article(&article).await.unwrap();

        assert_eq!(posted.post_ids, vec!["dry-run-1"]);
        assert_eq!(skipped, 1);
        assert!(logs_contain("Leaving out image cover.png"));
    }

    /// Notes when each post arrives and what it replies to.
    #[derive(Clone, Default)]
    struct ClockedService {
        sent: Arc<Mutex<Vec<(Instant, Option<String>)>>>,
    }

    #[async_trait]
    impl PostingService for ClockedService {
        async fn create_post(
            &self,
            _text: &str,
            reply_to: Option<&str>,
            _media_ids: &[String],
            _visibility: Visibility,
        ) -> Result<String> {
            let mut sent = self.sent.lock().unwrap();
            sent.push((Instant::now(), reply_to.map(str::to_string)));
            Ok(format!("status-{}", sent.len()))
        }

        async fn upload_media(&self, _media: &MediaFile) -> Result<String> {
            Ok("media".to_string())
        }

        fn service_name(&self) -> &str {
            "clocked"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_precedes_every_reply_but_not_the_root() {
        let delay = Duration::from_secs(1);
        let config = PublisherConfig::new("https://blog.example", "site/content")
            .with_dry_run(true)
            .with_reply_delay(delay);
        let service = ClockedService::default();
        let publisher = Publisher::new(&config, Box::new(service.clone())).unwrap();

        // Three paragraphs that each need their own reply
        let paragraph = "x".repeat(470);
        let mut article = article(&format!("{paragraph}\n\n{paragraph}\n\n{paragraph}"), true);
        article.featured_image = None;

        let start = Instant::now();
        let report = publisher
            .run(vec![article], PublishedSet::new(), Path::new("unused.json"))
            .await
            .unwrap();

        assert_eq!(report.post_count(), 4);
        let sent = service.sent.lock().unwrap().clone();
        let elapsed: Vec<Duration> = sent.iter().map(|(at, _)| *at - start).collect();
        assert_eq!(elapsed, vec![Duration::ZERO, delay, delay * 2, delay * 3]);
        assert_eq!(sent[0].1, None);
        assert_eq!(sent[3].1.as_deref(), Some("status-3"));
    }
}
