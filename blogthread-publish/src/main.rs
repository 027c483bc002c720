use blogthread_publish::{
    PublisherConfig, Visibility,
    config::DEFAULT_TRACKING_FILE,
    content::ContentStore,
    mastodon::{DryRunClient, MastodonClient, PostingService},
    publisher::Publisher,
    report::append_github_output,
    tracking::PublishedSet,
};
use blogthread_text::DEFAULT_MAX_LENGTH;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

/// Post new Hugo articles to Mastodon as threads.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Mastodon instance URL, e.g. https://mastodon.social
    #[arg(long, env = "MASTODON_INSTANCE")]
    instance: Option<String>,

    /// Access token with write:statuses and write:media scopes
    #[arg(long, env = "MASTODON_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Public URL of the blog
    #[arg(long, env = "BLOG_BASE_URL")]
    base_url: String,

    /// Hugo content directory
    #[arg(long, env = "BLOG_CONTENT_DIR", default_value = "content")]
    content_dir: PathBuf,

    /// Tracking file, relative to the site root
    #[arg(long, env = "TRACKING_FILE", default_value = DEFAULT_TRACKING_FILE)]
    tracking_file: PathBuf,

    /// Post visibility: public, unlisted, private or direct
    #[arg(long, env = "MASTODON_VISIBILITY", default_value = "public")]
    visibility: Visibility,

    /// Print the threads instead of posting them
    #[arg(
        long,
        env = "DRY_RUN",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    dry_run: bool,

    /// Maximum characters per body segment
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Pause before each reply, in milliseconds
    #[arg(long, env = "REPLY_DELAY_MS", default_value_t = 1000)]
    reply_delay_ms: u64,

    /// File to append `posts_published=N` to (set by GitHub Actions)
    #[arg(long, env = "GITHUB_OUTPUT", hide = true)]
    github_output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Commands {
    /// Publish every eligible article not posted yet
    #[default]
    Publish,
    /// List eligible articles not posted yet, without posting
    Pending,
}

impl Args {
    fn config(&self) -> PublisherConfig {
        let mut config = PublisherConfig::new(self.base_url.clone(), self.content_dir.clone())
            .with_tracking_file(self.tracking_file.clone())
            .with_visibility(self.visibility)
            .with_dry_run(self.dry_run)
            .with_max_length(self.max_length)
            .with_reply_delay(Duration::from_millis(self.reply_delay_ms));
        config.instance_url = self.instance.clone();
        config.access_token = self.access_token.clone();
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // A missing .env is fine; the variables may come from the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.config();

    match args.command.unwrap_or_default() {
        Commands::Pending => {
            config.validate()?;
            let articles = ContentStore::new(&config.content_dir).find_articles();
            let published = PublishedSet::load(&config.tracking_path())?;
            let pending = published.unpublished(articles);

            // Planning never touches the posting service
            let publisher = Publisher::new(&config, Box::new(DryRunClient::new()))?;
            println!("{} articles waiting to be published", pending.len());
            for article in &pending {
                let plan = publisher.plan(article);
                println!(
                    "  {} | {} | {} posts, {} images",
                    article.identifier,
                    article.title,
                    plan.len(),
                    plan.image_count()
                );
            }
            Ok(())
        }
        Commands::Publish => {
            config.validate_for_posting()?;

            let tracking_path = config.tracking_path();
            let published = PublishedSet::load(&tracking_path)?;
            println!("Found {} previously published posts", published.len());

            let articles = ContentStore::new(&config.content_dir).find_articles();
            println!("Found {} posts marked for Mastodon", articles.len());

            let credentials = (&config.instance_url, &config.access_token);
            let service: Box<dyn PostingService> = match credentials {
                (Some(instance), Some(token)) if !config.dry_run => {
                    Box::new(MastodonClient::new(instance.as_str(), token.as_str())?)
                }
                _ => Box::new(DryRunClient::new()),
            };
            let publisher = Publisher::new(&config, service)?;
            let report = publisher.run(articles, published, &tracking_path).await?;

            if report.skipped_images > 0 {
                println!(
                    "Left out {} images that could not be uploaded",
                    report.skipped_images
                );
            }
            println!(
                "\nDone! Published {} new posts ({} statuses)",
                report.published_count(),
                report.post_count()
            );

            if let Some(path) = &args.github_output {
                append_github_output(path, "posts_published", report.published_count())?;
            }
            Ok(())
        }
    }
}
