use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::ai::{ChatClient, Summarizer};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedFetcher;
use crate::models::{Feed, TokenUsage};
use crate::output::MarkdownFormatter;

/// Wires the collaborators together and drives the fetch / digest / render
/// workflow. The summarizer is only constructed when an API key is
/// configured; fetching and rendering work without one.
pub struct App {
    repository: Repository,
    fetcher: FeedFetcher,
    summarizer: Option<Summarizer>,
    formatter: MarkdownFormatter,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let fetcher = FeedFetcher::new();

        let summarizer = config.api_key.as_ref().map(|key| {
            let client = ChatClient::new(
                config.api_base.clone(),
                key.clone(),
                config.model.clone(),
                Duration::from_secs(config.request_timeout_secs),
            );
            Summarizer::new(Arc::new(client), config)
        });

        let formatter = MarkdownFormatter::new(&config.output_dir);

        Ok(Self {
            repository,
            fetcher,
            summarizer,
            formatter,
        })
    }

    pub async fn add_feed(&self, url: &str) -> Result<Feed> {
        let new_feed = self.fetcher.probe_feed(url).await?;
        let title = new_feed.title.clone();
        let feed_url = new_feed.url.clone();
        let id = self.repository.insert_feed(new_feed).await?;
        tracing::info!(title = %title, url = %feed_url, "added feed");
        Ok(Feed {
            id,
            title,
            url: feed_url,
        })
    }

    /// Download every stored feed and insert the articles that are new.
    /// Returns how many were inserted.
    pub async fn fetch_articles(&self) -> Result<usize> {
        let feeds = self.repository.get_all_feeds().await?;
        let fetched = self.fetcher.fetch_all(feeds).await;

        let mut inserted = 0;
        for (_, articles) in fetched {
            for article in articles {
                let title = article.title.clone();
                if self.repository.insert_article(article).await? {
                    tracing::info!(title = %title, "inserted article");
                    inserted += 1;
                }
            }
        }
        Ok(inserted)
    }

    /// Digest every article that still lacks a summary. Returns how many
    /// were digested out of how many were pending, plus the summed token
    /// usage of the run. Articles that fail stay unsummarized and are
    /// picked up again next time.
    pub async fn digest_pending(&self) -> Result<(usize, usize, TokenUsage)> {
        let articles = self.repository.get_unsummarized_articles().await?;
        if articles.is_empty() {
            return Ok((0, 0, TokenUsage::default()));
        }
        let pending = articles.len();

        let results = self.summarizer()?.digest_batch(articles).await;

        let mut digested = 0;
        let mut usage = TokenUsage::default();
        for article in &results {
            if article.digest.is_some() {
                self.repository.update_article(article).await?;
                digested += 1;
                usage += article.token_usage.unwrap_or_default();
            }
        }

        tracing::info!(
            digested,
            pending,
            total_tokens = usage.total_tokens,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "digest run finished"
        );
        Ok((digested, pending, usage))
    }

    /// Digest a single article by id. Returns whether it succeeded.
    pub async fn digest_one(&self, id: i64) -> Result<bool> {
        let article = self
            .repository
            .get_article(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no article with id {}", id))?;

        let result = self.summarizer()?.digest_article(article).await;
        let succeeded = result.digest.is_some();
        if succeeded {
            self.repository.update_article(&result).await?;
        }
        Ok(succeeded)
    }

    pub async fn render_weekly(&self) -> Result<PathBuf> {
        let articles = self.repository.get_articles_past_week().await?;
        self.formatter.render(articles)
    }

    /// The full cycle: fetch feeds, digest what is new, render the week.
    pub async fn run(&self) -> Result<PathBuf> {
        self.fetch_articles().await?;
        self.digest_pending().await?;
        self.render_weekly().await
    }

    fn summarizer(&self) -> Result<&Summarizer> {
        self.summarizer.as_ref().ok_or_else(|| {
            AppError::Config(
                "no API key configured; set api_key in config.toml or OPENAI_API_KEY".to_string(),
            )
        })
    }
}
