use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, Digest, Feed, NewArticle, NewFeed, TokenUsage};

use super::schema::SCHEMA;

const ARTICLE_COLUMNS: &str = "id, feed_id, title, content, link, author, categories, \
     published_at, product, product_author, core_summary, detailed_summary, \
     total_tokens, prompt_tokens, completion_tokens";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Feed operations

    pub async fn insert_feed(&self, feed: NewFeed) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feeds (title, url) VALUES (?1, ?2)
                     ON CONFLICT(url) DO UPDATE SET title = excluded.title",
                    params![feed.title, feed.url],
                )?;
                // last_insert_rowid is stale on the conflict path
                let id = conn.query_row(
                    "SELECT id FROM feeds WHERE url = ?1",
                    params![feed.url],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    pub async fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        let feeds = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, title, url FROM feeds ORDER BY title")?;
                let feeds = stmt
                    .query_map([], |row| {
                        Ok(Feed {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            url: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    // Article operations

    /// Insert a fetched article, skipping entries already present for the
    /// same feed + link. Returns whether a row was actually written.
    pub async fn insert_article(&self, article: NewArticle) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let categories = serde_json::to_string(&article.categories)
                    .unwrap_or_else(|_| "[]".to_string());
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO articles
                     (feed_id, title, content, link, author, categories, published_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        article.feed_id,
                        article.title,
                        article.content,
                        article.link,
                        article.author,
                        categories,
                        article.published_at.map(|dt| dt.to_rfc3339()),
                    ],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let query = format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS);
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let article = stmt
                    .query_row(params![id], |row| Ok(article_from_row(row)))
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Articles that still need a digest. A failed summarization leaves the
    /// digest columns NULL, so those come back on the next run.
    pub async fn get_unsummarized_articles(&self) -> Result<Vec<Article>> {
        let query = format!(
            "SELECT {} FROM articles WHERE core_summary IS NULL ORDER BY id",
            ARTICLE_COLUMNS
        );
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let articles = stmt
                    .query_map([], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Write back digest and token columns by id. An article without a
    /// digest is left alone so a failed run never clears existing data.
    pub async fn update_article(&self, article: &Article) -> Result<()> {
        let Some(digest) = article.digest.clone() else {
            return Ok(());
        };
        let usage = article.token_usage.unwrap_or_default();
        let id = article.id;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE articles SET
                         product = ?1, product_author = ?2,
                         core_summary = ?3, detailed_summary = ?4,
                         total_tokens = ?5, prompt_tokens = ?6, completion_tokens = ?7
                     WHERE id = ?8",
                    params![
                        digest.product,
                        digest.product_author,
                        digest.core_summary,
                        digest.detailed_summary,
                        usage.total_tokens,
                        usage.prompt_tokens,
                        usage.completion_tokens,
                        id,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Digested articles published since Monday of the current ISO week,
    /// newest first. Input for the weekly Markdown render.
    pub async fn get_articles_past_week(&self) -> Result<Vec<Article>> {
        let query = format!(
            "SELECT {} FROM articles
             WHERE core_summary IS NOT NULL
             ORDER BY published_at DESC",
            ARTICLE_COLUMNS
        );
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&query)?;
                let articles = stmt
                    .query_map([], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;

        let monday = start_of_iso_week(Utc::now().date_naive());
        Ok(articles
            .into_iter()
            .filter(|a| {
                a.published_at
                    .map(|dt| dt.date_naive() >= monday)
                    .unwrap_or(false)
            })
            .collect())
    }
}

fn start_of_iso_week(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> Article {
    let product: Option<String> = row.get(8).unwrap();
    let product_author: Option<String> = row.get(9).unwrap();
    let core_summary: Option<String> = row.get(10).unwrap();
    let detailed_summary: Option<String> = row.get(11).unwrap();

    // all four or nothing; a row can only get here through update_article,
    // which writes them together
    let digest = match (product, product_author, core_summary, detailed_summary) {
        (Some(product), Some(product_author), Some(core_summary), Some(detailed_summary)) => {
            Some(Digest {
                product,
                product_author,
                core_summary,
                detailed_summary,
            })
        }
        _ => None,
    };

    let token_usage = row
        .get::<_, Option<u32>>(12)
        .unwrap()
        .map(|total_tokens| TokenUsage {
            total_tokens,
            prompt_tokens: row.get::<_, Option<u32>>(13).unwrap().unwrap_or(0),
            completion_tokens: row.get::<_, Option<u32>>(14).unwrap().unwrap_or(0),
        });

    Article {
        id: row.get(0).unwrap(),
        feed_id: row.get(1).unwrap(),
        title: row.get(2).unwrap(),
        content: row.get(3).unwrap(),
        link: row.get(4).unwrap(),
        author: row.get(5).unwrap(),
        categories: row
            .get::<_, Option<String>>(6)
            .unwrap()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default(),
        published_at: row
            .get::<_, Option<String>>(7)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        digest,
        token_usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_article(feed_id: i64, title: &str, link: &str) -> NewArticle {
        NewArticle {
            feed_id,
            title: title.to_string(),
            content: "body".to_string(),
            link: link.to_string(),
            author: Some("reporter".to_string()),
            categories: vec!["ai".to_string()],
            published_at: Some(Utc.with_ymd_and_hms(2026, 8, 24, 9, 0, 0).unwrap()),
        }
    }

    async fn repository() -> (Repository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        (repo, dir)
    }

    async fn seed_feed(repo: &Repository) -> i64 {
        repo.insert_feed(NewFeed {
            title: "Feed".to_string(),
            url: "https://example.com/rss".to_string(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn insert_dedupes_on_feed_and_link() {
        let (repo, _dir) = repository().await;
        let feed_id = seed_feed(&repo).await;

        assert!(repo
            .insert_article(new_article(feed_id, "a", "https://example.com/a"))
            .await
            .unwrap());
        assert!(!repo
            .insert_article(new_article(feed_id, "a again", "https://example.com/a"))
            .await
            .unwrap());

        assert_eq!(repo.get_unsummarized_articles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn digest_roundtrip_clears_unsummarized_marker() {
        let (repo, _dir) = repository().await;
        let feed_id = seed_feed(&repo).await;
        repo.insert_article(new_article(feed_id, "a", "https://example.com/a"))
            .await
            .unwrap();

        let mut article = repo.get_unsummarized_articles().await.unwrap().remove(0);
        assert!(article.digest.is_none());

        article.digest = Some(Digest {
            product: "Widget".to_string(),
            product_author: "Acme".to_string(),
            core_summary: "short".to_string(),
            detailed_summary: "long".to_string(),
        });
        article.token_usage = Some(TokenUsage {
            total_tokens: 15,
            prompt_tokens: 9,
            completion_tokens: 5,
        });
        repo.update_article(&article).await.unwrap();

        assert!(repo.get_unsummarized_articles().await.unwrap().is_empty());
        let stored = repo.get_article(article.id).await.unwrap().unwrap();
        assert_eq!(stored.digest, article.digest);
        assert_eq!(stored.token_usage, article.token_usage);
    }

    #[tokio::test]
    async fn update_without_digest_is_a_no_op() {
        let (repo, _dir) = repository().await;
        let feed_id = seed_feed(&repo).await;
        repo.insert_article(new_article(feed_id, "a", "https://example.com/a"))
            .await
            .unwrap();

        let article = repo.get_unsummarized_articles().await.unwrap().remove(0);
        repo.update_article(&article).await.unwrap();
        assert_eq!(repo.get_unsummarized_articles().await.unwrap().len(), 1);
    }

    #[test]
    fn iso_week_starts_on_monday() {
        // 2026-08-26 is a Wednesday
        let wednesday = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        assert_eq!(
            start_of_iso_week(wednesday),
            NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
        );
        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_eq!(start_of_iso_week(monday), monday);
    }
}
