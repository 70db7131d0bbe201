use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::digest::{Digest, TokenUsage};

/// A feed entry as stored in the database. `digest` and `token_usage` stay
/// `None` until the article has been summarized successfully; a failed
/// summarization leaves both untouched, which is what marks the article for
/// the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub content: String,
    pub link: String,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub digest: Option<Digest>,
    pub token_usage: Option<TokenUsage>,
}

/// Fetch-time shape of an article, before it has a row id.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub feed_id: i64,
    pub title: String,
    pub content: String,
    pub link: String,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct NewFeed {
    pub title: String,
    pub url: String,
}
