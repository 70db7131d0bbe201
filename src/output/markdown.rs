use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};

use crate::error::Result;
use crate::models::Article;

/// Renders the weekly digest file: one bold headline line per digested
/// article, newest first, written to `<output_dir>/<year>-Week<week>.md`.
pub struct MarkdownFormatter {
    output_dir: PathBuf,
}

impl MarkdownFormatter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn render(&self, mut articles: Vec<Article>) -> Result<PathBuf> {
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let lines: Vec<String> = articles.iter().filter_map(format_article).collect();

        let iso_week = Utc::now().iso_week();
        let filename = format!("{}-Week{}.md", iso_week.year(), iso_week.week());
        let path = self.output_dir.join(filename);

        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::write(&path, lines.concat())?;

        tracing::info!(path = %path.display(), articles = lines.len(), "saved weekly digest");
        Ok(path)
    }
}

fn format_article(article: &Article) -> Option<String> {
    let digest = article.digest.as_ref()?;
    let date = article
        .published_at
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    Some(format!(
        "**[{}]({})：{} | {}**\n\n【{}】{}\n\n",
        digest.product,
        article.link,
        digest.core_summary,
        digest.product_author,
        date,
        digest.detailed_summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Digest;
    use chrono::TimeZone;

    fn digested_article(id: i64, day: u32) -> Article {
        Article {
            id,
            feed_id: 1,
            title: format!("title {}", id),
            content: "body".to_string(),
            link: format!("https://example.com/{}", id),
            author: None,
            categories: vec![],
            published_at: Some(Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap()),
            digest: Some(Digest {
                product: format!("Product {}", id),
                product_author: "Acme".to_string(),
                core_summary: "short".to_string(),
                detailed_summary: "long".to_string(),
            }),
            token_usage: None,
        }
    }

    #[test]
    fn formats_the_digest_line() {
        let line = format_article(&digested_article(1, 24)).unwrap();
        assert_eq!(
            line,
            "**[Product 1](https://example.com/1)：short | Acme**\n\n【2026-08-24】long\n\n"
        );
    }

    #[test]
    fn undigested_articles_are_skipped() {
        let mut article = digested_article(1, 24);
        article.digest = None;
        assert!(format_article(&article).is_none());
    }

    #[test]
    fn renders_newest_first_into_the_weekly_file() {
        let dir = tempfile::tempdir().unwrap();
        let formatter = MarkdownFormatter::new(dir.path());

        let path = formatter
            .render(vec![digested_article(1, 20), digested_article(2, 25)])
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.ends_with(".md"));
        assert!(name.contains("-Week"));

        let content = std::fs::read_to_string(&path).unwrap();
        let first = content.find("Product 2").unwrap();
        let second = content.find("Product 1").unwrap();
        assert!(first < second);
    }
}
