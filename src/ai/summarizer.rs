use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::ai::client::ChatProvider;
use crate::ai::parser::parse_digest;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Article, Digest, TokenUsage};

const DIGEST_PROMPT: &str = r#"Role：你是一名人工智能领域的科学家
Task：用户即将输入一段文本，请你以最简洁的语言总结"产品名称"、"单位"、"成果"、"详情" 四项内容，分别以 JSON 形式输出
Format：JSON
Language：中文
Notice：1. 产品名称应是产品名词、事件名或研究名称，若文中没有产品，请以朴素的陈述句给出研究结论。2. 单位是应是企业、学校或政府机构。如没有找到，请写"未知" 3. 成果以一个短标题的形式总结 4. 详情用两句话描述，100字左右"#;

const REPAIR_PROMPT: &str =
    "你是一名软件工程师，用户输入的json文本因有误格式而无法序列化，请你协助改正";

/// Runs the digestion pipeline for one or many articles: model call, parse
/// with bounded repair, digest + token-usage write-back. Failures are
/// contained per article; an article that could not be digested comes back
/// exactly as it went in.
pub struct Summarizer {
    provider: Arc<dyn ChatProvider>,
    max_input_chars: usize,
    max_repair_attempts: usize,
    concurrency: usize,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn ChatProvider>, config: &Config) -> Self {
        Self::with_limits(
            provider,
            config.max_input_chars,
            config.max_repair_attempts,
            config.concurrency,
        )
    }

    pub fn with_limits(
        provider: Arc<dyn ChatProvider>,
        max_input_chars: usize,
        max_repair_attempts: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            max_input_chars,
            max_repair_attempts,
            concurrency: concurrency.max(1),
        }
    }

    /// Digest a single article. On success the returned article carries the
    /// digest fields and the summed token usage of every call made for it;
    /// on any failure the input article is returned unmodified.
    pub async fn digest_article(&self, article: Article) -> Article {
        match self.try_digest(&article).await {
            Ok((digest, usage)) => {
                tracing::info!(
                    title = %article.title,
                    total_tokens = usage.total_tokens,
                    "summarized article"
                );
                let mut article = article;
                article.digest = Some(digest);
                article.token_usage = Some(article.token_usage.unwrap_or_default() + usage);
                article
            }
            Err(e) => {
                tracing::error!(title = %article.title, error = %e, "summarization failed");
                article
            }
        }
    }

    /// Digest a batch concurrently. Results arrive in completion order, not
    /// input order; callers persist by article id so ordering is free to
    /// vary. A failing article never affects its siblings.
    pub async fn digest_batch(&self, articles: Vec<Article>) -> Vec<Article> {
        if articles.len() == 1 {
            // no point spinning up the pool for one article
            let article = articles.into_iter().next().unwrap();
            return vec![self.digest_article(article).await];
        }

        stream::iter(articles)
            .map(|article| self.digest_article(article))
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn try_digest(&self, article: &Article) -> Result<(Digest, TokenUsage)> {
        let input = build_input(&article.title, &article.content, self.max_input_chars);

        let mut usage = TokenUsage::default();
        let (raw, call_usage) = self.provider.chat(DIGEST_PROMPT, &input).await?;
        usage += call_usage;

        let digest = self.parse_with_repair(raw, &mut usage).await?;
        Ok((digest, usage))
    }

    /// Parse the raw response, feeding unparseable output back through the
    /// model up to `max_repair_attempts` times. Repair usage is added to the
    /// running total so the article is billed for its whole cost.
    async fn parse_with_repair(&self, mut raw: String, usage: &mut TokenUsage) -> Result<Digest> {
        let mut attempts = 0;
        loop {
            match parse_digest(&raw) {
                Ok(digest) => return Ok(digest),
                Err(e) if e.is_repairable() => {
                    if attempts >= self.max_repair_attempts {
                        return Err(AppError::RepairExhausted { attempts });
                    }
                    attempts += 1;
                    tracing::warn!(
                        attempt = attempts,
                        max = self.max_repair_attempts,
                        error = %e,
                        "model output not parseable, requesting repair"
                    );
                    let (fixed, repair_usage) = self.provider.chat(REPAIR_PROMPT, &raw).await?;
                    *usage += repair_usage;
                    raw = fixed;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Title and body joined and cut to the character budget. Cut on a char
/// boundary; the content is largely CJK so a byte slice would panic.
fn build_input(title: &str, content: &str, max_chars: usize) -> String {
    let input = format!("{}\n{}", title, content);
    match input.char_indices().nth(max_chars) {
        Some((byte_index, _)) => input[..byte_index].to_string(),
        None => input,
    }
}
