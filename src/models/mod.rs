mod article;
mod digest;

pub use article::{Article, Feed, NewArticle, NewFeed};
pub use digest::{Digest, TokenUsage};
