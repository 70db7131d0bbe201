mod client;
mod parser;
mod summarizer;

pub use client::{ChatClient, ChatProvider};
pub use parser::parse_digest;
pub use summarizer::Summarizer;
