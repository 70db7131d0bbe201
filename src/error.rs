use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("Feed parse error: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Model API error: {0}")]
    ModelApi(String),

    /// Model output that did not decode as JSON. Repair-eligible.
    #[error("Digest output is not valid JSON: {0}")]
    DigestParse(String),

    /// Valid JSON missing one of the expected digest keys. Terminal:
    /// a repair call fixes formatting, it cannot invent missing content.
    #[error("Digest output missing field '{0}'")]
    MissingDigestField(&'static str),

    #[error("Digest output still unparseable after {attempts} repair attempts")]
    RepairExhausted { attempts: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Whether a repair call is worth attempting for this error.
    pub fn is_repairable(&self) -> bool {
        matches!(self, AppError::DigestParse(_))
    }
}
