use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    pub api_key: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Character budget for the text sent to the model (title + content).
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// How many repair calls to attempt before giving up on an article.
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: usize,

    /// Concurrent model calls during batch digestion.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rss-digest");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("articles.db").to_string_lossy().to_string()
}

fn default_output_dir() -> String {
    "./archive".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_input_chars() -> usize {
    3500
}

fn default_max_repair_attempts() -> usize {
    3
}

fn default_concurrency() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            output_dir: default_output_dir(),
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            max_input_chars: default_max_input_chars(),
            max_repair_attempts: default_max_repair_attempts(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rss-digest")
            .join("config.toml")
    }

    /// Overlay provider settings from the environment. Called once at
    /// startup; the pipeline itself never reads environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            self.api_base = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.model = model;
        }
    }
}
