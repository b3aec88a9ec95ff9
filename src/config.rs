//! Environment configuration.
//!
//! The API key authorizes the realtime socket, the embeddings call and chat
//! completions, so it is required up front rather than discovered missing on the
//! first request.

use std::time::Duration;

use crate::protocol::models::DEFAULT_MODEL;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TOOLS_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("No configuration supplied")]
    Missing,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub realtime_model: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Delay between `session.created` and the tool registration.
    pub tools_delay: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"..")
            .field("base_url", &self.base_url)
            .field("realtime_model", &self.realtime_model)
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("tools_delay", &self.tools_delay)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present.
    ///
    /// # Errors
    /// Returns an error if `OPENAI_API_KEY` is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if `OPENAI_API_KEY` is missing or a value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let base_url = lookup("OPENAI_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidValue("OPENAI_BASE_URL".to_string(), e.to_string()))?;

        let tools_delay = match lookup("TOOLS_DELAY_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::InvalidValue("TOOLS_DELAY_MS".to_string(), e.to_string()))?,
            None => DEFAULT_TOOLS_DELAY,
        };

        Ok(Self {
            api_key,
            base_url,
            realtime_model: lookup("REALTIME_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_model: lookup("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            tools_delay,
        })
    }
}
