use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::transport::rest::RestClient;
use crate::{Error, RealtimeClient, Result};

use super::console::{Console, ConsoleOptions};
use super::embed::{Embedder, OpenAiEmbedder};
use super::tools::ToolRegistry;
use super::transport::Transport;

pub struct ConsoleBuilder {
    config: Option<Config>,
    options: ConsoleOptions,
}

impl ConsoleBuilder {
    /// A builder with the four console tools registered.
    #[must_use]
    pub fn new() -> Self {
        Self { config: None, options: ConsoleOptions::default() }
    }

    /// Use `config` for the connection, the embedding model and the tool delay.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.options.tools_delay = config.tools_delay;
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn tools(mut self, registry: ToolRegistry) -> Self {
        self.options.registry = registry;
        self
    }

    #[must_use]
    pub const fn tools_delay(mut self, delay: Duration) -> Self {
        self.options.tools_delay = delay;
        self
    }

    /// Override the embedding source for the matching game.
    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.options.embedder = Some(embedder);
        self
    }

    /// Transcript text shown before the model says anything.
    #[must_use]
    pub fn greeting(mut self, text: impl Into<String>) -> Self {
        self.options.greeting = Some(text.into());
        self
    }

    #[must_use]
    pub const fn log_capacity(mut self, capacity: usize) -> Self {
        self.options.log_capacity = capacity;
        self
    }

    /// Run the console over an existing transport.
    pub fn start(self, transport: Box<dyn Transport>) -> Console {
        Console::from_transport(transport, self.options)
    }

    /// Connect to the realtime endpoint described by the configuration and
    /// start the console. Unless an embedder was set, embeddings come from the
    /// REST endpoint of the same base URL.
    ///
    /// # Errors
    /// Returns an error if no configuration was given or the connection fails.
    pub async fn connect_ws(mut self) -> Result<Console> {
        let config = self
            .config
            .take()
            .ok_or(Error::Config(ConfigError::Missing))?;

        if self.options.embedder.is_none() {
            let rest = RestClient::new(&config.base_url, &config.api_key)?;
            self.options.embedder =
                Some(Arc::new(OpenAiEmbedder::new(rest, config.embedding_model.clone())));
        }

        let client =
            RealtimeClient::connect(&config.base_url, &config.api_key, Some(&config.realtime_model))
                .await?;
        Ok(self.start(Box::new(client)))
    }
}

impl Default for ConsoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
