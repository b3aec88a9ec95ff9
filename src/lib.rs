#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod error;
pub mod protocol;
pub mod sdk;
pub mod transport;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use protocol::client_events::ClientEvent;
pub use protocol::models::{
    ContentPart, ConversationMode, Item, ItemStatus, Response, ResponseConfig, ResponseStatus, Role,
    Session, SessionUpdate, Tool, ToolChoice, ToolChoiceMode,
};
pub use protocol::server_events::ServerEvent;
pub use sdk::{
    Console, ConsoleBuilder, ConsoleHandle, ConsoleView, Embedder, EventLog, PanelView, ToolKind,
    ToolPanel, ToolRegistry, ToolView, Transcript, Transport,
};
pub use transport::rest::RestClient;

use futures::{SinkExt, StreamExt};
use serde_json::from_str;
use tokio_tungstenite::tungstenite::protocol::Message;
use transport::ws::WsStream;

const TRACE_LOG_MAX_BYTES: usize = 1024;
const TRACE_TRUNCATE_SUFFIX: &str = "... (truncated)";

/// A WebSocket client for the `OpenAI` Realtime API.
///
/// Thread safety: `RealtimeClient` is `Send` but not `Sync` because the underlying
/// WebSocket stream is not `Sync`.
#[must_use]
pub struct RealtimeClient {
    stream: WsStream,
}

impl RealtimeClient {
    /// Connect to the realtime endpoint under `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// # Errors
    /// Returns an error if the connection fails or if the URL is invalid.
    pub async fn connect(base_url: &str, api_key: &str, model: Option<&str>) -> Result<Self> {
        let stream = transport::ws::connect(base_url, api_key, model).await?;
        Ok(Self { stream })
    }

    /// Send a client event to the server.
    ///
    /// # Errors
    /// Returns an error if the event is invalid, serialization fails or the WebSocket send fails.
    pub async fn send(&mut self, event: ClientEvent) -> Result<()> {
        validate_client_event(&event)?;
        let json = serde_json::to_string(&event)?;
        tracing::trace!("Sending event: {}", safe_truncate(&json, TRACE_LOG_MAX_BYTES));
        self.stream.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Receive the next server event. `None` means the server closed the socket.
    ///
    /// # Errors
    /// Returns an error if the WebSocket fails or a frame is not a JSON object.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        while let Some(msg) = self.stream.next().await {
            match msg? {
                Message::Text(text) => {
                    tracing::trace!("Received event: {}", safe_truncate(&text, TRACE_LOG_MAX_BYTES));
                    return Ok(Some(from_str::<ServerEvent>(&text)?));
                }
                Message::Close(_) => {
                    tracing::info!("WebSocket connection closed by server");
                    return Ok(None);
                }
                Message::Ping(payload) => {
                    tracing::debug!("Received Ping, sending Pong");
                    self.stream.send(Message::Pong(payload)).await?;
                }
                _ => (),
            }
        }
        Ok(None)
    }
}

fn safe_truncate(s: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if s.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(s);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(format!(
        "{} {} {} bytes",
        &s[..end],
        TRACE_TRUNCATE_SUFFIX,
        s.len() - end
    ))
}

/// Reject outbound events the server would refuse anyway.
///
/// # Errors
/// Returns `Error::InvalidClientEvent` describing the first problem found.
#[allow(clippy::result_large_err)]
pub fn validate_client_event(event: &ClientEvent) -> Result<()> {
    match event {
        ClientEvent::SessionUpdate { session, .. } => {
            if let Some(tools) = &session.tools {
                validate_tools(tools)?;
            }
        }
        ClientEvent::ResponseCreate { response: Some(config), .. } => {
            validate_response_config(config.as_ref())?;
        }
        _ => {}
    }
    Ok(())
}

#[allow(clippy::result_large_err)]
fn validate_response_config(config: &ResponseConfig) -> Result<()> {
    if config.instructions.as_deref().is_some_and(|text| text.trim().is_empty()) {
        return Err(Error::InvalidClientEvent(
            "response.create instructions must not be empty".to_string(),
        ));
    }
    if let Some(tools) = &config.tools {
        validate_tools(tools)?;
    }
    Ok(())
}

#[allow(clippy::result_large_err)]
fn validate_tools(tools: &[Tool]) -> Result<()> {
    for tool in tools {
        let Tool::Function { name, parameters, .. } = tool;
        if name.trim().is_empty() {
            return Err(Error::InvalidClientEvent("function tool name must not be empty".to_string()));
        }
        let is_object_schema = parameters.is_object()
            && parameters.get("type").is_none_or(|kind| kind == "object");
        if !is_object_schema {
            return Err(Error::InvalidClientEvent(format!(
                "function tool {name} parameters must be an object schema"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "ééééé";
        let out = safe_truncate(text, 3);
        assert!(out.starts_with('é'));
        assert!(out.contains(TRACE_TRUNCATE_SUFFIX));
        assert_eq!(safe_truncate("short", 10), "short");
    }
}
