use crate::error::{Error, Result};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::{Client, header::{AUTHORIZATION, HeaderValue}};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const SSE_DONE: &str = "[DONE]";

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    delta: Option<ChatDelta>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatDelta {
    content: Option<String>,
}

/// An adapter for the `OpenAI` REST endpoints the console uses (embeddings, chat completions).
#[derive(Clone, Debug)]
pub struct RestClient {
    client: Client,
    auth_header: HeaderValue,
    base_url: String,
    request_timeout: Duration,
}

impl RestClient {
    /// Create a new client for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// # Errors
    /// Returns an error if the API key results in an invalid header or client build fails.
    #[allow(clippy::result_large_err)]
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::new_with_timeouts(base_url, api_key, DEFAULT_TIMEOUT, DEFAULT_POOL_IDLE_TIMEOUT)
    }

    /// Create a new client with custom timeouts.
    ///
    /// `timeout` bounds connecting and each body read. Non-streaming requests
    /// are also bounded by it end to end; chat streams are not, so a completion
    /// may stream for as long as the server keeps sending.
    ///
    /// # Errors
    /// Returns an error if the API key results in an invalid header or client build fails.
    #[allow(clippy::result_large_err)]
    pub fn new_with_timeouts(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        pool_idle_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .pool_idle_timeout(pool_idle_timeout)
            .build()?;

        let auth_header = HeaderValue::from_str(&format!("Bearer {api_key}"))?;

        Ok(Self {
            client,
            auth_header,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: timeout,
        })
    }

    /// Fetch the embedding vector for `input`.
    ///
    /// # Errors
    /// Returns `Error::Http` on transport or status failures and
    /// `Error::MalformedResponse` when the body carries no vector.
    pub async fn create_embedding(&self, model: &str, input: &str) -> Result<Vec<f32>> {
        let res = self.client
            .post(format!("{}/embeddings", self.base_url))
            .header(AUTHORIZATION, &self.auth_header)
            .timeout(self.request_timeout)
            .json(&EmbeddingRequest { model, input })
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingResponse = res
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("embedding body: {e}")))?;

        body.data
            .into_iter()
            .next()
            .and_then(|data| data.embedding)
            .ok_or_else(|| Error::MalformedResponse("invalid embedding response structure".to_string()))
    }

    /// Stream a single-prompt chat completion as text deltas.
    ///
    /// # Errors
    /// Returns an error if the request fails before streaming starts.
    pub async fn stream_chat_completion(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            stream: true,
        };

        tracing::debug!(model, "chat completion stream");

        let res = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header(AUTHORIZATION, &self.auth_header)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        Ok(chat_deltas(res.bytes_stream()))
    }
}

/// Turn an SSE byte stream into text deltas, stopping at `[DONE]`.
fn chat_deltas<S, B>(bytes: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let events = bytes.eventsource();

    let stream = async_stream::stream! {
        futures::pin_mut!(events);

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(EventStreamError::Transport(e)) => {
                    yield Err(Error::Http(e));
                    break;
                }
                Err(e) => {
                    yield Err(Error::MalformedResponse(format!("chat stream: {e}")));
                    break;
                }
            };

            match parse_chat_data(&event.data) {
                ChatData::Done => break,
                ChatData::Delta(text) => yield Ok(text),
                ChatData::Skip => {}
            }
        }
    };

    Box::pin(stream)
}

#[derive(Debug, PartialEq, Eq)]
enum ChatData {
    Delta(String),
    Done,
    Skip,
}

fn parse_chat_data(data: &str) -> ChatData {
    let data = data.trim();
    if data == SSE_DONE {
        return ChatData::Done;
    }
    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
            .map_or(ChatData::Skip, ChatData::Delta),
        Err(err) => {
            tracing::debug!("skipping unparseable chat chunk: {err}");
            ChatData::Skip
        }
    }
}
