use crate::error::Result;
use crate::protocol::models::DEFAULT_MODEL;
use reqwest::header::HeaderValue;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

#[derive(Debug)]
pub struct WsStream(WebSocketStream<MaybeTlsStream<TcpStream>>);

impl WsStream {
    pub(crate) const fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self(stream)
    }
}

impl futures::Stream for WsStream {
    type Item = std::result::Result<
        tokio_tungstenite::tungstenite::Message,
        tokio_tungstenite::tungstenite::Error,
    >;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.0).poll_next(cx)
    }
}

impl futures::Sink<tokio_tungstenite::tungstenite::Message> for WsStream {
    type Error = tokio_tungstenite::tungstenite::Error;

    fn poll_ready(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_ready(cx)
    }

    fn start_send(
        mut self: std::pin::Pin<&mut Self>,
        item: tokio_tungstenite::tungstenite::Message,
    ) -> std::result::Result<(), Self::Error> {
        std::pin::Pin::new(&mut self.0).start_send(item)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_close(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_close(cx)
    }
}

/// Realtime socket URL for a REST base URL (`https://host/v1` -> `wss://host/v1/realtime?model=..`).
///
/// # Errors
/// Returns an error if the base URL does not parse or uses an unsupported scheme.
#[allow(clippy::result_large_err)]
pub fn realtime_url(base_url: &str, model: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/realtime", base_url.trim_end_matches('/')))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(crate::Error::InvalidClientEvent(format!(
                "unsupported realtime url scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| crate::Error::InvalidClientEvent("cannot set realtime url scheme".to_string()))?;
    url.query_pairs_mut()
        .append_pair("model", model.unwrap_or(DEFAULT_MODEL));
    Ok(url)
}

/// Establish a WebSocket connection to the Realtime API.
///
/// # Errors
/// Returns an error if the handshake fails.
pub async fn connect(base_url: &str, api_key: &str, model: Option<&str>) -> Result<WsStream> {
    let url = realtime_url(base_url, model)?;
    let auth_header = HeaderValue::from_str(&format!("Bearer {api_key}"))?;

    let mut req = tokio_tungstenite::tungstenite::client::IntoClientRequest::into_client_request(
        url.as_str(),
    )?;
    let h = req.headers_mut();
    h.insert(reqwest::header::AUTHORIZATION, auth_header);
    let (ws_stream, _) = connect_async(req).await?;

    tracing::info!(host = url.host_str().unwrap_or_default(), "Connected to OpenAI Realtime");

    Ok(WsStream::new(ws_stream))
}
