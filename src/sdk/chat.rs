use futures::StreamExt;

use crate::Result;
use crate::transport::rest::RestClient;

/// Stream a chat completion for `prompt`, calling `on_update` with each text
/// delta as it arrives. Returns the full text.
///
/// # Errors
/// Returns an error if the request fails or the stream breaks part way.
pub async fn stream_completion<F>(
    client: &RestClient,
    model: &str,
    prompt: &str,
    mut on_update: F,
) -> Result<String>
where
    F: FnMut(&str) + Send,
{
    let mut stream = client.stream_chat_completion(model, prompt).await?;
    let mut full = String::new();
    while let Some(delta) = stream.next().await {
        let delta = delta?;
        if delta.is_empty() {
            continue;
        }
        on_update(&delta);
        full.push_str(&delta);
    }
    tracing::debug!(chars = full.len(), "chat completion finished");
    Ok(full)
}
