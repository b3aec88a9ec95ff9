use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use oai_rt_console::sdk::chat::stream_completion;
use oai_rt_console::sdk::{Embedder, OpenAiEmbedder};
use oai_rt_console::{Error, RestClient};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SSE_BODY: &str = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
data: [DONE]\n\n";

fn client(server: &MockServer) -> RestClient {
    RestClient::new(&server.uri(), "test-key").expect("client")
}

#[tokio::test]
async fn embedding_happy_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "model": "text-embedding-ada-002", "input": "AI enthusiasts" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.1, -0.2, 0.3] }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OpenAiEmbedder::new(client(&server), "text-embedding-ada-002");
    let vector = embedder.embed("AI enthusiasts").await.expect("embedding");
    assert_eq!(vector, vec![0.1, -0.2, 0.3]);
}

#[tokio::test]
async fn embedding_without_vector_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let err = client(&server).create_embedding("m", "q").await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn embedding_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server).create_embedding("m", "q").await.unwrap_err();
    assert!(matches!(err, Error::Http(_)), "{err:?}");
}

#[tokio::test]
async fn chat_stream_yields_deltas() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-3.5-turbo", "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SSE_BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let stream = client(&server)
        .stream_chat_completion("gpt-3.5-turbo", "say hello")
        .await
        .expect("stream");
    let deltas: Vec<String> = stream.map(|d| d.expect("delta")).collect().await;
    assert_eq!(deltas, vec!["Hel".to_string(), "lo".to_string()]);
}

#[tokio::test]
async fn stream_completion_reports_each_update() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(SSE_BODY, "text/event-stream"))
        .mount(&server)
        .await;

    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    let full = stream_completion(&client(&server), "gpt-3.5-turbo", "say hello", move |delta| {
        sink.lock().unwrap().push(delta.to_string());
    })
    .await
    .expect("completion");

    assert_eq!(full, "Hello");
    assert_eq!(*updates.lock().unwrap(), vec!["Hel".to_string(), "lo".to_string()]);
}

/// Serve one chunked SSE response, pausing `gap` between chunks.
async fn trickle_server(chunks: Vec<&'static str>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\nconnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        for chunk in chunks {
            tokio::time::sleep(gap).await;
            let framed = format!("{:x}\r\n{chunk}\r\n", chunk.len());
            socket.write_all(framed.as_bytes()).await.unwrap();
        }
        socket.write_all(b"0\r\n\r\n").await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn chat_stream_outlives_request_timeout() {
    let chunks = vec![
        "data: {\"choices\":[{\"delta\":{\"content\":\"one \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"two \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"three\"}}]}\n\n",
        "data: [DONE]\n\n",
    ];
    let base_url = trickle_server(chunks, Duration::from_millis(150)).await;
    let timeout = Duration::from_millis(400);
    let client = RestClient::new_with_timeouts(&base_url, "test-key", timeout, timeout).expect("client");

    let full = stream_completion(&client, "gpt-3.5-turbo", "count", |_| {}).await.expect("completion");
    assert_eq!(full, "one two three");
}

#[tokio::test]
async fn embedding_is_bounded_by_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "embedding": [0.1] }] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let timeout = Duration::from_millis(200);
    let client = RestClient::new_with_timeouts(&server.uri(), "test-key", timeout, timeout).expect("client");
    let err = client.create_embedding("m", "q").await.unwrap_err();
    match err {
        Error::Http(e) => assert!(e.is_timeout(), "{e:?}"),
        other => panic!("unexpected error: {other:?}"),
    }
}
