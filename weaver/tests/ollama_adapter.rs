//! Ollama adapter against a local stub HTTP server

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use weaver::config::{ApiMode, LlmConfig};
use weaver::llm::{CompletionRequest, LlmClient, LlmError, Message, OllamaClient, SKIP_BROWSER_WARNING_HEADER};

/// Read one HTTP request (headers plus content-length body) as text
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let head = text[..end].to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Serve one canned response; the handle yields the captured request
async fn serve_once(status: &'static str, content_type: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });
    (url, handle)
}

/// Accept one connection and never answer
async fn serve_silent() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    (url, handle)
}

fn client(base_url: &str, api: ApiMode) -> OllamaClient {
    let config = LlmConfig {
        api,
        base_url: base_url.to_string(),
        model: "qwen2.5-coder:7b".to_string(),
        timeout_ms: 2_000,
        probe_timeout_ms: 2_000,
        ..LlmConfig::default()
    };
    OllamaClient::from_config(&config).unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest::new("You are a coding assistant.", vec![Message::user("hello")])
}

#[tokio::test]
async fn chat_reply_is_decoded_and_header_sent() {
    let body = r#"{"model":"qwen2.5-coder:7b","message":{"role":"assistant","content":"{\"action\":\"finish\",\"message\":\"hi\"}"},"done":true,"prompt_eval_count":12,"eval_count":7}"#;
    let (url, server) = serve_once("200 OK", "application/json", body.to_string()).await;

    let response = client(&url, ApiMode::Chat)
        .complete(request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.content, r#"{"action":"finish","message":"hi"}"#);
    assert_eq!(response.prompt_tokens, Some(12));
    assert_eq!(response.completion_tokens, Some(7));

    let captured = server.await.unwrap();
    assert!(captured.starts_with("POST /api/chat "));
    assert!(
        captured
            .to_ascii_lowercase()
            .contains(&format!("{}: true", SKIP_BROWSER_WARNING_HEADER))
    );
    assert!(captured.contains(r#""stream":false"#));
    assert!(captured.contains(r#""role":"system""#));
}

#[tokio::test]
async fn generate_reply_is_decoded() {
    let body = r#"{"model":"qwen2.5-coder:7b","response":"plain text","done":true}"#;
    let (url, server) = serve_once("200 OK", "application/json", body.to_string()).await;

    let response = client(&url, ApiMode::Generate)
        .complete(request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.content, "plain text");
    assert_eq!(response.prompt_tokens, None);
    let captured = server.await.unwrap();
    assert!(captured.starts_with("POST /api/generate "));
    assert!(captured.contains("User: hello"));
}

#[tokio::test]
async fn list_models_reads_tags() {
    let body = r#"{"models":[{"name":"qwen2.5-coder:7b"},{"name":"llama3:8b"}]}"#;
    let (url, server) = serve_once("200 OK", "application/json", body.to_string()).await;

    let models = client(&url, ApiMode::Chat).list_models().await.unwrap();

    assert_eq!(models, vec!["qwen2.5-coder:7b".to_string(), "llama3:8b".to_string()]);
    assert!(server.await.unwrap().starts_with("GET /api/tags "));
}

#[tokio::test]
async fn html_interstitial_is_classified() {
    let body = "<!DOCTYPE html><html><body>You are about to visit ngrok-free.app</body></html>".to_string();
    let (url, _server) = serve_once("200 OK", "text/html", body).await;

    let err = client(&url, ApiMode::Chat)
        .complete(request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::TunnelInterstitial { status: 200 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn http_error_keeps_status_and_body() {
    let body = r#"{"error":"model 'qwen2.5-coder:7b' not found"}"#.to_string();
    let (url, _server) = serve_once("404 Not Found", "application/json", body).await;

    let err = client(&url, ApiMode::Chat)
        .complete(request(), &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        LlmError::ApiError { status, message } => {
            assert_eq!(*status, 404);
            assert!(message.contains("not found"));
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn non_json_body_is_invalid_response() {
    let (url, _server) = serve_once("200 OK", "text/plain", "ok".to_string()).await;

    let err = client(&url, ApiMode::Chat)
        .complete(request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::InvalidResponse(_)));
}

#[tokio::test]
async fn closed_port_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&url, ApiMode::Chat).list_models().await.unwrap_err();

    assert!(matches!(err, LlmError::Unreachable { .. }));
    assert!(err.is_network());
}

#[tokio::test]
async fn slow_server_times_out() {
    let (url, _server) = serve_silent().await;
    let config = LlmConfig {
        base_url: url,
        timeout_ms: 200,
        ..LlmConfig::default()
    };
    let client = OllamaClient::from_config(&config).unwrap();

    let err = client
        .complete(request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Timeout(d) if d == Duration::from_millis(200)));
}

#[tokio::test]
async fn cancel_interrupts_pending_request() {
    let (url, _server) = serve_silent().await;
    let client = client(&url, ApiMode::Chat);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client.complete(request(), &cancel).await.unwrap_err();
    assert!(matches!(err, LlmError::Cancelled));
}
