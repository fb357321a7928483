/*!
 * Google Translate client against a local HTTP stub
 */

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use dbtranslate::errors::ProviderError;
use dbtranslate::providers::google::GoogleTranslate;
use dbtranslate::providers::Translator;

/// Serve exactly one request with a canned response; the raw request is sent back on the channel
async fn one_shot_server(status_line: &'static str, body: &'static str, delay: Duration) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        // Read headers, then the body announced by Content-Length
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&buffer).to_string());

        tokio::time::sleep(delay).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (format!("http://{}/language/translate/v2", address), rx)
}

#[tokio::test]
async fn test_googleTranslate_withSuccessfulResponse_shouldPostJsonWithBearerToken() {
    let (endpoint, request_rx) = one_shot_server(
        "200 OK",
        r#"{"data":{"translations":[{"translatedText":"тир из лука"}]}}"#,
        Duration::ZERO,
    )
    .await;
    let client = GoogleTranslate::new(endpoint, "token-123", 5);

    let translated = client.translate("archery", "en", "ru").await.unwrap();
    let request = request_rx.await.unwrap();

    assert_eq!(translated, "тир из лука");
    assert!(request.starts_with("POST /language/translate/v2 HTTP/1.1"));
    assert!(request.to_lowercase().contains("authorization: bearer token-123"));
    assert!(request.contains(r#""q":"archery""#));
    assert!(request.contains(r#""target":"ru""#));
    assert!(request.contains(r#""format":"text""#));
}

#[tokio::test]
async fn test_googleTranslate_withUnauthorized_shouldReturnAuthenticationError() {
    let (endpoint, _rx) = one_shot_server("401 Unauthorized", r#"{"error":"invalid token"}"#, Duration::ZERO).await;
    let client = GoogleTranslate::new(endpoint, "expired", 5);

    let err = client.translate("archery", "en", "fr").await.unwrap_err();

    assert!(matches!(err, ProviderError::AuthenticationError(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_googleTranslate_withServerError_shouldBeRetryable() {
    let (endpoint, _rx) = one_shot_server("503 Service Unavailable", r#"{"error":"backend"}"#, Duration::ZERO).await;
    let client = GoogleTranslate::new(endpoint, "token", 5);

    let err = client.translate("archery", "en", "fr").await.unwrap_err();

    assert!(matches!(err, ProviderError::ApiError { status_code: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_googleTranslate_withSlowServer_shouldTimeOut() {
    let (endpoint, _rx) = one_shot_server(
        "200 OK",
        r#"{"data":{"translations":[{"translatedText":"late"}]}}"#,
        Duration::from_secs(3),
    )
    .await;
    let client = GoogleTranslate::new(endpoint, "token", 1);

    let err = client.translate("archery", "en", "fr").await.unwrap_err();

    assert!(matches!(err, ProviderError::Timeout(1)));
}

#[tokio::test]
async fn test_googleTranslate_withNothingListening_shouldReturnConnectionError() {
    // Bind then drop to get a port that refuses connections
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = GoogleTranslate::new(format!("http://{}/translate", address), "token", 2);
    let err = client.translate("archery", "en", "fr").await.unwrap_err();

    assert!(matches!(err, ProviderError::ConnectionError(_)));
}
