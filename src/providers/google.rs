use async_trait::async_trait;
use log::error;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Translator;
use crate::errors::ProviderError;

/// Client for a Google Translate v2 compatible endpoint
pub struct GoogleTranslate {
    /// HTTP client for API requests
    client: Client,
    /// Full URL requests are POSTed to
    endpoint: String,
    /// Bearer token for authentication
    api_token: String,
    /// Per-request timeout, reported in errors
    timeout_secs: u64,
}

impl std::fmt::Debug for GoogleTranslate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTranslate")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Translate request body
#[derive(Debug, Serialize)]
pub struct TranslateRequest<'a> {
    /// Text to translate
    pub q: &'a str,
    /// Source language code
    pub source: &'a str,
    /// Target language code
    pub target: &'a str,
    /// Always "text"; the names are plain strings, not HTML
    pub format: &'static str,
}

/// Translate response body
#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    pub data: TranslateData,
}

#[derive(Debug, Deserialize)]
pub struct TranslateData {
    #[serde(default)]
    pub translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
pub struct TranslatedText {
    #[serde(rename = "translatedText")]
    pub translated_text: Option<String>,
}

impl GoogleTranslate {
    /// Create a new client
    ///
    /// Uses a pooled client since every worker shares it.
    pub fn new(endpoint: impl Into<String>, api_token: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_token: api_token.into(),
            timeout_secs,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Map a finished HTTP exchange to the translated text
    pub fn parse_response(status: StatusCode, body: &str) -> Result<String, ProviderError> {
        if !status.is_success() {
            let message = body.trim().to_string();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
                StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
                _ => ProviderError::ApiError {
                    status_code: status.as_u16(),
                    message,
                },
            });
        }

        let response: TranslateResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        response
            .data
            .translations
            .into_iter()
            .next()
            .and_then(|t| t.translated_text)
            .ok_or(ProviderError::EmptyResponse)
    }
}

#[async_trait]
impl Translator for GoogleTranslate {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let request = TranslateRequest {
            q: text,
            source: source_language,
            target: target_language,
            format: "text",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else {
                    ProviderError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else {
                ProviderError::ConnectionError(format!("Failed to read response body: {}", e))
            }
        })?;

        if !status.is_success() {
            error!("Translation API error ({}): {}", status, body.trim());
        }

        Self::parse_response(status, &body)
    }
}
