/*!
 * Mock translator implementations for testing.
 *
 * This module provides a mock translator that simulates different behaviors:
 * - `MockTranslator::working()` - Always succeeds with `"<text>_<target>"`
 * - `MockTranslator::intermittent(n)` - Every n-th call fails with a retryable error
 * - `MockTranslator::failing()` - Always fails with an error
 * - `MockTranslator::empty()` - Answers without any translation
 * - `MockTranslator::slow(ms)` - Succeeds after a delay
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::Translator;

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
    /// Source language
    pub source_language: String,
    /// Target language
    pub target_language: String,
}

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with `"<text>_<target>"`
    Working,
    /// Fails intermittently (every Nth request) with a connection error
    Intermittent { fail_every: usize },
    /// Always fails with a non-retryable API error
    Failing,
    /// Fails only when asked for this target code
    FailingFor { target: String },
    /// Returns an empty translations list
    Empty,
    /// Succeeds after a delay (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock translator for testing pipeline behavior
#[derive(Debug)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every call made, in arrival order
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock translator that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock translator
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock translator that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that fails for a single target code
    pub fn failing_for(target: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailingFor { target: target.into() })
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Number of calls received
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every call received
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    fn translated(text: &str, target_language: &str) -> String {
        format!("{}_{}", text, target_language)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(MockRequest {
            text: text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        });

        match &self.behavior {
            MockBehavior::Working => Ok(Self::translated(text, target_language)),
            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == 0 {
                    Err(ProviderError::ConnectionError(format!("Simulated failure on request {}", count)))
                } else {
                    Ok(Self::translated(text, target_language))
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 400,
                message: "Simulated failure".to_string(),
            }),
            MockBehavior::FailingFor { target } => {
                if target == target_language {
                    Err(ProviderError::ApiError {
                        status_code: 400,
                        message: format!("Unsupported target {}", target),
                    })
                } else {
                    Ok(Self::translated(text, target_language))
                }
            }
            MockBehavior::Empty => Err(ProviderError::EmptyResponse),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(Self::translated(text, target_language))
            }
        }
    }
}
