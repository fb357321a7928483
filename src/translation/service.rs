/*!
 * Translation of a single value into the configured target languages.
 *
 * Wraps a `Translator` with the language mapper, a per-call deadline,
 * bounded retries and the output formatter.
 */

use std::sync::Arc;
use std::time::Duration;

use crate::database::models::RowTranslations;
use crate::errors::ProviderError;
use crate::language_utils::map_language_code;
use crate::providers::Translator;

use super::formatting::TextFormatter;
use super::retry::RetryPolicy;

/// The language that could not be translated, and why
#[derive(Debug)]
pub struct LanguageFailure {
    pub language: String,
    pub error: ProviderError,
}

/// Main translation service shared by all workers
#[derive(Clone)]
pub struct TranslationService {
    translator: Arc<dyn Translator>,
    formatter: Arc<dyn TextFormatter>,
    retry: RetryPolicy,
    source_language: String,
    timeout: Duration,
}

impl TranslationService {
    /// Create a new translation service
    pub fn new(
        translator: Arc<dyn Translator>,
        formatter: Box<dyn TextFormatter>,
        retry: RetryPolicy,
        source_language: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            translator,
            formatter: Arc::from(formatter),
            retry,
            source_language: source_language.into(),
            timeout,
        }
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// Translate `text` into one internal language tag
    pub async fn translate(&self, text: &str, tag: &str) -> Result<String, ProviderError> {
        let target = map_language_code(tag);
        let source = map_language_code(&self.source_language);
        let timeout_secs = self.timeout.as_secs();

        let translated = self
            .retry
            .run(&format!("Translating into '{}'", tag), || async {
                tokio::time::timeout(self.timeout, self.translator.translate(text, source, target))
                    .await
                    .unwrap_or(Err(ProviderError::Timeout(timeout_secs)))
            })
            .await?;

        Ok(self.formatter.format(&translated))
    }

    /// Translate `text` into every tag, in order.
    ///
    /// Stops at the first language that fails; partial results are dropped.
    pub async fn translate_all(&self, text: &str, tags: &[String]) -> Result<RowTranslations, LanguageFailure> {
        let mut translations = RowTranslations::with_capacity(tags.len());

        for tag in tags {
            match self.translate(text, tag).await {
                Ok(translated) => translations.insert(tag.as_str(), translated),
                Err(error) => {
                    return Err(LanguageFailure {
                        language: tag.clone(),
                        error,
                    });
                }
            }
        }

        Ok(translations)
    }
}
