/*!
 * Provider implementations for the translation service.
 *
 * - `google`: Google Translate v2 style JSON endpoint with bearer auth
 * - `mock`: in-process translator for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all translation providers
///
/// One call translates one string. Implementations are shared by every
/// worker, so they must tolerate concurrent calls.
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate `text` from `source_language` into `target_language`
    ///
    /// # Arguments
    /// * `text` - The text to translate
    /// * `source_language` - Service code of the source language
    /// * `target_language` - Service code of the target language
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;
}

pub mod google;
pub mod mock;
