/*!
 * Translation services.
 *
 * - `service`: per-value translation into every target language
 * - `retry`: bounded exponential backoff for provider calls
 * - `formatting`: cosmetic post-processing of translated text
 */

pub mod formatting;
pub mod retry;
pub mod service;

pub use formatting::{FormatterKind, TextFormatter, TitleCase, Verbatim};
pub use retry::RetryPolicy;
pub use service::{LanguageFailure, TranslationService};
