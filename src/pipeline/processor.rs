/*!
 * Translation of one fetched page, row by row.
 *
 * A row is written back only when every target language succeeded, and then
 * in a single UPDATE. Rows that fail are left exactly as they were.
 */

use indicatif::ProgressBar;
use log::{debug, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::RowFailurePolicy;
use crate::database::{Page, Row, RowStore};
use crate::errors::AppError;
use crate::translation::TranslationService;

use super::stats::RunStats;

/// What happened to the rows of one page
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageOutcome {
    /// Rows written with every target language
    pub translated: usize,
    /// Rows left untouched because a language failed
    pub skipped: usize,
    /// Rows with no source text
    pub blank: usize,
}

impl PageOutcome {
    pub fn rows(&self) -> usize {
        self.translated + self.skipped + self.blank
    }
}

enum RowResult {
    Translated,
    Skipped,
    Blank,
    Interrupted,
}

/// Translates pages and persists the results; cloned into every worker
#[derive(Clone)]
pub struct RowProcessor {
    store: Arc<dyn RowStore>,
    service: TranslationService,
    target_languages: Arc<Vec<String>>,
    policy: RowFailurePolicy,
    stats: Arc<RunStats>,
    progress: ProgressBar,
    cancel: CancellationToken,
}

impl RowProcessor {
    pub fn new(
        store: Arc<dyn RowStore>,
        service: TranslationService,
        target_languages: Vec<String>,
        policy: RowFailurePolicy,
        stats: Arc<RunStats>,
        progress: ProgressBar,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            service,
            target_languages: Arc::new(target_languages),
            policy,
            stats,
            progress,
            cancel,
        }
    }

    /// Translate and store every row of `page`, in page order.
    ///
    /// Returns early, without error, when the run is cancelled. Store
    /// failures are always returned; translation failures only under
    /// [`RowFailurePolicy::Abort`].
    pub async fn process_page(&self, page: &Page) -> Result<PageOutcome, AppError> {
        let mut outcome = PageOutcome::default();

        for row in &page.rows {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.process_row(row).await? {
                RowResult::Translated => outcome.translated += 1,
                RowResult::Skipped => outcome.skipped += 1,
                RowResult::Blank => outcome.blank += 1,
                RowResult::Interrupted => break,
            }
            self.progress.inc(1);
        }

        debug!(
            "Page at offset {}: {} translated, {} skipped, {} blank",
            page.offset, outcome.translated, outcome.skipped, outcome.blank
        );

        Ok(outcome)
    }

    async fn process_row(&self, row: &Row) -> Result<RowResult, AppError> {
        if row.source_text.trim().is_empty() {
            debug!("Row {} has no source text, leaving it untouched", row.id);
            self.stats.record_blank();
            return Ok(RowResult::Blank);
        }

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(RowResult::Interrupted),
            result = self.service.translate_all(&row.source_text, &self.target_languages) => result,
        };

        match result {
            Ok(translations) => {
                self.store.update_row(&row.id, &translations).await?;
                self.stats.record_translated();
                Ok(RowResult::Translated)
            }
            Err(failure) => match self.policy {
                RowFailurePolicy::Skip => {
                    warn!(
                        "Skipping row {} ('{}'): translation into '{}' failed: {}",
                        row.id, row.source_text, failure.language, failure.error
                    );
                    self.stats.record_skipped();
                    Ok(RowResult::Skipped)
                }
                RowFailurePolicy::Abort => Err(AppError::RowTranslation {
                    row_id: row.id.clone(),
                    language: failure.language,
                    source: failure.error,
                }),
            },
        }
    }
}
