/*!
 * Run orchestration: count the rows, launch the workers, collect their
 * reports.
 */

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::{PipelineSettings, RowFailurePolicy};
use crate::database::RowStore;
use crate::errors::{AppError, ConfigError, CoordinationError};
use crate::translation::TranslationService;

use super::allocator::OffsetAllocator;
use super::processor::RowProcessor;
use super::stats::{RunStats, StatsSnapshot};
use super::worker::{Worker, WorkerReport};

/// Validated worker pool settings
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers_count: usize,
    pub offset_step: i64,
    pub stagger: Duration,
    pub on_row_failure: RowFailurePolicy,
    pub show_progress: bool,
}

impl PipelineOptions {
    pub fn new(workers_count: usize, offset_step: i64) -> Self {
        Self {
            workers_count,
            offset_step,
            stagger: Duration::from_millis(50),
            on_row_failure: RowFailurePolicy::Skip,
            show_progress: false,
        }
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn with_failure_policy(mut self, policy: RowFailurePolicy) -> Self {
        self.on_row_failure = policy;
        self
    }

    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, ConfigError> {
        let workers_count = match settings.workers_count {
            Some(n) if n >= 1 => n,
            Some(n) => return Err(ConfigError::invalid("pipeline.workers_count", n.to_string(), "must be at least 1")),
            None => return Err(ConfigError::Missing("pipeline.workers_count".to_string())),
        };
        let offset_step = match settings.offset_step {
            Some(n) if n >= 1 => n,
            Some(n) => return Err(ConfigError::invalid("pipeline.offset_step", n.to_string(), "must be at least 1")),
            None => return Err(ConfigError::Missing("pipeline.offset_step".to_string())),
        };

        Ok(Self {
            workers_count,
            offset_step,
            stagger: Duration::from_millis(settings.stagger_ms),
            on_row_failure: settings.on_row_failure,
            show_progress: settings.show_progress,
        })
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub total_rows: i64,
    pub offsets_issued: u64,
    pub stats: StatsSnapshot,
    pub workers: Vec<WorkerReport>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn pages_fetched(&self) -> usize {
        self.workers.iter().map(|w| w.pages_fetched).sum()
    }

    /// Every fetched offset across all workers, sorted
    pub fn fetched_offsets(&self) -> Vec<i64> {
        let mut offsets: Vec<i64> = self.workers.iter().flat_map(|w| w.offsets.iter().copied()).collect();
        offsets.sort_unstable();
        offsets
    }
}

/// Drives a full translation run over the row store
pub struct PipelineDriver {
    store: Arc<dyn RowStore>,
    service: TranslationService,
    target_languages: Vec<String>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl PipelineDriver {
    pub fn new(
        store: Arc<dyn RowStore>,
        service: TranslationService,
        target_languages: Vec<String>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            service,
            target_languages,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops every worker of this driver when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self) -> Result<RunReport, AppError> {
        let run_id = Uuid::new_v4();
        let workers_count = self.options.workers_count;
        let step = self.options.offset_step;

        if workers_count == 0 {
            return Err(ConfigError::Missing("pipeline.workers_count".to_string()).into());
        }
        if step < 1 {
            return Err(ConfigError::invalid("pipeline.offset_step", step.to_string(), "must be at least 1").into());
        }

        let total_rows = self.store.count_in_scope().await?;
        info!(
            "Run {}: {} rows in scope, {} workers, page size {}, {} -> [{}]",
            run_id,
            total_rows,
            workers_count,
            step,
            self.service.source_language(),
            self.target_languages.join(", ")
        );

        let allocator = Arc::new(OffsetAllocator::new(step));
        let stats = Arc::new(RunStats::new());
        let progress = self.progress_bar(total_rows);
        let processor = RowProcessor::new(
            self.store.clone(),
            self.service.clone(),
            self.target_languages.clone(),
            self.options.on_row_failure,
            stats.clone(),
            progress.clone(),
            self.cancel.clone(),
        );

        let mut handles: Vec<(usize, JoinHandle<Result<WorkerReport, AppError>>)> = Vec::with_capacity(workers_count);
        for worker_id in 0..workers_count {
            if worker_id > 0 && !self.options.stagger.is_zero() {
                tokio::time::sleep(self.options.stagger).await;
            }

            let worker = Worker::new(
                worker_id,
                allocator.clone(),
                self.store.clone(),
                processor.clone(),
                stats.clone(),
                total_rows,
                self.cancel.clone(),
            );
            let cancel = self.cancel.clone();

            handles.push((
                worker_id,
                tokio::spawn(async move {
                    let result = worker.run().await;
                    if result.is_err() {
                        // Siblings stop at their next suspend point
                        cancel.cancel();
                    }
                    result
                }),
            ));
        }

        let results = join_all(
            handles
                .into_iter()
                .map(|(worker_id, handle)| async move { (worker_id, handle.await) }),
        )
        .await;

        let mut reports = Vec::with_capacity(workers_count);
        let mut first_error: Option<AppError> = None;

        for (worker_id, joined) in results {
            let failure = match joined {
                Ok(Ok(report)) => {
                    reports.push(report);
                    continue;
                }
                Ok(Err(e)) => AppError::Worker {
                    worker_id,
                    source: Box::new(e),
                },
                Err(join_error) => CoordinationError::WorkerPanicked {
                    worker_id,
                    message: join_error.to_string(),
                }
                .into(),
            };

            error!("{}", failure);
            if first_error.is_none() {
                first_error = Some(failure);
            }
        }

        progress.finish_and_clear();

        if let Some(e) = first_error {
            return Err(e);
        }

        let snapshot = stats.snapshot();
        let cancelled = reports.iter().any(|r| r.cancelled);
        if cancelled {
            warn!("Run {} cancelled: {}", run_id, snapshot.summary());
        } else {
            info!("Run {} complete: {}", run_id, snapshot.summary());
        }

        Ok(RunReport {
            run_id,
            total_rows,
            offsets_issued: allocator.issued(),
            stats: snapshot,
            workers: reports,
            cancelled,
        })
    }

    fn progress_bar(&self, total_rows: i64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(total_rows.max(0) as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");
        progress_bar
    }
}
