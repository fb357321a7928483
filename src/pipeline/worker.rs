/*!
 * A single worker: allocate an offset, fetch that page, translate it, and
 * go around again while pages may remain.
 */

use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::database::{Page, RowStore};
use crate::errors::AppError;

use super::allocator::OffsetAllocator;
use super::processor::{PageOutcome, RowProcessor};
use super::stats::RunStats;

/// What one worker did over the whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub pages_fetched: usize,
    /// Offsets this worker fetched, in the order it fetched them
    pub offsets: Vec<i64>,
    pub rows_translated: usize,
    pub rows_skipped: usize,
    pub rows_blank: usize,
    /// Stopped early because the run was cancelled
    pub cancelled: bool,
}

impl WorkerReport {
    fn absorb(&mut self, outcome: PageOutcome) {
        self.rows_translated += outcome.translated;
        self.rows_skipped += outcome.skipped;
        self.rows_blank += outcome.blank;
    }
}

#[derive(Debug)]
enum WorkerState {
    Allocating,
    Fetching { offset: i64 },
    Processing { page: Page },
    Rescheduling { offset: i64 },
    Done,
}

pub struct Worker {
    id: usize,
    allocator: Arc<OffsetAllocator>,
    store: Arc<dyn RowStore>,
    processor: RowProcessor,
    stats: Arc<RunStats>,
    total_rows: i64,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        allocator: Arc<OffsetAllocator>,
        store: Arc<dyn RowStore>,
        processor: RowProcessor,
        stats: Arc<RunStats>,
        total_rows: i64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            allocator,
            store,
            processor,
            stats,
            total_rows,
            cancel,
        }
    }

    /// Run until no pages remain, the run is cancelled, or a fatal error occurs
    pub async fn run(self) -> Result<WorkerReport, AppError> {
        let step = self.allocator.step();
        let mut report = WorkerReport {
            worker_id: self.id,
            ..Default::default()
        };
        let mut state = WorkerState::Allocating;

        info!("Worker #{} started", self.id);

        loop {
            if self.cancel.is_cancelled() && !matches!(state, WorkerState::Done) {
                debug!("Worker #{} cancelled", self.id);
                report.cancelled = true;
                state = WorkerState::Done;
            }

            state = match state {
                WorkerState::Allocating => {
                    let offset = self.allocator.allocate();
                    if offset < self.total_rows {
                        debug!("Worker #{} allocated offset {}", self.id, offset);
                        WorkerState::Fetching { offset }
                    } else {
                        debug!(
                            "Worker #{} allocated offset {} past the last row ({}), stopping",
                            self.id, offset, self.total_rows
                        );
                        WorkerState::Done
                    }
                }
                WorkerState::Fetching { offset } => {
                    let page = self.store.fetch_page(offset, step).await?;
                    debug!("Worker #{} fetched {} rows at offset {}", self.id, page.len(), offset);
                    self.stats.record_page();
                    report.pages_fetched += 1;
                    report.offsets.push(offset);
                    WorkerState::Processing { page }
                }
                WorkerState::Processing { page } => {
                    let outcome = self.processor.process_page(&page).await?;
                    report.absorb(outcome);
                    WorkerState::Rescheduling { offset: page.offset }
                }
                WorkerState::Rescheduling { offset } => {
                    if offset + step < self.total_rows {
                        WorkerState::Allocating
                    } else {
                        debug!("Worker #{} finished the last page at offset {}", self.id, offset);
                        WorkerState::Done
                    }
                }
                WorkerState::Done => break,
            };
        }

        info!(
            "Worker #{} done: {} pages, {} rows translated, {} skipped",
            self.id, report.pages_fetched, report.rows_translated, report.rows_skipped
        );

        Ok(report)
    }
}
