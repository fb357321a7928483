/*!
 * Concurrent paging over the row store.
 *
 * - `allocator`: the shared page cursor
 * - `worker`: the allocate, fetch, process loop
 * - `processor`: per-row translation and write-back
 * - `driver`: worker launch, join and reporting
 * - `stats`: run-wide counters
 */

pub mod allocator;
pub mod driver;
pub mod processor;
pub mod stats;
pub mod worker;

pub use allocator::OffsetAllocator;
pub use driver::{PipelineDriver, PipelineOptions, RunReport};
pub use processor::{PageOutcome, RowProcessor};
pub use stats::{RunStats, StatsSnapshot};
pub use worker::{Worker, WorkerReport};
