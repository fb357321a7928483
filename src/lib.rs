/*!
 * # dbtranslate
 *
 * Batch translation of a text column in a SQL table into several target
 * languages, using a pool of concurrent workers that page through the table.
 *
 * ## Features
 *
 * - Concurrent workers sharing a single page cursor, each page fetched once
 * - Google Translate compatible HTTP client with bearer authentication
 * - Bounded retries with exponential backoff and per-call timeouts
 * - All-or-nothing row updates: every target language written in one statement
 * - Configuration from a JSON file and `DBTRNSLT_*` environment variables
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: Row store seam with SQLite and PostgreSQL implementations
 * - `providers`: Translation service clients:
 *   - `providers::google`: Google Translate v2 client
 *   - `providers::mock`: Scriptable translator for tests
 * - `translation`: Retry, timeout and formatting around a provider
 * - `pipeline`: Offset allocator, workers and the run driver
 * - `language_utils`: Language tag mapping and ISO lookups
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod pipeline;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{PostgresRowStore, RowStore, SqliteRowStore, TableLayout};
pub use errors::{AppError, ConfigError, CoordinationError, ProviderError, StoreError};
pub use language_utils::{get_language_name, map_language_code};
pub use pipeline::{OffsetAllocator, PipelineDriver, PipelineOptions, RunReport};
pub use providers::Translator;
pub use translation::TranslationService;
