// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dbtranslate::app_config::{self, Config, DatabaseBackend, RowFailurePolicy};
use dbtranslate::database::{PostgresRowStore, RowStore, SqliteRowStore};
use dbtranslate::errors::CoordinationError;
use dbtranslate::pipeline::{PipelineDriver, PipelineOptions};
use dbtranslate::providers::google::GoogleTranslate;
use dbtranslate::translation::{FormatterKind, TranslationService};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for RowFailurePolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliRowFailure {
    Skip,
    Abort,
}

impl From<CliRowFailure> for RowFailurePolicy {
    fn from(cli_policy: CliRowFailure) -> Self {
        match cli_policy {
            CliRowFailure::Skip => RowFailurePolicy::Skip,
            CliRowFailure::Abort => RowFailurePolicy::Abort,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate every in-scope row of the configured table
    Run(RunArgs),

    /// Generate shell completions for dbtranslate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Configuration file path (JSON)
    #[arg(short, long, env = "DBTRNSLT_CONFIG")]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Rows per page
    #[arg(short, long)]
    step: Option<i64>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// What to do with a row that cannot be translated
    #[arg(long, value_enum)]
    on_row_failure: Option<CliRowFailure>,

    /// Store translations exactly as returned instead of title-casing them
    #[arg(long)]
    verbatim: bool,

    /// Do not draw the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the number of in-scope rows and exit
    #[arg(long)]
    dry_count: bool,
}

/// dbtranslate - concurrent batch translation of database rows
#[derive(Parser, Debug)]
#[command(name = "dbtranslate")]
#[command(version)]
#[command(about = "Translate a text column of a SQL table into several languages")]
#[command(long_about = "dbtranslate pages through a table with a pool of workers, translates the
source column of every in-scope row and writes every target language back in one update.

EXAMPLES:
    dbtranslate run                              # Configure from DBTRNSLT_* variables
    dbtranslate run -c conf.json                 # Load a JSON config, env still overrides
    dbtranslate run -w 8 -s 200                  # 8 workers, 200 rows per page
    dbtranslate run --dry-count                  # Only count in-scope rows
    dbtranslate completions bash > dbtranslate.bash

ENVIRONMENT:
    DBTRNSLT_DB_NAME               SQLite database file
    DBTRNSLT_DB_TABLE              Table to translate
    DBTRNSLT_DB_SOURCE_COLUMN      Source column (default name_en)
    DBTRNSLT_DB_FILTER             SQL condition selecting rows
    DBTRNSLT_GOOGLE_TRANSLATE_API  Translate endpoint URL
    DBTRNSLT_GCLOUD_TOKEN          Bearer token
    DBTRNSLT_WORKERS_COUNT         Concurrent workers
    DBTRNSLT_OFFSET_DEFAULT_STEP   Rows per page
    DBTRNSLT_TARGET_LANGS          Comma separated target languages
    DBTRNSLT_SOURCE_LANG           Source language (default en)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Max level is raised or lowered later; the logger itself passes everything through
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the configured level is applied once config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "dbtranslate", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run(args) => run(args).await,
    }
}

/// Layer CLI flags over the loaded configuration
fn apply_cli_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(workers) = args.workers {
        config.pipeline.workers_count = Some(workers);
    }
    if let Some(step) = args.step {
        config.pipeline.offset_step = Some(step);
    }
    if let Some(policy) = &args.on_row_failure {
        config.pipeline.on_row_failure = policy.clone().into();
    }
    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone().into();
    }
    if args.verbatim {
        config.translation.formatter = FormatterKind::Verbatim;
    }
    if args.no_progress {
        config.pipeline.show_progress = false;
    }
}

async fn run(args: RunArgs) -> Result<()> {
    // If log level is set via command line, apply it before loading anything
    if let Some(cmd_log_level) = &args.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args);
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    let layout = config.table_layout().context("Invalid table layout")?;
    let db = &config.database;
    let store: Arc<dyn RowStore> = match db.backend() {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteRowStore::open(&db.name, layout)
                .with_context(|| format!("Failed to open database '{}'", db.name))?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresRowStore::connect(db.postgres_config(), layout)
                .await
                .with_context(|| format!("Failed to connect to database '{}'", db.name))?,
        ),
    };
    info!("Using {} database '{}', table '{}'", db.backend(), db.name, db.table);
    store.verify_columns().await.context("Table is missing required columns")?;

    if args.dry_count {
        let total = store.count_in_scope().await.context("Failed to count rows")?;
        println!("{}", total);
        return Ok(());
    }

    let translation = &config.translation;
    let translator = Arc::new(GoogleTranslate::new(
        translation.endpoint.clone(),
        translation.api_token.clone(),
        translation.timeout_secs,
    ));
    info!("Translating through {}", translator.endpoint());
    let service = TranslationService::new(
        translator,
        translation.formatter.build(),
        translation.retry_policy(),
        translation.source_language.clone(),
        Duration::from_secs(translation.timeout_secs),
    );

    let options = PipelineOptions::from_settings(&config.pipeline)?;
    let driver = PipelineDriver::new(
        store,
        service,
        translation.target_languages.clone(),
        options,
    );

    let token = driver.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping workers after their current row");
            token.cancel();
        }
    });

    let report = driver.run().await.context("Translation run failed")?;
    if report.cancelled {
        return Err(CoordinationError::Cancelled.into());
    }

    info!(
        "Success: {} of {} rows translated ({} pages)",
        report.stats.rows_translated,
        report.total_rows,
        report.pages_fetched()
    );

    Ok(())
}
