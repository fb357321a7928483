/*!
 * Application configuration.
 *
 * Settings are layered: built-in defaults, then an optional JSON file, then
 * `DBTRNSLT_*` environment variables. CLI flags are applied by the binary.
 */

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::database::postgres;
use crate::database::schema::{validate_identifier, TableLayout};
use crate::errors::{ConfigError, StoreError};
use crate::language_utils;
use crate::translation::{FormatterKind, RetryPolicy};

/// Prefix shared by every recognised environment variable
pub const ENV_PREFIX: &str = "DBTRNSLT_";

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Row store settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Translation service settings
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Worker pool settings
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where the rows live
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Database name; for SQLite this is the database file path
    #[serde(default)]
    pub name: String,

    /// Server host, for networked backends
    #[serde(default)]
    pub host: Option<String>,

    /// Server port, for networked backends
    #[serde(default)]
    pub port: Option<u16>,

    /// Login user, for networked backends
    #[serde(default)]
    pub user: Option<String>,

    /// Login password, for networked backends
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Table holding the rows to translate
    #[serde(default)]
    pub table: String,

    /// Primary key column
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Column holding the source text
    #[serde(default = "default_source_column")]
    pub source_column: String,

    /// SQL condition selecting the rows that need translation
    #[serde(default)]
    pub scope_predicate: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: None,
            port: None,
            user: None,
            password: None,
            table: String::new(),
            id_column: default_id_column(),
            source_column: default_source_column(),
            scope_predicate: String::new(),
        }
    }
}

impl DatabaseSettings {
    /// Whether any server connection setting was given
    pub fn has_network_settings(&self) -> bool {
        self.host.is_some() || self.port.is_some() || self.user.is_some() || self.password.is_some()
    }

    /// Connection parameters for the PostgreSQL store; `name` is the database
    pub fn postgres_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .dbname(&self.name)
            .port(self.port.unwrap_or(postgres::DEFAULT_PORT))
            .application_name("dbtranslate");
        if let Some(host) = &self.host {
            config.host(host);
        }
        if let Some(user) = &self.user {
            config.user(user);
        }
        if let Some(password) = &self.password {
            config.password(password);
        }
        config
    }

    /// Server settings select PostgreSQL, otherwise `name` is a SQLite file
    pub fn backend(&self) -> DatabaseBackend {
        if self.has_network_settings() {
            DatabaseBackend::Postgres
        } else {
            DatabaseBackend::Sqlite
        }
    }
}

/// Row store implementation selected by the database settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationSettings {
    /// Full URL of the translate endpoint
    #[serde(default)]
    pub endpoint: String,

    /// Bearer token
    #[serde(default, skip_serializing)]
    pub api_token: String,

    /// Language of the source column
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language tags, in processing order
    #[serde(default = "default_target_languages")]
    pub target_languages: Vec<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a failed call
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Post-processing of translated text
    #[serde(default)]
    pub formatter: FormatterKind,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_token: String::new(),
            source_language: default_source_language(),
            target_languages: default_target_languages(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            formatter: FormatterKind::default(),
        }
    }
}

impl TranslationSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.retry_count)
            .with_base_backoff_ms(self.retry_backoff_ms)
    }
}

/// What to do with a row whose translation keeps failing
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RowFailurePolicy {
    /// Log the row, leave it untouched and carry on
    #[default]
    Skip,
    /// Stop the run
    Abort,
}

impl std::str::FromStr for RowFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            _ => Err(format!("expected 'skip' or 'abort', got '{}'", s)),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Number of concurrent workers; required
    #[serde(default)]
    pub workers_count: Option<usize>,

    /// Page size handed to each allocation; required
    #[serde(default)]
    pub offset_step: Option<i64>,

    /// Delay between worker launches in milliseconds
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,

    /// Handling of rows that cannot be translated
    #[serde(default)]
    pub on_row_failure: RowFailurePolicy,

    /// Render a progress bar on stderr
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers_count: None,
            offset_step: None,
            stagger_ms: default_stagger_ms(),
            on_row_failure: RowFailurePolicy::default(),
            show_progress: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!("unknown log level '{}'", s)),
        }
    }
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_source_column() -> String {
    "name_en".to_string()
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_languages() -> Vec<String> {
    ["ru", "fr", "zh", "it", "jp", "kr", "pt", "sw", "es", "de"]
        .iter()
        .map(|tag| tag.to_string())
        .collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_stagger_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

fn env_key(name: &str) -> String {
    format!("{}{}", ENV_PREFIX, name)
}

/// Parse a strictly positive integer setting
fn parse_positive<T>(key: &str, raw: &str) -> std::result::Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value: T = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, raw, "not a whole number"))?;

    if value <= T::default() {
        return Err(ConfigError::invalid(key, raw, "must be at least 1"));
    }

    Ok(value)
}

fn parse_language_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

impl Config {
    /// Load defaults, then the optional JSON file, then the process environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config
            .apply_env(|key| std::env::var(key).ok())
            .context("Invalid environment configuration")?;

        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        serde_json::from_str(&content)
            .map_err(|e| ConfigError::File(format!("{:?}: {}", path, e)))
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Override settings from `DBTRNSLT_*` variables found through `lookup`.
    ///
    /// Variables that are present must be valid; absent ones leave the
    /// current value in place.
    pub fn apply_env<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = env_key(name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = get("DB_HOST") {
            self.database.host = Some(value);
        }
        if let Some((key, value)) = get("DB_PORT") {
            self.database.port = Some(parse_positive(&key, &value)?);
        }
        if let Some((_, value)) = get("DB_USER") {
            self.database.user = Some(value);
        }
        if let Some((_, value)) = get("DB_PASSWORD") {
            self.database.password = Some(value);
        }
        if let Some((_, value)) = get("DB_NAME") {
            self.database.name = value;
        }
        if let Some((_, value)) = get("DB_TABLE") {
            self.database.table = value;
        }
        if let Some((_, value)) = get("DB_ID_COLUMN") {
            self.database.id_column = value;
        }
        if let Some((_, value)) = get("DB_SOURCE_COLUMN") {
            self.database.source_column = value;
        }
        if let Some((_, value)) = get("DB_FILTER") {
            self.database.scope_predicate = value;
        }
        if let Some((_, value)) = get("GOOGLE_TRANSLATE_API") {
            self.translation.endpoint = value;
        }
        if let Some((_, value)) = get("GCLOUD_TOKEN") {
            self.translation.api_token = value;
        }
        if let Some((_, value)) = get("SOURCE_LANG") {
            self.translation.source_language = value.trim().to_lowercase();
        }
        if let Some((_, value)) = get("TARGET_LANGS") {
            self.translation.target_languages = parse_language_list(&value);
        }
        if let Some((key, value)) = get("WORKERS_COUNT") {
            self.pipeline.workers_count = Some(parse_positive(&key, &value)?);
        }
        if let Some((key, value)) = get("OFFSET_DEFAULT_STEP") {
            self.pipeline.offset_step = Some(parse_positive(&key, &value)?);
        }
        if let Some((key, value)) = get("ON_ROW_FAILURE") {
            self.pipeline.on_row_failure = value
                .parse()
                .map_err(|reason: String| ConfigError::invalid(&key, &value, reason))?;
        }
        if let Some((key, value)) = get("LOG_LEVEL") {
            self.log_level = value
                .parse()
                .map_err(|reason: String| ConfigError::invalid(&key, &value, reason))?;
        }

        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let db = &self.database;
        if db.name.trim().is_empty() {
            return Err(ConfigError::Missing(env_key("DB_NAME")));
        }
        if db.table.trim().is_empty() {
            return Err(ConfigError::Missing(env_key("DB_TABLE")));
        }
        if db.backend() == DatabaseBackend::Postgres {
            if db.host.as_deref().is_none_or(|h| h.trim().is_empty()) {
                return Err(ConfigError::Missing(env_key("DB_HOST")));
            }
            if db.user.as_deref().is_none_or(|u| u.trim().is_empty()) {
                return Err(ConfigError::Missing(env_key("DB_USER")));
            }
        }
        for (key, value) in [
            ("DB_TABLE", &db.table),
            ("DB_ID_COLUMN", &db.id_column),
            ("DB_SOURCE_COLUMN", &db.source_column),
        ] {
            validate_identifier(value)
                .map_err(|_| ConfigError::invalid(env_key(key), value, "not a plain SQL identifier"))?;
        }

        let tr = &self.translation;
        if tr.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing(env_key("GOOGLE_TRANSLATE_API")));
        }
        let url = url::Url::parse(&tr.endpoint)
            .map_err(|e| ConfigError::invalid(env_key("GOOGLE_TRANSLATE_API"), &tr.endpoint, e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::invalid(
                env_key("GOOGLE_TRANSLATE_API"),
                &tr.endpoint,
                "scheme must be http or https",
            ));
        }
        if tr.api_token.trim().is_empty() {
            return Err(ConfigError::Missing(env_key("GCLOUD_TOKEN")));
        }
        if tr.timeout_secs == 0 {
            return Err(ConfigError::invalid("translation.timeout_secs", "0", "must be at least 1"));
        }
        if !language_utils::is_known_language(&tr.source_language) {
            return Err(ConfigError::invalid(env_key("SOURCE_LANG"), &tr.source_language, "unknown language"));
        }

        if tr.target_languages.is_empty() {
            return Err(ConfigError::Missing(env_key("TARGET_LANGS")));
        }
        let mut seen = HashSet::new();
        for tag in &tr.target_languages {
            if !seen.insert(tag.as_str()) {
                return Err(ConfigError::invalid(env_key("TARGET_LANGS"), tag, "listed twice"));
            }
            if !language_utils::is_known_language(tag) {
                return Err(ConfigError::invalid(env_key("TARGET_LANGS"), tag, "unknown language"));
            }
            validate_identifier(&language_utils::column_for_language(tag))
                .map_err(|_| ConfigError::invalid(env_key("TARGET_LANGS"), tag, "not usable in a column name"))?;
        }

        match self.pipeline.workers_count {
            None => return Err(ConfigError::Missing(env_key("WORKERS_COUNT"))),
            Some(0) => return Err(ConfigError::invalid(env_key("WORKERS_COUNT"), "0", "must be at least 1")),
            Some(_) => {}
        }
        match self.pipeline.offset_step {
            None => return Err(ConfigError::Missing(env_key("OFFSET_DEFAULT_STEP"))),
            Some(step) if step < 1 => {
                return Err(ConfigError::invalid(
                    env_key("OFFSET_DEFAULT_STEP"),
                    step.to_string(),
                    "must be at least 1",
                ));
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Table layout for the row store
    pub fn table_layout(&self) -> std::result::Result<TableLayout, StoreError> {
        TableLayout::new(
            &self.database.table,
            &self.database.id_column,
            &self.database.source_column,
            &self.database.scope_predicate,
            &self.translation.target_languages,
        )
    }
}
