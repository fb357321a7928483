/*!
 * Error types for the dbtranslate application.
 *
 * Each layer of the pipeline has its own error enum so that callers can tell
 * a broken row store apart from a flaky translation service, and both apart
 * from a misconfigured run. `AppError` wraps them all for the driver.
 */

use thiserror::Error;

use crate::database::models::RowId;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting was not provided
    #[error("Missing required setting: {0}")]
    Missing(String),

    /// A setting was provided but could not be accepted
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Name of the setting or environment variable
        key: String,
        /// The rejected raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The configuration file could not be read or parsed
    #[error("Config file error: {0}")]
    File(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the row store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Opening or locking the database failed
    #[error("Database connection error: {0}")]
    Connection(String),

    /// A SELECT (page fetch or count) failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Writing translations back failed
    #[error("Update of row {row_id} failed: {message}")]
    Update {
        /// Row being written
        row_id: String,
        /// Driver message
        message: String,
    },

    /// The table lacks a column the run needs
    #[error("Table '{table}' has no column '{column}'")]
    MissingColumn {
        /// Table name
        table: String,
        /// Missing column name
        column: String,
    },

    /// A table, column or language tag is not a plain SQL identifier
    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),
}

/// Errors that can occur when calling the translation service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport failure before a response was received
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The call did not finish within its deadline
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The response parsed but carried no translation
    #[error("API returned no translations")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether a later attempt of the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::Timeout(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationError(_) | Self::ParseError(_) | Self::EmptyResponse => false,
        }
    }
}

/// Errors in worker coordination. Not expected in normal operation.
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// A worker task panicked or was aborted
    #[error("Worker #{worker_id} did not finish: {message}")]
    WorkerPanicked {
        /// Worker identity
        worker_id: usize,
        /// Join error text
        message: String,
    },

    /// The run was cancelled before completion
    #[error("Run cancelled")]
    Cancelled,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Row store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Translation service error
    #[error("Translation service error: {0}")]
    Provider(#[from] ProviderError),

    /// Coordination error
    #[error("Coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    /// A row could not be translated and the run is configured to abort
    #[error("Translation of row {row_id} into '{language}' failed: {source}")]
    RowTranslation {
        /// Row that failed
        row_id: RowId,
        /// Target language tag that failed
        language: String,
        /// Underlying provider error
        #[source]
        source: ProviderError,
    },

    /// A worker stopped with a fatal error
    #[error("Worker #{worker_id} failed: {source}")]
    Worker {
        /// Worker identity
        worker_id: usize,
        /// What stopped it
        #[source]
        source: Box<AppError>,
    },
}
