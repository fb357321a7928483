/*!
 * Row store access.
 *
 * The pipeline only ever needs three statements: count the in-scope rows,
 * fetch one page of them, and write one row's translations back. `RowStore`
 * is that seam. `SqliteRowStore` serves a database file and
 * `PostgresRowStore` a server.
 */

use async_trait::async_trait;

use crate::errors::StoreError;

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;
pub mod postgres;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{Page, Row, RowId, RowTranslations};
pub use postgres::PostgresRowStore;
pub use repository::SqliteRowStore;
pub use schema::{SqlDialect, TableLayout};

/// Storage the workers page through and write back to
///
/// Implementations must be safe to call from several workers at once.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Fail early if a column the run needs does not exist
    async fn verify_columns(&self) -> Result<(), StoreError>;

    /// Number of rows matching the in-scope predicate
    async fn count_in_scope(&self) -> Result<i64, StoreError>;

    /// Up to `limit` in-scope rows starting at `offset` in the stable order
    async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Page, StoreError>;

    /// Write every target language of one row in a single statement
    async fn update_row(&self, id: &RowId, translations: &RowTranslations) -> Result<(), StoreError>;
}
