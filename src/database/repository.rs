/*!
 * SQLite implementation of the row store.
 *
 * Every call runs on the blocking pool through `DatabaseConnection`, so
 * workers suspend on database I/O without stalling the runtime.
 */

use async_trait::async_trait;
use log::{debug, warn};
use rusqlite::ToSql;
use std::sync::Arc;

use super::connection::DatabaseConnection;
use super::models::{Page, Row, RowId, RowTranslations};
use super::schema::{SqlDialect, TableLayout};
use super::RowStore;
use crate::errors::StoreError;

/// Row store backed by a SQLite database file
#[derive(Clone)]
pub struct SqliteRowStore {
    /// Database connection
    db: DatabaseConnection,
    /// Table and column names
    layout: Arc<TableLayout>,
}

impl SqliteRowStore {
    /// Create a new store over the given database connection
    pub fn new(db: DatabaseConnection, layout: TableLayout) -> Self {
        Self {
            db,
            layout: Arc::new(layout),
        }
    }

    /// Open a store on an existing database file
    pub fn open(path: impl AsRef<std::path::Path>, layout: TableLayout) -> Result<Self, StoreError> {
        Ok(Self::new(DatabaseConnection::open(path)?, layout))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl RowStore for SqliteRowStore {
    async fn verify_columns(&self) -> Result<(), StoreError> {
        let layout = self.layout.clone();

        self.db
            .execute_async(move |conn| {
                // PRAGMA does not accept bound parameters; the table name is validated.
                let mut stmt = conn
                    .prepare(&format!("PRAGMA table_info({})", layout.table()))
                    .map_err(|e| StoreError::Query(e.to_string()))?;
                let existing = stmt
                    .query_map([], |row| row.get::<_, String>(1))
                    .map_err(|e| StoreError::Query(e.to_string()))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| StoreError::Query(e.to_string()))?;

                for column in layout.required_columns() {
                    if !existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                        return Err(StoreError::MissingColumn {
                            table: layout.table().to_string(),
                            column: column.to_string(),
                        });
                    }
                }

                Ok(())
            })
            .await
    }

    async fn count_in_scope(&self) -> Result<i64, StoreError> {
        let sql = self.layout.count_sql();

        self.db
            .execute_async(move |conn| {
                conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
                    .map_err(|e| StoreError::Query(e.to_string()))
            })
            .await
    }

    async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Page, StoreError> {
        let sql = self.layout.page_sql(SqlDialect::Sqlite);

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn
                    .prepare_cached(&sql)
                    .map_err(|e| StoreError::Query(e.to_string()))?;

                let rows = stmt
                    .query_map([limit, offset], |row| {
                        // NULL sources come back as blank and are skipped downstream
                        Ok(Row::new(
                            row.get::<_, RowId>(0)?,
                            row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        ))
                    })
                    .map_err(|e| StoreError::Query(e.to_string()))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| StoreError::Query(e.to_string()))?;

                debug!("Fetched {} rows at offset {}", rows.len(), offset);

                Ok(Page { offset, rows })
            })
            .await
    }

    async fn update_row(&self, id: &RowId, translations: &RowTranslations) -> Result<(), StoreError> {
        let layout = self.layout.clone();
        let sql = layout.update_sql(SqlDialect::Sqlite);

        let texts: Vec<String> = layout
            .ordered_values(translations)
            .map_err(|missing| StoreError::Update {
                row_id: id.to_string(),
                message: format!("no translation for '{}'", missing),
            })?
            .into_iter()
            .map(str::to_string)
            .collect();

        let row_id = id.clone();

        self.db
            .execute_async(move |conn| {
                let mut params: Vec<&dyn ToSql> = texts.iter().map(|text| text as &dyn ToSql).collect();
                params.push(&row_id);

                let affected = conn
                    .prepare_cached(&sql)
                    .and_then(|mut stmt| stmt.execute(params.as_slice()))
                    .map_err(|e| StoreError::Update {
                        row_id: row_id.to_string(),
                        message: e.to_string(),
                    })?;

                if affected == 0 {
                    warn!("Row {} no longer exists, translations dropped", row_id);
                }

                Ok(())
            })
            .await
    }
}
