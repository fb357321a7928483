/*!
 * PostgreSQL implementation of the row store.
 *
 * All workers share one `tokio_postgres::Client`. The client pipelines
 * concurrent queries over a single connection whose socket I/O runs on a
 * spawned task.
 */

use async_trait::async_trait;
use log::{debug, error, warn};
use std::sync::Arc;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls};

use super::models::{Page, Row, RowId, RowTranslations};
use super::schema::{SqlDialect, TableLayout};
use super::RowStore;
use crate::errors::StoreError;

/// Port used when none is configured
pub const DEFAULT_PORT: u16 = 5432;

/// Map a driver error; a dropped connection is not a query problem
fn query_error(err: tokio_postgres::Error) -> StoreError {
    if err.is_closed() {
        return StoreError::Connection(err.to_string());
    }
    match err.as_db_error() {
        Some(db) => StoreError::Query(format!("{} (SQLSTATE {})", db.message(), db.code().code())),
        None => StoreError::Query(err.to_string()),
    }
}

/// Row store backed by a PostgreSQL table
pub struct PostgresRowStore {
    client: Client,
    layout: Arc<TableLayout>,
}

impl PostgresRowStore {
    /// Connect and start driving the connection in the background
    pub async fn connect(config: Config, layout: TableLayout) -> Result<Self, StoreError> {
        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| StoreError::Connection(format!("Postgres connect failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Postgres connection closed: {}", e);
            }
        });

        Ok(Self {
            client,
            layout: Arc::new(layout),
        })
    }
}

#[async_trait]
impl RowStore for PostgresRowStore {
    async fn verify_columns(&self) -> Result<(), StoreError> {
        // information_schema uses domain types, so compare as text
        let rows = self
            .client
            .query(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND lower(table_name::text) = lower($1::text)",
                &[&self.layout.table()],
            )
            .await
            .map_err(query_error)?;

        let existing = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;

        for column in self.layout.required_columns() {
            if !existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                return Err(StoreError::MissingColumn {
                    table: self.layout.table().to_string(),
                    column: column.to_string(),
                });
            }
        }

        Ok(())
    }

    async fn count_in_scope(&self) -> Result<i64, StoreError> {
        let row = self
            .client
            .query_one(&self.layout.count_sql(), &[])
            .await
            .map_err(query_error)?;

        row.try_get::<_, i64>(0).map_err(query_error)
    }

    async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Page, StoreError> {
        let sql = self.layout.page_sql(SqlDialect::Postgres);
        let result = self
            .client
            .query(&sql, &[&limit, &offset])
            .await
            .map_err(query_error)?;

        let rows = result
            .iter()
            .map(|row| -> Result<Row, tokio_postgres::Error> {
                // NULL sources come back as blank and are skipped downstream
                Ok(Row::new(
                    row.try_get::<_, RowId>(0)?,
                    row.try_get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;

        debug!("Fetched {} rows at offset {}", rows.len(), offset);

        Ok(Page { offset, rows })
    }

    async fn update_row(&self, id: &RowId, translations: &RowTranslations) -> Result<(), StoreError> {
        let sql = self.layout.update_sql(SqlDialect::Postgres);
        let texts = self
            .layout
            .ordered_values(translations)
            .map_err(|missing| StoreError::Update {
                row_id: id.to_string(),
                message: format!("no translation for '{}'", missing),
            })?;

        let mut params: Vec<&(dyn ToSql + Sync)> = texts.iter().map(|text| text as &(dyn ToSql + Sync)).collect();
        params.push(id);

        let affected = self
            .client
            .execute(&sql, &params)
            .await
            .map_err(|e| StoreError::Update {
                row_id: id.to_string(),
                message: query_error(e).to_string(),
            })?;

        if affected == 0 {
            warn!("Row {} no longer exists, translations dropped", id);
        }

        Ok(())
    }
}
