/*!
 * Common test utilities for the dbtranslate test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use dbtranslate::database::{Page, RowId, RowStore, RowTranslations, SqliteRowStore, TableLayout};
use dbtranslate::errors::StoreError;
use dbtranslate::providers::Translator;
use dbtranslate::translation::{RetryPolicy, TextFormatter, TranslationService};

/// Route library logs to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

/// A SQLite file with a `disciplines` table holding the given rows.
///
/// Rows are `(id, name_en, is_classic)`. The directory is removed when the
/// returned `TempDir` is dropped.
pub fn seed_database(rows: &[(i64, Option<&str>, bool)]) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("catalog.db");

    let conn = rusqlite::Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE disciplines (
            id INTEGER PRIMARY KEY,
            name_en TEXT,
            name_ru TEXT,
            name_fr TEXT,
            name_de TEXT,
            is_classic INTEGER NOT NULL DEFAULT 1
        );",
    )?;
    for (id, name, classic) in rows {
        conn.execute(
            "INSERT INTO disciplines (id, name_en, is_classic) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, name, *classic as i64],
        )?;
    }

    Ok((dir, path))
}

/// `count` classic rows named `discipline 0001`, `discipline 0002`, ...
pub fn seed_numbered(count: i64) -> Result<(TempDir, PathBuf)> {
    let names: Vec<String> = (1..=count).map(|i| format!("discipline {:04}", i)).collect();
    let rows: Vec<(i64, Option<&str>, bool)> = names
        .iter()
        .enumerate()
        .map(|(i, name)| (i as i64 + 1, Some(name.as_str()), true))
        .collect();
    seed_database(&rows)
}

pub fn open_store(path: &Path, predicate: &str, languages: &[String]) -> Result<SqliteRowStore> {
    let layout = TableLayout::new("disciplines", "id", "name_en", predicate, languages)?;
    Ok(SqliteRowStore::open(path, layout)?)
}

/// Value of `column` for row `id`
pub fn read_column(path: &Path, id: i64, column: &str) -> Result<Option<String>> {
    let conn = rusqlite::Connection::open(path)?;
    let value = conn.query_row(
        &format!("SELECT {} FROM disciplines WHERE id = ?1", column),
        [id],
        |row| row.get(0),
    )?;
    Ok(value)
}

pub fn service(translator: Arc<dyn Translator>, formatter: Box<dyn TextFormatter>) -> TranslationService {
    TranslationService::new(translator, formatter, RetryPolicy::none(), "en", Duration::from_secs(2))
}

/// Row store wrapper that records every page fetch
pub struct RecordingStore<S> {
    inner: S,
    fetches: Mutex<Vec<i64>>,
    updates: Mutex<Vec<RowId>>,
}

impl<S: RowStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetches: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Fetched offsets, sorted
    pub fn fetched_offsets(&self) -> Vec<i64> {
        let mut offsets = self.fetches.lock().clone();
        offsets.sort_unstable();
        offsets
    }

    pub fn updated_rows(&self) -> Vec<RowId> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl<S: RowStore> RowStore for RecordingStore<S> {
    async fn verify_columns(&self) -> Result<(), StoreError> {
        self.inner.verify_columns().await
    }

    async fn count_in_scope(&self) -> Result<i64, StoreError> {
        self.inner.count_in_scope().await
    }

    async fn fetch_page(&self, offset: i64, limit: i64) -> Result<Page, StoreError> {
        self.fetches.lock().push(offset);
        self.inner.fetch_page(offset, limit).await
    }

    async fn update_row(&self, id: &RowId, translations: &RowTranslations) -> Result<(), StoreError> {
        self.updates.lock().push(id.clone());
        self.inner.update_row(id, translations).await
    }
}

/// Row store whose page fetches always fail
pub struct BrokenStore {
    pub total: i64,
}

#[async_trait]
impl RowStore for BrokenStore {
    async fn verify_columns(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn count_in_scope(&self) -> Result<i64, StoreError> {
        Ok(self.total)
    }

    async fn fetch_page(&self, _offset: i64, _limit: i64) -> Result<Page, StoreError> {
        Err(StoreError::Query("disk I/O error".to_string()))
    }

    async fn update_row(&self, _id: &RowId, _translations: &RowTranslations) -> Result<(), StoreError> {
        Ok(())
    }
}
