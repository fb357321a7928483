/*!
 * Table layout and SQL statement construction.
 *
 * Identifiers are interpolated into statements, so every table, column and
 * language tag is checked against a plain identifier pattern first. Values
 * (ids, translations, limit, offset) are always bound parameters.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::models::RowTranslations;
use crate::errors::StoreError;
use crate::language_utils::column_for_language;

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
});

/// Check that a name can be spliced into SQL as an identifier
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Bound-parameter syntax of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// `?1, ?2, ...`
    Sqlite,
    /// `$1, $2, ...`
    Postgres,
}

impl SqlDialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Self::Sqlite => format!("?{}", index),
            Self::Postgres => format!("${}", index),
        }
    }
}

/// Where the source text lives and where translations go
#[derive(Debug, Clone)]
pub struct TableLayout {
    table: String,
    id_column: String,
    source_column: String,
    scope_predicate: String,
    /// (language tag, destination column), in declared order
    targets: Vec<(String, String)>,
}

impl TableLayout {
    /// Build a layout, validating every identifier
    pub fn new(
        table: &str,
        id_column: &str,
        source_column: &str,
        scope_predicate: &str,
        target_languages: &[String],
    ) -> Result<Self, StoreError> {
        validate_identifier(table)?;
        validate_identifier(id_column)?;
        validate_identifier(source_column)?;

        let mut targets = Vec::with_capacity(target_languages.len());
        for tag in target_languages {
            let column = column_for_language(tag);
            validate_identifier(&column)?;
            targets.push((tag.clone(), column));
        }

        let scope_predicate = match scope_predicate.trim() {
            "" => "1 = 1".to_string(),
            predicate => predicate.to_string(),
        };

        Ok(Self {
            table: table.to_string(),
            id_column: id_column.to_string(),
            source_column: source_column.to_string(),
            scope_predicate,
            targets,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every column a run reads or writes
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.id_column.as_str(), self.source_column.as_str()];
        columns.extend(self.targets.iter().map(|(_, column)| column.as_str()));
        columns
    }

    /// `SELECT COUNT(id) ... WHERE <scope>`
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT({}) FROM {} WHERE {}",
            self.id_column, self.table, self.scope_predicate
        )
    }

    /// Page query; binds parameter 1 = limit, 2 = offset.
    ///
    /// The id column breaks ties so the order is total over the scope.
    pub fn page_sql(&self, dialect: SqlDialect) -> String {
        format!(
            "SELECT {id}, {src} FROM {table} WHERE {scope} ORDER BY {src}, {id} LIMIT {limit} OFFSET {offset}",
            id = self.id_column,
            src = self.source_column,
            table = self.table,
            scope = self.scope_predicate,
            limit = dialect.placeholder(1),
            offset = dialect.placeholder(2),
        )
    }

    /// Single-statement update of all target columns.
    ///
    /// Binds parameters 1..N = translations in target order, N+1 = row id.
    pub fn update_sql(&self, dialect: SqlDialect) -> String {
        let assignments = self
            .targets
            .iter()
            .enumerate()
            .map(|(i, (_, column))| format!("{} = {}", column, dialect.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.table,
            assignments,
            self.id_column,
            dialect.placeholder(self.targets.len() + 1)
        )
    }

    /// Translation values in column order, or the first missing language
    pub fn ordered_values<'a>(
        &self,
        translations: &'a RowTranslations,
    ) -> Result<Vec<&'a str>, String> {
        self.targets
            .iter()
            .map(|(tag, _)| translations.get(tag).ok_or_else(|| tag.clone()))
            .collect()
    }
}
