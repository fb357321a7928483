/*!
 * Row-level data carried between the store and the pipeline.
 */

use bytes::BytesMut;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{self as pg, IsNull, Type};

/// Opaque row identifier.
///
/// Integer keys stay integers and text keys stay text, so an id read from a
/// page binds back into the `WHERE id = ?` clause with the same SQL type.
/// Both SQLite and PostgreSQL conversions are implemented here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    /// INTEGER primary key
    Integer(i64),
    /// TEXT primary key (uuid, slug, ...)
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(id) => write!(f, "{}", id),
            Self::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        Self::Integer(id)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl ToSql for RowId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Integer(id) => id.to_sql(),
            Self::Text(id) => id.to_sql(),
        }
    }
}

impl FromSql for RowId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(id) => Ok(Self::Integer(id)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Self::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

type PgResult<T> = Result<T, Box<dyn Error + Sync + Send>>;

fn is_integer_type(ty: &Type) -> bool {
    *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8
}

fn is_text_type(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

/// Binds to whatever integer width the id column declares
impl pg::ToSql for RowId {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> PgResult<IsNull> {
        match self {
            Self::Integer(id) if *ty == Type::INT2 => pg::ToSql::to_sql(&i16::try_from(*id)?, ty, out),
            Self::Integer(id) if *ty == Type::INT4 => pg::ToSql::to_sql(&i32::try_from(*id)?, ty, out),
            Self::Integer(id) if *ty == Type::INT8 => pg::ToSql::to_sql(id, ty, out),
            Self::Integer(id) => pg::ToSql::to_sql(&id.to_string(), ty, out),
            Self::Text(id) if is_text_type(ty) => pg::ToSql::to_sql(id, ty, out),
            Self::Text(id) => Err(format!("text id '{}' cannot bind to a {} column", id, ty).into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_integer_type(ty) || is_text_type(ty)
    }

    pg::to_sql_checked!();
}

impl<'a> pg::FromSql<'a> for RowId {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> PgResult<Self> {
        if *ty == Type::INT2 {
            Ok(Self::Integer(<i16 as pg::FromSql>::from_sql(ty, raw)?.into()))
        } else if *ty == Type::INT4 {
            Ok(Self::Integer(<i32 as pg::FromSql>::from_sql(ty, raw)?.into()))
        } else if *ty == Type::INT8 {
            Ok(Self::Integer(<i64 as pg::FromSql>::from_sql(ty, raw)?))
        } else {
            Ok(Self::Text(<String as pg::FromSql>::from_sql(ty, raw)?))
        }
    }

    fn accepts(ty: &Type) -> bool {
        is_integer_type(ty) || is_text_type(ty)
    }
}

/// One unit of translation work
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Row identifier
    pub id: RowId,
    /// Text to translate
    pub source_text: String,
}

impl Row {
    pub fn new(id: impl Into<RowId>, source_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_text: source_text.into(),
        }
    }
}

/// A bounded, ordered slice of in-scope rows
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Offset the page was fetched at
    pub offset: i64,
    /// Rows in store order
    pub rows: Vec<Row>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Translations of one row, in target-language order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowTranslations {
    entries: Vec<(String, String)>,
}

impl RowTranslations {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Record the translation for a language tag
    pub fn insert(&mut self, language: impl Into<String>, text: impl Into<String>) {
        self.entries.push((language.into(), text.into()));
    }

    /// Translation for a tag, if present
    pub fn get(&self, language: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(tag, _)| tag == language)
            .map(|(_, text)| text.as_str())
    }
}
