use smol_str::SmolStr;
use thiserror::Error;

use crate::{coerce::CoerceError, value::Value};

/// Error type handed back by drivers and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid model: {0} is not a record type")]
    InvalidModel(&'static str),

    #[error("no rows in result set")]
    NoRows,

    #[error("nothing to write: the statement has no values")]
    EmptySet,

    #[error("invalid operator {operator:?} on column {column:?}")]
    InvalidOperator { column: SmolStr, operator: SmolStr },

    #[error("malformed value for {operator} on column {column:?}")]
    MalformedClause { column: SmolStr, operator: SmolStr },

    #[error("cannot bind field {field}")]
    Bind {
        field: &'static str,
        #[source]
        source: CoerceError,
    },

    #[error("{}", scan_message(.field))]
    Scan {
        field: Option<SmolStr>,
        #[source]
        source: BoxError,
    },

    #[error("query failed: {sql} (args: {})", args.len())]
    Query {
        sql: String,
        args: Vec<Value>,
        #[source]
        source: BoxError,
    },

    #[error("hook failed")]
    Hook(#[source] BoxError),

    #[error("failed to begin transaction")]
    Begin(#[source] BoxError),

    #[error("failed to commit transaction")]
    Commit(#[source] BoxError),

    #[error("rollback failed after: {original}")]
    Rollback {
        #[source]
        source: BoxError,
        original: Box<Error>,
    },
}

fn scan_message(field: &Option<SmolStr>) -> String {
    match field {
        Some(field) => format!("failed to scan field {field}"),
        None => "failed to scan rows".to_owned(),
    }
}

impl Error {
    pub(crate) fn query<E: Into<BoxError>>(sql: &str, args: &[Value], source: E) -> Self {
        Error::Query {
            sql: sql.to_owned(),
            args: args.to_vec(),
            source: source.into(),
        }
    }

    pub(crate) fn scan<E: Into<BoxError>>(field: Option<SmolStr>, source: E) -> Self {
        Error::Scan {
            field,
            source: source.into(),
        }
    }

    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows)
    }
}
