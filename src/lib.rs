//! A typed SQL query builder and row mapper over blocking database drivers.
//!
//! Statements are built from an [`Engine`], rendered for its [`Dialect`] and
//! run against anything implementing [`Executor`]. Result rows are scanned
//! into types deriving [`Record`].

extern crate self as sqlblade;

mod aggregate;
mod column;
mod condition;
mod config;
mod delete;
mod dialect;
mod driver;
mod engine;
mod error;
mod fragment;
mod hooks;
mod ident;
mod insert;
mod join;
mod metadata;
mod model;
mod operator;
mod order;
mod paginate;
mod pool;
mod query;
mod raw;
mod scan;
mod transaction;
mod update;
mod value;
mod writer;

pub mod coerce;
pub mod memory;

pub use aggregate::Aggregate;
pub use coerce::{CoerceError, Coercion, FieldValue};
pub use column::{ColumnMap, ColumnMapCache};
pub use condition::{Conditions, Conjunction, WhereClause};
pub use config::{Config, OperatorPolicy};
pub use delete::Delete;
pub use dialect::Dialect;
pub use driver::{Connection, ExecResult, Executor, Rows, Transaction};
pub use engine::{Caches, Engine};
pub use error::{BoxError, Error, Result};
pub use fragment::Fragment;
pub use hooks::{Hook, Hooks};
pub use ident::{Ident, IntoIdent, IntoIdents};
pub use insert::Insert;
pub use join::{Join, JoinKind};
pub use metadata::{FieldMetadata, MetadataCache, RecordMetadata, TableNameCache, to_snake_case};
pub use model::{FieldShape, Model, Record, RecordShape, ScalarKind, Shape};
pub use operator::{Family, Operator};
pub use order::{Order, OrderBy};
pub use paginate::Paginator;
pub use pool::{PooledBuffer, ScanBuffer, ScanBufferPool};
pub use query::{Preview, Query};
pub use raw::RawQuery;
pub use scan::scan_rows;
pub use transaction::with_transaction;
pub use update::Update;
pub use value::{IntoOperand, IntoValue, IntoValues, Operand, Value};

pub use sqlblade_derive::Record;

pub fn ident(value: &str) -> Ident {
    Ident::new(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{dialect, writer};

    pub(crate) fn format_writer<W: writer::FormatWriter>(
        writer: W,
        dialect: dialect::Dialect,
    ) -> String {
        let mut str = String::new();
        let mut context = writer::FormatContext::new(&mut str, dialect);
        writer.format_writer(&mut context).unwrap();
        str
    }
}
