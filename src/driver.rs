//! The blocking database primitives statements run against.
//!
//! A driver adapter implements [`Rows`] for its result sets and
//! [`Executor`] for its connections and transactions.

use crate::{error::BoxError, value::Value};

/// A forward-only result set.
pub trait Rows {
    /// Column names in result order.
    fn columns(&mut self) -> Result<Vec<String>, BoxError>;

    /// Advances to the next row, `false` once exhausted or failed.
    fn next(&mut self) -> bool;

    /// Writes the current row's values into `slots`, one per column.
    fn scan_into(&mut self, slots: &mut [Value]) -> Result<(), BoxError>;

    /// The error that stopped iteration, checked once [`Rows::next`] returned `false`.
    fn final_error(&mut self) -> Option<BoxError> {
        None
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

pub trait Executor {
    type Rows<'a>: Rows
    where
        Self: 'a;

    /// Name of the underlying driver, used for dialect detection.
    fn driver_name(&self) -> &str {
        ""
    }

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Self::Rows<'_>, BoxError>;

    fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult, BoxError>;
}

pub trait Connection: Executor {
    type Tx<'c>: Transaction
    where
        Self: 'c;

    fn begin(&mut self) -> Result<Self::Tx<'_>, BoxError>;
}

pub trait Transaction: Executor {
    fn commit(self) -> Result<(), BoxError>;

    fn rollback(self) -> Result<(), BoxError>;
}
