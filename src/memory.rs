//! An in-memory driver that replays canned results.
//!
//! Useful for exercising statements without a database: queue the result of
//! each upcoming call, run the builder, then inspect what was sent.

use std::collections::VecDeque;

use crate::{
    driver::{Connection, ExecResult, Executor, Rows, Transaction},
    error::BoxError,
    value::Value,
};

/// A canned result set.
#[derive(Debug, Default, Clone)]
pub struct MemoryRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    column_error: Option<String>,
    final_error: Option<String>,
}

impl MemoryRows {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn row<I: IntoIterator<Item = Value>>(mut self, values: I) -> Self {
        self.rows.push_back(values.into_iter().collect());
        self
    }

    /// Fails the column lookup with `message`.
    pub fn with_column_error<S: Into<String>>(mut self, message: S) -> Self {
        self.column_error = Some(message.into());
        self
    }

    /// Reports `message` once every row was read.
    pub fn with_final_error<S: Into<String>>(mut self, message: S) -> Self {
        self.final_error = Some(message.into());
        self
    }
}

impl Rows for MemoryRows {
    fn columns(&mut self) -> Result<Vec<String>, BoxError> {
        match self.column_error.take() {
            Some(message) => Err(message.into()),
            None => Ok(self.columns.clone()),
        }
    }

    fn next(&mut self) -> bool {
        self.current = self.rows.pop_front();
        self.current.is_some()
    }

    fn scan_into(&mut self, slots: &mut [Value]) -> Result<(), BoxError> {
        let Some(row) = self.current.take() else {
            return Err("scan called without a current row".into());
        };
        if row.len() != slots.len() {
            return Err(format!("expected {} values, row has {}", slots.len(), row.len()).into());
        }
        for (slot, value) in slots.iter_mut().zip(row) {
            *slot = value;
        }
        Ok(())
    }

    fn final_error(&mut self) -> Option<BoxError> {
        self.final_error.take().map(Into::into)
    }
}

/// One statement received by a [`MemoryConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
    pub in_transaction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryEvent {
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug)]
enum Outcome {
    Rows(MemoryRows),
    Exec(ExecResult),
    Fail(String),
}

/// A connection answering each call with the next queued outcome.
///
/// An empty queue answers queries with an empty result set and executions
/// with zero affected rows.
#[derive(Debug, Default)]
pub struct MemoryConnection {
    driver: String,
    outcomes: VecDeque<Outcome>,
    statements: Vec<Statement>,
    events: Vec<MemoryEvent>,
    begin_error: Option<String>,
    commit_error: Option<String>,
    rollback_error: Option<String>,
}

impl MemoryConnection {
    pub fn new<S: Into<String>>(driver: S) -> Self {
        Self {
            driver: driver.into(),
            ..Self::default()
        }
    }

    pub fn push_rows(&mut self, rows: MemoryRows) -> &mut Self {
        self.outcomes.push_back(Outcome::Rows(rows));
        self
    }

    pub fn push_exec(&mut self, rows_affected: u64, last_insert_id: Option<i64>) -> &mut Self {
        self.outcomes.push_back(Outcome::Exec(ExecResult {
            rows_affected,
            last_insert_id,
        }));
        self
    }

    /// Fails the next call with `message`.
    pub fn push_error<S: Into<String>>(&mut self, message: S) -> &mut Self {
        self.outcomes.push_back(Outcome::Fail(message.into()));
        self
    }

    pub fn fail_begin<S: Into<String>>(&mut self, message: S) -> &mut Self {
        self.begin_error = Some(message.into());
        self
    }

    pub fn fail_commit<S: Into<String>>(&mut self, message: S) -> &mut Self {
        self.commit_error = Some(message.into());
        self
    }

    pub fn fail_rollback<S: Into<String>>(&mut self, message: S) -> &mut Self {
        self.rollback_error = Some(message.into());
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn events(&self) -> &[MemoryEvent] {
        &self.events
    }

    fn record(&mut self, sql: &str, args: &[Value], in_transaction: bool) {
        self.statements.push(Statement {
            sql: sql.to_owned(),
            args: args.to_vec(),
            in_transaction,
        });
    }

    fn next_rows(&mut self) -> Result<MemoryRows, BoxError> {
        match self.outcomes.pop_front() {
            None => Ok(MemoryRows::default()),
            Some(Outcome::Rows(rows)) => Ok(rows),
            Some(Outcome::Exec(_)) => Err("queued an execution result, got a query".into()),
            Some(Outcome::Fail(message)) => Err(message.into()),
        }
    }

    fn next_exec(&mut self) -> Result<ExecResult, BoxError> {
        match self.outcomes.pop_front() {
            None => Ok(ExecResult::default()),
            Some(Outcome::Exec(result)) => Ok(result),
            Some(Outcome::Rows(_)) => Err("queued a result set, got an execution".into()),
            Some(Outcome::Fail(message)) => Err(message.into()),
        }
    }
}

impl Executor for MemoryConnection {
    type Rows<'a>
        = MemoryRows
    where
        Self: 'a;

    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Self::Rows<'_>, BoxError> {
        self.record(sql, args, false);
        self.next_rows()
    }

    fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult, BoxError> {
        self.record(sql, args, false);
        self.next_exec()
    }
}

impl Connection for MemoryConnection {
    type Tx<'c>
        = MemoryTransaction<'c>
    where
        Self: 'c;

    fn begin(&mut self) -> Result<Self::Tx<'_>, BoxError> {
        if let Some(message) = self.begin_error.take() {
            return Err(message.into());
        }
        self.events.push(MemoryEvent::Begin);
        Ok(MemoryTransaction { conn: self })
    }
}

/// A transaction over a [`MemoryConnection`]. Statements are marked as run inside it.
#[derive(Debug)]
pub struct MemoryTransaction<'c> {
    conn: &'c mut MemoryConnection,
}

impl Executor for MemoryTransaction<'_> {
    type Rows<'a>
        = MemoryRows
    where
        Self: 'a;

    fn driver_name(&self) -> &str {
        &self.conn.driver
    }

    fn query(&mut self, sql: &str, args: &[Value]) -> Result<Self::Rows<'_>, BoxError> {
        self.conn.record(sql, args, true);
        self.conn.next_rows()
    }

    fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult, BoxError> {
        self.conn.record(sql, args, true);
        self.conn.next_exec()
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn commit(self) -> Result<(), BoxError> {
        if let Some(message) = self.conn.commit_error.take() {
            return Err(message.into());
        }
        self.conn.events.push(MemoryEvent::Commit);
        Ok(())
    }

    fn rollback(self) -> Result<(), BoxError> {
        if let Some(message) = self.conn.rollback_error.take() {
            return Err(message.into());
        }
        self.conn.events.push(MemoryEvent::Rollback);
        Ok(())
    }
}
