use std::marker::PhantomData;

use smol_str::SmolStr;

use crate::{
    condition::{self, Conditions, Conjunction, WhereClause},
    driver::{ExecResult, Executor},
    engine::Engine,
    error::Result,
    ident::{Ident, IntoIdents},
    insert::write_returning,
    model::Record,
    value::{IntoOperand, Value},
    writer::{FormatContext, FormatWriter, render},
};

/// A DELETE against the table of `T`. Without conditions every row goes.
#[derive(Debug)]
pub struct Delete<'e, T> {
    engine: &'e Engine,
    table: SmolStr,
    wheres: Conditions,
    returning: Vec<Ident>,
    marker: PhantomData<fn() -> T>,
}

impl<'e, T: Record> Delete<'e, T> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            table: engine.table_name::<T>(),
            wheres: Conditions::new(),
            returning: Vec::new(),
            marker: PhantomData,
        }
    }

    pub fn table<S: Into<SmolStr>>(&mut self, table: S) -> &mut Self {
        self.table = table.into();
        self
    }

    pub fn where_<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.wheres
            .push(WhereClause::new(Conjunction::And, column, operator, value));
        self
    }

    pub fn or_where<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.wheres
            .push(WhereClause::new(Conjunction::Or, column, operator, value));
        self
    }

    pub fn returning<S: IntoIdents>(&mut self, columns: S) -> &mut Self {
        self.returning = columns.into_idents();
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        render(self, self.engine.dialect())
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<ExecResult> {
        self.engine.check(&[&self.wheres])?;
        let (sql, args) = self.to_sql();
        self.engine.exec(executor, &sql, &args)
    }

    pub fn fetch<E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        self.engine.check(&[&self.wheres])?;
        let (sql, args) = self.to_sql();
        self.engine.fetch(executor, &sql, &args)
    }
}

impl<T> FormatWriter for Delete<'_, T> {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        context.writer.write_str("DELETE FROM ")?;
        context.write_table(&self.table)?;
        condition::write_clause("WHERE", &self.wheres, context)?;
        write_returning(&self.returning, context)
    }
}
