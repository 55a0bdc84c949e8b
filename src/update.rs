use std::marker::PhantomData;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{
    condition::{self, Conditions, Conjunction, WhereClause},
    driver::{ExecResult, Executor},
    engine::Engine,
    error::{Error, Result},
    ident::{Ident, IntoIdents},
    insert::write_returning,
    model::Record,
    value::{IntoOperand, IntoValue, Value},
    writer::{FormatContext, FormatWriter, render},
};

/// An UPDATE against the table of `T`.
#[derive(Debug)]
pub struct Update<'e, T> {
    engine: &'e Engine,
    table: SmolStr,
    sets: IndexMap<SmolStr, Value>,
    wheres: Conditions,
    returning: Vec<Ident>,
    marker: PhantomData<fn() -> T>,
}

impl<'e, T: Record> Update<'e, T> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            table: engine.table_name::<T>(),
            sets: IndexMap::new(),
            wheres: Conditions::new(),
            returning: Vec::new(),
            marker: PhantomData,
        }
    }

    pub fn table<S: Into<SmolStr>>(&mut self, table: S) -> &mut Self {
        self.table = table.into();
        self
    }

    /// Sets `column` to `value`. Setting the same column twice keeps its first position.
    pub fn set<C: Into<SmolStr>, V: IntoValue>(&mut self, column: C, value: V) -> &mut Self {
        self.sets.insert(column.into(), value.into_value());
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

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        if self.sets.is_empty() {
            return Err(Error::EmptySet);
        }
        Ok(render(self, self.engine.dialect()))
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<ExecResult> {
        self.engine.check(&[&self.wheres])?;
        let (sql, args) = self.to_sql()?;
        self.engine.exec(executor, &sql, &args)
    }

    /// Runs the statement and scans the rows named by `returning`.
    pub fn fetch<E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        self.engine.check(&[&self.wheres])?;
        let (sql, args) = self.to_sql()?;
        self.engine.fetch(executor, &sql, &args)
    }
}

impl<T> FormatWriter for Update<'_, T> {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        context.writer.write_str("UPDATE ")?;
        context.write_table(&self.table)?;
        context.writer.write_str(" SET ")?;
        for (i, (column, value)) in self.sets.iter().enumerate() {
            if i > 0 {
                context.writer.write_str(", ")?;
            }
            context.write_table(column)?;
            context.writer.write_str(" = ")?;
            context.bind(value.clone())?;
        }
        condition::write_clause("WHERE", &self.wheres, context)?;
        write_returning(&self.returning, context)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Config, Record,
        dialect::Dialect,
        engine::Caches,
        memory::{MemoryConnection, MemoryRows},
    };

    use super::*;

    #[derive(Debug, Default, Record)]
    #[db(table = "accounts")]
    pub struct Account {
        #[db(column = "id")]
        pub id: i64,
        #[db(column = "balance")]
        pub balance: f64,
    }

    fn engine(dialect: Dialect) -> Engine {
        Engine::with_caches(Config::new(dialect), Caches::default())
    }

    #[test]
    fn test_update_placeholders_continue_into_where() {
        let engine = engine(Dialect::Postgres);
        let mut update = engine.update::<Account>();
        update
            .set("balance", 10.5)
            .set("frozen", true)
            .where_("id", "=", 4)
            .or_where("owner", "IN", ["a", "b"]);
        let (sql, args) = update.to_sql().unwrap();
        assert_eq!(
            "UPDATE \"accounts\" SET \"balance\" = $1, \"frozen\" = $2 \
             WHERE \"id\" = $3 OR \"owner\" IN ($4, $5)",
            sql
        );
        assert_eq!(5, args.len());
    }

    #[test]
    fn test_update_repeated_column_replaces_value() {
        let engine = engine(Dialect::MySql);
        let mut update = engine.update::<Account>();
        update.set("balance", 1).set("id", 2).set("balance", 3);
        let (sql, args) = update.to_sql().unwrap();
        assert_eq!("UPDATE `accounts` SET `balance` = ?, `id` = ?", sql);
        assert_eq!(vec![Value::I64(3), Value::I64(2)], args);
    }

    #[test]
    fn test_update_without_sets() {
        let engine = engine(Dialect::Postgres);
        let mut update = engine.update::<Account>();
        update.where_("id", "=", 1);
        assert!(matches!(update.to_sql(), Err(Error::EmptySet)));
    }

    #[test]
    fn test_update_returning() {
        let engine = engine(Dialect::Postgres);
        let mut conn = MemoryConnection::new("postgres");
        conn.push_rows(
            MemoryRows::new(["id", "balance"]).row([Value::I64(4), Value::F64(0.0)]),
        );

        let mut update = engine.update::<Account>();
        update.set("balance", 0.0).where_("id", "=", 4).returning(["id", "balance"]);
        let accounts = update.fetch(&mut conn).unwrap();
        assert_eq!(4, accounts[0].id);
        assert_eq!(
            "UPDATE \"accounts\" SET \"balance\" = $1 WHERE \"id\" = $2 \
             RETURNING \"id\", \"balance\"",
            conn.statements()[0].sql
        );

        let sqlite = self::engine(Dialect::Sqlite);
        let mut update = sqlite.update::<Account>();
        update.set("balance", 0.0).returning(["id"]);
        assert_eq!("UPDATE \"accounts\" SET \"balance\" = ?", update.to_sql().unwrap().0);
    }
}
