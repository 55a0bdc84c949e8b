use std::marker::PhantomData;

use smol_str::SmolStr;

use crate::{
    driver::{ExecResult, Executor},
    engine::Engine,
    error::{Error, Result},
    ident::{Ident, IntoIdents},
    metadata::{FieldMetadata, RecordMetadata},
    model::Record,
    value::Value,
    writer::{FormatContext, FormatWriter, render},
};

/// An INSERT of one or more records of `T`.
#[derive(Debug)]
pub struct Insert<'e, T> {
    engine: &'e Engine,
    table: SmolStr,
    records: Vec<T>,
    columns: Vec<SmolStr>,
    returning: Vec<Ident>,
    marker: PhantomData<fn() -> T>,
}

struct Statement<'a> {
    table: &'a str,
    columns: Vec<SmolStr>,
    rows: Vec<Vec<Value>>,
    returning: &'a [Ident],
}

impl FormatWriter for Statement<'_> {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        context.writer.write_str("INSERT INTO ")?;
        context.write_table(self.table)?;
        context.writer.write_str(" (")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                context.writer.write_str(", ")?;
            }
            context.write_table(column)?;
        }
        context.writer.write_str(") VALUES ")?;

        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                context.writer.write_str(", ")?;
            }
            context.writer.write_char('(')?;
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    context.writer.write_str(", ")?;
                }
                context.bind(value.clone())?;
            }
            context.writer.write_char(')')?;
        }

        write_returning(self.returning, context)
    }
}

/// Writes ` RETURNING cols` when the dialect supports it.
pub(crate) fn write_returning<W: std::fmt::Write>(
    returning: &[Ident],
    context: &mut FormatContext<'_, W>,
) -> std::fmt::Result {
    if returning.is_empty() || !context.dialect.supports_returning() {
        return Ok(());
    }
    context.writer.write_str(" RETURNING ")?;
    context.write_idents(returning)
}

impl<'e, T: Record> Insert<'e, T> {
    pub(crate) fn new(engine: &'e Engine, records: Vec<T>) -> Self {
        Self {
            engine,
            table: engine.table_name::<T>(),
            records,
            columns: Vec::new(),
            returning: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Restricts the statement to these columns instead of every mapped one.
    pub fn columns<S: IntoIdents>(&mut self, columns: S) -> &mut Self {
        self.columns = columns
            .into_idents()
            .iter()
            .map(|ident| SmolStr::new(ident.as_str()))
            .collect();
        self
    }

    pub fn returning<S: IntoIdents>(&mut self, columns: S) -> &mut Self {
        self.returning = columns.into_idents();
        self
    }

    /// Column names with the field each one reads.
    fn resolve_columns<'m>(
        &self,
        metadata: &'m RecordMetadata,
    ) -> Vec<(SmolStr, &'m FieldMetadata)> {
        if !self.columns.is_empty() {
            return self
                .columns
                .iter()
                .filter_map(|column| match metadata.field(column) {
                    Some(field) => Some((column.clone(), field)),
                    None => {
                        tracing::warn!(%column, table = %self.table, "skipping unmapped column");
                        None
                    }
                })
                .collect();
        }
        let first = self.records.first();
        metadata
            .fields
            .iter()
            .filter(|field| {
                // a zero id is left for the database to generate
                if field.column != "id" {
                    return true;
                }
                let value = first.and_then(|record| record.value_at(field.position).ok());
                !value.is_some_and(|value| value.is_zero())
            })
            .map(|field| (field.column.clone(), field))
            .collect()
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        if self.records.is_empty() {
            return Err(Error::EmptySet);
        }
        let metadata = self.engine.metadata::<T>()?;
        let columns = self.resolve_columns(&metadata);
        if columns.is_empty() {
            return Err(Error::EmptySet);
        }

        let mut rows = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let row = columns
                .iter()
                .map(|(_, field)| {
                    record
                        .value_at(field.position)
                        .map_err(|source| Error::Bind {
                            field: field.name,
                            source,
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(row);
        }

        let statement = Statement {
            table: &self.table,
            columns: columns.into_iter().map(|(column, _)| column).collect(),
            rows,
            returning: &self.returning,
        };
        Ok(render(&statement, self.engine.dialect()))
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<ExecResult> {
        let (sql, args) = self.to_sql()?;
        self.engine.exec(executor, &sql, &args)
    }

    /// Runs the statement and scans the rows it returns.
    ///
    /// Returns every column when no RETURNING list was given. Dialects without
    /// RETURNING yield no rows.
    pub fn fetch<E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        let (mut sql, args) = self.to_sql()?;
        if self.returning.is_empty() && self.engine.dialect().supports_returning() {
            sql.push_str(" RETURNING *");
        }
        self.engine.fetch(executor, &sql, &args)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Config, Record,
        coerce::CoerceError,
        dialect::Dialect,
        engine::Caches,
        memory::{MemoryConnection, MemoryRows},
    };

    use super::*;

    #[derive(Debug, Default, Clone, PartialEq, Record)]
    #[db(table = "users")]
    pub struct User {
        #[db(column = "id")]
        pub id: i64,
        #[db(column = "name")]
        pub name: String,
        #[db(column = "email")]
        pub email: Option<String>,
    }

    fn engine(dialect: Dialect) -> Engine {
        Engine::with_caches(Config::new(dialect), Caches::default())
    }

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.into(),
            email: None,
        }
    }

    #[test]
    fn test_insert_skips_zero_id() {
        let engine = engine(Dialect::Postgres);
        let (sql, args) = engine.insert(user(0, "ann")).to_sql().unwrap();
        assert_eq!("INSERT INTO \"users\" (\"name\", \"email\") VALUES ($1, $2)", sql);
        assert_eq!(vec![Value::String("ann".into()), Value::Null], args);

        let (sql, args) = engine.insert(user(7, "bob")).to_sql().unwrap();
        assert_eq!(
            "INSERT INTO \"users\" (\"id\", \"name\", \"email\") VALUES ($1, $2, $3)",
            sql
        );
        assert_eq!(Value::I64(7), args[0]);
    }

    #[test]
    fn test_insert_batch() {
        let engine = engine(Dialect::MySql);
        let mut insert = engine
            .insert_batch(vec![user(0, "a"), user(0, "b")])
            .unwrap();
        insert.columns(["name"]);
        let (sql, args) = insert.to_sql().unwrap();
        assert_eq!("INSERT INTO `users` (`name`) VALUES (?), (?)", sql);
        assert_eq!(
            vec![Value::String("a".into()), Value::String("b".into())],
            args
        );

        assert!(matches!(
            engine.insert_batch(Vec::<User>::new()),
            Err(Error::EmptySet)
        ));
    }

    #[test]
    fn test_insert_skips_unmapped_columns() {
        let engine = engine(Dialect::Sqlite);
        let mut insert = engine.insert(user(0, "e"));
        insert.columns(["name", "nickname"]);
        let (sql, args) = insert.to_sql().unwrap();
        assert_eq!("INSERT INTO \"users\" (\"name\") VALUES (?)", sql);
        assert_eq!(vec![Value::String("e".into())], args);

        insert.columns(["nickname"]);
        assert!(matches!(insert.to_sql(), Err(Error::EmptySet)));
    }

    #[derive(Debug, Default, Record)]
    #[db(table = "counters")]
    pub struct Counter {
        #[db(column = "hits")]
        pub hits: u64,
    }

    #[test]
    fn test_insert_rejects_unsigned_overflow() {
        let engine = engine(Dialect::Postgres);
        let (_, args) = engine.insert(Counter { hits: 12 }).to_sql().unwrap();
        assert_eq!(vec![Value::I64(12)], args);

        match engine.insert(Counter { hits: u64::MAX }).to_sql() {
            Err(Error::Bind { field, source }) => {
                assert_eq!("hits", field);
                assert!(matches!(source, CoerceError::Overflow { value: u64::MAX, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_insert_returning_only_where_supported() {
        let postgres = engine(Dialect::Postgres);
        let mut insert = postgres.insert(user(0, "c"));
        insert.returning("id");
        let postgres = insert.to_sql().unwrap().0;
        assert!(postgres.ends_with("VALUES ($1, $2) RETURNING \"id\""));

        let sqlite = engine(Dialect::Sqlite);
        let mut insert = sqlite.insert(user(0, "c"));
        insert.returning("id");
        assert!(insert.to_sql().unwrap().0.ends_with("VALUES (?, ?)"));
    }

    #[test]
    fn test_insert_execute_and_fetch() {
        let engine = engine(Dialect::Postgres);
        let mut conn = MemoryConnection::new("postgres");
        conn.push_exec(1, Some(11));
        conn.push_rows(
            MemoryRows::new(["id", "name", "email"])
                .row([Value::I64(12), Value::String("d".into()), Value::Null]),
        );

        let insert = engine.insert(user(0, "d"));
        let result = insert.execute(&mut conn).unwrap();
        assert_eq!(Some(11), result.last_insert_id);

        let users = insert.fetch(&mut conn).unwrap();
        assert_eq!(vec![user(12, "d")], users);
        assert_eq!(
            "INSERT INTO \"users\" (\"name\", \"email\") VALUES ($1, $2) RETURNING *",
            conn.statements()[1].sql
        );
    }
}
