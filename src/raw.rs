use std::marker::PhantomData;

use smol_str::SmolStr;

use crate::{
    dialect::Dialect,
    driver::{ExecResult, Executor},
    engine::Engine,
    error::{Error, Result},
    model::Record,
    value::Value,
    writer::{FormatContext, FormatWriter, render},
};

/// Hand written SQL using `?` placeholders.
///
/// On Postgres every `?` outside string literals and quoted identifiers is
/// rewritten to `$n`. `??`, `?|` and `?&` are jsonb operators and left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Raw(SmolStr);

impl Raw {
    pub(crate) fn new<T>(value: T) -> Self
    where
        T: Into<SmolStr>,
    {
        Self(value.into())
    }
}

impl FormatWriter for Raw {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        let sql = self.0.as_str();

        if !matches!(context.dialect, Dialect::Postgres) {
            return context.writer.write_str(sql);
        }

        // closing quote while inside a literal or identifier
        let mut quoted: Option<char> = None;
        let mut span_start = 0;

        let mut chars = sql.char_indices().peekable();
        while let Some((index, char)) = chars.next() {
            if let Some(quote) = quoted {
                if char == quote {
                    // doubled quote is an escape
                    if chars.peek().is_some_and(|&(_, next)| next == quote) {
                        chars.next();
                    } else {
                        quoted = None;
                    }
                }
                continue;
            }

            match char {
                '\'' | '"' => quoted = Some(char),
                '?' => {
                    if chars
                        .peek()
                        .is_some_and(|&(_, next)| matches!(next, '?' | '|' | '&'))
                    {
                        chars.next();
                        continue;
                    }
                    context.writer.write_str(&sql[span_start..index])?;
                    context.write_placeholder()?;
                    span_start = index + char.len_utf8();
                }
                _ => {}
            }
        }

        context.writer.write_str(&sql[span_start..])
    }
}

/// A raw statement bound to its arguments, scanned into `T`.
#[derive(Debug)]
pub struct RawQuery<'e, T> {
    engine: &'e Engine,
    sql: Raw,
    args: Vec<Value>,
    marker: PhantomData<fn() -> T>,
}

impl<'e, T: Record> RawQuery<'e, T> {
    pub(crate) fn new(engine: &'e Engine, sql: &str, args: Vec<Value>) -> Self {
        Self {
            engine,
            sql: Raw::new(sql),
            args,
            marker: PhantomData,
        }
    }

    /// The SQL in the engine's dialect, arguments unchanged.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let (sql, _) = render(&self.sql, self.engine.dialect());
        (sql, self.args.clone())
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        let (sql, args) = self.to_sql();
        self.engine.fetch(executor, &sql, &args)
    }

    pub fn first<E: Executor>(&self, executor: &mut E) -> Result<T> {
        self.execute(executor)?.into_iter().next().ok_or(Error::NoRows)
    }

    /// Runs the statement without reading rows back.
    pub fn exec<E: Executor>(&self, executor: &mut E) -> Result<ExecResult> {
        let (sql, args) = self.to_sql();
        self.engine.exec(executor, &sql, &args)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Config, Record,
        engine::Caches,
        memory::{MemoryConnection, MemoryRows},
        tests::format_writer,
    };

    use super::*;

    #[test]
    fn test_raw_str() {
        let value = Raw::new("'te?st'");
        let raw = format_writer(value, Dialect::Postgres);
        assert_eq!("'te?st'", raw);
    }

    #[test]
    fn test_raw_double_quote() {
        let value = Raw::new("'te''? st' = ?");
        let raw = format_writer(value, Dialect::Postgres);
        assert_eq!("'te''? st' = $1", raw);
    }

    #[test]
    fn test_raw_bind() {
        let value = Raw::new("a = ? AND b IN (?,?)");
        let raw = format_writer(value, Dialect::Postgres);
        assert_eq!("a = $1 AND b IN ($2,$3)", raw);
    }

    #[test]
    fn test_raw_ident() {
        let value = Raw::new("\"te? ? \"\"st\" = ?");
        let raw = format_writer(value, Dialect::Postgres);
        assert_eq!("\"te? ? \"\"st\" = $1", raw);
    }

    #[test]
    fn test_placeholder_jsonb() {
        let value = Raw::new("data ?? 'k' AND data ?| ? AND data ?& ?");
        let raw = format_writer(value, Dialect::Postgres);
        assert_eq!("data ?? 'k' AND data ?| $1 AND data ?& $2", raw);
    }

    #[test]
    fn test_placeholder_before_literal() {
        let value = Raw::new("f(?,'?')");
        let raw = format_writer(value, Dialect::Postgres);
        assert_eq!("f($1,'?')", raw);
    }

    #[test]
    fn test_raw_untouched_outside_postgres() {
        let value = Raw::new("a = ?");
        assert_eq!("a = ?", format_writer(value.clone(), Dialect::MySql));
        assert_eq!("a = ?", format_writer(value, Dialect::Sqlite));
    }

    #[derive(Debug, Default, Record)]
    pub struct Tag {
        #[db(column = "id")]
        pub id: i64,
        #[db(column = "label")]
        pub label: String,
    }

    #[test]
    fn test_raw_query() {
        let engine = Engine::with_caches(Config::new(Dialect::Postgres), Caches::default());
        let mut conn = MemoryConnection::new("postgres");
        conn.push_rows(
            MemoryRows::new(["id", "label"]).row([Value::I64(2), Value::String("rust".into())]),
        );
        conn.push_rows(MemoryRows::new(["id", "label"]));
        conn.push_exec(1, None);

        let query = engine.raw::<Tag, _>("SELECT * FROM tags WHERE id = ? AND label <> ?", [
            Value::I64(2),
            Value::String("go".into()),
        ]);
        let tags = query.execute(&mut conn).unwrap();
        assert_eq!("rust", tags[0].label);
        assert_eq!(
            "SELECT * FROM tags WHERE id = $1 AND label <> $2",
            conn.statements()[0].sql
        );
        assert_eq!(2, conn.statements()[0].args.len());

        assert!(query.first(&mut conn).unwrap_err().is_no_rows());

        let result = engine
            .raw::<Tag, _>("DELETE FROM tags", ())
            .exec(&mut conn)
            .unwrap();
        assert_eq!(1, result.rows_affected);
    }
}
