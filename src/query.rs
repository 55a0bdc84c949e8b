use std::{fmt, marker::PhantomData};

use smol_str::SmolStr;

use crate::{
    aggregate::Aggregate,
    coerce::{self, Coercion},
    condition::{self, Conjunction, WhereClause},
    driver::Executor,
    engine::Engine,
    error::{Error, Result},
    fragment::Fragment,
    ident::IntoIdents,
    join::{Join, JoinKind},
    model::Record,
    order::{Order, OrderBy},
    value::{IntoOperand, Operand, Value},
    writer::{self, FormatContext, FormatWriter},
};

/// A SELECT against the table of `T`.
#[derive(Debug)]
pub struct Query<'e, T> {
    engine: &'e Engine,
    table: SmolStr,
    parts: Fragment,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Query<'_, T> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine,
            table: self.table.clone(),
            parts: self.parts.clone(),
            marker: PhantomData,
        }
    }
}

impl<'e, T: Record> Query<'e, T> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            table: engine.table_name::<T>(),
            parts: Fragment::new(),
            marker: PhantomData,
        }
    }

    /// Overrides the table name derived from `T`.
    pub fn from<S: Into<SmolStr>>(&mut self, table: S) -> &mut Self {
        self.table = table.into();
        self
    }

    pub fn where_<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.parts.where_(column, operator, value);
        self
    }

    pub fn or_where<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.parts.or_where(column, operator, value);
        self
    }

    pub fn where_eq<C: Into<SmolStr>, V: IntoOperand>(&mut self, column: C, value: V) -> &mut Self {
        self.where_(column, "=", value)
    }

    pub fn where_in<C, V>(&mut self, column: C, values: V) -> &mut Self
    where
        C: Into<SmolStr>,
        V: IntoOperand,
    {
        self.where_(column, "IN", values)
    }

    pub fn where_not_in<C, V>(&mut self, column: C, values: V) -> &mut Self
    where
        C: Into<SmolStr>,
        V: IntoOperand,
    {
        self.where_(column, "NOT IN", values)
    }

    pub fn where_between<C, L, H>(&mut self, column: C, low: L, high: H) -> &mut Self
    where
        C: Into<SmolStr>,
        L: IntoOperand,
        H: IntoOperand,
    {
        let bounds = match (low.into_operand(), high.into_operand()) {
            (Operand::One(low), Operand::One(high)) => Operand::Many(vec![low, high]),
            // not a pair of scalars, rendering drops it
            _ => Operand::Many(Vec::new()),
        };
        self.where_(column, "BETWEEN", bounds)
    }

    pub fn where_null<C: Into<SmolStr>>(&mut self, column: C) -> &mut Self {
        self.where_(column, "IS NULL", Value::Null)
    }

    pub fn where_not_null<C: Into<SmolStr>>(&mut self, column: C) -> &mut Self {
        self.where_(column, "IS NOT NULL", Value::Null)
    }

    pub fn select<S: IntoIdents>(&mut self, columns: S) -> &mut Self {
        self.parts.columns = columns.into_idents();
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.parts.distinct = true;
        self
    }

    fn push_join<S, C>(&mut self, kind: JoinKind, table: S, on: C) -> &mut Self
    where
        S: Into<SmolStr>,
        C: Into<SmolStr>,
    {
        self.parts.joins.push(Join::new(kind, table, on));
        self
    }

    pub fn join<S: Into<SmolStr>, C: Into<SmolStr>>(&mut self, table: S, on: C) -> &mut Self {
        self.push_join(JoinKind::Inner, table, on)
    }

    pub fn left_join<S: Into<SmolStr>, C: Into<SmolStr>>(&mut self, table: S, on: C) -> &mut Self {
        self.push_join(JoinKind::Left, table, on)
    }

    pub fn right_join<S: Into<SmolStr>, C: Into<SmolStr>>(&mut self, table: S, on: C) -> &mut Self {
        self.push_join(JoinKind::Right, table, on)
    }

    pub fn full_join<S: Into<SmolStr>, C: Into<SmolStr>>(&mut self, table: S, on: C) -> &mut Self {
        self.push_join(JoinKind::Full, table, on)
    }

    pub fn order_by<S: Into<SmolStr>>(&mut self, column: S, order: Order) -> &mut Self {
        self.parts.orders.push(OrderBy::new(column, order));
        self
    }

    pub fn group_by<S: IntoIdents>(&mut self, columns: S) -> &mut Self {
        self.parts.groups.extend(columns.into_idents());
        self
    }

    pub fn having<C, O, V>(&mut self, column: C, operator: O, value: V) -> &mut Self
    where
        C: Into<SmolStr>,
        O: Into<SmolStr>,
        V: IntoOperand,
    {
        self.parts
            .having
            .push(WhereClause::new(Conjunction::And, column, operator, value));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.parts.paginator.limit(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.parts.paginator.offset(offset);
        self
    }

    /// One based page of `per_page` rows.
    pub fn paginate(&mut self, page: u64, per_page: u64) -> &mut Self {
        self.parts.paginator.paginate(page, per_page);
        self
    }

    pub fn apply(&mut self, fragment: &Fragment) -> &mut Self {
        self.parts.merge(fragment);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        writer::render(self, self.engine.dialect())
    }

    pub fn preview(&self) -> Preview {
        let (sql, args) = self.to_sql();
        Preview { sql, args }
    }

    pub fn execute<E: Executor>(&self, executor: &mut E) -> Result<Vec<T>> {
        self.engine.check(&[&self.parts.wheres, &self.parts.having])?;
        let (sql, args) = self.to_sql();
        self.engine.fetch(executor, &sql, &args)
    }

    /// The first matching record, limiting the query to one row when no limit is set.
    pub fn first<E: Executor>(&self, executor: &mut E) -> Result<T> {
        let mut single = self.clone();
        if single.parts.paginator.maybe_limit.is_none() {
            single.parts.paginator.limit(1);
        }
        single.execute(executor)?.into_iter().next().ok_or(Error::NoRows)
    }

    pub fn exists<E: Executor>(&self, executor: &mut E) -> Result<bool> {
        self.engine.check(&[&self.parts.wheres, &self.parts.having])?;
        let (sql, args) = self.to_sql();
        let sql = format!("SELECT EXISTS({sql})");
        let Some(value) = self.engine.fetch_value(executor, &sql, &args)? else {
            return Ok(false);
        };
        let mut exists = false;
        coerce::assign(&mut exists, value, Coercion::Strict)
            .map_err(|source| Error::scan(None, source))?;
        Ok(exists)
    }

    pub fn not_exists<E: Executor>(&self, executor: &mut E) -> Result<bool> {
        self.exists(executor).map(|exists| !exists)
    }

    pub(crate) fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub(crate) fn parts(&self) -> &Fragment {
        &self.parts
    }

    /// Writes everything up to and including HAVING with the given projection.
    pub(crate) fn write_head<W: std::fmt::Write>(
        &self,
        aggregate: Option<(Aggregate, &str)>,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        let parts = &self.parts;
        context.writer.write_str("SELECT ")?;
        match aggregate {
            Some((function, column)) => {
                context.writer.write_str(function.as_str())?;
                context.writer.write_char('(')?;
                context.write_table(column)?;
                context.writer.write_char(')')?;
            }
            None => {
                if parts.distinct {
                    context.writer.write_str("DISTINCT ")?;
                }
                if parts.columns.is_empty() {
                    context.writer.write_char('*')?;
                } else {
                    context.write_idents(&parts.columns)?;
                }
            }
        }

        context.writer.write_str(" FROM ")?;
        context.write_table(&self.table)?;

        for join in &parts.joins {
            context.writer.write_char(' ')?;
            context.writer.write_str(&context.dialect.build_join(join))?;
        }

        condition::write_clause("WHERE", &parts.wheres, context)?;

        if !parts.groups.is_empty() {
            context.writer.write_str(" GROUP BY ")?;
            context.write_idents(&parts.groups)?;
        }

        condition::write_clause("HAVING", &parts.having, context)
    }
}

impl<T: Record> FormatWriter for Query<'_, T> {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        self.write_head(None, context)?;

        let parts = &self.parts;
        if !parts.orders.is_empty() {
            context.writer.write_char(' ')?;
            context
                .writer
                .write_str(&context.dialect.build_order_by(&parts.orders))?;
        }
        if !parts.paginator.is_empty() {
            context.writer.write_char(' ')?;
            context.writer.write_str(&context.dialect.build_limit_offset(
                parts.paginator.maybe_limit,
                parts.paginator.maybe_offset,
            ))?;
        }
        Ok(())
    }
}

/// Rendered SQL and arguments of a statement, for inspection before running it.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    sql: String,
    args: Vec<Value>,
}

impl Preview {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The SQL with every `$n` or `?` placeholder replaced by its argument.
    ///
    /// Strings are single quoted and null renders as `NULL`. Only meant for
    /// reading, the result is not escaped.
    pub fn sql_with_args(&self) -> String {
        let mut out = String::with_capacity(self.sql.len() + self.args.len() * 8);
        let mut positional = 0;
        let mut chars = self.sql.char_indices().peekable();
        while let Some((index, char)) = chars.next() {
            match char {
                '$' => {
                    let start = index + 1;
                    let mut end = start;
                    while let Some(&(next, digit)) = chars.peek() {
                        if !digit.is_ascii_digit() {
                            break;
                        }
                        end = next + 1;
                        chars.next();
                    }
                    let arg = self.sql[start..end]
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|n| self.args.get(n));
                    match arg {
                        Some(arg) => write_arg(&mut out, arg),
                        None => out.push_str(&self.sql[index..end]),
                    }
                }
                '?' => {
                    match self.args.get(positional) {
                        Some(arg) => write_arg(&mut out, arg),
                        None => out.push('?'),
                    }
                    positional += 1;
                }
                other => out.push(other),
            }
        }
        out
    }
}

fn write_arg(out: &mut String, arg: &Value) {
    match arg {
        Value::String(s) => {
            out.push('\'');
            out.push_str(s);
            out.push('\'');
        }
        other => out.push_str(&other.to_string()),
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQL: {}", self.sql)?;
        if !self.args.is_empty() {
            f.write_str("\nArgs: [")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Config, Record,
        dialect::Dialect,
        engine::{Caches, Engine},
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
        #[db(column = "status")]
        pub status: Option<String>,
    }

    fn engine(dialect: Dialect) -> Engine {
        Engine::with_caches(Config::new(dialect), Caches::default())
    }

    #[test]
    fn test_select_all() {
        let engine = engine(Dialect::Postgres);
        let (sql, args) = engine.query::<User>().to_sql();
        assert_eq!("SELECT * FROM \"users\"", sql);
        assert!(args.is_empty());
    }

    #[test]
    fn test_full_select() {
        let engine = engine(Dialect::Postgres);
        let mut query = engine.query::<User>();
        query
            .select(["users.id", "users.name as username"])
            .distinct()
            .left_join("posts", "posts.user_id = users.id")
            .where_eq("users.status", "active")
            .or_where("users.id", "in", [1, 2])
            .group_by(["users.id", "users.name"])
            .having("count", ">", 3)
            .order_by("users.name", Order::Asc)
            .limit(10)
            .offset(20);
        let (sql, args) = query.to_sql();
        assert_eq!(
            "SELECT DISTINCT \"users\".\"id\", \"users\".\"name\" AS \"username\" FROM \"users\" \
             LEFT JOIN \"posts\" ON posts.user_id = users.id \
             WHERE \"users\".\"status\" = $1 OR \"users\".\"id\" IN ($2, $3) \
             GROUP BY \"users\".\"id\", \"users\".\"name\" HAVING \"count\" > $4 \
             ORDER BY \"users\".\"name\" ASC LIMIT 10 OFFSET 20",
            sql
        );
        assert_eq!(
            vec![
                Value::String("active".into()),
                Value::I64(1),
                Value::I64(2),
                Value::I64(3)
            ],
            args
        );
    }

    #[test]
    fn test_invalid_clauses_do_not_emit_keyword() {
        let engine = engine(Dialect::MySql);
        let mut query = engine.query::<User>();
        query.where_("id", "===", 1).having("n", "IN", Vec::<i64>::new());
        assert_eq!("SELECT * FROM `users`", query.to_sql().0);
    }

    #[test]
    fn test_helpers() {
        let engine = engine(Dialect::Sqlite);
        let mut query = engine.query::<User>();
        query
            .where_between("id", 1, 9)
            .where_null("status")
            .where_not_null("name")
            .where_not_in("id", vec![4])
            .paginate(2, 25);
        let (sql, args) = query.to_sql();
        assert_eq!(
            "SELECT * FROM \"users\" WHERE \"id\" BETWEEN ? AND ? AND \"status\" IS NULL \
             AND \"name\" IS NOT NULL AND \"id\" NOT IN (?) LIMIT 25 OFFSET 25",
            sql
        );
        assert_eq!(3, args.len());
    }

    #[test]
    fn test_apply_fragment() {
        let engine = engine(Dialect::Postgres);
        let mut active = engine.fragment();
        active.where_("status", "=", "active").limit(5);

        let mut query = engine.query::<User>();
        query.where_("id", ">", 10).limit(1).apply(&active);
        assert_eq!(
            "SELECT * FROM \"users\" WHERE \"id\" > $1 AND \"status\" = $2 LIMIT 1",
            query.to_sql().0
        );
    }

    #[test]
    fn test_preview() {
        let engine = engine(Dialect::Postgres);
        let mut query = engine.query::<User>();
        query.where_eq("name", "ann").where_eq("status", Value::Null);
        for i in 0..9 {
            query.or_where("id", "=", i);
        }
        let preview = query.preview();
        assert_eq!(11, preview.args().len());
        let substituted = preview.sql_with_args();
        assert!(substituted.starts_with(
            "SELECT * FROM \"users\" WHERE \"name\" = 'ann' AND \"status\" = NULL OR \"id\" = 0"
        ));
        assert!(substituted.ends_with("OR \"id\" = 8"));
        assert!(preview.to_string().starts_with("SQL: SELECT"));
        assert!(preview.to_string().contains("\nArgs: [ann, NULL, 0"));
    }

    #[test]
    fn test_execute_and_first() {
        let engine = engine(Dialect::Postgres);
        let mut conn = MemoryConnection::new("postgres");
        conn.push_rows(MemoryRows::new(["id", "name", "status"]).row([
            Value::I64(1),
            Value::String("Alice".into()),
            Value::Null,
        ]));
        conn.push_rows(MemoryRows::new(["id", "name"]));

        let mut query = engine.query::<User>();
        query.where_eq("id", 1);
        let users = query.execute(&mut conn).unwrap();
        assert_eq!(
            vec![User { id: 1, name: "Alice".into(), status: None }],
            users
        );

        let error = query.first(&mut conn).unwrap_err();
        assert!(error.is_no_rows());
        assert_eq!(
            "SELECT * FROM \"users\" WHERE \"id\" = $1 LIMIT 1",
            conn.statements()[1].sql
        );
    }

    #[test]
    fn test_exists() {
        let engine = engine(Dialect::Sqlite);
        let mut conn = MemoryConnection::new("sqlite");
        conn.push_rows(MemoryRows::new(["exists"]).row([Value::I64(1)]));
        conn.push_rows(MemoryRows::new(["exists"]).row([Value::Bool(false)]));

        let mut query = engine.query::<User>();
        query.where_eq("name", "bob");
        assert!(query.exists(&mut conn).unwrap());
        assert!(query.not_exists(&mut conn).unwrap());
        assert_eq!(
            "SELECT EXISTS(SELECT * FROM \"users\" WHERE \"name\" = ?)",
            conn.statements()[0].sql
        );
    }

    #[test]
    fn test_strict_operators_fail_before_execution() {
        let engine = Engine::with_caches(Config::default().strict(), Caches::default());
        let mut conn = MemoryConnection::new("postgres");
        let mut query = engine.query::<User>();
        query.where_("id", "LIKE BINARY", 1);
        assert!(matches!(
            query.execute(&mut conn),
            Err(Error::InvalidOperator { .. })
        ));
        assert!(conn.statements().is_empty());
    }
}
