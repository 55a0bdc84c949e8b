use crate::{
    driver::Executor,
    error::{Error, Result},
    model::Record,
    query::Query,
    value::Value,
    writer::{FormatContext, FormatWriter, render},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

struct AggregateQuery<'q, 'e, T> {
    query: &'q Query<'e, T>,
    function: Aggregate,
    column: &'q str,
}

impl<T: Record> FormatWriter for AggregateQuery<'_, '_, T> {
    fn format_writer<W: std::fmt::Write>(
        &self,
        context: &mut FormatContext<'_, W>,
    ) -> std::fmt::Result {
        self.query
            .write_head(Some((self.function, self.column)), context)
    }
}

impl<T: Record> Query<'_, T> {
    /// SQL and arguments of `FUNCTION(column)` over this query, without ordering or limits.
    pub fn aggregate_sql(&self, function: Aggregate, column: &str) -> (String, Vec<Value>) {
        let aggregate = AggregateQuery {
            query: self,
            function,
            column,
        };
        render(&aggregate, self.engine().dialect())
    }

    /// Runs an aggregate and returns the raw value. Fails with `NoRows` on an empty result.
    pub fn aggregate<E: Executor>(
        &self,
        executor: &mut E,
        function: Aggregate,
        column: &str,
    ) -> Result<Value> {
        let parts = self.parts();
        self.engine().check(&[&parts.wheres, &parts.having])?;
        let (sql, args) = self.aggregate_sql(function, column);
        self.engine()
            .fetch_value(executor, &sql, &args)?
            .ok_or(Error::NoRows)
    }

    pub fn count<E: Executor>(&self, executor: &mut E) -> Result<i64> {
        let value = self.aggregate(executor, Aggregate::Count, "*")?;
        Ok(match value {
            Value::I64(i) => i,
            Value::F64(f) => f as i64,
            _ => 0,
        })
    }

    pub fn sum<E: Executor>(&self, executor: &mut E, column: &str) -> Result<f64> {
        let value = self.aggregate(executor, Aggregate::Sum, column)?;
        Ok(match value {
            Value::F64(f) => f,
            Value::I64(i) => i as f64,
            _ => 0.0,
        })
    }

    pub fn avg<E: Executor>(&self, executor: &mut E, column: &str) -> Result<f64> {
        let value = self.aggregate(executor, Aggregate::Avg, column)?;
        Ok(match value {
            Value::F64(f) => f,
            Value::I64(i) => i as f64,
            _ => 0.0,
        })
    }

    pub fn min<E: Executor>(&self, executor: &mut E, column: &str) -> Result<Value> {
        self.aggregate(executor, Aggregate::Min, column)
    }

    pub fn max<E: Executor>(&self, executor: &mut E, column: &str) -> Result<Value> {
        self.aggregate(executor, Aggregate::Max, column)
    }
}
