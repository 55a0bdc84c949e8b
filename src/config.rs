use std::time::Duration;

use crate::{coerce::Coercion, dialect::Dialect};

/// What happens to a WHERE or HAVING clause that cannot be rendered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OperatorPolicy {
    /// Unknown operators and malformed values are dropped from the statement.
    #[default]
    Lenient,
    /// The statement fails before it reaches the driver.
    Strict,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub dialect: Dialect,
    pub coercion: Coercion,
    pub operators: OperatorPolicy,
    /// Initial capacity of the vector a scan collects into.
    pub result_capacity: usize,
    /// Statements slower than this are logged at warn level.
    pub slow_query: Duration,
    /// How many scan buffers the pool keeps around.
    pub pool_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            coercion: Coercion::Lenient,
            operators: OperatorPolicy::Lenient,
            result_capacity: 10,
            slow_query: Duration::from_millis(100),
            pool_capacity: 32,
        }
    }
}

impl Config {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_operators(mut self, operators: OperatorPolicy) -> Self {
        self.operators = operators;
        self
    }

    pub fn with_result_capacity(mut self, capacity: usize) -> Self {
        self.result_capacity = capacity;
        self
    }

    pub fn with_slow_query(mut self, threshold: Duration) -> Self {
        self.slow_query = threshold;
        self
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Sets both the coercion mode and the operator policy to strict.
    pub fn strict(self) -> Self {
        self.with_coercion(Coercion::Strict)
            .with_operators(OperatorPolicy::Strict)
    }
}
