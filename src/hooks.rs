use std::{fmt, sync::Arc};

use crate::{
    error::{BoxError, Error, Result},
    value::Value,
};

/// Observer called with a statement and its arguments.
pub type Hook = Arc<dyn Fn(&str, &[Value]) -> Result<(), BoxError> + Send + Sync>;

/// Ordered callbacks run around every statement an engine executes.
#[derive(Clone, Default)]
pub struct Hooks {
    before: Vec<Hook>,
    after: Vec<Hook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&str, &[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    pub fn after<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&str, &[Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.after.push(Arc::new(hook));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Runs the before hooks in order, stopping at the first failure.
    pub(crate) fn run_before(&self, sql: &str, args: &[Value]) -> Result<()> {
        for hook in &self.before {
            hook(sql, args).map_err(Error::Hook)?;
        }
        Ok(())
    }

    /// Runs every after hook. Failures are logged, the statement already ran.
    pub(crate) fn run_after(&self, sql: &str, args: &[Value]) {
        for hook in &self.after {
            if let Err(error) = hook(sql, args) {
                tracing::warn!(%sql, %error, "after hook failed");
            }
        }
    }
}
