use std::panic::{self, AssertUnwindSafe};

use crate::{
    driver::{Connection, Transaction},
    error::{Error, Result},
};

/// Runs `f` inside a transaction on `conn`.
///
/// Commits when `f` returns `Ok` and rolls back when it returns `Err` or
/// panics. A failed rollback after an error is reported as
/// [`Error::Rollback`] carrying the original error. A panic is resumed once
/// the rollback was attempted.
pub fn with_transaction<'c, C, F, R>(conn: &'c mut C, f: F) -> Result<R>
where
    C: Connection + 'c,
    F: FnOnce(&mut C::Tx<'c>) -> Result<R>,
{
    let mut tx = conn.begin().map_err(Error::Begin)?;
    tracing::debug!("transaction started");

    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut tx))) {
        Ok(Ok(value)) => {
            tx.commit().map_err(Error::Commit)?;
            tracing::debug!("transaction committed");
            Ok(value)
        }
        Ok(Err(original)) => match tx.rollback() {
            Ok(()) => {
                tracing::debug!(error = %original, "transaction rolled back");
                Err(original)
            }
            Err(source) => Err(Error::Rollback {
                source,
                original: Box::new(original),
            }),
        },
        Err(payload) => {
            if let Err(error) = tx.rollback() {
                tracing::error!(%error, "rollback after panic failed");
            }
            panic::resume_unwind(payload)
        }
    }
}
