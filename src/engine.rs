use std::{
    sync::{Arc, OnceLock},
    time::Instant,
};

use smol_str::SmolStr;

use crate::{
    config::{Config, OperatorPolicy},
    column::ColumnMapCache,
    condition::Conditions,
    delete::Delete,
    dialect::Dialect,
    driver::{ExecResult, Executor, Rows},
    error::{Error, Result},
    fragment::Fragment,
    hooks::Hooks,
    insert::Insert,
    metadata::{MetadataCache, RecordMetadata},
    model::{Model, Record},
    pool::ScanBufferPool,
    query::Query,
    raw::RawQuery,
    scan,
    update::Update,
    value::{IntoValues, Value},
};

/// The shared state scans read and populate.
///
/// Cloning is cheap and clones share the same caches.
#[derive(Debug, Clone)]
pub struct Caches {
    pub metadata: Arc<MetadataCache>,
    pub columns: Arc<ColumnMapCache>,
    pub buffers: Arc<ScanBufferPool>,
}

impl Default for Caches {
    fn default() -> Self {
        Self::new(Config::default().pool_capacity)
    }
}

impl Caches {
    /// Fresh caches, independent from every other engine.
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            metadata: Arc::new(MetadataCache::new()),
            columns: Arc::new(ColumnMapCache::new()),
            buffers: Arc::new(ScanBufferPool::new(pool_capacity)),
        }
    }

    /// The process wide caches used by [`Engine::new`].
    pub fn global() -> &'static Caches {
        static GLOBAL: OnceLock<Caches> = OnceLock::new();
        GLOBAL.get_or_init(Caches::default)
    }

    /// The same metadata and column maps with a pool of its own.
    pub fn with_pool_capacity(&self, pool_capacity: usize) -> Self {
        Self {
            metadata: Arc::clone(&self.metadata),
            columns: Arc::clone(&self.columns),
            buffers: Arc::new(ScanBufferPool::new(pool_capacity)),
        }
    }
}

/// Entry point for building and running statements.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    caches: Caches,
    hooks: Hooks,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    /// An engine over the process wide caches.
    ///
    /// A `pool_capacity` other than the default gets a dedicated buffer pool.
    pub fn new(config: Config) -> Self {
        let global = Caches::global();
        let caches = if config.pool_capacity == global.buffers.capacity() {
            global.clone()
        } else {
            global.with_pool_capacity(config.pool_capacity)
        };
        Self::with_caches(config, caches)
    }

    /// An engine over `caches`, whose pool wins over `config.pool_capacity`.
    pub fn with_caches(config: Config, caches: Caches) -> Self {
        Self {
            config,
            caches,
            hooks: Hooks::default(),
        }
    }

    /// An engine for the dialect matching `driver`.
    pub fn detect(driver: &str) -> Self {
        Self::new(Config::new(Dialect::detect(driver)))
    }

    pub fn for_executor<E: Executor>(executor: &E) -> Self {
        Self::detect(executor.driver_name())
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn metadata<T: Model>(&self) -> Result<Arc<RecordMetadata>> {
        self.caches.metadata.resolve::<T>()
    }

    pub fn table_name<T: Model>(&self) -> SmolStr {
        self.caches.metadata.table_name::<T>()
    }

    pub fn query<T: Record>(&self) -> Query<'_, T> {
        Query::new(self)
    }

    pub fn insert<T: Record>(&self, value: T) -> Insert<'_, T> {
        Insert::new(self, vec![value])
    }

    /// Fails with [`Error::EmptySet`] when `values` is empty.
    pub fn insert_batch<T: Record>(&self, values: Vec<T>) -> Result<Insert<'_, T>> {
        if values.is_empty() {
            return Err(Error::EmptySet);
        }
        Ok(Insert::new(self, values))
    }

    pub fn update<T: Record>(&self) -> Update<'_, T> {
        Update::new(self)
    }

    pub fn delete<T: Record>(&self) -> Delete<'_, T> {
        Delete::new(self)
    }

    pub fn raw<T: Record, A: IntoValues>(&self, sql: &str, args: A) -> RawQuery<'_, T> {
        RawQuery::new(self, sql, args.into_values())
    }

    pub fn fragment(&self) -> Fragment {
        Fragment::new()
    }

    /// Scans an already executed result set into records.
    pub fn scan<T: Record, R: Rows + ?Sized>(&self, rows: &mut R) -> Result<Vec<T>> {
        scan::scan_rows(
            rows,
            &self.caches.metadata,
            &self.caches.columns,
            &self.caches.buffers,
            self.config.coercion,
            self.config.result_capacity,
        )
    }

    /// Validates conditions up front when the operator policy is strict.
    pub(crate) fn check(&self, conditions: &[&Conditions]) -> Result<()> {
        if self.config.operators == OperatorPolicy::Strict {
            for condition in conditions {
                condition.validate()?;
            }
        }
        Ok(())
    }

    pub(crate) fn fetch<T, E>(&self, executor: &mut E, sql: &str, args: &[Value]) -> Result<Vec<T>>
    where
        T: Record,
        E: Executor,
    {
        self.hooks.run_before(sql, args)?;
        let started = Instant::now();
        let scanned = {
            let mut rows = executor
                .query(sql, args)
                .map_err(|source| Error::query(sql, args, source))?;
            self.scan(&mut rows)
        };
        self.log(sql, args, started);
        let items = scanned?;
        self.hooks.run_after(sql, args);
        Ok(items)
    }

    /// First column of the first row, `None` on an empty result.
    pub(crate) fn fetch_value<E: Executor>(
        &self,
        executor: &mut E,
        sql: &str,
        args: &[Value],
    ) -> Result<Option<Value>> {
        self.hooks.run_before(sql, args)?;
        let started = Instant::now();
        let scanned = {
            let mut rows = executor
                .query(sql, args)
                .map_err(|source| Error::query(sql, args, source))?;
            scan::scan_scalar(&mut rows)
        };
        self.log(sql, args, started);
        let value = scanned?;
        self.hooks.run_after(sql, args);
        Ok(value)
    }

    pub(crate) fn exec<E: Executor>(
        &self,
        executor: &mut E,
        sql: &str,
        args: &[Value],
    ) -> Result<ExecResult> {
        self.hooks.run_before(sql, args)?;
        let started = Instant::now();
        let result = executor
            .execute(sql, args)
            .map_err(|source| Error::query(sql, args, source));
        self.log(sql, args, started);
        let result = result?;
        self.hooks.run_after(sql, args);
        Ok(result)
    }

    fn log(&self, sql: &str, args: &[Value], started: Instant) {
        let elapsed = started.elapsed();
        tracing::debug!(sql, args = args.len(), ?elapsed, "executed statement");
        if elapsed > self.config.slow_query {
            tracing::warn!(sql, ?elapsed, threshold = ?self.config.slow_query, "slow query");
        }
    }
}
