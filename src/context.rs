//! Execution context: the optional worker pool shared by all operators.
//!
//! Every operator that may fan work out takes a `&Context`. A context built
//! without workers runs everything on the calling thread; a context built
//! with a pool lets relation construction, merges, iteration advances and
//! the join operators split their work across that pool. Either way the
//! operators are synchronous: a call returns only once all of its worker
//! tasks have joined, and the result is independent of the worker count.

use std::fmt;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

/// Options recognized when building a [`Context`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextOptions {
    /// Number of worker threads. `None` or `Some(0)` means sequential.
    pub worker_count: Option<usize>,
}

/// Error type for context construction.
#[derive(Debug)]
pub enum ContextError {
    /// The worker pool could not be built.
    PoolBuild(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolBuild(reason) => write!(f, "failed to build worker pool: {reason}"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Shared execution context.
///
/// Cloning is cheap: clones share the same worker pool.
#[derive(Clone, Default)]
pub struct Context {
    pool: Option<Arc<ThreadPool>>,
}

/// Minimum input length before a sort is sent to the pool.
pub(crate) const PARALLEL_SORT_MIN: usize = 4096;

/// Minimum per-operand length before a merge is split across the pool.
pub(crate) const PARALLEL_MERGE_MIN: usize = 4096;

/// Chunk length used when splitting a scan across workers.
pub(crate) const PARALLEL_CHUNK: usize = 1024;

impl Context {
    /// A context that runs every operation on the calling thread.
    pub fn sequential() -> Self {
        Self { pool: None }
    }

    /// Build a context from options, constructing a worker pool if requested.
    pub fn with_options(options: ContextOptions) -> Result<Self, ContextError> {
        match options.worker_count {
            None | Some(0) => Ok(Self::sequential()),
            Some(workers) => Self::with_workers(workers),
        }
    }

    /// Build a context with a pool of `workers` threads. Zero workers
    /// means no pool at all, not rayon's default-sized one.
    pub fn with_workers(workers: usize) -> Result<Self, ContextError> {
        if workers == 0 {
            return Ok(Self::sequential());
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("zodd-worker-{i}"))
            .build()
            .map_err(|e| ContextError::PoolBuild(e.to_string()))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Whether this context fans work out to a pool.
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    pub(crate) fn pool(&self) -> Option<&ThreadPool> {
        self.pool.as_deref()
    }

    /// Run `work` once per task, on the pool when one is present and there
    /// is more than one task. Results come back in task order regardless of
    /// scheduling, so callers observe deterministic output.
    pub(crate) fn map_tasks<T, R, F>(&self, tasks: &[T], work: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Send + Sync,
    {
        use rayon::prelude::*;
        match self.pool() {
            Some(pool) if tasks.len() > 1 => {
                pool.install(|| tasks.par_iter().map(&work).collect())
            }
            _ => tasks.iter().map(&work).collect(),
        }
    }

    /// Like [`Context::map_tasks`] but each task owns its state, so `work`
    /// can consume and mutate it (used where workers need private clones).
    pub(crate) fn run_owned_tasks<T, R, F>(&self, tasks: Vec<T>, work: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        use rayon::prelude::*;
        match self.pool() {
            Some(pool) if tasks.len() > 1 => {
                pool.install(|| tasks.into_par_iter().map(&work).collect())
            }
            _ => tasks.into_iter().map(&work).collect(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field(
                "workers",
                &self.pool.as_ref().map_or(0, |p| p.current_num_threads()),
            )
            .finish()
    }
}
