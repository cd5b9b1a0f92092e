//! Backends that drive the chunked reductions
//!
//! Both backends split the work into the same chunks and merge the chunk
//! results in the same order (see `pbcstat_internal`), so they produce
//! bitwise identical output.

use crate::error::Error;
use ndarray::Array2;
use pbcstat_internal::{
    Executor, ReductionSpec, StatePackViewMut, check_out_shape, chunk_ranges,
    finish_chunked_reduce, reduce_chunk,
};
use rayon::prelude::*;
use std::num::NonZeroUsize;

/// Describes how a reduction is executed
///
/// `chunk_len` is the number of work items reduced into each scratch
/// statepack. It controls the order of floating-point additions, so results
/// only match bit-for-bit between runs that share a `chunk_len`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeSpec {
    n_workers: NonZeroUsize,
    chunk_len: NonZeroUsize,
}

impl RuntimeSpec {
    pub const DEFAULT_CHUNK_LEN: usize = 4096;

    pub fn new(n_workers: usize, chunk_len: usize) -> Result<Self, Error> {
        let n_workers = NonZeroUsize::new(n_workers)
            .ok_or_else(|| Error::parameter("n_workers", "must be at least 1"))?;
        let chunk_len = NonZeroUsize::new(chunk_len)
            .ok_or_else(|| Error::parameter("chunk_len", "must be at least 1"))?;
        Ok(Self {
            n_workers,
            chunk_len,
        })
    }

    /// Runs everything on the calling thread
    pub fn serial() -> Self {
        Self {
            n_workers: NonZeroUsize::MIN,
            chunk_len: NonZeroUsize::new(Self::DEFAULT_CHUNK_LEN).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn with_n_workers(self, n_workers: usize) -> Result<Self, Error> {
        Self::new(n_workers, self.chunk_len.get())
    }

    pub fn with_chunk_len(self, chunk_len: usize) -> Result<Self, Error> {
        Self::new(self.n_workers.get(), chunk_len)
    }

    pub fn n_workers(&self) -> usize {
        self.n_workers.get()
    }

    pub fn chunk_len(&self) -> NonZeroUsize {
        self.chunk_len
    }
}

impl Default for RuntimeSpec {
    /// one worker per available core
    fn default() -> Self {
        let n_workers = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self {
            n_workers,
            ..Self::serial()
        }
    }
}

/// Reduces every chunk on the calling thread
pub struct SerialExecutor;

impl Executor for SerialExecutor {
    fn drive_reduce(
        &mut self,
        out: &mut StatePackViewMut,
        reduction_spec: &impl ReductionSpec,
        chunk_len: NonZeroUsize,
    ) -> Result<(), &'static str> {
        check_out_shape(out, reduction_spec)?;
        let mut scratch: Vec<Array2<f64>> = chunk_ranges(reduction_spec.n_items(), chunk_len)
            .into_iter()
            .map(|items| reduce_chunk(reduction_spec, items))
            .collect();
        finish_chunked_reduce(reduction_spec, out, &mut scratch)
    }
}

/// Reduces the chunks on a dedicated rayon pool
pub struct ThreadPoolExecutor {
    pool: rayon::ThreadPool,
}

impl ThreadPoolExecutor {
    pub fn new(n_workers: usize) -> Result<Self, Error> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .thread_name(|i| format!("pbcstat-worker-{i}"))
            .build()
            .map_err(|err| Error::thread_pool(err.to_string()))?;
        Ok(Self { pool })
    }

    pub fn n_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `op` inside of the pool
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }
}

impl Executor for ThreadPoolExecutor {
    fn drive_reduce(
        &mut self,
        out: &mut StatePackViewMut,
        reduction_spec: &impl ReductionSpec,
        chunk_len: NonZeroUsize,
    ) -> Result<(), &'static str> {
        check_out_shape(out, reduction_spec)?;
        let ranges = chunk_ranges(reduction_spec.n_items(), chunk_len);
        // collect keeps the chunk order, regardless of which worker reduced
        // which chunk
        let mut scratch: Vec<Array2<f64>> = self.pool.install(|| {
            ranges
                .into_par_iter()
                .map(|items| reduce_chunk(reduction_spec, items))
                .collect()
        });
        finish_chunked_reduce(reduction_spec, out, &mut scratch)
    }
}

/// The backend selected by a [`RuntimeSpec`]
pub(crate) enum Backend {
    Serial(SerialExecutor),
    ThreadPool(ThreadPoolExecutor),
}

impl Backend {
    pub(crate) fn from_runtime(runtime: &RuntimeSpec) -> Result<Self, Error> {
        if runtime.n_workers() == 1 {
            Ok(Backend::Serial(SerialExecutor))
        } else {
            Ok(Backend::ThreadPool(ThreadPoolExecutor::new(runtime.n_workers())?))
        }
    }

    /// Runs `op` inside of the backend's pool (if it has one)
    pub(crate) fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match self {
            Backend::Serial(_) => op(),
            Backend::ThreadPool(executor) => executor.install(op),
        }
    }
}

impl Executor for Backend {
    fn drive_reduce(
        &mut self,
        out: &mut StatePackViewMut,
        reduction_spec: &impl ReductionSpec,
        chunk_len: NonZeroUsize,
    ) -> Result<(), &'static str> {
        match self {
            Backend::Serial(executor) => executor.drive_reduce(out, reduction_spec, chunk_len),
            Backend::ThreadPool(executor) => executor.drive_reduce(out, reduction_spec, chunk_len),
        }
    }
}
