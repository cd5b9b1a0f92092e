//! Binning, per-bin reducers and the chunked reduction machinery used by
//! `pbcstat`
//!
//! Errors are reported as `&'static str`; the public crate wraps them.

mod bins;
mod parallel;
mod reduce_utils;
mod reducer;
mod state;

pub use bins::{BinEdges, RegularBinEdges};
pub use parallel::{
    Executor, ReductionSpec, check_out_shape, chunk_ranges, finish_chunked_reduce, reduce_chunk,
};
pub use reduce_utils::{merge_full_statepacks, reset_full_statepack, tree_merge_statepacks};
pub use reducer::{Datum, PairValue, Reducer, SumCount};
pub use state::{AccumStateView, AccumStateViewMut, StatePackViewMut, alloc_statepack_buf};
