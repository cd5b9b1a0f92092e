//! Our parallelism abstractions split a reduction into fixed-size chunks
//!
//! In general, a parallel reduction is a calculation that can be broken into
//! parts, where each part can be computed simultaneously and the partial
//! results can be combined into a single result.
//!
//! Here, the units of work are contiguous ranges of a work-item stream (for
//! the public crate, the bonds of a neighbor list). Each range has the same
//! length (the last one may be shorter) and that length is chosen by the
//! caller, never by the number of workers. Every chunk is reduced into its own
//! scratch statepack and the scratch statepacks are then combined with
//! [`tree_merge_statepacks`]. Because neither the chunk boundaries nor the
//! merge order depend on how many workers executed the chunks, every
//! [`Executor`] produces bitwise identical output.

use crate::reduce_utils::{merge_full_statepacks, reset_full_statepack, tree_merge_statepacks};
use crate::reducer::Reducer;
use crate::state::{StatePackViewMut, alloc_statepack_buf};
use core::num::NonZeroUsize;
use core::ops::Range;
use ndarray::Array2;

/// Describes a binned reduction over a stream of work items
pub trait ReductionSpec: Sync {
    type ReducerType: Reducer + Sync;

    /// return a reference to the reducer
    fn get_reducer(&self) -> &Self::ReducerType;

    /// The number of bins (and therefore states) in the output statepack
    fn n_bins(&self) -> usize;

    /// The length of the work-item stream
    fn n_items(&self) -> usize;

    /// Consumes the contributions from `items` into `statepack`
    ///
    /// `statepack` is initialized before this is called.
    fn collect_contrib(&self, statepack: &mut StatePackViewMut, items: Range<usize>);

    /// the shape of the statepack that holds the output
    fn statepack_shape(&self) -> [usize; 2] {
        [self.get_reducer().accum_state_size(), self.n_bins()]
    }
}

/// Splits `0..n_items` into consecutive ranges of length `chunk_len` (the last
/// range may be shorter)
pub fn chunk_ranges(n_items: usize, chunk_len: NonZeroUsize) -> Vec<Range<usize>> {
    let chunk_len = chunk_len.get();
    (0..n_items.div_ceil(chunk_len))
        .map(|i| {
            let start = i * chunk_len;
            start..n_items.min(start + chunk_len)
        })
        .collect()
}

/// Reduces a single chunk into a freshly allocated scratch statepack
pub fn reduce_chunk(reduction_spec: &impl ReductionSpec, items: Range<usize>) -> Array2<f64> {
    let [accum_state_size, n_bins] = reduction_spec.statepack_shape();
    let mut buf = alloc_statepack_buf(accum_state_size, n_bins);
    let mut statepack = StatePackViewMut::from_array_view(buf.view_mut());
    reset_full_statepack(reduction_spec.get_reducer(), &mut statepack);
    reduction_spec.collect_contrib(&mut statepack, items);
    buf
}

/// Combines the per-chunk scratch statepacks (ordered by chunk index) and
/// merges the total into `out`
pub fn finish_chunked_reduce(
    reduction_spec: &impl ReductionSpec,
    out: &mut StatePackViewMut,
    scratch: &mut [Array2<f64>],
) -> Result<(), &'static str> {
    let reducer = reduction_spec.get_reducer();
    let mut statepacks: Vec<StatePackViewMut> = scratch
        .iter_mut()
        .map(|buf| StatePackViewMut::from_array_view(buf.view_mut()))
        .collect();
    tree_merge_statepacks(reducer, &mut statepacks)?;
    match statepacks.first() {
        Some(total) => merge_full_statepacks(reducer, out, total),
        None => Ok(()),
    }
}

/// Checks that `out` can hold the output of `reduction_spec`
pub fn check_out_shape(
    out: &StatePackViewMut,
    reduction_spec: &impl ReductionSpec,
) -> Result<(), &'static str> {
    if [out.state_size(), out.n_states()] != reduction_spec.statepack_shape() {
        Err("the out argument doesn't have the correct shape!")
    } else {
        Ok(())
    }
}

/// A backend that drives a chunked reduction
///
/// Implementors decide which worker reduces which chunk. They must gather the
/// scratch statepacks in chunk order and finish with
/// [`finish_chunked_reduce`].
pub trait Executor {
    /// Adds the reduction's contributions onto the states already in `out`
    fn drive_reduce(
        &mut self,
        out: &mut StatePackViewMut,
        reduction_spec: &impl ReductionSpec,
        chunk_len: NonZeroUsize,
    ) -> Result<(), &'static str>;
}
