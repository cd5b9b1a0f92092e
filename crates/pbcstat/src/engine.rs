//! Persistent, distance-binned accumulation of pair contributions

use crate::error::Error;
use crate::executor::{Backend, RuntimeSpec};
use crate::locality::{Bond, NeighborList};
use ndarray::Array2;
use pbcstat_internal::{
    AccumStateView, BinEdges, Datum, Executor, PairValue, Reducer, ReductionSpec, RegularBinEdges,
    StatePackViewMut, SumCount, alloc_statepack_buf, reset_full_statepack,
};
use std::ops::Range;

/// Whether an engine holds accumulated data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uncomputed,
    Accumulated,
}

/// Folds the bonds of a neighbor list into the engine's bins
struct BondReduction<'a, V, F> {
    nlist: &'a NeighborList,
    bins: &'a RegularBinEdges,
    reducer: &'a SumCount<V>,
    contribution: &'a F,
}

impl<V, F> ReductionSpec for BondReduction<'_, V, F>
where
    V: PairValue,
    F: Fn(&Bond) -> V + Sync,
{
    type ReducerType = SumCount<V>;

    fn get_reducer(&self) -> &SumCount<V> {
        self.reducer
    }

    fn n_bins(&self) -> usize {
        self.bins.n_bins()
    }

    fn n_items(&self) -> usize {
        self.nlist.len()
    }

    fn collect_contrib(&self, statepack: &mut StatePackViewMut, items: Range<usize>) {
        let distances = &self.nlist.distances()[items.clone()];
        for (i, &distance) in items.zip(distances) {
            let Some(bin_index) = self.bins.bin_index(distance) else {
                continue;
            };
            let Some(bond) = self.nlist.get(i) else {
                continue;
            };
            let datum = Datum::from_value((self.contribution)(&bond));
            self.reducer
                .consume(&mut statepack.get_state_mut(bin_index), &datum);
        }
    }
}

/// Accumulates a per-bin sum and count of pair contributions
///
/// Bonds are binned by distance; bonds that fall outside of the bins are
/// dropped. The accumulated state persists across calls to
/// [`AccumulationEngine::accumulate`] until [`AccumulationEngine::reset`].
pub struct AccumulationEngine<V: PairValue> {
    bins: RegularBinEdges,
    reducer: SumCount<V>,
    statepack: Array2<f64>,
    state: EngineState,
    runtime: RuntimeSpec,
    backend: Backend,
}

impl<V: PairValue> AccumulationEngine<V> {
    pub fn new(bins: RegularBinEdges, runtime: RuntimeSpec) -> Result<Self, Error> {
        let reducer = SumCount::new();
        let statepack = alloc_statepack_buf(reducer.accum_state_size(), bins.n_bins());
        let backend = Backend::from_runtime(&runtime)?;
        Ok(Self {
            bins,
            reducer,
            statepack,
            state: EngineState::Uncomputed,
            runtime,
            backend,
        })
    }

    pub fn bins(&self) -> &RegularBinEdges {
        &self.bins
    }

    pub fn runtime(&self) -> &RuntimeSpec {
        &self.runtime
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Discards everything accumulated so far
    pub fn reset(&mut self) {
        let mut statepack = StatePackViewMut::from_array_view(self.statepack.view_mut());
        reset_full_statepack(&self.reducer, &mut statepack);
        self.state = EngineState::Uncomputed;
    }

    /// Adds `contribution(bond)` of every bond to the bin holding its distance
    pub fn accumulate<F>(&mut self, nlist: &NeighborList, contribution: F) -> Result<(), Error>
    where
        F: Fn(&Bond) -> V + Sync,
    {
        let reduction = BondReduction {
            nlist,
            bins: &self.bins,
            reducer: &self.reducer,
            contribution: &contribution,
        };
        log::debug!(
            "accumulating {} bonds into {} bins with {} worker(s)",
            nlist.len(),
            self.bins.n_bins(),
            self.runtime.n_workers()
        );
        let mut statepack = StatePackViewMut::from_array_view(self.statepack.view_mut());
        self.backend
            .drive_reduce(&mut statepack, &reduction, self.runtime.chunk_len())
            .map_err(Error::internal_legacy_adhoc)?;
        self.state = EngineState::Accumulated;
        Ok(())
    }

    /// [`AccumulationEngine::reset`] followed by
    /// [`AccumulationEngine::accumulate`]
    pub fn compute<F>(&mut self, nlist: &NeighborList, contribution: F) -> Result<(), Error>
    where
        F: Fn(&Bond) -> V + Sync,
    {
        self.reset();
        self.accumulate(nlist, contribution)
    }

    fn statepack_if_accumulated(&self, property: &'static str) -> Result<&Array2<f64>, Error> {
        match self.state {
            EngineState::Accumulated => Ok(&self.statepack),
            EngineState::Uncomputed => Err(Error::uncomputed(property)),
        }
    }

    /// Maps every bin's state through `f`
    fn per_bin<T>(
        &self,
        property: &'static str,
        f: impl Fn(&SumCount<V>, &AccumStateView) -> T,
    ) -> Result<Vec<T>, Error> {
        let buf = self.statepack_if_accumulated(property)?;
        Ok(buf
            .columns()
            .into_iter()
            .map(|col| f(&self.reducer, &AccumStateView::from_array_view(col)))
            .collect())
    }

    /// The number of bonds in each bin
    pub fn counts(&self) -> Result<Vec<u64>, Error> {
        self.per_bin("counts", |reducer, state| reducer.count(state))
    }

    /// The summed contributions of each bin
    pub fn sums(&self) -> Result<Vec<V>, Error> {
        self.per_bin("sums", |reducer, state| reducer.sum(state))
    }

    /// `sums / counts` per bin (zero for empty bins)
    pub fn means(&self) -> Result<Vec<V>, Error> {
        self.per_bin("means", |reducer, state| reducer.mean(state))
    }

    /// Runs `op` on the engine's worker pool
    pub(crate) fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.backend.install(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;

    fn nlist() -> NeighborList {
        NeighborList::from_arrays(
            2,
            3,
            &[0, 0, 1, 1, 1],
            &[0, 1, 0, 1, 2],
            &[0.2, 1.5, 0.7, 2.2, 9.0],
            None,
        )
        .unwrap()
    }

    fn engine(runtime: RuntimeSpec) -> AccumulationEngine<f64> {
        let bins = RegularBinEdges::from_width(0.0, 1.0, 3).unwrap();
        AccumulationEngine::new(bins, runtime).unwrap()
    }

    #[test]
    fn reads_require_accumulation() {
        let mut engine = engine(RuntimeSpec::serial());
        assert_eq!(engine.state(), EngineState::Uncomputed);
        let err = engine.counts().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::State);

        engine.accumulate(&nlist(), |_| 1.0).unwrap();
        assert_eq!(engine.state(), EngineState::Accumulated);
        assert!(engine.means().is_ok());

        engine.reset();
        assert_eq!(engine.means().unwrap_err().category(), ErrorCategory::State);
        assert_eq!(engine.sums().unwrap_err().category(), ErrorCategory::State);
    }

    #[test]
    fn bins_and_drops_out_of_range() {
        let mut engine = engine(RuntimeSpec::serial());
        engine
            .accumulate(&nlist(), |bond| bond.point_index as f64)
            .unwrap();
        assert_eq!(engine.counts().unwrap(), vec![2, 1, 1]);
        assert_eq!(engine.sums().unwrap(), vec![0.0, 1.0, 1.0]);
        assert_eq!(engine.means().unwrap(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn accumulate_extends_and_compute_restarts() {
        let mut engine = engine(RuntimeSpec::serial());
        for _ in 0..3 {
            engine.accumulate(&nlist(), |_| 2.0).unwrap();
        }
        assert_eq!(engine.counts().unwrap(), vec![6, 3, 3]);
        assert_eq!(engine.means().unwrap(), vec![2.0, 2.0, 2.0]);

        engine.compute(&nlist(), |_| 2.0).unwrap();
        assert_eq!(engine.counts().unwrap(), vec![2, 1, 1]);
    }

    #[test]
    fn empty_list_accumulates_zeros() {
        let mut engine = engine(RuntimeSpec::serial());
        let empty = NeighborList::from_arrays(1, 1, &[], &[], &[], None).unwrap();
        engine.accumulate(&empty, |_| 1.0).unwrap();
        assert_eq!(engine.counts().unwrap(), vec![0, 0, 0]);
        assert_eq!(engine.means().unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn pooled_matches_serial() {
        let runtime = RuntimeSpec::new(1, 2).unwrap();
        let mut serial = engine(runtime);
        let mut pooled = engine(runtime.with_n_workers(3).unwrap());
        let contribution = |bond: &Bond| 0.1 * bond.distance + bond.query_point_index as f64;
        serial.accumulate(&nlist(), contribution).unwrap();
        pooled.accumulate(&nlist(), contribution).unwrap();
        assert_eq!(serial.counts().unwrap(), pooled.counts().unwrap());
        assert_eq!(serial.sums().unwrap(), pooled.sums().unwrap());
    }
}
