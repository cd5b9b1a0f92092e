//! Define the per-bin accumulation machinery
//!
//! # Accumulation Machinery
//!
//! A statistic is computed for a stream of pair contributions, where each
//! element of the stream is a distance (used for binning), a value (which
//! contributes to the statistic) and a weight. Binning is taken care of
//! separately; the [`Reducer`] is only responsible for the statistic within
//! a single bin.
//! - We refer to the current state of a single bin as its `accum_state`.
//!   It is a short run of `f64` values whose layout only the reducer knows.
//! - The reducer encapsulates the logic for initializing, updating and
//!   merging one `accum_state` at a time.
//!
//! External code owns the collection of `accum_state`s (usually through a
//! [`StatePackViewMut`](crate::StatePackViewMut)). This keeps the reducers
//! agnostic about where the memory lives, which is what lets the executors
//! hand each chunk of work its own scratch statepack.

use crate::state::{AccumStateView, AccumStateViewMut};
use core::marker::PhantomData;
use core::ops::{Add, Mul};
use num_complex::Complex;

/// A quantity that can be accumulated into an `accum_state`
///
/// Implemented for `f64` and `Complex<f64>`. A value occupies
/// [`PairValue::N_COMPONENTS`] consecutive `f64` slots of a state.
pub trait PairValue:
    Copy + Send + Sync + PartialEq + core::fmt::Debug + Add<Output = Self> + Mul<Output = Self> + 'static
{
    const N_COMPONENTS: usize;

    fn zero() -> Self;

    /// The complex conjugate (the identity for real values)
    fn conj(self) -> Self;

    fn scale(self, factor: f64) -> Self;

    /// Divides every component by `divisor`
    fn unscale(self, divisor: f64) -> Self;

    /// Adds each component onto `state[offset..offset + N_COMPONENTS]`
    fn add_to_state(self, state: &mut AccumStateViewMut, offset: usize);

    fn from_state(state: &AccumStateView, offset: usize) -> Self;
}

impl PairValue for f64 {
    const N_COMPONENTS: usize = 1;

    fn zero() -> Self {
        0.0
    }

    fn conj(self) -> Self {
        self
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    fn unscale(self, divisor: f64) -> Self {
        self / divisor
    }

    fn add_to_state(self, state: &mut AccumStateViewMut, offset: usize) {
        state.add(offset, self);
    }

    fn from_state(state: &AccumStateView, offset: usize) -> Self {
        state.get(offset)
    }
}

impl PairValue for Complex<f64> {
    const N_COMPONENTS: usize = 2;

    fn zero() -> Self {
        Complex::new(0.0, 0.0)
    }

    fn conj(self) -> Self {
        Complex::conj(&self)
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    fn unscale(self, divisor: f64) -> Self {
        self / divisor
    }

    fn add_to_state(self, state: &mut AccumStateViewMut, offset: usize) {
        state.add(offset, self.re);
        state.add(offset + 1, self.im);
    }

    fn from_state(state: &AccumStateView, offset: usize) -> Self {
        Complex::new(state.get(offset), state.get(offset + 1))
    }
}

/// Instances of this element are consumed by the Reducer
#[derive(Clone, Copy, Debug)]
pub struct Datum<V> {
    pub value: V,
    pub weight: f64,
}

impl<V: PairValue> Datum<V> {
    pub fn from_value(value: V) -> Self {
        Datum { value, weight: 1.0 }
    }
}

pub trait Reducer {
    type Value: PairValue;

    /// The number of `f64` slots in a single `accum_state`
    fn accum_state_size(&self) -> usize;

    /// initializes the storage tracking the accumulator's state
    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut);

    /// consume the value and weight to update the accum_state
    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &Datum<Self::Value>);

    /// merge the state information tracked by `accum_state` and `other`, and
    /// update `accum_state` accordingly
    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView);
}

/// Tracks the running sum of the values and the number of contributions
///
/// The weight of each [`Datum`] scales the value that is summed; the count
/// always grows by exactly one per datum. Counts are stored in an `f64`
/// slot, which represents every integer up to 2^53 exactly.
#[derive(Clone, Copy, Debug)]
pub struct SumCount<V> {
    _value: PhantomData<V>,
}

impl<V: PairValue> SumCount<V> {
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }

    const COUNT_SLOT: usize = V::N_COMPONENTS;

    pub fn sum(&self, accum_state: &AccumStateView) -> V {
        V::from_state(accum_state, 0)
    }

    pub fn count(&self, accum_state: &AccumStateView) -> u64 {
        accum_state.get(Self::COUNT_SLOT) as u64
    }

    /// `sum / count`, or zero for an empty bin
    pub fn mean(&self, accum_state: &AccumStateView) -> V {
        match self.count(accum_state) {
            0 => V::zero(),
            count => self.sum(accum_state).unscale(count as f64),
        }
    }
}

impl<V: PairValue> Default for SumCount<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PairValue> Reducer for SumCount<V> {
    type Value = V;

    fn accum_state_size(&self) -> usize {
        V::N_COMPONENTS + 1
    }

    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut) {
        accum_state.fill(0.0);
    }

    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &Datum<V>) {
        datum.value.scale(datum.weight).add_to_state(accum_state, 0);
        accum_state.add(Self::COUNT_SLOT, 1.0);
    }

    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView) {
        for i in 0..self.accum_state_size() {
            accum_state.add(i, other.get(i));
        }
    }
}
