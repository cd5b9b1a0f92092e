/*!
Provides parallelized routines for finding neighbors in periodic simulation
boxes and for computing distance-binned pair statistics from them (e.g.
correlation functions of real or complex per-particle quantities).

# High-Level: Pair Statistics in Periodic Boxes

A [`SimBox`] describes a (possibly triclinic) simulation region that may be
periodic along any axis. A [`NeighborQuery`] finds the pairs between a set of
query points and a set of points inside of the box, either every point within
a ball of radius `r_max` or the `k` nearest points, and returns them as a
[`NeighborList`].

A [`CorrelationFunction`] consumes those pairs. For every pair it bins the
separation and accumulates `conj(u_i) * v_j`, where `u_i` and `v_j` are the
values carried by the query point and the point. The result is the mean of
each bin.

# Determinism

The accumulation is split into chunks whose boundaries only depend on
[`RuntimeSpec::chunk_len`], and the chunk results are merged in a fixed
order. Consequently, the accumulated sums are bitwise identical for every
worker count.

# Developer Guide

See the crate-level documentation for [`pbcstat_internal`].

*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod correlation;
mod engine;
mod error;
mod executor;
pub mod locality;
mod misc;
mod points;
mod sim_box;

// pull in symbols that visible outside of the package
pub use correlation::CorrelationFunction;
pub use engine::{AccumulationEngine, EngineState};
pub use error::{Error, ErrorCategory};
pub use executor::{RuntimeSpec, SerialExecutor, ThreadPoolExecutor};
pub use locality::{
    Bond, CellList, Neighbor, NeighborList, NeighborQuery, PairSource, QueryArgs, QueryMode,
    QueryOptions,
};
pub use misc::Vec3;
pub use num_complex::Complex;
pub use pbcstat_internal::{BinEdges, Executor, PairValue, RegularBinEdges};
pub use points::Points;
pub use sim_box::SimBox;
