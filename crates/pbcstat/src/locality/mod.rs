//! Neighbor finding in periodic boxes

mod cell_list;
mod nlist;
mod query;

pub use cell_list::{CellList, Neighbor};
pub use nlist::{Bond, NeighborList};
pub use query::{NeighborQuery, PairSource, QueryArgs, QueryMode, QueryOptions};
