use crate::error::Error;
use crate::locality::cell_list::CellList;
use crate::locality::nlist::{Bond, NeighborList};
use crate::points::Points;
use crate::sim_box::SimBox;
use rayon::prelude::*;
use std::borrow::Cow;
use std::str::FromStr;

/// Describes which pairs a neighbor query should find
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryArgs {
    /// every point closer than `r_max`
    Ball { r_max: f64, exclude_ii: bool },
    /// the `num_neighbors` closest points
    Nearest {
        num_neighbors: usize,
        exclude_ii: bool,
    },
}

impl QueryArgs {
    pub fn ball(r_max: f64) -> Self {
        QueryArgs::Ball {
            r_max,
            exclude_ii: false,
        }
    }

    pub fn nearest(num_neighbors: usize) -> Self {
        QueryArgs::Nearest {
            num_neighbors,
            exclude_ii: false,
        }
    }

    /// Sets whether a point is prevented from pairing with itself
    ///
    /// This only has an effect when the query points and the points are the
    /// same set.
    pub fn with_exclude_ii(self, exclude_ii: bool) -> Self {
        match self {
            QueryArgs::Ball { r_max, .. } => QueryArgs::Ball { r_max, exclude_ii },
            QueryArgs::Nearest { num_neighbors, .. } => QueryArgs::Nearest {
                num_neighbors,
                exclude_ii,
            },
        }
    }

    pub fn exclude_ii(&self) -> bool {
        match *self {
            QueryArgs::Ball { exclude_ii, .. } | QueryArgs::Nearest { exclude_ii, .. } => {
                exclude_ii
            }
        }
    }

    pub fn mode(&self) -> QueryMode {
        match self {
            QueryArgs::Ball { .. } => QueryMode::Ball,
            QueryArgs::Nearest { .. } => QueryMode::Nearest,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        match *self {
            QueryArgs::Ball { r_max, .. } if !(r_max.is_finite() && r_max > 0.0) => Err(
                Error::parameter("r_max", format!("must be finite and positive, not {r_max}")),
            ),
            QueryArgs::Nearest {
                num_neighbors: 0, ..
            } => Err(Error::parameter("num_neighbors", "must be at least 1")),
            _ => Ok(()),
        }
    }
}

/// The kinds of neighbor queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryMode {
    Ball,
    Nearest,
}

impl FromStr for QueryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "ball" => Ok(QueryMode::Ball),
            "nearest" => Ok(QueryMode::Nearest),
            _ => Err(Error::parameter(
                "mode",
                format!("\"{s}\" is not a query mode. Choices include: \"ball\", \"nearest\""),
            )),
        }
    }
}

/// Loosely specified query options that resolve into [`QueryArgs`]
///
/// When `mode` is omitted it is inferred: `num_neighbors` selects a nearest
/// query, otherwise `r_max` selects a ball query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    pub mode: Option<QueryMode>,
    pub r_max: Option<f64>,
    pub num_neighbors: Option<usize>,
    pub exclude_ii: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: QueryMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn r_max(mut self, r_max: f64) -> Self {
        self.r_max = Some(r_max);
        self
    }

    pub fn num_neighbors(mut self, num_neighbors: usize) -> Self {
        self.num_neighbors = Some(num_neighbors);
        self
    }

    pub fn exclude_ii(mut self, exclude_ii: bool) -> Self {
        self.exclude_ii = exclude_ii;
        self
    }

    pub fn resolve(&self) -> Result<QueryArgs, Error> {
        let mode = match (self.mode, self.num_neighbors, self.r_max) {
            (Some(mode), _, _) => mode,
            (None, Some(_), _) => QueryMode::Nearest,
            (None, None, Some(_)) => QueryMode::Ball,
            (None, None, None) => {
                return Err(Error::parameter(
                    "query options",
                    "the mode can't be inferred without r_max or num_neighbors",
                ));
            }
        };

        let args = match mode {
            QueryMode::Ball => {
                let r_max = self
                    .r_max
                    .ok_or_else(|| Error::parameter("r_max", "ball queries require r_max"))?;
                QueryArgs::Ball {
                    r_max,
                    exclude_ii: self.exclude_ii,
                }
            }
            QueryMode::Nearest => {
                let num_neighbors = self.num_neighbors.ok_or_else(|| {
                    Error::parameter("num_neighbors", "nearest queries require num_neighbors")
                })?;
                QueryArgs::Nearest {
                    num_neighbors,
                    exclude_ii: self.exclude_ii,
                }
            }
        };
        args.validate()?;
        Ok(args)
    }
}

/// Finds pairs between query points and a fixed set of points in a box
pub struct NeighborQuery<'a> {
    sim_box: SimBox,
    points: Points<'a>,
}

impl<'a> NeighborQuery<'a> {
    pub fn new(sim_box: &SimBox, points: Points<'a>) -> Result<Self, Error> {
        points.validate_for(sim_box)?;
        Ok(Self {
            sim_box: *sim_box,
            points,
        })
    }

    pub fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    pub fn points(&self) -> &Points<'a> {
        &self.points
    }

    /// Finds the pairs described by `args`
    ///
    /// When `query_points` is `None`, the points are queried against
    /// themselves. Bonds are ordered by query point, then by distance and
    /// then by point index.
    pub fn query(
        &self,
        query_points: Option<&Points<'a>>,
        args: &QueryArgs,
    ) -> Result<NeighborList, Error> {
        args.validate()?;
        if let QueryArgs::Ball { r_max, .. } = *args {
            self.sim_box.check_ball_radius(r_max)?;
        }

        let same_set = query_points.is_none_or(|q| q.same_as(&self.points));
        let query_points = query_points.unwrap_or(&self.points);
        query_points.validate_for(&self.sim_box)?;
        let exclude_ii = same_set && args.exclude_ii();

        let cell_width = match *args {
            QueryArgs::Ball { r_max, .. } => r_max,
            QueryArgs::Nearest { num_neighbors, .. } => CellList::representative_radius(
                &self.sim_box,
                self.points.n_points(),
                num_neighbors,
            ),
        };
        let cells = CellList::build(&self.sim_box, self.points, cell_width)?;

        log::debug!(
            "querying {} points against {} points with {:?}",
            query_points.n_points(),
            self.points.n_points(),
            args
        );

        // par_iter preserves the order of the query points
        let per_point: Vec<Vec<Bond>> = (0..query_points.n_points())
            .into_par_iter()
            .map(|i| -> Result<Vec<Bond>, Error> {
                let skip = exclude_ii.then_some(i);
                let found = cells.query(query_points.get(i), args, skip)?;
                Ok(found
                    .into_iter()
                    .map(|n| Bond {
                        query_point_index: i,
                        point_index: n.point_index,
                        distance: n.distance,
                        vector: n.vector,
                        weight: 1.0,
                    })
                    .collect())
            })
            .collect::<Result<_, _>>()?;

        let bonds: Vec<Bond> = per_point.into_iter().flatten().collect();
        log::trace!("the query found {} bonds", bonds.len());
        Ok(NeighborList::from_sorted_bonds(
            query_points.n_points(),
            self.points.n_points(),
            &bonds,
        ))
    }
}

/// Where a statistic gets its pairs from
#[derive(Clone, Copy, Debug)]
pub enum PairSource<'n> {
    /// run a neighbor query
    Query(QueryArgs),
    /// use a precomputed list
    List(&'n NeighborList),
}

impl<'n> PairSource<'n> {
    /// Picks between query arguments and a precomputed neighbor list
    ///
    /// Supplying both is an error; supplying neither selects `default`.
    pub fn resolve(
        query_args: Option<QueryArgs>,
        nlist: Option<&'n NeighborList>,
        default: QueryArgs,
    ) -> Result<Self, Error> {
        match (query_args, nlist) {
            (Some(_), Some(_)) => Err(Error::pair_source_conflict()),
            (Some(args), None) => Ok(PairSource::Query(args)),
            (None, Some(nlist)) => Ok(PairSource::List(nlist)),
            (None, None) => Ok(PairSource::Query(default)),
        }
    }

    /// Produces the pairs between `query_points` (or the points themselves)
    /// and the points of `nq`
    pub fn neighbors<'a>(
        &self,
        nq: &NeighborQuery<'a>,
        query_points: Option<&Points<'a>>,
    ) -> Result<Cow<'n, NeighborList>, Error> {
        match *self {
            PairSource::Query(ref args) => Ok(Cow::Owned(nq.query(query_points, args)?)),
            PairSource::List(nlist) => {
                let n_query_points = query_points.unwrap_or(nq.points()).n_points();
                nlist.check_point_counts(n_query_points, nq.points().n_points())?;
                Ok(Cow::Borrowed(nlist))
            }
        }
    }
}
