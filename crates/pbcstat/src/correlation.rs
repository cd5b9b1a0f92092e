use crate::engine::AccumulationEngine;
use crate::error::Error;
use crate::executor::RuntimeSpec;
use crate::locality::{NeighborList, NeighborQuery, PairSource, QueryArgs};
use crate::points::{Points, check_values_len};
use crate::sim_box::SimBox;
use pbcstat_internal::{PairValue, RegularBinEdges};

/// The pair correlation of a real or complex per-point quantity as a
/// function of distance
///
/// For every pair found between a query point `i` (carrying `u_i`) and a
/// point `j` (carrying `v_j`), the contribution `conj(u_i) * v_j` is added to
/// the bin holding their distance. The correlation of a bin is the mean of its
/// contributions.
///
/// # Example
/// ```
/// use ndarray::array;
/// use pbcstat::{CorrelationFunction, Points, SimBox};
///
/// let positions = array![[0.0, 1.5, -1.5], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
/// let points = Points::new(positions.view()).unwrap();
/// let mut cf = CorrelationFunction::<f64>::new(3.0, 1.0).unwrap();
/// cf.compute(&SimBox::cube(10.0).unwrap(), &points, &[2.0, 2.0, 2.0], None, None, None)
///     .unwrap();
/// assert_eq!(cf.counts().unwrap(), vec![0, 4, 0]);
/// assert_eq!(cf.rdf().unwrap()[1], 4.0);
/// ```
pub struct CorrelationFunction<V: PairValue> {
    r_max: f64,
    dr: f64,
    bin_centers: Vec<f64>,
    engine: AccumulationEngine<V>,
    sim_box: Option<SimBox>,
}

impl<V: PairValue> CorrelationFunction<V> {
    /// Bins distances in `[0, r_max)` into `floor(r_max / dr)` bins of width
    /// `dr`
    pub fn new(r_max: f64, dr: f64) -> Result<Self, Error> {
        Self::with_runtime(r_max, dr, RuntimeSpec::default())
    }

    pub fn with_runtime(r_max: f64, dr: f64, runtime: RuntimeSpec) -> Result<Self, Error> {
        if !(r_max.is_finite() && r_max > 0.0) {
            return Err(Error::parameter(
                "r_max",
                format!("must be finite and positive, not {r_max}"),
            ));
        } else if !(dr.is_finite() && dr > 0.0) {
            return Err(Error::parameter(
                "dr",
                format!("must be finite and positive, not {dr}"),
            ));
        } else if dr > r_max {
            return Err(Error::parameter(
                "dr",
                format!("must not exceed r_max ({r_max}), not {dr}"),
            ));
        }

        let n_bins = ((r_max / dr).floor() as usize).max(1);
        let bins =
            RegularBinEdges::from_width(0.0, dr, n_bins).map_err(Error::internal_legacy_adhoc)?;
        let bin_centers = (0..n_bins)
            .map(|i| {
                let (r1, r2) = bins.bin_bounds(i);
                2.0 / 3.0 * (r2 * r2 * r2 - r1 * r1 * r1) / (r2 * r2 - r1 * r1)
            })
            .collect();

        Ok(Self {
            r_max,
            dr,
            bin_centers,
            engine: AccumulationEngine::new(bins, runtime)?,
            sim_box: None,
        })
    }

    pub fn r_max(&self) -> f64 {
        self.r_max
    }

    pub fn dr(&self) -> f64 {
        self.dr
    }

    pub fn n_bins(&self) -> usize {
        self.bin_centers.len()
    }

    /// The mean radius of each bin's annulus
    pub fn bin_centers(&self) -> &[f64] {
        &self.bin_centers
    }

    pub fn runtime(&self) -> &RuntimeSpec {
        self.engine.runtime()
    }

    /// Discards everything accumulated so far
    pub fn reset(&mut self) {
        self.engine.reset();
        self.sim_box = None;
    }

    /// Adds the pair contributions of one configuration
    ///
    /// `query` optionally supplies separate query points and their values;
    /// otherwise the points are correlated with themselves. Pairs come from
    /// `nlist` when given, otherwise from a neighbor query with `query_args`
    /// (by default, a ball of radius `r_max` that excludes self pairs when
    /// `query` is omitted). Supplying both `query_args` and `nlist` is an
    /// error.
    pub fn accumulate<'a>(
        &mut self,
        sim_box: &SimBox,
        points: &Points<'a>,
        values: &[V],
        query: Option<(&Points<'a>, &[V])>,
        query_args: Option<QueryArgs>,
        nlist: Option<&NeighborList>,
    ) -> Result<(), Error> {
        check_values_len("values", values.len(), points)?;
        if let Some((query_points, query_values)) = query {
            check_values_len("query_values", query_values.len(), query_points)?;
        }

        let default_args = QueryArgs::Ball {
            r_max: self.r_max,
            exclude_ii: query.is_none(),
        };
        let source = PairSource::resolve(query_args, nlist, default_args)?;
        let nq = NeighborQuery::new(sim_box, *points)?;
        let query_points = query.map(|(query_points, _)| query_points);
        let neighbors = self
            .engine
            .install(|| source.neighbors(&nq, query_points))?;

        let query_values = query.map_or(values, |(_, query_values)| query_values);
        self.engine.accumulate(&neighbors, |bond| {
            query_values[bond.query_point_index].conj() * values[bond.point_index]
        })?;
        self.sim_box = Some(*sim_box);
        Ok(())
    }

    /// [`CorrelationFunction::reset`] followed by
    /// [`CorrelationFunction::accumulate`]
    pub fn compute<'a>(
        &mut self,
        sim_box: &SimBox,
        points: &Points<'a>,
        values: &[V],
        query: Option<(&Points<'a>, &[V])>,
        query_args: Option<QueryArgs>,
        nlist: Option<&NeighborList>,
    ) -> Result<(), Error> {
        self.reset();
        self.accumulate(sim_box, points, values, query, query_args, nlist)
    }

    /// The correlation of each bin (zero for empty bins)
    pub fn rdf(&self) -> Result<Vec<V>, Error> {
        self.engine.means().map_err(|_| Error::uncomputed("rdf"))
    }

    /// The number of pairs in each bin
    pub fn counts(&self) -> Result<Vec<u64>, Error> {
        self.engine.counts()
    }

    /// The summed contributions of each bin
    pub fn sums(&self) -> Result<Vec<V>, Error> {
        self.engine.sums()
    }

    /// The box of the most recent configuration
    pub fn sim_box(&self) -> Result<SimBox, Error> {
        self.sim_box.ok_or_else(|| Error::uncomputed("sim_box"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use ndarray::array;

    #[test]
    fn invalid_construction() {
        assert!(CorrelationFunction::<f64>::new(0.0, 0.1).is_err());
        assert!(CorrelationFunction::<f64>::new(-1.0, 0.1).is_err());
        assert!(CorrelationFunction::<f64>::new(1.0, 0.0).is_err());
        assert!(CorrelationFunction::<f64>::new(1.0, -0.1).is_err());
        assert!(CorrelationFunction::<f64>::new(1.0, 2.0).is_err());
        assert!(CorrelationFunction::<f64>::new(f64::NAN, 0.1).is_err());
        assert!(CorrelationFunction::<f64>::new(1.0, f64::INFINITY).is_err());
        let err = CorrelationFunction::<f64>::new(1.0, 2.0).err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn bin_layout() {
        let cf = CorrelationFunction::<f64>::with_runtime(3.5, 1.0, RuntimeSpec::serial()).unwrap();
        assert_eq!(cf.n_bins(), 3);
        let centers = cf.bin_centers();
        // the first annulus is a disk with mean radius 2/3 dr
        assert!((centers[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((centers[1] - 2.0 / 3.0 * 7.0 / 3.0).abs() < 1e-12);
        assert!((centers[2] - 2.0 / 3.0 * 19.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn properties_gated_until_accumulated() {
        let mut cf =
            CorrelationFunction::<f64>::with_runtime(2.0, 0.5, RuntimeSpec::serial()).unwrap();
        for err in [
            cf.rdf().err(),
            cf.sums().err(),
            cf.counts().map(|_| ()).err(),
            cf.sim_box().map(|_| ()).err(),
        ]
        .map(|e| e.map(|e| e.category()))
        {
            assert_eq!(err, Some(ErrorCategory::State));
        }
        // always readable
        assert_eq!(cf.bin_centers().len(), 4);

        let positions = array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let points = Points::new(positions.view()).unwrap();
        let sim_box = SimBox::cube(10.0).unwrap();
        cf.compute(&sim_box, &points, &[1.0, 1.0], None, None, None)
            .unwrap();
        assert_eq!(cf.sim_box().unwrap(), sim_box);
        assert_eq!(cf.counts().unwrap(), vec![0, 0, 2, 0]);

        cf.reset();
        assert!(cf.rdf().is_err());
        assert!(cf.sim_box().is_err());
    }

    #[test]
    fn values_must_match_points() {
        let mut cf =
            CorrelationFunction::<f64>::with_runtime(2.0, 0.5, RuntimeSpec::serial()).unwrap();
        let positions = array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let points = Points::new(positions.view()).unwrap();
        let sim_box = SimBox::cube(10.0).unwrap();
        let err = cf
            .compute(&sim_box, &points, &[1.0], None, None, None)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Dimension);
        let err = cf
            .compute(&sim_box, &points, &[1.0, 1.0], Some((&points, &[1.0])), None, None)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Dimension);
        // the failed calls leave the instance uncomputed
        assert!(cf.counts().is_err());
    }

    #[test]
    fn query_points_from_a_separate_array() {
        let mut cf =
            CorrelationFunction::<f64>::with_runtime(2.0, 0.5, RuntimeSpec::serial()).unwrap();
        let positions = array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let query_positions = array![[0.0], [1.2], [0.0]];
        let points = Points::new(positions.view()).unwrap();
        let query_points = Points::new(query_positions.view()).unwrap();
        let sim_box = SimBox::cube(10.0).unwrap();
        cf.compute(
            &sim_box,
            &points,
            &[1.0, 2.0],
            Some((&query_points, &[3.0])),
            None,
            None,
        )
        .unwrap();
        // the pair distances are 1.2 and sqrt(2.44)
        assert_eq!(cf.counts().unwrap(), vec![0, 0, 1, 1]);
        assert_eq!(cf.sums().unwrap(), vec![0.0, 0.0, 3.0, 6.0]);
    }

    #[test]
    fn both_pair_sources_rejected() {
        let mut cf =
            CorrelationFunction::<f64>::with_runtime(2.0, 0.5, RuntimeSpec::serial()).unwrap();
        let positions = array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let points = Points::new(positions.view()).unwrap();
        let nlist = NeighborList::from_arrays(2, 2, &[0], &[1], &[1.0], None).unwrap();
        let err = cf
            .compute(
                &SimBox::cube(10.0).unwrap(),
                &points,
                &[1.0, 1.0],
                None,
                Some(QueryArgs::ball(1.5)),
                Some(&nlist),
            )
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn r_max_beyond_box_limit() {
        let mut cf =
            CorrelationFunction::<f64>::with_runtime(3.0, 0.5, RuntimeSpec::serial()).unwrap();
        let positions = array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]];
        let points = Points::new(positions.view()).unwrap();
        let err = cf
            .compute(&SimBox::cube(5.0).unwrap(), &points, &[1.0, 1.0], None, None, None)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
