use crate::error::Error;
use crate::misc::Vec3;

/// A single entry of a [`NeighborList`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bond {
    pub query_point_index: usize,
    pub point_index: usize,
    pub distance: f64,
    /// minimum-image separation pointing from the query point to the point
    pub vector: Vec3,
    pub weight: f64,
}

/// A list of bonds between query points and (reference) points
///
/// Bonds are ordered by query point index. Lists produced by a neighbor query
/// are further ordered by distance and then by point index within each query
/// point. Only the weights may be modified after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborList {
    n_query_points: usize,
    n_points: usize,
    query_point_index: Vec<usize>,
    point_index: Vec<usize>,
    distance: Vec<f64>,
    vector: Vec<Vec3>,
    weight: Vec<f64>,
}

impl NeighborList {
    /// Assembles a list from bonds that are already in order
    pub(crate) fn from_sorted_bonds(n_query_points: usize, n_points: usize, bonds: &[Bond]) -> Self {
        let mut out = Self::empty(n_query_points, n_points);
        for bond in bonds {
            out.push(bond);
        }
        out
    }

    fn empty(n_query_points: usize, n_points: usize) -> Self {
        Self {
            n_query_points,
            n_points,
            query_point_index: Vec::new(),
            point_index: Vec::new(),
            distance: Vec::new(),
            vector: Vec::new(),
            weight: Vec::new(),
        }
    }

    fn push(&mut self, bond: &Bond) {
        self.query_point_index.push(bond.query_point_index);
        self.point_index.push(bond.point_index);
        self.distance.push(bond.distance);
        self.vector.push(bond.vector);
        self.weight.push(bond.weight);
    }

    /// Builds a list from user-supplied arrays
    ///
    /// `query_point_index` must be sorted in ascending order and every index
    /// must be in bounds. Weights default to 1. The separation vectors of the
    /// resulting bonds are unknown and are set to zero.
    pub fn from_arrays(
        n_query_points: usize,
        n_points: usize,
        query_point_index: &[usize],
        point_index: &[usize],
        distances: &[f64],
        weights: Option<&[f64]>,
    ) -> Result<Self, Error> {
        let n_bonds = query_point_index.len();
        if point_index.len() != n_bonds || distances.len() != n_bonds {
            return Err(Error::shape(format!(
                "neighbor list arrays have mismatched lengths: {} query indices, \
                 {} point indices and {} distances",
                n_bonds,
                point_index.len(),
                distances.len()
            )));
        }
        if let Some(w) = weights {
            if w.len() != n_bonds {
                return Err(Error::shape(format!(
                    "{} weights were supplied for {n_bonds} bonds",
                    w.len()
                )));
            }
        }

        if query_point_index.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(Error::neighbor_list(
                "query point indices must be sorted in ascending order",
            ));
        }
        if let Some(&i) = query_point_index.iter().find(|&&i| i >= n_query_points) {
            return Err(Error::neighbor_list(format!(
                "query point index {i} is out of bounds for {n_query_points} query points"
            )));
        }
        if let Some(&i) = point_index.iter().find(|&&i| i >= n_points) {
            return Err(Error::neighbor_list(format!(
                "point index {i} is out of bounds for {n_points} points"
            )));
        }
        if distances.iter().any(|d| !(d.is_finite() && *d >= 0.0)) {
            return Err(Error::neighbor_list(
                "distances must be finite and non-negative",
            ));
        }

        Ok(Self {
            n_query_points,
            n_points,
            query_point_index: query_point_index.to_vec(),
            point_index: point_index.to_vec(),
            distance: distances.to_vec(),
            vector: vec![[0.0; 3]; n_bonds],
            weight: weights.map_or_else(|| vec![1.0; n_bonds], <[f64]>::to_vec),
        })
    }

    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    pub fn n_query_points(&self) -> usize {
        self.n_query_points
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn query_point_indices(&self) -> &[usize] {
        &self.query_point_index
    }

    pub fn point_indices(&self) -> &[usize] {
        &self.point_index
    }

    pub fn distances(&self) -> &[f64] {
        &self.distance
    }

    pub fn vectors(&self) -> &[Vec3] {
        &self.vector
    }

    pub fn weights(&self) -> &[f64] {
        &self.weight
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weight
    }

    /// The `i`th bond, if it exists
    pub fn get(&self, i: usize) -> Option<Bond> {
        (i < self.len()).then(|| Bond {
            query_point_index: self.query_point_index[i],
            point_index: self.point_index[i],
            distance: self.distance[i],
            vector: self.vector[i],
            weight: self.weight[i],
        })
    }

    pub fn bonds(&self) -> impl ExactSizeIterator<Item = Bond> + '_ {
        (0..self.len()).map(|i| Bond {
            query_point_index: self.query_point_index[i],
            point_index: self.point_index[i],
            distance: self.distance[i],
            vector: self.vector[i],
            weight: self.weight[i],
        })
    }

    /// Keeps the bonds whose entry in `mask` is `true`
    pub fn filter(&self, mask: &[bool]) -> Result<Self, Error> {
        if mask.len() != self.len() {
            return Err(Error::shape(format!(
                "the mask holds {} entries, but there are {} bonds",
                mask.len(),
                self.len()
            )));
        }
        let mut out = Self::empty(self.n_query_points, self.n_points);
        for bond in self.bonds().zip(mask).filter(|(_, keep)| **keep).map(|(b, _)| b) {
            out.push(&bond);
        }
        Ok(out)
    }

    /// Keeps the bonds with `r_min < distance < r_max`
    pub fn filter_r(&self, r_max: f64, r_min: f64) -> Result<Self, Error> {
        if !(r_max > r_min) {
            return Err(Error::parameter(
                "r_max",
                format!("must exceed r_min ({r_min}), not {r_max}"),
            ));
        }
        let mask: Vec<bool> = self
            .distance
            .iter()
            .map(|&d| d > r_min && d < r_max)
            .collect();
        self.filter(&mask)
    }

    /// The index of the first bond whose query point index is at least
    /// `query_point_index` (`len()` when there is none)
    pub fn find_first_index(&self, query_point_index: usize) -> usize {
        self.query_point_index
            .partition_point(|&i| i < query_point_index)
    }

    /// The index of the first bond of every query point
    ///
    /// Query points without bonds map onto the start of the next query
    /// point's segment.
    pub fn segments(&self) -> Vec<usize> {
        (0..self.n_query_points)
            .map(|i| self.find_first_index(i))
            .collect()
    }

    /// The number of bonds of every query point
    pub fn neighbor_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_query_points];
        for &i in &self.query_point_index {
            counts[i] += 1;
        }
        counts
    }

    /// Checks that the list refers to point sets with the given sizes
    pub(crate) fn check_point_counts(
        &self,
        n_query_points: usize,
        n_points: usize,
    ) -> Result<(), Error> {
        if self.n_query_points != n_query_points || self.n_points != n_points {
            Err(Error::shape(format!(
                "the neighbor list was built for {} query points and {} points, \
                 but {n_query_points} query points and {n_points} points were supplied",
                self.n_query_points, self.n_points
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;

    fn sample() -> NeighborList {
        NeighborList::from_arrays(
            4,
            3,
            &[0, 0, 1, 3, 3],
            &[1, 2, 0, 0, 2],
            &[0.5, 1.5, 1.0, 2.5, 3.0],
            None,
        )
        .unwrap()
    }

    #[test]
    fn from_arrays_validation() {
        // mismatched lengths
        let err = NeighborList::from_arrays(2, 2, &[0, 1], &[1], &[1.0, 1.0], None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Dimension);
        let err = NeighborList::from_arrays(2, 2, &[0], &[1], &[1.0], Some(&[1.0, 2.0]))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Dimension);

        // unsorted query indices
        let err = NeighborList::from_arrays(2, 2, &[1, 0], &[0, 1], &[1.0, 1.0], None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        // out of bounds
        assert!(NeighborList::from_arrays(2, 2, &[0, 2], &[0, 1], &[1.0, 1.0], None).is_err());
        assert!(NeighborList::from_arrays(2, 2, &[0, 1], &[0, 2], &[1.0, 1.0], None).is_err());

        // negative distance
        assert!(NeighborList::from_arrays(2, 2, &[0], &[1], &[-1.0], None).is_err());
    }

    #[test]
    fn default_weights_and_accessors() {
        let nlist = sample();
        assert_eq!(nlist.len(), 5);
        assert!(!nlist.is_empty());
        assert_eq!(nlist.weights(), &[1.0; 5]);
        let bond = nlist.get(2).unwrap();
        assert_eq!(bond.query_point_index, 1);
        assert_eq!(bond.point_index, 0);
        assert_eq!(bond.distance, 1.0);
        assert!(nlist.get(5).is_none());
        assert_eq!(nlist.bonds().count(), 5);
    }

    #[test]
    fn segments_and_counts() {
        let nlist = sample();
        assert_eq!(nlist.find_first_index(0), 0);
        assert_eq!(nlist.find_first_index(1), 2);
        assert_eq!(nlist.find_first_index(2), 3);
        assert_eq!(nlist.find_first_index(4), 5);
        assert_eq!(nlist.segments(), vec![0, 2, 3, 3]);
        assert_eq!(nlist.neighbor_counts(), vec![2, 1, 0, 2]);
    }

    #[test]
    fn filtering() {
        let nlist = sample();
        let filtered = nlist.filter(&[true, false, true, false, true]).unwrap();
        assert_eq!(filtered.point_indices(), &[1, 0, 2]);
        assert_eq!(filtered.n_query_points(), 4);
        assert!(nlist.filter(&[true]).is_err());

        // both bounds are exclusive
        let filtered = nlist.filter_r(2.5, 0.5).unwrap();
        assert_eq!(filtered.distances(), &[1.5, 1.0]);
        assert!(nlist.filter_r(1.0, 2.0).is_err());
    }

    #[test]
    fn weights_are_writable() {
        let mut nlist = sample();
        nlist.weights_mut()[1] = 3.0;
        assert_eq!(nlist.get(1).unwrap().weight, 3.0);
    }
}
