//! A cell list over the fractional coordinates of a periodic box
//!
//! Each axis is split into `n_i = max(1, floor(w_i / cell_width))` cells,
//! where `w_i` is the nearest-plane distance of the box along that axis.
//! Because a displacement of length `r` changes the `i`th lattice coordinate
//! by at most `r / w_i`, a ball search only needs to visit
//! `s_i = ceil(r * n_i / w_i)` cells on either side of the query point's
//! cell.

use crate::error::Error;
use crate::locality::query::QueryArgs;
use crate::misc::Vec3;
use crate::points::Points;
use crate::sim_box::SimBox;

/// Multiplies the search radius of a nearest-neighbor query after every
/// unsuccessful ball search
const NEAREST_SCALE: f64 = 1.5;

/// Upper bound on the number of cells per point
const MAX_CELLS_PER_POINT: usize = 4;
const MIN_CELL_BUDGET: usize = 64;

/// A candidate neighbor found by a [`CellList`] search
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub point_index: usize,
    pub distance: f64,
    /// minimum-image separation pointing from the query point to the point
    pub vector: Vec3,
}

/// Orders by distance and then by point index
pub(crate) fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_unstable_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.point_index.cmp(&b.point_index))
    });
}

pub struct CellList<'a> {
    sim_box: SimBox,
    points: Points<'a>,
    n_cells: [usize; 3],
    widths: [f64; 3],
    // CSR layout: the members of cell `c` are
    // `cell_members[cell_starts[c]..cell_starts[c + 1]]`
    cell_starts: Vec<usize>,
    cell_members: Vec<usize>,
}

impl<'a> CellList<'a> {
    /// Bins `points` into cells that are at least `cell_width` wide
    ///
    /// The cell width is enlarged when the requested width would produce far
    /// more cells than points.
    pub fn build(sim_box: &SimBox, points: Points<'a>, cell_width: f64) -> Result<Self, Error> {
        if !(cell_width.is_finite() && cell_width > 0.0) {
            return Err(Error::parameter(
                "cell_width",
                format!("must be finite and positive, not {cell_width}"),
            ));
        }
        points.validate_for(sim_box)?;

        let n_dims = sim_box.n_dims();
        let widths = sim_box.nearest_plane_distance();
        let budget = MIN_CELL_BUDGET.max(MAX_CELLS_PER_POINT * points.n_points());

        let mut cell_width = cell_width;
        let mut n_cells = Self::cells_per_axis(&widths, n_dims, cell_width, budget);
        while Self::total_cells(&n_cells) > budget {
            cell_width *= 1.25;
            n_cells = Self::cells_per_axis(&widths, n_dims, cell_width, budget);
        }

        let mut out = Self {
            sim_box: *sim_box,
            points,
            n_cells,
            widths,
            cell_starts: Vec::new(),
            cell_members: Vec::new(),
        };
        out.fill_cells();
        log::debug!(
            "built a cell list of {:?} cells holding {} points",
            out.n_cells,
            points.n_points()
        );
        Ok(out)
    }

    /// Each axis is capped at `budget` cells
    fn cells_per_axis(
        widths: &[f64; 3],
        n_dims: usize,
        cell_width: f64,
        budget: usize,
    ) -> [usize; 3] {
        let mut n_cells = [1; 3];
        for i in 0..n_dims {
            let n = (widths[i] / cell_width).floor().min(budget as f64);
            n_cells[i] = (n as usize).max(1);
        }
        n_cells
    }

    /// The product of the per-axis counts, saturating at `usize::MAX`
    fn total_cells(n_cells: &[usize; 3]) -> usize {
        n_cells.iter().fold(1, |total, &n| total.saturating_mul(n))
    }

    /// counting sort of the points into the CSR arrays
    fn fill_cells(&mut self) {
        let n_total = Self::total_cells(&self.n_cells);
        let cell_of: Vec<usize> = (0..self.points.n_points())
            .map(|i| self.linear_index(self.cell_coords(self.points.get(i))))
            .collect();

        let mut cell_starts = vec![0; n_total + 1];
        for &c in &cell_of {
            cell_starts[c + 1] += 1;
        }
        for c in 0..n_total {
            cell_starts[c + 1] += cell_starts[c];
        }

        let mut next = cell_starts.clone();
        let mut cell_members = vec![0; cell_of.len()];
        for (i, &c) in cell_of.iter().enumerate() {
            cell_members[next[c]] = i;
            next[c] += 1;
        }

        self.cell_starts = cell_starts;
        self.cell_members = cell_members;
    }

    fn is_periodic(&self, axis: usize) -> bool {
        axis < self.sim_box.n_dims() && self.sim_box.periodic()[axis]
    }

    /// The coordinates of the cell holding `p`
    ///
    /// Periodic coordinates are wrapped into the box; the others are clamped
    /// onto the outermost cells.
    fn cell_coords(&self, p: Vec3) -> [usize; 3] {
        let frac = self.sim_box.make_fractional(p);
        let mut coords = [0; 3];
        for axis in 0..self.sim_box.n_dims() {
            let n = self.n_cells[axis];
            let mut f = frac[axis];
            if self.is_periodic(axis) {
                f -= f.floor();
            }
            let c = (f * n as f64).floor();
            coords[axis] = if c <= 0.0 {
                0
            } else {
                (c as usize).min(n - 1)
            };
        }
        coords
    }

    fn linear_index(&self, coords: [usize; 3]) -> usize {
        let [nx, ny, _] = self.n_cells;
        (coords[2] * ny + coords[1]) * nx + coords[0]
    }

    /// The cells along `axis` within `s` cells of `c`, each listed once
    fn axis_cells(&self, axis: usize, c: usize, s: usize) -> Vec<usize> {
        let n = self.n_cells[axis];
        if self.is_periodic(axis) {
            if 2 * s + 1 >= n {
                (0..n).collect()
            } else {
                (0..=2 * s).map(|k| (c + n + k - s) % n).collect()
            }
        } else {
            (c.saturating_sub(s)..=(c + s).min(n - 1)).collect()
        }
    }

    pub fn n_cells(&self) -> [usize; 3] {
        self.n_cells
    }

    pub fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    /// Every point within `r` of `point` (strictly), in no particular order
    ///
    /// `skip` names a point index to leave out.
    pub fn query_ball(
        &self,
        point: Vec3,
        r: f64,
        skip: Option<usize>,
    ) -> Result<Vec<Neighbor>, Error> {
        self.sim_box.check_ball_radius(r)?;
        Ok(self.ball_candidates(point, r, skip))
    }

    fn ball_candidates(&self, point: Vec3, r: f64, skip: Option<usize>) -> Vec<Neighbor> {
        let center = self.cell_coords(point);
        let mut cells: [Vec<usize>; 3] = Default::default();
        for axis in 0..3 {
            let n = self.n_cells[axis];
            let s = if axis < self.sim_box.n_dims() {
                ((r * n as f64 / self.widths[axis]).ceil() as usize).min(n)
            } else {
                0
            };
            cells[axis] = self.axis_cells(axis, center[axis], s);
        }

        let mut out = Vec::new();
        for &cz in &cells[2] {
            for &cy in &cells[1] {
                for &cx in &cells[0] {
                    let c = self.linear_index([cx, cy, cz]);
                    for &j in &self.cell_members[self.cell_starts[c]..self.cell_starts[c + 1]] {
                        if skip == Some(j) {
                            continue;
                        }
                        let (distance, vector) =
                            self.sim_box.minimum_image(point, self.points.get(j));
                        if distance < r {
                            out.push(Neighbor {
                                point_index: j,
                                distance,
                                vector,
                            });
                        }
                    }
                }
            }
        }
        out
    }

    /// Every point, resolved to its minimum image
    fn brute_force(&self, point: Vec3, skip: Option<usize>) -> Vec<Neighbor> {
        (0..self.points.n_points())
            .filter(|&j| skip != Some(j))
            .map(|j| {
                let (distance, vector) = self.sim_box.minimum_image(point, self.points.get(j));
                Neighbor {
                    point_index: j,
                    distance,
                    vector,
                }
            })
            .collect()
    }

    /// A radius that is expected to enclose about `k` points
    pub(crate) fn representative_radius(sim_box: &SimBox, n_points: usize, k: usize) -> f64 {
        let density = n_points.max(1) as f64 / sim_box.volume();
        let unit_ball = if sim_box.is_2d() {
            core::f64::consts::PI
        } else {
            4.0 / 3.0 * core::f64::consts::PI
        };
        (k as f64 / (density * unit_ball)).powf(1.0 / sim_box.n_dims() as f64)
    }

    /// The `min(k, available)` nearest points, sorted by distance and then
    /// by point index
    pub fn query_nearest(&self, point: Vec3, k: usize, skip: Option<usize>) -> Vec<Neighbor> {
        let n_points = self.points.n_points();
        let n_available = n_points - usize::from(skip.is_some_and(|j| j < n_points));
        let target = k.min(n_available);
        if target == 0 {
            return Vec::new();
        }

        let limit = self.sim_box.max_ball_radius();
        let mut r = Self::representative_radius(&self.sim_box, n_points, k).min(limit);
        let mut found = loop {
            let found = self.ball_candidates(point, r, skip);
            if found.len() >= target {
                break found;
            } else if r >= limit {
                log::trace!("nearest query fell back to an exhaustive scan at r = {r}");
                break self.brute_force(point, skip);
            }
            r = (r * NEAREST_SCALE).min(limit);
        };
        sort_neighbors(&mut found);
        found.truncate(target);
        found
    }

    /// Resolves a single query point
    ///
    /// The result is sorted by distance and then by point index.
    pub fn query(
        &self,
        point: Vec3,
        args: &QueryArgs,
        skip: Option<usize>,
    ) -> Result<Vec<Neighbor>, Error> {
        match *args {
            QueryArgs::Ball { r_max, .. } => {
                let mut found = self.query_ball(point, r_max, skip)?;
                sort_neighbors(&mut found);
                Ok(found)
            }
            QueryArgs::Nearest { num_neighbors, .. } => {
                Ok(self.query_nearest(point, num_neighbors, skip))
            }
        }
    }
}
