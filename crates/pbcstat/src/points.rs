use crate::error::Error;
use crate::misc::Vec3;
use crate::sim_box::SimBox;
use ndarray::{ArrayView2, Axis};

/// A borrowed collection of point positions
///
/// The positions are stored in an array with shape `(n_dims, n_points)`,
/// i.e. the spatial dimension varies along the slow axis. `n_dims` is 2 or 3;
/// a 2-component point is treated as lying at `z = 0` and only fits a 2D box.
#[derive(Clone, Copy)]
pub struct Points<'a> {
    data: ArrayView2<'a, f64>,
}

impl<'a> Points<'a> {
    pub fn new(data: ArrayView2<'a, f64>) -> Result<Self, Error> {
        let n_dims = data.len_of(Axis(0));
        if n_dims != 2 && n_dims != 3 {
            return Err(Error::shape(format!(
                "positions must have 2 or 3 components along axis 0, not {n_dims}"
            )));
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(Error::parameter("positions", "all coordinates must be finite"));
        }
        Ok(Self { data })
    }

    pub fn n_points(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn n_dims(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.n_points() == 0
    }

    /// The position of the `i`th point
    pub fn get(&self, i: usize) -> Vec3 {
        let z = if self.n_dims() == 3 {
            self.data[[2, i]]
        } else {
            0.0
        };
        [self.data[[0, i]], self.data[[1, i]], z]
    }

    pub fn view(&self) -> ArrayView2<'a, f64> {
        self.data
    }

    /// Whether both views refer to the same memory with the same layout
    pub fn same_as(&self, other: &Points) -> bool {
        self.data.as_ptr() == other.data.as_ptr()
            && self.data.shape() == other.data.shape()
            && self.data.strides() == other.data.strides()
    }

    /// Checks that the points can live inside `sim_box`
    ///
    /// The point dimension must match the box, except that a 2D box also
    /// accepts 3-component points whose z coordinates are all 0.
    pub(crate) fn validate_for(&self, sim_box: &SimBox) -> Result<(), Error> {
        if self.n_dims() < sim_box.n_dims() {
            return Err(Error::shape(format!(
                "a {}D box needs {}-component points, not {}",
                sim_box.n_dims(),
                sim_box.n_dims(),
                self.n_dims()
            )));
        }
        if sim_box.is_2d() && self.n_dims() == 3 {
            let off_plane = self.data.index_axis(Axis(0), 2).iter().any(|&z| z != 0.0);
            if off_plane {
                return Err(Error::shape(
                    "points in a 2D box must have z coordinates of 0",
                ));
            }
        }
        Ok(())
    }
}

/// Checks that one value was supplied per point
pub(crate) fn check_values_len(
    name: &'static str,
    n_values: usize,
    points: &Points,
) -> Result<(), Error> {
    if n_values != points.n_points() {
        Err(Error::shape(format!(
            "{name} holds {n_values} entries, but there are {} points",
            points.n_points()
        )))
    } else {
        Ok(())
    }
}
