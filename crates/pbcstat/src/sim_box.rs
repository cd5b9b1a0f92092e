//! The periodic simulation box
//!
//! A box is spanned by the lattice vectors
//! - `a1 = (Lx, 0, 0)`
//! - `a2 = (xy Ly, Ly, 0)`
//! - `a3 = (xz Lz, yz Lz, Lz)`
//!
//! and is centered on the origin. Lattice coordinates express a Cartesian
//! vector in terms of these lattice vectors; fractional coordinates shift
//! lattice coordinates by one half so that `[0, 1)` spans the box.
//!
//! A 2D box has `Lz = 0`, `xz = yz = 0` and is never periodic along z. Its
//! third lattice (and fractional) component is pinned to `0` (respectively
//! `0.5`) and the z component of a vector is carried through unchanged.

use crate::error::Error;
use crate::misc::{Vec3, approx_eq, norm, sub};

const EQ_RTOL: f64 = 1e-6;
const EQ_ATOL: f64 = 1e-12;
const MAX_WRAP_PASSES: usize = 4;

#[derive(Clone, Copy, Debug)]
pub struct SimBox {
    lengths: [f64; 3],
    // ordered as xy, xz, yz
    tilts: [f64; 3],
    periodic: [bool; 3],
    is_2d: bool,
}

fn check_length(name: &'static str, value: f64) -> Result<(), Error> {
    if !value.is_finite() || value <= 0.0 {
        Err(Error::parameter(
            name,
            format!("box lengths must be finite and positive, not {value}"),
        ))
    } else {
        Ok(())
    }
}

fn check_tilt(name: &'static str, value: f64) -> Result<(), Error> {
    if !value.is_finite() {
        Err(Error::parameter(name, "tilt factors must be finite"))
    } else {
        Ok(())
    }
}

impl SimBox {
    /// Builds a 3D box from `[Lx, Ly, Lz]`, `[xy, xz, yz]` and per-axis
    /// periodicity
    pub fn new_3d(lengths: [f64; 3], tilts: [f64; 3], periodic: [bool; 3]) -> Result<Self, Error> {
        check_length("Lx", lengths[0])?;
        check_length("Ly", lengths[1])?;
        check_length("Lz", lengths[2])?;
        check_tilt("xy", tilts[0])?;
        check_tilt("xz", tilts[1])?;
        check_tilt("yz", tilts[2])?;
        Ok(Self {
            lengths,
            tilts,
            periodic,
            is_2d: false,
        })
    }

    /// Builds a 2D box in the xy-plane
    pub fn new_2d(lx: f64, ly: f64, xy: f64, periodic: [bool; 2]) -> Result<Self, Error> {
        check_length("Lx", lx)?;
        check_length("Ly", ly)?;
        check_tilt("xy", xy)?;
        Ok(Self {
            lengths: [lx, ly, 0.0],
            tilts: [xy, 0.0, 0.0],
            periodic: [periodic[0], periodic[1], false],
            is_2d: true,
        })
    }

    /// A fully periodic cube with edge length `l`
    pub fn cube(l: f64) -> Result<Self, Error> {
        Self::new_3d([l, l, l], [0.0; 3], [true; 3])
    }

    /// A fully periodic square with edge length `l`
    pub fn square(l: f64) -> Result<Self, Error> {
        Self::new_2d(l, l, 0.0, [true; 2])
    }

    /// A fully periodic 3D box without tilt
    pub fn orthorhombic(lengths: [f64; 3]) -> Result<Self, Error> {
        Self::new_3d(lengths, [0.0; 3], [true; 3])
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    /// `[xy, xz, yz]`
    pub fn tilts(&self) -> [f64; 3] {
        self.tilts
    }

    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    pub fn is_2d(&self) -> bool {
        self.is_2d
    }

    /// The number of spatial dimensions (2 or 3)
    pub fn n_dims(&self) -> usize {
        if self.is_2d { 2 } else { 3 }
    }

    /// The volume of the box (its area for 2D boxes)
    pub fn volume(&self) -> f64 {
        let [lx, ly, lz] = self.lengths;
        if self.is_2d { lx * ly } else { lx * ly * lz }
    }

    /// The `i`th lattice vector
    pub fn lattice_vector(&self, i: usize) -> Result<Vec3, Error> {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilts;
        match i {
            0 => Ok([lx, 0.0, 0.0]),
            1 => Ok([xy * ly, ly, 0.0]),
            2 => Ok([xz * lz, yz * lz, lz]),
            _ => Err(Error::parameter(
                "lattice vector index",
                format!("{i} is not 0, 1 or 2"),
            )),
        }
    }

    /// The distance between each pair of opposite faces of the box
    ///
    /// The z entry of a 2D box is `0`.
    pub fn nearest_plane_distance(&self) -> [f64; 3] {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilts;
        let dx = lx / (1.0 + xy * xy + (xy * yz - xz) * (xy * yz - xz)).sqrt();
        let dy = ly / (1.0 + yz * yz).sqrt();
        [dx, dy, lz]
    }

    /// The largest ball radius that the minimum-image convention resolves
    ///
    /// This is half the smallest nearest-plane distance over the periodic
    /// axes, or infinity when no axis is periodic.
    pub fn max_ball_radius(&self) -> f64 {
        let widths = self.nearest_plane_distance();
        (0..self.n_dims())
            .filter(|&i| self.periodic[i])
            .map(|i| 0.5 * widths[i])
            .fold(f64::INFINITY, f64::min)
    }

    /// Errors when a ball of radius `r_max` would wrap onto itself
    pub fn check_ball_radius(&self, r_max: f64) -> Result<(), Error> {
        let limit = self.max_ball_radius();
        if r_max > limit {
            Err(Error::ball_radius(r_max, limit))
        } else {
            Ok(())
        }
    }

    /// Expresses a Cartesian vector in lattice coordinates
    pub fn to_lattice(&self, v: Vec3) -> Vec3 {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilts;
        if self.is_2d {
            [(v[0] - xy * v[1]) / lx, v[1] / ly, 0.0]
        } else {
            let f2 = v[2] / lz;
            let f1 = (v[1] - yz * v[2]) / ly;
            let f0 = (v[0] - xy * v[1] + (xy * yz - xz) * v[2]) / lx;
            [f0, f1, f2]
        }
    }

    /// Inverse of [`SimBox::to_lattice`]
    pub fn from_lattice(&self, f: Vec3) -> Vec3 {
        let [lx, ly, lz] = self.lengths;
        let [xy, xz, yz] = self.tilts;
        [
            lx * f[0] + xy * ly * f[1] + xz * lz * f[2],
            ly * f[1] + yz * lz * f[2],
            lz * f[2],
        ]
    }

    /// Maps a point onto fractional coordinates, where `[0, 1)` spans the box
    pub fn make_fractional(&self, p: Vec3) -> Vec3 {
        let f = self.to_lattice(p);
        [f[0] + 0.5, f[1] + 0.5, f[2] + 0.5]
    }

    /// Inverse of [`SimBox::make_fractional`]
    pub fn make_absolute(&self, f: Vec3) -> Vec3 {
        let mut p = self.from_lattice([f[0] - 0.5, f[1] - 0.5, f[2] - 0.5]);
        if self.is_2d {
            p[2] = 0.0;
        }
        p
    }

    /// The number of box images to subtract along each axis to bring `v`
    /// into the minimum-image region
    fn image_shift(&self, v: Vec3) -> [f64; 3] {
        let f = self.to_lattice(v);
        let mut shift = [0.0; 3];
        for i in 0..self.n_dims() {
            if self.periodic[i] {
                let mut s = (f[i] + 0.5).floor();
                // f + 0.5 rounds up onto the next integer when f lies within
                // half an ulp below a half-integer
                if f[i] - s < -0.5 {
                    s -= 1.0;
                }
                shift[i] = s;
            }
        }
        shift
    }

    /// Returns the minimum-image representative of `v`
    ///
    /// Every periodic lattice component of the result lies in `[-0.5, 0.5)`
    /// (up to rounding); the other components pass through. A vector that
    /// already lies in that region is returned unchanged.
    pub fn wrap(&self, v: Vec3) -> Vec3 {
        let mut out = v;
        // rounding in the Cartesian subtraction can leave a component on the
        // wrong side of a half-integer, so shift again until nothing moves
        for _ in 0..MAX_WRAP_PASSES {
            let shift = self.image_shift(out);
            if shift == [0.0; 3] {
                break;
            }
            out = sub(out, self.from_lattice(shift));
            if self.is_2d {
                out[2] = v[2];
            }
        }
        out
    }

    /// The minimum-image distance and separation vector pointing from `a`
    /// to `b`
    pub fn minimum_image(&self, a: Vec3, b: Vec3) -> (f64, Vec3) {
        let vector = self.wrap(sub(b, a));
        (norm(vector), vector)
    }
}

impl PartialEq for SimBox {
    fn eq(&self, other: &Self) -> bool {
        self.is_2d == other.is_2d
            && self.periodic == other.periodic
            && self
                .lengths
                .iter()
                .chain(self.tilts.iter())
                .zip(other.lengths.iter().chain(other.tilts.iter()))
                .all(|(&a, &b)| approx_eq(a, b, EQ_RTOL, EQ_ATOL))
    }
}
