use ndarray::Array2;
use num_complex::Complex;
use pbcstat::{Points, SimBox};
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

/// Draws `n_points` positions uniformly from inside of `sim_box`
///
/// The returned array has shape `(n_dims, n_points)`, where `n_dims` is 2 for
/// a 2D box.
pub fn random_positions(sim_box: &SimBox, n_points: usize, seed: u64) -> Array2<f64> {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let dist = Uniform::try_from(0.0..1.0).unwrap();
    let n_dims = sim_box.n_dims();

    let mut positions = Array2::<f64>::zeros([n_dims, n_points]);
    for i in 0..n_points {
        let mut frac = [0.5; 3];
        for f in frac.iter_mut().take(n_dims) {
            *f = dist.sample(&mut my_rng);
        }
        let p = sim_box.make_absolute(frac);
        for dim in 0..n_dims {
            positions[[dim, i]] = p[dim];
        }
    }
    positions
}

/// Draws `n` values uniformly from `[-1, 1]`
pub fn random_values(n: usize, seed: u64) -> Vec<f64> {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let dist = Uniform::try_from(-1.0..=1.0).unwrap();
    (0..n).map(|_| dist.sample(&mut my_rng)).collect()
}

/// Draws `n` unit-modulus complex numbers with uniformly distributed phases
pub fn random_phases(n: usize, seed: u64) -> Vec<Complex<f64>> {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let dist = Uniform::try_from(0.0..std::f64::consts::TAU).unwrap();
    (0..n)
        .map(|_| Complex::from_polar(1.0, dist.sample(&mut my_rng)))
        .collect()
}

/// A pair found by [`brute_force_ball`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefPair {
    pub query_point_index: usize,
    pub point_index: usize,
    pub distance: f64,
}

/// Checks every pair against every minimum-image distance
///
/// The output is sorted by query point and then by point index.
pub fn brute_force_ball(
    sim_box: &SimBox,
    points: &Points,
    query_points: &Points,
    r_max: f64,
    exclude_ii: bool,
) -> Vec<RefPair> {
    let mut out = Vec::new();
    for i in 0..query_points.n_points() {
        for j in 0..points.n_points() {
            if exclude_ii && i == j {
                continue;
            }
            let (distance, _) = sim_box.minimum_image(query_points.get(i), points.get(j));
            if distance < r_max {
                out.push(RefPair {
                    query_point_index: i,
                    point_index: j,
                    distance,
                });
            }
        }
    }
    out
}

/// The minimum-image distances from `query_point` to every point, sorted in
/// ascending order
pub fn sorted_distances(sim_box: &SimBox, points: &Points, query_point: [f64; 3]) -> Vec<f64> {
    let mut distances: Vec<f64> = (0..points.n_points())
        .map(|j| sim_box.minimum_image(query_point, points.get(j)).0)
        .collect();
    distances.sort_by(f64::total_cmp);
    distances
}
