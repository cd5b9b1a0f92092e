use pbcstat::{ErrorCategory, SimBox};
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

mod common;

use common::isclose;

/// builds boxes with random lengths, tilts and periodicity
fn random_boxes(seed: u64, n_boxes: usize) -> Vec<SimBox> {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let length_dist = Uniform::try_from(1.0..10.0).unwrap();
    let tilt_dist = Uniform::try_from(-1.0..=1.0).unwrap();
    let coin = Uniform::try_from(0..2).unwrap();

    (0..n_boxes)
        .map(|i| {
            let lengths = [
                length_dist.sample(&mut my_rng),
                length_dist.sample(&mut my_rng),
                length_dist.sample(&mut my_rng),
            ];
            let tilts = [
                tilt_dist.sample(&mut my_rng),
                tilt_dist.sample(&mut my_rng),
                tilt_dist.sample(&mut my_rng),
            ];
            let periodic = [
                coin.sample(&mut my_rng) == 1,
                coin.sample(&mut my_rng) == 1,
                coin.sample(&mut my_rng) == 1,
            ];
            if i % 3 == 0 {
                SimBox::new_2d(lengths[0], lengths[1], tilts[0], [periodic[0], periodic[1]])
                    .unwrap()
            } else {
                SimBox::new_3d(lengths, tilts, periodic).unwrap()
            }
        })
        .collect()
}

fn random_vectors(seed: u64, n: usize) -> Vec<[f64; 3]> {
    let mut my_rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let dist = Uniform::try_from(-40.0..=40.0).unwrap();
    (0..n)
        .map(|_| {
            [
                dist.sample(&mut my_rng),
                dist.sample(&mut my_rng),
                dist.sample(&mut my_rng),
            ]
        })
        .collect()
}

#[test]
fn wrap_is_idempotent() {
    for (box_index, sim_box) in random_boxes(7, 30).iter().enumerate() {
        for v in random_vectors(1000 + box_index as u64, 200) {
            let once = sim_box.wrap(v);
            let twice = sim_box.wrap(once);
            assert_eq!(once, twice, "box {box_index}, v = {v:?}");
        }
    }
}

#[test]
fn wrap_lands_in_minimum_image_region() {
    for (box_index, sim_box) in random_boxes(8, 30).iter().enumerate() {
        let periodic = sim_box.periodic();
        for v in random_vectors(2000 + box_index as u64, 200) {
            let wrapped = sim_box.wrap(v);
            let f = sim_box.to_lattice(wrapped);
            let f_orig = sim_box.to_lattice(v);
            for axis in 0..sim_box.n_dims() {
                if periodic[axis] {
                    assert!(
                        (-0.5 - 1e-12..=0.5 + 1e-12).contains(&f[axis]),
                        "box {box_index}, axis {axis}: lattice component {}",
                        f[axis]
                    );
                    // only whole box images are removed
                    let n_images = f_orig[axis] - f[axis];
                    assert!(isclose(n_images, n_images.round(), 0.0, 1e-9));
                } else {
                    assert!(isclose(f[axis], f_orig[axis], 1e-12, 1e-12));
                }
            }
            if sim_box.is_2d() {
                assert_eq!(wrapped[2], v[2]);
            }
        }
    }
}

#[test]
fn box_equality() {
    let square = SimBox::square(3.5).unwrap();
    let general = SimBox::new_2d(3.5, 3.5, 0.0, [true, true]).unwrap();
    assert_eq!(square, general);
    assert_eq!(square.lengths(), [3.5, 3.5, 0.0]);
    assert!(square.is_2d());

    let cube = SimBox::cube(3.5).unwrap();
    assert_ne!(square, cube);
    assert_eq!(cube, SimBox::new_3d([3.5; 3], [0.0; 3], [true; 3]).unwrap());
    assert_ne!(
        cube,
        SimBox::new_3d([3.5; 3], [0.0; 3], [true, true, false]).unwrap()
    );
}

#[test]
fn invalid_boxes() {
    for result in [
        SimBox::cube(0.0),
        SimBox::cube(-1.0),
        SimBox::cube(f64::INFINITY),
        SimBox::new_3d([1.0, 1.0, 1.0], [f64::NAN, 0.0, 0.0], [true; 3]),
        SimBox::new_2d(1.0, 0.0, 0.0, [true; 2]),
    ] {
        assert_eq!(result.unwrap_err().category(), ErrorCategory::Configuration);
    }
}

#[test]
fn fractional_round_trip() {
    for (box_index, sim_box) in random_boxes(9, 12).iter().enumerate() {
        for v in random_vectors(3000 + box_index as u64, 20) {
            let mut p = v;
            if sim_box.is_2d() {
                p[2] = 0.0;
            }
            let back = sim_box.make_absolute(sim_box.make_fractional(p));
            for axis in 0..3 {
                assert!(isclose(back[axis], p[axis], 1e-12, 1e-10));
            }
        }
    }
}

/// `x` moved `n_ulps` representable floats toward negative infinity
fn ulps_below(x: f64, n_ulps: usize) -> f64 {
    (0..n_ulps).fold(x, |acc, _| acc.next_down())
}

#[test]
fn wrap_at_half_integer_lattice_components() {
    let boxes = [
        SimBox::cube(3.0).unwrap(),
        SimBox::orthorhombic([0.7, 5.0, 11.0]).unwrap(),
        SimBox::new_3d([4.0, 6.0, 5.0], [0.3, -0.2, 0.45], [true; 3]).unwrap(),
        SimBox::new_3d([2.5, 2.5, 9.0], [-1.0, 0.5, 1.0], [true, false, true]).unwrap(),
        SimBox::new_2d(3.0, 7.0, 0.25, [true; 2]).unwrap(),
    ];

    let mut n_checked = 0;
    for (box_index, sim_box) in boxes.iter().enumerate() {
        for axis in 0..sim_box.n_dims() {
            for k in -3..=3 {
                let half = k as f64 + 0.5;
                for offset in [ulps_below(half, 1), ulps_below(half, 2), ulps_below(half, 4)] {
                    let mut f = [0.1, -0.2, 0.3];
                    f[axis] = offset;
                    if sim_box.is_2d() {
                        f[2] = 0.0;
                    }
                    let v = sim_box.from_lattice(f);

                    let once = sim_box.wrap(v);
                    let twice = sim_box.wrap(once);
                    assert_eq!(once, twice, "box {box_index}, axis {axis}, f = {f:?}");

                    let wrapped = sim_box.to_lattice(once);
                    for i in 0..sim_box.n_dims() {
                        if sim_box.periodic()[i] {
                            assert!(
                                (-0.5 - 1e-12..0.5).contains(&wrapped[i]),
                                "box {box_index}, f = {f:?}: lattice component {}",
                                wrapped[i]
                            );
                        }
                    }
                    n_checked += 1;
                }
            }
        }
    }
    assert!(n_checked > 0);
}
