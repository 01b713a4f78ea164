#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]
use approx::assert_relative_eq;
use ndarray::Array2;
use sansred_algorithms::{coarsen, partition, rebin, select_range, EmptyRanges};
use sansred_core::{Coord, LabeledArray, Quantity, Unit, Variable};

/// Deterministic pseudo-random sequence in [0, 1).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    /// `n` bins of random width spanning `[lo, hi]`.
    fn edges(&mut self, lo: f64, hi: f64, n: usize) -> Vec<f64> {
        let widths: Vec<f64> = (0..n).map(|_| 0.1 + self.next()).collect();
        let total: f64 = widths.iter().sum();
        let mut edges = vec![lo];
        let mut acc = 0.0;
        for w in &widths[..n - 1] {
            acc += w;
            edges.push(lo + (hi - lo) * acc / total);
        }
        edges.push(hi);
        edges
    }
}

fn spectrum(edges: Vec<f64>, rng: &mut Lcg) -> LabeledArray {
    let values = (0..edges.len() - 1).map(|_| 100.0 * rng.next()).collect();
    LabeledArray::new(Variable::vector("wavelength", values, Unit::Counts))
        .with_coord("wavelength", Coord::edges("wavelength", edges, Unit::Angstrom))
        .unwrap()
}

#[test]
fn test_rebin_conserves_total_over_same_range() {
    let mut rng = Lcg(7);
    for n_in in [1, 3, 17, 100] {
        for n_out in [1, 2, 9, 55, 250] {
            let data = spectrum(rng.edges(1.0, 10.0, n_in), &mut rng);
            let target = Coord::edges("wavelength", rng.edges(1.0, 10.0, n_out), Unit::Angstrom);
            let out = rebin(&data, "wavelength", &target).unwrap();
            let before: f64 = data.data().to_vec().iter().sum();
            let after: f64 = out.data().to_vec().iter().sum();
            assert_relative_eq!(before, after, max_relative = 1e-10);
        }
    }
}

#[test]
fn test_rebin_onto_wider_range_conserves_total() {
    let mut rng = Lcg(11);
    let data = spectrum(rng.edges(2.0, 8.0, 30), &mut rng);
    let target = Coord::edges("wavelength", rng.edges(0.0, 12.0, 40), Unit::Angstrom);
    let out = rebin(&data, "wavelength", &target).unwrap();
    let before: f64 = data.data().to_vec().iter().sum();
    let after: f64 = out.data().to_vec().iter().sum();
    assert_relative_eq!(before, after, max_relative = 1e-10);
}

#[test]
fn test_rebin_onto_own_edges_is_identity() {
    let mut rng = Lcg(3);
    let edges = rng.edges(0.5, 12.0, 64);
    let data = spectrum(edges.clone(), &mut rng);
    let target = Coord::edges("wavelength", edges, Unit::Angstrom);
    let out = rebin(&data, "wavelength", &target).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_select_range_brackets_request() {
    let mut rng = Lcg(5);
    let edges = rng.edges(0.0, 100_000.0, 50);
    let coord = Coord::edges("tof", edges.clone(), Unit::Microseconds);
    for _ in 0..200 {
        let a = 99_000.0 * rng.next();
        let b = a + (99_999.0 - a) * rng.next();
        let r = select_range(&coord, Quantity::us(a), Quantity::us(b)).unwrap();
        assert!(edges[r.first] <= a, "left edge {} above start {}", edges[r.first], a);
        assert!(edges[r.last + 1] > b, "right edge {} not above end {}", edges[r.last + 1], b);
        assert!(edges[r.first + 1] > a);
        assert!(edges[r.last] <= b);
    }
    for (i, &e) in edges[..edges.len() - 1].iter().enumerate() {
        let r = select_range(&coord, Quantity::us(e), Quantity::us(e)).unwrap();
        assert_eq!((r.first, r.last), (i, i));
    }
}

#[test]
fn test_partition_covers_cut_interval() {
    let mut rng = Lcg(13);
    let edges = rng.edges(1.0, 10.0, 100);
    let coord = Coord::edges("wavelength", edges.clone(), Unit::Angstrom);
    let (a, b, c) = (2.0, 5.5, 9.0);
    let cuts = Coord::edges("wavelength", vec![a, b, c], Unit::Angstrom);
    let ranges = partition(&coord, &cuts, EmptyRanges::Reject).unwrap();
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0].end, ranges[1].start);

    let centers: Vec<f64> = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
    let inside: Vec<usize> = (0..centers.len())
        .filter(|&i| centers[i] >= a && centers[i] < c)
        .collect();
    let covered: Vec<usize> = ranges.iter().flat_map(Clone::clone).collect();
    assert_eq!(covered, inside);
    for i in ranges[0].clone() {
        assert!(centers[i] < b);
    }
    for i in ranges[1].clone() {
        assert!(centers[i] >= b);
    }
}

#[test]
fn test_coarsen_8x8_to_4x4() {
    let values = Array2::from_shape_fn((8, 8), |(y, x)| (x + 8 * y) as f64).into_dyn();
    let x: Vec<f64> = (0..=8).map(|i| -0.04 + 0.01 * i as f64).collect();
    let y: Vec<f64> = (0..=8).map(|i| 0.01 * i as f64).collect();
    let data = LabeledArray::new(Variable::new(&["y", "x"], values.clone(), Unit::Counts).unwrap())
        .with_coord("x", Coord::edges("x", x, Unit::Meter))
        .unwrap()
        .with_coord("y", Coord::edges("y", y, Unit::Meter))
        .unwrap();
    let out = coarsen(&data, "x", "y", 4, 4).unwrap();
    assert_eq!(out.shape(), &[4, 4]);
    for by in 0..4 {
        for bx in 0..4 {
            let mut expected = 0.0;
            for y in 2 * by..2 * by + 2 {
                for x in 2 * bx..2 * bx + 2 {
                    expected += values[[y, x]];
                }
            }
            assert_eq!(out.data().get(&[by, bx]), Some(expected));
        }
    }
    let x = out.coord("x").unwrap().values_1d().unwrap();
    assert_eq!(x.len(), 5);
    assert_relative_eq!(x[0], -0.04, epsilon = 1e-15);
    assert_relative_eq!(x[4], 0.04, epsilon = 1e-15);
    let y = out.coord("y").unwrap().values_1d().unwrap();
    assert_relative_eq!(y[0], 0.0);
    assert_relative_eq!(y[4], 0.08, epsilon = 1e-15);
}
