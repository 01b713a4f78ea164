//! Flux-conserving rebinning of edge-aggregated data.
//!
//! Each input bin's content is split over the output bins in proportion
//! to the overlap of the two intervals. Output bins outside the input
//! range receive nothing, so the total is conserved whenever the new
//! edges cover the old ones.

use ndarray::{ArrayD, ArrayView1, ArrayViewMut1, Axis, IxDyn, Zip};
use sansred_core::{bin_widths, Coord, Error, LabeledArray, Mask, Result, Unit, Variable};
use std::collections::BTreeMap;

/// Redistributes `array` along `dim` onto the 1-D bin `edges`.
///
/// The data must hold totals per bin (counts, not densities); see
/// [`map_to_bins`] for density data. The dimension coordinate may carry
/// extra dimensions (for example one wavelength axis per spectrum); the
/// output always uses the shared target edges. Elements hidden by masks
/// along `dim` contribute nothing and the masks themselves are rebinned:
/// an output bin is masked if any overlapping input bin was.
///
/// Coordinates depending on `dim` other than the dimension coordinate
/// are dropped.
///
/// # Errors
/// - [`Error::Shape`] if `dim` has no edge coordinate or `edges` does not
///   label `dim`.
/// - [`Error::Unit`] if the units of the two edge sets differ.
/// - [`Error::Range`] if either edge set is not ascending.
pub fn rebin(array: &LabeledArray, dim: &str, edges: &Coord) -> Result<LabeledArray> {
    let old = array.coord(dim)?;
    check_edges(old, dim)?;
    check_edges(edges, dim)?;
    old.unit().expect_same(edges.unit(), "rebin")?;
    let new = edges.values_1d()?;

    let axis = array.data().axis(dim)?;
    let mut edge_shape = array.shape().to_vec();
    edge_shape[axis.index()] += 1;
    let old_edges = old.var().broadcast_to(array.dims(), &edge_shape)?;

    let data = array.zero_masked(dim)?;
    let mut out_shape = array.shape().to_vec();
    out_shape[axis.index()] = new.len() - 1;
    let mut out = ArrayD::<f64>::zeros(IxDyn(&out_shape));

    log::debug!(
        "rebin {dim}: {} -> {} bins over {} lanes",
        array.shape()[axis.index()],
        new.len() - 1,
        out.len() / out_shape[axis.index()].max(1)
    );

    Zip::from(out.lanes_mut(axis))
        .and(data.values().lanes(axis))
        .and(old_edges.lanes(axis))
        .par_for_each(|out, values, old| rebin_lane(old, values, &new, out));

    let mut coords: BTreeMap<String, Coord> = array
        .coords()
        .iter()
        .filter(|(_, c)| !c.var().contains(dim))
        .map(|(name, c)| (name.clone(), c.clone()))
        .collect();
    coords.insert(dim.to_string(), edges.clone());

    let mut masks = BTreeMap::new();
    for (name, mask) in array.masks() {
        let mask = if mask.contains(dim) {
            rebin_mask(mask, array, axis, &old_edges, &new)?
        } else {
            mask.clone()
        };
        masks.insert(name.clone(), mask);
    }

    let data = Variable::new(array.dims(), out, array.unit())?;
    LabeledArray::from_parts(data, coords, masks)
}

/// Rebins density data (content per unit of the coordinate).
///
/// The data is converted to totals by multiplying with the dimensionless
/// input bin widths, redistributed with [`rebin`], and divided by the
/// dimensionless output bin widths. The unit of the data is unchanged.
/// A point coordinate on `dim` is first converted to extrapolated edges.
///
/// # Errors
/// Same as [`rebin`].
pub fn map_to_bins(array: &LabeledArray, dim: &str, edges: &Coord) -> Result<LabeledArray> {
    let array = if array.coord(dim)?.is_edges() {
        array.clone()
    } else {
        array.clone().to_bin_edges(dim)?
    };
    let widths = bin_widths(array.coord(dim)?)?.with_unit(Unit::Dimensionless);
    let totals = rebin(&array.mul_var(&widths)?, dim, edges)?;
    let new_widths = bin_widths(edges)?.with_unit(Unit::Dimensionless);
    totals.div_var(&new_widths)
}

fn check_edges(coord: &Coord, dim: &str) -> Result<()> {
    if !coord.is_edges() || coord.dim() != dim {
        return Err(Error::shape(
            dim,
            format!(
                "rebinning needs bin edges along '{dim}', got {:?} along '{}'",
                coord.kind(),
                coord.dim()
            ),
        ));
    }
    if coord.extent() < 2 {
        return Err(Error::shape(dim, "rebinning needs at least 2 edges"));
    }
    coord.expect_ascending()
}

/// Calls `f(i, j, fraction)` for every input bin `i` overlapping output
/// bin `j`, where `fraction` is the share of bin `i` inside bin `j`.
///
/// Zero-width input bins lying inside an output bin report a fraction of 0.
fn for_each_overlap(old: &ArrayView1<f64>, new: &[f64], mut f: impl FnMut(usize, usize, f64)) {
    let n_old = old.len().saturating_sub(1);
    let n_new = new.len().saturating_sub(1);
    let (mut i, mut j) = (0, 0);
    while i < n_old && j < n_new {
        let (lo, hi) = (old[i], old[i + 1]);
        let (new_lo, new_hi) = (new[j], new[j + 1]);
        if hi <= new_lo && (hi < new_lo || lo < hi) {
            i += 1;
            continue;
        }
        if new_hi <= lo {
            j += 1;
            continue;
        }
        let width = hi - lo;
        let fraction = if width > 0.0 {
            (hi.min(new_hi) - lo.max(new_lo)) / width
        } else {
            0.0
        };
        f(i, j, fraction);
        if hi <= new_hi {
            i += 1;
        } else {
            j += 1;
        }
    }
}

fn rebin_lane(
    old: ArrayView1<f64>,
    values: ArrayView1<f64>,
    new: &[f64],
    mut out: ArrayViewMut1<f64>,
) {
    for_each_overlap(&old, new, |i, j, fraction| {
        if fraction > 0.0 {
            out[j] += values[i] * fraction;
        }
    });
}

fn rebin_mask(
    mask: &Mask,
    array: &LabeledArray,
    axis: Axis,
    old_edges: &ArrayD<f64>,
    new: &[f64],
) -> Result<Mask> {
    let full = mask.broadcast_to(array.dims(), array.shape())?;
    let mut out_shape = array.shape().to_vec();
    out_shape[axis.index()] = new.len() - 1;
    let mut out = ArrayD::<bool>::from_elem(IxDyn(&out_shape), false);
    Zip::from(out.lanes_mut(axis))
        .and(full.lanes(axis))
        .and(old_edges.lanes(axis))
        .for_each(|mut out, masked, old| {
            for_each_overlap(&old, new, |i, j, _| {
                if masked[i] {
                    out[j] = true;
                }
            });
        });
    Mask::new(array.dims(), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn counts(edges: Vec<f64>, values: Vec<f64>) -> LabeledArray {
        LabeledArray::new(Variable::vector("tof", values, Unit::Counts))
            .with_coord("tof", Coord::edges("tof", edges, Unit::Microseconds))
            .unwrap()
    }

    #[test]
    fn test_rebin_splits_by_overlap() {
        let data = counts(vec![0.0, 2.0, 4.0], vec![4.0, 8.0]);
        let target = Coord::edges("tof", vec![0.0, 1.0, 3.0, 4.0], Unit::Microseconds);
        let out = rebin(&data, "tof", &target).unwrap();
        assert_eq!(out.data().to_vec(), vec![2.0, 6.0, 4.0]);
        assert_eq!(out.coord("tof").unwrap(), &target);
        assert_eq!(out.unit(), Unit::Counts);
    }

    #[test]
    fn test_rebin_outside_input_range_is_zero() {
        let data = counts(vec![1.0, 2.0], vec![5.0]);
        let target = Coord::edges("tof", vec![-1.0, 0.0, 1.5, 3.0, 4.0], Unit::Microseconds);
        let out = rebin(&data, "tof", &target).unwrap();
        assert_eq!(out.data().to_vec(), vec![0.0, 2.5, 2.5, 0.0]);
    }

    #[test]
    fn test_rebin_rejects_mismatched_units() {
        let data = counts(vec![0.0, 1.0], vec![1.0]);
        let target = Coord::edges("tof", vec![0.0, 1.0], Unit::Angstrom);
        assert!(matches!(rebin(&data, "tof", &target), Err(Error::Unit { .. })));
    }

    #[test]
    fn test_rebin_rejects_point_coordinates() {
        let data = LabeledArray::new(Variable::vector("tof", vec![1.0, 2.0], Unit::Counts))
            .with_coord("tof", Coord::centers("tof", vec![0.5, 1.5], Unit::Microseconds))
            .unwrap();
        let target = Coord::edges("tof", vec![0.0, 2.0], Unit::Microseconds);
        assert!(matches!(rebin(&data, "tof", &target), Err(Error::Shape { .. })));
    }

    #[test]
    fn test_rebin_per_spectrum_edges() {
        let values = Variable::new(
            &["spectrum", "tof"],
            array![[1.0, 1.0], [2.0, 2.0]].into_dyn(),
            Unit::Counts,
        )
        .unwrap();
        let edges = Variable::new(
            &["spectrum", "tof"],
            array![[0.0, 1.0, 2.0], [1.0, 2.0, 3.0]].into_dyn(),
            Unit::Microseconds,
        )
        .unwrap();
        let data = LabeledArray::new(values)
            .with_coord("tof", Coord::new("tof", sansred_core::BinKind::Edges, edges).unwrap())
            .unwrap();
        let target = Coord::edges("tof", vec![0.0, 1.5, 3.0], Unit::Microseconds);
        let out = rebin(&data, "tof", &target).unwrap();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.data().to_vec(), vec![1.5, 0.5, 1.0, 3.0]);
    }

    #[test]
    fn test_rebin_masks_overlapping_bins() {
        let data = counts(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 10.0, 1.0])
            .with_mask("spike", Mask::vector("tof", vec![false, true, false]))
            .unwrap();
        let target = Coord::edges("tof", vec![0.0, 1.5, 3.0], Unit::Microseconds);
        let out = rebin(&data, "tof", &target).unwrap();
        assert_eq!(out.data().to_vec(), vec![1.0, 1.0]);
        let spike: Vec<bool> = out.masks()["spike"].values().iter().copied().collect();
        assert_eq!(spike, vec![true, true]);
    }

    #[test]
    fn test_map_to_bins_keeps_density() {
        let values = Variable::vector("wavelength", vec![3.0, 3.0, 3.0], Unit::Dimensionless);
        let edges = Coord::edges("wavelength", vec![1.0, 2.0, 3.0, 4.0], Unit::Angstrom);
        let data = LabeledArray::new(values).with_coord("wavelength", edges).unwrap();
        let target = Coord::edges("wavelength", vec![1.0, 1.5, 4.0], Unit::Angstrom);
        let out = map_to_bins(&data, "wavelength", &target).unwrap();
        for v in out.data().to_vec() {
            assert_relative_eq!(v, 3.0, epsilon = 1e-12);
        }
        assert_eq!(out.unit(), Unit::Dimensionless);
    }

    #[test]
    fn test_map_to_bins_from_points() {
        let values = Variable::vector("wavelength", vec![2.0, 2.0, 2.0, 2.0], Unit::Counts);
        let centers = Coord::centers("wavelength", vec![1.0, 2.0, 3.0, 4.0], Unit::Angstrom);
        let data = LabeledArray::new(values).with_coord("wavelength", centers).unwrap();
        let target = Coord::edges("wavelength", vec![1.0, 2.0, 4.0], Unit::Angstrom);
        let out = map_to_bins(&data, "wavelength", &target).unwrap();
        assert_eq!(out.unit(), Unit::Counts);
        for v in out.data().to_vec() {
            assert_relative_eq!(v, 2.0, epsilon = 1e-12);
        }
    }
}
