//! Weighted histogramming of point coordinates.

use ndarray::{ArrayD, ArrayView1, ArrayViewMut1, IxDyn, Zip};
use sansred_core::{Coord, Error, LabeledArray, Result, Variable};
use std::collections::BTreeMap;

/// Histograms `array` by the point coordinate `coord_name` onto `edges`.
///
/// Every element is a weight placed at its coordinate value. The
/// coordinate labels one dimension of the data and may depend on others
/// (momentum transfer varies per spectrum and wavelength); each lane
/// along that dimension is histogrammed independently and the dimension
/// is replaced by `edges.dim()`. Bins are closed on the left; points
/// outside the edges or NaN are dropped, so the total of in-range
/// points is conserved.
///
/// Masks depending on the histogrammed dimension are applied and
/// dropped; other coordinates along it are dropped too.
///
/// # Errors
/// - [`Error::Shape`] if the coordinate is missing or holds bin edges.
/// - [`Error::Unit`] if coordinate and edges have different units.
/// - [`Error::Range`] if `edges` is not strictly ascending.
pub fn histogram(array: &LabeledArray, coord_name: &str, edges: &Coord) -> Result<LabeledArray> {
    let coord = array.coord(coord_name)?;
    let dim = coord.dim().to_string();
    if coord.is_edges() {
        return Err(Error::shape(
            &dim,
            format!("cannot histogram bin-edge coordinate '{coord_name}'"),
        ));
    }
    coord.unit().expect_same(edges.unit(), "histogram")?;
    let bins = edges.values_1d()?;
    if bins.len() < 2 || bins.windows(2).any(|w| w[0] >= w[1] || w[0].is_nan()) {
        return Err(Error::range(edges.dim(), "histogram edges must be strictly ascending"));
    }

    let axis = array.data().axis(&dim)?;
    let points = coord.var().broadcast_to(array.dims(), array.shape())?;
    let weights = array.zero_masked(&dim)?;

    let mut out_shape = array.shape().to_vec();
    out_shape[axis.index()] = bins.len() - 1;
    let mut out = ArrayD::<f64>::zeros(IxDyn(&out_shape));
    Zip::from(out.lanes_mut(axis))
        .and(weights.values().lanes(axis))
        .and(points.lanes(axis))
        .par_for_each(|out, weights, points| histogram_lane(points, weights, &bins, out));

    log::debug!("histogram '{coord_name}' along {dim} into {} bins", bins.len() - 1);

    let dims: Vec<String> = array
        .dims()
        .iter()
        .map(|d| if *d == dim { edges.dim().to_string() } else { d.clone() })
        .collect();
    let data = Variable::new(&dims, out, array.unit())?;

    let mut coords: BTreeMap<String, Coord> = array
        .coords()
        .iter()
        .filter(|(_, c)| !c.var().contains(&dim))
        .map(|(name, c)| (name.clone(), c.clone()))
        .collect();
    coords.insert(edges.dim().to_string(), edges.clone());
    let masks = array
        .masks()
        .iter()
        .filter(|(_, m)| !m.contains(&dim))
        .map(|(name, m)| (name.clone(), m.clone()))
        .collect();
    LabeledArray::from_parts(data, coords, masks)
}

fn histogram_lane(
    points: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    edges: &[f64],
    mut out: ArrayViewMut1<f64>,
) {
    let (lo, hi) = (edges[0], edges[edges.len() - 1]);
    for (&p, &w) in points.iter().zip(weights.iter()) {
        if p.is_nan() || p < lo || p >= hi {
            continue;
        }
        let bin = edges.partition_point(|&e| e <= p) - 1;
        out[bin] += w;
    }
}
