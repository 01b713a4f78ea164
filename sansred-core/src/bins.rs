//! Bin edge/center conversion and bin-edge generators.
//!
//! All conversions work along one named dimension, leave other
//! dimensions untouched and return new values; installing the result on
//! an array is an explicit step (see [`crate::LabeledArray::to_bin_centers`]).

use crate::coord::{BinKind, Coord};
use crate::error::{Error, Result};
use crate::unit::Unit;
use crate::variable::Variable;
use ndarray::{concatenate, Slice};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Arithmetic mean of adjacent values along `dim` (length `N - 1`).
///
/// # Errors
/// Returns [`Error::Shape`] if `dim` is absent or has fewer than 2 values.
pub fn midpoints(var: &Variable, dim: &str) -> Result<Variable> {
    let axis = var.axis(dim)?;
    let n = var.len_of(dim)?;
    if n < 2 {
        return Err(Error::shape(dim, format!("need at least 2 values, got {n}")));
    }
    let values = var.values().view();
    let lo = values.slice_axis(axis, Slice::from(..n - 1));
    let hi = values.slice_axis(axis, Slice::from(1..));
    let mid = (&lo + &hi) * 0.5;
    Variable::new(var.dims(), mid, var.unit())
}

/// Differences of adjacent edges along the coordinate's dimension.
///
/// The unit of the widths is the unit of the coordinate.
///
/// # Errors
/// Returns [`Error::Shape`] if `coord` is not an edge coordinate or has
/// fewer than 2 edges.
pub fn bin_widths(coord: &Coord) -> Result<Variable> {
    if !coord.is_edges() {
        return Err(Error::shape(coord.dim(), "bin widths need bin edges"));
    }
    let var = coord.var();
    let axis = var.axis(coord.dim())?;
    let n = coord.extent();
    if n < 2 {
        return Err(Error::shape(coord.dim(), format!("need at least 2 edges, got {n}")));
    }
    let values = var.values().view();
    let widths =
        &values.slice_axis(axis, Slice::from(1..)) - &values.slice_axis(axis, Slice::from(..n - 1));
    Variable::new(var.dims(), widths, var.unit())
}

/// Bin centers of an edge coordinate.
///
/// # Errors
/// Returns [`Error::Shape`] if `coord` is not an edge coordinate or has
/// fewer than 2 edges.
pub fn centers_from_edges(coord: &Coord) -> Result<Coord> {
    if !coord.is_edges() {
        return Err(Error::shape(coord.dim(), "coordinate already holds bin centers"));
    }
    let centers = midpoints(coord.var(), coord.dim())?;
    Coord::new(coord.dim(), BinKind::Centers, centers)
}

/// Bin edges of a center coordinate.
///
/// Interior edges are midpoints of adjacent centers; the outer edges are
/// extrapolated linearly (`1.5 * c[0] - 0.5 * c[1]` and mirrored). A
/// single center `c` yields the edge pair `c - 1, c + 1`.
///
/// # Errors
/// Returns [`Error::Shape`] if `coord` is not a center coordinate or has no
/// values.
pub fn edges_from_centers(coord: &Coord) -> Result<Coord> {
    if coord.is_edges() {
        return Err(Error::shape(coord.dim(), "coordinate already holds bin edges"));
    }
    let dim = coord.dim();
    let var = coord.var();
    let axis = var.axis(dim)?;
    let n = coord.extent();
    let centers = var.values().view();

    let edges = match n {
        0 => return Err(Error::shape(dim, "cannot derive edges from zero centers")),
        1 => {
            let lo = &centers - 1.0;
            let hi = &centers + 1.0;
            concatenate(axis, &[lo.view(), hi.view()])
        }
        _ => {
            let c0 = centers.slice_axis(axis, Slice::from(0..1));
            let c1 = centers.slice_axis(axis, Slice::from(1..2));
            let first = &c0 * 1.5 - &c1 * 0.5;
            let cl = centers.slice_axis(axis, Slice::from(n - 1..n));
            let cm = centers.slice_axis(axis, Slice::from(n - 2..n - 1));
            let last = &cl * 1.5 - &cm * 0.5;
            let bulk = midpoints(var, dim)?;
            concatenate(axis, &[first.view(), bulk.values().view(), last.view()])
        }
    }
    .map_err(|e| Error::shape(dim, e.to_string()))?;

    Coord::new(dim, BinKind::Edges, Variable::new(var.dims(), edges, var.unit())?)
}

/// `num` evenly spaced values from `start` to `stop` inclusive.
#[must_use]
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            #[allow(clippy::cast_precision_loss)]
            let step = (stop - start) / (num - 1) as f64;
            #[allow(clippy::cast_precision_loss)]
            let mut values: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
            values[num - 1] = stop;
            values
        }
    }
}

/// `num` geometrically spaced values from `start` to `stop` inclusive.
/// Both bounds must be positive.
#[must_use]
pub fn geomspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    let mut values: Vec<f64> = linspace(start.ln(), stop.ln(), num)
        .into_iter()
        .map(f64::exp)
        .collect();
    if let Some(first) = values.first_mut() {
        *first = start;
    }
    if let Some(last) = values.last_mut() {
        *last = stop;
    }
    values
}

/// Logarithmic edges growing by `1 + step` per bin, clipped at `stop`.
///
/// Equivalent to rebin parameters `start, -step, stop`.
#[must_use]
pub fn log_step(start: f64, step: f64, stop: f64) -> Vec<f64> {
    let mut edges = vec![start];
    let mut next = start * (1.0 + step);
    while next < stop && step > 0.0 {
        edges.push(next);
        next *= 1.0 + step;
    }
    edges.push(stop);
    edges
}

/// Declarative description of a 1-D bin-edge coordinate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinSpec {
    /// `bins` equal-width bins.
    Linear { start: f64, stop: f64, bins: usize },
    /// `bins` bins with geometrically growing width.
    Geometric { start: f64, stop: f64, bins: usize },
    /// Bins growing by a relative `step`, last bin clipped at `stop`.
    LogStep { start: f64, step: f64, stop: f64 },
    /// Explicit edges.
    Explicit(Vec<f64>),
}

impl BinSpec {
    /// Edge values described by this spec.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        match self {
            Self::Linear { start, stop, bins } => linspace(*start, *stop, bins + 1),
            Self::Geometric { start, stop, bins } => geomspace(*start, *stop, bins + 1),
            Self::LogStep { start, step, stop } => log_step(*start, *step, *stop),
            Self::Explicit(edges) => edges.clone(),
        }
    }

    /// Builds the edge coordinate for `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if fewer than 2 edges result or they are
    /// not strictly ascending.
    pub fn edges(&self, dim: &str, unit: Unit) -> Result<Coord> {
        let values = self.values();
        if values.len() < 2 {
            return Err(Error::range(dim, "a bin spec must produce at least 2 edges"));
        }
        if values.windows(2).any(|w| w[0] >= w[1] || w[0].is_nan()) {
            return Err(Error::range(dim, "bin edges must be strictly ascending"));
        }
        Ok(Coord::edges(dim, values, unit))
    }
}
