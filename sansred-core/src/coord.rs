//! Coordinates: sample points or bin edges along one dimension.

use crate::error::{Error, Result};
use crate::unit::Unit;
use crate::variable::Variable;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a coordinate holds one value per element or the boundaries
/// between elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinKind {
    /// `N` representative points for `N` elements.
    Centers,
    /// `N + 1` boundaries for `N` elements. Bins are closed on the left and
    /// open on the right: `[edge[i], edge[i + 1])`.
    Edges,
}

/// A coordinate labeling dimension `dim`.
///
/// The kind is tracked explicitly: a length-2 coordinate on a
/// length-1 dimension is an edge pair, never inferred from the length.
/// The underlying variable may carry extra dimensions (for instance a
/// wavelength coordinate that differs per spectrum).
#[derive(Debug, Clone, PartialEq)]
pub struct Coord {
    dim: String,
    kind: BinKind,
    var: Variable,
}

impl Coord {
    /// Creates a coordinate for `dim` from a variable containing `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `var` has no `dim` axis.
    pub fn new(dim: &str, kind: BinKind, var: Variable) -> Result<Self> {
        var.axis(dim)?;
        Ok(Self {
            dim: dim.to_string(),
            kind,
            var,
        })
    }

    /// One-dimensional bin-edge coordinate.
    #[must_use]
    pub fn edges(dim: &str, values: Vec<f64>, unit: Unit) -> Self {
        Self {
            dim: dim.to_string(),
            kind: BinKind::Edges,
            var: Variable::vector(dim, values, unit),
        }
    }

    /// One-dimensional point coordinate.
    #[must_use]
    pub fn centers(dim: &str, values: Vec<f64>, unit: Unit) -> Self {
        Self {
            dim: dim.to_string(),
            kind: BinKind::Centers,
            var: Variable::vector(dim, values, unit),
        }
    }

    /// The dimension this coordinate labels.
    #[must_use]
    pub fn dim(&self) -> &str {
        &self.dim
    }

    /// Edge or center representation.
    #[must_use]
    pub fn kind(&self) -> BinKind {
        self.kind
    }

    /// Shorthand for `kind() == BinKind::Edges`.
    #[must_use]
    pub fn is_edges(&self) -> bool {
        self.kind == BinKind::Edges
    }

    /// Underlying values.
    #[must_use]
    pub fn var(&self) -> &Variable {
        &self.var
    }

    /// Consumes the coordinate, returning the values.
    #[must_use]
    pub fn into_var(self) -> Variable {
        self.var
    }

    /// Physical unit of the values.
    #[must_use]
    pub fn unit(&self) -> Unit {
        self.var.unit()
    }

    /// Number of values along [`Coord::dim`].
    #[must_use]
    pub fn extent(&self) -> usize {
        self.var.len_of(&self.dim).unwrap_or_default()
    }

    /// Number of data elements labeled along [`Coord::dim`].
    #[must_use]
    pub fn bins(&self) -> usize {
        match self.kind {
            BinKind::Centers => self.extent(),
            BinKind::Edges => self.extent().saturating_sub(1),
        }
    }

    /// Values of a one-dimensional coordinate.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the coordinate has extra dimensions.
    pub fn values_1d(&self) -> Result<Vec<f64>> {
        if self.var.ndim() != 1 {
            return Err(Error::shape(
                &self.dim,
                format!(
                    "expected a 1-D coordinate, got dims ({})",
                    self.var.dims().join(", ")
                ),
            ));
        }
        Ok(self.var.to_vec())
    }

    /// Returns true if every lane along [`Coord::dim`] is non-decreasing.
    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.var.is_sorted_along(&self.dim).unwrap_or(false)
    }

    /// Checks the ascending invariant required for interval search.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the coordinate is not ascending.
    pub fn expect_ascending(&self) -> Result<()> {
        if self.is_ascending() {
            Ok(())
        } else {
            Err(Error::range(&self.dim, "coordinate is not ascending"))
        }
    }

    /// Slices the coordinate to the bins in `range` along `dim`.
    ///
    /// Edge coordinates keep the closing edge of the last bin.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the range is out of bounds.
    pub fn slice(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        if !self.var.contains(dim) {
            return Ok(self.clone());
        }
        let range = if dim == self.dim && self.is_edges() {
            range.start..range.end + 1
        } else {
            range
        };
        Ok(Self {
            dim: self.dim.clone(),
            kind: self.kind,
            var: self.var.slice(dim, range)?,
        })
    }

    /// Renames dimension `from` to `to`, including [`Coord::dim`].
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `to` already labels another axis.
    pub fn rename_dim(self, from: &str, to: &str) -> Result<Self> {
        let dim = if self.dim == from {
            to.to_string()
        } else {
            self.dim
        };
        Ok(Self {
            dim,
            kind: self.kind,
            var: self.var.rename_dim(from, to)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_is_explicit() {
        let single_bin = Coord::edges("wavelength", vec![1.0, 2.0], Unit::Angstrom);
        assert_eq!(single_bin.bins(), 1);
        let two_points = Coord::centers("wavelength", vec![1.0, 2.0], Unit::Angstrom);
        assert_eq!(two_points.bins(), 2);
    }

    #[test]
    fn test_slice_keeps_closing_edge() {
        let edges = Coord::edges("tof", vec![0.0, 1.0, 2.0, 3.0, 4.0], Unit::Microseconds);
        let part = edges.slice("tof", 1..3).unwrap();
        assert_eq!(part.values_1d().unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ascending_check() {
        let edges = Coord::edges("tof", vec![0.0, 2.0, 1.0], Unit::Microseconds);
        assert!(matches!(edges.expect_ascending(), Err(Error::Range { .. })));
    }
}
