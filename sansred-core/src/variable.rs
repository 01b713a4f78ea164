//! Dimension-labeled, unit-carrying dense arrays.

use crate::error::{Error, Result};
use crate::shape::{broadcast_labeled, check_dims, merge_dims, merge_shape};
use crate::unit::Unit;
use ndarray::{ArcArray, Array1, ArrayD, ArrayViewD, Axis, IxDyn, Slice, Zip};
use std::ops::Range;

/// Shared, copy-on-write numeric buffer.
///
/// Cloning and slicing share storage; the first mutation through
/// [`Variable::values_mut`] copies the buffer if it is still shared.
pub type Buffer = ArcArray<f64, IxDyn>;

/// A dense `f64` array with named dimensions and a physical unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Vec<String>,
    values: Buffer,
    unit: Unit,
}

impl Variable {
    /// Creates a variable from labels, values and a unit.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the labels do not match the array rank
    /// or contain duplicates.
    pub fn new<S: AsRef<str>>(dims: &[S], values: ArrayD<f64>, unit: Unit) -> Result<Self> {
        let dims: Vec<String> = dims.iter().map(|d| d.as_ref().to_string()).collect();
        Self::from_parts(dims, values, unit)
    }

    pub(crate) fn from_parts(dims: Vec<String>, values: ArrayD<f64>, unit: Unit) -> Result<Self> {
        check_dims(&dims, values.shape())?;
        Ok(Self {
            dims,
            values: values.into_shared(),
            unit,
        })
    }

    /// Creates a one-dimensional variable.
    #[must_use]
    pub fn vector(dim: &str, values: Vec<f64>, unit: Unit) -> Self {
        Self {
            dims: vec![dim.to_string()],
            values: Array1::from(values).into_dyn().into_shared(),
            unit,
        }
    }

    /// Creates a zero-dimensional variable.
    #[must_use]
    pub fn scalar(value: f64, unit: Unit) -> Self {
        Self {
            dims: Vec::new(),
            values: ArrayD::from_elem(IxDyn(&[]), value).into_shared(),
            unit,
        }
    }

    /// Creates a variable filled with `value`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `dims` and `shape` disagree.
    pub fn full<S: AsRef<str>>(
        dims: &[S],
        shape: &[usize],
        value: f64,
        unit: Unit,
    ) -> Result<Self> {
        Self::new(dims, ArrayD::from_elem(IxDyn(shape), value), unit)
    }

    /// Dimension labels in storage order.
    #[must_use]
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    /// Extent of every dimension.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Physical unit.
    #[must_use]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Read access to the buffer.
    #[must_use]
    pub fn values(&self) -> &Buffer {
        &self.values
    }

    /// Write access to the buffer. Copies first if the buffer is shared.
    pub fn values_mut(&mut self) -> &mut Buffer {
        &mut self.values
    }

    /// Returns true if `dim` labels one of the axes.
    #[must_use]
    pub fn contains(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// Axis index of `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the dimension is absent.
    pub fn axis(&self, dim: &str) -> Result<Axis> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .map(Axis)
            .ok_or_else(|| {
                Error::shape(
                    dim,
                    format!("dimension not found in ({})", self.dims.join(", ")),
                )
            })
    }

    /// Extent of `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the dimension is absent.
    pub fn len_of(&self, dim: &str) -> Result<usize> {
        Ok(self.values.len_of(self.axis(dim)?))
    }

    /// Replaces the unit tag without touching the values.
    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Values in logical (row-major) order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Single element lookup.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Smallest non-NaN value.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f64::min)
    }

    /// Largest non-NaN value.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f64::max)
    }

    /// Slices `dim` to `range`, sharing the buffer with `self`.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the range is out of bounds.
    pub fn slice(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        let axis = self.axis(dim)?;
        let len = self.values.len_of(axis);
        if range.start > range.end || range.end > len {
            return Err(Error::range(
                dim,
                format!("slice {range:?} outside extent {len}"),
            ));
        }
        let mut values = self.values.clone();
        values.slice_axis_inplace(axis, Slice::from(range));
        Ok(Self {
            dims: self.dims.clone(),
            values,
            unit: self.unit,
        })
    }

    /// Transposes/broadcasts the values into the given labeled shape.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if a dimension is missing from the target or
    /// has a different extent there.
    pub fn broadcast_to(&self, dims: &[String], shape: &[usize]) -> Result<ArrayD<f64>> {
        broadcast_labeled(&self.dims, self.values.view(), dims, shape)
    }

    /// Reorders axes to `dims`, which must be a permutation of `self.dims()`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `dims` is not a permutation.
    pub fn transpose(&self, dims: &[String]) -> Result<Self> {
        if dims.len() != self.dims.len() {
            return Err(Error::shape(dims.join(","), "transpose needs a permutation"));
        }
        let shape = dims
            .iter()
            .map(|d| self.len_of(d))
            .collect::<Result<Vec<_>>>()?;
        let values = self.broadcast_to(dims, &shape)?;
        Self::from_parts(dims.to_vec(), values, self.unit)
    }

    /// Element-wise combination with named-dimension broadcasting.
    ///
    /// The result carries `self`'s dimensions followed by the extra
    /// dimensions of `other`, tagged with `unit`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if shared dimensions have different extents.
    pub fn zip_with<F>(&self, other: &Self, unit: Unit, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        let dims = merge_dims(&self.dims, &other.dims);
        let shape = merge_shape(
            &dims,
            (&self.dims, self.shape()),
            (&other.dims, other.shape()),
        )?;
        let lhs = self.broadcast_to(&dims, &shape)?;
        let rhs = other.broadcast_to(&dims, &shape)?;
        let values = Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| f(a, b));
        Self::from_parts(dims, values, unit)
    }

    /// Element-wise sum. Units must match.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`].
    pub fn add(&self, other: &Self) -> Result<Self> {
        let unit = self.unit.expect_same(other.unit, "add")?;
        self.zip_with(other, unit, |a, b| a + b)
    }

    /// Element-wise difference. Units must match.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`].
    pub fn sub(&self, other: &Self) -> Result<Self> {
        let unit = self.unit.expect_same(other.unit, "sub")?;
        self.zip_with(other, unit, |a, b| a - b)
    }

    /// Element-wise product, combining units.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`].
    pub fn mul(&self, other: &Self) -> Result<Self> {
        let unit = self.unit.mul(other.unit)?;
        self.zip_with(other, unit, |a, b| a * b)
    }

    /// Element-wise quotient, combining units. Follows IEEE semantics for
    /// zero denominators.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`].
    pub fn div(&self, other: &Self) -> Result<Self> {
        let unit = self.unit.div(other.unit)?;
        self.zip_with(other, unit, |a, b| a / b)
    }

    /// Applies `f` to every element, keeping dims and unit.
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Self {
            dims: self.dims.clone(),
            values: self.values.map(|&v| f(v)).into_shared(),
            unit: self.unit,
        }
    }

    /// Multiplies by a dimensionless factor.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    /// Sums over `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the dimension is absent.
    pub fn sum(&self, dim: &str) -> Result<Self> {
        let axis = self.axis(dim)?;
        let values = self.values.sum_axis(axis);
        Self::from_parts(self.dims_without(dim), values, self.unit)
    }

    /// Arithmetic mean over `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the dimension is empty.
    pub fn mean(&self, dim: &str) -> Result<Self> {
        let n = self.len_of(dim)?;
        if n == 0 {
            return Err(Error::range(dim, "mean over an empty dimension"));
        }
        #[allow(clippy::cast_precision_loss)]
        let n = n as f64;
        Ok(self.sum(dim)?.map(|v| v / n))
    }

    /// Concatenates `parts` along `dim`.
    ///
    /// If no part has `dim`, the parts are stacked along a new outer
    /// dimension.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] for mismatching parts or [`Error::Unit`]
    /// for mixed units.
    pub fn concat(dim: &str, parts: &[Self]) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| Error::shape(dim, "nothing to concatenate"))?;
        for part in parts {
            first.unit.expect_same(part.unit, "concat")?;
        }

        if parts.iter().all(|p| p.contains(dim)) {
            let aligned = parts
                .iter()
                .map(|p| p.transpose(&first.dims))
                .collect::<Result<Vec<_>>>()?;
            let views: Vec<ArrayViewD<'_, f64>> = aligned.iter().map(|p| p.values.view()).collect();
            let values = ndarray::concatenate(first.axis(dim)?, &views)
                .map_err(|e| Error::shape(dim, e.to_string()))?;
            Self::from_parts(first.dims.clone(), values, first.unit)
        } else if parts.iter().all(|p| !p.contains(dim)) {
            let aligned = parts
                .iter()
                .map(|p| p.transpose(&first.dims))
                .collect::<Result<Vec<_>>>()?;
            let views: Vec<ArrayViewD<'_, f64>> = aligned.iter().map(|p| p.values.view()).collect();
            let values =
                ndarray::stack(Axis(0), &views).map_err(|e| Error::shape(dim, e.to_string()))?;
            let mut dims = vec![dim.to_string()];
            dims.extend(first.dims.iter().cloned());
            Self::from_parts(dims, values, first.unit)
        } else {
            Err(Error::shape(dim, "only some parts contain the concat dimension"))
        }
    }

    /// Renames `from` to `to`. Missing `from` is a no-op.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `to` already labels another axis.
    pub fn rename_dim(mut self, from: &str, to: &str) -> Result<Self> {
        if let Some(pos) = self.dims.iter().position(|d| d == from) {
            if from != to && self.contains(to) {
                return Err(Error::shape(to, "rename target already exists"));
            }
            self.dims[pos] = to.to_string();
        }
        Ok(self)
    }

    /// Returns true if every lane along `dim` is non-decreasing.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the dimension is absent.
    pub fn is_sorted_along(&self, dim: &str) -> Result<bool> {
        let axis = self.axis(dim)?;
        Ok(self
            .values
            .lanes(axis)
            .into_iter()
            .all(|lane| lane.windows(2).into_iter().all(|w| w[0] <= w[1])))
    }

    fn dims_without(&self, dim: &str) -> Vec<String> {
        self.dims.iter().filter(|d| *d != dim).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn counts_2d() -> Variable {
        Variable::new(
            &["spectrum", "tof"],
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn(),
            Unit::Counts,
        )
        .unwrap()
    }

    #[test]
    fn test_named_broadcasting_multiply() {
        let data = counts_2d();
        let factor = Variable::vector("spectrum", vec![10.0, 100.0], Unit::Dimensionless);
        let out = data.mul(&factor).unwrap();
        assert_eq!(out.dims(), &["spectrum", "tof"]);
        assert_eq!(out.unit(), Unit::Counts);
        assert_eq!(out.to_vec(), vec![10.0, 20.0, 30.0, 400.0, 500.0, 600.0]);
    }

    #[test]
    fn test_broadcast_appends_new_dims() {
        let tof = Variable::vector("tof", vec![1.0, 2.0], Unit::Microseconds);
        let inv = Variable::vector("spectrum", vec![1.0, 0.5, 0.25], Unit::Dimensionless);
        let out = tof.mul(&inv).unwrap();
        assert_eq!(out.dims(), &["tof", "spectrum"]);
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.get(&[1, 2]), Some(0.5));
    }

    #[test]
    fn test_same_unit_division_is_dimensionless() {
        let data = counts_2d();
        let ratio = data.div(&data).unwrap();
        assert_eq!(ratio.unit(), Unit::Dimensionless);
        assert!(ratio.to_vec().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_add_requires_same_unit() {
        let data = counts_2d();
        let other = data.clone().with_unit(Unit::Angstrom);
        assert!(matches!(data.add(&other), Err(Error::Unit { .. })));
    }

    #[test]
    fn test_slice_shares_buffer_and_leaves_original() {
        let data = counts_2d();
        let mut part = data.slice("tof", 1..3).unwrap();
        assert_eq!(part.to_vec(), vec![2.0, 3.0, 5.0, 6.0]);

        part.values_mut()[[0, 0]] = -1.0;
        assert_eq!(part.get(&[0, 0]), Some(-1.0));
        assert_eq!(data.get(&[0, 1]), Some(2.0));
    }

    #[test]
    fn test_sum_and_mean() {
        let data = counts_2d();
        assert_eq!(data.sum("tof").unwrap().to_vec(), vec![6.0, 15.0]);
        let mean = data.mean("spectrum").unwrap();
        assert_relative_eq!(mean.get(&[1]).unwrap(), 3.5);
    }

    #[test]
    fn test_concat_existing_and_new_dim() {
        let a = Variable::vector("q", vec![1.0, 2.0], Unit::Counts);
        let b = Variable::vector("q", vec![3.0], Unit::Counts);
        let joined = Variable::concat("q", &[a.clone(), b]).unwrap();
        assert_eq!(joined.to_vec(), vec![1.0, 2.0, 3.0]);

        let stacked = Variable::concat("band", &[a.clone(), a]).unwrap();
        assert_eq!(stacked.dims(), &["band", "q"]);
        assert_eq!(stacked.shape(), &[2, 2]);
    }

    #[test]
    fn test_sorted_along() {
        let data = counts_2d();
        assert!(data.is_sorted_along("tof").unwrap());
        let rev = data.map(|v| -v);
        assert!(!rev.is_sorted_along("tof").unwrap());
    }
}
