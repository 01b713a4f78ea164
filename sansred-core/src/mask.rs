//! Named boolean masks.

use crate::error::{Error, Result};
use crate::shape::{broadcast_labeled, check_dims, merge_dims, merge_shape};
use ndarray::{ArcArray, Array1, ArrayD, IxDyn, Slice, Zip};
use std::ops::Range;

/// A boolean array with named dimensions. `true` hides an element from
/// sums and means along the masked dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    dims: Vec<String>,
    values: ArcArray<bool, IxDyn>,
}

impl Mask {
    /// Creates a mask from labels and values.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the labels do not match the array rank.
    pub fn new<S: AsRef<str>>(dims: &[S], values: ArrayD<bool>) -> Result<Self> {
        let dims: Vec<String> = dims.iter().map(|d| d.as_ref().to_string()).collect();
        Self::from_parts(dims, values)
    }

    pub(crate) fn from_parts(dims: Vec<String>, values: ArrayD<bool>) -> Result<Self> {
        check_dims(&dims, values.shape())?;
        Ok(Self {
            dims,
            values: values.into_shared(),
        })
    }

    /// Creates a one-dimensional mask.
    #[must_use]
    pub fn vector(dim: &str, values: Vec<bool>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            values: Array1::from(values).into_dyn().into_shared(),
        }
    }

    /// Dimension labels.
    #[must_use]
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    /// Extent of every dimension.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Read access to the values.
    #[must_use]
    pub fn values(&self) -> &ArcArray<bool, IxDyn> {
        &self.values
    }

    /// Returns true if `dim` labels one of the axes.
    #[must_use]
    pub fn contains(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// Number of masked elements.
    #[must_use]
    pub fn count(&self) -> usize {
        self.values.iter().filter(|&&m| m).count()
    }

    /// Slices `dim` to `range`, sharing the buffer.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the range is out of bounds.
    pub fn slice(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        let Some(axis) = self.dims.iter().position(|d| d == dim) else {
            return Ok(self.clone());
        };
        let len = self.values.shape()[axis];
        if range.start > range.end || range.end > len {
            return Err(Error::range(dim, format!("slice {range:?} outside extent {len}")));
        }
        let mut values = self.values.clone();
        values.slice_axis_inplace(ndarray::Axis(axis), Slice::from(range));
        Ok(Self {
            dims: self.dims.clone(),
            values,
        })
    }

    /// Transposes/broadcasts the mask into the given labeled shape.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] on incompatible shapes.
    pub fn broadcast_to(&self, dims: &[String], shape: &[usize]) -> Result<ArrayD<bool>> {
        broadcast_labeled(&self.dims, self.values.view(), dims, shape)
    }

    /// Element-wise OR with named-dimension broadcasting.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if shared dimensions have different extents.
    pub fn or(&self, other: &Self) -> Result<Self> {
        let dims = merge_dims(&self.dims, &other.dims);
        let shape = merge_shape(
            &dims,
            (&self.dims, self.shape()),
            (&other.dims, other.shape()),
        )?;
        let lhs = self.broadcast_to(&dims, &shape)?;
        let rhs = other.broadcast_to(&dims, &shape)?;
        let values = Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| a || b);
        Self::from_parts(dims, values)
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_broadcasts() {
        let a = Mask::vector("x", vec![true, false]);
        let b = Mask::vector("y", vec![false, false, true]);
        let c = a.or(&b).unwrap();
        assert_eq!(c.dims(), &["x", "y"]);
        assert_eq!(c.count(), 4);
    }

    #[test]
    fn test_slice_ignores_unrelated_dim() {
        let a = Mask::vector("x", vec![true, false, true]);
        assert_eq!(a.slice("y", 0..1).unwrap(), a);
        assert_eq!(a.slice("x", 1..3).unwrap().count(), 1);
    }
}
