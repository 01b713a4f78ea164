//! The labeled array: data, coordinates and masks.

use crate::bins::{centers_from_edges, edges_from_centers};
use crate::coord::{BinKind, Coord};
use crate::error::{Error, Result};
use crate::mask::Mask;
use crate::shape::{flatten_labeled, fold_labeled, merge_dims};
use crate::unit::Unit;
use crate::variable::Variable;
use ndarray::{ArrayD, Zip};
use std::collections::BTreeMap;
use std::ops::Range;

/// An n-dimensional array with named axes, a unit, coordinates and masks.
///
/// Coordinates are keyed by name; a coordinate named after a dimension is
/// the dimension coordinate used by rebinning, slicing and histogramming.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    data: Variable,
    coords: BTreeMap<String, Coord>,
    masks: BTreeMap<String, Mask>,
}

impl LabeledArray {
    /// Wraps a variable without coordinates or masks.
    #[must_use]
    pub fn new(data: Variable) -> Self {
        Self {
            data,
            coords: BTreeMap::new(),
            masks: BTreeMap::new(),
        }
    }

    /// Assembles and validates an array from its parts.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if a coordinate or mask does not fit the data.
    pub fn from_parts(
        data: Variable,
        coords: BTreeMap<String, Coord>,
        masks: BTreeMap<String, Mask>,
    ) -> Result<Self> {
        let array = Self::new(data);
        for (name, coord) in &coords {
            array.check_coord(name, coord)?;
        }
        for (name, mask) in &masks {
            array.check_mask(name, mask)?;
        }
        Ok(Self {
            coords,
            masks,
            ..array
        })
    }

    /// Builder-style [`LabeledArray::set_coord`].
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the coordinate does not fit the data.
    pub fn with_coord(mut self, name: &str, coord: Coord) -> Result<Self> {
        self.set_coord(name, coord)?;
        Ok(self)
    }

    /// Builder-style [`LabeledArray::set_mask`].
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the mask does not fit the data.
    pub fn with_mask(mut self, name: &str, mask: Mask) -> Result<Self> {
        self.set_mask(name, mask)?;
        Ok(self)
    }

    /// Inserts or replaces a coordinate.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the coordinate does not fit the data.
    pub fn set_coord(&mut self, name: &str, coord: Coord) -> Result<()> {
        self.check_coord(name, &coord)?;
        self.coords.insert(name.to_string(), coord);
        Ok(())
    }

    /// Inserts or replaces a mask.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the mask does not fit the data.
    pub fn set_mask(&mut self, name: &str, mask: Mask) -> Result<()> {
        self.check_mask(name, &mask)?;
        self.masks.insert(name.to_string(), mask);
        Ok(())
    }

    /// Removes a coordinate.
    pub fn remove_coord(&mut self, name: &str) -> Option<Coord> {
        self.coords.remove(name)
    }

    /// Removes a mask.
    pub fn remove_mask(&mut self, name: &str) -> Option<Mask> {
        self.masks.remove(name)
    }

    /// The data variable.
    #[must_use]
    pub fn data(&self) -> &Variable {
        &self.data
    }

    /// Consumes the array, returning the data variable.
    #[must_use]
    pub fn into_data(self) -> Variable {
        self.data
    }

    /// Replaces the data, keeping coordinates and masks.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the coordinates no longer fit.
    pub fn with_data(self, data: Variable) -> Result<Self> {
        Self::from_parts(data, self.coords, self.masks)
    }

    /// Unit of the data.
    #[must_use]
    pub fn unit(&self) -> Unit {
        self.data.unit()
    }

    /// Dimension labels of the data.
    #[must_use]
    pub fn dims(&self) -> &[String] {
        self.data.dims()
    }

    /// Extents of the data.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Extent of `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the dimension is absent.
    pub fn len_of(&self, dim: &str) -> Result<usize> {
        self.data.len_of(dim)
    }

    /// All coordinates.
    #[must_use]
    pub fn coords(&self) -> &BTreeMap<String, Coord> {
        &self.coords
    }

    /// Coordinate `name`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if there is no such coordinate.
    pub fn coord(&self, name: &str) -> Result<&Coord> {
        self.coords
            .get(name)
            .ok_or_else(|| Error::shape(name, "no coordinate with this name"))
    }

    /// All masks.
    #[must_use]
    pub fn masks(&self) -> &BTreeMap<String, Mask> {
        &self.masks
    }

    /// Slices `dim` to `range`. Buffers are shared with `self`.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the range is out of bounds.
    pub fn slice(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        let data = self.data.slice(dim, range.clone())?;
        let coords = self
            .coords
            .iter()
            .map(|(name, c)| Ok((name.clone(), c.slice(dim, range.clone())?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let masks = self
            .masks
            .iter()
            .map(|(name, m)| Ok((name.clone(), m.slice(dim, range.clone())?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self {
            data,
            coords,
            masks,
        })
    }

    /// Element-wise sum with another array.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`] (including mismatching
    /// shared coordinates).
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.binary(other, Variable::add)
    }

    /// Element-wise difference with another array.
    ///
    /// # Errors
    /// Same as [`LabeledArray::add`].
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.binary(other, Variable::sub)
    }

    /// Element-wise product with another array.
    ///
    /// # Errors
    /// Same as [`LabeledArray::add`].
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.binary(other, Variable::mul)
    }

    /// Element-wise quotient with another array.
    ///
    /// # Errors
    /// Same as [`LabeledArray::add`].
    pub fn div(&self, other: &Self) -> Result<Self> {
        self.binary(other, Variable::div)
    }

    /// Multiplies the data by a coordinate-free variable.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`].
    pub fn mul_var(&self, other: &Variable) -> Result<Self> {
        self.binary(&Self::new(other.clone()), Variable::mul)
    }

    /// Divides the data by a coordinate-free variable.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`].
    pub fn div_var(&self, other: &Variable) -> Result<Self> {
        self.binary(&Self::new(other.clone()), Variable::div)
    }

    /// Subtracts a coordinate-free variable from the data.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] or [`Error::Shape`].
    pub fn sub_var(&self, other: &Variable) -> Result<Self> {
        self.binary(&Self::new(other.clone()), Variable::sub)
    }

    /// Multiplies the data by a dimensionless factor.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            data: self.data.scale(factor),
            ..self.clone()
        }
    }

    /// OR of every mask that depends on `dim`, broadcast to the data shape.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if a mask cannot be broadcast.
    pub fn combined_mask(&self, dim: &str) -> Result<Option<ArrayD<bool>>> {
        let mut combined: Option<Mask> = None;
        for mask in self.masks.values().filter(|m| m.contains(dim)) {
            combined = Some(match combined {
                Some(acc) => acc.or(mask)?,
                None => mask.clone(),
            });
        }
        combined
            .map(|m| m.broadcast_to(self.dims(), self.shape()))
            .transpose()
    }

    /// Data with elements hidden by masks along `dim` set to zero.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if a mask cannot be broadcast.
    pub fn zero_masked(&self, dim: &str) -> Result<Variable> {
        let Some(mask) = self.combined_mask(dim)? else {
            return Ok(self.data.clone());
        };
        let values = Zip::from(self.data.values())
            .and(&mask)
            .map_collect(|&v, &m| if m { 0.0 } else { v });
        Variable::from_parts(self.dims().to_vec(), values, self.unit())
    }

    /// Sums over `dim`, ignoring masked elements.
    ///
    /// Coordinates and masks depending on `dim` are dropped.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the dimension is absent.
    pub fn sum(&self, dim: &str) -> Result<Self> {
        let data = self.zero_masked(dim)?.sum(dim)?;
        Ok(self.reduced(dim, data))
    }

    /// Mean over `dim`, ignoring masked elements.
    ///
    /// Lanes without any unmasked element yield NaN.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the dimension is absent.
    pub fn mean(&self, dim: &str) -> Result<Self> {
        let sum = self.zero_masked(dim)?.sum(dim)?;
        let weights = match self.combined_mask(dim)? {
            Some(mask) => mask.map(|&m| if m { 0.0 } else { 1.0 }),
            None => ArrayD::from_elem(ndarray::IxDyn(self.shape()), 1.0),
        };
        let counts = Variable::from_parts(self.dims().to_vec(), weights, Unit::Dimensionless)?
            .sum(dim)?;
        let data = sum.zip_with(&counts, sum.unit(), |s, n| {
            if n > 0.0 {
                s / n
            } else {
                f64::NAN
            }
        })?;
        Ok(self.reduced(dim, data))
    }

    /// Renames dimension `from` to `to` in data, coordinates and masks.
    ///
    /// Coordinate names are left untouched.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `to` is already in use.
    pub fn rename_dim(self, from: &str, to: &str) -> Result<Self> {
        let data = self.data.rename_dim(from, to)?;
        let coords = self
            .coords
            .into_iter()
            .map(|(name, c)| Ok((name, c.rename_dim(from, to)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let masks = self
            .masks
            .into_iter()
            .map(|(name, m)| Ok((name, m.rename_dim(from, to)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Self::from_parts(data, coords, masks)
    }

    /// Replaces the bin-edge coordinate of `dim` by its bin centers.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `dim` has no edge coordinate.
    pub fn to_bin_centers(mut self, dim: &str) -> Result<Self> {
        let centers = centers_from_edges(self.coord(dim)?)?;
        self.set_coord(dim, centers)?;
        Ok(self)
    }

    /// Replaces the point coordinate of `dim` by extrapolated bin edges.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if `dim` has no center coordinate.
    pub fn to_bin_edges(mut self, dim: &str) -> Result<Self> {
        let edges = edges_from_centers(self.coord(dim)?)?;
        self.set_coord(dim, edges)?;
        Ok(self)
    }

    /// Concatenates arrays along `dim` (existing or new outer dimension).
    ///
    /// Coordinates not depending on `dim` are kept when identical in every
    /// part; coordinates along `dim` are dropped and must be installed by
    /// the caller. Masks must be identical and independent of `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] or [`Error::Unit`] for mismatching parts.
    pub fn concat(dim: &str, parts: &[Self]) -> Result<Self> {
        let first = parts
            .first()
            .ok_or_else(|| Error::shape(dim, "nothing to concatenate"))?;
        let datas: Vec<Variable> = parts.iter().map(|p| p.data.clone()).collect();
        let data = Variable::concat(dim, &datas)?;

        let coords = first
            .coords
            .iter()
            .filter(|(name, c)| {
                !c.var().contains(dim) && parts.iter().all(|p| p.coords.get(*name) == Some(*c))
            })
            .map(|(name, c)| (name.clone(), c.clone()))
            .collect();

        for part in parts {
            if part.masks != first.masks || part.masks.values().any(|m| m.contains(dim)) {
                return Err(Error::shape(dim, "cannot concatenate arrays with differing masks"));
            }
        }
        Self::from_parts(data, coords, first.masks.clone())
    }

    /// Merges dimensions `merge` (row-major, in that order) into `new_dim`,
    /// placed last. Coordinates on merged dimensions are dropped.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if a merged dimension is absent.
    pub fn flatten(&self, merge: &[&str], new_dim: &str) -> Result<Self> {
        let merge: Vec<String> = merge.iter().map(ToString::to_string).collect();
        let (dims, values) =
            flatten_labeled(self.dims(), self.data.values().view(), &merge, new_dim)?;
        let data = Variable::from_parts(dims, values, self.unit())?;

        let coords = self
            .coords
            .iter()
            .filter(|(_, c)| !merge.iter().any(|d| c.var().contains(d)))
            .map(|(name, c)| (name.clone(), c.clone()))
            .collect();

        let mut masks = BTreeMap::new();
        for (name, mask) in &self.masks {
            if merge.iter().any(|d| mask.contains(d)) {
                let mask_dims = merge_dims(mask.dims(), &merge);
                let shape = mask_dims
                    .iter()
                    .map(|d| self.len_of(d))
                    .collect::<Result<Vec<_>>>()?;
                let full = mask.broadcast_to(&mask_dims, &shape)?;
                let (dims, values) = flatten_labeled(&mask_dims, full.view(), &merge, new_dim)?;
                masks.insert(name.clone(), Mask::from_parts(dims, values)?);
            } else {
                masks.insert(name.clone(), mask.clone());
            }
        }
        Self::from_parts(data, coords, masks)
    }

    /// Splits `dim` into row-major `parts`, in place of `dim`.
    /// Coordinates on `dim` are dropped.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the extents do not multiply to the
    /// extent of `dim`.
    pub fn fold(&self, dim: &str, parts: &[(&str, usize)]) -> Result<Self> {
        let parts: Vec<(String, usize)> =
            parts.iter().map(|(d, n)| ((*d).to_string(), *n)).collect();
        let (dims, values) = fold_labeled(self.dims(), self.data.values().to_owned(), dim, &parts)?;
        let data = Variable::from_parts(dims, values, self.unit())?;

        let coords = self
            .coords
            .iter()
            .filter(|(_, c)| !c.var().contains(dim))
            .map(|(name, c)| (name.clone(), c.clone()))
            .collect();
        let masks = self
            .masks
            .iter()
            .map(|(name, m)| {
                if m.contains(dim) {
                    let (dims, values) =
                        fold_labeled(m.dims(), m.values().to_owned(), dim, &parts)?;
                    Ok((name.clone(), Mask::from_parts(dims, values)?))
                } else {
                    Ok((name.clone(), m.clone()))
                }
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Self::from_parts(data, coords, masks)
    }

    fn reduced(&self, dim: &str, data: Variable) -> Self {
        Self {
            data,
            coords: self
                .coords
                .iter()
                .filter(|(_, c)| !c.var().contains(dim))
                .map(|(name, c)| (name.clone(), c.clone()))
                .collect(),
            masks: self
                .masks
                .iter()
                .filter(|(_, m)| !m.contains(dim))
                .map(|(name, m)| (name.clone(), m.clone()))
                .collect(),
        }
    }

    fn binary<F>(&self, other: &Self, op: F) -> Result<Self>
    where
        F: Fn(&Variable, &Variable) -> Result<Variable>,
    {
        let data = op(&self.data, &other.data)?;
        let mut coords = self.coords.clone();
        for (name, coord) in &other.coords {
            match coords.get(name) {
                Some(existing) if existing != coord => {
                    return Err(Error::shape(name, "coordinates of operands differ"));
                }
                Some(_) => {}
                None => {
                    coords.insert(name.clone(), coord.clone());
                }
            }
        }
        let mut masks = self.masks.clone();
        for (name, mask) in &other.masks {
            let merged = match masks.get(name) {
                Some(existing) => existing.or(mask)?,
                None => mask.clone(),
            };
            masks.insert(name.clone(), merged);
        }
        Self::from_parts(data, coords, masks)
    }

    fn check_coord(&self, name: &str, coord: &Coord) -> Result<()> {
        if !self.data.contains(coord.dim()) {
            return Err(Error::shape(
                coord.dim(),
                format!("coordinate '{name}' labels a dimension the data does not have"),
            ));
        }
        for (dim, &extent) in coord.var().dims().iter().zip(coord.var().shape()) {
            let bins = self.data.len_of(dim)?;
            let expected = if dim == coord.dim() && coord.kind() == BinKind::Edges {
                bins + 1
            } else {
                bins
            };
            if extent != expected {
                return Err(Error::shape(
                    dim,
                    format!("coordinate '{name}' has extent {extent}, expected {expected}"),
                ));
            }
        }
        Ok(())
    }

    fn check_mask(&self, name: &str, mask: &Mask) -> Result<()> {
        for (dim, &extent) in mask.dims().iter().zip(mask.shape()) {
            let expected = self.data.len_of(dim)?;
            if extent != expected {
                return Err(Error::shape(
                    dim,
                    format!("mask '{name}' has extent {extent}, expected {expected}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use ndarray::array;

    fn spectra() -> LabeledArray {
        let data = Variable::new(
            &["spectrum", "tof"],
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn(),
            Unit::Counts,
        )
        .unwrap();
        LabeledArray::new(data)
            .with_coord(
                "tof",
                Coord::edges("tof", vec![0.0, 10.0, 20.0, 30.0], Unit::Microseconds),
            )
            .unwrap()
    }

    #[test]
    fn test_edge_coordinate_length_is_validated() {
        let bad = Coord::edges("tof", vec![0.0, 10.0, 20.0], Unit::Microseconds);
        let err = spectra().with_coord("tof", bad);
        assert!(matches!(err, Err(Error::Shape { .. })));

        let centers = Coord::centers("tof", vec![5.0, 15.0, 25.0], Unit::Microseconds);
        assert!(spectra().with_coord("tof", centers).is_ok());
    }

    #[test]
    fn test_slice_does_not_touch_original() {
        let array = spectra();
        let part = array.slice("tof", 1..2).unwrap();
        assert_eq!(part.data().to_vec(), vec![2.0, 5.0]);
        assert_eq!(part.coord("tof").unwrap().values_1d().unwrap(), vec![10.0, 20.0]);
        assert_eq!(array.shape(), &[2, 3]);
    }

    #[test]
    fn test_sum_ignores_masked_elements() {
        let array = spectra()
            .with_mask("dead", Mask::vector("spectrum", vec![false, true]))
            .unwrap();
        let summed = array.sum("spectrum").unwrap();
        assert_eq!(summed.data().to_vec(), vec![1.0, 2.0, 3.0]);
        assert!(summed.masks().is_empty());
        assert!(summed.coord("tof").is_ok());

        let per_spectrum = array.sum("tof").unwrap();
        assert_eq!(per_spectrum.data().to_vec(), vec![6.0, 15.0]);
        assert_eq!(per_spectrum.masks().len(), 1);
    }

    #[test]
    fn test_mean_ignores_masked_elements() {
        let array = spectra()
            .with_mask("edge", Mask::vector("tof", vec![true, false, false]))
            .unwrap();
        let mean = array.mean("tof").unwrap();
        assert_eq!(mean.data().to_vec(), vec![2.5, 5.5]);
    }

    #[test]
    fn test_binary_checks_coordinates() {
        let a = spectra();
        let shifted = spectra()
            .with_coord(
                "tof",
                Coord::edges("tof", vec![1.0, 11.0, 21.0, 31.0], Unit::Microseconds),
            )
            .unwrap();
        assert!(matches!(a.add(&shifted), Err(Error::Shape { .. })));
        let ratio = a.div(&a).unwrap();
        assert_eq!(ratio.unit(), Unit::Dimensionless);
    }

    #[test]
    fn test_bin_centers_replace_edges() {
        let centers = spectra().to_bin_centers("tof").unwrap();
        let coord = centers.coord("tof").unwrap();
        assert_eq!(coord.kind(), BinKind::Centers);
        assert_eq!(coord.values_1d().unwrap(), vec![5.0, 15.0, 25.0]);
    }

    #[test]
    fn test_rename_dim() {
        let renamed = spectra().rename_dim("tof", "wavelength").unwrap();
        assert_eq!(renamed.dims(), &["spectrum", "wavelength"]);
        assert_eq!(renamed.coord("tof").unwrap().dim(), "wavelength");
    }
}
