//! Named collections of labeled arrays with shared coordinates and masks.

use crate::array::LabeledArray;
use crate::coord::Coord;
use crate::error::{Error, Result};
use crate::mask::Mask;
use std::collections::BTreeMap;
use std::ops::Range;

/// A mapping from item name to [`LabeledArray`], plus coordinates and
/// masks shared by every item.
///
/// All items and shared coordinates agree on the extents of the
/// dimensions they share.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    items: BTreeMap<String, LabeledArray>,
    coords: BTreeMap<String, Coord>,
    masks: BTreeMap<String, Mask>,
}

impl Dataset {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Extent of every dimension used by items (shared coordinates
    /// contribute their bin counts).
    #[must_use]
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        let mut sizes = BTreeMap::new();
        for item in self.items.values() {
            for (dim, &n) in item.dims().iter().zip(item.shape()) {
                sizes.insert(dim.clone(), n);
            }
        }
        for coord in self.coords.values() {
            sizes.entry(coord.dim().to_string()).or_insert_with(|| coord.bins());
        }
        sizes
    }

    /// Inserts or replaces an item.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the item disagrees with the dataset on
    /// a shared dimension.
    pub fn insert(&mut self, name: &str, item: LabeledArray) -> Result<()> {
        let mut others = self.clone();
        others.items.remove(name);
        let sizes = others.sizes();
        for (dim, &n) in item.dims().iter().zip(item.shape()) {
            if let Some(&expected) = sizes.get(dim) {
                if expected != n {
                    return Err(Error::shape(
                        dim,
                        format!("item '{name}' has extent {n}, dataset has {expected}"),
                    ));
                }
            }
        }
        self.items.insert(name.to_string(), item);
        Ok(())
    }

    /// Inserts or replaces a shared coordinate.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the coordinate does not fit the items.
    pub fn set_coord(&mut self, name: &str, coord: Coord) -> Result<()> {
        for item in self.items.values() {
            if coord.var().dims().iter().all(|d| item.dims().contains(d)) {
                item.clone().with_coord(name, coord.clone())?;
            }
        }
        self.coords.insert(name.to_string(), coord);
        Ok(())
    }

    /// Inserts or replaces a shared mask.
    ///
    /// # Errors
    /// Returns [`Error::Shape`] if the mask does not fit the items.
    pub fn set_mask(&mut self, name: &str, mask: Mask) -> Result<()> {
        let sizes = self.sizes();
        for (dim, &n) in mask.dims().iter().zip(mask.shape()) {
            match sizes.get(dim) {
                Some(&expected) if expected != n => {
                    return Err(Error::shape(
                        dim,
                        format!("mask '{name}' has extent {n}, dataset has {expected}"),
                    ));
                }
                _ => {}
            }
        }
        self.masks.insert(name.to_string(), mask);
        Ok(())
    }

    /// Shared coordinates.
    #[must_use]
    pub fn coords(&self) -> &BTreeMap<String, Coord> {
        &self.coords
    }

    /// Shared masks.
    #[must_use]
    pub fn masks(&self) -> &BTreeMap<String, Mask> {
        &self.masks
    }

    /// Item `name` with the applicable shared coordinates and masks attached.
    ///
    /// # Errors
    /// Returns [`Error::MissingChannel`] if there is no such item.
    pub fn get(&self, name: &str) -> Result<LabeledArray> {
        let item = self
            .items
            .get(name)
            .ok_or_else(|| Error::MissingChannel(format!("dataset has no item '{name}'")))?;
        let mut item = item.clone();
        for (cname, coord) in &self.coords {
            if coord.var().dims().iter().all(|d| item.dims().contains(d)) {
                item.set_coord(cname, coord.clone())?;
            }
        }
        for (mname, mask) in &self.masks {
            if mask.dims().iter().all(|d| item.dims().contains(d)) {
                let merged = match item.masks().get(mname) {
                    Some(existing) => existing.or(mask)?,
                    None => mask.clone(),
                };
                item.set_mask(mname, merged)?;
            }
        }
        Ok(item)
    }

    /// Applies `f` to every item (shared coordinates and masks attached)
    /// and collects the results into a new dataset.
    ///
    /// # Errors
    /// Propagates the first error returned by `f`.
    pub fn try_map<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(LabeledArray) -> Result<LabeledArray>,
    {
        let mut out = Self::new();
        for name in self.items.keys() {
            out.insert(name, f(self.get(name)?)?)?;
        }
        Ok(out)
    }

    /// Slices every item along `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the range is out of bounds.
    pub fn slice(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        self.try_map(|item| {
            if item.dims().iter().any(|d| d == dim) {
                item.slice(dim, range.clone())
            } else {
                Ok(item)
            }
        })
    }
}
