//! Spatial regrouping: group keys, grouped sums, grid coarsening and the
//! logical tube/straw/pixel layout of straw-tube detectors.

use ndarray::{ArrayD, Axis, IxDyn};
use sansred_core::{linspace, Coord, Error, LabeledArray, Mask, Result, Unit, Variable};
use std::collections::BTreeMap;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Output bucket of every index along one dimension.
///
/// Keys are non-negative and contiguous from 0, so group `g` is always
/// output index `g`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupingKey {
    dim: String,
    keys: Vec<usize>,
    groups: usize,
}

impl GroupingKey {
    /// Validates `keys` as a grouping of dimension `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if `keys` is empty, holds a negative value,
    /// or skips a group id.
    pub fn new(dim: &str, keys: &[i64]) -> Result<Self> {
        if let Some(k) = keys.iter().find(|&&k| k < 0) {
            return Err(Error::range(dim, format!("negative group id {k}")));
        }
        let keys: Vec<usize> = keys
            .iter()
            .map(|&k| {
                usize::try_from(k)
                    .map_err(|_| Error::range(dim, format!("group id {k} out of range")))
            })
            .collect::<Result<_>>()?;
        let groups = keys
            .iter()
            .max()
            .map(|m| m + 1)
            .ok_or_else(|| Error::range(dim, "grouping key is empty"))?;
        let mut seen = vec![false; groups];
        for &k in &keys {
            seen[k] = true;
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(Error::range(
                dim,
                format!("group ids are not contiguous, {missing} is unused"),
            ));
        }
        Ok(Self {
            dim: dim.to_string(),
            keys,
            groups,
        })
    }

    /// The grouped dimension.
    #[must_use]
    pub fn dim(&self) -> &str {
        &self.dim
    }

    /// Group id per input index.
    #[must_use]
    pub fn keys(&self) -> &[usize] {
        &self.keys
    }

    /// Number of groups.
    #[must_use]
    pub fn groups(&self) -> usize {
        self.groups
    }

    /// Number of inputs in each group.
    #[must_use]
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.groups];
        for &k in &self.keys {
            counts[k] += 1;
        }
        counts
    }
}

/// Sums `array` over `key.dim()` per group, replacing it by `out_dim`.
///
/// Elements hidden by masks along the grouped dimension are left out of
/// the sums; such masks are OR-reduced per group. Coordinates along the
/// grouped dimension are dropped and `out_dim` receives the group ids as
/// a dimensionless point coordinate.
///
/// # Errors
/// Returns [`Error::Shape`] if the key length differs from the extent of
/// the grouped dimension or `out_dim` is already in use.
pub fn group_sum(array: &LabeledArray, key: &GroupingKey, out_dim: &str) -> Result<LabeledArray> {
    let dim = key.dim();
    let n = array.len_of(dim)?;
    if n != key.keys.len() {
        return Err(Error::shape(
            dim,
            format!("grouping key has {} entries for extent {n}", key.keys.len()),
        ));
    }
    let axis = array.data().axis(dim)?;
    let data = array.zero_masked(dim)?;
    let summed = group_along(data.values(), axis, &key.keys, key.groups, 0.0, |acc, v| *acc += v);
    let dims = replace_dim(array.dims(), dim, out_dim);
    let data = Variable::new(&dims, summed, array.unit())?;

    let mut coords: BTreeMap<String, Coord> = array
        .coords()
        .iter()
        .filter(|(_, c)| !c.var().contains(dim))
        .map(|(name, c)| (name.clone(), c.clone()))
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let ids = (0..key.groups).map(|g| g as f64).collect();
    coords.insert(out_dim.to_string(), Coord::centers(out_dim, ids, Unit::Dimensionless));

    let mut masks = BTreeMap::new();
    for (name, mask) in array.masks() {
        if mask.contains(dim) {
            let axis = Axis(mask.dims().iter().position(|d| d == dim).unwrap_or_default());
            let grouped = group_along(mask.values(), axis, &key.keys, key.groups, false, |acc, m| {
                *acc |= m;
            });
            let dims = replace_dim(mask.dims(), dim, out_dim);
            masks.insert(name.clone(), Mask::new(&dims, grouped)?);
        } else {
            masks.insert(name.clone(), mask.clone());
        }
    }
    log::debug!("group_sum over {dim}: {n} -> {} groups", key.groups);
    LabeledArray::from_parts(data, coords, masks)
}

fn replace_dim(dims: &[String], from: &str, to: &str) -> Vec<String> {
    dims.iter()
        .map(|d| if d == from { to.to_string() } else { d.clone() })
        .collect()
}

fn group_along<T, S>(
    values: &ndarray::ArrayBase<S, IxDyn>,
    axis: Axis,
    keys: &[usize],
    groups: usize,
    zero: T,
    combine: impl Fn(&mut T, T),
) -> ArrayD<T>
where
    T: Clone + Copy,
    S: ndarray::Data<Elem = T>,
{
    let mut shape = values.shape().to_vec();
    shape[axis.index()] = groups;
    let mut out = ArrayD::from_elem(IxDyn(&shape), zero);
    for (i, &k) in keys.iter().enumerate() {
        let src = values.index_axis(axis, i);
        let mut dst = out.index_axis_mut(axis, k);
        ndarray::Zip::from(&mut dst).and(&src).for_each(|acc, &v| combine(acc, v));
    }
    out
}

/// Coarsens the 2-D grid spanned by `x` and `y` to `nx` by `ny` cells.
///
/// Index `i` along `x` falls into bucket `min(i / (extent / nx), nx - 1)`,
/// so the last bucket absorbs any remainder; likewise for `y`. Cells are
/// summed per bucket with masks OR-ed. The result has the remaining
/// dimensions followed by `y`, `x`, each with `n + 1` linearly spaced
/// edges spanning the original coordinate's range (pixel indices if the
/// dimension had no coordinate).
///
/// # Errors
/// Returns [`Error::Range`] if a target size is 0 or exceeds the extent,
/// [`Error::Shape`] if a dimension is absent.
pub fn coarsen(
    array: &LabeledArray,
    x: &str,
    y: &str,
    nx: usize,
    ny: usize,
) -> Result<LabeledArray> {
    let (ex, ey) = (array.len_of(x)?, array.len_of(y)?);
    let bucket_x = buckets(x, ex, nx)?;
    let bucket_y = buckets(y, ey, ny)?;
    let edges_x = span_edges(array, x, ex, nx)?;
    let edges_y = span_edges(array, y, ey, ny)?;

    let grid = format!("{y}_{x}");
    let flat = array.flatten(&[y, x], &grid)?;
    let keys: Vec<i64> = bucket_y
        .iter()
        .flat_map(|&by| bucket_x.iter().map(move |&bx| bx + nx * by))
        .map(|k| i64::try_from(k).unwrap_or(i64::MAX))
        .collect();
    let key = GroupingKey::new(&grid, &keys)?;
    group_sum(&flat, &key, &grid)?
        .fold(&grid, &[(y, ny), (x, nx)])?
        .with_coord(x, edges_x)?
        .with_coord(y, edges_y)
}

fn buckets(dim: &str, extent: usize, target: usize) -> Result<Vec<usize>> {
    if target == 0 || target > extent {
        return Err(Error::range(dim, format!("cannot coarsen extent {extent} to {target} cells")));
    }
    let width = extent / target;
    Ok((0..extent).map(|i| (i / width).min(target - 1)).collect())
}

#[allow(clippy::cast_precision_loss)]
fn span_edges(array: &LabeledArray, dim: &str, extent: usize, target: usize) -> Result<Coord> {
    let (lo, hi, unit) = match array.coords().get(dim) {
        Some(coord) => {
            let var = coord.var();
            let lo = var.min().ok_or_else(|| Error::shape(dim, "empty coordinate"))?;
            let hi = var.max().ok_or_else(|| Error::shape(dim, "empty coordinate"))?;
            (lo, hi, coord.unit())
        }
        None => (0.0, extent as f64, Unit::Dimensionless),
    };
    Ok(Coord::edges(dim, linspace(lo, hi, target + 1), unit))
}

/// Logical layout of a straw-tube detector with a flat `spectrum` index.
///
/// Spectra are ordered tube-major: `(tube * straws + straw) * pixels + pixel`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerLayout {
    /// Number of tubes.
    pub tubes: usize,
    /// Straws per tube.
    pub straws: usize,
    /// Pixels per straw.
    pub pixels: usize,
    /// Tubes repeat their layer every `tube_layers` tubes.
    pub tube_layers: usize,
    /// Layer of every straw position within a tube.
    pub straw_layers: Vec<usize>,
}

impl Default for LayerLayout {
    fn default() -> Self {
        Self::loki()
    }
}

impl LayerLayout {
    /// LoKI detector bank: 32 tubes of 7 straws with 512 pixels each.
    #[must_use]
    pub fn loki() -> Self {
        Self {
            tubes: 32,
            straws: 7,
            pixels: 512,
            tube_layers: 4,
            straw_layers: vec![0, 0, 1, 1, 0, 1, 2],
        }
    }

    /// Sets the tube count.
    #[must_use]
    pub fn with_tubes(mut self, tubes: usize) -> Self {
        self.tubes = tubes;
        self
    }

    /// Sets the number of straws per tube and their layer mapping.
    #[must_use]
    pub fn with_straws(mut self, straw_layers: Vec<usize>) -> Self {
        self.straws = straw_layers.len();
        self.straw_layers = straw_layers;
        self
    }

    /// Sets the pixel count per straw.
    #[must_use]
    pub fn with_pixels(mut self, pixels: usize) -> Self {
        self.pixels = pixels;
        self
    }

    /// Total number of spectra.
    #[must_use]
    pub fn spectra(&self) -> usize {
        self.tubes * self.straws * self.pixels
    }

    /// Distinct straw layers.
    #[must_use]
    pub fn n_straw_layers(&self) -> usize {
        self.straw_layers.iter().max().map_or(0, |m| m + 1)
    }

    /// Distinct composite layers.
    #[must_use]
    pub fn layers(&self) -> usize {
        self.tube_layers * self.n_straw_layers()
    }

    /// Checks the layout is consistent.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for a zero extent or a straw map whose
    /// length differs from the straw count.
    pub fn validate(&self) -> Result<()> {
        if self.tubes == 0 || self.straws == 0 || self.pixels == 0 || self.tube_layers == 0 {
            return Err(Error::Config("detector layout extents must be positive".into()));
        }
        if self.straw_layers.len() != self.straws {
            return Err(Error::Config(format!(
                "straw layer map has {} entries for {} straws",
                self.straw_layers.len(),
                self.straws
            )));
        }
        Ok(())
    }

    /// Composite layer id of one pixel. The pixel layer is always 0.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if `tube` or `straw` does not exist.
    pub fn layer_of(&self, tube: usize, straw: usize) -> Result<usize> {
        self.check_tube(tube)?;
        self.check_straw(straw)?;
        Ok((tube % self.tube_layers) * self.n_straw_layers() + self.straw_layers[straw])
    }

    /// Layer id for every spectrum, as a key over `dim`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an inconsistent layout.
    pub fn layer_key(&self, dim: &str) -> Result<GroupingKey> {
        self.validate()?;
        let mut keys = Vec::with_capacity(self.spectra());
        for tube in 0..self.tubes {
            for straw in 0..self.straws {
                let layer = i64::try_from(self.layer_of(tube, straw)?)
                    .map_err(|_| Error::Config("layer id overflow".into()))?;
                keys.extend(std::iter::repeat(layer).take(self.pixels));
            }
        }
        GroupingKey::new(dim, &keys)
    }

    /// Spectrum indices of one tube.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if `tube` does not exist.
    pub fn tube_range(&self, tube: usize) -> Result<Range<usize>> {
        self.check_tube(tube)?;
        let n = self.straws * self.pixels;
        Ok(n * tube..n * (tube + 1))
    }

    /// Spectrum indices of one straw.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if `tube` or `straw` does not exist.
    pub fn straw_range(&self, tube: usize, straw: usize) -> Result<Range<usize>> {
        self.check_tube(tube)?;
        self.check_straw(straw)?;
        let start = (tube * self.straws + straw) * self.pixels;
        Ok(start..start + self.pixels)
    }

    /// Reshapes the outer dimension `dim` into `tube`, `straw`, `pixel`.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if `dim` is not the outer dimension and
    /// [`Error::Shape`] if its extent does not match the layout.
    pub fn to_logical_dims(&self, array: &LabeledArray, dim: &str) -> Result<LabeledArray> {
        if array.dims().first().map(String::as_str) != Some(dim) {
            return Err(Error::range(dim, format!("expected '{dim}' to be the outer dimension")));
        }
        array.fold(
            dim,
            &[("tube", self.tubes), ("straw", self.straws), ("pixel", self.pixels)],
        )
    }

    fn check_tube(&self, tube: usize) -> Result<()> {
        if tube >= self.tubes {
            return Err(Error::range("tube", format!("tube {tube} not in 0..{}", self.tubes)));
        }
        Ok(())
    }

    fn check_straw(&self, straw: usize) -> Result<()> {
        if straw >= self.straws || straw >= self.straw_layers.len() {
            return Err(Error::range("straw", format!("straw {straw} not in 0..{}", self.straws)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_grouping_key_validation() {
        assert!(GroupingKey::new("spectrum", &[0, 1, 1, 0]).is_ok());
        assert!(matches!(GroupingKey::new("spectrum", &[0, -1]), Err(Error::Range { .. })));
        assert!(matches!(GroupingKey::new("spectrum", &[0, 2]), Err(Error::Range { .. })));
        assert!(matches!(GroupingKey::new("spectrum", &[]), Err(Error::Range { .. })));
        assert_eq!(GroupingKey::new("s", &[1, 0, 1]).unwrap().counts(), vec![1, 2]);
    }

    #[test]
    fn test_group_sum_excludes_masked() {
        let values = Variable::vector("spectrum", vec![1.0, 2.0, 4.0, 8.0], Unit::Counts);
        let data = LabeledArray::new(values)
            .with_mask("dead", Mask::vector("spectrum", vec![false, true, false, false]))
            .unwrap();
        let key = GroupingKey::new("spectrum", &[0, 0, 1, 1]).unwrap();
        let out = group_sum(&data, &key, "layer").unwrap();
        assert_eq!(out.dims(), &["layer".to_string()]);
        assert_eq!(out.data().to_vec(), vec![1.0, 12.0]);
        let mask: Vec<bool> = out.masks()["dead"].values().iter().copied().collect();
        assert_eq!(mask, vec![true, false]);
    }

    #[test]
    fn test_coarsen_uneven_extent() {
        let values = Array2::from_elem((1, 5), 1.0).into_dyn();
        let data = LabeledArray::new(Variable::new(&["y", "x"], values, Unit::Counts).unwrap());
        let out = coarsen(&data, "x", "y", 2, 1).unwrap();
        // width 2: buckets [0, 0, 1, 1, 1]
        assert_eq!(out.data().to_vec(), vec![2.0, 3.0]);
        assert_eq!(out.coord("x").unwrap().values_1d().unwrap(), vec![0.0, 2.5, 5.0]);
        assert!(matches!(coarsen(&data, "x", "y", 6, 1), Err(Error::Range { .. })));
    }

    #[test]
    fn test_coarsen_ors_masks_per_cell() {
        let values = Array2::from_elem((8, 8), 1.0).into_dyn();
        let hot = Array2::from_shape_fn((8, 8), |(y, x)| (y, x) == (1, 2) || (y, x) == (6, 7));
        let data = LabeledArray::new(Variable::new(&["y", "x"], values, Unit::Counts).unwrap())
            .with_mask("hot", Mask::new(&["y", "x"], hot.into_dyn()).unwrap())
            .unwrap();
        let out = coarsen(&data, "x", "y", 4, 4).unwrap();
        let mask = &out.masks()["hot"];
        assert_eq!(mask.dims(), &["y".to_string(), "x".to_string()]);
        let flags: Vec<bool> = mask.values().iter().copied().collect();
        let masked: Vec<usize> = (0..16).filter(|&i| flags[i]).collect();
        assert_eq!(masked, vec![1, 15]);
        let sums = out.data().to_vec();
        assert_eq!(sums[1], 3.0);
        assert_eq!(sums[15], 3.0);
        assert_eq!(sums[0], 4.0);
    }

    #[test]
    fn test_layer_of_checks_indices() {
        let layout = LayerLayout::loki();
        assert_eq!(layout.layer_of(1, 6).unwrap(), 3 + 2);
        assert!(matches!(layout.layer_of(0, 7), Err(Error::Range { .. })));
        assert!(matches!(layout.layer_of(32, 0), Err(Error::Range { .. })));
    }

    #[test]
    fn test_layer_key_small_layout() {
        let layout = LayerLayout::loki().with_tubes(5).with_pixels(2);
        let key = layout.layer_key("spectrum").unwrap();
        assert_eq!(key.keys().len(), 5 * 7 * 2);
        assert_eq!(key.groups(), 12);
        // tube 1 straw 6
        assert_eq!(key.keys()[(7 + 6) * 2], 3 + 2);
        // tube 4 wraps to tube layer 0
        assert_eq!(key.keys()[layout.tube_range(4).unwrap().start], 0);
    }

    #[test]
    fn test_ranges() {
        let layout = LayerLayout::loki();
        assert_eq!(layout.spectra(), 114_688);
        assert_eq!(layout.tube_range(1).unwrap(), 3584..7168);
        assert_eq!(layout.straw_range(0, 2).unwrap(), 1024..1536);
        assert!(matches!(layout.tube_range(32), Err(Error::Range { .. })));
        assert!(matches!(layout.straw_range(0, 7), Err(Error::Range { .. })));
    }

    #[test]
    fn test_to_logical_dims() {
        let layout = LayerLayout::loki().with_tubes(2).with_straws(vec![0, 1]).with_pixels(3);
        let values = Array2::from_elem((12, 4), 1.0).into_dyn();
        let data =
            LabeledArray::new(Variable::new(&["spectrum", "tof"], values, Unit::Counts).unwrap());
        let logical = layout.to_logical_dims(&data, "spectrum").unwrap();
        assert_eq!(logical.shape(), &[2, 2, 3, 4]);
        let values = Array2::from_elem((4, 12), 1.0).into_dyn();
        let transposed =
            LabeledArray::new(Variable::new(&["tof", "spectrum"], values, Unit::Counts).unwrap());
        assert!(matches!(
            layout.to_logical_dims(&transposed, "spectrum"),
            Err(Error::Range { .. })
        ));
    }
}
