//! Index ranges from coordinate intervals.
//!
//! Two boundary conventions coexist on purpose. [`select_range`] picks
//! every bin touching `[start, end]` using `edge <= start` / `edge > end`,
//! while [`partition`] assigns points to `[cut[i], cut[i + 1])` using
//! `point < cut` / `point >= cut`. Reduced data sets depend on each
//! convention as it stands.

use sansred_core::{centers_from_edges, Coord, Error, LabeledArray, Quantity, Result};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive range of bin indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinRange {
    /// First selected bin.
    pub first: usize,
    /// Last selected bin (inclusive).
    pub last: usize,
}

impl BinRange {
    /// Number of selected bins.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.last - self.first + 1
    }

    /// Equivalent half-open range for slicing.
    #[must_use]
    pub fn to_range(&self) -> Range<usize> {
        self.first..self.last + 1
    }
}

/// What [`partition`] does with a cut interval containing no points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EmptyRanges {
    /// Fail with [`Error::Range`].
    #[default]
    Reject,
    /// Return the empty range.
    Allow,
}

/// Bins of the ascending edge coordinate `coord` touching `[start, end]`.
///
/// `first = count(edge <= start) - 1` and
/// `last = n_edges - count(edge > end) - 1`, so the left edge of the
/// selection is `<= start` and its right edge `> end`. `start == end`
/// on an exact edge selects the single bin starting there.
///
/// # Errors
/// - [`Error::Shape`] if `coord` is not a 1-D edge coordinate.
/// - [`Error::Unit`] if the bounds are not in the coordinate's unit.
/// - [`Error::Range`] if the coordinate is not ascending or the bounds
///   fall outside the edges or are reversed.
pub fn select_range(coord: &Coord, start: Quantity, end: Quantity) -> Result<BinRange> {
    let dim = coord.dim();
    if !coord.is_edges() {
        return Err(Error::shape(dim, "range selection needs bin edges"));
    }
    let edges = coord.values_1d()?;
    if edges.len() < 2 {
        return Err(Error::shape(dim, format!("need at least 2 edges, got {}", edges.len())));
    }
    coord.expect_ascending()?;
    let start = start.value_in(coord.unit())?;
    let end = end.value_in(coord.unit())?;

    let n = edges.len();
    let below = edges.iter().filter(|&&e| e <= start).count();
    let above = edges.iter().filter(|&&e| e > end).count();
    if below == 0 {
        return Err(Error::range(
            dim,
            format!("start {start} lies before the first edge {}", edges[0]),
        ));
    }
    if above == 0 {
        return Err(Error::range(
            dim,
            format!("end {end} is not below the last edge {}", edges[n - 1]),
        ));
    }
    let (first, last) = (below - 1, n - above - 1);
    if first > last {
        return Err(Error::range(dim, format!("empty selection [{start}, {end}]")));
    }
    Ok(BinRange { first, last })
}

/// Slices `array` to the bins of its `dim` coordinate touching `[start, end]`.
///
/// # Errors
/// Same as [`select_range`], plus [`Error::Shape`] if `dim` has no coordinate.
pub fn select_bins(
    array: &LabeledArray,
    dim: &str,
    start: Quantity,
    end: Quantity,
) -> Result<LabeledArray> {
    let range = select_range(array.coord(dim)?, start, end)?;
    array.slice(dim, range.to_range())
}

/// Splits the points of `coord` into consecutive half-open ranges, one per
/// interval `[cuts[i], cuts[i + 1])`.
///
/// Edge coordinates are partitioned by their bin centers. Returns
/// `cuts.len() - 1` index ranges.
///
/// # Errors
/// - [`Error::Shape`] if either coordinate is not 1-D.
/// - [`Error::Unit`] if the units differ.
/// - [`Error::Range`] if fewer than 2 cuts are given, the cuts or the
///   points are not ascending, a range is empty under [`EmptyRanges::Reject`], or the
///   ranges do not advance monotonically.
pub fn partition(coord: &Coord, cuts: &Coord, empty: EmptyRanges) -> Result<Vec<Range<usize>>> {
    let dim = coord.dim();
    coord.unit().expect_same(cuts.unit(), "partition")?;
    let points = if coord.is_edges() {
        centers_from_edges(coord)?.values_1d()?
    } else {
        coord.values_1d()?
    };
    let cuts = cuts.values_1d()?;
    if cuts.len() < 2 {
        return Err(Error::range(dim, "partition needs at least 2 cut points"));
    }
    if cuts.windows(2).any(|w| w[0] >= w[1] || w[0].is_nan() || w[1].is_nan()) {
        return Err(Error::range(dim, "cut points must be strictly ascending"));
    }
    if points.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::range(dim, "cannot partition unsorted points"));
    }

    let mut ranges = Vec::with_capacity(cuts.len() - 1);
    let mut previous_end = 0;
    for pair in cuts.windows(2) {
        let first = points.iter().filter(|&&p| p < pair[0]).count();
        let last = points.len() - points.iter().filter(|&&p| p >= pair[1]).count();
        if first < previous_end || last < first {
            return Err(Error::range(
                dim,
                format!("partition indices do not advance at [{}, {})", pair[0], pair[1]),
            ));
        }
        if first == last && empty == EmptyRanges::Reject {
            return Err(Error::range(dim, format!("no points in [{}, {})", pair[0], pair[1])));
        }
        previous_end = last;
        ranges.push(first..last);
    }
    Ok(ranges)
}
