//! sansred-algorithms: Reusable primitives on labeled binned arrays.
//!
//! - **Rebinning** - flux-conserving redistribution onto new bin edges
//! - **Histogramming** - weighted point histograms of center coordinates
//! - **Slicing** - bin ranges and half-open partitions from coordinate values
//! - **Regrouping** - grouped sums, grid coarsening, detector layer layouts
//!
#![warn(missing_docs)]

mod histogram;
mod rebin;
mod regroup;
mod slicing;

pub use histogram::histogram;
pub use rebin::{map_to_bins, rebin};
pub use regroup::{coarsen, group_sum, GroupingKey, LayerLayout};
pub use slicing::{partition, select_bins, select_range, BinRange, EmptyRanges};
