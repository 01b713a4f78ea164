//! sansred-core: Labeled, unit-carrying binned arrays.
//!
//! This crate provides the value types every reduction step works on:
//! dimension-labeled variables with a physical unit, coordinates that are
//! explicitly either bin edges or bin centers, boolean masks, labeled
//! arrays, datasets, and the conversions between edge and center
//! representations.
//!

pub mod array;
pub mod bins;
pub mod coord;
pub mod dataset;
pub mod error;
pub mod mask;
mod shape;
pub mod unit;
pub mod variable;

pub use array::LabeledArray;
pub use bins::{
    bin_widths, centers_from_edges, edges_from_centers, geomspace, linspace, log_step, midpoints,
    BinSpec,
};
pub use coord::{BinKind, Coord};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use mask::Mask;
pub use unit::{Quantity, Unit};
pub use variable::{Buffer, Variable};
