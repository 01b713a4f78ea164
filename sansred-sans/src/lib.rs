//! sansred-sans: Time-of-flight SANS reduction.
//!
//! Turns raw detector and monitor counts into `I(Q)`:
//! - **convert** - time-of-flight → wavelength → momentum transfer
//! - **transmission** - monitor background subtraction and transmission fraction
//! - **normalization** - pixel solid angles
//! - **pipeline** - the staged reduction, optionally per wavelength band or layer
//! - **bragg** - Bragg-edge positions for wavelength calibration checks
//!
#![warn(missing_docs)]

pub mod bragg;
pub mod convert;
pub mod instrument;
pub mod normalization;
pub mod pipeline;
pub mod transmission;

pub use bragg::{bragg_edges, miller_indices, BraggEdge, Lattice};
pub use convert::{DetectorGeometry, Domain, MonitorGeometry, UnitConversion};
pub use instrument::{BackgroundWindow, Loki, PixelShape, SansConfig};
pub use normalization::solid_angle;
pub use pipeline::{
    reduce, reduce_by_wavelength, reduce_q, to_wavelength, Grouping, Monitor, ReductionInputs,
    ReductionOptions, Run,
};
pub use transmission::{monitor_in_wavelength, subtract_background_mean, transmission_fraction};
