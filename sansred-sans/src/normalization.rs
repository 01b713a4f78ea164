//! Geometric normalization factors.

use crate::convert::DetectorGeometry;
use crate::instrument::PixelShape;
use sansred_core::{Result, Unit, Variable};

/// Approximate solid angle of every pixel seen from the sample,
/// `width * length / L2²`, dimensionless.
///
/// # Errors
/// Returns [`sansred_core::Error::Unit`] only if the geometry reports
/// distances in an unexpected unit.
pub fn solid_angle(geometry: &DetectorGeometry, pixel: &PixelShape) -> Result<Variable> {
    let l2 = geometry.l2();
    let area = Variable::scalar(pixel.width * pixel.length, Unit::SquareMeter);
    area.div(&l2.mul(&l2)?)
}
