//! Physical units and unit-tagged scalars.
//!
//! Units form a fixed, closed set. Arithmetic between units is resolved
//! through explicit product and quotient tables; anything outside the
//! tables is a [`Error::Unit`].

use crate::error::{Error, Result};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical unit tag attached to every variable and coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    /// Pure number.
    #[default]
    Dimensionless,
    /// Detector or monitor counts.
    Counts,
    /// Time-of-flight in microseconds.
    Microseconds,
    /// Wavelength or d-spacing in ångström.
    Angstrom,
    /// Momentum transfer in inverse ångström.
    InverseAngstrom,
    /// Length in metres.
    Meter,
    /// Area in square metres.
    SquareMeter,
}

impl Unit {
    /// Unit of the product `self * rhs`.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] if the product is not a supported unit.
    pub fn mul(self, rhs: Self) -> Result<Self> {
        match (self, rhs) {
            (Self::Dimensionless, u) | (u, Self::Dimensionless) => Ok(u),
            (Self::Meter, Self::Meter) => Ok(Self::SquareMeter),
            (Self::Angstrom, Self::InverseAngstrom) | (Self::InverseAngstrom, Self::Angstrom) => {
                Ok(Self::Dimensionless)
            }
            _ => Err(Error::unit("mul", self, rhs)),
        }
    }

    /// Unit of the quotient `self / rhs`.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] if the quotient is not a supported unit.
    pub fn div(self, rhs: Self) -> Result<Self> {
        match (self, rhs) {
            (a, b) if a == b => Ok(Self::Dimensionless),
            (u, Self::Dimensionless) => Ok(u),
            (Self::Dimensionless, Self::Angstrom) => Ok(Self::InverseAngstrom),
            (Self::Dimensionless, Self::InverseAngstrom) => Ok(Self::Angstrom),
            (Self::SquareMeter, Self::Meter) => Ok(Self::Meter),
            _ => Err(Error::unit("div", self, rhs)),
        }
    }

    /// Checks that `self` and `rhs` are identical, as required by
    /// addition, subtraction and coordinate comparisons.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] if the units differ.
    pub fn expect_same(self, rhs: Self, operation: &'static str) -> Result<Self> {
        if self == rhs {
            Ok(self)
        } else {
            Err(Error::unit(operation, self, rhs))
        }
    }

    /// Short symbol used in messages and file headers.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Dimensionless => "dimensionless",
            Self::Counts => "counts",
            Self::Microseconds => "µs",
            Self::Angstrom => "Å",
            Self::InverseAngstrom => "1/Å",
            Self::Meter => "m",
            Self::SquareMeter => "m^2",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A magnitude tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quantity {
    /// Numeric magnitude.
    pub value: f64,
    /// Physical unit of `value`.
    pub unit: Unit,
}

impl Quantity {
    /// Creates a new quantity.
    #[must_use]
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Time-of-flight in microseconds.
    #[must_use]
    pub const fn us(value: f64) -> Self {
        Self::new(value, Unit::Microseconds)
    }

    /// Wavelength in ångström.
    #[must_use]
    pub const fn angstrom(value: f64) -> Self {
        Self::new(value, Unit::Angstrom)
    }

    /// Length in metres.
    #[must_use]
    pub const fn meters(value: f64) -> Self {
        Self::new(value, Unit::Meter)
    }

    /// Returns the magnitude after checking the unit.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] if `self.unit != unit`.
    pub fn value_in(self, unit: Unit) -> Result<f64> {
        self.unit.expect_same(unit, "value_in")?;
        Ok(self.value)
    }

    /// Product of two quantities.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] if the product unit is unsupported.
    pub fn mul(self, rhs: Self) -> Result<Self> {
        Ok(Self::new(self.value * rhs.value, self.unit.mul(rhs.unit)?))
    }

    /// Quotient of two quantities.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] if the quotient unit is unsupported.
    pub fn div(self, rhs: Self) -> Result<Self> {
        Ok(Self::new(self.value / rhs.value, self.unit.div(rhs.unit)?))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_table() {
        assert_eq!(Unit::Meter.mul(Unit::Meter), Ok(Unit::SquareMeter));
        assert_eq!(Unit::Counts.mul(Unit::Dimensionless), Ok(Unit::Counts));
        assert_eq!(Unit::Dimensionless.mul(Unit::Angstrom), Ok(Unit::Angstrom));
        assert!(Unit::Counts.mul(Unit::Counts).is_err());
        assert!(Unit::Microseconds.mul(Unit::Angstrom).is_err());
    }

    #[test]
    fn test_quotient_table() {
        assert_eq!(Unit::Counts.div(Unit::Counts), Ok(Unit::Dimensionless));
        assert_eq!(
            Unit::SquareMeter.div(Unit::SquareMeter),
            Ok(Unit::Dimensionless)
        );
        assert_eq!(Unit::Counts.div(Unit::Dimensionless), Ok(Unit::Counts));
        assert_eq!(
            Unit::Dimensionless.div(Unit::Angstrom),
            Ok(Unit::InverseAngstrom)
        );
        assert!(Unit::Counts.div(Unit::Angstrom).is_err());
    }

    #[test]
    fn test_quantity_checks_unit() {
        let t = Quantity::us(40_000.0);
        assert_eq!(t.value_in(Unit::Microseconds), Ok(40_000.0));
        assert!(t.value_in(Unit::Angstrom).is_err());

        let area = Quantity::meters(0.0075)
            .mul(Quantity::meters(0.011_718_8))
            .unwrap();
        assert_eq!(area.unit, Unit::SquareMeter);
    }
}
