//! Error types for sansred-core.

use crate::unit::Unit;
use thiserror::Error;

/// Result type alias for sansred operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for reduction operations.
///
/// Every variant is raised eagerly at the point of violation and carries
/// enough context (dimension name, requested values) to diagnose the
/// failure without re-running the reduction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Coordinate or array lengths do not agree.
    #[error("shape error along '{dim}': {message}")]
    Shape { dim: String, message: String },

    /// Invalid or empty slice/partition request.
    #[error("range error along '{dim}': {message}")]
    Range { dim: String, message: String },

    /// Operation between incompatible physical units.
    #[error("unit error in {operation}: {lhs} and {rhs} are incompatible")]
    Unit {
        operation: &'static str,
        lhs: Unit,
        rhs: Unit,
    },

    /// Missing or invalid external configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Required monitor/detector/reference data absent.
    #[error("missing channel: {0}")]
    MissingChannel(String),
}

impl Error {
    /// Builds a [`Error::Shape`] for `dim`.
    pub fn shape(dim: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Shape {
            dim: dim.into(),
            message: message.into(),
        }
    }

    /// Builds a [`Error::Range`] for `dim`.
    pub fn range(dim: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Range {
            dim: dim.into(),
            message: message.into(),
        }
    }

    /// Builds a [`Error::Unit`].
    #[must_use]
    pub fn unit(operation: &'static str, lhs: Unit, rhs: Unit) -> Self {
        Self::Unit { operation, lhs, rhs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = Error::range("wavelength", "start 0.5 is below the first edge 1");
        assert_eq!(
            err.to_string(),
            "range error along 'wavelength': start 0.5 is below the first edge 1"
        );

        let err = Error::unit("add", Unit::Counts, Unit::Angstrom);
        assert!(err.to_string().contains("counts"));
        assert!(err.to_string().contains("Å"));
    }
}
