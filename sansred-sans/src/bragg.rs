//! Bragg-edge positions of orthorhombic (and cubic) lattices.

use sansred_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Orthorhombic lattice constants in Å.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Lattice {
    /// Constant along x.
    pub a: f64,
    /// Constant along y.
    pub b: f64,
    /// Constant along z.
    pub c: f64,
}

impl Lattice {
    /// Orthorhombic lattice.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a constant is not positive.
    pub fn new(a: f64, b: f64, c: f64) -> Result<Self> {
        if [a, b, c].iter().any(|&x| x.is_nan() || x <= 0.0) {
            return Err(Error::Config(format!(
                "lattice constants must be positive, got {a}, {b}, {c}"
            )));
        }
        Ok(Self { a, b, c })
    }

    /// Cubic lattice.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `a` is not positive.
    pub fn cubic(a: f64) -> Result<Self> {
        Self::new(a, a, a)
    }

    /// Interplanar distance of the `(h k l)` planes.
    #[must_use]
    pub fn d_spacing(&self, [h, k, l]: [u32; 3]) -> f64 {
        let (h, k, l) = (f64::from(h), f64::from(k), f64::from(l));
        let inv = (h / self.a).powi(2) + (k / self.b).powi(2) + (l / self.c).powi(2);
        1.0 / inv.sqrt()
    }
}

/// One Bragg edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BraggEdge {
    /// Miller indices, e.g. `(110)`.
    pub label: String,
    /// Interplanar distance in Å.
    pub d_spacing: f64,
}

impl BraggEdge {
    /// Wavelength of the edge in Å (backscattering, `2d`).
    #[must_use]
    pub fn wavelength(&self) -> f64 {
        2.0 * self.d_spacing
    }
}

/// All Miller indices with entries in `0..=max`, excluding `(000)`.
#[must_use]
pub fn miller_indices(max: u32) -> Vec<[u32; 3]> {
    let mut out = Vec::new();
    for h in 0..=max {
        for k in 0..=max {
            for l in 0..=max {
                if h + k + l > 0 {
                    out.push([h, k, l]);
                }
            }
        }
    }
    out
}

/// Bragg edges of `lattice` for the given planes, by decreasing
/// d-spacing.
///
/// Planes with the same d-spacing (within `1e-9` relative) produce one
/// edge labelled with the largest indices in lexicographic order, so a
/// cubic lattice reports `(100)` rather than `(001)`.
#[must_use]
pub fn bragg_edges(lattice: &Lattice, miller: &[[u32; 3]]) -> Vec<BraggEdge> {
    let mut planes: Vec<([u32; 3], f64)> =
        miller.iter().map(|&m| (m, lattice.d_spacing(m))).collect();
    planes.sort_by(|(ma, da), (mb, db)| db.total_cmp(da).then_with(|| mb.cmp(ma)));

    let mut edges: Vec<BraggEdge> = Vec::new();
    for ([h, k, l], d) in planes {
        if let Some(last) = edges.last() {
            if (last.d_spacing - d).abs() <= 1e-9 * d {
                continue;
            }
        }
        edges.push(BraggEdge {
            label: format!("({h}{k}{l})"),
            d_spacing: d,
        });
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_edges() {
        // bcc iron, allowed reflections only
        let iron = Lattice::cubic(2.8665).unwrap();
        let edges = bragg_edges(&iron, &[[1, 1, 0], [2, 0, 0], [2, 1, 1], [1, 0, 1]]);
        let labels: Vec<&str> = edges.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["(110)", "(200)", "(211)"]);
        assert_relative_eq!(edges[0].d_spacing, 2.8665 / 2.0_f64.sqrt(), max_relative = 1e-12);
        assert_relative_eq!(edges[1].wavelength(), 2.8665, max_relative = 1e-12);
    }

    #[test]
    fn test_miller_indices() {
        let all = miller_indices(1);
        assert_eq!(all.len(), 7);
        assert!(!all.contains(&[0, 0, 0]));
        let edges = bragg_edges(&Lattice::cubic(4.0).unwrap(), &all);
        let labels: Vec<&str> = edges.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["(100)", "(110)", "(111)"]);
    }

    #[test]
    fn test_invalid_lattice() {
        assert!(matches!(Lattice::new(1.0, 0.0, 1.0), Err(Error::Config(_))));
    }
}
