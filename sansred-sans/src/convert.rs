//! Time-of-flight, wavelength and momentum-transfer conversions.

use sansred_core::{Coord, Error, LabeledArray, Result, Unit, Variable};
use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Spectrum (pixel) dimension.
pub const SPECTRUM: &str = "spectrum";
/// Time-of-flight dimension.
pub const TOF: &str = "tof";
/// Wavelength dimension.
pub const WAVELENGTH: &str = "wavelength";
/// Momentum-transfer dimension.
pub const Q: &str = "Q";

/// `h / m_n` in Å·m/µs: `λ[Å] = TOF_TO_WAVELENGTH * t[µs] / L[m]`.
pub const TOF_TO_WAVELENGTH: f64 = 3.956_034e-3;

/// Physical domains a conversion moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Domain {
    /// Time-of-flight in µs.
    Tof,
    /// Wavelength in Å.
    Wavelength,
    /// Momentum transfer in 1/Å.
    Q,
}

impl Domain {
    /// Dimension and coordinate name.
    #[must_use]
    pub fn dim(self) -> &'static str {
        match self {
            Self::Tof => TOF,
            Self::Wavelength => WAVELENGTH,
            Self::Q => Q,
        }
    }

    /// Unit of the coordinate.
    #[must_use]
    pub fn unit(self) -> Unit {
        match self {
            Self::Tof => Unit::Microseconds,
            Self::Wavelength => Unit::Angstrom,
            Self::Q => Unit::InverseAngstrom,
        }
    }
}

/// Replaces the coordinate of one physical axis by another.
///
/// Implementations rename the dimension, keep every other coordinate and
/// mask, and never change extents.
pub trait UnitConversion {
    /// Converts the `from` coordinate of `data` into `to`.
    ///
    /// # Errors
    /// Returns [`Error::Unit`] for unsupported pairs or a coordinate in
    /// the wrong unit, and [`Error::Shape`] if the data does not fit the
    /// geometry.
    fn convert(&self, data: &LabeledArray, from: Domain, to: Domain) -> Result<LabeledArray>;
}

/// Point in the laboratory frame, in metres.
pub type Position = [f64; 3];

fn sub(a: Position, b: Position) -> Position {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm(v: Position) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn angle(a: Position, b: Position) -> f64 {
    let cos = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]) / (norm(a) * norm(b));
    cos.clamp(-1.0, 1.0).acos()
}

/// Beam geometry of a pixelated detector with one pixel per spectrum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorGeometry {
    /// Source position.
    pub source: Position,
    /// Sample position.
    pub sample: Position,
    /// Pixel position per spectrum.
    pub pixels: Vec<Position>,
}

impl DetectorGeometry {
    /// Creates a geometry.
    #[must_use]
    pub fn new(source: Position, sample: Position, pixels: Vec<Position>) -> Self {
        Self {
            source,
            sample,
            pixels,
        }
    }

    /// Number of spectra.
    #[must_use]
    pub fn spectra(&self) -> usize {
        self.pixels.len()
    }

    /// Source to sample distance.
    #[must_use]
    pub fn l1(&self) -> f64 {
        norm(sub(self.sample, self.source))
    }

    /// Sample to pixel distance per spectrum.
    #[must_use]
    pub fn l2(&self) -> Variable {
        let l2 = self.pixels.iter().map(|&p| norm(sub(p, self.sample))).collect();
        Variable::vector(SPECTRUM, l2, Unit::Meter)
    }

    /// Full flight path per spectrum.
    #[must_use]
    pub fn flight_path(&self) -> Variable {
        let l1 = self.l1();
        self.l2().map(|l2| l1 + l2)
    }

    /// Scattering angle `2θ` per spectrum, in radians.
    #[must_use]
    pub fn two_theta(&self) -> Variable {
        let beam = sub(self.sample, self.source);
        let angles = self
            .pixels
            .iter()
            .map(|&p| angle(beam, sub(p, self.sample)))
            .collect();
        Variable::vector(SPECTRUM, angles, Unit::Dimensionless)
    }

    fn check(&self, data: &LabeledArray) -> Result<()> {
        let n = data.len_of(SPECTRUM)?;
        if n != self.spectra() {
            return Err(Error::shape(
                SPECTRUM,
                format!("data has {n} spectra, geometry has {} pixels", self.spectra()),
            ));
        }
        Ok(())
    }
}

impl UnitConversion for DetectorGeometry {
    fn convert(&self, data: &LabeledArray, from: Domain, to: Domain) -> Result<LabeledArray> {
        self.check(data)?;
        match (from, to) {
            (Domain::Tof, Domain::Wavelength) => {
                let path = self.flight_path();
                replace_domain(data, from, to, |tof| {
                    tof.zip_with(&path, Unit::Angstrom, |t, l| TOF_TO_WAVELENGTH * t / l)
                })
            }
            (Domain::Wavelength, Domain::Q) => {
                if data.coord(WAVELENGTH)?.is_edges() {
                    return Err(Error::shape(
                        WAVELENGTH,
                        "momentum transfer needs bin-center wavelengths",
                    ));
                }
                let two_theta = self.two_theta();
                replace_domain(data, from, to, |lambda| {
                    lambda.zip_with(&two_theta, Unit::InverseAngstrom, |l, tt| {
                        4.0 * PI * (0.5 * tt).sin() / l
                    })
                })
            }
            _ => Err(Error::unit("convert", from.unit(), to.unit())),
        }
    }
}

/// A beam monitor on the direct beam path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorGeometry {
    /// Source position.
    pub source: Position,
    /// Monitor position.
    pub position: Position,
}

impl MonitorGeometry {
    /// Creates a monitor geometry.
    #[must_use]
    pub fn new(source: Position, position: Position) -> Self {
        Self { source, position }
    }

    /// Source to monitor distance.
    #[must_use]
    pub fn flight_path(&self) -> f64 {
        norm(sub(self.position, self.source))
    }
}

impl UnitConversion for MonitorGeometry {
    fn convert(&self, data: &LabeledArray, from: Domain, to: Domain) -> Result<LabeledArray> {
        match (from, to) {
            (Domain::Tof, Domain::Wavelength) => {
                let factor = TOF_TO_WAVELENGTH / self.flight_path();
                replace_domain(data, from, to, |t| Ok(t.scale(factor).with_unit(Unit::Angstrom)))
            }
            _ => Err(Error::unit("convert", from.unit(), to.unit())),
        }
    }
}

fn replace_domain<F>(data: &LabeledArray, from: Domain, to: Domain, f: F) -> Result<LabeledArray>
where
    F: FnOnce(&Variable) -> Result<Variable>,
{
    let coord = data.coord(from.dim())?;
    coord.unit().expect_same(from.unit(), "convert")?;
    let kind = coord.kind();
    let values = f(coord.var())?.rename_dim(from.dim(), to.dim())?;

    let mut out = data.clone();
    out.remove_coord(from.dim());
    let mut out = out.rename_dim(from.dim(), to.dim())?;
    out.set_coord(to.dim(), Coord::new(to.dim(), kind, values)?)?;
    log::debug!("converted {} to {}", from.dim(), to.dim());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sansred_core::{BinKind, Mask};

    fn geometry() -> DetectorGeometry {
        DetectorGeometry::new(
            [0.0, 0.0, -10.0],
            [0.0, 0.0, 0.0],
            vec![[0.0, 0.0, 5.0], [5.0 * 0.2_f64.sin(), 0.0, 5.0 * 0.2_f64.cos()]],
        )
    }

    fn counts() -> LabeledArray {
        let values = Variable::full(&[SPECTRUM, TOF], &[2, 2], 1.0, Unit::Counts).unwrap();
        LabeledArray::new(values)
            .with_coord(TOF, Coord::edges(TOF, vec![1000.0, 2000.0, 3000.0], Unit::Microseconds))
            .unwrap()
            .with_mask("edge", Mask::vector(SPECTRUM, vec![true, false]))
            .unwrap()
    }

    #[test]
    fn test_geometry_distances() {
        let g = geometry();
        assert_relative_eq!(g.l1(), 10.0);
        for l2 in g.l2().to_vec() {
            assert_relative_eq!(l2, 5.0, epsilon = 1e-12);
        }
        let tt = g.two_theta().to_vec();
        assert_relative_eq!(tt[0], 0.0);
        assert_relative_eq!(tt[1], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_tof_to_wavelength() {
        let out = geometry().convert(&counts(), Domain::Tof, Domain::Wavelength).unwrap();
        assert!(out.coords().get(TOF).is_none());
        let coord = out.coord(WAVELENGTH).unwrap();
        assert_eq!(coord.kind(), BinKind::Edges);
        assert_eq!(coord.unit(), Unit::Angstrom);
        assert_relative_eq!(
            coord.var().min().unwrap(),
            TOF_TO_WAVELENGTH * 1000.0 / 15.0,
            epsilon = 1e-12
        );
        assert_eq!(out.dims(), &[SPECTRUM.to_string(), WAVELENGTH.to_string()]);
        assert!(out.masks().contains_key("edge"));
        let expected = counts().into_data().rename_dim(TOF, WAVELENGTH).unwrap();
        assert_eq!(out.data(), &expected);
    }

    #[test]
    fn test_wavelength_to_q_needs_centers() {
        let g = geometry();
        let wl = g.convert(&counts(), Domain::Tof, Domain::Wavelength).unwrap();
        assert!(matches!(g.convert(&wl, Domain::Wavelength, Domain::Q), Err(Error::Shape { .. })));

        let q = g
            .convert(&wl.to_bin_centers(WAVELENGTH).unwrap(), Domain::Wavelength, Domain::Q)
            .unwrap();
        let coord = q.coord(Q).unwrap();
        assert_eq!(coord.unit(), Unit::InverseAngstrom);
        let lambda = TOF_TO_WAVELENGTH * 1500.0 / 15.0;
        let expected = 4.0 * PI * 0.1_f64.sin() / lambda;
        let by_spectrum = coord.var().transpose(&[SPECTRUM.to_string(), Q.to_string()]).unwrap();
        assert_relative_eq!(by_spectrum.get(&[0, 0]).unwrap(), 0.0);
        assert_relative_eq!(by_spectrum.get(&[1, 0]).unwrap(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_unsupported_pairs() {
        let g = geometry();
        assert!(matches!(g.convert(&counts(), Domain::Tof, Domain::Q), Err(Error::Unit { .. })));
        let monitor = MonitorGeometry::new([0.0, 0.0, -10.0], [0.0, 0.0, -2.0]);
        let data = LabeledArray::new(Variable::vector(TOF, vec![1.0], Unit::Counts))
            .with_coord(TOF, Coord::edges(TOF, vec![800.0, 1600.0], Unit::Microseconds))
            .unwrap();
        assert!(matches!(
            monitor.convert(&data, Domain::Wavelength, Domain::Q),
            Err(Error::Unit { .. })
        ));
        let wl = monitor.convert(&data, Domain::Tof, Domain::Wavelength).unwrap();
        let edges = wl.coord(WAVELENGTH).unwrap().values_1d().unwrap();
        assert_relative_eq!(edges[0], TOF_TO_WAVELENGTH * 100.0, max_relative = 1e-12);
        assert_relative_eq!(edges[1], TOF_TO_WAVELENGTH * 200.0, max_relative = 1e-12);
    }
}
