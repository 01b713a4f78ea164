//! Background subtraction and transmission fraction.

use crate::convert::{Domain, UnitConversion, TOF, WAVELENGTH};
use crate::instrument::{BackgroundWindow, SansConfig};
use crate::pipeline::Run;
use sansred_algorithms::rebin;
use sansred_core::{Coord, Error, LabeledArray, Quantity, Result};

/// Subtracts the mean of the bins in a coordinate window from `data`.
///
/// With `i` and `j` the insertion points of `start` and `end` in the
/// ascending `dim` coordinate, bins `i..=j` (clipped to the data) form
/// the background region. The mean is taken over `dim` and subtracted
/// from every bin, so values outside the window are shifted by the same
/// amount.
///
/// # Errors
/// - [`Error::Unit`] if the bounds are not in the coordinate's unit.
/// - [`Error::Range`] if the window selects no bin.
/// - [`Error::Shape`] if `dim` has no 1-D coordinate.
pub fn subtract_background_mean(
    data: &LabeledArray,
    dim: &str,
    start: Quantity,
    end: Quantity,
) -> Result<LabeledArray> {
    let coord = data.coord(dim)?;
    let values = coord.values_1d()?;
    let start = start.value_in(coord.unit())?;
    let end = end.value_in(coord.unit())?;
    let i = values.partition_point(|&v| v < start);
    let j = (values.partition_point(|&v| v < end) + 1).min(data.len_of(dim)?);
    if i >= j {
        return Err(Error::range(
            dim,
            format!("background window [{start}, {end}] selects no bins"),
        ));
    }
    let background = data.slice(dim, i..j)?.mean(dim)?;
    log::debug!("background over {dim}[{i}..{j}]: {:?}", background.data().to_vec());
    data.sub(&background)
}

/// Background-subtracted monitor `index` of `run`, rebinned to wavelength.
///
/// # Errors
/// Returns [`Error::MissingChannel`] if the run lacks the monitor, or any
/// error of the individual steps.
pub fn monitor_in_wavelength(
    run: &Run,
    index: usize,
    window: BackgroundWindow,
    wavelength_edges: &Coord,
) -> Result<LabeledArray> {
    let monitor = run.monitor(index)?;
    let (start, end) = window.bounds();
    let flat = subtract_background_mean(&monitor.data, TOF, start, end)?;
    let converted = monitor.geometry.convert(&flat, Domain::Tof, Domain::Wavelength)?;
    rebin(&converted, WAVELENGTH, wavelength_edges)
}

/// Wavelength-dependent transmission of the sample.
///
/// `T = (S_T / D_T) * (D_I / S_I)` with `S` the sample run, `D` the
/// direct run, `I` the incident and `T` the transmission monitor, each
/// background-subtracted and rebinned to `wavelength_edges`.
///
/// # Errors
/// Returns [`Error::MissingChannel`] if a monitor is missing, or any error
/// of the individual steps.
pub fn transmission_fraction(
    sample: &Run,
    direct: &Run,
    config: &SansConfig,
    wavelength_edges: &Coord,
) -> Result<LabeledArray> {
    let incident = |run: &Run| {
        monitor_in_wavelength(
            run,
            config.incident_monitor,
            config.incident_background,
            wavelength_edges,
        )
    };
    let transmitted = |run: &Run| {
        monitor_in_wavelength(
            run,
            config.transmission_monitor,
            config.transmission_background,
            wavelength_edges,
        )
    };
    let sample_incident = incident(sample)?;
    let sample_trans = transmitted(sample)?;
    let direct_incident = incident(direct)?;
    let direct_trans = transmitted(direct)?;
    sample_trans
        .div(&direct_trans)?
        .mul(&direct_incident.div(&sample_incident)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sansred_core::{linspace, Unit, Variable};

    fn monitor(values: Vec<f64>) -> LabeledArray {
        let edges = linspace(0.0, 100_000.0, values.len() + 1);
        LabeledArray::new(Variable::vector(TOF, values, Unit::Counts))
            .with_coord(TOF, Coord::edges(TOF, edges, Unit::Microseconds))
            .unwrap()
    }

    #[test]
    fn test_background_shifts_everything_by_mean() {
        let b = 3.0;
        let mut values = vec![b; 100];
        values[5] = 50.0;
        values[20] = 80.0;
        let data = monitor(values.clone());
        let (start, end) = (Quantity::us(40_000.0), Quantity::us(99_000.0));
        let out = subtract_background_mean(&data, TOF, start, end).unwrap();
        let out = out.data().to_vec();
        assert_relative_eq!(out[5], 50.0 - b);
        assert_relative_eq!(out[20], 80.0 - b);
        for v in &out[40..] {
            assert_relative_eq!(*v, 0.0);
        }
    }

    #[test]
    fn test_background_window_includes_end_bin() {
        // bins 2..=3 have edges [20000, 30000) and [30000, 40000)
        let data = monitor(vec![0.0, 0.0, 2.0, 4.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let (start, end) = (Quantity::us(20_000.0), Quantity::us(25_000.0));
        let out = subtract_background_mean(&data, TOF, start, end).unwrap();
        assert_relative_eq!(out.data().to_vec()[0], -3.0);
    }

    #[test]
    fn test_background_window_errors() {
        let data = monitor(vec![1.0; 10]);
        assert!(matches!(
            subtract_background_mean(&data, TOF, Quantity::angstrom(1.0), Quantity::angstrom(2.0)),
            Err(Error::Unit { .. })
        ));
        assert!(matches!(
            subtract_background_mean(&data, TOF, Quantity::us(200_000.0), Quantity::us(300_000.0)),
            Err(Error::Range { .. })
        ));
    }
}
