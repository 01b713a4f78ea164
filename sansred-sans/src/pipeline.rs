//! The SANS reduction pipeline.
//!
//! Stages run in a fixed order: masks, time-of-flight to wavelength,
//! background subtraction of monitors, rebinning onto common wavelength
//! edges, transmission, normalization, and the momentum-transfer
//! histogram (optionally per wavelength band). Every stage borrows its
//! input and returns a new value, so loaded runs can be reduced again
//! with different options.

use crate::convert::{
    DetectorGeometry, Domain, MonitorGeometry, UnitConversion, Q, SPECTRUM, WAVELENGTH,
};
use crate::instrument::SansConfig;
use crate::normalization::solid_angle;
use crate::transmission::{monitor_in_wavelength, transmission_fraction};
use sansred_algorithms::{
    group_sum, histogram, map_to_bins, partition, rebin, EmptyRanges, GroupingKey,
};
use sansred_core::{linspace, Coord, Dataset, Error, LabeledArray, Mask, Result, Unit};
use std::collections::BTreeMap;

/// Dataset item holding the detector counts.
pub const DATA: &str = "data";
/// Dataset item holding the normalization denominator.
pub const NORM: &str = "norm";
/// Output dimension of layer grouping.
pub const LAYER: &str = "layer";

/// A monitor spectrum and where it sits.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    /// Counts over time-of-flight.
    pub data: LabeledArray,
    /// Monitor geometry.
    pub geometry: MonitorGeometry,
}

/// One measurement: detector counts and monitor spectra.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Run {
    /// Detector counts over `spectrum` and `tof`.
    pub detector: Option<LabeledArray>,
    /// Detector geometry.
    pub geometry: Option<DetectorGeometry>,
    /// Monitors in spectrum order.
    pub monitors: Vec<Monitor>,
}

impl Run {
    /// Monitor `index`.
    ///
    /// # Errors
    /// Returns [`Error::MissingChannel`] if there is no such monitor.
    pub fn monitor(&self, index: usize) -> Result<&Monitor> {
        self.monitors.get(index).ok_or_else(|| {
            Error::MissingChannel(format!(
                "monitor {index} requested, run has {} monitors",
                self.monitors.len()
            ))
        })
    }

    /// Detector counts and geometry.
    ///
    /// # Errors
    /// Returns [`Error::MissingChannel`] if either is absent.
    pub fn detector(&self) -> Result<(&LabeledArray, &DetectorGeometry)> {
        let data = self
            .detector
            .as_ref()
            .ok_or_else(|| Error::MissingChannel("run has no detector data".into()))?;
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| Error::MissingChannel("run has no detector geometry".into()))?;
        Ok((data, geometry))
    }
}

/// Everything a reduction reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionInputs {
    /// Sample scattering run.
    pub sample: Run,
    /// Sample transmission run.
    pub transmission: Run,
    /// Empty-beam transmission run.
    pub direct: Run,
    /// Detector efficiency over wavelength, dimensionless.
    pub direct_beam: LabeledArray,
    /// Masks applied to the sample detector.
    pub masks: BTreeMap<String, Mask>,
}

impl ReductionInputs {
    /// Checks that every channel the reduction reads is present.
    ///
    /// # Errors
    /// Returns [`Error::MissingChannel`] naming the first absent channel.
    pub fn validate(&self, config: &SansConfig) -> Result<()> {
        self.sample.detector()?;
        self.sample.monitor(config.incident_monitor)?;
        for run in [&self.transmission, &self.direct] {
            run.monitor(config.incident_monitor)?;
            run.monitor(config.transmission_monitor)?;
        }
        if self.direct_beam.coords().get(WAVELENGTH).is_none() {
            return Err(Error::MissingChannel("direct beam has no wavelength coordinate".into()));
        }
        Ok(())
    }
}

/// How spectra are combined into the final histogram.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Grouping {
    /// Sum all spectra.
    #[default]
    Flat,
    /// Sum spectra per group, e.g. detector layer.
    Layers(GroupingKey),
}

/// Options of one reduction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReductionOptions {
    /// Number of equal-width wavelength bands, or a single combined result.
    pub wavelength_bands: Option<usize>,
    /// Spectrum grouping.
    pub grouping: Grouping,
}

impl ReductionOptions {
    /// Set the wavelength band count.
    #[must_use]
    pub fn with_wavelength_bands(mut self, bands: usize) -> Self {
        self.wavelength_bands = Some(bands);
        self
    }

    /// Set the grouping.
    #[must_use]
    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }
}

/// Builds the `data` and `norm` items over `spectrum` and bin-center
/// wavelengths.
///
/// `norm` is the solid angle times the incident monitor, the transmission
/// fraction and the direct-beam efficiency. The sample masks become
/// masks shared by both items.
///
/// # Errors
/// Returns [`Error::MissingChannel`] before any numeric work if a channel
/// is absent, or the first error of any stage.
pub fn to_wavelength(inputs: &ReductionInputs, config: &SansConfig) -> Result<Dataset> {
    inputs.validate(config)?;
    config.validate()?;
    let edges = config.wavelength_bins.edges(WAVELENGTH, Unit::Angstrom)?;

    let transmission = transmission_fraction(&inputs.transmission, &inputs.direct, config, &edges)?;
    log::debug!("transmission fraction computed on {} wavelength bins", edges.bins());

    let (detector, geometry) = inputs.sample.detector()?;
    let mut data = detector.clone();
    for (name, mask) in &inputs.masks {
        data.set_mask(name, mask.clone())?;
    }
    let data = geometry.convert(&data, Domain::Tof, Domain::Wavelength)?;
    let mut data = rebin(&data, WAVELENGTH, &edges)?.scale(config.detector_scale);
    log::debug!("detector rebinned to wavelength, shape {:?}", data.shape());

    let monitor = monitor_in_wavelength(
        &inputs.sample,
        config.incident_monitor,
        config.incident_background,
        &edges,
    )?;
    let direct_beam = map_to_bins(&inputs.direct_beam, WAVELENGTH, monitor.coord(WAVELENGTH)?)?;
    let direct_beam = monitor.mul(&transmission)?.mul(&direct_beam)?;
    let norm = LabeledArray::new(solid_angle(geometry, &config.pixel)?).mul(&direct_beam)?;

    let names: Vec<String> = data.masks().keys().cloned().collect();
    let shared: Vec<(String, Mask)> = names
        .into_iter()
        .filter_map(|name| data.remove_mask(&name).map(|mask| (name, mask)))
        .collect();

    let mut dataset = Dataset::new();
    dataset.insert(DATA, data.to_bin_centers(WAVELENGTH)?)?;
    dataset.insert(NORM, norm.to_bin_centers(WAVELENGTH)?)?;
    for (name, mask) in shared {
        dataset.set_mask(&name, mask)?;
    }
    log::debug!("wavelength dataset ready: {:?}", dataset.sizes());
    Ok(dataset)
}

/// Converts `data` and `norm` to momentum transfer, histograms both onto
/// `q_edges`, combines spectra and returns `data / norm`.
///
/// Bins with a zero denominator hold NaN.
///
/// # Errors
/// Returns the first error of any stage.
pub fn reduce_q(
    dataset: &Dataset,
    geometry: &DetectorGeometry,
    q_edges: &Coord,
    grouping: &Grouping,
) -> Result<LabeledArray> {
    let reduce_item = |name: &str| -> Result<LabeledArray> {
        let item = geometry.convert(&dataset.get(name)?, Domain::Wavelength, Domain::Q)?;
        let hist = histogram(&item, Q, q_edges)?;
        match grouping {
            Grouping::Flat => hist.sum(SPECTRUM),
            Grouping::Layers(key) => group_sum(&apply_masks(&hist, SPECTRUM)?, key, LAYER),
        }
    };
    let numerator = reduce_item(DATA)?;
    let denominator = reduce_item(NORM)?;
    divide_or_nan(&numerator, &denominator)
}

/// Like [`reduce_q`], separately for each wavelength band between
/// consecutive `band_edges`.
///
/// Results are stacked along a new outer `wavelength` dimension whose
/// edge coordinate is `band_edges`.
///
/// # Errors
/// Returns [`Error::Range`] if a band holds no wavelength bin, or the
/// first error of any stage.
pub fn reduce_by_wavelength(
    dataset: &Dataset,
    geometry: &DetectorGeometry,
    q_edges: &Coord,
    grouping: &Grouping,
    band_edges: &Coord,
) -> Result<LabeledArray> {
    let wavelengths = dataset.get(DATA)?.coord(WAVELENGTH)?.clone();
    let ranges = partition(&wavelengths, band_edges, EmptyRanges::Reject)?;
    let bands = ranges
        .into_iter()
        .map(|range| {
            log::debug!("wavelength band over bins {range:?}");
            reduce_q(&dataset.slice(WAVELENGTH, range)?, geometry, q_edges, grouping)
        })
        .collect::<Result<Vec<_>>>()?;
    LabeledArray::concat(WAVELENGTH, &bands)?.with_coord(WAVELENGTH, band_edges.clone())
}

/// Runs the full reduction and returns `I(Q)`, with an outer wavelength
/// band dimension if requested.
///
/// # Errors
/// Returns [`Error::MissingChannel`] before any numeric work if a channel
/// is absent, [`Error::Config`] for invalid settings, or the first error
/// of any stage.
pub fn reduce(
    inputs: &ReductionInputs,
    config: &SansConfig,
    options: &ReductionOptions,
) -> Result<LabeledArray> {
    let dataset = to_wavelength(inputs, config)?;
    let (_, geometry) = inputs.sample.detector()?;
    let q_edges = config.q_bins.edges(Q, Unit::InverseAngstrom)?;
    let result = match options.wavelength_bands {
        None => reduce_q(&dataset, geometry, &q_edges, &options.grouping)?,
        Some(0) => return Err(Error::Config("wavelength band count must be positive".into())),
        Some(bands) => {
            let edges = config.wavelength_bins.values();
            let (low, high) = (edges[0], edges[edges.len() - 1]);
            let band_edges =
                Coord::edges(WAVELENGTH, linspace(low, high, bands + 1), Unit::Angstrom);
            reduce_by_wavelength(&dataset, geometry, &q_edges, &options.grouping, &band_edges)?
        }
    };
    log::info!("reduced to I(Q) with shape {:?}", result.shape());
    Ok(result)
}

/// Applies and drops the masks along `dim`.
fn apply_masks(array: &LabeledArray, dim: &str) -> Result<LabeledArray> {
    let data = array.zero_masked(dim)?;
    let mut out = array.clone().with_data(data)?;
    let names: Vec<String> = out
        .masks()
        .iter()
        .filter(|(_, m)| m.contains(dim))
        .map(|(n, _)| n.clone())
        .collect();
    for name in names {
        out.remove_mask(&name);
    }
    Ok(out)
}

/// `numerator / denominator`, with NaN wherever the denominator is 0.
#[allow(clippy::float_cmp)]
fn divide_or_nan(numerator: &LabeledArray, denominator: &LabeledArray) -> Result<LabeledArray> {
    let ratio = numerator.div(denominator)?;
    let zero = denominator.data().map(|d| if d == 0.0 { 1.0 } else { 0.0 });
    let values = ratio.data().zip_with(&zero, ratio.unit(), |r, z| {
        if z > 0.0 {
            f64::NAN
        } else {
            r
        }
    })?;
    ratio.with_data(values)
}
