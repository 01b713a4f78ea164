//! Per-instrument reduction settings.

use crate::convert::SPECTRUM;
use crate::pipeline::Grouping;
use sansred_algorithms::LayerLayout;
use sansred_core::{BinSpec, Error, Quantity, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Time-of-flight interval used to estimate a flat background, in µs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BackgroundWindow {
    /// Start of the window.
    pub start: f64,
    /// End of the window.
    pub end: f64,
}

impl BackgroundWindow {
    /// Creates a window from `start` to `end` µs.
    #[must_use]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Bounds as time-of-flight quantities.
    #[must_use]
    pub fn bounds(&self) -> (Quantity, Quantity) {
        (Quantity::us(self.start), Quantity::us(self.end))
    }
}

/// Pixel footprint used for the solid-angle estimate, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelShape {
    /// Pixel width.
    pub width: f64,
    /// Pixel length along the tube.
    pub length: f64,
}

impl Default for PixelShape {
    fn default() -> Self {
        Self {
            width: 0.0075,
            length: 0.011_718_8,
        }
    }
}

/// Settings of one SANS reduction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SansConfig {
    /// Index of the incident-beam monitor.
    pub incident_monitor: usize,
    /// Index of the transmission monitor.
    pub transmission_monitor: usize,
    /// Background window of the incident monitor.
    pub incident_background: BackgroundWindow,
    /// Background window of the transmission monitor.
    pub transmission_background: BackgroundWindow,
    /// Common wavelength binning in Å.
    pub wavelength_bins: BinSpec,
    /// Momentum-transfer binning in 1/Å.
    pub q_bins: BinSpec,
    /// Pixel footprint.
    pub pixel: PixelShape,
    /// Factor applied to the detector counts.
    pub detector_scale: f64,
}

impl Default for SansConfig {
    fn default() -> Self {
        Self {
            incident_monitor: 0,
            transmission_monitor: 3,
            incident_background: BackgroundWindow::new(40_000.0, 99_000.0),
            transmission_background: BackgroundWindow::new(88_000.0, 98_000.0),
            wavelength_bins: BinSpec::LogStep {
                start: 0.9,
                step: 0.025,
                stop: 13.5,
            },
            q_bins: BinSpec::Geometric {
                start: 0.008,
                stop: 0.6,
                bins: 54,
            },
            pixel: PixelShape::default(),
            detector_scale: 1.0,
        }
    }
}

impl SansConfig {
    /// LARMOR settings, including its detector efficiency scale.
    #[must_use]
    pub fn larmor() -> Self {
        Self::default().with_detector_scale(100.0 / 176.714_586_764_425_86)
    }

    /// Set the monitor indices.
    #[must_use]
    pub fn with_monitors(mut self, incident: usize, transmission: usize) -> Self {
        self.incident_monitor = incident;
        self.transmission_monitor = transmission;
        self
    }

    /// Set the background windows.
    #[must_use]
    pub fn with_backgrounds(
        mut self,
        incident: BackgroundWindow,
        transmission: BackgroundWindow,
    ) -> Self {
        self.incident_background = incident;
        self.transmission_background = transmission;
        self
    }

    /// Set the wavelength binning.
    #[must_use]
    pub fn with_wavelength_bins(mut self, bins: BinSpec) -> Self {
        self.wavelength_bins = bins;
        self
    }

    /// Set the momentum-transfer binning.
    #[must_use]
    pub fn with_q_bins(mut self, bins: BinSpec) -> Self {
        self.q_bins = bins;
        self
    }

    /// Set the pixel footprint.
    #[must_use]
    pub fn with_pixel(mut self, pixel: PixelShape) -> Self {
        self.pixel = pixel;
        self
    }

    /// Set the detector scale factor.
    #[must_use]
    pub fn with_detector_scale(mut self, scale: f64) -> Self {
        self.detector_scale = scale;
        self
    }

    /// Checks windows and pixel geometry.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an empty background window or a
    /// non-positive pixel dimension.
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("incident", self.incident_background),
            ("transmission", self.transmission_background),
        ] {
            if w.start.is_nan() || w.end.is_nan() || w.start > w.end {
                return Err(Error::Config(format!(
                    "{name} background window [{}, {}] is empty",
                    w.start, w.end
                )));
            }
        }
        if self.pixel.width <= 0.0 || self.pixel.length <= 0.0 {
            return Err(Error::Config("pixel dimensions must be positive".into()));
        }
        Ok(())
    }
}

/// LoKI: straw-tube detector reduced per logical layer.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Loki {
    /// Tube/straw/pixel layout.
    pub layout: LayerLayout,
    /// Reduction settings.
    pub config: SansConfig,
}

impl Loki {
    /// Groups spectra by detector layer.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an inconsistent layout.
    pub fn layer_grouping(&self) -> Result<Grouping> {
        Ok(Grouping::Layers(self.layout.layer_key(SPECTRUM)?))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SansConfig::default();
        assert_eq!((config.incident_monitor, config.transmission_monitor), (0, 3));
        assert_eq!(config.q_bins.values().len(), 55);
        let wavelengths = config.wavelength_bins.values();
        assert_eq!(wavelengths[0], 0.9);
        assert_eq!(*wavelengths.last().unwrap(), 13.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_larmor_scale() {
        let scale = SansConfig::larmor().detector_scale;
        assert!((scale - 0.565_884_242_2).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_reversed_window() {
        let config = SansConfig::default()
            .with_backgrounds(BackgroundWindow::new(5.0, 1.0), BackgroundWindow::new(1.0, 2.0));
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_loki_grouping() {
        let loki = Loki {
            layout: LayerLayout::loki().with_tubes(4).with_pixels(1),
            ..Loki::default()
        };
        let Grouping::Layers(key) = loki.layer_grouping().unwrap() else {
            panic!("expected layer grouping");
        };
        assert_eq!(key.groups(), 12);
        assert_eq!(key.dim(), SPECTRUM);
    }
}
