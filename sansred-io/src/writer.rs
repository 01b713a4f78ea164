//! Writers for reduced spectra.

use crate::error::{Error, Result};
use sansred_core::{centers_from_edges, LabeledArray};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writer for reduced 1-D spectra and banded 2-D spectra.
pub struct SpectrumWriter {
    writer: BufWriter<File>,
}

impl SpectrumWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Writes `array` as CSV.
    ///
    /// The last dimension is written as bin centers next to the value. A
    /// 2-D array (e.g. wavelength bands) adds a leading column with the
    /// bin center of the outer dimension.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for arrays with more than two
    /// dimensions, I/O errors otherwise.
    pub fn write_csv(&mut self, array: &LabeledArray) -> Result<()> {
        let dims = array.dims();
        match dims.len() {
            1 => {
                let x = axis_values(array, &dims[0])?;
                writeln!(self.writer, "{},value", dims[0])?;
                for (x, v) in x.iter().zip(array.data().to_vec()) {
                    writeln!(self.writer, "{x},{v}")?;
                }
            }
            2 => {
                let outer = axis_values(array, &dims[0])?;
                let inner = axis_values(array, &dims[1])?;
                writeln!(self.writer, "{},{},value", dims[0], dims[1])?;
                let values = array.data().to_vec();
                for (i, o) in outer.iter().enumerate() {
                    for (j, x) in inner.iter().enumerate() {
                        writeln!(self.writer, "{o},{x},{}", values[i * inner.len() + j])?;
                    }
                }
            }
            n => {
                return Err(Error::InvalidFormat(format!(
                    "cannot write a {n}-dimensional spectrum as CSV"
                )))
            }
        }
        self.writer.flush()?;
        log::debug!("wrote spectrum with shape {:?}", array.shape());
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an I/O error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Bin centers of the coordinate of `dim`, or indices if there is none.
#[allow(clippy::cast_precision_loss)]
fn axis_values(array: &LabeledArray, dim: &str) -> Result<Vec<f64>> {
    match array.coords().get(dim) {
        Some(coord) if coord.is_edges() => Ok(centers_from_edges(coord)?.values_1d()?),
        Some(coord) => Ok(coord.values_1d()?),
        None => Ok((0..array.len_of(dim)?).map(|i| i as f64).collect()),
    }
}
