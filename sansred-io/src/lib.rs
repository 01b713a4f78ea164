//! sansred-io: File boundary for sansred.
//!
//! This crate provides the persisted data-root configuration, readers for
//! 1-D text coordinate files, and CSV writers for reduced spectra.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::{DataConfig, DEFAULT_CONFIG_FILE};
pub use error::{Error, Result};
pub use reader::TextColumnReader;
pub use writer::SpectrumWriter;
