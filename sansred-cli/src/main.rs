//! sansred CLI
//!
//! Helpers around the reduction engine: data-root setup, detector layer
//! maps and Bragg-edge tables.
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use sansred_algorithms::LayerLayout;
use sansred_io::{DataConfig, DEFAULT_CONFIG_FILE};
use sansred_sans::{bragg_edges, miller_indices, Lattice};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    SansredIo(#[from] sansred_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] sansred_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Binned-array reduction helpers for time-of-flight SANS.
#[derive(Parser)]
#[command(name = "sansred")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the data-root configuration file
    MakeConfig {
        /// Root of the local data checkout
        root: Option<PathBuf>,

        /// Output file path
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the detector layer map as JSON
    Layers {
        /// Number of tubes
        #[arg(long, default_value = "32")]
        ntube: usize,

        /// Straw layer of each straw position, comma separated
        #[arg(long, value_delimiter = ',', default_value = "0,0,1,1,0,1,2")]
        straw_layers: Vec<usize>,

        /// Pixels per straw
        #[arg(long, default_value = "512")]
        npixel: usize,
    },

    /// Print Bragg-edge positions of a lattice as JSON
    BraggEdges {
        /// Lattice constant a in Å
        #[arg(long)]
        a: f64,

        /// Lattice constant b in Å (defaults to a)
        #[arg(long)]
        b: Option<f64>,

        /// Lattice constant c in Å (defaults to a)
        #[arg(long)]
        c: Option<f64>,

        /// Largest Miller index
        #[arg(long, default_value = "3")]
        max_index: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(cli.command) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::MakeConfig {
            root,
            output,
            force,
        } => {
            let config = DataConfig::generate(root.as_deref(), &output, force)?;
            println!(
                "Wrote {} (data_root = {})",
                output.display(),
                config.data_root().display()
            );
        }
        Commands::Layers {
            ntube,
            straw_layers,
            npixel,
        } => {
            let layout = LayerLayout::default()
                .with_tubes(ntube)
                .with_straws(straw_layers)
                .with_pixels(npixel);
            let key = layout.layer_key("spectrum")?;
            let layers: Vec<_> = key
                .counts()
                .into_iter()
                .enumerate()
                .map(|(layer, pixels)| json!({ "layer": layer, "pixels": pixels }))
                .collect();
            let report = json!({
                "spectra": layout.spectra(),
                "layers": layers,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::BraggEdges { a, b, c, max_index } => {
            let lattice = Lattice::new(a, b.unwrap_or(a), c.unwrap_or(a))?;
            let edges = bragg_edges(&lattice, &miller_indices(max_index));
            log::debug!("{} distinct edges", edges.len());
            let table: Vec<_> = edges
                .iter()
                .map(|edge| {
                    json!({
                        "label": edge.label,
                        "d_spacing": edge.d_spacing,
                        "wavelength": edge.wavelength(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
    }
    Ok(())
}
