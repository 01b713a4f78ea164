//! The persisted data-root configuration.
//!
//! The file holds a single assignment, `data_root = "<path>"`.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default file name of the generated configuration.
pub const DEFAULT_CONFIG_FILE: &str = "dataconfig.toml";

const KEY: &str = "data_root";

/// Location of the local data checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataConfig {
    data_root: PathBuf,
}

impl DataConfig {
    /// Wraps a data root without touching the filesystem.
    #[must_use]
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// The data root.
    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Writes a configuration for `root` to `target`.
    ///
    /// # Errors
    /// Returns a config error if `root` is missing or does not exist, or
    /// if `target` exists and `force` is false; I/O errors otherwise.
    pub fn generate(root: Option<&Path>, target: &Path, force: bool) -> Result<Self> {
        let root = root.ok_or_else(|| Error::config("a data root directory is required"))?;
        if !root.exists() {
            return Err(Error::config(format!("path {} does not exist", root.display())));
        }
        if target.exists() && !force {
            return Err(Error::config(format!(
                "{} already exists, use force to overwrite",
                target.display()
            )));
        }
        let config = Self::new(root);
        fs::write(target, config.to_line())?;
        log::info!("{} written", target.display());
        Ok(config)
    }

    /// Reads a configuration written by [`DataConfig::generate`].
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if no `data_root` assignment is
    /// found, I/O errors otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        text.lines()
            .find_map(parse_line)
            .map(Self::new)
            .ok_or_else(|| Error::InvalidFormat(format!("{}: no {KEY} assignment", path.display())))
    }

    /// `data_root/relative`, which must be an existing directory.
    ///
    /// # Errors
    /// Returns a config error naming the missing directory.
    pub fn require_dir(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = self.data_root.join(relative);
        if !dir.is_dir() {
            return Err(Error::config(format!(
                "data directory {} does not exist, check your data config",
                dir.display()
            )));
        }
        Ok(dir)
    }

    fn to_line(&self) -> String {
        let escaped = self
            .data_root
            .to_string_lossy()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        format!("{KEY} = \"{escaped}\"\n")
    }
}

fn parse_line(line: &str) -> Option<PathBuf> {
    let (key, value) = line.split_once('=')?;
    if key.trim() != KEY {
        return None;
    }
    let value = value.trim().strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(chars.next()?);
        } else {
            out.push(c);
        }
    }
    Some(PathBuf::from(out))
}
