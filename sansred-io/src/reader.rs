//! Readers for 1-D text coordinate files.

use crate::error::{Error, Result};
use sansred_core::{BinKind, Coord, Unit, Variable};
use std::fs;
use std::path::Path;

/// Reads one numeric column of a delimited text file.
///
/// Blank lines and lines starting with `#` are ignored after the header
/// rows have been skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextColumnReader {
    skip_rows: usize,
    column: usize,
    delimiter: Option<char>,
}

impl TextColumnReader {
    /// Reader for the first column of whitespace-separated values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of leading rows to skip.
    #[must_use]
    pub fn with_skip_rows(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }

    /// Set the zero-based column to read.
    #[must_use]
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    /// Set the delimiter (whitespace if unset).
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Parses the column from file contents.
    ///
    /// # Errors
    /// Returns [`Error::Parse`] naming the line of a missing or non-numeric
    /// field.
    pub fn parse(&self, text: &str) -> Result<Vec<f64>> {
        let mut values = Vec::new();
        for (number, line) in text.lines().enumerate().skip(self.skip_rows) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let field = match self.delimiter {
                Some(d) => line.split(d).nth(self.column),
                None => line.split_whitespace().nth(self.column),
            }
            .ok_or_else(|| Error::parse(number + 1, format!("no column {}", self.column)))?;
            let value = field
                .trim()
                .parse::<f64>()
                .map_err(|e| Error::parse(number + 1, format!("{e}: '{field}'")))?;
            values.push(value);
        }
        Ok(values)
    }

    /// Reads the column from `path`.
    ///
    /// # Errors
    /// I/O errors, or those of [`TextColumnReader::parse`].
    pub fn read(&self, path: &Path) -> Result<Vec<f64>> {
        let values = self.parse(&fs::read_to_string(path)?)?;
        log::debug!("read {} values from {}", values.len(), path.display());
        Ok(values)
    }

    /// Reads the column as an ascending coordinate of `dim`, multiplying
    /// every value by `scale` (e.g. `1e3` for ms to µs).
    ///
    /// # Errors
    /// Returns a core range error if the values are not ascending, or the
    /// errors of [`TextColumnReader::read`].
    pub fn read_coord(
        &self,
        path: &Path,
        dim: &str,
        kind: BinKind,
        unit: Unit,
        scale: f64,
    ) -> Result<Coord> {
        let values = self.read(path)?.into_iter().map(|v| v * scale).collect();
        let coord = Coord::new(dim, kind, Variable::vector(dim, values, unit))?;
        coord.expect_ascending()?;
        Ok(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOF_FILE: &str = "index\ttime\n0\t0.5\n1\t1.5\n\n2\t2.5\n";

    #[test]
    fn test_parse_tab_column() {
        let reader = TextColumnReader::new().with_skip_rows(1).with_column(1).with_delimiter('\t');
        assert_eq!(reader.parse(TOF_FILE).unwrap(), vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_parse_whitespace_and_comments() {
        let reader = TextColumnReader::new();
        assert_eq!(reader.parse("# header\n 1.0  2.0\n3e2 4\n").unwrap(), vec![1.0, 300.0]);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let reader = TextColumnReader::new().with_column(1);
        let err = reader.parse("1 2\n3\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        let err = TextColumnReader::new().parse("abc\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn test_read_coord() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TOF_FILE.as_bytes()).unwrap();
        let reader = TextColumnReader::new().with_skip_rows(1).with_column(1).with_delimiter('\t');
        let coord = reader
            .read_coord(file.path(), "t", BinKind::Edges, Unit::Microseconds, 1e3)
            .unwrap();
        assert_eq!(coord.values_1d().unwrap(), vec![500.0, 1500.0, 2500.0]);
        assert!(coord.is_edges());

        let mut unsorted = NamedTempFile::new().unwrap();
        unsorted.write_all(b"3\n1\n2\n").unwrap();
        let err = TextColumnReader::new()
            .read_coord(unsorted.path(), "t", BinKind::Centers, Unit::Microseconds, 1.0)
            .unwrap_err();
        assert!(matches!(err, Error::Core(sansred_core::Error::Range { .. })));
    }
}
