// ==============================================================================
// parsers/mod.rs - Record source modules
// ==============================================================================
// Description: Lazy record sources for annotation resource file formats
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clinvar::ClinVarTermError;
use crate::models::KeyError;

pub mod allele_table;
pub mod clinvar;
pub mod exclusions;
pub mod sv_frequency;
pub mod vcf;

pub use allele_table::{AlleleTableRecords, AlleleTableSource};
pub use clinvar::{ClinVarRecords, ClinVarVcfSource};
pub use exclusions::read_exclusions;
pub use sv_frequency::{SvFrequencyRecords, SvFrequencySource};
pub use vcf::{FrequencyVcfRecords, FrequencyVcfSource};

/// Malformed records tolerated per source before giving up
pub const DEFAULT_MAX_ERRORS: usize = 1000;

/// Record source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read VCF header: {0}")]
    Header(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid variant key: {0}")]
    Key(#[from] KeyError),

    #[error("Invalid clinical term: {0}")]
    ClinVarTerm(#[from] ClinVarTermError),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Too many malformed records in {source_name} ({count} > {max})")]
    TooManyErrors {
        source_name: String,
        count: usize,
        max: usize,
    },
}

impl SourceError {
    /// Errors after which the underlying reader cannot continue
    pub fn is_fatal(&self) -> bool {
        match self {
            SourceError::Io(_) | SourceError::Header(_) | SourceError::TooManyErrors { .. } => true,
            SourceError::Csv(e) => e.is_io_error(),
            _ => false,
        }
    }

    /// Records on contigs the store does not hold; skipped without spending the budget
    pub fn is_unplaced(&self) -> bool {
        matches!(self, SourceError::Key(KeyError::UnplacedContig(_)))
    }
}

/// Open a text file, decompressing when the name ends in ".gz"
///
/// Multi-member gzip is supported, so BGZF-compressed files read fine.
pub fn open_text(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gzip = path.extension().is_some_and(|ext| ext == "gz");
    Ok(if is_gzip {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// Parse a floating-point cell, rejecting non-finite values
pub fn parse_finite(field: &str, value: &str) -> Result<f32, SourceError> {
    let parsed: f32 = value
        .trim()
        .parse()
        .map_err(|_| SourceError::InvalidValue(format!("{}={}", field, value)))?;
    if !parsed.is_finite() {
        return Err(SourceError::InvalidValue(format!(
            "Non-finite value for {}: {}",
            field, value
        )));
    }
    Ok(parsed)
}

/// Empty and "." cells are missing values
pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "."
}

/// Malformed-record allowance for one source
///
/// Unplaced-contig records are counted apart and never exhaust the allowance.
pub struct ErrorBudget {
    source_name: String,
    max_errors: usize,
    errors: usize,
    unplaced: u64,
}

impl ErrorBudget {
    pub fn new(source_name: impl Into<String>, max_errors: usize) -> Self {
        Self {
            source_name: source_name.into(),
            max_errors,
            errors: 0,
            unplaced: 0,
        }
    }

    /// Log a skipped record; fails once more than `max_errors` were skipped
    pub fn skip(&mut self, line: u64, error: &SourceError) -> Result<(), SourceError> {
        if error.is_unplaced() {
            self.unplaced += 1;
            debug!("{}: line {}: skipping record: {}", self.source_name, line, error);
            return Ok(());
        }

        self.errors += 1;
        warn!("{}: line {}: skipping record: {}", self.source_name, line, error);

        if self.errors > self.max_errors {
            return Err(SourceError::TooManyErrors {
                source_name: self.source_name.clone(),
                count: self.errors,
                max: self.max_errors,
            });
        }
        Ok(())
    }

    /// Log what was skipped once the source is exhausted
    pub fn finish(&self) {
        if self.unplaced > 0 {
            info!(
                "{}: skipped {} records on unplaced contigs",
                self.source_name, self.unplaced
            );
        }
        if self.errors > 0 {
            warn!("{}: skipped {} malformed records", self.source_name, self.errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_open_text_plain_and_gzip() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("table.tsv");
        std::fs::write(&plain, "a\tb\n").unwrap();

        let gz = dir.path().join("table.tsv.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"a\tb\n").unwrap();
        encoder.finish().unwrap();

        for path in [&plain, &gz] {
            let mut text = String::new();
            open_text(path).unwrap().read_to_string(&mut text).unwrap();
            assert_eq!(text, "a\tb\n");
        }
    }

    #[test]
    fn test_parse_finite() {
        assert_eq!(parse_finite("AF", "0.25").unwrap(), 0.25);
        assert!(parse_finite("AF", "NaN").is_err());
        assert!(parse_finite("AF", "inf").is_err());
        assert!(parse_finite("AF", "abc").is_err());
    }

    #[test]
    fn test_error_budget() {
        let mut budget = ErrorBudget::new("test", 2);
        let error = SourceError::InvalidValue("x".to_string());
        assert!(budget.skip(1, &error).is_ok());
        assert!(budget.skip(2, &error).is_ok());
        let fatal = budget.skip(3, &error).unwrap_err();
        assert!(matches!(fatal, SourceError::TooManyErrors { count: 3, max: 2, .. }));
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_unplaced_contigs_do_not_spend_budget() {
        let mut budget = ErrorBudget::new("test", 1);
        let unplaced = SourceError::Key(KeyError::UnplacedContig("GL000192.1".to_string()));
        for line in 1..=5000 {
            assert!(budget.skip(line, &unplaced).is_ok());
        }
        assert_eq!(budget.unplaced, 5000);
        assert_eq!(budget.errors, 0);

        let malformed = SourceError::Key(KeyError::InvalidChromosome("99".to_string()));
        assert!(budget.skip(5001, &malformed).is_ok());
        assert!(budget.skip(5002, &malformed).is_err());
    }
}
