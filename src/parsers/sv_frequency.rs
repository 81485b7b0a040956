// ==============================================================================
// parsers/sv_frequency.rs - Structural Variant Frequency Table Source
// ==============================================================================
// Description: Streams SV population-frequency records from tab-separated tables
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated with header, columns as in SV_FREQUENCY_COLUMNS
// ==============================================================================

use csv::{ReaderBuilder, StringRecord};
use std::io::BufRead;
use std::path::Path;

use super::{open_text, parse_finite, ErrorBudget, SourceError, DEFAULT_MAX_ERRORS};
use crate::models::parse_chromosome;
use crate::structural::{SvFrequencyRecord, SvType, SV_FREQUENCY_COLUMNS};

#[derive(Debug, Clone)]
pub struct SvFrequencySource {
    pub max_errors: usize,
}

impl Default for SvFrequencySource {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

impl SvFrequencySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<SvFrequencyRecords, SourceError> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(open_text(path)?);

        // Column index for each name in SV_FREQUENCY_COLUMNS
        let header = reader.headers()?;
        let mut columns = [0usize; SV_FREQUENCY_COLUMNS.len()];
        for (slot, name) in columns.iter_mut().zip(SV_FREQUENCY_COLUMNS) {
            *slot = header
                .iter()
                .position(|h| h.trim().trim_start_matches('#').eq_ignore_ascii_case(name))
                .ok_or_else(|| SourceError::MissingColumn(name.to_string()))?;
        }

        Ok(SvFrequencyRecords {
            reader,
            columns,
            row: StringRecord::new(),
            budget: ErrorBudget::new(path.display().to_string(), self.max_errors),
            done: false,
        })
    }
}

/// Lazy stream of SV frequency records from one table
pub struct SvFrequencyRecords {
    reader: csv::Reader<Box<dyn BufRead>>,
    columns: [usize; SV_FREQUENCY_COLUMNS.len()],
    row: StringRecord,
    budget: ErrorBudget,
    done: bool,
}

fn parse_int<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, SourceError> {
    value
        .trim()
        .parse()
        .map_err(|_| SourceError::InvalidValue(format!("{}={}", name, value)))
}

impl SvFrequencyRecords {
    fn parse_row(&self) -> Result<SvFrequencyRecord, SourceError> {
        let cell = |column: usize| self.row.get(self.columns[column]).unwrap_or("").trim();

        let sv_type: SvType = cell(4).parse().map_err(SourceError::InvalidValue)?;
        let start: u64 = parse_int("START", cell(1))?;
        let end: u64 = parse_int("END", cell(2))?;
        if end < start {
            return Err(SourceError::InvalidValue(format!("END {} before START {}", end, start)));
        }

        Ok(SvFrequencyRecord {
            chromosome: parse_chromosome(cell(0))?,
            start,
            end,
            sv_length: parse_int("SVLEN", cell(3))?,
            sv_type,
            db_var_id: cell(5).to_string(),
            source: cell(6).to_string(),
            source_id: cell(7).to_string(),
            allele_count: parse_int("AC", cell(8))?,
            allele_number: parse_int("AN", cell(9))?,
            homozygotes: parse_int("HOM", cell(10))?,
            frequency: parse_finite("AF", cell(11))?,
        })
    }
}

impl Iterator for SvFrequencyRecords {
    type Item = Result<SvFrequencyRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let outcome = match self.reader.read_record(&mut self.row) {
                Ok(false) => {
                    self.done = true;
                    self.budget.finish();
                    return None;
                }
                Ok(true) => self.parse_row(),
                Err(e) => Err(SourceError::from(e)),
            };

            match outcome {
                Ok(record) => return Some(Ok(record)),
                Err(e) if e.is_fatal() => {
                    self.done = true;
                    return Some(Err(e));
                }
                Err(e) => {
                    let line = self.reader.position().line();
                    if let Err(fatal) = self.budget.skip(line, &e) {
                        self.done = true;
                        return Some(Err(fatal));
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::line::OutputLine;
    use tempfile::tempdir;

    #[test]
    fn test_reads_records_in_output_column_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sv.tsv");
        let line = "1\t10000\t12000\t-2000\tDEL\tnssv1\tGNOMAD_SV\tgnomAD-SV_DEL_1\t3\t1000\t0\t0.003";
        std::fs::write(
            &path,
            format!(
                "{}\n{}\nX\t5\t4\t1\tDUP\tnssv2\tDGV\tx\t1\t2\t0\t0.5\n1\t1\t2\t1\tSNV\tnssv3\tDGV\tx\t1\t2\t0\t0.5\n",
                SV_FREQUENCY_COLUMNS.join("\t"),
                line
            ),
        )
        .unwrap();

        let records: Vec<SvFrequencyRecord> = SvFrequencySource::new()
            .open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sv_type, SvType::Del);
        assert_eq!(records[0].to_output_line(), line);
    }

    #[test]
    fn test_missing_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sv.tsv");
        std::fs::write(&path, "CHROM\tSTART\tEND\n1\t1\t2\n").unwrap();
        assert!(matches!(SvFrequencySource::new().open(&path), Err(SourceError::MissingColumn(_))));
    }
}
