// ==============================================================================
// parsers/allele_table.rs - Allele Annotation Table Source
// ==============================================================================
// Description: Streams per-allele frequencies and scores from tab-separated tables
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated with header
//   CHROM  POS  REF  ALT  [RSID]  [<frequency tag>...]  [<score tag>...]
// Example:
//   CHROM  POS    REF  ALT  RSID   TOPMED  GNOMAD_G_NFE  REVEL
//   1      12345  A    G    rs123  0.12    .             0.731
// ==============================================================================

use csv::{ReaderBuilder, StringRecord};
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

use super::{is_missing, open_text, parse_finite, ErrorBudget, SourceError, DEFAULT_MAX_ERRORS};
use crate::models::{parse_chromosome, AlleleRecord, FrequencySource, PathogenicitySource, VariantKey};

/// Column positions resolved from the header row
#[derive(Debug, Clone)]
struct Columns {
    chrom: usize,
    pos: usize,
    ref_allele: usize,
    alt_allele: usize,
    rsid: Option<usize>,
    frequencies: Vec<(usize, FrequencySource)>,
    scores: Vec<(usize, PathogenicitySource)>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self, SourceError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().trim_start_matches('#').eq_ignore_ascii_case(name))
        };
        let require = |name: &str| find(name).ok_or_else(|| SourceError::MissingColumn(name.to_string()));

        let mut frequencies = Vec::new();
        let mut scores = Vec::new();
        for (idx, name) in header.iter().enumerate() {
            if let Ok(source) = name.trim().parse::<FrequencySource>() {
                frequencies.push((idx, source));
            } else if let Ok(source) = name.trim().parse::<PathogenicitySource>() {
                scores.push((idx, source));
            }
        }

        Ok(Self {
            chrom: require("CHROM")?,
            pos: require("POS")?,
            ref_allele: require("REF")?,
            alt_allele: require("ALT")?,
            rsid: find("RSID"),
            frequencies,
            scores,
        })
    }
}

/// Reader configuration for allele tables
#[derive(Debug, Clone)]
pub struct AlleleTableSource {
    pub max_errors: usize,
}

impl Default for AlleleTableSource {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

impl AlleleTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }

    /// Open a table (plain or .gz) and read its header
    pub fn open(&self, path: impl AsRef<Path>) -> Result<AlleleTableRecords, SourceError> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(open_text(path)?);

        let columns = Columns::from_header(reader.headers()?)?;
        debug!(
            "{:?}: {} frequency and {} score columns",
            path,
            columns.frequencies.len(),
            columns.scores.len()
        );

        Ok(AlleleTableRecords {
            reader,
            columns,
            row: StringRecord::new(),
            budget: ErrorBudget::new(path.display().to_string(), self.max_errors),
            done: false,
        })
    }
}

/// Lazy stream of allele records from one table
pub struct AlleleTableRecords {
    reader: csv::Reader<Box<dyn BufRead>>,
    columns: Columns,
    row: StringRecord,
    budget: ErrorBudget,
    done: bool,
}

impl AlleleTableRecords {
    fn parse_row(&self) -> Result<AlleleRecord, SourceError> {
        let cols = &self.columns;
        let cell = |idx: usize| self.row.get(idx).unwrap_or("");

        let chromosome = parse_chromosome(cell(cols.chrom))?;
        let position: u64 = cell(cols.pos)
            .trim()
            .parse()
            .map_err(|_| SourceError::InvalidValue(format!("POS={}", cell(cols.pos))))?;
        let key = VariantKey::normalized(chromosome, position, cell(cols.ref_allele), cell(cols.alt_allele))?;

        let mut record = AlleleRecord::from_key(key);
        if let Some(idx) = cols.rsid {
            let rsid = cell(idx).trim();
            if !is_missing(rsid) {
                record.rsid = Some(rsid.to_string());
            }
        }

        for &(idx, source) in &cols.frequencies {
            let value = cell(idx);
            if !is_missing(value) {
                record.frequencies.insert(source, parse_finite(source.tag(), value)?);
            }
        }
        for &(idx, source) in &cols.scores {
            let value = cell(idx);
            if !is_missing(value) {
                record.pathogenicity_scores.insert(source, parse_finite(source.tag(), value)?);
            }
        }

        Ok(record)
    }
}

impl Iterator for AlleleTableRecords {
    type Item = Result<AlleleRecord, SourceError>;

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
    use tempfile::tempdir;

    fn write_table(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alleles.tsv");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_reads_tags_and_missing_cells() {
        let (_dir, path) = write_table(
            "CHROM\tPOS\tREF\tALT\tRSID\tTOPMED\tGNOMAD_G_NFE\tREVEL\tNOTES\n\
             1\t12345\tA\tG\trs123\t0.12\t.\t0.731\tfoo\n\
             chrX\t500\tc\tt\t.\t\t3.5\t\tbar\n",
        );

        let records: Vec<AlleleRecord> = AlleleTableSource::new()
            .open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rsid.as_deref(), Some("rs123"));
        assert_eq!(records[0].frequencies.len(), 1);
        assert_eq!(records[0].frequencies[&FrequencySource::Topmed], 0.12);
        assert_eq!(records[0].pathogenicity_scores[&PathogenicitySource::Revel], 0.731);

        assert_eq!(records[1].chromosome, 23);
        assert_eq!(records[1].ref_allele, "C");
        assert!(records[1].rsid.is_none());
        assert_eq!(records[1].frequencies[&FrequencySource::GnomadGNfe], 3.5);
        assert!(records[1].pathogenicity_scores.is_empty());
    }

    #[test]
    fn test_keys_are_normalized() {
        let (_dir, path) = write_table("CHROM\tPOS\tREF\tALT\n1\t100\tCTT\tCT\n");
        let record = AlleleTableSource::new().open(&path).unwrap().next().unwrap().unwrap();
        assert_eq!((record.position, record.ref_allele.as_str(), record.alt_allele.as_str()), (100, "CT", "C"));
    }

    #[test]
    fn test_skips_malformed_rows() {
        let (_dir, path) = write_table(
            "CHROM\tPOS\tREF\tALT\tTOPMED\n\
             1\t100\tA\tG\t0.1\n\
             99\t100\tA\tG\t0.1\n\
             1\t101\tA\tG\tNaN\n\
             1\t102\tA\tG\t0.2\n",
        );

        let records: Vec<AlleleRecord> = AlleleTableSource::new()
            .open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let positions: Vec<u64> = records.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![100, 102]);
    }

    #[test]
    fn test_out_of_range_position_is_skipped() {
        let (_dir, path) = write_table(
            "CHROM\tPOS\tREF\tALT\n\
             1\t10000000000000000000\tA\tT\n\
             1\t9223372036854775807\tAC\tAG\n\
             1\t100\tA\tT\n",
        );

        let records: Vec<AlleleRecord> = AlleleTableSource::new()
            .with_max_errors(2)
            .open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].position, 100);
    }

    #[test]
    fn test_unplaced_contigs_do_not_exhaust_error_budget() {
        let mut contents = String::from("CHROM\tPOS\tREF\tALT\tTOPMED\n1\t100\tA\tG\t0.1\n");
        for pos in 1..=1001 {
            contents.push_str(&format!("GL000192.1\t{}\tA\tG\t0.1\n", pos));
        }
        contents.push_str("chrUn_gl000220\t5\tA\tC\t0.2\n2\t200\tC\tT\t0.3\n");
        let (_dir, path) = write_table(&contents);

        let records: Vec<AlleleRecord> = AlleleTableSource::new()
            .with_max_errors(0)
            .open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let sites: Vec<(u8, u64)> = records.iter().map(|r| (r.chromosome, r.position)).collect();
        assert_eq!(sites, vec![(1, 100), (2, 200)]);
    }

    #[test]
    fn test_too_many_errors() {
        let (_dir, path) = write_table("CHROM\tPOS\tREF\tALT\n1\tx\tA\tG\n1\ty\tA\tG\n1\t5\tA\tG\n");
        let results: Vec<_> = AlleleTableSource::new().with_max_errors(1).open(&path).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(SourceError::TooManyErrors { .. })));
    }

    #[test]
    fn test_missing_required_column() {
        let (_dir, path) = write_table("CHROM\tPOS\tREF\n1\t100\tA\n");
        assert!(matches!(
            AlleleTableSource::new().open(&path),
            Err(SourceError::MissingColumn(_))
        ));
    }
}
