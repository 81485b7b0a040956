// ==============================================================================
// parsers/vcf.rs - VCF record sources
// ==============================================================================
// Description: Lazy VCF reading using noodles-vcf, plus the population
//              frequency VCF source built on it
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// ==============================================================================

use noodles_vcf as vcf;
use noodles_vcf::variant::record::{AlternateBases, Ids};
use std::collections::{BTreeMap, VecDeque};
use std::io::BufRead;
use std::path::Path;

use super::{is_missing, open_text, parse_finite, ErrorBudget, SourceError, DEFAULT_MAX_ERRORS};
use crate::models::{is_symbolic_allele, parse_chromosome, AlleleRecord, FrequencySource, VariantKey};

/// Turns one VCF data line into zero or more allele records
pub trait VcfRecordParser {
    fn parse(&self, record: &vcf::Record) -> Result<Vec<AlleleRecord>, SourceError>;
}

/// Lazy stream of allele records from one VCF file
///
/// Multi-allelic lines are expanded into one record per ALT and handed out
/// one at a time.
pub struct VcfRecords<P> {
    reader: vcf::io::Reader<Box<dyn BufRead>>,
    record: vcf::Record,
    parser: P,
    pending: VecDeque<AlleleRecord>,
    budget: ErrorBudget,
    line: u64,
    done: bool,
}

impl<P: VcfRecordParser> VcfRecords<P> {
    /// Open a VCF (plain or gzip/BGZF) and consume its header
    pub fn open(path: impl AsRef<Path>, parser: P, max_errors: usize) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let mut reader = vcf::io::Reader::new(open_text(path)?);
        reader
            .read_header()
            .map_err(|e| SourceError::Header(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            reader,
            record: vcf::Record::default(),
            parser,
            pending: VecDeque::new(),
            budget: ErrorBudget::new(path.display().to_string(), max_errors),
            line: 0,
            done: false,
        })
    }
}

impl<P: VcfRecordParser> Iterator for VcfRecords<P> {
    type Item = Result<AlleleRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }

            match self.reader.read_record(&mut self.record) {
                Ok(0) => {
                    self.done = true;
                    self.budget.finish();
                    return None;
                }
                Ok(_) => {
                    self.line += 1;
                    match self.parser.parse(&self.record) {
                        Ok(records) => self.pending.extend(records),
                        Err(e) => {
                            if let Err(fatal) = self.budget.skip(self.line, &e) {
                                self.done = true;
                                return Some(Err(fatal));
                            }
                        }
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(SourceError::Io(e)));
                }
            }
        }
    }
}

/// Chromosome and 1-based position of a VCF line
pub(crate) fn site(record: &vcf::Record) -> Result<(u8, u64), SourceError> {
    let chromosome = parse_chromosome(record.reference_sequence_name())?;
    let position = match record.variant_start() {
        Some(Ok(pos)) => usize::from(pos) as u64,
        Some(Err(e)) => return Err(SourceError::InvalidValue(format!("POS: {}", e))),
        None => return Err(SourceError::MissingField("POS".to_string())),
    };
    Ok((chromosome, position))
}

/// ALT alleles in column order
pub(crate) fn alternate_alleles(record: &vcf::Record) -> Result<Vec<String>, SourceError> {
    record
        .alternate_bases()
        .iter()
        .map(|alt| {
            alt.map(str::to_string)
                .map_err(|e| SourceError::InvalidValue(format!("ALT: {}", e)))
        })
        .collect()
}

/// First ID that looks like a dbSNP rsID
pub(crate) fn rsid_from_ids(record: &vcf::Record) -> Option<String> {
    record
        .ids()
        .iter()
        .find(|id| id.starts_with("rs"))
        .map(str::to_string)
}

/// Raw value of an INFO key; flags yield an empty string
pub(crate) fn info_value<'a>(info: &'a str, key: &str) -> Option<&'a str> {
    info.split(';').find_map(|field| match field.split_once('=') {
        Some((k, v)) if k == key => Some(v),
        None if field == key => Some(""),
        _ => None,
    })
}

/// INFO-key to frequency-source mapping for a frequency VCF
#[derive(Debug, Clone)]
pub struct FrequencyFields {
    fields: BTreeMap<String, FrequencySource>,
}

impl VcfRecordParser for FrequencyFields {
    fn parse(&self, record: &vcf::Record) -> Result<Vec<AlleleRecord>, SourceError> {
        let (chromosome, position) = site(record)?;
        let ref_allele = record.reference_bases().to_string();
        let rsid = rsid_from_ids(record);
        let info_field = record.info();
        let info: &str = info_field.as_ref();

        let mut records = Vec::new();
        for (index, alt) in alternate_alleles(record)?.iter().enumerate() {
            if is_symbolic_allele(alt) {
                continue;
            }

            let key = VariantKey::normalized(chromosome, position, &ref_allele, alt)?;
            let mut allele = AlleleRecord::from_key(key);
            allele.rsid = rsid.clone();

            for (info_key, source) in &self.fields {
                // Number=A: one value per ALT, in ALT order
                let Some(value) = info_value(info, info_key).and_then(|v| v.split(',').nth(index)) else {
                    continue;
                };
                if is_missing(value) {
                    continue;
                }
                let fraction = parse_finite(info_key, value)?;
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(SourceError::InvalidValue(format!(
                        "{}={} (allele fraction must be 0-1)",
                        info_key, value
                    )));
                }
                allele.frequencies.insert(*source, fraction * 100.0);
            }

            records.push(allele);
        }

        Ok(records)
    }
}

/// Population frequency VCF reader configuration
#[derive(Debug, Clone)]
pub struct FrequencyVcfSource {
    pub info_fields: BTreeMap<String, FrequencySource>,
    pub max_errors: usize,
}

pub type FrequencyVcfRecords = VcfRecords<FrequencyFields>;

impl FrequencyVcfSource {
    /// `info_fields` maps INFO keys (e.g. "AF_nfe") to the source tag they fill
    pub fn new(info_fields: BTreeMap<String, FrequencySource>) -> Self {
        Self {
            info_fields,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }

    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<FrequencyVcfRecords, SourceError> {
        let parser = FrequencyFields {
            fields: self.info_fields.clone(),
        };
        VcfRecords::open(path, parser, self.max_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
##INFO=<ID=AF_nfe,Number=A,Type=Float,Description=\"NFE allele frequency\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

    fn write_vcf(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("freq.vcf");
        std::fs::write(&path, format!("{}{}", HEADER, body)).unwrap();
        (dir, path)
    }

    fn source() -> FrequencyVcfSource {
        let mut fields = BTreeMap::new();
        fields.insert("AF".to_string(), FrequencySource::Topmed);
        fields.insert("AF_nfe".to_string(), FrequencySource::GnomadGNfe);
        FrequencyVcfSource::new(fields)
    }

    #[test]
    fn test_info_value() {
        assert_eq!(info_value("AF=0.1;DB;AC=3", "AF"), Some("0.1"));
        assert_eq!(info_value("AF=0.1;DB;AC=3", "DB"), Some(""));
        assert_eq!(info_value("AF_nfe=0.2;AF=0.1", "AF"), Some("0.1"));
        assert_eq!(info_value("AF=0.1", "AC"), None);
    }

    #[test]
    fn test_frequencies_become_percentages() {
        let (_dir, path) = write_vcf("1\t100\trs1\tA\tG\t.\tPASS\tAF=0.25;AF_nfe=0.5\n");
        let records: Vec<AlleleRecord> = source().open(&path).unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rsid.as_deref(), Some("rs1"));
        assert_eq!(records[0].frequencies[&FrequencySource::Topmed], 25.0);
        assert_eq!(records[0].frequencies[&FrequencySource::GnomadGNfe], 50.0);
    }

    #[test]
    fn test_multiallelic_split_by_alt_index() {
        let (_dir, path) = write_vcf("chr2\t200\t.\tCA\tC,CAA,<DEL>\t.\tPASS\tAF=0.1,0.2,0.3;AF_nfe=.,0.4,0.5\n");
        let records: Vec<AlleleRecord> = source().open(&path).unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.rsid.is_none()));

        assert_eq!((records[0].position, records[0].ref_allele.as_str(), records[0].alt_allele.as_str()), (200, "CA", "C"));
        assert!((records[0].frequencies[&FrequencySource::Topmed] - 10.0).abs() < 1e-4);
        assert!(!records[0].frequencies.contains_key(&FrequencySource::GnomadGNfe));

        assert_eq!((records[1].position, records[1].ref_allele.as_str(), records[1].alt_allele.as_str()), (200, "C", "CA"));
        assert!((records[1].frequencies[&FrequencySource::Topmed] - 20.0).abs() < 1e-4);
        assert!((records[1].frequencies[&FrequencySource::GnomadGNfe] - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let (_dir, path) = write_vcf(
            "1\t100\t.\tA\tG\t.\tPASS\tAF=0.1\n\
             1\t101\t.\tA\tG\t.\tPASS\tAF=nan\n\
             1\t102\t.\tA\tG\t.\tPASS\tAF=1.5\n\
             30\t103\t.\tA\tG\t.\tPASS\tAF=0.1\n\
             1\t104\t.\tA\tG\t.\tPASS\tAF=0.1\n",
        );
        let records: Vec<AlleleRecord> = source().open(&path).unwrap().collect::<Result<_, _>>().unwrap();
        let positions: Vec<u64> = records.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![100, 104]);

        let results: Vec<_> = source().with_max_errors(2).open(&path).unwrap().collect();
        assert!(matches!(results.last(), Some(Err(SourceError::TooManyErrors { .. }))));
    }
}
