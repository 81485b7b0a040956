// ==============================================================================
// sinks/dedup.rs - Structural Variant Dedup Sink
// ==============================================================================
// Description: Writes SV frequency records, dropping adjacent duplicates
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::Result;
use std::path::Path;

use super::line::LineSink;
use super::RecordSink;
use crate::structural::SvFrequencyRecord;

/// Drops a record when it matches the one written just before it
///
/// Input must be sorted so that duplicates are adjacent; only the previous
/// record is remembered. Output is created lazily and flushed per write.
pub struct SvDedupSink {
    output: LineSink<SvFrequencyRecord>,
    previous: Option<SvFrequencyRecord>,
    duplicates: u64,
}

impl SvDedupSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            output: LineSink::new(path),
            previous: None,
            duplicates: 0,
        }
    }

    /// Number of records dropped as duplicates so far
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

impl RecordSink<SvFrequencyRecord> for SvDedupSink {
    fn write(&mut self, record: &SvFrequencyRecord) -> Result<()> {
        if self
            .previous
            .as_ref()
            .is_some_and(|previous| previous.is_same_variant(record))
        {
            self.duplicates += 1;
            return Ok(());
        }

        self.output.write(record)?;
        self.previous = Some(record.clone());
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        self.output.count()
    }

    fn finish(&mut self) -> Result<()> {
        self.output.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structural::SvType;
    use tempfile::tempdir;

    fn sv(start: u64, db_var_id: &str, source: &str) -> SvFrequencyRecord {
        SvFrequencyRecord {
            chromosome: 7,
            start,
            end: start + 500,
            sv_length: 500,
            sv_type: SvType::Dup,
            db_var_id: db_var_id.to_string(),
            source: source.to_string(),
            source_id: format!("{}_{}", source, start),
            allele_count: 1,
            allele_number: 100,
            homozygotes: 0,
            frequency: 0.01,
        }
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_adjacent_duplicates_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sv.tsv");
        let mut sink = SvDedupSink::new(&path);

        let a = sv(100, "nssv1", "GNOMAD_SV");
        let a_again = sv(100, "nssv1", "DGV");
        let b = sv(200, "nssv2", "GNOMAD_SV");

        for record in [&a, &a_again, &b] {
            sink.write(record).unwrap();
        }
        sink.finish().unwrap();

        assert_eq!(sink.count().unwrap(), 2);
        assert_eq!(sink.duplicates(), 1);
        let written = lines(&path);
        assert_eq!(written.len(), 2);
        assert!(written[0].contains("nssv1"));
        assert!(written[1].contains("nssv2"));
    }

    #[test]
    fn test_non_adjacent_duplicates_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sv.tsv");
        let mut sink = SvDedupSink::new(&path);

        let a = sv(100, "nssv1", "GNOMAD_SV");
        let b = sv(200, "nssv2", "GNOMAD_SV");

        for record in [&a, &b, &a] {
            sink.write(record).unwrap();
        }
        sink.finish().unwrap();

        assert_eq!(sink.count().unwrap(), 3);
        assert_eq!(lines(&path).len(), 3);
    }

    #[test]
    fn test_output_created_lazily() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sv.tsv");
        let mut sink = SvDedupSink::new(&path);
        assert!(!path.exists());

        sink.write(&sv(100, "nssv1", "DGV")).unwrap();
        assert!(path.exists());
        sink.finish().unwrap();
    }
}
