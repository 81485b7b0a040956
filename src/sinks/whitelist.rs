// ==============================================================================
// sinks/whitelist.rs - Clinical Whitelist Sink
// ==============================================================================
// Description: Writes high-confidence pathogenic ClinVar alleles to a flat file
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated CHROM POS REF ALT INFO
//   INFO = VARIATIONID=<id>;CLNSIG=<term>;CLNREVSTAT=<term>;STARS=<n>
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{OutputWriter, RecordSink};
use crate::clinvar::ClinVarData;
use crate::merge::VariantRecord;
use crate::models::{AlleleRecord, VariantKey};

/// Minimum ClinVar star rating accepted into the whitelist
pub const MIN_STARS: u8 = 1;

/// Whitelist acceptance policy
///
/// A record is accepted when all hold:
/// 1. no secondary association / risk factor / other term
/// 2. primary term is pathogenic, likely pathogenic or pathogenic/likely pathogenic
/// 3. at least [`MIN_STARS`] review stars
/// 4. key is not on the exclusion list
pub fn is_whitelisted(key: &VariantKey, clinvar: &ClinVarData, exclusions: &HashSet<VariantKey>) -> bool {
    !clinvar.is_secondary_association_risk_factor_or_other()
        && clinvar.primary_interpretation.is_pathogenic_or_likely_pathogenic()
        && clinvar.stars() >= MIN_STARS
        && !exclusions.contains(key)
}

/// Render one accepted whitelist line
pub fn whitelist_line(key: &VariantKey, clinvar: &ClinVarData) -> String {
    format!(
        "{}\t{}\t{}\t{}\tVARIATIONID={};CLNSIG={};CLNREVSTAT={};STARS={}",
        key.chromosome,
        key.position,
        key.ref_allele,
        key.alt_allele,
        clinvar.variation_id,
        clinvar.primary_interpretation.clinvar_term(),
        clinvar.review_status.clinvar_term(),
        clinvar.stars()
    )
}

pub struct WhitelistSink {
    path: PathBuf,
    writer: Option<OutputWriter>,
    exclusions: HashSet<VariantKey>,
    accepted: u64,
}

impl WhitelistSink {
    /// Create the output file; an empty whitelist is still a valid product
    pub fn create(path: impl AsRef<Path>, exclusions: HashSet<VariantKey>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = OutputWriter::create(&path)?;
        Ok(Self {
            path,
            writer: Some(writer),
            exclusions,
            accepted: 0,
        })
    }
}

impl RecordSink<AlleleRecord> for WhitelistSink {
    fn write(&mut self, record: &AlleleRecord) -> Result<()> {
        let Some(clinvar) = record.clinvar.as_ref() else {
            return Ok(());
        };

        let key = record.variant_key();
        if !is_whitelisted(&key, clinvar, &self.exclusions) {
            return Ok(());
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Whitelist {:?} already closed", self.path))?;
        writer
            .write_line(&whitelist_line(&key, clinvar))
            .with_context(|| format!("Failed to write whitelist {:?}", self.path))?;

        self.accepted += 1;
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.accepted)
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finish()
                .with_context(|| format!("Failed to close whitelist {:?}", self.path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinvar::{ClinSig, ReviewStatus};
    use tempfile::tempdir;

    fn clinvar_record(key: VariantKey, sig: ClinSig, review: ReviewStatus) -> AlleleRecord {
        let mut record = AlleleRecord::from_key(key);
        record.clinvar = Some(ClinVarData::new("12345", 67890, sig, review));
        record
    }

    fn run(records: &[AlleleRecord], exclusions: HashSet<VariantKey>) -> (u64, Vec<String>) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("whitelist.tsv");
        let mut sink = WhitelistSink::create(&path, exclusions).unwrap();
        for record in records {
            sink.write(record).unwrap();
        }
        sink.finish().unwrap();

        let lines = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (sink.count().unwrap(), lines)
    }

    #[test]
    fn test_benign_emits_nothing() {
        let record = clinvar_record(
            VariantKey::new(1, 100, "A", "T"),
            ClinSig::Benign,
            ReviewStatus::ReviewedByExpertPanel,
        );
        let (count, lines) = run(&[record], HashSet::new());
        assert_eq!(count, 0);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_pathogenic_two_star_emits_one_line() {
        let record = clinvar_record(
            VariantKey::new(1, 100, "A", "T"),
            ClinSig::Pathogenic,
            ReviewStatus::CriteriaProvidedMultipleSubmittersNoConflicts,
        );
        let (count, lines) = run(&[record], HashSet::new());
        assert_eq!(count, 1);
        assert_eq!(lines.len(), 1);

        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(&fields[..4], &["1", "100", "A", "T"]);
        assert_eq!(
            fields[4],
            "VARIATIONID=12345;CLNSIG=Pathogenic;CLNREVSTAT=criteria_provided,_multiple_submitters,_no_conflicts;STARS=2"
        );
    }

    #[test]
    fn test_zero_stars_rejected() {
        let record = clinvar_record(
            VariantKey::new(1, 100, "A", "T"),
            ClinSig::LikelyPathogenic,
            ReviewStatus::NoAssertionCriteriaProvided,
        );
        let (count, _) = run(&[record], HashSet::new());
        assert_eq!(count, 0);
    }

    #[test]
    fn test_secondary_flags_rejected() {
        for flag in [ClinSig::RiskFactor, ClinSig::Association, ClinSig::Other] {
            let mut record = clinvar_record(
                VariantKey::new(1, 100, "A", "T"),
                ClinSig::Pathogenic,
                ReviewStatus::ReviewedByExpertPanel,
            );
            if let Some(clinvar) = record.clinvar.as_mut() {
                clinvar.secondary_interpretations.insert(flag);
            }
            let (count, lines) = run(&[record], HashSet::new());
            assert_eq!(count, 0, "{:?}", flag);
            assert!(lines.is_empty(), "{:?}", flag);
        }
    }

    #[test]
    fn test_other_secondary_terms_do_not_block() {
        let mut record = clinvar_record(
            VariantKey::new(1, 100, "A", "T"),
            ClinSig::LikelyPathogenic,
            ReviewStatus::CriteriaProvidedSingleSubmitter,
        );
        if let Some(clinvar) = record.clinvar.as_mut() {
            clinvar.secondary_interpretations.insert(ClinSig::DrugResponse);
        }
        let (count, _) = run(&[record], HashSet::new());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_excluded_key_rejected() {
        let key = VariantKey::new(2, 500, "G", "C");
        let excluded = clinvar_record(key.clone(), ClinSig::Pathogenic, ReviewStatus::PracticeGuideline);
        let kept = clinvar_record(
            VariantKey::new(2, 501, "G", "C"),
            ClinSig::PathogenicOrLikelyPathogenic,
            ReviewStatus::CriteriaProvidedSingleSubmitter,
        );

        let (count, lines) = run(&[excluded, kept], HashSet::from([key]));
        assert_eq!(count, 1);
        assert!(lines[0].starts_with("2\t501\tG\tC\t"));
    }

    #[test]
    fn test_record_without_clinvar_ignored() {
        let record = AlleleRecord::from_key(VariantKey::new(1, 100, "A", "T"));
        let (count, lines) = run(&[record], HashSet::new());
        assert_eq!(count, 0);
        assert!(lines.is_empty());
    }
}
