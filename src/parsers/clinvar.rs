// ==============================================================================
// parsers/clinvar.rs - ClinVar VCF Source
// ==============================================================================
// Description: Streams clinical-significance records from ClinVar-style VCFs
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Fields used:
//   ID          variation id
//   ALLELEID    allele id
//   CLNSIG      primary term, then "|" or "," separated secondary terms
//   CLNREVSTAT  review status
//   CLNSIGINCL  included alleles, "<allele id>:<term>|..."
//   RS          dbSNP id without the "rs" prefix
// ==============================================================================

use noodles_vcf as vcf;
use noodles_vcf::variant::record::Ids;
use std::path::Path;
use tracing::debug;

use super::vcf::{alternate_alleles, info_value, site, VcfRecordParser, VcfRecords};
use super::{is_missing, SourceError, DEFAULT_MAX_ERRORS};
use crate::clinvar::{ClinSig, ClinVarData, ReviewStatus};
use crate::models::{is_symbolic_allele, AlleleRecord, VariantKey};

/// Parses ClinVar INFO fields into [`ClinVarData`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinVarFields;

/// ClinVar adds terms over time; anything unrecognised is treated as "other"
fn clinsig_or_other(term: &str) -> ClinSig {
    term.parse().unwrap_or_else(|_| {
        debug!("Unrecognised CLNSIG term {:?}, treating as other", term);
        ClinSig::Other
    })
}

/// Split CLNSIG into the primary term and the secondary terms
pub fn parse_clnsig(value: &str) -> Option<(ClinSig, Vec<ClinSig>)> {
    let mut terms = value
        .split(['|', ','])
        .map(str::trim)
        .filter(|term| !term.is_empty() && *term != "_");
    let primary = clinsig_or_other(terms.next()?);
    let secondary = terms.map(clinsig_or_other).collect();
    Some((primary, secondary))
}

impl VcfRecordParser for ClinVarFields {
    fn parse(&self, record: &vcf::Record) -> Result<Vec<AlleleRecord>, SourceError> {
        let info_field = record.info();
        let info: &str = info_field.as_ref();

        // Records carrying only somatic or oncogenicity classifications
        let Some((primary, secondary)) = info_value(info, "CLNSIG").and_then(parse_clnsig) else {
            return Ok(Vec::new());
        };

        let (chromosome, position) = site(record)?;
        let ref_allele = record.reference_bases().to_string();

        let variation_id = record
            .ids()
            .iter()
            .next()
            .map(str::to_string)
            .ok_or_else(|| SourceError::MissingField("ID".to_string()))?;

        let allele_id_raw = info_value(info, "ALLELEID")
            .ok_or_else(|| SourceError::MissingField("ALLELEID".to_string()))?;
        let allele_id: u64 = allele_id_raw
            .parse()
            .map_err(|_| SourceError::InvalidValue(format!("ALLELEID={}", allele_id_raw)))?;

        let review_status: ReviewStatus = info_value(info, "CLNREVSTAT")
            .ok_or_else(|| SourceError::MissingField("CLNREVSTAT".to_string()))?
            .parse()?;

        let mut clinvar = ClinVarData::new(variation_id, allele_id, primary, review_status);
        clinvar.secondary_interpretations.extend(secondary);

        if let Some(included) = info_value(info, "CLNSIGINCL") {
            for entry in included.split('|').filter(|e| !is_missing(e)) {
                let (id, term) = entry
                    .split_once(':')
                    .ok_or_else(|| SourceError::InvalidValue(format!("CLNSIGINCL={}", included)))?;
                let id: u64 = id
                    .parse()
                    .map_err(|_| SourceError::InvalidValue(format!("CLNSIGINCL={}", included)))?;
                clinvar.included_alleles.insert(id, clinsig_or_other(term));
            }
        }

        let rsid = info_value(info, "RS")
            .and_then(|rs| rs.split(['|', ',']).next())
            .filter(|rs| !is_missing(rs))
            .map(|rs| format!("rs{}", rs.trim()));

        let mut records = Vec::new();
        for alt in alternate_alleles(record)? {
            if is_symbolic_allele(&alt) {
                continue;
            }
            let key = VariantKey::normalized(chromosome, position, &ref_allele, &alt)?;
            let mut allele = AlleleRecord::from_key(key);
            allele.rsid = rsid.clone();
            allele.clinvar = Some(clinvar.clone());
            records.push(allele);
        }

        Ok(records)
    }
}

/// ClinVar VCF reader configuration
#[derive(Debug, Clone)]
pub struct ClinVarVcfSource {
    pub max_errors: usize,
}

pub type ClinVarRecords = VcfRecords<ClinVarFields>;

impl Default for ClinVarVcfSource {
    fn default() -> Self {
        Self {
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

impl ClinVarVcfSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_errors(mut self, max: usize) -> Self {
        self.max_errors = max;
        self
    }

    pub fn open(&self, path: impl AsRef<Path>) -> Result<ClinVarRecords, SourceError> {
        VcfRecords::open(path, ClinVarFields, self.max_errors)
    }
}
