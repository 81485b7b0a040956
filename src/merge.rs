// ==============================================================================
// merge.rs - Key Derivation and Properties Merge
// ==============================================================================
// Description: Turns source records into (key, properties) pairs and merges
//              properties arriving for the same key from different resources
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use crate::models::{AlleleRecord, VariantKey, VariantProperties};

/// A record that can be written into the variant store
pub trait VariantRecord {
    /// Canonical identity of the record
    fn variant_key(&self) -> VariantKey;

    /// Annotation payload in stored form
    fn to_properties(&self) -> VariantProperties;
}

impl VariantRecord for AlleleRecord {
    fn variant_key(&self) -> VariantKey {
        VariantKey::new(
            self.chromosome,
            self.position,
            self.ref_allele.as_str(),
            self.alt_allele.as_str(),
        )
    }

    fn to_properties(&self) -> VariantProperties {
        VariantProperties {
            rsid: self.rsid.clone(),
            frequencies: self.frequencies.clone(),
            pathogenicity_scores: self.pathogenicity_scores.clone(),
            clinvar: self.clinvar.clone(),
        }
    }
}

/// Merge properties arriving for a key that is already stored
///
/// - rsID: existing wins unless it is missing or empty
/// - frequencies and pathogenicity scores: union, incoming wins per source tag
/// - clinical data: first writer wins
///
/// Equal inputs are returned unchanged.
pub fn merge(existing: VariantProperties, incoming: VariantProperties) -> VariantProperties {
    if existing == incoming {
        return existing;
    }

    let keep_rsid = existing.has_rsid();
    let VariantProperties {
        rsid,
        mut frequencies,
        mut pathogenicity_scores,
        clinvar,
    } = existing;

    let rsid = if keep_rsid { rsid } else { incoming.rsid.or(rsid) };

    frequencies.extend(incoming.frequencies);
    pathogenicity_scores.extend(incoming.pathogenicity_scores);

    VariantProperties {
        rsid,
        frequencies,
        pathogenicity_scores,
        clinvar: clinvar.or(incoming.clinvar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinvar::{ClinSig, ClinVarData, ReviewStatus};
    use crate::models::{FrequencySource, PathogenicitySource};

    fn props(rsid: Option<&str>, freqs: &[(FrequencySource, f32)]) -> VariantProperties {
        VariantProperties {
            rsid: rsid.map(str::to_string),
            frequencies: freqs.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn clinvar(variation_id: &str, sig: ClinSig) -> ClinVarData {
        ClinVarData::new(variation_id, 1, sig, ReviewStatus::CriteriaProvidedSingleSubmitter)
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut p = props(Some("rs1"), &[(FrequencySource::Topmed, 0.1), (FrequencySource::Uk10k, 2.5)]);
        p.pathogenicity_scores.insert(PathogenicitySource::Revel, 0.7);
        p.clinvar = Some(clinvar("100", ClinSig::Pathogenic));

        assert_eq!(merge(p.clone(), p.clone()), p);
        assert_eq!(merge(VariantProperties::default(), VariantProperties::default()), VariantProperties::default());
    }

    #[test]
    fn test_incoming_wins_per_source() {
        let existing = props(None, &[(FrequencySource::Topmed, 0.1), (FrequencySource::EspAll, 1.0)]);
        let incoming = props(None, &[(FrequencySource::Topmed, 0.3), (FrequencySource::GnomadGNfe, 0.2)]);

        let merged = merge(existing, incoming);
        assert_eq!(merged.frequencies.len(), 3);
        assert_eq!(merged.frequencies[&FrequencySource::Topmed], 0.3);
        assert_eq!(merged.frequencies[&FrequencySource::EspAll], 1.0);
        assert_eq!(merged.frequencies[&FrequencySource::GnomadGNfe], 0.2);
    }

    #[test]
    fn test_pathogenicity_merges_independently() {
        let mut existing = props(None, &[(FrequencySource::Topmed, 0.1)]);
        existing.pathogenicity_scores.insert(PathogenicitySource::Sift, 0.01);
        existing.pathogenicity_scores.insert(PathogenicitySource::Revel, 0.5);

        let mut incoming = VariantProperties::default();
        incoming.pathogenicity_scores.insert(PathogenicitySource::Revel, 0.9);
        incoming.pathogenicity_scores.insert(PathogenicitySource::Cadd, 25.0);

        let merged = merge(existing, incoming);
        assert_eq!(merged.frequencies[&FrequencySource::Topmed], 0.1);
        assert_eq!(merged.pathogenicity_scores.len(), 3);
        assert_eq!(merged.pathogenicity_scores[&PathogenicitySource::Sift], 0.01);
        assert_eq!(merged.pathogenicity_scores[&PathogenicitySource::Revel], 0.9);
        assert_eq!(merged.pathogenicity_scores[&PathogenicitySource::Cadd], 25.0);
    }

    #[test]
    fn test_rsid_existing_wins_unless_empty() {
        let merged = merge(props(Some("rs1"), &[]), props(Some("rs2"), &[(FrequencySource::Topmed, 1.0)]));
        assert_eq!(merged.rsid.as_deref(), Some("rs1"));

        let merged = merge(props(None, &[]), props(Some("rs2"), &[]));
        assert_eq!(merged.rsid.as_deref(), Some("rs2"));

        let merged = merge(props(Some(""), &[]), props(Some("rs2"), &[]));
        assert_eq!(merged.rsid.as_deref(), Some("rs2"));

        let merged = merge(props(Some("rs1"), &[]), props(None, &[(FrequencySource::Topmed, 1.0)]));
        assert_eq!(merged.rsid.as_deref(), Some("rs1"));
    }

    #[test]
    fn test_clinical_first_writer_wins() {
        let without = props(Some("rs1"), &[]);
        let mut with_first = VariantProperties::default();
        with_first.clinvar = Some(clinvar("100", ClinSig::Pathogenic));
        let mut with_second = VariantProperties::default();
        with_second.clinvar = Some(clinvar("200", ClinSig::Benign));

        let merged = merge(without, with_first.clone());
        assert_eq!(merged.clinvar, with_first.clinvar);

        let merged = merge(merged, with_second);
        assert_eq!(merged.clinvar, with_first.clinvar);
    }

    #[test]
    fn test_merge_order_independent_for_distinct_sources() {
        let a = props(Some("rs1"), &[(FrequencySource::Topmed, 0.1)]);
        let b = props(None, &[(FrequencySource::Uk10k, 0.2)]);
        let c = props(None, &[(FrequencySource::EspAll, 0.3)]);

        let left = merge(merge(a.clone(), b.clone()), c.clone());
        let right = merge(a, merge(b, c));
        assert_eq!(left, right);
    }

    #[test]
    fn test_allele_record_projection() {
        let mut record = AlleleRecord::from_key(VariantKey::new(1, 100, "A", "T"));
        record.rsid = Some("rs1".to_string());
        record.frequencies.insert(FrequencySource::Topmed, 0.1);

        assert_eq!(record.variant_key(), VariantKey::new(1, 100, "A", "T"));
        let properties = record.to_properties();
        assert_eq!(properties.rsid.as_deref(), Some("rs1"));
        assert_eq!(properties.frequencies[&FrequencySource::Topmed], 0.1);
        assert!(properties.clinvar.is_none());
    }
}
