// ==============================================================================
// clinvar.rs - Clinical Significance Models
// ==============================================================================
// Description: ClinVar classification terms, review status and star ratings
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// References:
// - ClinVar review status: https://www.ncbi.nlm.nih.gov/clinvar/docs/review_status/
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClinVarTermError {
    #[error("Unknown clinical significance: {0}")]
    UnknownSignificance(String),

    #[error("Unknown review status: {0}")]
    UnknownReviewStatus(String),
}

/// ClinVar clinical significance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinSig {
    Benign,
    BenignOrLikelyBenign,
    LikelyBenign,
    UncertainSignificance,
    LikelyPathogenic,
    PathogenicOrLikelyPathogenic,
    Pathogenic,
    ConflictingPathogenicityInterpretations,
    Affects,
    Association,
    DrugResponse,
    NotProvided,
    Other,
    Protective,
    RiskFactor,
}

impl ClinSig {
    /// Term as written in ClinVar VCF `CLNSIG`
    pub fn clinvar_term(&self) -> &'static str {
        match self {
            ClinSig::Benign => "Benign",
            ClinSig::BenignOrLikelyBenign => "Benign/Likely_benign",
            ClinSig::LikelyBenign => "Likely_benign",
            ClinSig::UncertainSignificance => "Uncertain_significance",
            ClinSig::LikelyPathogenic => "Likely_pathogenic",
            ClinSig::PathogenicOrLikelyPathogenic => "Pathogenic/Likely_pathogenic",
            ClinSig::Pathogenic => "Pathogenic",
            ClinSig::ConflictingPathogenicityInterpretations => {
                "Conflicting_interpretations_of_pathogenicity"
            }
            ClinSig::Affects => "Affects",
            ClinSig::Association => "association",
            ClinSig::DrugResponse => "drug_response",
            ClinSig::NotProvided => "not_provided",
            ClinSig::Other => "other",
            ClinSig::Protective => "protective",
            ClinSig::RiskFactor => "risk_factor",
        }
    }

    pub fn is_pathogenic_or_likely_pathogenic(&self) -> bool {
        matches!(
            self,
            ClinSig::Pathogenic | ClinSig::LikelyPathogenic | ClinSig::PathogenicOrLikelyPathogenic
        )
    }
}

impl FromStr for ClinSig {
    type Err = ClinVarTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let term = s.trim().trim_start_matches('_').to_ascii_lowercase().replace(' ', "_");
        let sig = match term.as_str() {
            "benign" => ClinSig::Benign,
            "benign/likely_benign" => ClinSig::BenignOrLikelyBenign,
            "likely_benign" => ClinSig::LikelyBenign,
            "uncertain_significance" => ClinSig::UncertainSignificance,
            "likely_pathogenic" => ClinSig::LikelyPathogenic,
            "pathogenic/likely_pathogenic" => ClinSig::PathogenicOrLikelyPathogenic,
            "pathogenic" => ClinSig::Pathogenic,
            "conflicting_interpretations_of_pathogenicity"
            | "conflicting_classifications_of_pathogenicity" => {
                ClinSig::ConflictingPathogenicityInterpretations
            }
            "affects" => ClinSig::Affects,
            "association" => ClinSig::Association,
            "drug_response" => ClinSig::DrugResponse,
            "not_provided" => ClinSig::NotProvided,
            "other" => ClinSig::Other,
            "protective" => ClinSig::Protective,
            "risk_factor" => ClinSig::RiskFactor,
            _ => return Err(ClinVarTermError::UnknownSignificance(s.to_string())),
        };
        Ok(sig)
    }
}

impl fmt::Display for ClinSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.clinvar_term())
    }
}

/// ClinVar review status, ordered from least to most confident
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    NoAssertionProvided,
    NoAssertionCriteriaProvided,
    NoInterpretationForSingleVariant,
    NoClassificationProvided,
    CriteriaProvidedConflictingInterpretations,
    CriteriaProvidedSingleSubmitter,
    CriteriaProvidedMultipleSubmittersNoConflicts,
    ReviewedByExpertPanel,
    PracticeGuideline,
}

impl ReviewStatus {
    /// ClinVar gold-star rating (0-4)
    pub fn stars(&self) -> u8 {
        match self {
            ReviewStatus::PracticeGuideline => 4,
            ReviewStatus::ReviewedByExpertPanel => 3,
            ReviewStatus::CriteriaProvidedMultipleSubmittersNoConflicts => 2,
            ReviewStatus::CriteriaProvidedSingleSubmitter
            | ReviewStatus::CriteriaProvidedConflictingInterpretations => 1,
            ReviewStatus::NoAssertionProvided
            | ReviewStatus::NoAssertionCriteriaProvided
            | ReviewStatus::NoInterpretationForSingleVariant
            | ReviewStatus::NoClassificationProvided => 0,
        }
    }

    /// Term as written in ClinVar VCF `CLNREVSTAT`
    pub fn clinvar_term(&self) -> &'static str {
        match self {
            ReviewStatus::NoAssertionProvided => "no_assertion_provided",
            ReviewStatus::NoAssertionCriteriaProvided => "no_assertion_criteria_provided",
            ReviewStatus::NoInterpretationForSingleVariant => {
                "no_interpretation_for_the_single_variant"
            }
            ReviewStatus::NoClassificationProvided => "no_classification_provided",
            ReviewStatus::CriteriaProvidedConflictingInterpretations => {
                "criteria_provided,_conflicting_interpretations"
            }
            ReviewStatus::CriteriaProvidedSingleSubmitter => "criteria_provided,_single_submitter",
            ReviewStatus::CriteriaProvidedMultipleSubmittersNoConflicts => {
                "criteria_provided,_multiple_submitters,_no_conflicts"
            }
            ReviewStatus::ReviewedByExpertPanel => "reviewed_by_expert_panel",
            ReviewStatus::PracticeGuideline => "practice_guideline",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = ClinVarTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ClinVar writes "criteria_provided,_single_submitter"; web exports use spaces
        let term: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let status = match term.as_str() {
            "noassertionprovided" => ReviewStatus::NoAssertionProvided,
            "noassertioncriteriaprovided" => ReviewStatus::NoAssertionCriteriaProvided,
            "nointerpretationforthesinglevariant" | "nointerpretationforsinglevariant" => {
                ReviewStatus::NoInterpretationForSingleVariant
            }
            "noclassificationprovided" | "noclassificationforthesinglevariant" => {
                ReviewStatus::NoClassificationProvided
            }
            "criteriaprovidedconflictinginterpretations"
            | "criteriaprovidedconflictingclassifications" => {
                ReviewStatus::CriteriaProvidedConflictingInterpretations
            }
            "criteriaprovidedsinglesubmitter" => ReviewStatus::CriteriaProvidedSingleSubmitter,
            "criteriaprovidedmultiplesubmittersnoconflicts" => {
                ReviewStatus::CriteriaProvidedMultipleSubmittersNoConflicts
            }
            "reviewedbyexpertpanel" => ReviewStatus::ReviewedByExpertPanel,
            "practiceguideline" => ReviewStatus::PracticeGuideline,
            _ => return Err(ClinVarTermError::UnknownReviewStatus(s.to_string())),
        };
        Ok(status)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.clinvar_term())
    }
}

/// Clinical-significance record for one allele
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinVarData {
    /// ClinVar variation identifier (VCF ID column)
    pub variation_id: String,

    /// ClinVar allele identifier (ALLELEID)
    pub allele_id: u64,

    pub primary_interpretation: ClinSig,

    pub secondary_interpretations: BTreeSet<ClinSig>,

    pub review_status: ReviewStatus,

    /// Classifications of alleles included in this record (CLNSIGINCL)
    pub included_alleles: BTreeMap<u64, ClinSig>,
}

impl ClinVarData {
    pub fn new(variation_id: impl Into<String>, allele_id: u64, primary: ClinSig, review: ReviewStatus) -> Self {
        Self {
            variation_id: variation_id.into(),
            allele_id,
            primary_interpretation: primary,
            secondary_interpretations: BTreeSet::new(),
            review_status: review,
            included_alleles: BTreeMap::new(),
        }
    }

    pub fn stars(&self) -> u8 {
        self.review_status.stars()
    }

    /// True when a secondary term marks this as a risk factor, association or "other"
    pub fn is_secondary_association_risk_factor_or_other(&self) -> bool {
        self.secondary_interpretations.iter().any(|sig| {
            matches!(sig, ClinSig::Association | ClinSig::RiskFactor | ClinSig::Other)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clinsig_terms() {
        assert_eq!("Pathogenic".parse::<ClinSig>().unwrap(), ClinSig::Pathogenic);
        assert_eq!(
            "Pathogenic/Likely_pathogenic".parse::<ClinSig>().unwrap(),
            ClinSig::PathogenicOrLikelyPathogenic
        );
        assert_eq!("_risk_factor".parse::<ClinSig>().unwrap(), ClinSig::RiskFactor);
        assert_eq!("Likely pathogenic".parse::<ClinSig>().unwrap(), ClinSig::LikelyPathogenic);
        assert_eq!(
            "Conflicting_classifications_of_pathogenicity".parse::<ClinSig>().unwrap(),
            ClinSig::ConflictingPathogenicityInterpretations
        );
        assert!("Mostly_harmless".parse::<ClinSig>().is_err());
    }

    #[test]
    fn test_review_status_stars() {
        let status: ReviewStatus = "criteria_provided,_multiple_submitters,_no_conflicts".parse().unwrap();
        assert_eq!(status, ReviewStatus::CriteriaProvidedMultipleSubmittersNoConflicts);
        assert_eq!(status.stars(), 2);

        let status: ReviewStatus = "reviewed by expert panel".parse().unwrap();
        assert_eq!(status.stars(), 3);

        let status: ReviewStatus = "no_assertion_criteria_provided".parse().unwrap();
        assert_eq!(status.stars(), 0);

        assert_eq!(ReviewStatus::PracticeGuideline.stars(), 4);
        assert!("peer_reviewed".parse::<ReviewStatus>().is_err());
    }

    #[test]
    fn test_review_status_terms_round_trip() {
        let all = [
            ReviewStatus::NoAssertionProvided,
            ReviewStatus::NoAssertionCriteriaProvided,
            ReviewStatus::NoInterpretationForSingleVariant,
            ReviewStatus::NoClassificationProvided,
            ReviewStatus::CriteriaProvidedConflictingInterpretations,
            ReviewStatus::CriteriaProvidedSingleSubmitter,
            ReviewStatus::CriteriaProvidedMultipleSubmittersNoConflicts,
            ReviewStatus::ReviewedByExpertPanel,
            ReviewStatus::PracticeGuideline,
        ];
        for status in all {
            assert_eq!(status.clinvar_term().parse::<ReviewStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_secondary_flags() {
        let mut data = ClinVarData::new("12345", 67890, ClinSig::Pathogenic, ReviewStatus::ReviewedByExpertPanel);
        assert!(!data.is_secondary_association_risk_factor_or_other());

        data.secondary_interpretations.insert(ClinSig::DrugResponse);
        assert!(!data.is_secondary_association_risk_factor_or_other());

        data.secondary_interpretations.insert(ClinSig::RiskFactor);
        assert!(data.is_secondary_association_risk_factor_or_other());
    }
}
