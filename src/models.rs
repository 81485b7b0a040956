// ==============================================================================
// models.rs - Variant Keys and Annotation Data Models
// ==============================================================================
// Description: Canonical variant identity, source tags and stored properties
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::clinvar::ClinVarData;

/// Chromosome number used for X
pub const CHROMOSOME_X: u8 = 23;
/// Chromosome number used for Y
pub const CHROMOSOME_Y: u8 = 24;
/// Chromosome number used for the mitochondrial genome
pub const CHROMOSOME_MT: u8 = 25;

/// Largest position a key may carry (the store's signed 64-bit integer column)
pub const MAX_POSITION: u64 = i64::MAX as u64;

/// Errors building a variant key from raw fields
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyError {
    #[error("Invalid chromosome: {0}")]
    InvalidChromosome(String),

    /// Well-formed contig outside 1-22/X/Y/MT (GL*, chrUn_*, alt and decoy contigs)
    #[error("Unplaced contig: {0}")]
    UnplacedContig(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Invalid allele: {0}")]
    InvalidAllele(String),
}

/// Parse a chromosome name to its numeric form
///
/// Accepts "1"-"22", "X", "Y", "M" and "MT", with or without a "chr" prefix.
/// Other contig names are [`KeyError::UnplacedContig`]; empty names and
/// out-of-range numbers are [`KeyError::InvalidChromosome`].
pub fn parse_chromosome(name: &str) -> Result<u8, KeyError> {
    let trimmed = name.trim();
    let bare = trimmed
        .strip_prefix("chr")
        .or_else(|| trimmed.strip_prefix("CHR"))
        .unwrap_or(trimmed);

    match bare {
        "X" | "x" => Ok(CHROMOSOME_X),
        "Y" | "y" => Ok(CHROMOSOME_Y),
        "M" | "MT" | "m" | "mt" => Ok(CHROMOSOME_MT),
        _ if !bare.is_empty() && bare.bytes().all(|b| b.is_ascii_digit()) => bare
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=22).contains(n))
            .ok_or_else(|| KeyError::InvalidChromosome(name.to_string())),
        _ if bare.is_empty() || bare.contains(char::is_whitespace) => {
            Err(KeyError::InvalidChromosome(name.to_string()))
        }
        _ => Err(KeyError::UnplacedContig(trimmed.to_string())),
    }
}

/// Canonical identity of a variant: (chromosome, position, REF, ALT)
///
/// Field order matters: the derived `Ord` sorts by chromosome, then position,
/// then REF and ALT byte-wise, which is the same order the store keeps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub chromosome: u8,
    pub position: u64,
    pub ref_allele: String,
    pub alt_allele: String,
}

impl VariantKey {
    /// Build a key from fields that are already in canonical form
    pub fn new(
        chromosome: u8,
        position: u64,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
    ) -> Self {
        Self {
            chromosome,
            position,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
        }
    }

    /// Build a key in minimal representation
    ///
    /// Alleles are upper-cased, then the common suffix and afterwards the
    /// common prefix are trimmed while both alleles keep at least one base.
    /// The position moves right by the number of prefix bases removed, so
    /// `(1, 100, "CTT", "CT")` and `(1, 100, "CT", "C")` yield the same key.
    pub fn normalized(
        chromosome: u8,
        position: u64,
        ref_allele: &str,
        alt_allele: &str,
    ) -> Result<Self, KeyError> {
        if position == 0 || position > MAX_POSITION {
            return Err(KeyError::InvalidPosition(position.to_string()));
        }

        let ref_bases = canonical_bases(ref_allele)?;
        let alt_bases = canonical_bases(alt_allele)?;

        let mut ref_end = ref_bases.len();
        let mut alt_end = alt_bases.len();
        while ref_end > 1 && alt_end > 1 && ref_bases[ref_end - 1] == alt_bases[alt_end - 1] {
            ref_end -= 1;
            alt_end -= 1;
        }

        let mut start = 0;
        while ref_end - start > 1
            && alt_end - start > 1
            && ref_bases[start] == alt_bases[start]
        {
            start += 1;
        }

        let shifted = position
            .checked_add(start as u64)
            .filter(|p| *p <= MAX_POSITION)
            .ok_or_else(|| KeyError::InvalidPosition(position.to_string()))?;

        Ok(Self {
            chromosome,
            position: shifted,
            ref_allele: String::from_utf8_lossy(&ref_bases[start..ref_end]).into_owned(),
            alt_allele: String::from_utf8_lossy(&alt_bases[start..alt_end]).into_owned(),
        })
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.chromosome, self.position, self.ref_allele, self.alt_allele
        )
    }
}

fn canonical_bases(allele: &str) -> Result<Vec<u8>, KeyError> {
    let bases = allele.trim().to_ascii_uppercase().into_bytes();
    if bases.is_empty() || !bases.iter().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')) {
        return Err(KeyError::InvalidAllele(allele.to_string()));
    }
    Ok(bases)
}

/// True for alleles that have no sequence of their own (`<DEL>`, `*`, `.`, breakends)
pub fn is_symbolic_allele(allele: &str) -> bool {
    allele.is_empty()
        || allele == "*"
        || allele == "."
        || allele.starts_with('<')
        || allele.contains('[')
        || allele.contains(']')
}

/// Error for an unrecognised source tag
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown source tag: {0}")]
pub struct UnknownSourceTag(pub String);

/// Population-frequency sources known to the store
///
/// The store encodes these by variant index: new sources go at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrequencySource {
    ThousandGenomes,
    Topmed,
    Uk10k,
    EspAa,
    EspEa,
    EspAll,
    ExacAfr,
    ExacAmr,
    ExacEas,
    ExacFin,
    ExacNfe,
    ExacOth,
    ExacSas,
    GnomadEAfr,
    GnomadEAmr,
    GnomadEAsj,
    GnomadEEas,
    GnomadEFin,
    GnomadENfe,
    GnomadEOth,
    GnomadESas,
    GnomadGAfr,
    GnomadGAmr,
    GnomadGAsj,
    GnomadGEas,
    GnomadGFin,
    GnomadGNfe,
    GnomadGOth,
    GnomadGSas,
}

impl FrequencySource {
    pub const ALL: [FrequencySource; 29] = [
        FrequencySource::ThousandGenomes,
        FrequencySource::Topmed,
        FrequencySource::Uk10k,
        FrequencySource::EspAa,
        FrequencySource::EspEa,
        FrequencySource::EspAll,
        FrequencySource::ExacAfr,
        FrequencySource::ExacAmr,
        FrequencySource::ExacEas,
        FrequencySource::ExacFin,
        FrequencySource::ExacNfe,
        FrequencySource::ExacOth,
        FrequencySource::ExacSas,
        FrequencySource::GnomadEAfr,
        FrequencySource::GnomadEAmr,
        FrequencySource::GnomadEAsj,
        FrequencySource::GnomadEEas,
        FrequencySource::GnomadEFin,
        FrequencySource::GnomadENfe,
        FrequencySource::GnomadEOth,
        FrequencySource::GnomadESas,
        FrequencySource::GnomadGAfr,
        FrequencySource::GnomadGAmr,
        FrequencySource::GnomadGAsj,
        FrequencySource::GnomadGEas,
        FrequencySource::GnomadGFin,
        FrequencySource::GnomadGNfe,
        FrequencySource::GnomadGOth,
        FrequencySource::GnomadGSas,
    ];

    /// Column/tag name, e.g. "GNOMAD_G_NFE"
    pub fn tag(&self) -> &'static str {
        match self {
            FrequencySource::ThousandGenomes => "THOUSAND_GENOMES",
            FrequencySource::Topmed => "TOPMED",
            FrequencySource::Uk10k => "UK10K",
            FrequencySource::EspAa => "ESP_AA",
            FrequencySource::EspEa => "ESP_EA",
            FrequencySource::EspAll => "ESP_ALL",
            FrequencySource::ExacAfr => "EXAC_AFR",
            FrequencySource::ExacAmr => "EXAC_AMR",
            FrequencySource::ExacEas => "EXAC_EAS",
            FrequencySource::ExacFin => "EXAC_FIN",
            FrequencySource::ExacNfe => "EXAC_NFE",
            FrequencySource::ExacOth => "EXAC_OTH",
            FrequencySource::ExacSas => "EXAC_SAS",
            FrequencySource::GnomadEAfr => "GNOMAD_E_AFR",
            FrequencySource::GnomadEAmr => "GNOMAD_E_AMR",
            FrequencySource::GnomadEAsj => "GNOMAD_E_ASJ",
            FrequencySource::GnomadEEas => "GNOMAD_E_EAS",
            FrequencySource::GnomadEFin => "GNOMAD_E_FIN",
            FrequencySource::GnomadENfe => "GNOMAD_E_NFE",
            FrequencySource::GnomadEOth => "GNOMAD_E_OTH",
            FrequencySource::GnomadESas => "GNOMAD_E_SAS",
            FrequencySource::GnomadGAfr => "GNOMAD_G_AFR",
            FrequencySource::GnomadGAmr => "GNOMAD_G_AMR",
            FrequencySource::GnomadGAsj => "GNOMAD_G_ASJ",
            FrequencySource::GnomadGEas => "GNOMAD_G_EAS",
            FrequencySource::GnomadGFin => "GNOMAD_G_FIN",
            FrequencySource::GnomadGNfe => "GNOMAD_G_NFE",
            FrequencySource::GnomadGOth => "GNOMAD_G_OTH",
            FrequencySource::GnomadGSas => "GNOMAD_G_SAS",
        }
    }
}

impl FromStr for FrequencySource {
    type Err = UnknownSourceTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|source| source.tag().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSourceTag(s.to_string()))
    }
}

impl fmt::Display for FrequencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Computational pathogenicity predictors known to the store
///
/// Encoded by variant index, like [`FrequencySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathogenicitySource {
    Sift,
    Polyphen,
    MutationTaster,
    Revel,
    Mvp,
    Cadd,
    Remm,
    AlphaMissense,
    SpliceAi,
}

impl PathogenicitySource {
    pub const ALL: [PathogenicitySource; 9] = [
        PathogenicitySource::Sift,
        PathogenicitySource::Polyphen,
        PathogenicitySource::MutationTaster,
        PathogenicitySource::Revel,
        PathogenicitySource::Mvp,
        PathogenicitySource::Cadd,
        PathogenicitySource::Remm,
        PathogenicitySource::AlphaMissense,
        PathogenicitySource::SpliceAi,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            PathogenicitySource::Sift => "SIFT",
            PathogenicitySource::Polyphen => "POLYPHEN",
            PathogenicitySource::MutationTaster => "MUTATION_TASTER",
            PathogenicitySource::Revel => "REVEL",
            PathogenicitySource::Mvp => "MVP",
            PathogenicitySource::Cadd => "CADD",
            PathogenicitySource::Remm => "REMM",
            PathogenicitySource::AlphaMissense => "ALPHA_MISSENSE",
            PathogenicitySource::SpliceAi => "SPLICE_AI",
        }
    }
}

impl FromStr for PathogenicitySource {
    type Err = UnknownSourceTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|source| source.tag().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSourceTag(s.to_string()))
    }
}

impl fmt::Display for PathogenicitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Annotation payload stored against a [`VariantKey`]
///
/// Frequencies are percentages (0-100). At most one value per source tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantProperties {
    /// Reference SNP identifier (e.g., "rs12345")
    pub rsid: Option<String>,

    /// Population frequency per source
    pub frequencies: BTreeMap<FrequencySource, f32>,

    /// Pathogenicity score per predictor
    pub pathogenicity_scores: BTreeMap<PathogenicitySource, f32>,

    /// Clinical significance, if any clinical resource covered this variant
    pub clinvar: Option<ClinVarData>,
}

impl VariantProperties {
    /// Missing and empty identifiers both count as "no rsID"
    pub fn has_rsid(&self) -> bool {
        self.rsid.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// One annotated allele as produced by a record source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlleleRecord {
    /// Chromosome number (1-22, 23=X, 24=Y, 25=MT)
    pub chromosome: u8,

    /// 1-based position of the first REF base
    pub position: u64,

    /// Reference allele
    pub ref_allele: String,

    /// Alternate allele
    pub alt_allele: String,

    pub rsid: Option<String>,
    pub frequencies: BTreeMap<FrequencySource, f32>,
    pub pathogenicity_scores: BTreeMap<PathogenicitySource, f32>,
    pub clinvar: Option<ClinVarData>,
}

impl AlleleRecord {
    /// Start a record from an already normalised key
    pub fn from_key(key: VariantKey) -> Self {
        Self {
            chromosome: key.chromosome,
            position: key.position,
            ref_allele: key.ref_allele,
            alt_allele: key.alt_allele,
            ..Default::default()
        }
    }
}
