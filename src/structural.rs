// ==============================================================================
// structural.rs - Structural Variant Frequency Records
// ==============================================================================
// Description: SV type and population-frequency record for SV frequency tables
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated, one record per line
//   CHROM  START  END  SVLEN  SVTYPE  DBVAR_ID  SOURCE  SOURCE_ID  AC  AN  HOM  AF
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::sinks::line::OutputLine;

/// Column names of the SV frequency table, in output order
pub const SV_FREQUENCY_COLUMNS: [&str; 12] = [
    "CHROM", "START", "END", "SVLEN", "SVTYPE", "DBVAR_ID", "SOURCE", "SOURCE_ID", "AC", "AN",
    "HOM", "AF",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SvType {
    Del,
    Ins,
    Dup,
    Inv,
    Cnv,
    Bnd,
    Cpx,
    Ctx,
    DelMe,
    InsMe,
    CnvGain,
    CnvLoss,
}

impl SvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SvType::Del => "DEL",
            SvType::Ins => "INS",
            SvType::Dup => "DUP",
            SvType::Inv => "INV",
            SvType::Cnv => "CNV",
            SvType::Bnd => "BND",
            SvType::Cpx => "CPX",
            SvType::Ctx => "CTX",
            SvType::DelMe => "DEL_ME",
            SvType::InsMe => "INS_ME",
            SvType::CnvGain => "CNV_GAIN",
            SvType::CnvLoss => "CNV_LOSS",
        }
    }
}

impl FromStr for SvType {
    type Err = String;

    /// Accepts bare and symbolic forms ("DEL", "<DEL>", "DEL:ME", "del_me")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_ascii_uppercase()
            .replace(':', "_");
        let sv_type = match name.as_str() {
            "DEL" => SvType::Del,
            "INS" => SvType::Ins,
            "DUP" => SvType::Dup,
            "INV" => SvType::Inv,
            "CNV" => SvType::Cnv,
            "BND" | "TRA" => SvType::Bnd,
            "CPX" => SvType::Cpx,
            "CTX" => SvType::Ctx,
            "DEL_ME" | "DEL_MEI" => SvType::DelMe,
            "INS_ME" | "INS_MEI" => SvType::InsMe,
            "CNV_GAIN" | "GAIN" => SvType::CnvGain,
            "CNV_LOSS" | "LOSS" => SvType::CnvLoss,
            _ => return Err(format!("Unknown SV type: {}", s)),
        };
        Ok(sv_type)
    }
}

impl fmt::Display for SvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Population frequency of one structural variant in one source study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvFrequencyRecord {
    pub chromosome: u8,
    pub start: u64,
    pub end: u64,
    /// Signed length (negative for deletions)
    pub sv_length: i64,
    pub sv_type: SvType,
    /// dbVar variant/region identifier
    pub db_var_id: String,
    /// Source study (e.g., "GNOMAD_SV", "DGV")
    pub source: String,
    /// Identifier within the source study
    pub source_id: String,
    pub allele_count: u32,
    pub allele_number: u32,
    pub homozygotes: u32,
    pub frequency: f32,
}

impl SvFrequencyRecord {
    /// Identity used to collapse adjacent duplicates:
    /// chromosome, start, end, type, length and dbVar id
    pub fn is_same_variant(&self, other: &SvFrequencyRecord) -> bool {
        self.chromosome == other.chromosome
            && self.start == other.start
            && self.end == other.end
            && self.sv_type == other.sv_type
            && self.sv_length == other.sv_length
            && self.db_var_id == other.db_var_id
    }
}

impl OutputLine for SvFrequencyRecord {
    fn to_output_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chromosome,
            self.start,
            self.end,
            self.sv_length,
            self.sv_type,
            self.db_var_id,
            self.source,
            self.source_id,
            self.allele_count,
            self.allele_number,
            self.homozygotes,
            self.frequency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sv(start: u64, db_var_id: &str) -> SvFrequencyRecord {
        SvFrequencyRecord {
            chromosome: 1,
            start,
            end: start + 1000,
            sv_length: -1000,
            sv_type: SvType::Del,
            db_var_id: db_var_id.to_string(),
            source: "GNOMAD_SV".to_string(),
            source_id: format!("gnomAD-SV_v2.1_DEL_1_{}", start),
            allele_count: 3,
            allele_number: 1000,
            homozygotes: 0,
            frequency: 0.003,
        }
    }

    #[test]
    fn test_sv_type_parsing() {
        assert_eq!("DEL".parse::<SvType>().unwrap(), SvType::Del);
        assert_eq!("<DUP>".parse::<SvType>().unwrap(), SvType::Dup);
        assert_eq!("INS:ME".parse::<SvType>().unwrap(), SvType::InsMe);
        assert_eq!("cnv_loss".parse::<SvType>().unwrap(), SvType::CnvLoss);
        assert!("SNV".parse::<SvType>().is_err());
    }

    #[test]
    fn test_identity_ignores_counts_and_source() {
        let a = sv(100, "nssv1");
        let mut b = a.clone();
        b.source = "DGV".to_string();
        b.allele_count = 42;
        b.frequency = 0.5;
        assert!(a.is_same_variant(&b));

        let mut c = a.clone();
        c.db_var_id = "nssv2".to_string();
        assert!(!a.is_same_variant(&c));

        let mut d = a.clone();
        d.sv_type = SvType::Dup;
        assert!(!a.is_same_variant(&d));
    }

    #[test]
    fn test_output_line_columns() {
        let line = sv(100, "nssv1").to_output_line();
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), SV_FREQUENCY_COLUMNS.len());
        assert_eq!(&fields[..6], &["1", "100", "1100", "-1000", "DEL", "nssv1"]);
    }
}
