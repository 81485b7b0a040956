// ==============================================================================
// parsers/exclusions.rs - Exclusion List Reader
// ==============================================================================
// Description: Loads variant keys that must never enter the clinical whitelist
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: tab-separated CHROM POS REF ALT, '#' starts a comment line
// ==============================================================================

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

use super::{open_text, SourceError};
use crate::models::{parse_chromosome, KeyError, VariantKey};

/// Read an exclusion list into a set of normalised keys
///
/// The list is small and curated, so any malformed line is an error.
pub fn read_exclusions(path: impl AsRef<Path>) -> Result<HashSet<VariantKey>, SourceError> {
    let path = path.as_ref();
    let reader = open_text(path)?;
    let mut keys = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return Err(SourceError::InvalidValue(format!(
                "{}: line {}: expected CHROM POS REF ALT",
                path.display(),
                idx + 1
            )));
        }

        let chromosome = match parse_chromosome(fields[0]) {
            Ok(chromosome) => chromosome,
            Err(KeyError::UnplacedContig(contig)) => {
                debug!("{}: line {}: ignoring unplaced contig {}", path.display(), idx + 1, contig);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let position: u64 = fields[1].trim().parse().map_err(|_| {
            SourceError::InvalidValue(format!("{}: line {}: POS={}", path.display(), idx + 1, fields[1]))
        })?;
        keys.insert(VariantKey::normalized(chromosome, position, fields[2], fields[3])?);
    }

    info!("Loaded {} excluded variants from {:?}", keys.len(), path);
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_keys_and_skips_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exclusions.tsv");
        std::fs::write(
            &path,
            "# known artefacts\n1\t100\tA\tG\n\nchrX\t200\tCTT\tCT\nchrUn_gl000220\t5\tA\tC\n",
        )
        .unwrap();

        let keys = read_exclusions(&path).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&VariantKey::new(1, 100, "A", "G")));
        assert!(keys.contains(&VariantKey::new(23, 200, "CT", "C")));
    }

    #[test]
    fn test_rejects_short_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exclusions.tsv");
        std::fs::write(&path, "1\t100\tA\n").unwrap();
        assert!(read_exclusions(&path).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exclusions.tsv");
        std::fs::write(&path, "1\t10000000000000000000\tA\tG\n").unwrap();
        assert!(matches!(read_exclusions(&path), Err(SourceError::Key(KeyError::InvalidPosition(_)))));
    }
}
