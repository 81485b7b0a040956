// ==============================================================================
// resource.rs - Annotation Resource Descriptors
// ==============================================================================
// Description: Describes one input resource, finds its files and fingerprints them
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::FrequencySource;

/// Input format of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceFormat {
    /// Tab-separated per-allele frequencies and scores
    AlleleTable,
    /// Population VCF with allele fractions in INFO
    FrequencyVcf,
    /// ClinVar-style VCF
    ClinvarVcf,
}

impl ResourceFormat {
    /// File name endings picked up when the resource path is a directory
    pub fn default_suffixes(&self) -> &'static [&'static str] {
        match self {
            ResourceFormat::AlleleTable => &[".tsv", ".tsv.gz", ".txt", ".txt.gz"],
            ResourceFormat::FrequencyVcf | ResourceFormat::ClinvarVcf => &[".vcf", ".vcf.gz"],
        }
    }
}

impl fmt::Display for ResourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceFormat::AlleleTable => "allele-table",
            ResourceFormat::FrequencyVcf => "frequency-vcf",
            ResourceFormat::ClinvarVcf => "clinvar-vcf",
        };
        f.write_str(name)
    }
}

/// Format-specific settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceOptions {
    /// frequency-vcf: INFO key -> frequency source tag
    #[serde(default)]
    pub info_fields: BTreeMap<String, FrequencySource>,

    /// Malformed records tolerated before the resource fails
    #[serde(default)]
    pub max_errors: Option<usize>,

    /// Directory resources: only files ending in this suffix
    #[serde(default)]
    pub file_suffix: Option<String>,
}

/// One named, versioned annotation resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub version: String,
    pub format: ResourceFormat,
    /// A single file, or a directory holding a multi-file archive
    pub path: PathBuf,
    #[serde(default)]
    pub options: ResourceOptions,
}

impl Resource {
    /// Multi-file archives are ingested file by file with failure isolation
    pub fn is_archive(&self) -> bool {
        self.path.is_dir()
    }

    /// Input files in ingestion order (sorted by path for archives)
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.is_archive() {
            if !self.path.is_file() {
                anyhow::bail!("Resource {} input not found: {:?}", self.name, self.path);
            }
            return Ok(vec![self.path.clone()]);
        }

        let suffixes: Vec<&str> = match self.options.file_suffix.as_deref() {
            Some(suffix) => vec![suffix],
            None => self.format.default_suffixes().to_vec(),
        };

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&self.path).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to scan {:?}", self.path))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if suffixes.iter().any(|suffix| name.ends_with(suffix)) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        if files.is_empty() {
            anyhow::bail!("Resource {} archive {:?} contains no input files", self.name, self.path);
        }
        debug!("Resource {}: {} archive files", self.name, files.len());
        Ok(files)
    }

    /// SHA-256 over the contents of all input files, in ingestion order
    pub fn checksum(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for path in self.files()? {
            hash_file(&mut hasher, &path)?;
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

fn hash_file(hasher: &mut Sha256, path: &Path) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(())
}
