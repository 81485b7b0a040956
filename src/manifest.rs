// ==============================================================================
// manifest.rs - Build Manifest
// ==============================================================================
// Description: JSON description of a full store build
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Example:
//   {
//     "store": "annotations.db",
//     "progress_interval": 1000000,
//     "resources": [
//       { "name": "dbsnp", "version": "156", "format": "allele-table",
//         "path": "dbsnp/" },
//       { "name": "clinvar", "version": "2024-05", "format": "clinvar-vcf",
//         "path": "clinvar.vcf.gz" }
//     ]
//   }
// ==============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::ingest::DEFAULT_PROGRESS_INTERVAL;
use crate::resource::Resource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Output store file
    pub store: PathBuf,

    /// Resources, ingested strictly in this order
    pub resources: Vec<Resource>,

    /// Records between progress log lines
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

impl BuildManifest {
    /// Load and validate a manifest; relative paths are taken from the manifest's directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build manifest {:?}", path))?;
        let mut manifest: BuildManifest = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse build manifest {:?}", path))?;

        if let Some(base) = path.parent() {
            manifest.resolve_paths(base);
        }
        manifest.validate()?;
        Ok(manifest)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.store.is_relative() {
            self.store = base.join(&self.store);
        }
        for resource in &mut self.resources {
            if resource.path.is_relative() {
                resource.path = base.join(&resource.path);
            }
        }
    }

    /// Reject empty builds and reused resource names
    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() {
            anyhow::bail!("Build manifest lists no resources");
        }

        let mut names = HashSet::new();
        for resource in &self.resources {
            if resource.name.trim().is_empty() {
                anyhow::bail!("Resource with empty name in build manifest");
            }
            if !names.insert(resource.name.as_str()) {
                anyhow::bail!("Resource name '{}' appears more than once", resource.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceFormat;
    use tempfile::tempdir;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build.json");
        std::fs::write(
            &path,
            r#"{
                "store": "out/annotations.db",
                "resources": [
                    { "name": "dbsnp", "version": "156", "format": "allele-table", "path": "dbsnp" },
                    { "name": "clinvar", "version": "2024-05", "format": "clinvar-vcf", "path": "/abs/clinvar.vcf.gz" }
                ]
            }"#,
        )
        .unwrap();

        let manifest = BuildManifest::load(&path).unwrap();
        assert_eq!(manifest.store, dir.path().join("out/annotations.db"));
        assert_eq!(manifest.resources[0].path, dir.path().join("dbsnp"));
        assert_eq!(manifest.resources[1].path, PathBuf::from("/abs/clinvar.vcf.gz"));
        assert_eq!(manifest.resources[1].format, ResourceFormat::ClinvarVcf);
        assert_eq!(manifest.progress_interval, DEFAULT_PROGRESS_INTERVAL);
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build.json");

        std::fs::write(&path, r#"{ "store": "a.db", "resources": [] }"#).unwrap();
        assert!(BuildManifest::load(&path).is_err());

        std::fs::write(
            &path,
            r#"{ "store": "a.db", "resources": [
                { "name": "x", "version": "1", "format": "allele-table", "path": "a.tsv" },
                { "name": "x", "version": "2", "format": "allele-table", "path": "b.tsv" }
            ] }"#,
        )
        .unwrap();
        let err = BuildManifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
