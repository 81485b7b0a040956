// ==============================================================================
// builder.rs - Variant Store Build Driver
// ==============================================================================
// Description: Ingests every manifest resource, in order, into one store
// Author: Matt Barham
// Created: 2025-11-05
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Pipeline (per resource):
//   1. Skip if already in the store ledger (resume only)
//   2. Fingerprint input files (SHA-256)
//   3. Stream records through a StoreSink (insert-or-merge)
//   4. Record processed/retained counts and source tags in the ledger
// ==============================================================================

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::ingest::{IngestReport, IngestionEngine};
use crate::manifest::BuildManifest;
use crate::models::{FrequencySource, PathogenicitySource};
use crate::parsers::{AlleleTableSource, ClinVarVcfSource, FrequencyVcfSource, DEFAULT_MAX_ERRORS};
use crate::resource::{Resource, ResourceFormat};
use crate::sinks::StoreSink;
use crate::store::{ResourceEntry, StoreError, VariantStore};

/// Outcome of a build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub store: PathBuf,
    pub build_id: String,
    /// One report per resource ingested by this run
    pub reports: Vec<IngestReport>,
    /// Resources already present in the ledger when resuming
    pub skipped_resources: Vec<String>,
    /// Distinct keys in the finished store
    pub keys: u64,
}

/// Single-threaded build over the manifest's resources
pub struct Builder {
    manifest: BuildManifest,
    resume: bool,
}

/// Source tags first contributed by each resource
#[derive(Default)]
struct TagOwners {
    frequencies: BTreeMap<FrequencySource, String>,
    scores: BTreeMap<PathogenicitySource, String>,
}

impl TagOwners {
    fn from_ledger(entries: &[ResourceEntry]) -> Self {
        let mut owners = Self::default();
        for entry in entries {
            owners.claim(&entry.name, entry.frequency_sources.iter().copied(), entry.pathogenicity_sources.iter().copied());
        }
        owners
    }

    /// Record the tags of `resource`, warning about tags an earlier resource already filled
    fn claim(
        &mut self,
        resource: &str,
        frequencies: impl IntoIterator<Item = FrequencySource>,
        scores: impl IntoIterator<Item = PathogenicitySource>,
    ) {
        for tag in frequencies {
            if let Some(owner) = self.frequencies.get(&tag) {
                warn!(
                    "Frequency source {} from resource {} was already filled by resource {}; later values win",
                    tag, resource, owner
                );
            } else {
                self.frequencies.insert(tag, resource.to_string());
            }
        }
        for tag in scores {
            if let Some(owner) = self.scores.get(&tag) {
                warn!(
                    "Pathogenicity source {} from resource {} was already filled by resource {}; later values win",
                    tag, resource, owner
                );
            } else {
                self.scores.insert(tag, resource.to_string());
            }
        }
    }
}

impl Builder {
    pub fn new(manifest: BuildManifest) -> Self {
        Self {
            manifest,
            resume: false,
        }
    }

    /// Continue an interrupted build: resources already in the ledger are skipped
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn run(&self) -> Result<BuildSummary> {
        let store_path = &self.manifest.store;

        if store_path.exists() && !self.resume {
            info!("Removing existing store {:?} for a fresh build", store_path);
            std::fs::remove_file(store_path)
                .with_context(|| format!("Failed to remove existing store {:?}", store_path))?;
        }
        if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {:?}", parent))?;
        }

        let mut store = VariantStore::create(store_path)
            .with_context(|| format!("Failed to open variant store {:?}", store_path))?;
        let mut owners = TagOwners::from_ledger(&store.resources()?);

        info!(
            "Building {:?} from {} resources",
            store_path,
            self.manifest.resources.len()
        );

        let mut reports = Vec::new();
        let mut skipped_resources = Vec::new();

        for resource in &self.manifest.resources {
            if store.has_resource(&resource.name)? {
                if self.resume {
                    info!("Resource {} already ingested, skipping", resource.name);
                    skipped_resources.push(resource.name.clone());
                    continue;
                }
                return Err(StoreError::DuplicateResource(resource.name.clone()).into());
            }

            let sha256 = resource
                .checksum()
                .with_context(|| format!("Failed to fingerprint resource {}", resource.name))?;

            let (report, frequencies, scores) = ingest_resource(&mut store, resource, self.manifest.progress_interval)?;
            owners.claim(&resource.name, frequencies.iter().copied(), scores.iter().copied());

            store.record_resource(&ResourceEntry {
                name: resource.name.clone(),
                version: resource.version.clone(),
                path: resource.path.display().to_string(),
                sha256,
                processed: report.processed,
                retained: report.retained,
                frequency_sources: frequencies.into_iter().collect(),
                pathogenicity_sources: scores.into_iter().collect(),
                ingested_at: Utc::now().to_rfc3339(),
            })?;

            reports.push(report);
        }

        let keys = store.count()?;
        let build_id = store.build_id()?.unwrap_or_default();
        store.close()?;

        info!("Build {} complete: {} distinct variants in {:?}", build_id, keys, store_path);

        Ok(BuildSummary {
            store: store_path.clone(),
            build_id,
            reports,
            skipped_resources,
            keys,
        })
    }
}

/// Stream one resource into the store
fn ingest_resource(
    store: &mut VariantStore,
    resource: &Resource,
    progress_interval: u64,
) -> Result<(IngestReport, BTreeSet<FrequencySource>, BTreeSet<PathogenicitySource>)> {
    let files = resource.files()?;
    let engine = if resource.is_archive() {
        IngestionEngine::for_archives()
    } else {
        IngestionEngine::new()
    }
    .with_progress_interval(progress_interval);
    let max_errors = resource.options.max_errors.unwrap_or(DEFAULT_MAX_ERRORS);

    let mut sink = StoreSink::new(store);
    let report = match resource.format {
        ResourceFormat::AlleleTable => {
            let source = AlleleTableSource::new().with_max_errors(max_errors);
            engine.ingest_files(&resource.name, &files, |path| source.open(path), &mut sink)?
        }
        ResourceFormat::FrequencyVcf => {
            if resource.options.info_fields.is_empty() {
                anyhow::bail!("Resource {}: frequency-vcf needs options.info_fields", resource.name);
            }
            let source = FrequencyVcfSource::new(resource.options.info_fields.clone()).with_max_errors(max_errors);
            engine.ingest_files(&resource.name, &files, |path| source.open(path), &mut sink)?
        }
        ResourceFormat::ClinvarVcf => {
            let source = ClinVarVcfSource::new().with_max_errors(max_errors);
            engine.ingest_files(&resource.name, &files, |path| source.open(path), &mut sink)?
        }
    };

    let frequencies = sink.frequency_sources().clone();
    let scores = sink.pathogenicity_sources().clone();
    Ok((report, frequencies, scores))
}
