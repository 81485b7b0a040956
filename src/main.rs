// ==============================================================================
// main.rs - Variant Annotation Store Entry Point
// ==============================================================================
// Description: Command-line front end for store builds, clinical whitelist
//              export, SV frequency tables and point lookups
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use variant_annotation_store::builder::Builder;
use variant_annotation_store::ingest::IngestionEngine;
use variant_annotation_store::manifest::BuildManifest;
use variant_annotation_store::models::{parse_chromosome, VariantKey};
use variant_annotation_store::parsers::{read_exclusions, ClinVarVcfSource, SvFrequencySource};
use variant_annotation_store::sinks::{SvDedupSink, WhitelistSink};
use variant_annotation_store::store::VariantStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build (or resume building) a store from a JSON manifest
    Build {
        /// Build manifest path
        #[arg(long, env = "VAS_MANIFEST")]
        manifest: PathBuf,

        /// Keep an existing store and skip resources already in its ledger
        #[arg(long)]
        resume: bool,
    },

    /// Export high-confidence pathogenic ClinVar alleles
    Whitelist {
        /// ClinVar VCF (plain or .gz)
        #[arg(long, env = "VAS_CLINVAR")]
        clinvar: PathBuf,

        /// Tab-separated CHROM POS REF ALT list of variants to leave out
        #[arg(long, env = "VAS_EXCLUSIONS")]
        exclusions: Option<PathBuf>,

        /// Output file (.gz for compressed)
        #[arg(long, env = "VAS_WHITELIST")]
        output: PathBuf,
    },

    /// Merge SV frequency tables, dropping adjacent duplicates
    SvFrequencies {
        /// Input tables, read in the given order
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file (.gz for compressed)
        #[arg(long, env = "VAS_SV_FREQUENCIES")]
        output: PathBuf,
    },

    /// Print the stored annotations of one variant as JSON
    Lookup {
        /// Store file
        #[arg(long, env = "VAS_STORE")]
        store: PathBuf,

        chromosome: String,
        position: u64,
        ref_allele: String,
        alt_allele: String,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "variant_annotation_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Build { manifest, resume } => {
            let manifest = BuildManifest::load(&manifest)?;
            let summary = Builder::new(manifest).with_resume(resume).run()?;
            for report in &summary.reports {
                info!(
                    "  {}: {} processed, {} retained, {} files skipped",
                    report.resource,
                    report.processed,
                    report.retained,
                    report.skipped_files.len()
                );
            }
            info!("Store {:?} ready ({} variants)", summary.store, summary.keys);
        }

        Command::Whitelist {
            clinvar,
            exclusions,
            output,
        } => {
            let exclusions = match exclusions {
                Some(path) => read_exclusions(&path)
                    .with_context(|| format!("Failed to load exclusion list {:?}", path))?,
                None => HashSet::new(),
            };
            let records = ClinVarVcfSource::new()
                .open(&clinvar)
                .with_context(|| format!("Failed to open ClinVar VCF {:?}", clinvar))?;
            let mut sink = WhitelistSink::create(&output, exclusions)?;
            let report = IngestionEngine::new().ingest("clinvar-whitelist", records, &mut sink)?;
            info!("Wrote {} whitelisted variants to {:?}", report.retained, output);
        }

        Command::SvFrequencies { input, output } => {
            let source = SvFrequencySource::new();
            let mut sink = SvDedupSink::new(&output);
            let report = IngestionEngine::new().ingest_files("sv-frequencies", &input, |path| source.open(path), &mut sink)?;
            info!(
                "Wrote {} SV frequency records to {:?} ({} adjacent duplicates dropped)",
                report.retained,
                output,
                sink.duplicates()
            );
        }

        Command::Lookup {
            store,
            chromosome,
            position,
            ref_allele,
            alt_allele,
        } => {
            let key = VariantKey::normalized(parse_chromosome(&chromosome)?, position, &ref_allele, &alt_allele)?;
            let store = VariantStore::open_read_only(&store)
                .with_context(|| format!("Failed to open variant store {:?}", store))?;
            let properties = store.get(&key)?;

            let output = serde_json::json!({
                "key": key.to_string(),
                "properties": properties,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
