// ==============================================================================
// ingest.rs - Streaming Ingestion Engine
// ==============================================================================
// Description: Drives a resource's record stream through a sink with progress
//              reporting and optional per-file failure isolation
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::sinks::RecordSink;

/// Progress checkpoint interval for whole-resource streams
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Progress checkpoint interval inside a single archive file
pub const FILE_PROGRESS_INTERVAL: u64 = 1_000;

/// How far a read failure reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureIsolation {
    /// Any read failure aborts the resource
    WholeResource,
    /// A failing file is logged and skipped; remaining files continue
    PerFile,
}

/// Record counter that logs throughput every `interval` records
pub struct Progress {
    label: String,
    interval: u64,
    count: u64,
    started: Instant,
    checkpoint: Instant,
    checkpoint_count: u64,
    verbose: bool,
}

impl Progress {
    pub fn new(label: impl Into<String>, interval: u64) -> Self {
        let now = Instant::now();
        Self {
            label: label.into(),
            interval,
            count: 0,
            started: now,
            checkpoint: now,
            checkpoint_count: 0,
            verbose: true,
        }
    }

    /// Same as [`Progress::new`] but checkpoints go to debug level
    pub fn quiet(label: impl Into<String>, interval: u64) -> Self {
        Self {
            verbose: false,
            ..Self::new(label, interval)
        }
    }

    /// Count one record
    pub fn record(&mut self) {
        self.count += 1;
        if self.interval > 0 && self.count % self.interval == 0 {
            self.log_checkpoint();
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn log_checkpoint(&mut self) {
        let now = Instant::now();
        let total_secs = now.duration_since(self.started).as_secs_f64();
        let recent_secs = now.duration_since(self.checkpoint).as_secs_f64();
        let overall_rate = rate(self.count, total_secs);
        let recent_rate = rate(self.count - self.checkpoint_count, recent_secs);

        if self.verbose {
            info!(
                "{}: {} records processed in {:.1}s ({:.0} records/s overall, {:.0} records/s since last checkpoint)",
                self.label, self.count, total_secs, overall_rate, recent_rate
            );
        } else {
            debug!(
                "{}: {} records processed in {:.1}s ({:.0} records/s overall, {:.0} records/s since last checkpoint)",
                self.label, self.count, total_secs, overall_rate, recent_rate
            );
        }

        self.checkpoint = now;
        self.checkpoint_count = self.count;
    }
}

fn rate(count: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Totals for one ingested resource
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub resource: String,
    /// Records pulled from the source and handed to the sink
    pub processed: u64,
    /// Records held by the sink afterwards
    pub retained: u64,
    pub elapsed: Duration,
    /// Files skipped under [`FailureIsolation::PerFile`]
    pub skipped_files: Vec<PathBuf>,
}

/// Which side of the pipeline failed while draining a stream
enum DrainFailure {
    Source(anyhow::Error),
    Sink(anyhow::Error),
}

/// Pulls records one at a time and hands each to a sink
///
/// Resources are drained synchronously: a record is written before the next
/// is read, and the sink is finished before the report is returned.
#[derive(Debug, Clone)]
pub struct IngestionEngine {
    progress_interval: u64,
    isolation: FailureIsolation,
}

impl Default for IngestionEngine {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            isolation: FailureIsolation::WholeResource,
        }
    }
}

impl IngestionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine for multi-file archives: a broken file does not sink the resource
    pub fn for_archives() -> Self {
        Self::default().with_isolation(FailureIsolation::PerFile)
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_isolation(mut self, isolation: FailureIsolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Drain a single record stream into `sink`
    ///
    /// Any source or sink error aborts the resource.
    pub fn ingest<R, E, I, S>(&self, resource: &str, records: I, sink: &mut S) -> Result<IngestReport>
    where
        I: IntoIterator<Item = Result<R, E>>,
        E: Into<anyhow::Error>,
        S: RecordSink<R>,
    {
        info!("Ingesting resource {}", resource);
        let mut progress = Progress::new(resource, self.progress_interval);

        match drain(records, sink, &mut progress, None) {
            Ok(()) => {}
            Err(DrainFailure::Source(e)) => {
                error!("Resource {} failed after {} records: {:#}", resource, progress.count(), e);
                return Err(e.context(format!("Failed to read resource {}", resource)));
            }
            Err(DrainFailure::Sink(e)) => {
                error!("Sink failed on resource {} after {} records: {:#}", resource, progress.count(), e);
                return Err(e);
            }
        }

        finish(resource, progress, sink, Vec::new())
    }

    /// Drain every file of a multi-file resource into `sink`, in the given order
    ///
    /// `open` turns a path into a record stream. Under
    /// [`FailureIsolation::PerFile`] a file that cannot be opened or read is
    /// logged and skipped (records already taken from it stay written). Sink
    /// failures always abort.
    pub fn ingest_files<R, E, I, S, F>(
        &self,
        resource: &str,
        files: &[PathBuf],
        mut open: F,
        sink: &mut S,
    ) -> Result<IngestReport>
    where
        F: FnMut(&Path) -> Result<I, E>,
        I: IntoIterator<Item = Result<R, E>>,
        E: Into<anyhow::Error>,
        S: RecordSink<R>,
    {
        info!("Ingesting resource {} ({} files)", resource, files.len());
        let mut progress = Progress::new(resource, self.progress_interval);
        let mut skipped_files = Vec::new();

        for path in files {
            let label = format!("{} [{}]", resource, path.display());
            let mut file_progress = Progress::quiet(label, FILE_PROGRESS_INTERVAL);

            let outcome = match open(path) {
                Ok(records) => drain(records, sink, &mut progress, Some(&mut file_progress)),
                Err(e) => Err(DrainFailure::Source(e.into())),
            };

            match outcome {
                Ok(()) => {
                    debug!("Read {} records from {:?}", file_progress.count(), path);
                }
                Err(DrainFailure::Source(e)) => match self.isolation {
                    FailureIsolation::PerFile => {
                        warn!(
                            "Skipping rest of {:?} in resource {} after {} records: {:#}",
                            path,
                            resource,
                            file_progress.count(),
                            e
                        );
                        skipped_files.push(path.clone());
                    }
                    FailureIsolation::WholeResource => {
                        error!("Resource {} failed reading {:?}: {:#}", resource, path, e);
                        return Err(e.context(format!(
                            "Failed to read {:?} of resource {}",
                            path, resource
                        )));
                    }
                },
                Err(DrainFailure::Sink(e)) => {
                    error!("Sink failed on resource {} while reading {:?}: {:#}", resource, path, e);
                    return Err(e);
                }
            }
        }

        finish(resource, progress, sink, skipped_files)
    }
}

fn drain<R, E, I, S>(
    records: I,
    sink: &mut S,
    progress: &mut Progress,
    mut file_progress: Option<&mut Progress>,
) -> Result<(), DrainFailure>
where
    I: IntoIterator<Item = Result<R, E>>,
    E: Into<anyhow::Error>,
    S: RecordSink<R>,
{
    for item in records {
        let record = item.map_err(|e| DrainFailure::Source(e.into()))?;
        sink.write(&record).map_err(DrainFailure::Sink)?;
        progress.record();
        if let Some(file_progress) = file_progress.as_deref_mut() {
            file_progress.record();
        }
    }
    Ok(())
}

fn finish<R, S: RecordSink<R>>(
    resource: &str,
    progress: Progress,
    sink: &mut S,
    skipped_files: Vec<PathBuf>,
) -> Result<IngestReport> {
    sink.finish()
        .with_context(|| format!("Failed to finish sink for resource {}", resource))?;
    let retained = sink.count()?;
    let elapsed = progress.elapsed();

    info!(
        "Finished {} in {:.1}s: {} records processed, {} retained",
        resource,
        elapsed.as_secs_f64(),
        progress.count(),
        retained
    );
    if !skipped_files.is_empty() {
        warn!("{}: {} file(s) skipped after read errors", resource, skipped_files.len());
    }

    Ok(IngestReport {
        resource: resource.to_string(),
        processed: progress.count(),
        retained,
        elapsed,
        skipped_files,
    })
}
