// ==============================================================================
// sinks/store.rs - Variant Store Sink
// ==============================================================================
// Description: Insert-or-merge records into the variant annotation store
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::marker::PhantomData;

use super::RecordSink;
use crate::merge::VariantRecord;
use crate::models::{FrequencySource, PathogenicitySource};
use crate::store::VariantStore;

/// Writes each record into a [`VariantStore`] that outlives the sink
///
/// Resources are ingested one after another into the same store, so the
/// sink borrows it; [`RecordSink::finish`] commits, closing the file is
/// left to whoever opened it.
pub struct StoreSink<'a, R> {
    store: &'a mut VariantStore,
    frequency_sources: BTreeSet<FrequencySource>,
    pathogenicity_sources: BTreeSet<PathogenicitySource>,
    _record: PhantomData<fn(&R)>,
}

impl<'a, R: VariantRecord> StoreSink<'a, R> {
    pub fn new(store: &'a mut VariantStore) -> Self {
        Self {
            store,
            frequency_sources: BTreeSet::new(),
            pathogenicity_sources: BTreeSet::new(),
            _record: PhantomData,
        }
    }

    /// Frequency source tags seen so far
    pub fn frequency_sources(&self) -> &BTreeSet<FrequencySource> {
        &self.frequency_sources
    }

    /// Pathogenicity source tags seen so far
    pub fn pathogenicity_sources(&self) -> &BTreeSet<PathogenicitySource> {
        &self.pathogenicity_sources
    }
}

impl<R: VariantRecord> RecordSink<R> for StoreSink<'_, R> {
    fn write(&mut self, record: &R) -> Result<()> {
        let key = record.variant_key();
        let properties = record.to_properties();

        self.frequency_sources.extend(properties.frequencies.keys().copied());
        self.pathogenicity_sources
            .extend(properties.pathogenicity_scores.keys().copied());

        self.store
            .upsert(&key, &properties)
            .with_context(|| format!("Failed to store variant {}", key))
    }

    fn count(&self) -> Result<u64> {
        self.store.count().context("Failed to count stored variants")
    }

    fn finish(&mut self) -> Result<()> {
        self.store.commit().context("Failed to commit variant store")
    }
}
