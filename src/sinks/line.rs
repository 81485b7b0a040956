// ==============================================================================
// sinks/line.rs - Generic Line Sink
// ==============================================================================
// Description: Writes any self-serializing record as one output line
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::{OutputWriter, RecordSink};

/// A record that renders itself as exactly one line (no trailing newline)
pub trait OutputLine {
    fn to_output_line(&self) -> String;
}

/// Passthrough sink: no filtering, no merging
///
/// The output file is created on the first write and flushed after each one.
pub struct LineSink<R> {
    path: PathBuf,
    writer: Option<OutputWriter>,
    written: u64,
    _record: PhantomData<fn(&R)>,
}

impl<R: OutputLine> LineSink<R> {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
            written: 0,
            _record: PhantomData,
        }
    }
}

impl<R: OutputLine> RecordSink<R> for LineSink<R> {
    fn write(&mut self, record: &R) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(OutputWriter::create(&self.path)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer
                .write_line(&record.to_output_line())
                .and_then(|_| std::io::Write::flush(writer))
                .with_context(|| format!("Failed to write to {:?}", self.path))?;
        }
        self.written += 1;
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.written)
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer
                .finish()
                .with_context(|| format!("Failed to close {:?}", self.path))?;
        }
        Ok(())
    }
}
