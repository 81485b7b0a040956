// ==============================================================================
// sinks/mod.rs - Record sink modules
// ==============================================================================
// Description: Destinations that consume a record stream during ingestion
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub mod dedup;
pub mod line;
pub mod store;
pub mod whitelist;

pub use dedup::SvDedupSink;
pub use line::{LineSink, OutputLine};
pub use store::StoreSink;
pub use whitelist::WhitelistSink;

/// Consumer of one record at a time
pub trait RecordSink<R> {
    /// Accept one record. An error here is fatal for the whole build.
    fn write(&mut self, record: &R) -> Result<()>;

    /// Records currently held by the sink (may be lower than records written)
    fn count(&self) -> Result<u64>;

    /// Flush and release the underlying output
    fn finish(&mut self) -> Result<()>;
}

/// Flat-file output, gzip-compressed when the path ends in ".gz"
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputWriter {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {:?}", path))?;
        let writer = BufWriter::new(file);

        let is_gzip = path.extension().is_some_and(|ext| ext == "gz");
        Ok(if is_gzip {
            OutputWriter::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            OutputWriter::Plain(writer)
        })
    }

    /// Write one line terminated by '\n'
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.write_all(line.as_bytes())?;
        self.write_all(b"\n")
    }

    /// Flush everything and write the gzip trailer
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(mut writer) => writer.flush(),
            OutputWriter::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}
