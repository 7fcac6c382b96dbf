//! Snapshot I/O: corpora, catalogs, and interaction logs on disk.
//!
//! Corpora and interaction logs are JSONL (one record per line); the concept
//! catalog is a single JSON array. A malformed JSONL line is a data error:
//! it is skipped with a warning so one corrupt record degrades a run instead
//! of aborting it.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::Concept;
use crate::error::Result;
use crate::types::{ImageRecord, InteractionRecord, QueryExpansion};

/// Output format options for report printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serialize an item to a JSON string.
pub fn to_json<T: Serialize>(item: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(item)?
    } else {
        serde_json::to_string(item)?
    };
    Ok(json)
}

/// Read an image corpus from a JSONL file.
pub fn read_corpus(path: &Path) -> Result<Vec<ImageRecord>> {
    let records = read_jsonl(path, "image record")?;
    tracing::info!("Loaded corpus: {} images from {}", records.len(), path.display());
    Ok(records)
}

/// Write an image corpus to a JSONL file, one record per line.
pub fn write_corpus(path: &Path, records: &[ImageRecord]) -> Result<()> {
    write_jsonl(path, records)?;
    tracing::info!("Wrote corpus: {} images to {}", records.len(), path.display());
    Ok(())
}

/// Read concepts from a JSON array file.
pub fn read_concepts(path: &Path) -> Result<Vec<Concept>> {
    let file = File::open(path)?;
    let concepts: Vec<Concept> = serde_json::from_reader(BufReader::new(file))?;
    tracing::info!(
        "Loaded catalog file: {} concepts from {}",
        concepts.len(),
        path.display()
    );
    Ok(concepts)
}

/// Write concepts as a pretty-printed JSON array.
pub fn write_concepts(path: &Path, concepts: &[Concept]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, concepts)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Read historical search interactions from a JSONL file.
pub fn read_interactions(path: &Path) -> Result<Vec<InteractionRecord>> {
    read_jsonl(path, "interaction")
}

/// Read recorded query expansions from a JSONL file.
pub fn read_expansions(path: &Path) -> Result<Vec<QueryExpansion>> {
    read_jsonl(path, "query expansion")
}

fn read_jsonl<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    "Skipping malformed {} at {}:{}: {}",
                    what,
                    path.display(),
                    number + 1,
                    e
                );
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        tracing::warn!("Skipped {} malformed lines in {}", skipped, path.display());
    }
    Ok(records)
}

fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
