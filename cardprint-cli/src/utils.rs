//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::{bail, Context, Result};
use cardprint_core::{CanonicalGrid, Corpus, EngineConfig, RecordId};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::CorpusFormat;

/// Read an image file.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image: {}", path.display()))
}

/// Load and parse a corpus file, trying CBOR first then JSON.
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

    let corpus = match Corpus::from_cbor(&bytes) {
        Ok(corpus) => {
            debug!(format = "cbor", "Parsed corpus");
            corpus
        }
        Err(cbor_err) => match std::str::from_utf8(&bytes) {
            Ok(text) => {
                let corpus = Corpus::from_json(text).with_context(|| {
                    format!("Failed to parse corpus file (CBOR: {cbor_err})")
                })?;
                debug!(format = "json", "Parsed corpus");
                corpus
            }
            Err(_) => {
                return Err(cbor_err).context("Failed to parse corpus file (tried CBOR and JSON)")
            }
        },
    };

    Ok(corpus)
}

/// Write a corpus in the requested encoding.
pub fn save_corpus(corpus: &Corpus, path: &Path, format: CorpusFormat) -> Result<()> {
    let bytes = match format {
        CorpusFormat::Cbor => corpus
            .to_cbor()
            .context("Failed to serialize corpus to CBOR")?,
        CorpusFormat::Json => corpus
            .to_json()
            .context("Failed to serialize corpus to JSON")?
            .into_bytes(),
    };

    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write corpus file: {}", path.display()))?;
    debug!(?format, path = %path.display(), "Saved corpus");
    Ok(())
}

/// Resolve engine configuration: environment first, then the `--width` flag.
pub fn engine_config(width: Option<u32>) -> Result<EngineConfig> {
    let mut config = EngineConfig::from_env();
    if let Some(width) = width {
        config.grid = CanonicalGrid::card(width)?;
    }
    config.validate()?;
    Ok(config)
}

/// Derive a record id from an image path (its file stem).
pub fn record_id_for(path: &Path) -> Result<RecordId> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if !stem.is_empty() => Ok(RecordId::new(stem)),
        _ => bail!("Invalid image path for a record id: {}", path.display()),
    }
}

/// Format a timestamp as a human-readable UTC string.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
