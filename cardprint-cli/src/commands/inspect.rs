//! Inspect command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardprint_core::{Corpus, Coverage, HashAlgorithm, Orientation};
use colored::Colorize;
use serde::Serialize;

use crate::utils::{format_timestamp, load_corpus};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CorpusSummary {
    grid: String,
    algorithm: HashAlgorithm,
    fingerprint_bits: usize,
    updated_at: String,
    coverage: Coverage,
}

impl From<&Corpus> for CorpusSummary {
    fn from(corpus: &Corpus) -> Self {
        Self {
            grid: corpus.grid().to_string(),
            algorithm: corpus.algorithm(),
            fingerprint_bits: corpus.expected_bits(),
            updated_at: corpus.updated_at().to_rfc3339(),
            coverage: corpus.coverage(),
        }
    }
}

/// Execute the inspect command.
pub fn execute(corpus_path: PathBuf, json: bool) -> Result<()> {
    let corpus = load_corpus(&corpus_path)?;
    let summary = CorpusSummary::from(&corpus);

    if json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{json}");
        return Ok(());
    }

    let coverage = summary.coverage;
    println!();
    println!("{}", "Corpus".bold());
    println!();
    println!("   {} {}", "File:".dimmed(), corpus_path.display());
    println!("   {} {}", "Algorithm:".dimmed(), corpus.algorithm());
    println!(
        "   {} {} ({} bits)",
        "Grid:".dimmed(),
        corpus.grid(),
        summary.fingerprint_bits
    );
    println!(
        "   {} {}",
        "Updated:".dimmed(),
        format_timestamp(corpus.updated_at())
    );
    println!("   {} {}", "Records:".dimmed(), coverage.total);
    println!("   {} {}", "Complete:".dimmed(), coverage.complete.to_string().green());
    if coverage.partial > 0 {
        println!("   {} {}", "Partial:".dimmed(), coverage.partial.to_string().yellow());
    }
    if coverage.inert > 0 {
        println!("   {} {}", "No fingerprints:".dimmed(), coverage.inert.to_string().red());
    }

    println!();
    for orientation in Orientation::ALL {
        println!(
            "   {:<20} {}",
            orientation.as_str(),
            coverage.count(orientation)
        );
    }

    Ok(())
}
