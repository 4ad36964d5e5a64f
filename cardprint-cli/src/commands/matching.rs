//! Match command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardprint_core::{
    encoder_for, EngineConfig, HashEncoder, MatchEngine, MatchRequest, MatchResponse, MatchResult,
};
use colored::Colorize;
use tracing::info;

use crate::utils::{load_corpus, read_image};

fn similarity_label(result: &MatchResult) -> colored::ColoredString {
    let text = format!("{:>6.2}%", result.similarity * 100.0);
    if result.below_threshold {
        text.yellow()
    } else if result.similarity >= 0.95 {
        text.green().bold()
    } else {
        text.green()
    }
}

fn print_response(response: &MatchResponse, threshold: f64) {
    println!();
    if response.results.is_empty() {
        println!("{}", "No matches".yellow().bold());
    } else if response.used_fallback {
        println!(
            "{}",
            format!("No match above {:.0}% similarity, closest candidates:", threshold * 100.0)
                .yellow()
                .bold()
        );
    } else {
        println!("{}", "Matches".green().bold());
    }
    println!();

    for (rank, result) in response.results.iter().enumerate() {
        println!(
            "   {:>3}. {}  {}  {} {:<5} {}",
            rank + 1,
            result.record_id.to_string().bold(),
            similarity_label(result),
            "distance".dimmed(),
            result.hamming_distance,
            result.matched_orientation.as_str().dimmed()
        );
    }

    if let Some(warning) = &response.warning {
        println!();
        println!("   {} {}", "Warning:".yellow(), warning);
    }
}

pub struct MatchArgs {
    pub corpus: PathBuf,
    pub image: PathBuf,
    pub threshold: Option<f64>,
    pub max_results: Option<usize>,
    pub max_candidates: Option<usize>,
    pub json: bool,
    pub quiet: bool,
}

/// Execute the match command.
pub fn execute(args: MatchArgs) -> Result<()> {
    let corpus = load_corpus(&args.corpus)?;

    let mut matching = EngineConfig::from_env().matching;
    if let Some(max_candidates) = args.max_candidates {
        matching = matching.with_max_candidates(max_candidates);
    }

    let engine = MatchEngine::new(corpus.fingerprint_grid(), matching)?;
    let encoder = encoder_for(corpus.algorithm(), corpus.grid())?;

    let data = read_image(&args.image)?;
    let query = encoder
        .encode(&data)
        .with_context(|| format!("Failed to fingerprint query {}", args.image.display()))?;

    let request = MatchRequest {
        query_fingerprint: query,
        threshold: args.threshold,
        max_results: args.max_results,
    };
    let response = engine.handle(&request, &corpus)?;
    info!(
        records = corpus.len(),
        results = response.results.len(),
        used_fallback = response.used_fallback,
        "Matched query"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
        println!("{json}");
    } else if !args.quiet {
        print_response(&response, args.threshold.unwrap_or(matching.threshold));
    }

    Ok(())
}
