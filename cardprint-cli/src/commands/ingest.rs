//! Ingest command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardprint_core::{
    encoder_for, source_digest, BuildOutcome, CatalogRecord, Corpus, FingerprintSetBuilder,
    HashAlgorithm, RecordId,
};
use colored::Colorize;
use tracing::{debug, info, warn};

use crate::utils::{engine_config, load_corpus, read_image, record_id_for, save_corpus};
use crate::{AlgorithmArg, CorpusFormat};

pub struct IngestArgs {
    pub corpus: PathBuf,
    pub images: Vec<PathBuf>,
    pub format: CorpusFormat,
    pub algorithm: Option<AlgorithmArg>,
    pub width: Option<u32>,
    pub skip_partial: bool,
    pub metadata: Option<String>,
    pub force: bool,
    pub dry_run: bool,
    pub quiet: bool,
}

#[derive(Debug, Default)]
struct IngestSummary {
    stored: usize,
    unchanged: usize,
    partial: usize,
    skipped: usize,
    failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartialDisposition {
    Complete,
    Store,
    Skip,
}

fn partial_disposition(outcome: &BuildOutcome, skip_partial: bool) -> PartialDisposition {
    match (outcome.is_partial(), skip_partial) {
        (false, _) => PartialDisposition::Complete,
        (true, false) => PartialDisposition::Store,
        (true, true) => PartialDisposition::Skip,
    }
}

/// Open the target corpus, creating an empty one stamped with the requested
/// grid and algorithm when the file does not exist yet.
fn open_corpus(args: &IngestArgs) -> Result<Corpus> {
    let config = engine_config(args.width)?;
    let requested: Option<HashAlgorithm> = args.algorithm.map(Into::into);

    if !args.corpus.exists() {
        let algorithm = requested.unwrap_or_default();
        info!(path = %args.corpus.display(), grid = %config.grid, %algorithm, "Creating corpus");
        return Ok(Corpus::new(config.grid, algorithm));
    }

    // Only explicit flags are checked against an existing corpus
    let corpus = load_corpus(&args.corpus)?;
    let grid = if args.width.is_some() {
        config.grid
    } else {
        corpus.grid()
    };
    corpus.ensure_compatible(grid, requested.unwrap_or(corpus.algorithm()))?;
    Ok(corpus)
}

/// Execute the ingest command.
pub fn execute(args: IngestArgs) -> Result<()> {
    let metadata = match &args.metadata {
        Some(raw) => serde_json::from_str(raw).context("Invalid metadata JSON")?,
        None => serde_json::Value::Null,
    };

    let mut corpus = open_corpus(&args)?;
    let builder = FingerprintSetBuilder::new(encoder_for(corpus.algorithm(), corpus.grid())?);

    let mut summary = IngestSummary::default();
    let mut first_error: Option<anyhow::Error> = None;

    // Unreadable files only affect their own entry
    let mut items: Vec<((RecordId, String), Vec<u8>)> = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let (id, data) = match record_id_for(path).and_then(|id| Ok((id, read_image(path)?))) {
            Ok(item) => item,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Skipping image");
                summary.failed += 1;
                first_error.get_or_insert(e);
                continue;
            }
        };

        let digest = source_digest(&data);
        let unchanged = corpus
            .get(&id)
            .and_then(|record| record.source_digest.as_deref())
            .is_some_and(|stored| stored == digest);
        if unchanged && !args.force {
            debug!(%id, "Source unchanged, skipping");
            summary.unchanged += 1;
            continue;
        }
        items.push(((id, digest), data));
    }

    let results = builder.build_batch(&items);
    for ((id, digest), result) in results {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%id, error = %e, "Failed to fingerprint image");
                summary.failed += 1;
                first_error.get_or_insert_with(|| {
                    anyhow::Error::new(e).context(format!("Failed to fingerprint record {id}"))
                });
                continue;
            }
        };

        match partial_disposition(&outcome, args.skip_partial) {
            PartialDisposition::Complete => {}
            PartialDisposition::Store => {
                warn!(%id, missing = ?outcome.failed_orientations(), "Storing partial fingerprint set");
                summary.partial += 1;
            }
            PartialDisposition::Skip => {
                warn!(%id, missing = ?outcome.failed_orientations(), "Skipping partial fingerprint set");
                summary.skipped += 1;
                continue;
            }
        }

        let record = CatalogRecord::new(id.clone())
            .with_fingerprints(outcome.fingerprints)
            .with_source_digest(digest)
            .with_metadata(metadata.clone());

        if corpus.upsert(record)?.is_some() {
            debug!(%id, "Replaced existing record");
        }
        summary.stored += 1;
    }

    if summary.stored == 0 {
        if let Some(err) = first_error {
            return Err(err.context("No images could be ingested"));
        }
    }

    if args.dry_run {
        info!(?summary, "Dry run, corpus not written");
    } else {
        save_corpus(&corpus, &args.corpus, args.format)?;
    }
    info!(?summary, records = corpus.len(), "Ingest complete");

    if !args.quiet {
        println!();
        println!(
            "{}",
            format!("Ingested {} of {} images", summary.stored, args.images.len())
                .green()
                .bold()
        );
        println!();
        println!("   {} {}", "Corpus:".dimmed(), args.corpus.display());
        println!("   {} {}", "Records:".dimmed(), corpus.len());
        println!(
            "   {} {} ({})",
            "Grid:".dimmed(),
            corpus.grid(),
            corpus.algorithm()
        );
        if summary.unchanged > 0 {
            println!("   {} {}", "Unchanged:".dimmed(), summary.unchanged);
        }
        if summary.partial > 0 {
            println!("   {} {}", "Partial:".dimmed(), summary.partial.to_string().yellow());
        }
        if summary.skipped > 0 {
            println!("   {} {}", "Skipped:".dimmed(), summary.skipped.to_string().yellow());
        }
        if summary.failed > 0 {
            println!("   {} {}", "Failed:".dimmed(), summary.failed.to_string().red());
        }
        if args.dry_run {
            println!();
            println!("{}", "[DRY RUN] Corpus not written".yellow());
        }
    }

    Ok(())
}
