//! Cardprint CLI - Trading card fingerprinting and matching tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (invalid arguments or configuration)
  65  Data error (undecodable image, invalid query, incompatible corpus)
  66  Input file not found or unreadable
  74  I/O error (cannot write output file)";

#[derive(Parser)]
#[command(name = "cardprint")]
#[command(author, version, about = "Perceptual fingerprinting and matching for trading cards", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Corpus file encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CorpusFormat {
    /// Compact binary CBOR
    #[default]
    Cbor,
    /// Human-readable JSON
    Json,
}

/// Fingerprint rendering for the `hash` command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FingerprintFormat {
    /// Packed hexadecimal
    #[default]
    Hex,
    /// One '0'/'1' character per bit
    Bits,
    /// JSON object with metadata
    Json,
}

/// Hash algorithm selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    /// Difference hash (used for matching)
    #[default]
    Difference,
    /// Average hash
    Average,
    /// 64-bit blockhash
    Blockhash,
}

impl From<AlgorithmArg> for cardprint_core::HashAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Difference => Self::Difference,
            AlgorithmArg::Average => Self::Average,
            AlgorithmArg::Blockhash => Self::Blockhash64,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the fingerprint of an image
    Hash {
        /// Path to the image (PNG, JPEG, GIF or WebP)
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Hash all four orientations instead of the image as-is
        #[arg(short, long)]
        all_orientations: bool,

        /// Hash algorithm
        #[arg(long, value_enum, default_value_t)]
        algorithm: AlgorithmArg,

        /// Grid width in cells (height follows the card aspect ratio)
        #[arg(long, value_name = "CELLS")]
        width: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: FingerprintFormat,
    },

    /// Fingerprint reference images into a corpus file
    Ingest {
        /// Corpus file to create or update
        #[arg(short, long, value_name = "CORPUS")]
        corpus: PathBuf,

        /// Reference images; the record id is the file stem
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Encoding used when writing the corpus
        #[arg(short, long, value_enum, default_value_t)]
        format: CorpusFormat,

        /// Hash algorithm for a new corpus [default: difference]
        #[arg(long, value_enum)]
        algorithm: Option<AlgorithmArg>,

        /// Grid width for a new corpus (height follows the card aspect ratio)
        #[arg(long, value_name = "CELLS")]
        width: Option<u32>,

        /// Do not store images where some orientations failed
        #[arg(long)]
        skip_partial: bool,

        /// JSON metadata attached to every ingested record
        #[arg(long, value_name = "JSON")]
        metadata: Option<String>,

        /// Re-fingerprint images whose bytes are unchanged
        #[arg(long)]
        force: bool,

        /// Fingerprint and report without writing the corpus
        #[arg(long)]
        dry_run: bool,
    },

    /// Find the catalog records that best match a photo
    Match {
        /// Corpus file to search
        #[arg(short, long, value_name = "CORPUS")]
        corpus: PathBuf,

        /// Photo of the card
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Minimum similarity in [0, 1]
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Maximum number of results
        #[arg(short = 'n', long)]
        max_results: Option<usize>,

        /// Maximum number of catalog records scanned
        #[arg(long)]
        max_candidates: Option<usize>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show corpus statistics
    Inspect {
        /// Corpus file to inspect
        #[arg(value_name = "CORPUS")]
        corpus: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Hash {
            image,
            all_orientations,
            algorithm,
            width,
            format,
        } => commands::hash::execute(image, all_orientations, algorithm, width, format),
        Commands::Ingest {
            corpus,
            images,
            format,
            algorithm,
            width,
            skip_partial,
            metadata,
            force,
            dry_run,
        } => commands::ingest::execute(commands::ingest::IngestArgs {
            corpus,
            images,
            format,
            algorithm,
            width,
            skip_partial,
            metadata,
            force,
            dry_run,
            quiet,
        }),
        Commands::Match {
            corpus,
            image,
            threshold,
            max_results,
            max_candidates,
            json,
        } => commands::matching::execute(commands::matching::MatchArgs {
            corpus,
            image,
            threshold,
            max_results,
            max_candidates,
            json,
            quiet,
        }),
        Commands::Inspect { corpus, json } => commands::inspect::execute(corpus, json),
    };

    if let Err(err) = result {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = exit.message {
            eprintln!("{} {}", "error:".red().bold(), message);
        }
        process::exit(exit.code);
    }
}
